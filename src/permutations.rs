//! Lazy, restartable permutation generator.
//!
//! Yields every ordering of `0..n` in lexicographic order, one at a time,
//! without recursion. Construction is bounded so callers cannot ask for a
//! factorial blow-up by accident.

/// Iterator over all permutations of `0..n`.
#[derive(Debug, Clone)]
pub struct Permutations {
    current: Vec<usize>,
    exhausted: bool,
}

impl Permutations {
    /// Creates a generator for `n` elements, or `None` when `n > limit`.
    pub fn bounded(n: usize, limit: usize) -> Option<Self> {
        if n > limit {
            return None;
        }
        Some(Self {
            current: (0..n).collect(),
            exhausted: false,
        })
    }

    /// Rewinds to the identity permutation.
    pub fn restart(&mut self) {
        for (i, slot) in self.current.iter_mut().enumerate() {
            *slot = i;
        }
        self.exhausted = false;
    }

    /// Number of permutations the generator yields in total.
    pub fn total(&self) -> usize {
        (1..=self.current.len()).product()
    }

    /// Advances `current` to the next lexicographic permutation.
    fn step(&mut self) -> bool {
        let items = &mut self.current;
        let n = items.len();
        if n < 2 {
            return false;
        }
        let Some(pivot) = (0..n - 1).rev().find(|&i| items[i] < items[i + 1]) else {
            return false;
        };
        let successor = (pivot + 1..n)
            .rev()
            .find(|&j| items[j] > items[pivot])
            .unwrap_or(pivot + 1);
        items.swap(pivot, successor);
        items[pivot + 1..].reverse();
        true
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let out = self.current.clone();
        self.exhausted = !self.step();
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_elements_in_lexicographic_order() {
        let perms: Vec<_> = Permutations::bounded(3, 8).expect("within bound").collect();
        assert_eq!(
            perms,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
    }

    #[test]
    fn test_empty_and_single_yield_once() {
        assert_eq!(Permutations::bounded(0, 8).map(|p| p.count()), Some(1));
        assert_eq!(
            Permutations::bounded(1, 8).map(|p| p.collect::<Vec<_>>()),
            Some(vec![vec![0]])
        );
    }

    #[test]
    fn test_count_matches_factorial() {
        let perms = Permutations::bounded(6, 8).expect("within bound");
        assert_eq!(perms.total(), 720);
        assert_eq!(perms.count(), 720);
    }

    #[test]
    fn test_refuses_above_limit() {
        assert!(Permutations::bounded(9, 8).is_none());
    }

    #[test]
    fn test_restart_replays_sequence() {
        let mut perms = Permutations::bounded(3, 8).expect("within bound");
        let first: Vec<_> = perms.by_ref().collect();
        assert!(perms.next().is_none());
        perms.restart();
        let second: Vec<_> = perms.collect();
        assert_eq!(first, second);
    }
}
