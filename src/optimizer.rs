//! Route optimization engine.
//!
//! A constrained open-path TSP: nearest-neighbour construction over the
//! movable stops, improved with 2-opt, then assembled around the stops
//! whose position is pinned. Several ranked alternatives are produced per
//! request. Stateless and deterministic: identical inputs give identical
//! route sets.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::debug;

use crate::matrix::CostMatrix;
use crate::model::{PositionConstraint, Route, RouteSet, Stop, StopId};
use crate::permutations::Permutations;

/// Largest movable-stop count for which [`enumerate`] tries every ordering.
pub const EXHAUSTIVE_LIMIT: usize = 8;

#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    /// Number of ranked alternatives [`optimize`] returns at most.
    pub alternatives_count: usize,
    /// Movable-stop count above which [`enumerate`] falls back to [`optimize`].
    pub exhaustive_limit: usize,
    /// Number of routes [`enumerate`] keeps at most.
    pub max_enumerated: usize,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            alternatives_count: 3,
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            max_enumerated: 20,
        }
    }
}

/// Produces up to `alternatives_count` ranked routes from `origin` through
/// every stop in `stops`.
///
/// `matrix` must be indexed like `[origin] + stops`. Entries outside the
/// matrix are treated as unreachable.
pub fn optimize(
    origin: &Stop,
    stops: &[Stop],
    matrix: &CostMatrix,
    alternatives_count: usize,
) -> RouteSet {
    let alternatives_count = alternatives_count.max(1);
    if stops.is_empty() {
        return origin_only(origin);
    }

    let problem = Problem::new(origin, stops, matrix);
    debug!(
        stops = stops.len(),
        flexible = problem.flexible.len(),
        anchored = problem.anchored_count(),
        alternatives_count,
        "optimizing route"
    );

    let tour = if problem.flexible.len() > 1 {
        let mut tour = problem.nearest_neighbor();
        problem.two_opt(&mut tour);
        tour
    } else {
        problem.flexible.clone()
    };

    let mut candidates = vec![problem.candidate(&tour)];

    if problem.flexible.len() >= 2 {
        let seeds = alternatives_count.min(problem.flexible.len() + 1);
        for seed in 1..seeds {
            let mut rotated = problem.flexible.clone();
            rotated.rotate_left(seed % problem.flexible.len());
            let candidate = problem.candidate(&rotated);
            if !candidates.iter().any(|kept| problem.same_order(kept, &candidate)) {
                candidates.push(candidate);
            }
        }
    }

    let set = problem.rank(candidates, alternatives_count);
    debug!(
        alternatives = set.len(),
        best_secs = set.best().map(|r| r.total_duration_secs),
        "route optimized"
    );
    set
}

/// Evaluates every ordering of the movable stops and keeps the fastest
/// `max_results`. Falls back to [`optimize`] above [`EXHAUSTIVE_LIMIT`]
/// movable stops.
pub fn enumerate(origin: &Stop, stops: &[Stop], matrix: &CostMatrix, max_results: usize) -> RouteSet {
    enumerate_bounded(origin, stops, matrix, max_results, EXHAUSTIVE_LIMIT)
}

/// [`enumerate`] with an explicit movable-stop limit. Limits above
/// [`EXHAUSTIVE_LIMIT`] are clamped to it.
pub fn enumerate_bounded(
    origin: &Stop,
    stops: &[Stop],
    matrix: &CostMatrix,
    max_results: usize,
    exhaustive_limit: usize,
) -> RouteSet {
    let max_results = max_results.max(1);
    let exhaustive_limit = exhaustive_limit.min(EXHAUSTIVE_LIMIT);
    if stops.is_empty() {
        return origin_only(origin);
    }

    let problem = Problem::new(origin, stops, matrix);
    let Some(permutations) = Permutations::bounded(problem.flexible.len(), exhaustive_limit) else {
        debug!(
            flexible = problem.flexible.len(),
            exhaustive_limit, "too many movable stops to enumerate, using heuristic"
        );
        return optimize(origin, stops, matrix, max_results);
    };

    let orders: Vec<Vec<usize>> = permutations
        .map(|perm| perm.into_iter().map(|k| problem.flexible[k]).collect())
        .collect();
    debug!(permutations = orders.len(), "enumerating routes");

    // Collecting from an indexed parallel iterator keeps generation order.
    let candidates: Vec<Candidate> = orders
        .par_iter()
        .map(|order| problem.candidate(order))
        .collect();

    problem.rank(candidates, max_results)
}

fn origin_only(origin: &Stop) -> RouteSet {
    let origin = origin.clone().with_sequence(0);
    RouteSet::new(vec![Route::new(vec![origin], 0, 0)])
}

/// An assembled order (input positions, origin excluded) with its cost.
#[derive(Debug, Clone)]
struct Candidate {
    order: Vec<usize>,
    duration: u64,
    distance: u64,
}

/// One optimization request: the stops split by constraint and resolved to
/// matrix rows.
struct Problem<'a> {
    origin: &'a Stop,
    stops: &'a [Stop],
    matrix: &'a CostMatrix,
    /// Matrix row of each input stop, resolved by id.
    rows: Vec<usize>,
    first: Vec<usize>,
    last: Vec<usize>,
    flexible: Vec<usize>,
    /// Input positions of flexible and anchored stops, in input order. The
    /// anchored ones keep their slot; flexible slots are refilled in tour
    /// order.
    middle: Vec<usize>,
}

impl<'a> Problem<'a> {
    fn new(origin: &'a Stop, stops: &'a [Stop], matrix: &'a CostMatrix) -> Self {
        let mut index: HashMap<&StopId, usize> = HashMap::with_capacity(stops.len() + 1);
        index.insert(&origin.id, 0);
        for (i, stop) in stops.iter().enumerate() {
            index.entry(&stop.id).or_insert(i + 1);
        }
        let rows = stops.iter().map(|stop| index[&stop.id]).collect();

        let mut first = Vec::new();
        let mut last = Vec::new();
        let mut flexible = Vec::new();
        let mut middle = Vec::new();
        for (i, stop) in stops.iter().enumerate() {
            match stop.constraint {
                PositionConstraint::MustBeFirst => first.push(i),
                PositionConstraint::MustBeLast => last.push(i),
                PositionConstraint::AnchoredInPlace => middle.push(i),
                PositionConstraint::Unconstrained => {
                    flexible.push(i);
                    middle.push(i);
                }
            }
        }

        Self {
            origin,
            stops,
            matrix,
            rows,
            first,
            last,
            flexible,
            middle,
        }
    }

    fn anchored_count(&self) -> usize {
        self.middle.len() - self.flexible.len()
    }

    fn is_anchored(&self, pos: usize) -> bool {
        self.stops[pos].constraint == PositionConstraint::AnchoredInPlace
    }

    /// Edge duration between two path nodes, where `None` is the origin.
    fn duration(&self, from: Option<usize>, to: Option<usize>) -> u64 {
        let row = |node: Option<usize>| node.map_or(0, |pos| self.rows[pos]);
        u64::from(self.matrix.duration(row(from), row(to)))
    }

    /// Greedy tour over the flexible stops, starting at the origin.
    ///
    /// Ties go to the earlier stop. When every remaining stop is
    /// unreachable the earliest one is taken, so no stop is ever dropped.
    fn nearest_neighbor(&self) -> Vec<usize> {
        let mut remaining = self.flexible.clone();
        let mut tour = Vec::with_capacity(remaining.len());
        let mut current = None;

        while !remaining.is_empty() {
            let mut best = 0;
            let mut best_cost = self.duration(current, Some(remaining[0]));
            for (k, &pos) in remaining.iter().enumerate().skip(1) {
                let cost = self.duration(current, Some(pos));
                if cost < best_cost {
                    best = k;
                    best_cost = cost;
                }
            }
            let next = remaining.remove(best);
            tour.push(next);
            current = Some(next);
        }

        tour
    }

    /// 2-opt over the open path `origin -> tour`, to a local optimum.
    ///
    /// Path node `p` is the origin for `p == 0` and `tour[p - 1]` otherwise,
    /// so the origin never moves. Reversing path nodes `i+1..=j` replaces the
    /// edges `(i, i+1)` and `(j, j+1)` with `(i, j)` and `(i+1, j+1)`; with
    /// `j` last there is no `(j, j+1)` edge. A move is applied only if the
    /// path gets strictly cheaper, which for asymmetric costs also accounts
    /// for the reversed interior.
    fn two_opt(&self, tour: &mut [usize]) {
        let len = tour.len() + 1;
        if len < 3 {
            return;
        }

        let mut improved = true;
        while improved {
            improved = false;
            for i in 0..len - 2 {
                for j in i + 2..len {
                    if self.reversal_gain(tour, i, j) {
                        tour[i..j].reverse();
                        improved = true;
                    }
                }
            }
        }
    }

    fn reversal_gain(&self, tour: &[usize], i: usize, j: usize) -> bool {
        let node = |p: usize| if p == 0 { None } else { Some(tour[p - 1]) };
        let len = tour.len() + 1;

        let mut before = self.duration(node(i), node(i + 1));
        let mut after = self.duration(node(i), node(j));
        if j + 1 < len {
            before += self.duration(node(j), node(j + 1));
            after += self.duration(node(i + 1), node(j + 1));
        }
        for p in i + 1..j {
            before += self.duration(node(p), node(p + 1));
            after += self.duration(node(p + 1), node(p));
        }

        after < before
    }

    /// Full visiting order (origin excluded) for a given flexible order.
    fn assemble(&self, flexible_order: &[usize]) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.stops.len());
        order.extend_from_slice(&self.first);

        let mut tour = flexible_order.iter();
        for &slot in &self.middle {
            if self.is_anchored(slot) {
                order.push(slot);
            } else if let Some(&pos) = tour.next() {
                order.push(pos);
            }
        }

        order.extend_from_slice(&self.last);
        order
    }

    /// Sums consecutive edges, resolving each stop's matrix row by id.
    fn measure(&self, order: &[usize]) -> (u64, u64) {
        let mut duration: u64 = 0;
        let mut distance: u64 = 0;
        let mut prev = 0;
        for &pos in order {
            let row = self.rows[pos];
            let cost = self.matrix.get(prev, row);
            duration = duration.saturating_add(u64::from(cost.duration_secs));
            distance = distance.saturating_add(u64::from(cost.distance_meters));
            prev = row;
        }
        (duration, distance)
    }

    fn candidate(&self, flexible_order: &[usize]) -> Candidate {
        let order = self.assemble(flexible_order);
        let (duration, distance) = self.measure(&order);
        Candidate {
            order,
            duration,
            distance,
        }
    }

    fn same_order(&self, a: &Candidate, b: &Candidate) -> bool {
        a.order.len() == b.order.len()
            && a.order
                .iter()
                .zip(&b.order)
                .all(|(&x, &y)| self.stops[x].id == self.stops[y].id)
    }

    /// Sorts fastest first, keeps the first `limit`, then prices savings
    /// against the slowest route kept.
    fn rank(&self, mut candidates: Vec<Candidate>, limit: usize) -> RouteSet {
        candidates.sort_by_key(|c| c.duration);
        candidates.truncate(limit);
        let Some(worst) = candidates.last().cloned() else {
            return origin_only(self.origin);
        };

        let routes = candidates
            .into_iter()
            .map(|c| {
                let mut route = self.materialize(&c);
                route.savings_secs = worst.duration - c.duration;
                route.distance_savings_meters = worst.distance as i64 - c.distance as i64;
                route
            })
            .collect();
        RouteSet::new(routes)
    }

    fn materialize(&self, candidate: &Candidate) -> Route {
        let stops = std::iter::once(self.origin)
            .chain(candidate.order.iter().map(|&pos| &self.stops[pos]))
            .enumerate()
            .map(|(sequence, stop)| stop.clone().with_sequence(sequence))
            .collect();
        Route::new(stops, candidate.duration, candidate.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Cost;

    fn stops(n: usize) -> Vec<Stop> {
        (0..n)
            .map(|i| Stop::new(format!("s{i}"), format!("Stop {i}"), (0.0, i as f64)))
            .collect()
    }

    /// Points on a line; cost is distance along it.
    fn line_matrix(positions: &[f64]) -> CostMatrix {
        CostMatrix::from_fn(positions.len(), |i, j| {
            let d = (positions[i] - positions[j]).abs() as u32;
            Some(Cost::new(d, d * 10))
        })
    }

    #[test]
    fn test_nearest_neighbor_takes_first_stop_when_all_unreachable() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(3);
        let matrix = CostMatrix::from_fn(4, |i, j| (i == j).then_some(Cost::ZERO));
        let problem = Problem::new(&origin, &stops, &matrix);
        assert_eq!(problem.nearest_neighbor(), vec![0, 1, 2]);
    }

    #[test]
    fn test_two_opt_uncrosses_path() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(4);
        // Origin at 0, stops at 1, 2, 3, 4.
        let matrix = line_matrix(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let problem = Problem::new(&origin, &stops, &matrix);

        let mut tour = vec![0, 2, 1, 3];
        let before = problem.measure(&tour).0;
        problem.two_opt(&mut tour);
        assert_eq!(tour, vec![0, 1, 2, 3]);
        assert!(problem.measure(&tour).0 < before);
    }

    #[test]
    fn test_two_opt_handles_tail_reversal() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(3);
        // Visiting the far stop first is wasteful: origin 0, stops 3, 1, 2.
        let matrix = line_matrix(&[0.0, 3.0, 1.0, 2.0]);
        let problem = Problem::new(&origin, &stops, &matrix);

        let mut tour = vec![0, 1, 2];
        problem.two_opt(&mut tour);
        assert_eq!(tour, vec![1, 2, 0]);
    }

    #[test]
    fn test_assemble_keeps_anchor_slots() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let mut stops = stops(4);
        stops[1].constraint = PositionConstraint::AnchoredInPlace;
        let matrix = line_matrix(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let problem = Problem::new(&origin, &stops, &matrix);

        assert_eq!(problem.assemble(&[3, 2, 0]), vec![3, 1, 2, 0]);
    }

    #[test]
    fn test_measure_saturates_on_unreachable_edges() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(2);
        let matrix = CostMatrix::from_fn(3, |_, _| None);
        let problem = Problem::new(&origin, &stops, &matrix);
        let (duration, _) = problem.measure(&[0, 1]);
        assert_eq!(duration, 2 * u64::from(crate::matrix::UNREACHABLE));
    }

    #[test]
    fn test_rank_prices_savings_against_last_kept_route() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(4);
        let matrix = CostMatrix::from_fn(5, |i, j| {
            let d = if i == j { 0 } else { ((i * 7 + j * 13) % 50 + 1) as u32 };
            Some(Cost::new(d, d))
        });

        let set = enumerate(&origin, &stops, &matrix, 3);
        assert_eq!(set.len(), 3);
        let routes = set.routes();
        let last = &routes[2];
        assert_eq!(last.savings_secs, 0);
        assert_eq!(last.distance_savings_meters, 0);
        assert_eq!(
            routes[0].savings_secs,
            last.total_duration_secs - routes[0].total_duration_secs
        );
    }

    #[test]
    fn test_enumerate_bounded_clamps_limit() {
        let origin = Stop::origin("O", (0.0, 0.0));
        let stops = stops(9);
        let positions: Vec<f64> = (0..10).map(f64::from).collect();
        let matrix = line_matrix(&positions);

        assert_eq!(
            enumerate_bounded(&origin, &stops, &matrix, 4, 12),
            optimize(&origin, &stops, &matrix, 4)
        );
    }

    mod properties {
        use proptest::prelude::*;

        use super::stops;
        use crate::matrix::{Cost, CostMatrix};
        use crate::model::Stop;
        use crate::optimizer::Problem;

        fn tour_strategy() -> impl Strategy<Value = (usize, Vec<u32>, Vec<usize>)> {
            (2_usize..=7).prop_flat_map(|n| {
                let dim = n + 1;
                (
                    Just(n),
                    prop::collection::vec(1_u32..1_000, dim * dim),
                    Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn two_opt_never_lengthens_tour((n, cells, mut tour) in tour_strategy()) {
                let dim = n + 1;
                let origin = Stop::origin("O", (0.0, 0.0));
                let stops = stops(n);
                let matrix = CostMatrix::from_fn(dim, |i, j| {
                    let d = if i == j { 0 } else { cells[i * dim + j] };
                    Some(Cost::new(d, d * 3))
                });
                let problem = Problem::new(&origin, &stops, &matrix);

                let before = problem.measure(&tour).0;
                problem.two_opt(&mut tour);
                let after = problem.measure(&tour).0;

                prop_assert!(after <= before, "{} > {}", after, before);
                let mut visited = tour.clone();
                visited.sort_unstable();
                prop_assert_eq!(visited, (0..n).collect::<Vec<_>>());
            }
        }
    }
}
