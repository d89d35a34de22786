//! Pairwise travel cost lookup over an ordered point list.

use serde::{Deserialize, Serialize};

/// Sentinel for a missing or unreachable matrix entry.
pub const UNREACHABLE: u32 = u32::MAX;

/// Travel time and distance for one directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub duration_secs: u32,
    pub distance_meters: u32,
}

impl Cost {
    pub const UNREACHABLE: Cost = Cost {
        duration_secs: UNREACHABLE,
        distance_meters: UNREACHABLE,
    };

    pub const ZERO: Cost = Cost {
        duration_secs: 0,
        distance_meters: 0,
    };

    pub fn new(duration_secs: u32, distance_meters: u32) -> Self {
        Self {
            duration_secs,
            distance_meters,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.duration_secs != UNREACHABLE
    }
}

/// Square travel cost matrix.
///
/// Indexed consistently with the point list it was fetched for, where index
/// 0 is the trip origin. Entries that were missing from the source data are
/// stored as [`UNREACHABLE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    n: usize,
    durations: Vec<u32>,
    distances: Vec<u32>,
}

impl CostMatrix {
    /// Builds a matrix from duration and distance rows.
    ///
    /// The dimension is the number of duration rows. Short or missing rows
    /// and cells are filled with [`UNREACHABLE`]; extra cells are ignored.
    pub fn new(durations: Vec<Vec<u32>>, distances: Vec<Vec<u32>>) -> Self {
        let n = durations.len();
        Self::from_fn(n, |i, j| {
            let duration = durations.get(i).and_then(|row| row.get(j)).copied();
            let distance = distances.get(i).and_then(|row| row.get(j)).copied();
            duration.map(|duration_secs| Cost {
                duration_secs,
                distance_meters: distance.unwrap_or(UNREACHABLE),
            })
        })
    }

    /// Builds an `n x n` matrix; `None` cells become unreachable.
    pub fn from_fn<F>(n: usize, mut cost: F) -> Self
    where
        F: FnMut(usize, usize) -> Option<Cost>,
    {
        let mut durations = Vec::with_capacity(n * n);
        let mut distances = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let cell = cost(i, j).unwrap_or(Cost::UNREACHABLE);
                durations.push(cell.duration_secs);
                distances.push(cell.distance_meters);
            }
        }
        Self {
            n,
            durations,
            distances,
        }
    }

    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Cost of the edge `from -> to`, or [`Cost::UNREACHABLE`] when either
    /// index is outside the matrix.
    pub fn get(&self, from: usize, to: usize) -> Cost {
        if from >= self.n || to >= self.n {
            return Cost::UNREACHABLE;
        }
        let cell = from * self.n + to;
        Cost {
            duration_secs: self.durations[cell],
            distance_meters: self.distances[cell],
        }
    }

    pub fn duration(&self, from: usize, to: usize) -> u32 {
        self.get(from, to).duration_secs
    }
}
