//! Haversine cost matrix provider (fallback when no routing service is up).
//!
//! Uses great-circle distance to estimate travel time. Less accurate than a
//! road network (ignores roads) but always available, so it suits
//! [`crate::planner::TravelMode::Direct`] and offline use.

use crate::error::ProviderError;
use crate::matrix::{Cost, CostMatrix};
use crate::traits::CostMatrixProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based cost matrix provider.
///
/// Estimates travel time using straight-line distance and an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance between two points in kilometers.
    pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    fn km_to_seconds(&self, km: f64) -> u32 {
        let hours = km / self.speed_kmh;
        (hours * 3600.0).round() as u32
    }

    fn edge(&self, from: (f64, f64), to: (f64, f64)) -> Cost {
        let km = Self::haversine_km(from, to);
        Cost::new(self.km_to_seconds(km), (km * 1000.0).round() as u32)
    }
}

impl CostMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Result<CostMatrix, ProviderError> {
        if locations.is_empty() {
            return Err(ProviderError::EmptyInput);
        }

        Ok(CostMatrix::from_fn(locations.len(), |i, j| {
            if i == j {
                Some(Cost::ZERO)
            } else {
                Some(self.edge(locations[i], locations[j]))
            }
        }))
    }
}
