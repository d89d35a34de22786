//! OSRM HTTP adapter for cost matrices and route geometry.

use std::env;

use serde::Deserialize;
use tracing::warn;

use crate::error::ProviderError;
use crate::matrix::{CostMatrix, UNREACHABLE};
use crate::polyline::{self, Polyline};
use crate::traits::{CostMatrixProvider, PolylineProvider};

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OsrmConfig {
    /// Defaults overridden by `OSRM_URL`, `OSRM_PROFILE` and
    /// `OSRM_TIMEOUT_SECS` when set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("OSRM_URL").unwrap_or(defaults.base_url),
            profile: env::var("OSRM_PROFILE").unwrap_or(defaults.profile),
            timeout_secs: env::var("OSRM_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, service: &str, locations: &[(f64, f64)], query: &str) -> String {
        let coords = locations
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/{}/v1/{}/{}?{}",
            self.config.base_url, service, self.config.profile, coords, query
        )
    }

    fn get<T: for<'de> Deserialize<'de>>(&self, url: String) -> Result<T, ProviderError> {
        self.client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|err| {
                warn!(error = %err, "OSRM request failed");
                ProviderError::from(err)
            })
    }
}

impl CostMatrixProvider for OsrmClient {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Result<CostMatrix, ProviderError> {
        if locations.is_empty() {
            return Err(ProviderError::EmptyInput);
        }

        let url = self.url("table", locations, "annotations=duration,distance");
        let body: OsrmTableResponse = self.get(url)?;
        body.into_matrix(locations.len())
    }
}

impl PolylineProvider for OsrmClient {
    fn polyline_for(&self, locations: &[(f64, f64)]) -> Result<Polyline, ProviderError> {
        if locations.len() < 2 {
            return Ok(Polyline::straight_line(locations));
        }

        let url = self.url("route", locations, "overview=full&geometries=polyline");
        let body: OsrmRouteResponse = self.get(url)?;
        check_code(&body.code, body.message.as_deref())?;

        let route = body
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed("route response has no routes"))?;
        polyline::decode(&route.geometry)
    }
}

fn check_code(code: &str, message: Option<&str>) -> Result<(), ProviderError> {
    if code == "Ok" {
        Ok(())
    } else {
        Err(ProviderError::service(code, message.unwrap_or_default()))
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl OsrmTableResponse {
    fn into_matrix(self, expected: usize) -> Result<CostMatrix, ProviderError> {
        check_code(&self.code, self.message.as_deref())?;

        let durations = self
            .durations
            .ok_or_else(|| ProviderError::malformed("table response has no durations"))?;
        if durations.len() != expected {
            return Err(ProviderError::DimensionMismatch {
                expected,
                actual: durations.len(),
            });
        }

        Ok(CostMatrix::new(
            to_cells(durations),
            to_cells(self.distances.unwrap_or_default()),
        ))
    }
}

/// Rounds OSRM's float cells; `null` (no route) becomes unreachable.
fn to_cells(rows: Vec<Vec<Option<f64>>>) -> Vec<Vec<u32>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|value| match value {
                    Some(value) if value.is_finite() && value >= 0.0 => value.round() as u32,
                    _ => UNREACHABLE,
                })
                .collect()
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
}
