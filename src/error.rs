//! Error types for the provider boundary and the planner session.
//!
//! The optimizer and the navigation coordinator never fail; the only errors
//! in this crate originate at the external-provider boundary.

use thiserror::Error;

/// Errors returned by [`crate::traits::CostMatrixProvider`] and
/// [`crate::traits::PolylineProvider`] implementations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No coordinates were provided.
    #[error("at least one coordinate is required")]
    EmptyInput,
    /// Transport-level failure talking to the routing service.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The service answered but reported a failure.
    #[error("routing service returned {code}: {message}")]
    Service { code: String, message: String },
    /// The returned matrix does not cover the requested points.
    #[error("matrix dimension {actual} does not match {expected} points")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

/// Errors surfaced by [`crate::planner::RoutePlanner`] before or while
/// requesting a cost matrix.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Neither a current location nor a custom start point is available.
    #[error("no start point available")]
    MissingStartPoint,
    #[error("add at least one stop to the route")]
    NoStops,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
