//! Provider traits at the external-service boundary.
//!
//! The optimizer never talks to a network. Callers fetch a [`CostMatrix`]
//! through a [`CostMatrixProvider`] first and hand it over; geometry for
//! drawing a chosen route comes from a [`PolylineProvider`].

use crate::error::ProviderError;
use crate::matrix::CostMatrix;
use crate::polyline::Polyline;

/// Provides a travel time/distance matrix for a set of locations.
///
/// The matrix is indexed by the provided location order: row/column 0 is
/// `locations[0]`, which is always the trip origin. Implementations must
/// return a matrix whose dimension equals `locations.len()`.
pub trait CostMatrixProvider {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Result<CostMatrix, ProviderError>;
}

/// Provides road geometry through an ordered list of stop locations.
///
/// Only used for drawing. Callers fall back to
/// [`Polyline::straight_line`] when this fails.
pub trait PolylineProvider {
    fn polyline_for(&self, locations: &[(f64, f64)]) -> Result<Polyline, ProviderError>;
}

impl<T: CostMatrixProvider + ?Sized> CostMatrixProvider for &T {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Result<CostMatrix, ProviderError> {
        (**self).matrix_for(locations)
    }
}

impl<T: PolylineProvider + ?Sized> PolylineProvider for &T {
    fn polyline_for(&self, locations: &[(f64, f64)]) -> Result<Polyline, ProviderError> {
        (**self).polyline_for(locations)
    }
}
