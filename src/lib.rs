//! route-navigator core
//!
//! Orders a set of stops into ranked driving routes and coordinates the
//! navigation of the chosen one across every surface showing it.

pub mod error;
pub mod haversine;
pub mod matrix;
pub mod model;
pub mod navigation;
pub mod optimizer;
pub mod osrm;
pub mod permutations;
pub mod planner;
pub mod polyline;
pub mod traffic;
pub mod traits;

pub use error::{PlannerError, ProviderError};
pub use matrix::{Cost, CostMatrix, UNREACHABLE};
pub use model::{PositionConstraint, Route, RouteSet, Stop, StopId, StopList};
pub use navigation::{Lifecycle, NavigationCoordinator, NavigationSnapshot, Notification, NotificationKind};
pub use planner::{PlannerState, RoutePlanner, StartPoint, TravelMode};
pub use traits::{CostMatrixProvider, PolylineProvider};
