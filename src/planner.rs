//! Planning session: the surface a UI drives before and during a trip.
//!
//! Owns the editable stop list and the start point, runs the
//! fetch-matrix-then-optimize flow against a [`CostMatrixProvider`], keeps
//! the resulting [`RouteSet`], and hands the chosen route to the shared
//! [`NavigationCoordinator`].

use tracing::{info, warn};

use crate::error::{PlannerError, ProviderError};
use crate::matrix::CostMatrix;
use crate::model::{ORIGIN_ID, PositionConstraint, RouteSet, Stop, StopId, StopList};
use crate::navigation::{NavigationCoordinator, NotificationKind};
use crate::optimizer::{self, OptimizeOptions};
use crate::traffic::{TrafficSuggestion, TrafficThresholds};
use crate::traits::{CostMatrixProvider, PolylineProvider};

/// How routes are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TravelMode {
    /// Road geometry from a polyline provider.
    #[default]
    Driving,
    /// Straight lines between stops.
    Direct,
}

/// Where the trip starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StartPoint {
    /// The device's last reported location.
    #[default]
    CurrentLocation,
    Custom(Stop),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlannerState {
    #[default]
    Idle,
    AddingStops,
    Optimizing,
    Optimized(RouteSet),
    Error(String),
}

#[derive(Debug, Default)]
pub struct RoutePlanner {
    stops: StopList,
    current_location: Option<(f64, f64)>,
    start: StartPoint,
    travel_mode: TravelMode,
    options: OptimizeOptions,
    traffic_thresholds: TrafficThresholds,
    state: PlannerState,
    needs_reoptimization: bool,
    traffic_suggestion: Option<TrafficSuggestion>,
    navigation: NavigationCoordinator,
    next_stop_id: u64,
}

impl RoutePlanner {
    /// Creates a planner that publishes to `navigation`.
    pub fn new(navigation: NavigationCoordinator) -> Self {
        Self {
            navigation,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: OptimizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_traffic_thresholds(mut self, thresholds: TrafficThresholds) -> Self {
        self.traffic_thresholds = thresholds;
        self
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn stops(&self) -> &StopList {
        &self.stops
    }

    pub fn routes(&self) -> Option<&RouteSet> {
        match &self.state {
            PlannerState::Optimized(set) => Some(set),
            _ => None,
        }
    }

    fn routes_mut(&mut self) -> Option<&mut RouteSet> {
        match &mut self.state {
            PlannerState::Optimized(set) => Some(set),
            _ => None,
        }
    }

    pub fn navigation(&self) -> &NavigationCoordinator {
        &self.navigation
    }

    pub fn travel_mode(&self) -> TravelMode {
        self.travel_mode
    }

    pub fn needs_reoptimization(&self) -> bool {
        self.needs_reoptimization
    }

    pub fn traffic_suggestion(&self) -> Option<&TrafficSuggestion> {
        self.traffic_suggestion.as_ref()
    }

    // ========================================================================
    // Start point
    // ========================================================================

    pub fn set_current_location(&mut self, location: (f64, f64)) {
        self.current_location = Some(location);
    }

    pub fn use_current_location(&mut self) {
        self.start = StartPoint::CurrentLocation;
        self.discard_routes();
    }

    pub fn set_custom_start(&mut self, stop: Stop) {
        self.start = StartPoint::Custom(stop);
        self.discard_routes();
    }

    /// The origin stop for the next optimization.
    pub fn origin(&self) -> Result<Stop, PlannerError> {
        match &self.start {
            StartPoint::CurrentLocation => self
                .current_location
                .map(|location| Stop::origin("Your location", location).with_address("Current location"))
                .ok_or(PlannerError::MissingStartPoint),
            StartPoint::Custom(stop) => Ok(Stop {
                id: StopId::new(ORIGIN_ID),
                sequence: 0,
                constraint: PositionConstraint::Unconstrained,
                ..stop.clone()
            }),
        }
    }

    // ========================================================================
    // Stop editing
    // ========================================================================

    /// Adds a stop with a generated id and returns that id.
    pub fn add_location(
        &mut self,
        name: impl Into<String>,
        address: impl Into<String>,
        location: (f64, f64),
    ) -> StopId {
        let id = loop {
            self.next_stop_id += 1;
            let id = format!("stop-{}", self.next_stop_id);
            if self.stops.get(&StopId::new(id.as_str())).is_none() {
                break id;
            }
        };
        let stop = Stop::new(id, name, location).with_address(address);
        let id = stop.id.clone();
        self.add_stop(stop);
        id
    }

    /// Adds a stop. With routes on screen this only flags that they are
    /// stale; the caller decides whether to re-optimize.
    ///
    /// Returns `false` without any change when the id is the origin's or
    /// already taken.
    pub fn add_stop(&mut self, stop: Stop) -> bool {
        let id = stop.id.clone();
        if !self.stops.push(stop) {
            warn!(stop = %id, "stop id is reserved or already in use, ignoring");
            return false;
        }
        if self.routes().is_some() {
            self.needs_reoptimization = true;
        } else {
            self.state = PlannerState::AddingStops;
        }
        self.publish();
        true
    }

    pub fn remove_stop(&mut self, id: &StopId) -> bool {
        if self.stops.remove(id).is_none() {
            return false;
        }
        if self.routes().is_some() && !self.stops.is_empty() {
            self.needs_reoptimization = true;
        } else {
            self.discard_routes();
        }
        self.publish();
        true
    }

    pub fn set_constraint(&mut self, id: &StopId, constraint: PositionConstraint) -> bool {
        let changed = self.stops.set_constraint(id, constraint);
        self.after_reorder(changed)
    }

    pub fn update_location(&mut self, id: &StopId, location: (f64, f64)) -> bool {
        let changed = self.stops.update_location(id, location);
        self.after_reorder(changed)
    }

    pub fn move_up(&mut self, id: &StopId) -> bool {
        let changed = self.stops.move_up(id);
        self.after_reorder(changed)
    }

    pub fn move_down(&mut self, id: &StopId) -> bool {
        let changed = self.stops.move_down(id);
        self.after_reorder(changed)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let changed = self.stops.reorder(from, to);
        self.after_reorder(changed)
    }

    pub fn clear_stops(&mut self) {
        self.stops.clear();
        self.needs_reoptimization = false;
        self.state = PlannerState::Idle;
        self.publish();
    }

    fn after_reorder(&mut self, changed: bool) -> bool {
        if changed {
            self.discard_routes();
            self.publish();
        }
        changed
    }

    fn discard_routes(&mut self) {
        self.needs_reoptimization = false;
        self.traffic_suggestion = None;
        if matches!(self.state, PlannerState::Optimized(_)) {
            self.state = if self.stops.is_empty() {
                PlannerState::Idle
            } else {
                PlannerState::AddingStops
            };
        }
    }

    fn publish(&self) {
        self.navigation.publish_stops(self.stops.as_slice());
    }

    // ========================================================================
    // Optimization
    // ========================================================================

    /// Fetches a cost matrix and produces ranked alternatives, readable
    /// through [`Self::routes`] afterwards.
    ///
    /// Provider failures put the planner in [`PlannerState::Error`] and are
    /// returned as-is; they are never retried here.
    pub fn optimize<P: CostMatrixProvider>(&mut self, provider: &P) -> Result<(), PlannerError> {
        let count = self.options.alternatives_count;
        self.run(provider, |origin, stops, matrix| {
            optimizer::optimize(origin, stops, matrix, count)
        })
    }

    /// Like [`Self::optimize`] but tries every ordering of the movable
    /// stops when there are few enough of them.
    pub fn enumerate_all<P: CostMatrixProvider>(&mut self, provider: &P) -> Result<(), PlannerError> {
        let max_results = self.options.max_enumerated;
        let limit = self.options.exhaustive_limit;
        self.run(provider, |origin, stops, matrix| {
            optimizer::enumerate_bounded(origin, stops, matrix, max_results, limit)
        })
    }

    pub fn confirm_reoptimization<P: CostMatrixProvider>(&mut self, provider: &P) -> Result<(), PlannerError> {
        self.needs_reoptimization = false;
        self.optimize(provider)
    }

    pub fn dismiss_reoptimization(&mut self) {
        self.needs_reoptimization = false;
    }

    fn run<P, F>(&mut self, provider: &P, solve: F) -> Result<(), PlannerError>
    where
        P: CostMatrixProvider,
        F: FnOnce(&Stop, &[Stop], &CostMatrix) -> RouteSet,
    {
        let set = match self.solve_with(provider, solve) {
            Ok(set) => set,
            Err(err) => {
                warn!(error = %err, "route optimization failed");
                self.state = PlannerState::Error(err.to_string());
                return Err(err);
            }
        };

        info!(
            alternatives = set.len(),
            best_secs = set.best().map(|route| route.total_duration_secs),
            "routes ready"
        );
        self.needs_reoptimization = false;
        self.traffic_suggestion = None;
        self.state = PlannerState::Optimized(set);
        Ok(())
    }

    fn solve_with<P, F>(&mut self, provider: &P, solve: F) -> Result<RouteSet, PlannerError>
    where
        P: CostMatrixProvider,
        F: FnOnce(&Stop, &[Stop], &CostMatrix) -> RouteSet,
    {
        let origin = self.origin()?;
        if self.stops.is_empty() {
            return Err(PlannerError::NoStops);
        }
        self.state = PlannerState::Optimizing;

        let locations: Vec<(f64, f64)> = std::iter::once(origin.location)
            .chain(self.stops.iter().map(|stop| stop.location))
            .collect();
        let matrix = provider.matrix_for(&locations)?;
        if matrix.dimension() != locations.len() {
            return Err(ProviderError::DimensionMismatch {
                expected: locations.len(),
                actual: matrix.dimension(),
            }
            .into());
        }

        Ok(solve(&origin, self.stops.as_slice(), &matrix))
    }

    // ========================================================================
    // Route selection and geometry
    // ========================================================================

    pub fn select_route(&mut self, index: usize) -> bool {
        self.routes_mut().is_some_and(|set| set.select(index))
    }

    pub fn set_travel_mode(&mut self, mode: TravelMode) {
        self.travel_mode = mode;
        if mode == TravelMode::Direct {
            if let Some(set) = self.routes_mut() {
                for route in set.routes_mut() {
                    route.geometry = None;
                }
            }
        }
    }

    /// Fetches road geometry for the selected route in driving mode.
    ///
    /// Returns whether geometry is attached afterwards. A failed fetch is
    /// logged and leaves the route on its straight-line path.
    pub fn attach_geometry<P: PolylineProvider>(&mut self, provider: &P) -> bool {
        if self.travel_mode == TravelMode::Direct {
            return false;
        }
        let Some(route) = self.routes_mut().and_then(|set| set.selected_mut()) else {
            return false;
        };
        if route.geometry.is_some() {
            return true;
        }
        if route.stops.len() < 2 {
            return false;
        }

        match provider.polyline_for(&route.locations()) {
            Ok(polyline) if !polyline.is_empty() => {
                route.geometry = Some(polyline);
                true
            }
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, "route geometry unavailable, drawing straight lines");
                false
            }
        }
    }

    // ========================================================================
    // Navigation and traffic
    // ========================================================================

    /// Activates the selected route on the shared coordinator.
    pub fn start_navigation(&self) -> bool {
        match self.routes().and_then(RouteSet::selected) {
            Some(route) => self.navigation.activate(route.clone()),
            None => false,
        }
    }

    /// Compares a live duration of the selected route against an
    /// alternative and stores a suggestion if switching pays off.
    pub fn evaluate_traffic(
        &mut self,
        live_secs: u64,
        alternative_secs: u64,
        alternative_index: usize,
    ) -> Option<&TrafficSuggestion> {
        let planned = self.routes()?.selected()?.total_duration_secs;
        let suggestion = TrafficSuggestion::evaluate(
            planned,
            live_secs,
            alternative_secs,
            alternative_index,
            self.traffic_thresholds,
        )?;
        self.navigation.raise_alert(
            NotificationKind::TrafficAlert,
            format!(
                "{}: a faster route saves {} min",
                suggestion.reason,
                suggestion.savings_secs() / 60
            ),
        );
        self.traffic_suggestion = Some(suggestion);
        self.traffic_suggestion.as_ref()
    }

    /// Switches to the suggested route. Returns false when there was no
    /// suggestion or it points outside the current route set.
    pub fn accept_traffic_suggestion(&mut self) -> bool {
        match self.traffic_suggestion.take() {
            Some(suggestion) => self.select_route(suggestion.suggested_route_index),
            None => false,
        }
    }

    pub fn dismiss_traffic_suggestion(&mut self) {
        self.traffic_suggestion = None;
    }
}
