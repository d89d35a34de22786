//! Stops, routes and ranked route sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;

/// Id reserved for the trip origin.
pub const ORIGIN_ID: &str = "start";

/// Unique identifier for a stop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StopId(pub String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StopId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a stop may appear in an optimized order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionConstraint {
    /// Free to move during optimization.
    #[default]
    Unconstrained,
    /// Visited immediately after the origin.
    MustBeFirst,
    /// Visited at the end of the route.
    MustBeLast,
    /// Keeps its original slot among the movable stops.
    AnchoredInPlace,
}

impl PositionConstraint {
    /// Constraints that at most one stop may hold.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::MustBeFirst | Self::MustBeLast)
    }
}

/// A single location to visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub address: String,
    /// (lat, lng) in degrees.
    pub location: (f64, f64),
    /// Advisory position, reassigned after every reorder.
    pub sequence: usize,
    pub constraint: PositionConstraint,
}

impl Stop {
    pub fn new(id: impl Into<String>, name: impl Into<String>, location: (f64, f64)) -> Self {
        Self {
            id: StopId::new(id),
            name: name.into(),
            address: String::new(),
            location,
            sequence: 0,
            constraint: PositionConstraint::Unconstrained,
        }
    }

    /// Builds the trip origin stop.
    pub fn origin(name: impl Into<String>, location: (f64, f64)) -> Self {
        Self::new(ORIGIN_ID, name, location)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_constraint(mut self, constraint: PositionConstraint) -> Self {
        self.constraint = constraint;
        self
    }

    pub fn with_sequence(mut self, sequence: usize) -> Self {
        self.sequence = sequence;
        self
    }
}

/// The editable stop collection a caller assembles before optimizing.
///
/// Holds the at-most-one invariant for [`PositionConstraint::MustBeFirst`]
/// and [`PositionConstraint::MustBeLast`]: granting either to a stop clears
/// it from whichever stop held it before.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopList {
    stops: Vec<Stop>,
}

impl StopList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn get(&self, id: &StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    pub fn position(&self, id: &StopId) -> Option<usize> {
        self.stops.iter().position(|stop| &stop.id == id)
    }

    /// Appends a stop, applying its constraint with last-write-wins.
    ///
    /// Returns `false` and leaves the list untouched when the id is
    /// [`ORIGIN_ID`] or already in the list.
    pub fn push(&mut self, mut stop: Stop) -> bool {
        if stop.id.as_str() == ORIGIN_ID || self.position(&stop.id).is_some() {
            return false;
        }
        let constraint = stop.constraint;
        stop.sequence = self.stops.len();
        self.stops.push(stop);
        if constraint.is_exclusive() {
            let last = self.stops.len() - 1;
            self.release_exclusive(constraint, last);
        }
        true
    }

    pub fn remove(&mut self, id: &StopId) -> Option<Stop> {
        let index = self.position(id)?;
        let removed = self.stops.remove(index);
        self.resequence();
        Some(removed)
    }

    /// Sets a stop's constraint. Returns false if the stop is unknown.
    pub fn set_constraint(&mut self, id: &StopId, constraint: PositionConstraint) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.stops[index].constraint = constraint;
        if constraint.is_exclusive() {
            self.release_exclusive(constraint, index);
        }
        true
    }

    pub fn update_location(&mut self, id: &StopId, location: (f64, f64)) -> bool {
        match self.stops.iter_mut().find(|stop| &stop.id == id) {
            Some(stop) => {
                stop.location = location;
                true
            }
            None => false,
        }
    }

    pub fn move_up(&mut self, id: &StopId) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => {
                self.stops.swap(index - 1, index);
                self.resequence();
                true
            }
            _ => false,
        }
    }

    pub fn move_down(&mut self, id: &StopId) -> bool {
        match self.position(id) {
            Some(index) if index + 1 < self.stops.len() => {
                self.stops.swap(index, index + 1);
                self.resequence();
                true
            }
            _ => false,
        }
    }

    /// Moves the stop at `from` to `to`.
    ///
    /// Refused when either slot holds a constrained stop, or when an
    /// anchored stop lies between the two positions.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.stops.len() || to >= self.stops.len() {
            return false;
        }
        if !self.can_move(from) || self.stops[to].constraint != PositionConstraint::Unconstrained {
            return false;
        }
        let crosses_anchor = (from.min(to)..=from.max(to))
            .filter(|&i| i != from)
            .any(|i| self.stops[i].constraint == PositionConstraint::AnchoredInPlace);
        if crosses_anchor {
            return false;
        }

        let stop = self.stops.remove(from);
        self.stops.insert(to, stop);
        self.resequence();
        true
    }

    pub fn can_move(&self, index: usize) -> bool {
        self.stops
            .get(index)
            .is_some_and(|stop| stop.constraint == PositionConstraint::Unconstrained)
    }

    pub fn clear(&mut self) {
        self.stops.clear();
    }

    fn release_exclusive(&mut self, constraint: PositionConstraint, keep: usize) {
        for (index, stop) in self.stops.iter_mut().enumerate() {
            if index != keep && stop.constraint == constraint {
                stop.constraint = PositionConstraint::Unconstrained;
            }
        }
    }

    fn resequence(&mut self) {
        for (index, stop) in self.stops.iter_mut().enumerate() {
            stop.sequence = index;
        }
    }
}

/// Stops whose id is reserved or repeated are dropped.
impl From<Vec<Stop>> for StopList {
    fn from(stops: Vec<Stop>) -> Self {
        let mut list = StopList::new();
        for stop in stops {
            list.push(stop);
        }
        list
    }
}

/// One complete, costed visiting order. The origin is always first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub stops: Vec<Stop>,
    pub total_duration_secs: u64,
    pub total_distance_meters: u64,
    /// Duration saved relative to the slowest alternative it was ranked with.
    pub savings_secs: u64,
    /// Distance saved relative to the same reference route; may be negative.
    pub distance_savings_meters: i64,
    /// Road geometry, when a polyline provider supplied one.
    pub geometry: Option<Polyline>,
}

impl Route {
    pub fn new(stops: Vec<Stop>, total_duration_secs: u64, total_distance_meters: u64) -> Self {
        Self {
            stops,
            total_duration_secs,
            total_distance_meters,
            savings_secs: 0,
            distance_savings_meters: 0,
            geometry: None,
        }
    }

    pub fn stop_ids(&self) -> Vec<&StopId> {
        self.stops.iter().map(|stop| &stop.id).collect()
    }

    pub fn locations(&self) -> Vec<(f64, f64)> {
        self.stops.iter().map(|stop| stop.location).collect()
    }

    /// Stops excluding the origin.
    pub fn stop_count(&self) -> usize {
        self.stops.len().saturating_sub(1)
    }

    /// Geometry to draw: the provider polyline, or straight segments
    /// between stops when none was fetched.
    pub fn path(&self) -> Polyline {
        match &self.geometry {
            Some(geometry) if !geometry.points().is_empty() => geometry.clone(),
            _ => Polyline::straight_line(&self.locations()),
        }
    }
}

/// Ranked alternatives, fastest first, plus the caller's selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSet {
    routes: Vec<Route>,
    selected: usize,
}

impl RouteSet {
    /// Wraps already-ranked routes. Selection defaults to the best route.
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            selected: 0,
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn routes_mut(&mut self) -> &mut [Route] {
        &mut self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn best(&self) -> Option<&Route> {
        self.routes.first()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Route> {
        self.routes.get(self.selected).or_else(|| self.best())
    }

    pub fn selected_mut(&mut self) -> Option<&mut Route> {
        let index = if self.selected < self.routes.len() { self.selected } else { 0 };
        self.routes.get_mut(index)
    }

    /// Selects an alternative. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.routes.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }
}
