//! Shared test fixtures: real Las Vegas / Henderson coordinates (routable
//! with the OSRM Nevada extract) and stop builders.

#![allow(dead_code)]

use route_navigator::{PositionConstraint, Stop};

/// A named place.
#[derive(Debug, Clone, Copy)]
pub struct Place {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Place {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

pub const HOME: Place = Place::new("Bellagio", 36.1126, -115.1767);

/// Spread across the metro area, north to Henderson.
pub const ERRANDS: &[Place] = &[
    Place::new("Wynn Las Vegas", 36.1263781, -115.1658180),
    Place::new("MGM Grand", 36.1023654, -115.1688720),
    Place::new("Beers and Bets", 36.1428945, -115.1573836),
    Place::new("Bootlegger Bistro", 36.0492047, -115.1715744),
    Place::new("Sunset Station Area", 36.0614, -115.0631),
    Place::new("Green Valley Ranch Area", 36.0308, -115.0825),
    Place::new("Longhorn Casino", 36.1070664, -115.0591256),
    Place::new("I Love Sushi Henderson", 35.9916660, -115.1028343),
    Place::new("Islander's Grill", 36.0335058, -114.9856162),
    Place::new("Rivas Mexican Grill North", 36.1450055, -115.0482587),
];

/// Builder for test stops with sensible defaults.
#[derive(Debug, Clone)]
pub struct TestStop {
    id: String,
    name: String,
    location: (f64, f64),
    constraint: PositionConstraint,
}

impl TestStop {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_uppercase(),
            location: (0.0, 0.0),
            constraint: PositionConstraint::Unconstrained,
        }
    }

    pub fn at(place: &Place, id: &str) -> Self {
        Self::new(id).name(place.name).location(place.lat, place.lng)
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn location(mut self, lat: f64, lng: f64) -> Self {
        self.location = (lat, lng);
        self
    }

    pub fn first(mut self) -> Self {
        self.constraint = PositionConstraint::MustBeFirst;
        self
    }

    pub fn last(mut self) -> Self {
        self.constraint = PositionConstraint::MustBeLast;
        self
    }

    pub fn anchored(mut self) -> Self {
        self.constraint = PositionConstraint::AnchoredInPlace;
        self
    }

    pub fn build(self) -> Stop {
        Stop::new(self.id, self.name, self.location).with_constraint(self.constraint)
    }
}

/// One stop per errand, ids `e0`, `e1`, ...
pub fn errand_stops(count: usize) -> Vec<Stop> {
    ERRANDS
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, place)| TestStop::at(place, &format!("e{i}")).build())
        .collect()
}

pub fn ids(stops: &[Stop]) -> Vec<&str> {
    stops.iter().map(|stop| stop.id.as_str()).collect()
}
