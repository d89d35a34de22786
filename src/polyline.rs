//! Polyline representation for route geometries.
//!
//! Geometry is kept as decoded coordinate sequences. The compact encoded
//! polyline format (precision 1e5, as emitted by OSRM and most directions
//! services) is handled by [`decode`] and [`encode`] at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

const PRECISION: f64 = 1e5;

/// A polyline representing a route geometry as decoded coordinates.
///
/// Each point is a (latitude, longitude) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Straight segments between consecutive stop locations. Used whenever
    /// road geometry is unavailable.
    pub fn straight_line(locations: &[(f64, f64)]) -> Self {
        Self::new(locations.to_vec())
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Decodes an encoded polyline string.
pub fn decode(encoded: &str) -> Result<Polyline, ProviderError> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        lng += decode_value(bytes, &mut index)?;
        points.push((lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(Polyline::new(points))
}

/// Encodes a polyline into the compact string format.
pub fn encode(polyline: &Polyline) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for &(lat, lng) in polyline.points() {
        let lat = (lat * PRECISION).round() as i64;
        let lng = (lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, ProviderError> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| ProviderError::malformed("truncated polyline"))?;
        *index += 1;
        if !(63..=126).contains(&byte) || shift > 60 {
            return Err(ProviderError::malformed(format!(
                "invalid polyline byte {byte} at {}",
                *index - 1
            )));
        }
        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(char::from((((value & 0x1f) | 0x20) + 63) as u8));
        value >>= 5;
    }
    out.push(char::from((value + 63) as u8));
}
