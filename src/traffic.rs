//! Decides whether a faster alternative is worth suggesting when live
//! traffic slows the planned route down.
//!
//! Only the decision lives here. Fetching live durations and re-routing are
//! the caller's job.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficThresholds {
    /// Live delay over the planned duration before alternatives are considered.
    pub delay_secs: u64,
    /// How much faster than the live duration an alternative must be.
    pub min_savings_secs: u64,
}

impl Default for TrafficThresholds {
    fn default() -> Self {
        Self {
            delay_secs: 300,
            min_savings_secs: 120,
        }
    }
}

/// A faster alternative to the route currently being driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficSuggestion {
    /// Live duration of the current route.
    pub current_duration_secs: u64,
    pub suggested_duration_secs: u64,
    /// Live duration minus planned duration.
    pub traffic_delay_secs: u64,
    /// Index of the suggested route in the caller's route set.
    pub suggested_route_index: usize,
    pub reason: String,
    min_savings_secs: u64,
}

impl TrafficSuggestion {
    /// Returns a suggestion when the planned route is delayed by more than
    /// `thresholds.delay_secs` and `alternative_secs` beats the live
    /// duration by more than `thresholds.min_savings_secs`.
    pub fn evaluate(
        planned_secs: u64,
        live_secs: u64,
        alternative_secs: u64,
        suggested_route_index: usize,
        thresholds: TrafficThresholds,
    ) -> Option<Self> {
        let delay = live_secs.saturating_sub(planned_secs);
        if delay <= thresholds.delay_secs {
            return None;
        }
        if alternative_secs.saturating_add(thresholds.min_savings_secs) >= live_secs {
            return None;
        }
        Some(Self {
            current_duration_secs: live_secs,
            suggested_duration_secs: alternative_secs,
            traffic_delay_secs: delay,
            suggested_route_index,
            reason: "Heavy traffic detected".to_string(),
            min_savings_secs: thresholds.min_savings_secs,
        })
    }

    pub fn savings_secs(&self) -> u64 {
        self.current_duration_secs.saturating_sub(self.suggested_duration_secs)
    }

    pub fn has_significant_savings(&self) -> bool {
        self.savings_secs() >= self.min_savings_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_suggestion_without_delay() {
        assert!(TrafficSuggestion::evaluate(1000, 1200, 100, 1, TrafficThresholds::default()).is_none());
    }

    #[test]
    fn test_no_suggestion_when_alternative_barely_faster() {
        // Delayed by 600s, but the alternative saves only 60s.
        assert!(TrafficSuggestion::evaluate(1000, 1600, 1540, 1, TrafficThresholds::default()).is_none());
    }

    #[test]
    fn test_suggests_significantly_faster_alternative() {
        let suggestion = TrafficSuggestion::evaluate(1000, 1600, 1200, 2, TrafficThresholds::default())
            .expect("delay and savings both exceed thresholds");
        assert_eq!(suggestion.traffic_delay_secs, 600);
        assert_eq!(suggestion.savings_secs(), 400);
        assert_eq!(suggestion.suggested_route_index, 2);
        assert!(suggestion.has_significant_savings());
    }
}
