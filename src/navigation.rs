//! Navigation state coordinator.
//!
//! Single owner of the active route and of the progress through it, shared
//! between every surface that shows or drives navigation (handheld display,
//! in-vehicle display, ...). Each surface holds a cloned
//! [`NavigationCoordinator`] handle; all of them see the same state.
//!
//! The route, the pointer, the lifecycle and the notification slot are
//! guarded by one lock, so readers never observe a half-applied transition.
//! Operations that do not apply to the current state are ignored and report
//! `false`; nothing here returns an error.
//!
//! Notifications are a single-slot mailbox: a new one replaces any unread
//! one. Observers are only guaranteed the latest.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::{Route, Stop, StopId};

/// Navigation lifecycle.
///
/// `Idle -> Navigating <-> Paused`, `Navigating -> Completed`; `stop()`
/// returns to `Idle` from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Idle,
    Navigating,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationKind {
    RouteUpdated,
    NavigationStarted,
    NavigationPaused,
    NavigationResumed,
    NavigationStopped,
    StopCompleted,
    StopSkipped,
    StopAdded,
    StopRemoved,
    RouteCompleted,
    Rerouting,
    TrafficAlert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    /// Milliseconds since the unix epoch.
    pub timestamp_ms: u64,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        Self {
            kind,
            message: message.into(),
            timestamp_ms,
        }
    }
}

/// Consistent copy of the coordinator state at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSnapshot {
    pub lifecycle: Lifecycle,
    pub pointer: usize,
    pub route: Option<Route>,
    pub current_stop: Option<Stop>,
    pub next_stop: Option<Stop>,
    pub remaining: usize,
    pub notification: Option<Notification>,
    /// Stop list last mirrored by the planning surface.
    pub published_stops: Vec<Stop>,
    /// Increases on every applied transition.
    pub revision: u64,
}

#[derive(Debug, Default)]
struct State {
    route: Option<Route>,
    pointer: usize,
    lifecycle: Lifecycle,
    notification: Option<Notification>,
    published_stops: Vec<Stop>,
    revision: u64,
}

impl State {
    fn stops(&self) -> &[Stop] {
        self.route.as_ref().map_or(&[], |route| route.stops.as_slice())
    }

    fn current_stop(&self) -> Option<&Stop> {
        self.stops().get(self.pointer)
    }

    fn next_stop(&self) -> Option<&Stop> {
        self.stops().get(self.pointer + 1)
    }

    fn remaining(&self) -> usize {
        self.stops().len().saturating_sub(self.pointer + 1)
    }

    fn has_next(&self) -> bool {
        self.pointer + 1 < self.stops().len()
    }

    fn is_editable(&self) -> bool {
        self.route.is_some() && matches!(self.lifecycle, Lifecycle::Navigating | Lifecycle::Paused)
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notification = Some(Notification::new(kind, message));
    }

    fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            lifecycle: self.lifecycle,
            pointer: self.pointer,
            route: self.route.clone(),
            current_stop: self.current_stop().cloned(),
            next_stop: self.next_stop().cloned(),
            remaining: self.remaining(),
            notification: self.notification.clone(),
            published_stops: self.published_stops.clone(),
            revision: self.revision,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

/// Handle to the shared navigation state. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct NavigationCoordinator {
    shared: Arc<Shared>,
}

impl NavigationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `transition` under the lock; when it reports a change the
    /// revision is bumped and waiting observers are woken.
    fn apply<F>(&self, operation: &'static str, transition: F) -> bool
    where
        F: FnOnce(&mut State) -> bool,
    {
        let mut state = self.shared.state.lock();
        let applied = transition(&mut *state);
        if applied {
            state.revision += 1;
            debug!(
                operation,
                lifecycle = ?state.lifecycle,
                pointer = state.pointer,
                revision = state.revision,
                "navigation state changed"
            );
            self.shared.changed.notify_all();
        } else {
            debug!(operation, lifecycle = ?state.lifecycle, "navigation operation ignored");
        }
        applied
    }

    /// Makes `route` the active route and starts navigating from its first
    /// stop. Replaces any previous route.
    pub fn activate(&self, route: Route) -> bool {
        self.apply("activate", |state| {
            info!(stops = route.stops.len(), "navigation started");
            let message = format!("Navigation started: {} stops", route.stop_count());
            state.route = Some(route);
            state.pointer = 0;
            state.lifecycle = Lifecycle::Navigating;
            state.notify(NotificationKind::NavigationStarted, message);
            true
        })
    }

    pub fn pause(&self) -> bool {
        self.apply("pause", |state| {
            if state.lifecycle != Lifecycle::Navigating {
                return false;
            }
            state.lifecycle = Lifecycle::Paused;
            state.notify(NotificationKind::NavigationPaused, "Navigation paused");
            true
        })
    }

    pub fn resume(&self) -> bool {
        self.apply("resume", |state| {
            if state.lifecycle != Lifecycle::Paused {
                return false;
            }
            state.lifecycle = Lifecycle::Navigating;
            state.notify(NotificationKind::NavigationResumed, "Navigation resumed");
            true
        })
    }

    /// Drops the active route and returns to `Idle`.
    pub fn stop(&self) -> bool {
        self.apply("stop", |state| {
            if state.lifecycle == Lifecycle::Idle && state.route.is_none() {
                return false;
            }
            info!("navigation stopped");
            state.route = None;
            state.pointer = 0;
            state.lifecycle = Lifecycle::Idle;
            state.notify(NotificationKind::NavigationStopped, "Navigation stopped");
            true
        })
    }

    /// Marks the current stop done. Moves to the next stop, or completes
    /// the route when there is none.
    pub fn advance(&self) -> bool {
        self.apply("advance", |state| {
            if state.lifecycle != Lifecycle::Navigating || state.route.is_none() {
                return false;
            }
            if state.has_next() {
                state.pointer += 1;
                let name = state.current_stop().map(|stop| stop.name.clone()).unwrap_or_default();
                state.notify(NotificationKind::StopCompleted, format!("Next: {name}"));
            } else {
                info!("route completed");
                state.lifecycle = Lifecycle::Completed;
                state.notify(NotificationKind::RouteCompleted, "Route completed!");
            }
            true
        })
    }

    /// Moves past the current stop without completing it. Ignored on the
    /// last stop.
    pub fn skip(&self) -> bool {
        self.apply("skip", |state| {
            if state.lifecycle != Lifecycle::Navigating || !state.has_next() {
                return false;
            }
            let name = state.current_stop().map(|stop| stop.name.clone()).unwrap_or_default();
            state.pointer += 1;
            state.notify(NotificationKind::StopSkipped, format!("Skipped: {name}"));
            true
        })
    }

    /// Inserts `stop` right after the current stop. The pointer stays put.
    pub fn insert_stop(&self, stop: Stop) -> bool {
        self.apply("insert_stop", |state| {
            if !state.is_editable() {
                return false;
            }
            let at = state.pointer + 1;
            let message = format!("Stop added: {}", stop.name);
            if let Some(route) = state.route.as_mut() {
                let at = at.min(route.stops.len());
                route.stops.insert(at, stop);
                resequence(route);
            }
            state.notify(NotificationKind::StopAdded, message);
            true
        })
    }

    /// Removes the stop with `id` from the active route.
    ///
    /// Removing the current stop or one before it moves the pointer back by
    /// one, so it keeps pointing at the same place in the trip.
    pub fn remove_stop(&self, id: &StopId) -> bool {
        self.apply("remove_stop", |state| {
            if !state.is_editable() {
                return false;
            }
            let pointer = state.pointer;
            let Some(route) = state.route.as_mut() else {
                return false;
            };
            let Some(index) = route.stops.iter().position(|stop| &stop.id == id) else {
                return false;
            };
            let removed = route.stops.remove(index);
            resequence(route);
            let len = route.stops.len();

            let mut pointer = if index <= pointer { pointer.saturating_sub(1) } else { pointer };
            pointer = pointer.min(len.saturating_sub(1));
            state.pointer = pointer;
            state.notify(NotificationKind::StopRemoved, format!("Stop removed: {}", removed.name));
            true
        })
    }

    /// Mirrors the planning surface's stop list to every observer.
    pub fn publish_stops(&self, stops: &[Stop]) -> bool {
        self.apply("publish_stops", |state| {
            state.published_stops = stops.to_vec();
            state.notify(
                NotificationKind::RouteUpdated,
                format!("Route updated: {} stops", stops.len()),
            );
            true
        })
    }

    /// Posts an externally originated notice (traffic, rerouting) to the
    /// notification slot.
    pub fn raise_alert(&self, kind: NotificationKind, message: impl Into<String>) -> bool {
        let message = message.into();
        self.apply("raise_alert", |state| {
            state.notify(kind, message);
            true
        })
    }

    /// Resets every piece of state, as on logout.
    pub fn clear(&self) {
        self.apply("clear", |state| {
            let revision = state.revision;
            *state = State {
                revision,
                ..State::default()
            };
            true
        });
    }

    pub fn clear_notification(&self) -> bool {
        self.apply("clear_notification", |state| state.notification.take().is_some())
    }

    /// Consumes the pending notification, if any.
    pub fn take_notification(&self) -> Option<Notification> {
        let mut taken = None;
        self.apply("take_notification", |state| {
            taken = state.notification.take();
            taken.is_some()
        });
        taken
    }

    pub fn notification(&self) -> Option<Notification> {
        self.shared.state.lock().notification.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.state.lock().lifecycle
    }

    pub fn pointer(&self) -> usize {
        self.shared.state.lock().pointer
    }

    pub fn active_route(&self) -> Option<Route> {
        self.shared.state.lock().route.clone()
    }

    pub fn current_stop(&self) -> Option<Stop> {
        self.shared.state.lock().current_stop().cloned()
    }

    pub fn next_stop(&self) -> Option<Stop> {
        self.shared.state.lock().next_stop().cloned()
    }

    /// Stops after the current one.
    pub fn remaining_count(&self) -> usize {
        self.shared.state.lock().remaining()
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Registers an observer that has seen the current state.
    pub fn subscribe(&self) -> Observer {
        let seen = self.shared.state.lock().revision;
        Observer {
            shared: Arc::clone(&self.shared),
            seen,
        }
    }
}

fn resequence(route: &mut Route) {
    for (index, stop) in route.stops.iter_mut().enumerate() {
        stop.sequence = index;
    }
}

/// Change feed for one observing surface.
#[derive(Debug)]
pub struct Observer {
    shared: Arc<Shared>,
    seen: u64,
}

impl Observer {
    /// Returns a snapshot if anything changed since the last one this
    /// observer received.
    pub fn poll(&mut self) -> Option<NavigationSnapshot> {
        let state = self.shared.state.lock();
        if state.revision == self.seen {
            return None;
        }
        self.seen = state.revision;
        Some(state.snapshot())
    }

    /// Blocks until the state changes or `timeout` elapses.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<NavigationSnapshot> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.revision == self.seen {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if state.revision == self.seen {
            return None;
        }
        self.seen = state.revision;
        Some(state.snapshot())
    }
}
