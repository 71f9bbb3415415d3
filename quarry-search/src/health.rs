//! Per-backend health tracking.
//!
//! Counts consecutive failures per backend and flags a backend unhealthy
//! once it fails repeatedly. After a cooldown the backend becomes half-open:
//! its next outcome decides whether it is restored or flagged again.
//!
//! Health is advisory. An unhealthy backend is still queried and reported;
//! only an explicit mark-down in the registry removes it from selection.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └────────┘             └────┬─────┘
//!     │                         ▲                      │
//!     │  success                │  failure              │
//!     └─────────────────────────┴──────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::BackendId;

/// Circuit state for a single backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CircuitState {
    /// Healthy.
    Closed,
    /// Failed too often; flagged unhealthy until the cooldown expires.
    Open,
    /// Cooldown elapsed; the next outcome decides.
    HalfOpen,
}

/// Health data for a single backend.
#[derive(Debug, Clone)]
pub struct BackendHealth {
    /// Current circuit state.
    pub state: CircuitState,
    /// Consecutive failures since the last success.
    pub consecutive_failures: u32,
    /// When the last failure occurred.
    pub last_failure_at: Option<Instant>,
    /// When the last success occurred.
    pub last_success_at: Option<Instant>,
}

impl Default for BackendHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
            last_success_at: None,
        }
    }
}

/// Tracks health for every backend that has reported an outcome.
#[derive(Debug)]
pub struct HealthTracker {
    failure_threshold: u32,
    cooldown: Duration,
    backends: HashMap<BackendId, BackendHealth>,
}

impl HealthTracker {
    /// Create a tracker that opens after `failure_threshold` consecutive failures.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            cooldown,
            backends: HashMap::new(),
        }
    }

    /// Record a successful call. Always closes the circuit.
    pub fn record_success(&mut self, id: BackendId) {
        let health = self.backends.entry(id).or_default();
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
        health.last_success_at = Some(Instant::now());
    }

    /// Record a failed call, opening the circuit at the threshold.
    pub fn record_failure(&mut self, id: BackendId) {
        let health = self.backends.entry(id).or_default();
        health.consecutive_failures += 1;
        health.last_failure_at = Some(Instant::now());

        if health.consecutive_failures >= self.failure_threshold {
            health.state = CircuitState::Open;
        }
    }

    /// Current state, moving Open to HalfOpen once the cooldown has elapsed.
    pub fn refresh(&mut self, id: BackendId) -> CircuitState {
        let cooldown = self.cooldown;
        let health = self.backends.entry(id).or_default();
        if health.state == CircuitState::Open
            && health.last_failure_at.is_none_or(|t| t.elapsed() >= cooldown)
        {
            health.state = CircuitState::HalfOpen;
        }
        health.state
    }

    /// Whether the backend is currently considered healthy.
    pub fn is_healthy(&mut self, id: BackendId) -> bool {
        self.refresh(id) != CircuitState::Open
    }

    /// State without side effects.
    pub fn state(&self, id: BackendId) -> CircuitState {
        self.backends
            .get(&id)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// `(backend, state, consecutive_failures)` for every tracked backend, in priority order.
    pub fn health_report(&self) -> Vec<(BackendId, CircuitState, u32)> {
        let mut report: Vec<_> = self
            .backends
            .iter()
            .map(|(id, health)| (*id, health.state, health.consecutive_failures))
            .collect();
        report.sort_by_key(|(id, _, _)| *id);
        report
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.backends.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(threshold: u32, cooldown_secs: u64) -> HealthTracker {
        HealthTracker::new(threshold, Duration::from_secs(cooldown_secs))
    }

    #[test]
    fn initial_state_is_closed() {
        let mut t = tracker(3, 60);
        assert_eq!(t.state(BackendId::FullText), CircuitState::Closed);
        assert!(t.is_healthy(BackendId::Catalog));
    }

    #[test]
    fn stays_closed_below_threshold() {
        let mut t = tracker(3, 60);
        t.record_failure(BackendId::Catalog);
        t.record_failure(BackendId::Catalog);
        assert_eq!(t.state(BackendId::Catalog), CircuitState::Closed);
        assert!(t.is_healthy(BackendId::Catalog));
    }

    #[test]
    fn opens_at_threshold() {
        let mut t = tracker(3, 60);
        for _ in 0..3 {
            t.record_failure(BackendId::Catalog);
        }
        assert_eq!(t.state(BackendId::Catalog), CircuitState::Open);
        assert!(!t.is_healthy(BackendId::Catalog));
        assert!(t.is_healthy(BackendId::FullText));
    }

    #[test]
    fn success_resets_failures() {
        let mut t = tracker(2, 60);
        t.record_failure(BackendId::Listing);
        t.record_success(BackendId::Listing);
        t.record_failure(BackendId::Listing);
        assert_eq!(t.state(BackendId::Listing), CircuitState::Closed);
    }

    #[test]
    fn open_becomes_half_open_after_cooldown() {
        let mut t = tracker(1, 0);
        t.record_failure(BackendId::FullText);
        assert_eq!(t.state(BackendId::FullText), CircuitState::Open);
        assert_eq!(t.refresh(BackendId::FullText), CircuitState::HalfOpen);
        assert!(t.is_healthy(BackendId::FullText));
    }

    #[test]
    fn half_open_failure_reopens() {
        let mut t = tracker(1, 0);
        t.record_failure(BackendId::FullText);
        t.refresh(BackendId::FullText);
        t.record_failure(BackendId::FullText);
        assert_eq!(t.state(BackendId::FullText), CircuitState::Open);
    }

    #[test]
    fn half_open_success_closes() {
        let mut t = tracker(1, 0);
        t.record_failure(BackendId::FullText);
        t.refresh(BackendId::FullText);
        t.record_success(BackendId::FullText);
        assert_eq!(t.state(BackendId::FullText), CircuitState::Closed);
    }

    #[test]
    fn report_is_in_priority_order() {
        let mut t = tracker(3, 60);
        t.record_failure(BackendId::Listing);
        t.record_success(BackendId::FullText);
        let report = t.health_report();
        assert_eq!(report[0].0, BackendId::FullText);
        assert_eq!(report[1], (BackendId::Listing, CircuitState::Closed, 1));
    }

    #[test]
    fn reset_clears_history() {
        let mut t = tracker(1, 60);
        t.record_failure(BackendId::Catalog);
        t.reset();
        assert!(t.health_report().is_empty());
        assert_eq!(t.state(BackendId::Catalog), CircuitState::Closed);
    }
}
