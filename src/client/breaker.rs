//! Per-endpoint circuit breaker.
//!
//! # States
//! - Closed: requests pass through
//! - Open: requests are rejected without touching the network
//! - Half-Open: cooldown elapsed, a probe is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures >= threshold within the rolling window
//! Open → Half-Open: cooldown elapsed since the last failure
//! Half-Open → Closed: probe succeeds (entry is deleted)
//! Half-Open → Open: probe fails
//! ```
//!
//! Entries are created on the first recorded failure for a key. Each
//! operation takes the map lock briefly; the check and the later
//! success/failure record are separate critical sections, so concurrent
//! callers can all observe Half-Open and each send a probe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

use super::transport::RequestMethod;
use crate::config::ClientConfig;

/// Mode of one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Read-only view of one circuit, as reported by diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub failures: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub state: CircuitState,
}

/// Outcome of the pre-request check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No entry or closed.
    Allowed,
    /// Cooldown elapsed; this request is a half-open probe.
    Probe,
    /// Circuit is open.
    Rejected { retry_after: Duration },
}

#[derive(Debug)]
struct CircuitEntry {
    failures: u32,
    last_failure: Option<Instant>,
    last_failure_at: Option<DateTime<Utc>>,
    state: CircuitState,
}

impl CircuitEntry {
    fn new() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            last_failure_at: None,
            state: CircuitState::Closed,
        }
    }
}

/// Builds the breaker key `METHOD:origin+path`. The query string is not part
/// of the key.
pub fn circuit_key(method: RequestMethod, url: &Url) -> String {
    format!(
        "{}:{}{}",
        method,
        url.origin().ascii_serialization(),
        url.path()
    )
}

/// Registry of circuits keyed by [`circuit_key`].
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    window: Duration,
    cooldown: Duration,
    entries: Mutex<HashMap<String, CircuitEntry>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            threshold,
            window,
            cooldown,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.circuit_breaker_threshold,
            config.circuit_breaker_window(),
            config.circuit_breaker_cooldown(),
        )
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CircuitEntry>> {
        // a panic while holding the lock leaves plain counters behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Decides whether a request for `key` may go out, moving an open
    /// circuit to half-open once its cooldown has elapsed.
    pub fn check(&self, key: &str) -> Admission {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return Admission::Allowed;
        };

        match entry.state {
            CircuitState::Closed => Admission::Allowed,
            CircuitState::HalfOpen => Admission::Probe,
            CircuitState::Open => {
                let elapsed = entry
                    .last_failure
                    .map(|t| Instant::now().saturating_duration_since(t))
                    .unwrap_or(self.cooldown);

                if elapsed >= self.cooldown {
                    entry.state = CircuitState::HalfOpen;
                    info!(key = %key, "Circuit breaker -> half-open");
                    Admission::Probe
                } else {
                    Admission::Rejected {
                        retry_after: self.cooldown - elapsed,
                    }
                }
            }
        }
    }

    /// Records a completed request. Only a half-open circuit reacts: its
    /// entry is removed, which closes it.
    pub fn record_success(&self, key: &str) {
        let mut entries = self.entries();
        if entries
            .get(key)
            .is_some_and(|e| e.state == CircuitState::HalfOpen)
        {
            entries.remove(key);
            info!(key = %key, "Circuit breaker -> closed (success)");
        }
    }

    /// Records a request that exhausted its attempts.
    pub fn record_failure(&self, key: &str) {
        let now = Instant::now();
        let mut entries = self.entries();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(CircuitEntry::new);

        let outside_window = entry
            .last_failure
            .map_or(true, |t| now.saturating_duration_since(t) > self.window);
        if outside_window {
            entry.failures = 0;
        }

        entry.failures = entry.failures.saturating_add(1);
        entry.last_failure = Some(now);
        entry.last_failure_at = Some(Utc::now());

        let reopen = entry.state == CircuitState::HalfOpen;
        if entry.failures >= self.threshold || reopen {
            if entry.state != CircuitState::Open {
                warn!(key = %key, failures = entry.failures, "Circuit breaker -> OPEN");
            }
            entry.state = CircuitState::Open;
        }
    }

    /// Current state of `key`, or `None` when nothing has been recorded.
    pub fn state(&self, key: &str) -> Option<CircuitState> {
        self.entries().get(key).map(|e| e.state)
    }

    /// Copies every tracked circuit.
    pub fn snapshot(&self) -> HashMap<String, CircuitSnapshot> {
        self.entries()
            .iter()
            .map(|(key, entry)| {
                (
                    key.clone(),
                    CircuitSnapshot {
                        failures: entry.failures,
                        last_failure_time: entry.last_failure_at,
                        state: entry.state,
                    },
                )
            })
            .collect()
    }

    /// Returns true when any circuit is open.
    pub fn any_open(&self) -> bool {
        self.entries()
            .values()
            .any(|e| e.state == CircuitState::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "GET:https://api.example.com/financier/pending";

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_secs(60), Duration::from_secs(30))
    }

    #[test]
    fn test_circuit_key_ignores_query() {
        let a = Url::parse("https://api.example.com/financier/pending?search=a").unwrap();
        let b = Url::parse("https://api.example.com/financier/pending?search=b").unwrap();
        let c = Url::parse("https://api.example.com/financier/approved").unwrap();

        assert_eq!(circuit_key(RequestMethod::Get, &a), KEY);
        assert_eq!(circuit_key(RequestMethod::Get, &a), circuit_key(RequestMethod::Get, &b));
        assert_ne!(circuit_key(RequestMethod::Get, &a), circuit_key(RequestMethod::Get, &c));
        assert_ne!(circuit_key(RequestMethod::Get, &a), circuit_key(RequestMethod::Post, &a));
    }

    #[test]
    fn test_circuit_key_keeps_port() {
        let url = Url::parse("http://127.0.0.1:8081/mvd/approve/7?x=1").unwrap();
        assert_eq!(
            circuit_key(RequestMethod::Post, &url),
            "POST:http://127.0.0.1:8081/mvd/approve/7"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_key_is_allowed() {
        let breaker = breaker();
        assert_eq!(breaker.check(KEY), Admission::Allowed);
        assert!(breaker.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let breaker = breaker();
        breaker.record_failure(KEY);
        breaker.record_failure(KEY);
        assert_eq!(breaker.state(KEY), Some(CircuitState::Closed));
        assert_eq!(breaker.check(KEY), Admission::Allowed);

        breaker.record_failure(KEY);
        assert_eq!(breaker.state(KEY), Some(CircuitState::Open));
        assert!(breaker.any_open());
        assert!(matches!(breaker.check(KEY), Admission::Rejected { .. }));

        let snapshot = breaker.snapshot();
        let entry = snapshot.get(KEY).unwrap();
        assert_eq!(entry.failures, 3);
        assert_eq!(entry.state, CircuitState::Open);
        assert!(entry.last_failure_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_counter() {
        let breaker = breaker();
        breaker.record_failure(KEY);
        breaker.record_failure(KEY);

        tokio::time::advance(Duration::from_secs(61)).await;
        breaker.record_failure(KEY);

        assert_eq!(breaker.snapshot().get(KEY).unwrap().failures, 1);
        assert_eq!(breaker.state(KEY), Some(CircuitState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_moves_to_half_open() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(KEY);
        }

        tokio::time::advance(Duration::from_secs(29)).await;
        match breaker.check(KEY) {
            Admission::Rejected { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(1));
            }
            other => panic!("Expected rejection, got {:?}", other),
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(breaker.check(KEY), Admission::Probe);
        assert_eq!(breaker.state(KEY), Some(CircuitState::HalfOpen));
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_success_deletes_entry() {
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breaker.check(KEY), Admission::Probe);

        breaker.record_success(KEY);
        assert_eq!(breaker.state(KEY), None);
        assert_eq!(breaker.check(KEY), Admission::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_while_closed_keeps_counter() {
        let breaker = breaker();
        breaker.record_failure(KEY);
        breaker.record_failure(KEY);
        breaker.record_success(KEY);

        assert_eq!(breaker.snapshot().get(KEY).unwrap().failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens_even_after_window() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(10), Duration::from_secs(30));
        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(breaker.check(KEY), Admission::Probe);

        // window (10s) has passed, so the counter restarts at 1
        breaker.record_failure(KEY);
        let snapshot = breaker.snapshot();
        let entry = snapshot.get(KEY).unwrap();
        assert_eq!(entry.failures, 1);
        assert_eq!(entry.state, CircuitState::Open);
        assert!(matches!(breaker.check(KEY), Admission::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_probes_are_all_admitted() {
        // Check and record are separate critical sections: two callers that
        // both arrive after the cooldown are both let through as probes.
        let breaker = breaker();
        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(breaker.check(KEY), Admission::Probe);
        assert_eq!(breaker.check(KEY), Admission::Probe);
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&CircuitState::HalfOpen).unwrap(),
            "\"half-open\""
        );
        assert_eq!(CircuitState::Open.to_string(), "open");
    }
}
