//! Per-downstream circuit breaker for fault tolerance.
//!
//! Implements the circuit breaker pattern to stop hammering a downstream that is
//! already failing. The circuit has three states:
//!
//! - **Closed**: Normal operation, calls are allowed through.
//! - **Open**: Downstream is failing, calls are rejected without a network attempt.
//! - **HalfOpen**: Cool-down elapsed, exactly one probe call is in flight.
//!
//! Failures are counted inside a rolling time window. The circuit opens once the
//! window holds at least `failure_threshold` failures and the failure rate reaches
//! `failure_rate_threshold`. State is in-memory and resets on restart.

use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

/// Type alias for downstream identifier.
pub type DownstreamId = Cow<'static, str>;

/// Default number of failures inside the window before opening the circuit.
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default failure rate (failed / total calls in the window) needed to open.
const DEFAULT_FAILURE_RATE_THRESHOLD: f64 = 0.5;

/// Default rolling window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default time to wait before letting a probe through an open circuit.
const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(30);

/// Circuit breaker state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    /// Normal operation - calls are allowed.
    Closed,
    /// Downstream is failing - calls are short-circuited.
    Open,
    /// Testing recovery - a single probe call is allowed.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "Closed"),
            Self::Open => write!(f, "Open"),
            Self::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Internal circuit state for a single downstream.
#[derive(Debug)]
struct Circuit {
    state: CircuitState,
    /// Call results inside the rolling window: (completed at, failed).
    window: VecDeque<(Instant, bool)>,
    /// When the circuit last transitioned to Open.
    opened_at: Option<Instant>,
    /// Whether the single HalfOpen probe has been handed out.
    probe_in_flight: bool,
    last_failure: Option<Instant>,
}

impl Circuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            probe_in_flight: false,
            last_failure: None,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some((at, _)) = self.window.front() {
            if now.duration_since(*at) > window {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn failures(&self) -> u32 {
        self.window.iter().filter(|(_, failed)| *failed).count() as u32
    }

    fn failure_rate(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        self.failures() as f64 / self.window.len() as f64
    }

    fn open(&mut self, now: Instant) {
        self.state = CircuitState::Open;
        self.opened_at = Some(now);
        self.probe_in_flight = false;
    }

    fn close(&mut self) {
        self.state = CircuitState::Closed;
        self.window.clear();
        self.opened_at = None;
        self.probe_in_flight = false;
        self.last_failure = None;
    }
}

/// Circuit breaker configuration.
#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Minimum failures inside the window before the circuit may open.
    pub failure_threshold: u32,
    /// Failure rate (0.0 to 1.0) inside the window needed to open.
    pub failure_rate_threshold: f64,
    /// Length of the rolling window.
    pub window: Duration,
    /// Time to wait in Open before allowing the probe.
    pub cool_down: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            failure_rate_threshold: DEFAULT_FAILURE_RATE_THRESHOLD,
            window: DEFAULT_WINDOW,
            cool_down: DEFAULT_COOL_DOWN,
        }
    }
}

/// Per-downstream circuit breaker.
///
/// Thread-safe; shared between every client that talks to the same downstream.
/// Callers never see the lock: they ask for a [`CallPermit`] and settle it.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default settings.
    pub fn new() -> Self {
        Self::with_config(CircuitBreakerConfig::default())
    }

    /// Create a circuit breaker with custom configuration.
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Lock the circuits mutex, recovering from poison if necessary.
    ///
    /// A poisoned lock means a panic mid-update; slightly stale circuit state is
    /// acceptable, a panic in every later caller is not.
    fn lock_circuits(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Ask permission to call a downstream.
    ///
    /// Returns `None` while the circuit is Open and cooling down, or while the
    /// HalfOpen probe is already in flight. The first caller after the cool-down
    /// receives the probe permit and moves the circuit to HalfOpen.
    pub fn try_acquire(&self, downstream: &DownstreamId) -> Option<CallPermit<'_>> {
        let mut circuits = self.lock_circuits();

        let circuit = circuits
            .entry(downstream.to_string())
            .or_insert_with(Circuit::new);

        let probe = match circuit.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => {
                if circuit.probe_in_flight {
                    debug!(
                        "Circuit breaker: probe for '{}' already in flight, rejecting",
                        downstream
                    );
                    return None;
                }
                circuit.probe_in_flight = true;
                true
            }
            CircuitState::Open => {
                let cooled = circuit
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.cool_down);
                if !cooled {
                    return None;
                }
                info!(
                    "Circuit breaker: transitioning '{}' from Open to HalfOpen",
                    downstream
                );
                circuit.state = CircuitState::HalfOpen;
                circuit.probe_in_flight = true;
                true
            }
        };

        Some(CallPermit {
            breaker: self,
            downstream: downstream.clone(),
            probe,
            settled: false,
        })
    }

    /// Check if a call would currently be allowed, without taking a permit.
    pub fn is_allowed(&self, downstream: &DownstreamId) -> bool {
        let circuits = self.lock_circuits();

        match circuits.get(downstream.as_ref()) {
            None => true,
            Some(circuit) => match circuit.state {
                CircuitState::Closed => true,
                CircuitState::HalfOpen => !circuit.probe_in_flight,
                CircuitState::Open => circuit
                    .opened_at
                    .map_or(true, |opened| opened.elapsed() >= self.config.cool_down),
            },
        }
    }

    /// Record a successful call for a downstream.
    ///
    /// In Closed state: adds a success to the window.
    /// In HalfOpen state: the probe succeeded, the circuit closes.
    pub fn record_success(&self, downstream: &DownstreamId) {
        self.settle(downstream, false, true);
    }

    /// Record a failed call for a downstream.
    ///
    /// Adds a failure to the window and may open the circuit.
    /// In HalfOpen state, the failed probe immediately reopens it.
    pub fn record_failure(&self, downstream: &DownstreamId) {
        self.settle(downstream, true, true);
    }

    fn settle(&self, downstream: &DownstreamId, failed: bool, probe: bool) {
        let mut circuits = self.lock_circuits();

        let circuit = circuits
            .entry(downstream.to_string())
            .or_insert_with(Circuit::new);

        let now = Instant::now();
        if failed {
            circuit.last_failure = Some(now);
        }

        match circuit.state {
            CircuitState::Closed => {
                circuit.window.push_back((now, failed));
                circuit.prune(now, self.config.window);

                if !failed {
                    return;
                }

                let failures = circuit.failures();
                let rate = circuit.failure_rate();
                if failures >= self.config.failure_threshold
                    && rate >= self.config.failure_rate_threshold
                {
                    info!(
                        "Circuit breaker: opening circuit for '{}' after {} failures ({:.0}% of window)",
                        downstream,
                        failures,
                        rate * 100.0
                    );
                    circuit.open(now);
                } else {
                    debug!(
                        "Circuit breaker: failure for '{}' ({}/{})",
                        downstream, failures, self.config.failure_threshold
                    );
                }
            }
            CircuitState::HalfOpen if probe => {
                if failed {
                    info!(
                        "Circuit breaker: reopening circuit for '{}' after failed probe",
                        downstream
                    );
                    circuit.open(now);
                } else {
                    info!(
                        "Circuit breaker: closing circuit for '{}' after successful probe",
                        downstream
                    );
                    circuit.close();
                }
            }
            CircuitState::HalfOpen => {
                // A call admitted before the circuit opened finished late; only the probe decides.
                debug!(
                    "Circuit breaker: ignoring late result for '{}' while probing",
                    downstream
                );
            }
            CircuitState::Open => {
                debug!(
                    "Circuit breaker: late result for '{}' (already open)",
                    downstream
                );
            }
        }
    }

    fn release_probe(&self, downstream: &DownstreamId) {
        let mut circuits = self.lock_circuits();

        if let Some(circuit) = circuits.get_mut(downstream.as_ref()) {
            if circuit.state == CircuitState::HalfOpen {
                debug!(
                    "Circuit breaker: probe for '{}' abandoned, next caller may probe",
                    downstream
                );
                circuit.probe_in_flight = false;
            }
        }
    }

    /// Get the current state for a downstream.
    pub fn state(&self, downstream: &DownstreamId) -> CircuitState {
        let circuits = self.lock_circuits();

        circuits
            .get(downstream.as_ref())
            .map(|c| c.state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Get the number of failures currently inside the window.
    pub fn failure_count(&self, downstream: &DownstreamId) -> u32 {
        let mut circuits = self.lock_circuits();
        let now = Instant::now();

        circuits
            .get_mut(downstream.as_ref())
            .map(|c| {
                c.prune(now, self.config.window);
                c.failures()
            })
            .unwrap_or(0)
    }

    /// Reset the circuit for a downstream to Closed state.
    pub fn reset(&self, downstream: &DownstreamId) {
        let mut circuits = self.lock_circuits();

        if let Some(circuit) = circuits.get_mut(downstream.as_ref()) {
            info!(
                "Circuit breaker: manually resetting circuit for '{}'",
                downstream
            );
            circuit.close();
        }
    }

    /// Reset all circuits to their initial state.
    pub fn reset_all(&self) {
        let mut circuits = self.lock_circuits();
        circuits.clear();
        info!("Circuit breaker: all circuits reset");
    }

    /// Get metrics for all tracked downstreams.
    pub fn metrics(&self) -> Vec<CircuitMetrics> {
        let mut circuits = self.lock_circuits();
        let now = Instant::now();

        circuits
            .iter_mut()
            .map(|(downstream, circuit)| {
                circuit.prune(now, self.config.window);
                CircuitMetrics {
                    downstream: downstream.clone(),
                    state: circuit.state,
                    failure_count: circuit.failures(),
                    calls_in_window: circuit.window.len() as u32,
                    last_failure: circuit.last_failure,
                }
            })
            .collect()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

/// Permission for one call, handed out by [`CircuitBreaker::try_acquire`].
///
/// Settle it with [`record_success`](Self::record_success) or
/// [`record_failure`](Self::record_failure). A probe permit dropped unsettled
/// (for example because its task was cancelled) frees the probe slot again.
#[must_use = "an unsettled permit records nothing"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    downstream: DownstreamId,
    probe: bool,
    settled: bool,
}

impl CallPermit<'_> {
    /// Whether this permit is the single HalfOpen probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn record_success(mut self) {
        self.settled = true;
        self.breaker.settle(&self.downstream, false, self.probe);
    }

    pub fn record_failure(mut self) {
        self.settled = true;
        self.breaker.settle(&self.downstream, true, self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe(&self.downstream);
        }
    }
}

/// Metrics for a single circuit.
#[derive(Clone, Debug)]
pub struct CircuitMetrics {
    pub downstream: String,
    pub state: CircuitState,
    /// Failures inside the current window.
    pub failure_count: u32,
    pub calls_in_window: u32,
    pub last_failure: Option<Instant>,
}
