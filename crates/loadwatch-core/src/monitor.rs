//! Stateful degradation monitor: polling loop, lifecycle, accounting.
//!
//! One background task per monitor owns all state mutation; read-only
//! accessors take a short mutex from any thread and never race the loop.
//!
//! # Integration
//!
//! ```text
//! harness metrics ──► MetricsProvider::sample() ──► classifier
//!                                                      │ level change
//!                             StrategyRegistry ◄───────┤
//!                             (callbacks, in order)    │
//!                             history / counters ◄─────┘
//! ```
//!
//! # Ordering
//!
//! On a transition the monitor records the event, dispatches strategy
//! callbacks, and only then stores the new `current_level`; statistics
//! read from inside a callback therefore still report the previous
//! level. Re-entering the level already in effect produces no event and
//! no callbacks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::classifier::detect_degradation_level;
use crate::error::{MonitorError, ThresholdError};
use crate::event::{DegradationEvent, TransitionKind};
use crate::level::DegradationLevel;
use crate::metrics::{MetricsProvider, MetricsSample};
use crate::strategy::{StrategyCallback, StrategyRegistry, dispatch_callbacks};
use crate::thresholds::DegradationThresholds;

/// Monitor construction parameters.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Poll cadence. The interval is measured between tick starts
    /// (fixed-rate); a slow provider delays a tick but drift does not
    /// accumulate.
    pub check_interval: Duration,
    /// Classification cutoffs; validated when the monitor is built.
    pub thresholds: DegradationThresholds,
    /// Retained transition events; oldest dropped beyond this.
    pub history_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            thresholds: DegradationThresholds::default(),
            history_capacity: 1024,
        }
    }
}

/// Read-only snapshot of monitor state for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatistics {
    pub current_level: DegradationLevel,
    pub is_degraded: bool,
    pub is_monitoring: bool,
    pub total_degradation_events: u64,
    pub total_recovery_events: u64,
    /// Ticks observed since start (including provider failures).
    pub total_ticks: u64,
    /// Ticks skipped because the provider failed.
    pub provider_failures: u64,
    pub history_len: usize,
    /// Epoch ms when the current degradation episode began; unset while
    /// healthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation_start_ms: Option<u64>,
    /// Most recent transition, if any survives in history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<DegradationEvent>,
}

/// State owned by the polling task; accessors take the mutex briefly.
#[derive(Debug)]
struct MonitorState {
    current_level: DegradationLevel,
    degradation_start_ms: Option<u64>,
    history: VecDeque<DegradationEvent>,
    total_degradation_events: u64,
    total_recovery_events: u64,
    total_ticks: u64,
    provider_failures: u64,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            current_level: DegradationLevel::None,
            degradation_start_ms: None,
            history: VecDeque::new(),
            total_degradation_events: 0,
            total_recovery_events: 0,
            total_ticks: 0,
            provider_failures: 0,
        }
    }
}

/// Adaptive degradation monitor.
///
/// Polls a [`MetricsProvider`] on a fixed interval, classifies each
/// snapshot, and on a level change records a [`DegradationEvent`] and
/// invokes the strategies registered for the entered level. Dropping a
/// running monitor also terminates its loop (the shutdown channel
/// closes), but [`stop_monitoring`](Self::stop_monitoring) is the
/// contract for an orderly join.
pub struct DegradationMonitor {
    config: MonitorConfig,
    state: Arc<Mutex<MonitorState>>,
    strategies: Arc<Mutex<StrategyRegistry>>,
    monitoring: Arc<AtomicBool>,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl DegradationMonitor {
    /// Build a monitor, validating the configured thresholds.
    pub fn new(mut config: MonitorConfig) -> Result<Self, ThresholdError> {
        config.thresholds.validate()?;
        config.history_capacity = config.history_capacity.max(1);
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(MonitorState::new())),
            strategies: Arc::new(Mutex::new(StrategyRegistry::new())),
            monitoring: Arc::new(AtomicBool::new(false)),
            shutdown: None,
            task: None,
        })
    }

    /// Build a monitor with default thresholds and a custom interval.
    pub fn with_interval(check_interval: Duration) -> Self {
        // Defaults always validate.
        match Self::new(MonitorConfig {
            check_interval,
            ..MonitorConfig::default()
        }) {
            Ok(monitor) => monitor,
            Err(_) => unreachable!("default thresholds are monotonic"),
        }
    }

    /// Register a mitigation strategy for `level`.
    ///
    /// Safe before or during monitoring; affects only future transitions.
    pub fn register_strategy(&self, level: DegradationLevel, callback: StrategyCallback) {
        lock(&self.strategies).register(level, callback);
    }

    /// Begin the polling loop against `provider`.
    ///
    /// Must be called within a tokio runtime. Fails with
    /// [`MonitorError::AlreadyRunning`] while a loop is active.
    pub fn start_monitoring(
        &mut self,
        provider: Arc<dyn MetricsProvider>,
    ) -> Result<(), MonitorError> {
        if self.monitoring.load(Ordering::SeqCst) {
            return Err(MonitorError::AlreadyRunning);
        }

        let (tx, rx) = watch::channel(false);
        self.monitoring.store(true, Ordering::SeqCst);
        let task = tokio::spawn(poll_loop(
            provider,
            Arc::clone(&self.state),
            Arc::clone(&self.strategies),
            self.config.check_interval,
            self.config.thresholds.clone(),
            self.config.history_capacity,
            rx,
        ));
        self.shutdown = Some(tx);
        self.task = Some(task);
        Ok(())
    }

    /// Signal the loop to terminate and wait for it to fully stop.
    ///
    /// Idempotent: calling while not monitoring is a safe no-op.
    pub async fn stop_monitoring(&mut self) {
        let Some(tx) = self.shutdown.take() else {
            return;
        };
        let _ = tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(error = %err, "monitor task terminated abnormally");
            }
        }
        self.monitoring.store(false, Ordering::SeqCst);
    }

    /// Whether the polling loop is active.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// `true` when the current level is anything but `None`.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        lock(&self.state).current_level.is_degraded()
    }

    /// Level currently in effect.
    #[must_use]
    pub fn current_level(&self) -> DegradationLevel {
        lock(&self.state).current_level
    }

    /// Consistent read-only snapshot of counters and history metadata.
    #[must_use]
    pub fn get_statistics(&self) -> MonitorStatistics {
        let st = lock(&self.state);
        MonitorStatistics {
            current_level: st.current_level,
            is_degraded: st.current_level.is_degraded(),
            is_monitoring: self.monitoring.load(Ordering::SeqCst),
            total_degradation_events: st.total_degradation_events,
            total_recovery_events: st.total_recovery_events,
            total_ticks: st.total_ticks,
            provider_failures: st.provider_failures,
            history_len: st.history.len(),
            degradation_start_ms: st.degradation_start_ms,
            last_event: st.history.back().cloned(),
        }
    }

    /// Cloned transition history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<DegradationEvent> {
        lock(&self.state).history.iter().cloned().collect()
    }

    /// Clear event counters and history.
    ///
    /// `current_level` and the running episode's start time are
    /// untouched; resetting does not declare the system healthy.
    pub fn reset_statistics(&self) {
        let mut st = lock(&self.state);
        st.total_degradation_events = 0;
        st.total_recovery_events = 0;
        st.total_ticks = 0;
        st.provider_failures = 0;
        st.history.clear();
    }

    /// Thresholds in effect (validated at construction).
    #[must_use]
    pub fn thresholds(&self) -> &DegradationThresholds {
        &self.config.thresholds
    }
}

async fn poll_loop(
    provider: Arc<dyn MetricsProvider>,
    state: Arc<Mutex<MonitorState>>,
    strategies: Arc<Mutex<StrategyRegistry>>,
    check_interval: Duration,
    thresholds: DegradationThresholds,
    history_capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(check_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        interval_ms = check_interval.as_millis() as u64,
        "degradation monitor started"
    );

    loop {
        tokio::select! {
            // Completes on stop_monitoring() or when the monitor is dropped.
            _ = shutdown.changed() => break,
            _ = interval.tick() => {}
        }

        let sample = match provider.sample().await {
            Ok(sample) => sample,
            Err(err) => {
                let mut st = lock(&state);
                st.total_ticks += 1;
                st.provider_failures += 1;
                warn!(error = %err, "metrics provider failed; skipping tick");
                continue;
            }
        };

        if !sample_is_classifiable(&sample) {
            let mut st = lock(&state);
            st.total_ticks += 1;
            st.provider_failures += 1;
            warn!("metrics provider returned non-finite signals; skipping tick");
            continue;
        }

        let agents = (!sample.agents.is_empty()).then_some(&sample.agents);
        let new_level = detect_degradation_level(&thresholds, &sample.system, agents);
        apply_tick(&state, &strategies, history_capacity, new_level, &sample);
    }

    info!("degradation monitor stopped");
}

/// Invalid data from a provider is a soft failure, same as a provider
/// error: the tick is skipped rather than misclassified.
fn sample_is_classifiable(sample: &MetricsSample) -> bool {
    let m = &sample.system;
    m.error_rate.is_finite()
        && m.cpu_utilization.is_finite()
        && m.memory_utilization.is_finite()
        && sample.agents.values().all(|a| a.health_score.is_finite())
}

/// Apply one tick's classification: record the transition (if any),
/// dispatch strategies, then publish the new level.
fn apply_tick(
    state: &Mutex<MonitorState>,
    strategies: &Mutex<StrategyRegistry>,
    history_capacity: usize,
    new_level: DegradationLevel,
    sample: &MetricsSample,
) {
    let previous = {
        let mut st = lock(state);
        st.total_ticks += 1;
        st.current_level
    };

    // Unchanged level: no event, no callbacks.
    if new_level == previous {
        return;
    }

    let now = epoch_ms();
    let event = if new_level == DegradationLevel::None {
        DegradationEvent::recovered(now)
    } else {
        DegradationEvent::entered(new_level, now)
    }
    .with_snapshot(sample.system.clone());

    {
        let mut st = lock(state);
        match event.transition {
            TransitionKind::Recovered => {
                st.total_recovery_events += 1;
                st.degradation_start_ms = None;
            }
            TransitionKind::Entered => {
                st.total_degradation_events += 1;
                if st.degradation_start_ms.is_none() {
                    st.degradation_start_ms = Some(now);
                }
            }
        }
        if st.history.len() >= history_capacity {
            st.history.pop_front();
        }
        st.history.push_back(event.clone());
    }

    match new_level {
        DegradationLevel::None => {
            info!(previous = %previous, "recovered to healthy operation");
        }
        DegradationLevel::Moderate | DegradationLevel::Severe => {
            warn!(
                previous = %previous,
                level = %new_level,
                error_rate = sample.system.error_rate,
                cpu = sample.system.cpu_utilization,
                memory = sample.system.memory_utilization,
                "degradation level entered"
            );
        }
        DegradationLevel::Critical => {
            error!(
                previous = %previous,
                error_rate = sample.system.error_rate,
                cpu = sample.system.cpu_utilization,
                memory = sample.system.memory_utilization,
                "critical degradation entered"
            );
        }
    }

    // Dispatch from a snapshot so registration never blocks on handlers.
    let callbacks = lock(strategies).callbacks_for(new_level);
    dispatch_callbacks(&callbacks, &event);

    lock(state).current_level = new_level;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}
