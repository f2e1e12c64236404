//! Per-level mitigation strategy callbacks.
//!
//! Callers register handlers per [`DegradationLevel`]; the monitor invokes
//! them synchronously, in registration order, exactly when that level is
//! entered. Handlers doing slow work should hand off to their own
//! background execution so they do not delay subsequent polls.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, error};

use crate::event::DegradationEvent;
use crate::level::{ALL_LEVELS, DegradationLevel};

/// A caller-supplied handler invoked when a degradation level is entered.
///
/// Fire-and-forget from the monitor's perspective: the return value is
/// not observed, and a panic is isolated to the offending handler.
pub type StrategyCallback = Arc<dyn Fn(&DegradationEvent) + Send + Sync>;

/// Mapping from degradation level to an ordered list of handlers.
///
/// Every level is pre-populated with an empty list at construction, so
/// lookup never creates entries on read.
pub struct StrategyRegistry {
    callbacks: BTreeMap<DegradationLevel, Vec<StrategyCallback>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyRegistry {
    /// Create a registry with an empty handler list for every level.
    #[must_use]
    pub fn new() -> Self {
        let callbacks = ALL_LEVELS
            .into_iter()
            .map(|level| (level, Vec::new()))
            .collect();
        Self { callbacks }
    }

    /// Append a handler to the list for `level`.
    ///
    /// Multiple handlers per level are permitted and run in registration
    /// order. Registration may happen before or during monitoring; it
    /// affects only future transitions.
    pub fn register(&mut self, level: DegradationLevel, callback: StrategyCallback) {
        debug!(level = %level, "registering degradation strategy");
        self.callbacks.entry(level).or_default().push(callback);
    }

    /// Cloned snapshot of the handlers for `level`.
    ///
    /// The monitor dispatches from a snapshot so registration from other
    /// threads (or from inside a handler) never deadlocks against a
    /// dispatch in progress.
    #[must_use]
    pub fn callbacks_for(&self, level: DegradationLevel) -> Vec<StrategyCallback> {
        self.callbacks.get(&level).cloned().unwrap_or_default()
    }

    /// Number of handlers registered for `level`.
    #[must_use]
    pub fn registered_count(&self, level: DegradationLevel) -> usize {
        self.callbacks.get(&level).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: Vec<String> = ALL_LEVELS
            .into_iter()
            .map(|l| format!("{l}: {}", self.registered_count(l)))
            .collect();
        f.debug_struct("StrategyRegistry")
            .field("registered", &counts.join(", "))
            .finish()
    }
}

/// Invoke each handler in order, isolating panics.
///
/// A panicking handler is logged and skipped; the remaining handlers
/// still run. Returns the number of handlers that panicked.
pub fn dispatch_callbacks(callbacks: &[StrategyCallback], event: &DegradationEvent) -> usize {
    let mut panicked = 0;
    for (index, callback) in callbacks.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            panicked += 1;
            error!(
                level = %event.level,
                transition = %event.transition,
                handler_index = index,
                "degradation strategy panicked; continuing with remaining handlers"
            );
        }
    }
    panicked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn registry_pre_populates_every_level() {
        let registry = StrategyRegistry::new();
        for level in ALL_LEVELS {
            assert_eq!(registry.registered_count(level), 0);
            assert!(registry.callbacks_for(level).is_empty());
        }
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let mut registry = StrategyRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.register(
                DegradationLevel::Severe,
                Arc::new(move |_| order.lock().unwrap().push(tag)),
            );
        }

        let event = DegradationEvent::entered(DegradationLevel::Severe, 1_000);
        let panicked = dispatch_callbacks(&registry.callbacks_for(DegradationLevel::Severe), &event);
        assert_eq!(panicked, 0);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_later_handlers() {
        let mut registry = StrategyRegistry::new();
        let ran = Arc::new(Mutex::new(false));
        registry.register(
            DegradationLevel::Critical,
            Arc::new(|_| panic!("handler exploded")),
        );
        {
            let ran = Arc::clone(&ran);
            registry.register(
                DegradationLevel::Critical,
                Arc::new(move |_| *ran.lock().unwrap() = true),
            );
        }

        let event = DegradationEvent::entered(DegradationLevel::Critical, 1_000);
        let panicked =
            dispatch_callbacks(&registry.callbacks_for(DegradationLevel::Critical), &event);
        assert_eq!(panicked, 1);
        assert!(*ran.lock().unwrap(), "second handler should still run");
    }

    #[test]
    fn handlers_scoped_to_their_level() {
        let mut registry = StrategyRegistry::new();
        registry.register(DegradationLevel::Moderate, Arc::new(|_| {}));
        assert_eq!(registry.registered_count(DegradationLevel::Moderate), 1);
        assert_eq!(registry.registered_count(DegradationLevel::Severe), 0);
    }

    #[test]
    fn dispatch_with_no_handlers_is_noop() {
        let registry = StrategyRegistry::new();
        let event = DegradationEvent::recovered(1_000);
        let panicked = dispatch_callbacks(&registry.callbacks_for(DegradationLevel::None), &event);
        assert_eq!(panicked, 0);
    }

    #[test]
    fn handler_receives_the_event() {
        let mut registry = StrategyRegistry::new();
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            registry.register(
                DegradationLevel::Moderate,
                Arc::new(move |event| {
                    *seen.lock().unwrap() = Some((event.level, event.timestamp_ms));
                }),
            );
        }

        let event = DegradationEvent::entered(DegradationLevel::Moderate, 777);
        dispatch_callbacks(&registry.callbacks_for(DegradationLevel::Moderate), &event);
        assert_eq!(
            *seen.lock().unwrap(),
            Some((DegradationLevel::Moderate, 777))
        );
    }
}
