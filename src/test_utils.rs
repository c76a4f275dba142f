//! Test utilities: fake settings store, manual clock, log capture.
//!
//! Public so the `tests/` tree can use them; production code never constructs
//! these types.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, span};

use crate::clock::Clock;
use crate::error::{CooldownError, Result};
use crate::settings::{ChangeCallback, SettingsSnapshot, SettingsStore};

/// In-memory settings store for tests.
///
/// Counts persist calls so tests can assert exactly when the registry writes,
/// and can inject one-shot read or persist failures to exercise error
/// propagation.
#[derive(Default)]
pub struct MemoryStore {
    snapshot: RwLock<SettingsSnapshot>,
    callbacks: Mutex<Vec<ChangeCallback>>,
    persist_calls: AtomicUsize,
    fail_next_persist: AtomicBool,
    fail_next_current: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start from a pre-populated snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: SettingsSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: RwLock::new(snapshot),
            ..Self::default()
        })
    }

    /// Number of successful `persist` calls so far.
    #[must_use]
    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    /// Make the next `persist` call fail with a store error.
    pub fn fail_next_persist(&self) {
        self.fail_next_persist.store(true, Ordering::SeqCst);
    }

    /// Make the next `current` call fail with a store error.
    pub fn fail_next_current(&self) {
        self.fail_next_current.store(true, Ordering::SeqCst);
    }

    /// The snapshot as last persisted (or seeded).
    #[must_use]
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.snapshot.read().clone()
    }

    /// Simulate an external rewrite of the settings document: replace the
    /// snapshot and fire change callbacks.
    pub fn replace_snapshot(&self, snapshot: SettingsSnapshot) {
        *self.snapshot.write() = snapshot;
        self.notify();
    }

    fn notify(&self) {
        let callbacks = self.callbacks.lock();
        for callback in callbacks.iter() {
            callback();
        }
    }
}

impl SettingsStore for MemoryStore {
    fn current(&self) -> Result<SettingsSnapshot> {
        if self.fail_next_current.swap(false, Ordering::SeqCst) {
            return Err(CooldownError::Store("injected load failure".to_string()));
        }
        Ok(self.snapshot.read().clone())
    }

    fn persist(&self, snapshot: &SettingsSnapshot) -> Result<()> {
        if self.fail_next_persist.swap(false, Ordering::SeqCst) {
            return Err(CooldownError::Store("injected persist failure".to_string()));
        }
        *self.snapshot.write() = snapshot.clone();
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        self.notify();
        Ok(())
    }

    fn on_change(&self, callback: ChangeCallback) {
        self.callbacks.lock().push(callback);
    }
}

/// Clock pinned to an explicit instant, advanced by hand.
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: RwLock::new(start),
        })
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// A tracing event captured by [`capture_logs`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

#[derive(Clone)]
struct Collector {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl tracing::Subscriber for Collector {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
        span::Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &Event<'_>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

/// Run `f` with a collecting subscriber installed on this thread and return
/// its result plus every event emitted during the call.
pub fn capture_logs<F, R>(f: F) -> (R, Vec<CapturedEvent>)
where
    F: FnOnce() -> R,
{
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = Collector {
        events: Arc::clone(&events),
    };
    let result = tracing::subscriber::with_default(collector, f);
    let captured = events.lock().clone();
    (result, captured)
}

/// True if any captured event at `level` contains `pattern`.
#[must_use]
pub fn logs_contain(events: &[CapturedEvent], level: Level, pattern: &str) -> bool {
    events
        .iter()
        .any(|e| e.level == level && e.message.contains(pattern))
}
