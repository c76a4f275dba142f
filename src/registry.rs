//! In-memory cooldown registry synchronized with the settings store.
//!
//! The registry is a cache/view over the persisted settings document: it is
//! rebuilt from the snapshot at construction and on every store change
//! notification, and every mutation writes the full snapshot back. Entries are
//! never evicted on expiry; "active" is always computed against the clock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::codes::ApiErrorCode;
use crate::error::Result;
use crate::settings::SettingsStore;

/// Cooldown window for one error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownEntry {
    /// Absolute expiry instant.
    pub until: DateTime<Utc>,
    /// Free-text reason recorded by the caller.
    pub reason: String,
}

impl CooldownEntry {
    /// Whether the window is still open at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.until > now
    }
}

/// Tracks cooldown windows per upstream error code.
///
/// Safe for concurrent use from multiple threads; all methods take `&self`.
/// Construct via [`CooldownRegistry::new`] (wall clock) or
/// [`CooldownRegistry::with_clock`] (tests).
pub struct CooldownRegistry {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    cooldowns: RwLock<HashMap<ApiErrorCode, CooldownEntry>>,
    // Serializes the snapshot read-modify-write so concurrent mutations from
    // this process cannot drop each other's records.
    persist_lock: Mutex<()>,
}

impl CooldownRegistry {
    /// Build a registry over `store`, load the current snapshot, and
    /// subscribe to store changes.
    pub fn new(store: Arc<dyn SettingsStore>) -> Result<Arc<Self>> {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Like [`CooldownRegistry::new`] with an injected time source.
    pub fn with_clock(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Result<Arc<Self>> {
        let registry = Arc::new(Self {
            store: Arc::clone(&store),
            clock,
            cooldowns: RwLock::new(HashMap::new()),
            persist_lock: Mutex::new(()),
        });
        registry.load_from_settings()?;

        // Weak back-reference: the subscription must not keep the registry
        // alive, and a dropped registry turns notifications into no-ops.
        let weak = Arc::downgrade(&registry);
        store.on_change(Box::new(move || {
            if let Some(registry) = weak.upgrade() {
                if let Err(error) = registry.load_from_settings() {
                    warn!(error = %error, "Settings reload after change notification failed");
                }
            }
        }));

        Ok(registry)
    }

    /// True iff an entry exists for `code` and its expiry is strictly in the
    /// future. No side effects.
    #[must_use]
    pub fn is_in_cooldown(&self, code: ApiErrorCode) -> bool {
        let now = self.clock.now();
        self.cooldowns
            .read()
            .get(&code)
            .is_some_and(|entry| entry.is_active_at(now))
    }

    /// Upsert the cooldown for `code` and persist the updated snapshot.
    ///
    /// The in-memory entry is written before the persistence attempt, so on a
    /// store error the caller may simply retry to repersist. Last caller
    /// wins; every call performs exactly one persist, even if the values are
    /// unchanged.
    pub fn set_cooldown(&self, code: ApiErrorCode, until: DateTime<Utc>, reason: &str) -> Result<()> {
        self.cooldowns.write().insert(
            code,
            CooldownEntry {
                until,
                reason: reason.to_string(),
            },
        );

        {
            let _guard = self.persist_lock.lock();
            let mut snapshot = self.store.current()?;
            snapshot.upsert_cooldown(code.code(), until, reason);
            self.store.persist(&snapshot)?;
        }

        debug!(code = %code, reason, until = %until, "Set cooldown");
        Ok(())
    }

    /// Convenience form: cooldown for `duration` from now.
    ///
    /// Samples the clock once so the persisted expiry matches the in-memory
    /// one exactly.
    pub fn set_cooldown_for(
        &self,
        code: ApiErrorCode,
        duration: Duration,
        reason: &str,
    ) -> Result<()> {
        let until = self.clock.now() + duration;
        self.set_cooldown(code, until, reason)
    }

    /// Current entry for `code`, including expired ones. `None` if never set
    /// or already cleared.
    #[must_use]
    pub fn cooldown_info(&self, code: ApiErrorCode) -> Option<CooldownEntry> {
        self.cooldowns.read().get(&code).cloned()
    }

    /// Every code whose cooldown is active right now. Recomputed per call,
    /// order unspecified.
    #[must_use]
    pub fn active_cooldowns(&self) -> Vec<ApiErrorCode> {
        let now = self.clock.now();
        self.cooldowns
            .read()
            .iter()
            .filter(|(_, entry)| entry.is_active_at(now))
            .map(|(code, _)| *code)
            .collect()
    }

    /// Remove the cooldown for `code` from memory and, iff it existed, from
    /// the persisted snapshot. A missing entry is a no-op with no settings
    /// write.
    pub fn clear_cooldown(&self, code: ApiErrorCode) -> Result<()> {
        let removed = self.cooldowns.write().remove(&code).is_some();
        if removed {
            let _guard = self.persist_lock.lock();
            let mut snapshot = self.store.current()?;
            snapshot.remove_cooldown(code.code());
            self.store.persist(&snapshot)?;
            debug!(code = %code, "Cleared cooldown");
        }
        Ok(())
    }

    /// Rebuild the whole in-memory mapping from the current snapshot.
    ///
    /// Records whose code is not a member of [`ApiErrorCode`] are skipped
    /// with a warning; the rest of the load continues. Idempotent given an
    /// unchanged snapshot.
    pub fn load_from_settings(&self) -> Result<()> {
        let snapshot = self.store.current()?;

        let mut loaded = HashMap::new();
        for record in &snapshot.error_cooldowns {
            match ApiErrorCode::from_code(record.code) {
                Some(code) => {
                    loaded.insert(
                        code,
                        CooldownEntry {
                            until: record.until,
                            reason: record.reason.clone(),
                        },
                    );
                }
                None => {
                    warn!(code = record.code, "Unknown error code found in settings");
                }
            }
        }

        let count = loaded.len();
        *self.cooldowns.write() = loaded;
        debug!(count, "Loaded error cooldowns from settings");
        Ok(())
    }
}
