//! Registry over the JSON file store: persistence round-trips and external
//! change notification.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use api_cooldowns::test_utils::ManualClock;
use api_cooldowns::{
    ApiErrorCode, Clock, CooldownRegistry, CooldownRecord, JsonFileStore, SettingsSnapshot,
    SettingsStore,
};

fn base_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

#[test]
fn set_cooldown_survives_reopening_the_document() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");
    let until = base_time() + Duration::minutes(30);

    {
        let store = JsonFileStore::open(&path).unwrap();
        let registry = CooldownRegistry::with_clock(
            store as Arc<dyn SettingsStore>,
            ManualClock::new(base_time()) as Arc<dyn Clock>,
        )
        .unwrap();
        registry
            .set_cooldown(ApiErrorCode::AccountLockout, until, "too many logins")
            .unwrap();
    }

    let store = JsonFileStore::open(&path).unwrap();
    let registry = CooldownRegistry::with_clock(
        store as Arc<dyn SettingsStore>,
        ManualClock::new(base_time()) as Arc<dyn Clock>,
    )
    .unwrap();

    assert!(registry.is_in_cooldown(ApiErrorCode::AccountLockout));
    let info = registry.cooldown_info(ApiErrorCode::AccountLockout).unwrap();
    assert_eq!(info.until, until);
    assert_eq!(info.reason, "too many logins");
}

#[test]
fn clear_cooldown_removes_the_record_from_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let store = JsonFileStore::open(&path).unwrap();
    let registry = CooldownRegistry::with_clock(
        store as Arc<dyn SettingsStore>,
        ManualClock::new(base_time()) as Arc<dyn Clock>,
    )
    .unwrap();

    registry
        .set_cooldown(
            ApiErrorCode::ServiceOffline,
            base_time() + Duration::hours(1),
            "maintenance window",
        )
        .unwrap();
    registry.clear_cooldown(ApiErrorCode::ServiceOffline).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let document: SettingsSnapshot = serde_json::from_str(&raw).unwrap();
    assert!(document.error_cooldowns.is_empty());
}

#[test]
fn on_disk_document_uses_short_field_names() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let store = JsonFileStore::open(&path).unwrap();
    let registry = CooldownRegistry::with_clock(
        store as Arc<dyn SettingsStore>,
        ManualClock::new(base_time()) as Arc<dyn Clock>,
    )
    .unwrap();
    registry
        .set_cooldown(
            ApiErrorCode::TokenExpired,
            base_time() + Duration::minutes(5),
            "expired token",
        )
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let record = &document["error_cooldowns"][0];
    assert_eq!(record["code"], ApiErrorCode::TokenExpired.code());
    assert!(record["until"].is_string());
    assert_eq!(record["reason"], "expired token");
}

#[test]
fn reload_after_external_rewrite_updates_the_registry() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let store = JsonFileStore::open(&path).unwrap();
    let registry = CooldownRegistry::with_clock(
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        ManualClock::new(base_time()) as Arc<dyn Clock>,
    )
    .unwrap();
    assert!(registry.cooldown_info(ApiErrorCode::MaxLineups).is_none());

    // Another process rewrites the document behind our back.
    let until = base_time() + Duration::minutes(90);
    let external = SettingsSnapshot {
        error_cooldowns: vec![CooldownRecord {
            code: ApiErrorCode::MaxLineups.code(),
            until,
            reason: "lineup cap reached".to_string(),
        }],
    };
    std::fs::write(&path, serde_json::to_string_pretty(&external).unwrap()).unwrap();
    store.reload().unwrap();

    let info = registry.cooldown_info(ApiErrorCode::MaxLineups).unwrap();
    assert_eq!(info.until, until);
    assert_eq!(info.reason, "lineup cap reached");
}

#[test]
fn unknown_codes_on_disk_are_skipped_on_load() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("settings.json");

    let document = SettingsSnapshot {
        error_cooldowns: vec![
            CooldownRecord {
                code: ApiErrorCode::AccountLockout.code(),
                until: base_time() + Duration::minutes(30),
                reason: "lockout".to_string(),
            },
            CooldownRecord {
                code: 1234,
                until: base_time() + Duration::minutes(30),
                reason: "from a newer version".to_string(),
            },
        ],
    };
    std::fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    let registry = CooldownRegistry::with_clock(
        store as Arc<dyn SettingsStore>,
        ManualClock::new(base_time()) as Arc<dyn Clock>,
    )
    .unwrap();

    assert!(registry.is_in_cooldown(ApiErrorCode::AccountLockout));
    assert_eq!(registry.active_cooldowns(), vec![ApiErrorCode::AccountLockout]);
}
