pub mod clock;
pub mod codes;
pub mod error;
pub mod registry;
pub mod settings;
pub mod test_utils;

pub use clock::{Clock, SystemClock};
pub use codes::ApiErrorCode;
pub use error::{CooldownError, Result};
pub use registry::{CooldownEntry, CooldownRegistry};
pub use settings::{CooldownRecord, JsonFileStore, SettingsSnapshot, SettingsStore};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
