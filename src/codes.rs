//! Upstream API error codes.
//!
//! The upstream service reports failures through numeric response codes. Only
//! the codes listed here participate in cooldown tracking; integers outside
//! this set found in persisted settings are skipped at load time rather than
//! cast blindly.

/// Known upstream error conditions, backed by the service's numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum ApiErrorCode {
    ServiceOffline = 3000,
    AccountExpired = 4001,
    InvalidHash = 4002,
    InvalidUser = 4003,
    AccountLockout = 4004,
    AccountDisabled = 4005,
    TokenExpired = 4006,
    MaxLineupChangesReached = 4100,
    MaxLineups = 4101,
    ImageNotFound = 5000,
    TooManyImageDownloads = 5002,
}

impl ApiErrorCode {
    /// Every member of the enumeration, for iteration in order of code value.
    pub const ALL: [Self; 11] = [
        Self::ServiceOffline,
        Self::AccountExpired,
        Self::InvalidHash,
        Self::InvalidUser,
        Self::AccountLockout,
        Self::AccountDisabled,
        Self::TokenExpired,
        Self::MaxLineupChangesReached,
        Self::MaxLineups,
        Self::ImageNotFound,
        Self::TooManyImageDownloads,
    ];

    /// Validate a raw integer against the enumeration.
    ///
    /// Returns `None` for non-members; callers decide whether that is a skip
    /// (settings load) or a hard error.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            3000 => Some(Self::ServiceOffline),
            4001 => Some(Self::AccountExpired),
            4002 => Some(Self::InvalidHash),
            4003 => Some(Self::InvalidUser),
            4004 => Some(Self::AccountLockout),
            4005 => Some(Self::AccountDisabled),
            4006 => Some(Self::TokenExpired),
            4100 => Some(Self::MaxLineupChangesReached),
            4101 => Some(Self::MaxLineups),
            5000 => Some(Self::ImageNotFound),
            5002 => Some(Self::TooManyImageDownloads),
            _ => None,
        }
    }

    /// The numeric code as persisted in settings.
    #[must_use]
    pub const fn code(self) -> i64 {
        self as i64
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ServiceOffline => "SERVICE_OFFLINE",
            Self::AccountExpired => "ACCOUNT_EXPIRED",
            Self::InvalidHash => "INVALID_HASH",
            Self::InvalidUser => "INVALID_USER",
            Self::AccountLockout => "ACCOUNT_LOCKOUT",
            Self::AccountDisabled => "ACCOUNT_DISABLED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::MaxLineupChangesReached => "MAX_LINEUP_CHANGES_REACHED",
            Self::MaxLineups => "MAX_LINEUPS",
            Self::ImageNotFound => "IMAGE_NOT_FOUND",
            Self::TooManyImageDownloads => "TOO_MANY_IMAGE_DOWNLOADS",
        };
        write!(f, "{name} ({})", self.code())
    }
}
