use thiserror::Error;

// === StoreError ===

/// Errors raised by share and entry storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("Store database error: {0}")]
    DatabaseError(String),
    /// A share with the same token already exists.
    #[error("Share token already in use")]
    DuplicateToken,
    /// A mutex guarding the store was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    LockPoisoned,
    /// A compare-and-swap on a share kept losing to concurrent writers.
    #[error("Store write conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

// === ShareError ===

/// Which expiration window a share was in when it lapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPhase {
    /// The pre-view deadline passed without anyone opening the link.
    BeforeView,
    /// The short post-view window installed by the first access has ended.
    AfterView,
}

/// Errors returned by share lifecycle operations.
#[derive(Debug, Error)]
pub enum ShareError {
    /// Input to an issue request was malformed.
    #[error("Invalid share request: {0}")]
    Validation(String),
    /// No share matches the given token or id.
    #[error("Share not found: {0}")]
    NotFound(String),
    /// The share belongs to a different owner.
    #[error("Share access forbidden: {0}")]
    Forbidden(String),
    /// The share was revoked or confirmed.
    #[error("This link has been revoked")]
    Revoked,
    /// The share's current deadline has passed.
    #[error("{}", expired_message(.0))]
    Expired(ExpiryPhase),
    /// The single permitted read already happened.
    #[error("This link has already been used and can only be accessed once")]
    AlreadyConsumed,
    /// Confirmation was requested for a share that is no longer active.
    #[error("This link is already inactive")]
    AlreadyInactive,
    /// The generated token collided with an existing share.
    #[error("Share token collision")]
    TokenCollision,
    /// One or more entries behind the share no longer exist.
    #[error("Password entries not found for share: {0}")]
    EntriesUnavailable(String),
    /// A share token could not be generated.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

fn expired_message(phase: &ExpiryPhase) -> &'static str {
    match phase {
        ExpiryPhase::BeforeView => {
            "This link has expired - initial access period has ended"
        }
        ExpiryPhase::AfterView => "This link has expired after viewing",
    }
}

impl ShareError {
    /// Stable machine-readable name of the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ShareError::Validation(_) => "validation_error",
            ShareError::NotFound(_) => "not_found",
            ShareError::Forbidden(_) => "forbidden",
            ShareError::Revoked => "revoked",
            ShareError::Expired(ExpiryPhase::BeforeView) => "expired_before_view",
            ShareError::Expired(ExpiryPhase::AfterView) => "expired_after_view",
            ShareError::AlreadyConsumed => "already_consumed",
            ShareError::AlreadyInactive => "already_inactive",
            ShareError::TokenCollision => "token_collision",
            ShareError::EntriesUnavailable(_) => "entries_unavailable",
            ShareError::Token(_) => "token_error",
            ShareError::Storage(_) => "storage_error",
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === TokenError ===

/// Errors related to share token generation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The system random source failed.
    #[error("Random generation failed: {0}")]
    RandomGeneration(String),
}
