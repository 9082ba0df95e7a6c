//! Storage seams for the share engine.
//!
//! The lifecycle engine talks to two traits: [`EntryStore`] for the credential
//! records it exposes and [`ShareStore`] for shares, their entry links and the
//! activity log. [`SqliteStore`] and [`MemoryStore`] implement both.

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use crate::types::activity::ActivityLogEntry;
use crate::types::entry::{NewPasswordEntry, PasswordEntry};
use crate::types::errors::StoreError;
use crate::types::share::{ShareRecord, ShareUpdate};

/// Lookup of credential records by id and by owner.
pub trait EntryStore: Send + Sync {
    fn create_entry(&self, entry: NewPasswordEntry, created_at: i64) -> Result<PasswordEntry, StoreError>;
    fn get_entry(&self, id: &str) -> Result<Option<PasswordEntry>, StoreError>;
    /// Entries owned by `owner_id`, newest first.
    fn list_entries(&self, owner_id: &str) -> Result<Vec<PasswordEntry>, StoreError>;
}

/// Persistence for shares, share-entry links and the activity log.
///
/// Every method that changes a share also appends its log entry; both land
/// together or not at all.
pub trait ShareStore: Send + Sync {
    /// Inserts a new share with its entry links and creation log entry.
    ///
    /// Returns `StoreError::DuplicateToken` if the token is already taken.
    fn insert_share(
        &self,
        share: &ShareRecord,
        entry_ids: &[String],
        log: &ActivityLogEntry,
    ) -> Result<(), StoreError>;

    fn get_share(&self, id: &str) -> Result<Option<ShareRecord>, StoreError>;

    fn get_share_by_token(&self, token: &str) -> Result<Option<ShareRecord>, StoreError>;

    /// Shares owned by `owner_id`, newest first.
    fn list_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, StoreError>;

    /// Entry ids linked to a share, in the order they were issued.
    fn linked_entry_ids(&self, share_id: &str) -> Result<Vec<String>, StoreError>;

    /// Writes `update` and appends `log` iff the stored share is still at
    /// `expected_version`. Returns `false` without writing anything when the
    /// version moved on or the share is gone.
    fn apply_transition(
        &self,
        update: &ShareUpdate,
        expected_version: i64,
        log: Option<&ActivityLogEntry>,
    ) -> Result<bool, StoreError>;

    /// Activity log for `owner_id`, newest first.
    fn list_logs(&self, owner_id: &str) -> Result<Vec<ActivityLogEntry>, StoreError>;
}
