//! In-memory share and entry store.
//!
//! All state lives behind one mutex, so every trait method, including the
//! version check in [`ShareStore::apply_transition`], runs as a single
//! critical section. Used by tests and by embedders that do not need
//! persistence.

use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::{EntryStore, ShareStore};
use crate::types::activity::ActivityLogEntry;
use crate::types::entry::{NewPasswordEntry, PasswordEntry};
use crate::types::errors::StoreError;
use crate::types::share::{ShareEntryLink, ShareRecord, ShareUpdate};

#[derive(Default)]
struct MemoryState {
    entries: Vec<PasswordEntry>,
    shares: Vec<ShareRecord>,
    links: Vec<ShareEntryLink>,
    logs: Vec<ActivityLogEntry>,
}

/// Store keeping entries, shares, links and logs in process memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Newest first; among equal timestamps the later insert comes first.
fn newest_first<T: Clone>(items: impl DoubleEndedIterator<Item = T>, created_at: impl Fn(&T) -> i64) -> Vec<T> {
    let mut out: Vec<T> = items.rev().collect();
    // stable sort keeps the reversed insertion order for ties
    out.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    out
}

impl EntryStore for MemoryStore {
    fn create_entry(&self, entry: NewPasswordEntry, created_at: i64) -> Result<PasswordEntry, StoreError> {
        let record = PasswordEntry {
            id: Uuid::new_v4().to_string(),
            owner_id: entry.owner_id,
            service_name: entry.service_name,
            service_url: entry.service_url,
            username: entry.username,
            secret: entry.secret,
            created_at,
        };
        self.lock()?.entries.push(record.clone());
        Ok(record)
    }

    fn get_entry(&self, id: &str) -> Result<Option<PasswordEntry>, StoreError> {
        Ok(self.lock()?.entries.iter().find(|e| e.id == id).cloned())
    }

    fn list_entries(&self, owner_id: &str) -> Result<Vec<PasswordEntry>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state.entries.iter().filter(|e| e.owner_id == owner_id).cloned(),
            |e| e.created_at,
        ))
    }
}

impl ShareStore for MemoryStore {
    fn insert_share(
        &self,
        share: &ShareRecord,
        entry_ids: &[String],
        log: &ActivityLogEntry,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.shares.iter().any(|s| s.token == share.token) {
            return Err(StoreError::DuplicateToken);
        }
        if state.shares.iter().any(|s| s.id == share.id) {
            return Err(StoreError::DatabaseError(format!("Duplicate share id: {}", share.id)));
        }

        state.shares.push(share.clone());
        state.links.extend(entry_ids.iter().map(|entry_id| ShareEntryLink {
            share_id: share.id.clone(),
            entry_id: entry_id.clone(),
        }));
        state.logs.push(log.clone());
        Ok(())
    }

    fn get_share(&self, id: &str) -> Result<Option<ShareRecord>, StoreError> {
        Ok(self.lock()?.shares.iter().find(|s| s.id == id).cloned())
    }

    fn get_share_by_token(&self, token: &str) -> Result<Option<ShareRecord>, StoreError> {
        Ok(self.lock()?.shares.iter().find(|s| s.token == token).cloned())
    }

    fn list_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state.shares.iter().filter(|s| s.owner_id == owner_id).cloned(),
            |s| s.created_at,
        ))
    }

    fn linked_entry_ids(&self, share_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .lock()?
            .links
            .iter()
            .filter(|l| l.share_id == share_id)
            .map(|l| l.entry_id.clone())
            .collect())
    }

    fn apply_transition(
        &self,
        update: &ShareUpdate,
        expected_version: i64,
        log: Option<&ActivityLogEntry>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let Some(share) = state
            .shares
            .iter_mut()
            .find(|s| s.id == update.share_id && s.version == expected_version)
        else {
            return Ok(false);
        };

        share.state = update.state;
        share.opened_once = update.opened_once;
        share.version += 1;
        if let Some(log) = log {
            state.logs.push(log.clone());
        }
        Ok(true)
    }

    fn list_logs(&self, owner_id: &str) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let state = self.lock()?;
        Ok(newest_first(
            state.logs.iter().filter(|l| l.owner_id == owner_id).cloned(),
            |l| l.created_at,
        ))
    }
}
