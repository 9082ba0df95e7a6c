//! SQLite-backed share and entry store.
//!
//! Implements [`ShareStore`] and [`EntryStore`] on top of [`Database`]. Every
//! write runs in an `IMMEDIATE` transaction so the state change and its
//! activity-log row commit together, and so a second process sharing the
//! database file is serialized by SQLite's write lock.

use std::sync::Arc;

use rusqlite::{params, ErrorCode, OptionalExtension, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use super::{EntryStore, ShareStore};
use crate::database::connection::Database;
use crate::types::activity::{ActivityAction, ActivityLogEntry, ActivityStatus};
use crate::types::entry::{NewPasswordEntry, PasswordEntry};
use crate::types::errors::StoreError;
use crate::types::share::{InactiveReason, ShareRecord, ShareState, ShareUpdate, ViewPhase};

const SHARE_COLUMNS: &str = "id, owner_id, recipient_label, token, comment, created_at, \
     expires_at, viewed, viewed_at, opened_once, active, inactive_reason, version";

const LOG_COLUMNS: &str = "id, owner_id, action, service_name, recipient_label, status, \
     viewed_at, expires_at, created_at";

/// Store backed by a shared SQLite [`Database`].
pub struct SqliteStore {
    db: Arc<Database>,
}

/// Flat `shares` row as stored on disk.
struct ShareRow {
    id: String,
    owner_id: String,
    recipient_label: Option<String>,
    token: String,
    comment: Option<String>,
    created_at: i64,
    expires_at: Option<i64>,
    viewed: bool,
    viewed_at: Option<i64>,
    opened_once: bool,
    active: bool,
    inactive_reason: Option<String>,
    version: i64,
}

/// State columns derived from a [`ShareState`].
struct StateColumns {
    expires_at: Option<i64>,
    viewed: bool,
    viewed_at: Option<i64>,
    active: bool,
    inactive_reason: Option<&'static str>,
}

impl StateColumns {
    fn from_state(state: &ShareState) -> Self {
        let (expires_at, viewed, viewed_at) = match state.phase() {
            ViewPhase::Unopened { expires_at } => (expires_at, false, None),
            ViewPhase::Viewed {
                viewed_at,
                expires_at,
            } => (Some(expires_at), true, Some(viewed_at)),
        };
        let (active, inactive_reason) = match state {
            ShareState::Active { .. } => (true, None),
            ShareState::Inactive { reason, .. } => (false, Some(reason.as_str())),
        };
        Self {
            expires_at,
            viewed,
            viewed_at,
            active,
            inactive_reason,
        }
    }
}

impl ShareRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            recipient_label: row.get(2)?,
            token: row.get(3)?,
            comment: row.get(4)?,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
            viewed: row.get(7)?,
            viewed_at: row.get(8)?,
            opened_once: row.get(9)?,
            active: row.get(10)?,
            inactive_reason: row.get(11)?,
            version: row.get(12)?,
        })
    }

    /// Rebuilds the tagged state, rejecting rows that break the viewed/viewed_at pairing.
    fn into_record(self) -> Result<ShareRecord, StoreError> {
        let phase = match (self.viewed, self.viewed_at, self.expires_at) {
            (false, None, expires_at) => ViewPhase::Unopened { expires_at },
            (true, Some(viewed_at), Some(expires_at)) => ViewPhase::Viewed {
                viewed_at,
                expires_at,
            },
            _ => {
                return Err(StoreError::DatabaseError(format!(
                    "Share {} has inconsistent view columns",
                    self.id
                )))
            }
        };
        let state = if self.active {
            ShareState::Active { phase }
        } else {
            let reason = match self.inactive_reason.as_deref() {
                // Rows deactivated before schema v2 carry no reason and read as revoked.
                None => InactiveReason::Revoked,
                Some(raw) => InactiveReason::parse(raw).ok_or_else(|| {
                    StoreError::DatabaseError(format!(
                        "Share {} has unknown inactive reason: {}",
                        self.id, raw
                    ))
                })?,
            };
            ShareState::Inactive { reason, phase }
        };
        Ok(ShareRecord {
            id: self.id,
            owner_id: self.owner_id,
            recipient_label: self.recipient_label,
            token: self.token,
            comment: self.comment,
            created_at: self.created_at,
            state,
            opened_once: self.opened_once,
            version: self.version,
        })
    }
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<PasswordEntry> {
        Ok(PasswordEntry {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            service_name: row.get(2)?,
            service_url: row.get(3)?,
            username: row.get(4)?,
            secret: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn row_to_log(row: &rusqlite::Row) -> rusqlite::Result<(ActivityLogEntry, String, String)> {
        let action: String = row.get(2)?;
        let status: String = row.get(5)?;
        Ok((
            ActivityLogEntry {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                action: ActivityAction::ShareCreated,
                service_name: row.get(3)?,
                recipient_label: row.get(4)?,
                status: ActivityStatus::Active,
                viewed_at: row.get(6)?,
                expires_at: row.get(7)?,
                created_at: row.get(8)?,
            },
            action,
            status,
        ))
    }

    fn insert_log(conn: &rusqlite::Connection, log: &ActivityLogEntry) -> Result<(), StoreError> {
        conn.execute(
            &format!("INSERT INTO activity_logs ({LOG_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
            params![
                log.id,
                log.owner_id,
                log.action.as_str(),
                log.service_name,
                log.recipient_label,
                log.status.as_str(),
                log.viewed_at,
                log.expires_at,
                log.created_at
            ],
        )?;
        Ok(())
    }

    fn query_share(&self, filter: &str, key: &str) -> Result<Option<ShareRecord>, StoreError> {
        let conn = self.db.connection()?;
        let row = conn
            .query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM shares WHERE {filter} = ?1"),
                params![key],
                ShareRow::from_row,
            )
            .optional()?;
        row.map(ShareRow::into_record).transpose()
    }
}

fn is_token_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, Some(msg)) => {
            err.code == ErrorCode::ConstraintViolation && msg.contains("shares.token")
        }
        _ => false,
    }
}

impl EntryStore for SqliteStore {
    fn create_entry(&self, entry: NewPasswordEntry, created_at: i64) -> Result<PasswordEntry, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.db.connection()?.execute(
            "INSERT INTO password_entries (id, owner_id, service_name, service_url, username, secret, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                entry.owner_id,
                entry.service_name,
                entry.service_url,
                entry.username,
                entry.secret,
                created_at
            ],
        )?;
        Ok(PasswordEntry {
            id,
            owner_id: entry.owner_id,
            service_name: entry.service_name,
            service_url: entry.service_url,
            username: entry.username,
            secret: entry.secret,
            created_at,
        })
    }

    fn get_entry(&self, id: &str) -> Result<Option<PasswordEntry>, StoreError> {
        let conn = self.db.connection()?;
        let entry = conn
            .query_row(
                "SELECT id, owner_id, service_name, service_url, username, secret, created_at \
                 FROM password_entries WHERE id = ?1",
                params![id],
                Self::row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_entries(&self, owner_id: &str) -> Result<Vec<PasswordEntry>, StoreError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, service_name, service_url, username, secret, created_at \
             FROM password_entries WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_entry)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

impl ShareStore for SqliteStore {
    fn insert_share(
        &self,
        share: &ShareRecord,
        entry_ids: &[String],
        log: &ActivityLogEntry,
    ) -> Result<(), StoreError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let cols = StateColumns::from_state(&share.state);
        tx.execute(
            &format!(
                "INSERT INTO shares ({SHARE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ),
            params![
                share.id,
                share.owner_id,
                share.recipient_label,
                share.token,
                share.comment,
                share.created_at,
                cols.expires_at,
                cols.viewed,
                cols.viewed_at,
                share.opened_once,
                cols.active,
                cols.inactive_reason,
                share.version
            ],
        )
        .map_err(|e| {
            if is_token_violation(&e) {
                StoreError::DuplicateToken
            } else {
                StoreError::from(e)
            }
        })?;

        for (position, entry_id) in entry_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO share_entries (share_id, entry_id, position) VALUES (?1, ?2, ?3)",
                params![share.id, entry_id, position as i64],
            )?;
        }

        Self::insert_log(&tx, log)?;
        tx.commit()?;
        Ok(())
    }

    fn get_share(&self, id: &str) -> Result<Option<ShareRecord>, StoreError> {
        self.query_share("id", id)
    }

    fn get_share_by_token(&self, token: &str) -> Result<Option<ShareRecord>, StoreError> {
        self.query_share("token", token)
    }

    fn list_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, StoreError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE owner_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], ShareRow::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.into_record()?);
        }
        Ok(results)
    }

    fn linked_entry_ids(&self, share_id: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT entry_id FROM share_entries WHERE share_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![share_id], |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn apply_transition(
        &self,
        update: &ShareUpdate,
        expected_version: i64,
        log: Option<&ActivityLogEntry>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let cols = StateColumns::from_state(&update.state);
        let affected = tx.execute(
            "UPDATE shares SET expires_at = ?1, viewed = ?2, viewed_at = ?3, active = ?4, \
             inactive_reason = ?5, opened_once = ?6, version = version + 1 \
             WHERE id = ?7 AND version = ?8",
            params![
                cols.expires_at,
                cols.viewed,
                cols.viewed_at,
                cols.active,
                cols.inactive_reason,
                update.opened_once,
                update.share_id,
                expected_version
            ],
        )?;

        if affected == 0 {
            debug!(share_id = %update.share_id, expected_version, "share version moved, transition skipped");
            return Ok(false);
        }

        if let Some(log) = log {
            Self::insert_log(&tx, log)?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn list_logs(&self, owner_id: &str) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM activity_logs WHERE owner_id = ?1 \
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_log)?;

        let mut results = Vec::new();
        for row in rows {
            let (mut entry, action, status) = row?;
            entry.action = ActivityAction::parse(&action).ok_or_else(|| {
                StoreError::DatabaseError(format!("Unknown activity action: {}", action))
            })?;
            entry.status = ActivityStatus::parse(&status).ok_or_else(|| {
                StoreError::DatabaseError(format!("Unknown activity status: {}", status))
            })?;
            results.push(entry);
        }
        Ok(results)
    }
}
