//! Share lifecycle engine.
//!
//! Issues share tokens, evaluates reads against the dual expiry windows and
//! the single-use flag, and applies revoke/confirm transitions. Every state
//! change is committed through [`ShareStore::apply_transition`] together with
//! its activity-log entry, under an optimistic version check: a writer that
//! loses a race reloads the share and evaluates it again, so two concurrent
//! first reads can never both return the secrets.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::services::clock::{Clock, SystemClock};
use crate::services::token_service::{token_prefix, TokenService, TokenServiceTrait};
use crate::storage::{EntryStore, ShareStore};
use crate::types::activity::{ActivityAction, ActivityLogEntry};
use crate::types::entry::PasswordEntry;
use crate::types::errors::{ShareError, StoreError};
use crate::types::settings::ShareSettings;
use crate::types::share::{
    InactiveReason, IssueRequest, IssuedShare, ShareAccess, ShareRecord, ShareState, ShareUpdate,
    SharedEntryView,
};

/// Length of the window that opens on the first successful read.
pub const POST_VIEW_WINDOW_SECS: i64 = 3600;

/// Upper bound on evaluate/commit rounds for one operation.
const MAX_TRANSITION_ATTEMPTS: u32 = 8;

const MAX_COMMENT_CHARS: usize = 1000;
const MAX_RECIPIENT_LABEL_CHARS: usize = 255;

/// Trait defining share lifecycle operations.
pub trait ShareLifecycleTrait {
    fn issue_share(&self, request: IssueRequest) -> Result<IssuedShare, ShareError>;
    fn access_share(&self, token: &str) -> Result<ShareAccess, ShareError>;
    fn confirm_share(&self, token: &str) -> Result<(), ShareError>;
    fn revoke_share(&self, share_id: &str, owner_id: &str) -> Result<(), ShareError>;
    fn list_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, ShareError>;
    fn list_active_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, ShareError>;
    fn list_logs(&self, owner_id: &str) -> Result<Vec<ActivityLogEntry>, ShareError>;
    fn share_entries(&self, share_id: &str, owner_id: &str) -> Result<Vec<PasswordEntry>, ShareError>;
}

/// Outcome of evaluating a share inside a transition round.
enum Step<T> {
    /// Nothing to write.
    Done(T),
    /// Write `update` (and `log`) if the share has not moved on, then yield `output`.
    Commit {
        update: ShareUpdate,
        log: Option<ActivityLogEntry>,
        output: T,
    },
}

/// Share engine over pluggable share/entry stores.
pub struct ShareLifecycle {
    shares: Arc<dyn ShareStore>,
    entries: Arc<dyn EntryStore>,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenServiceTrait>,
    settings: ShareSettings,
}

impl ShareLifecycle {
    /// Creates an engine using the system clock and `ring`-backed tokens.
    pub fn new(shares: Arc<dyn ShareStore>, entries: Arc<dyn EntryStore>, settings: ShareSettings) -> Self {
        Self {
            shares,
            entries,
            clock: Arc::new(SystemClock),
            tokens: Arc::new(TokenService::new()),
            settings,
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the token generator.
    pub fn with_token_service(mut self, tokens: Arc<dyn TokenServiceTrait>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn settings(&self) -> &ShareSettings {
        &self.settings
    }

    /// Trims optional free text, maps blanks to `None` and enforces a length cap.
    fn normalize_text(value: Option<String>, field: &str, max_chars: usize) -> Result<Option<String>, ShareError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.chars().count() > max_chars {
            return Err(ShareError::Validation(format!(
                "{} must be at most {} characters",
                field, max_chars
            )));
        }
        Ok(Some(trimmed.to_string()))
    }

    /// Loads and checks the entries named in an issue request, in request order.
    fn validate_entries(&self, owner_id: &str, entry_ids: &[String]) -> Result<Vec<PasswordEntry>, ShareError> {
        if entry_ids.is_empty() {
            return Err(ShareError::Validation("At least one entry is required".to_string()));
        }

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(entry_ids.len());
        for id in entry_ids {
            if !seen.insert(id.as_str()) {
                return Err(ShareError::Validation(format!("Duplicate entry: {}", id)));
            }
            let entry = self
                .entries
                .get_entry(id)?
                .ok_or_else(|| ShareError::Validation(format!("Unknown entry: {}", id)))?;
            if entry.owner_id != owner_id {
                return Err(ShareError::Validation(format!(
                    "Entry {} does not belong to {}",
                    id, owner_id
                )));
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Loads every entry linked to a share, failing if any of them is gone.
    fn load_linked_entries(&self, share_id: &str) -> Result<Vec<PasswordEntry>, ShareError> {
        let ids = self.shares.linked_entry_ids(share_id)?;
        if ids.is_empty() {
            return Err(ShareError::EntriesUnavailable(share_id.to_string()));
        }

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.entries.get_entry(id)? {
                Some(entry) => entries.push(entry),
                None => return Err(ShareError::EntriesUnavailable(share_id.to_string())),
            }
        }
        Ok(entries)
    }

    /// Service name of the first entry behind a share, for log lines.
    fn lead_service_name(&self, share_id: &str) -> Result<Option<String>, ShareError> {
        let Some(first) = self.shares.linked_entry_ids(share_id)?.into_iter().next() else {
            return Ok(None);
        };
        Ok(self.entries.get_entry(&first)?.map(|e| e.service_name))
    }

    fn load_by_token(&self, token: &str) -> Result<ShareRecord, ShareError> {
        self.shares
            .get_share_by_token(token)?
            .ok_or_else(|| ShareError::NotFound(format!("token {}...", token_prefix(token))))
    }

    fn load_owned(&self, share_id: &str, owner_id: &str) -> Result<ShareRecord, ShareError> {
        let share = self
            .shares
            .get_share(share_id)?
            .ok_or_else(|| ShareError::NotFound(share_id.to_string()))?;
        if share.owner_id != owner_id {
            return Err(ShareError::Forbidden(share_id.to_string()));
        }
        Ok(share)
    }

    /// Runs load → evaluate → compare-and-swap until a round commits or
    /// finishes without writing. Each round reads the clock once.
    fn run_transition<T>(
        &self,
        load: impl Fn() -> Result<ShareRecord, ShareError>,
        mut decide: impl FnMut(ShareRecord, i64) -> Result<Step<T>, ShareError>,
    ) -> Result<T, ShareError> {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let share = load()?;
            let expected_version = share.version;
            let share_id = share.id.clone();

            match decide(share, self.clock.now())? {
                Step::Done(output) => return Ok(output),
                Step::Commit { update, log, output } => {
                    if self.shares.apply_transition(&update, expected_version, log.as_ref())? {
                        return Ok(output);
                    }
                    warn!(share_id = %share_id, attempt, "concurrent share update, re-evaluating");
                }
            }
        }

        Err(StoreError::Conflict(format!(
            "share transition did not settle after {} attempts",
            MAX_TRANSITION_ATTEMPTS
        ))
        .into())
    }
}

impl ShareLifecycleTrait for ShareLifecycle {
    /// Issues a new share over `request.entry_ids` and records its creation.
    fn issue_share(&self, request: IssueRequest) -> Result<IssuedShare, ShareError> {
        let owner_id = request.owner_id.trim();
        if owner_id.is_empty() {
            return Err(ShareError::Validation("Owner is required".to_string()));
        }
        let comment = Self::normalize_text(request.comment, "Comment", MAX_COMMENT_CHARS)?;
        let recipient_label =
            Self::normalize_text(request.recipient_label, "Recipient label", MAX_RECIPIENT_LABEL_CHARS)?;
        let entries = self.validate_entries(owner_id, &request.entry_ids)?;

        let token = self.tokens.generate_token()?;
        let now = self.clock.now();
        let expires_at = self.settings.pre_view_deadline(now);

        let share = ShareRecord {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            recipient_label: recipient_label.clone(),
            token,
            comment,
            created_at: now,
            state: ShareState::unopened(expires_at),
            opened_once: false,
            version: 0,
        };

        let mut log = ActivityLogEntry::new(owner_id, ActivityAction::ShareCreated, now);
        log.service_name = entries.first().map(|e| e.service_name.clone());
        log.recipient_label = recipient_label;
        log.expires_at = expires_at;

        let entry_ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        self.shares
            .insert_share(&share, &entry_ids, &log)
            .map_err(|e| match e {
                StoreError::DuplicateToken => {
                    warn!(token = token_prefix(&share.token), "generated share token already exists");
                    ShareError::TokenCollision
                }
                other => ShareError::Storage(other),
            })?;

        info!(
            share_id = %share.id,
            owner_id = %share.owner_id,
            entries = entry_ids.len(),
            expires_at = ?expires_at,
            "share issued"
        );

        Ok(IssuedShare {
            link: self.settings.share_link(&share.token),
            id: share.id,
            token: share.token,
            expires_at,
        })
    }

    /// Evaluates a read of the share behind `token`.
    ///
    /// Checks run in a fixed order: unknown token, inactive, expired, already
    /// consumed. The first successful read flips the share into the viewed
    /// phase with a one-hour deadline and marks it consumed.
    fn access_share(&self, token: &str) -> Result<ShareAccess, ShareError> {
        self.run_transition(
            || self.load_by_token(token),
            |share, now| {
                if !share.is_active() {
                    debug!(share_id = %share.id, "access to inactive share");
                    return Err(ShareError::Revoked);
                }
                if let Some(phase) = share.expired_at(now) {
                    debug!(share_id = %share.id, ?phase, "access to expired share");
                    return Err(ShareError::Expired(phase));
                }
                if share.opened_once {
                    debug!(share_id = %share.id, "access to consumed share");
                    return Err(ShareError::AlreadyConsumed);
                }

                let entries = self.load_linked_entries(&share.id)?;
                let first_view = !share.viewed();
                let state = share.state.mark_viewed(now, POST_VIEW_WINDOW_SECS);
                let updated = ShareRecord {
                    state,
                    opened_once: true,
                    ..share
                };

                let log = first_view.then(|| {
                    let mut log = ActivityLogEntry::new(&updated.owner_id, ActivityAction::Viewed, now);
                    log.service_name = entries.first().map(|e| e.service_name.clone());
                    log.recipient_label = updated.recipient_label.clone();
                    log.viewed_at = updated.viewed_at();
                    log.expires_at = updated.expires_at();
                    log
                });

                let output = ShareAccess {
                    entries: entries
                        .into_iter()
                        .map(|e| SharedEntryView {
                            entry_id: e.id,
                            service_name: e.service_name,
                            service_url: e.service_url,
                            username: e.username,
                            secret: e.secret,
                        })
                        .collect(),
                    expires_at: updated.expires_at(),
                    viewed_at: updated.viewed_at(),
                    comment: updated.comment.clone(),
                };

                Ok(Step::Commit {
                    update: ShareUpdate {
                        share_id: updated.id,
                        state,
                        opened_once: true,
                    },
                    log,
                    output,
                })
            },
        )
        .inspect(|access| debug!(entries = access.entries.len(), "share consumed"))
    }

    /// Recipient acknowledgement: deactivates the share behind `token`.
    fn confirm_share(&self, token: &str) -> Result<(), ShareError> {
        self.run_transition(
            || self.load_by_token(token),
            |share, now| {
                if !share.is_active() {
                    return Err(ShareError::AlreadyInactive);
                }

                let mut log = ActivityLogEntry::new(&share.owner_id, ActivityAction::Confirmed, now);
                log.service_name = self.lead_service_name(&share.id)?;
                log.recipient_label = share.recipient_label.clone();

                info!(share_id = %share.id, "share confirmed by recipient");
                Ok(Step::Commit {
                    update: ShareUpdate {
                        state: share.state.deactivate(InactiveReason::Confirmed),
                        opened_once: share.opened_once,
                        share_id: share.id,
                    },
                    log: Some(log),
                    output: (),
                })
            },
        )
    }

    /// Admin revocation. Revoking an inactive share succeeds without logging.
    fn revoke_share(&self, share_id: &str, owner_id: &str) -> Result<(), ShareError> {
        self.run_transition(
            || self.load_owned(share_id, owner_id),
            |share, now| {
                if !share.is_active() {
                    debug!(share_id = %share.id, "revoke of inactive share ignored");
                    return Ok(Step::Done(()));
                }

                let mut log = ActivityLogEntry::new(&share.owner_id, ActivityAction::Revoked, now);
                log.service_name = self.lead_service_name(&share.id)?;
                log.recipient_label = share.recipient_label.clone();

                info!(share_id = %share.id, owner_id = %share.owner_id, "share revoked");
                Ok(Step::Commit {
                    update: ShareUpdate {
                        state: share.state.deactivate(InactiveReason::Revoked),
                        opened_once: share.opened_once,
                        share_id: share.id,
                    },
                    log: Some(log),
                    output: (),
                })
            },
        )
    }

    fn list_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, ShareError> {
        Ok(self.shares.list_shares(owner_id)?)
    }

    /// Shares that are active and not past their deadline right now.
    fn list_active_shares(&self, owner_id: &str) -> Result<Vec<ShareRecord>, ShareError> {
        let now = self.clock.now();
        Ok(self
            .shares
            .list_shares(owner_id)?
            .into_iter()
            .filter(|s| s.is_live_at(now))
            .collect())
    }

    fn list_logs(&self, owner_id: &str) -> Result<Vec<ActivityLogEntry>, ShareError> {
        Ok(self.shares.list_logs(owner_id)?)
    }

    /// Entries behind one of the owner's shares. Never changes share state.
    fn share_entries(&self, share_id: &str, owner_id: &str) -> Result<Vec<PasswordEntry>, ShareError> {
        let share = self.load_owned(share_id, owner_id)?;
        self.load_linked_entries(&share.id)
    }
}
