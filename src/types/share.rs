use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::errors::ExpiryPhase;

/// Where a share stands with respect to its first successful access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ViewPhase {
    /// Nobody has read the share yet. `expires_at` is the pre-view deadline,
    /// or `None` when the share stays open until the first view.
    Unopened { expires_at: Option<i64> },
    /// The share was read once at `viewed_at`; it lapses at `expires_at`.
    Viewed { viewed_at: i64, expires_at: i64 },
}

/// Why a share stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InactiveReason {
    Revoked,
    Confirmed,
}

impl InactiveReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InactiveReason::Revoked => "revoked",
            InactiveReason::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "revoked" => Some(InactiveReason::Revoked),
            "confirmed" => Some(InactiveReason::Confirmed),
            _ => None,
        }
    }
}

/// Lifecycle state of a share. `Inactive` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShareState {
    Active { phase: ViewPhase },
    Inactive { reason: InactiveReason, phase: ViewPhase },
}

impl ShareState {
    /// State of a freshly issued share.
    pub fn unopened(expires_at: Option<i64>) -> Self {
        ShareState::Active {
            phase: ViewPhase::Unopened { expires_at },
        }
    }

    pub fn phase(&self) -> ViewPhase {
        match *self {
            ShareState::Active { phase } | ShareState::Inactive { phase, .. } => phase,
        }
    }

    /// Moves an active, unopened share into the viewed phase with a fresh
    /// deadline of `now + window`. Any other state is returned unchanged.
    pub fn mark_viewed(self, now: i64, window: i64) -> Self {
        match self {
            ShareState::Active {
                phase: ViewPhase::Unopened { .. },
            } => ShareState::Active {
                phase: ViewPhase::Viewed {
                    viewed_at: now,
                    expires_at: now + window,
                },
            },
            other => other,
        }
    }

    /// Deactivates an active share. Inactive shares keep their original reason.
    pub fn deactivate(self, reason: InactiveReason) -> Self {
        match self {
            ShareState::Active { phase } => ShareState::Inactive { reason, phase },
            inactive => inactive,
        }
    }
}

/// A disposable link exposing one or more password entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: String,
    pub owner_id: String,
    pub recipient_label: Option<String>,
    pub token: String,
    pub comment: Option<String>,
    pub created_at: i64,
    pub state: ShareState,
    pub opened_once: bool,
    pub version: i64,
}

impl ShareRecord {
    pub fn is_active(&self) -> bool {
        matches!(self.state, ShareState::Active { .. })
    }

    pub fn viewed(&self) -> bool {
        matches!(self.state.phase(), ViewPhase::Viewed { .. })
    }

    pub fn viewed_at(&self) -> Option<i64> {
        match self.state.phase() {
            ViewPhase::Viewed { viewed_at, .. } => Some(viewed_at),
            ViewPhase::Unopened { .. } => None,
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        match self.state.phase() {
            ViewPhase::Unopened { expires_at } => expires_at,
            ViewPhase::Viewed { expires_at, .. } => Some(expires_at),
        }
    }

    pub fn inactive_reason(&self) -> Option<InactiveReason> {
        match self.state {
            ShareState::Inactive { reason, .. } => Some(reason),
            ShareState::Active { .. } => None,
        }
    }

    /// Returns the window that has lapsed at `now`, if any.
    ///
    /// The deadline itself is still inside the window.
    pub fn expired_at(&self, now: i64) -> Option<ExpiryPhase> {
        match self.state.phase() {
            ViewPhase::Unopened {
                expires_at: Some(deadline),
            } if now > deadline => Some(ExpiryPhase::BeforeView),
            ViewPhase::Viewed { expires_at, .. } if now > expires_at => {
                Some(ExpiryPhase::AfterView)
            }
            _ => None,
        }
    }

    /// Active and not past its deadline.
    pub fn is_live_at(&self, now: i64) -> bool {
        self.is_active() && self.expires_at().map_or(true, |deadline| deadline > now)
    }
}

/// Link row between a share and one of its entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEntryLink {
    pub share_id: String,
    pub entry_id: String,
}

/// New state for a share, applied by the store under a version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareUpdate {
    pub share_id: String,
    pub state: ShareState,
    pub opened_once: bool,
}

/// Parameters for issuing a share.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueRequest {
    pub owner_id: String,
    pub entry_ids: Vec<String>,
    pub comment: Option<String>,
    pub recipient_label: Option<String>,
}

/// What the admin gets back after issuing a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedShare {
    pub id: String,
    pub token: String,
    pub expires_at: Option<i64>,
    pub link: String,
}

/// One credential as shown to the recipient. The secret is wiped on drop.
#[derive(Debug, Clone, Serialize, Zeroize, ZeroizeOnDrop)]
pub struct SharedEntryView {
    pub entry_id: String,
    pub service_name: String,
    pub service_url: Option<String>,
    pub username: String,
    pub secret: String,
}

/// Result of the single permitted read of a share.
#[derive(Debug, Clone, Serialize)]
pub struct ShareAccess {
    pub entries: Vec<SharedEntryView>,
    pub expires_at: Option<i64>,
    pub viewed_at: Option<i64>,
    pub comment: Option<String>,
}
