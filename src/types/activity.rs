use serde::{Deserialize, Serialize};

/// Lifecycle transition recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    ShareCreated,
    Viewed,
    Revoked,
    Confirmed,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::ShareCreated => "share-created",
            ActivityAction::Viewed => "viewed",
            ActivityAction::Revoked => "revoked",
            ActivityAction::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "share-created" => Some(ActivityAction::ShareCreated),
            "viewed" => Some(ActivityAction::Viewed),
            "revoked" => Some(ActivityAction::Revoked),
            "confirmed" => Some(ActivityAction::Confirmed),
            _ => None,
        }
    }

    /// Status recorded alongside each action.
    pub fn status(&self) -> ActivityStatus {
        match self {
            ActivityAction::ShareCreated => ActivityStatus::Active,
            ActivityAction::Viewed => ActivityStatus::Viewed,
            ActivityAction::Revoked => ActivityStatus::Revoked,
            ActivityAction::Confirmed => ActivityStatus::Confirmed,
        }
    }
}

/// Share status at the moment a log entry was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Active,
    Viewed,
    Revoked,
    Confirmed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Viewed => "viewed",
            ActivityStatus::Revoked => "revoked",
            ActivityStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ActivityStatus::Active),
            "viewed" => Some(ActivityStatus::Viewed),
            "revoked" => Some(ActivityStatus::Revoked),
            "confirmed" => Some(ActivityStatus::Confirmed),
            _ => None,
        }
    }
}

/// Immutable audit fact. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: String,
    pub owner_id: String,
    pub action: ActivityAction,
    pub service_name: Option<String>,
    pub recipient_label: Option<String>,
    pub status: ActivityStatus,
    pub viewed_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl ActivityLogEntry {
    /// Builds a log entry for `action` with a fresh id; status follows the action.
    pub fn new(owner_id: &str, action: ActivityAction, created_at: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            action,
            service_name: None,
            recipient_label: None,
            status: action.status(),
            viewed_at: None,
            expires_at: None,
            created_at,
        }
    }
}
