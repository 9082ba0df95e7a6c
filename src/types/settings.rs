use serde::{Deserialize, Serialize};

/// Default length of the pre-view window in days.
pub const DEFAULT_PRE_VIEW_DAYS: u32 = 14;

/// Top-level service settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServiceSettings {
    #[serde(default)]
    pub share: ShareSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// How long an unopened share stays reachable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PreViewPolicy {
    /// Unopened shares lapse `pre_view_days` after issuance.
    Bounded,
    /// Unopened shares carry no deadline until someone opens them.
    UntilFirstView,
}

/// Share issuance settings. Missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShareSettings {
    pub pre_view_policy: PreViewPolicy,
    pub pre_view_days: u32,
    pub public_base_url: String,
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            pre_view_policy: PreViewPolicy::Bounded,
            pre_view_days: DEFAULT_PRE_VIEW_DAYS,
            public_base_url: "http://localhost:5000".to_string(),
        }
    }
}

impl ShareSettings {
    /// Pre-view deadline for a share issued at `now`, or `None` when unbounded.
    pub fn pre_view_deadline(&self, now: i64) -> Option<i64> {
        match self.pre_view_policy {
            PreViewPolicy::Bounded => Some(now + i64::from(self.pre_view_days) * 86_400),
            PreViewPolicy::UntilFirstView => None,
        }
    }

    /// Public URL the recipient opens for `token`.
    pub fn share_link(&self, token: &str) -> String {
        format!("{}/view/{}", self.public_base_url.trim_end_matches('/'), token)
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_file: "passdrop.db".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "passdrop=info".to_string(),
        }
    }
}
