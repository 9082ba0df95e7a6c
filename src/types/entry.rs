use serde::{Deserialize, Serialize};

/// A credential record owned by an admin.
///
/// Immutable once created. The share engine only ever reads these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
    pub id: String,
    pub owner_id: String,
    pub service_name: String,
    pub service_url: Option<String>,
    pub username: String,
    pub secret: String,
    pub created_at: i64,
}

/// Input for creating a new credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPasswordEntry {
    pub owner_id: String,
    pub service_name: String,
    pub service_url: Option<String>,
    pub username: String,
    pub secret: String,
}
