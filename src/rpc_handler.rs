//! RPC method handler for the Passdrop JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be tested without stdin/stdout.
//! `handle_method` dispatches each call to the lifecycle engine, the stats
//! aggregator or the entry store held by [`App`]. Timestamps leave this layer
//! in milliseconds.

use std::fmt;
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::app::App;
use crate::services::share_lifecycle::ShareLifecycleTrait;
use crate::storage::EntryStore;
use crate::types::activity::ActivityLogEntry;
use crate::types::entry::{NewPasswordEntry, PasswordEntry};
use crate::types::errors::{ShareError, StoreError};
use crate::types::share::{IssueRequest, ShareRecord};

/// Error returned to the RPC client as `{"error": message, "code": code}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: &'static str,
    pub message: String,
}

impl RpcError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: "invalid_params",
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({"error": self.message, "code": self.code})
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl From<ShareError> for RpcError {
    fn from(e: ShareError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for RpcError {
    fn from(e: StoreError) -> Self {
        ShareError::Storage(e).into()
    }
}

fn lock_app(app: &Mutex<App>) -> Result<std::sync::MutexGuard<'_, App>, RpcError> {
    app.lock().map_err(|_| RpcError {
        code: "internal_error",
        message: "app lock poisoned".to_string(),
    })
}

fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RpcError::invalid_params(format!("missing {}", key)))
}

fn optional_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

fn ms(secs: i64) -> i64 {
    secs * 1000
}

fn share_json(s: &ShareRecord) -> Value {
    json!({
        "id": s.id,
        "recipient_label": s.recipient_label,
        "comment": s.comment,
        "created_at": ms(s.created_at),
        "active": s.is_active(),
        "inactive_reason": s.inactive_reason().map(|r| r.as_str()),
        "viewed": s.viewed(),
        "viewed_at": s.viewed_at().map(ms),
        "expires_at": s.expires_at().map(ms),
        "opened_once": s.opened_once,
    })
}

fn entry_json(e: &PasswordEntry) -> Value {
    json!({
        "id": e.id,
        "service_name": e.service_name,
        "service_url": e.service_url,
        "username": e.username,
        "created_at": ms(e.created_at),
    })
}

fn log_json(l: &ActivityLogEntry) -> Value {
    json!({
        "id": l.id,
        "action": l.action.as_str(),
        "status": l.status.as_str(),
        "service_name": l.service_name,
        "recipient_label": l.recipient_label,
        "viewed_at": l.viewed_at.map(ms),
        "expires_at": l.expires_at.map(ms),
        "created_at": ms(l.created_at),
    })
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Entries ───
        "entry.create" => {
            let entry = NewPasswordEntry {
                owner_id: required_str(params, "owner_id")?.to_string(),
                service_name: required_str(params, "service_name")?.to_string(),
                service_url: optional_str(params, "service_url").filter(|u| !u.is_empty()),
                username: required_str(params, "username")?.to_string(),
                secret: required_str(params, "secret")?.to_string(),
            };
            let a = lock_app(app)?;
            let created = a.store.create_entry(entry, a.clock.now())?;
            Ok(entry_json(&created))
        }
        "entry.list" => {
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let entries = a.store.list_entries(owner_id)?;
            Ok(json!(entries.iter().map(entry_json).collect::<Vec<_>>()))
        }

        // ─── Shares ───
        "share.issue" => {
            let entry_ids = params
                .get("entry_ids")
                .and_then(|v| v.as_array())
                .ok_or_else(|| RpcError::invalid_params("missing entry_ids"))?
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| RpcError::invalid_params("entry_ids must be strings"))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let request = IssueRequest {
                owner_id: required_str(params, "owner_id")?.to_string(),
                entry_ids,
                comment: optional_str(params, "comment"),
                recipient_label: optional_str(params, "recipient_label"),
            };
            let a = lock_app(app)?;
            let issued = a.lifecycle.issue_share(request)?;
            Ok(json!({
                "id": issued.id,
                "token": issued.token,
                "link": issued.link,
                "expires_at": issued.expires_at.map(ms),
            }))
        }
        "share.access" => {
            let token = required_str(params, "token")?;
            let a = lock_app(app)?;
            let access = a.lifecycle.access_share(token)?;
            // The views are wiped when `access` drops; the copies in the response are not.
            let entries: Vec<Value> = access
                .entries
                .iter()
                .map(|e| {
                    json!({
                        "entry_id": e.entry_id,
                        "service_name": e.service_name,
                        "service_url": e.service_url,
                        "username": e.username,
                        "password": e.secret,
                    })
                })
                .collect();
            Ok(json!({
                "entries": entries,
                "comment": access.comment,
                "viewed_at": access.viewed_at.map(ms),
                "expires_at": access.expires_at.map(ms),
            }))
        }
        "share.confirm" => {
            let token = required_str(params, "token")?;
            let a = lock_app(app)?;
            a.lifecycle.confirm_share(token)?;
            Ok(json!({"ok": true}))
        }
        "share.revoke" => {
            let id = required_str(params, "id")?;
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            a.lifecycle.revoke_share(id, owner_id)?;
            Ok(json!({"ok": true}))
        }
        "share.list" => {
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let shares = a.lifecycle.list_shares(owner_id)?;
            Ok(json!(shares.iter().map(share_json).collect::<Vec<_>>()))
        }
        "share.active" => {
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let shares = a.lifecycle.list_active_shares(owner_id)?;
            Ok(json!(shares.iter().map(share_json).collect::<Vec<_>>()))
        }
        "share.entries" => {
            let id = required_str(params, "id")?;
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let entries = a.lifecycle.share_entries(id, owner_id)?;
            Ok(json!(entries.iter().map(entry_json).collect::<Vec<_>>()))
        }

        // ─── Activity & stats ───
        "log.list" => {
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let logs = a.lifecycle.list_logs(owner_id)?;
            Ok(json!(logs.iter().map(log_json).collect::<Vec<_>>()))
        }
        "stats.get" => {
            let owner_id = required_str(params, "owner_id")?;
            let a = lock_app(app)?;
            let stats = a.stats.get_stats(owner_id)?;
            Ok(json!({
                "active_count": stats.active_count,
                "created_today_count": stats.created_today_count,
                "expiring_soon_count": stats.expiring_soon_count,
                "viewed_count": stats.viewed_count,
            }))
        }

        _ => Err(RpcError {
            code: "unknown_method",
            message: format!("unknown method: {}", method),
        }),
    }
}
