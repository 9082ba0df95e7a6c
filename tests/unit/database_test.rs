//! Unit tests for the Passdrop database layer (connection, migrations, SQLite store).

use std::sync::Arc;

use passdrop::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use passdrop::database::Database;
use passdrop::storage::{EntryStore, ShareStore, SqliteStore};
use passdrop::types::activity::{ActivityAction, ActivityLogEntry};
use passdrop::types::entry::NewPasswordEntry;
use passdrop::types::errors::StoreError;
use passdrop::types::share::{InactiveReason, ShareRecord, ShareState, ShareUpdate, ViewPhase};
use tempfile::TempDir;

fn table_exists(db: &Database, kind: &str, name: &str) -> bool {
    let conn = db.connection().unwrap();
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type=?1 AND name=?2",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap_or(false)
}

fn share(id: &str, token: &str, created_at: i64) -> ShareRecord {
    ShareRecord {
        id: id.to_string(),
        owner_id: "admin".to_string(),
        recipient_label: Some("Bob".to_string()),
        token: token.to_string(),
        comment: None,
        created_at,
        state: ShareState::unopened(Some(created_at + 100)),
        opened_once: false,
        version: 0,
    }
}

fn created_log(at: i64) -> ActivityLogEntry {
    ActivityLogEntry::new("admin", ActivityAction::ShareCreated, at)
}

#[test]
fn test_open_in_memory_succeeds() {
    assert!(Database::open_in_memory().is_ok());
}

#[test]
fn test_migrations_create_all_tables() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    for table in ["password_entries", "shares", "share_entries", "activity_logs"] {
        assert!(table_exists(&db, "table", table), "Table '{}' should exist", table);
    }
    for index in ["idx_password_entries_owner", "idx_shares_owner", "idx_activity_logs_owner"] {
        assert!(table_exists(&db, "index", index), "Index '{}' should exist", index);
    }
}

#[test]
fn test_migrations_are_idempotent() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection().unwrap();
    assert!(run_all(&conn).is_ok());
    assert_eq!(get_schema_version(&conn), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_file_database_persists_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("passdrop.db");

    let entry_id = {
        let store = SqliteStore::new(Arc::new(Database::open(&path).unwrap()));
        let entry = store
            .create_entry(
                NewPasswordEntry {
                    owner_id: "admin".to_string(),
                    service_name: "GitHub".to_string(),
                    service_url: Some("https://github.com".to_string()),
                    username: "octo".to_string(),
                    secret: "hunter2".to_string(),
                },
                10,
            )
            .unwrap();
        store.insert_share(&share("s1", "tok-1", 10), &[entry.id.clone()], &created_log(10)).unwrap();
        entry.id
    };

    let store = SqliteStore::new(Arc::new(Database::open(&path).unwrap()));
    assert_eq!(store.get_entry(&entry_id).unwrap().unwrap().secret, "hunter2");
    assert_eq!(store.get_share_by_token("tok-1").unwrap().unwrap().id, "s1");
    assert_eq!(store.linked_entry_ids("s1").unwrap(), vec![entry_id]);
}

#[test]
fn test_duplicate_token_is_reported() {
    let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
    store.insert_share(&share("s1", "same", 1), &[], &created_log(1)).unwrap();
    let err = store.insert_share(&share("s2", "same", 2), &[], &created_log(2)).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateToken));
    // the failed insert left no log behind
    assert_eq!(store.list_logs("admin").unwrap().len(), 1);
}

#[test]
fn test_transition_applies_only_at_expected_version() {
    let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
    store.insert_share(&share("s1", "t", 1), &[], &created_log(1)).unwrap();

    let update = ShareUpdate {
        share_id: "s1".to_string(),
        state: ShareState::unopened(Some(101)).mark_viewed(5, 3600),
        opened_once: true,
    };
    let log = ActivityLogEntry::new("admin", ActivityAction::Viewed, 5);

    assert!(store.apply_transition(&update, 0, Some(&log)).unwrap());
    assert!(!store.apply_transition(&update, 0, Some(&log)).unwrap());

    let stored = store.get_share("s1").unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert!(stored.opened_once);
    assert_eq!(
        stored.state.phase(),
        ViewPhase::Viewed { viewed_at: 5, expires_at: 3605 }
    );
    assert_eq!(store.list_logs("admin").unwrap().len(), 2);
}

#[test]
fn test_inconsistent_view_columns_are_rejected() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    {
        let conn = db.connection().unwrap();
        conn.execute(
            "INSERT INTO shares (id, owner_id, token, created_at, viewed, viewed_at, active)
             VALUES ('bad', 'admin', 'tok', 1, 1, NULL, 1)",
            [],
        )
        .unwrap();
    }
    let store = SqliteStore::new(db);
    assert!(matches!(store.get_share("bad"), Err(StoreError::DatabaseError(_))));
}

#[test]
fn test_failed_log_insert_rolls_back_transition() {
    let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
    let log = created_log(1);
    store.insert_share(&share("s1", "t", 1), &[], &log).unwrap();

    let update = ShareUpdate {
        share_id: "s1".to_string(),
        state: ShareState::unopened(Some(101)).mark_viewed(5, 3600),
        opened_once: true,
    };
    // Reusing the log id trips the activity_logs primary key after the UPDATE ran.
    assert!(store.apply_transition(&update, 0, Some(&log)).is_err());

    let stored = store.get_share("s1").unwrap().unwrap();
    assert_eq!(stored.version, 0);
    assert!(!stored.opened_once);
    assert_eq!(stored.state.phase(), ViewPhase::Unopened { expires_at: Some(101) });
    assert_eq!(store.list_logs("admin").unwrap().len(), 1);
}

fn insert_inactive_row(db: &Database, id: &str, reason: Option<&str>) {
    let conn = db.connection().unwrap();
    conn.execute(
        "INSERT INTO shares (id, owner_id, token, created_at, viewed, viewed_at, active, inactive_reason)
         VALUES (?1, 'admin', ?1, 1, 0, NULL, 0, ?2)",
        rusqlite::params![id, reason],
    )
    .unwrap();
}

#[test]
fn test_unknown_inactive_reason_is_rejected() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    insert_inactive_row(&db, "bogus", Some("bogus"));
    let store = SqliteStore::new(db);
    assert!(matches!(store.get_share("bogus"), Err(StoreError::DatabaseError(_))));
}

#[test]
fn test_missing_inactive_reason_reads_as_revoked() {
    let db = Arc::new(Database::open_in_memory().unwrap());
    insert_inactive_row(&db, "legacy", None);
    let store = SqliteStore::new(db);
    let stored = store.get_share("legacy").unwrap().unwrap();
    assert_eq!(stored.inactive_reason(), Some(InactiveReason::Revoked));
}

#[test]
fn test_lists_are_newest_first() {
    let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
    store.insert_share(&share("old", "t1", 1), &[], &created_log(1)).unwrap();
    store.insert_share(&share("new", "t2", 2), &[], &created_log(2)).unwrap();
    store.insert_share(&share("tie", "t3", 2), &[], &created_log(2)).unwrap();

    let ids: Vec<String> = store.list_shares("admin").unwrap().into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec!["tie", "new", "old"]);
}
