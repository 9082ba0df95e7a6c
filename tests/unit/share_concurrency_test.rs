//! Concurrent access to one share: the single-use guarantee must hold when
//! several readers race on the same token.

use std::sync::{Arc, Barrier};
use std::thread;

use passdrop::database::Database;
use passdrop::services::share_lifecycle::{ShareLifecycle, ShareLifecycleTrait};
use passdrop::storage::{EntryStore, MemoryStore, ShareStore, SqliteStore};
use passdrop::types::activity::ActivityAction;
use passdrop::types::entry::NewPasswordEntry;
use passdrop::types::errors::ShareError;
use passdrop::types::settings::ShareSettings;
use passdrop::types::share::IssueRequest;
use rstest::rstest;
use tempfile::TempDir;

const READERS: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    SqliteFile,
}

fn engine_with_share(backend: Backend, tmp: &TempDir) -> Arc<ShareLifecycle> {
    let (shares, entries): (Arc<dyn ShareStore>, Arc<dyn EntryStore>) = match backend {
        Backend::Memory => {
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn ShareStore>, store as Arc<dyn EntryStore>)
        }
        Backend::SqliteFile => {
            let db = Database::open(tmp.path().join("race.db")).unwrap();
            let store = Arc::new(SqliteStore::new(Arc::new(db)));
            (store.clone() as Arc<dyn ShareStore>, store as Arc<dyn EntryStore>)
        }
    };
    let entry = entries
        .create_entry(
            NewPasswordEntry {
                owner_id: "admin".to_string(),
                service_name: "Vault".to_string(),
                service_url: None,
                username: "root".to_string(),
                secret: "s3cr3t".to_string(),
            },
            0,
        )
        .unwrap();
    let engine = ShareLifecycle::new(shares, entries, ShareSettings::default());
    engine
        .issue_share(IssueRequest {
            owner_id: "admin".to_string(),
            entry_ids: vec![entry.id],
            ..IssueRequest::default()
        })
        .unwrap();
    Arc::new(engine)
}

fn token_of_only_share(engine: &ShareLifecycle) -> (String, String) {
    let share = engine.list_shares("admin").unwrap().remove(0);
    (share.id, share.token)
}

fn race<T: Send + 'static>(
    engine: &Arc<ShareLifecycle>,
    f: impl Fn(&ShareLifecycle, usize) -> T + Send + Sync + 'static,
) -> Vec<T> {
    let barrier = Arc::new(Barrier::new(READERS));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..READERS)
        .map(|i| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let f = f.clone();
            thread::spawn(move || {
                barrier.wait();
                f(&engine, i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[rstest]
fn test_exactly_one_concurrent_reader_wins(#[values(Backend::Memory, Backend::SqliteFile)] backend: Backend) {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with_share(backend, &tmp);
    let (_, token) = token_of_only_share(&engine);

    let results = race(&engine, move |e, _| e.access_share(&token).map(|a| a.entries.len()));

    let winners = results.iter().filter(|r| matches!(r, Ok(1))).count();
    let consumed = results
        .iter()
        .filter(|r| matches!(r, Err(ShareError::AlreadyConsumed)))
        .count();
    assert_eq!(winners, 1, "results: {:?}", results);
    assert_eq!(consumed, READERS - 1);

    let viewed_logs = engine
        .list_logs("admin")
        .unwrap()
        .into_iter()
        .filter(|l| l.action == ActivityAction::Viewed)
        .count();
    assert_eq!(viewed_logs, 1);
}

#[rstest]
fn test_exactly_one_concurrent_confirm_wins(#[values(Backend::Memory, Backend::SqliteFile)] backend: Backend) {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with_share(backend, &tmp);
    let (_, token) = token_of_only_share(&engine);

    let results = race(&engine, move |e, _| e.confirm_share(&token));

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| matches!(r, Err(ShareError::AlreadyInactive))));
    let confirmed = engine
        .list_logs("admin")
        .unwrap()
        .into_iter()
        .filter(|l| l.action == ActivityAction::Confirmed)
        .count();
    assert_eq!(confirmed, 1);
}

#[rstest]
fn test_revoke_racing_readers_never_leaks_after_revocation(
    #[values(Backend::Memory, Backend::SqliteFile)] backend: Backend,
) {
    let tmp = TempDir::new().unwrap();
    let engine = engine_with_share(backend, &tmp);
    let (id, token) = token_of_only_share(&engine);

    let results = race(&engine, move |e, i| {
        if i == 0 {
            e.revoke_share(&id, "admin").map(|_| 0)
        } else {
            e.access_share(&token).map(|a| a.entries.len())
        }
    });

    let reads_ok = results[1..].iter().filter(|r| r.is_ok()).count();
    assert!(results[0].is_ok());
    assert!(reads_ok <= 1);
    for r in &results[1..] {
        assert!(matches!(
            r,
            Ok(_) | Err(ShareError::Revoked) | Err(ShareError::AlreadyConsumed)
        ));
    }

    let logs = engine.list_logs("admin").unwrap();
    let revoked = logs.iter().filter(|l| l.action == ActivityAction::Revoked).count();
    let viewed = logs.iter().filter(|l| l.action == ActivityAction::Viewed).count();
    assert_eq!(revoked, 1);
    assert_eq!(viewed, reads_ok);
}
