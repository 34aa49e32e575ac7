//! Unit tests for the TimestampStore read-modify-write contract.
//!
//! Covers fetch degradation (invalid session, failing store, corrupt data),
//! sorted appends, single and bulk removal, and change notifications.

#[path = "../support/mod.rs"]
mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vidmarks::database::kv_store::{MemoryKvStore, SqliteKvStore};
use vidmarks::services::lifecycle_guard::SessionHandle;
use vidmarks::services::timestamp_store::TimestampStore;
use vidmarks::types::bookmark::{Bookmark, ContentId};
use vidmarks::types::errors::StoreError;

use support::FaultyStore;

fn video(id: &str) -> ContentId {
    ContentId::new(id).unwrap()
}

fn memory_store() -> TimestampStore<MemoryKvStore> {
    TimestampStore::new(Arc::new(MemoryKvStore::new()), SessionHandle::new())
}

fn faulty_store() -> (Arc<FaultyStore>, SessionHandle, TimestampStore<FaultyStore>) {
    let kv = Arc::new(FaultyStore::new());
    let session = SessionHandle::new();
    let store = TimestampStore::new(kv.clone(), session.clone());
    (kv, session, store)
}

fn times(bookmarks: &[Bookmark]) -> Vec<f64> {
    bookmarks.iter().map(|b| b.time).collect()
}

#[tokio::test]
async fn test_fetch_unknown_video_is_empty() {
    let store = memory_store();
    assert!(store.fetch(&video("nothing-here")).await.is_empty());
}

#[tokio::test]
async fn test_append_default_title_round_trip() {
    let store = memory_store();
    let id = video("abc123");

    store.append(&id, Bookmark::at(42.0).unwrap()).await.unwrap();

    let bookmarks = store.fetch(&id).await;
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].time, 42.0);
    assert_eq!(bookmarks[0].title, "Bookmark at 00:00:42");
    assert_eq!(bookmarks[0].description, "");
}

#[tokio::test]
async fn test_append_keeps_list_sorted() {
    let store = memory_store();
    let id = video("abc123");

    store.append(&id, Bookmark::at(10.0).unwrap()).await.unwrap();
    let written = store.append(&id, Bookmark::at(5.0).unwrap()).await.unwrap();

    assert_eq!(times(&written), vec![5.0, 10.0]);
    assert_eq!(times(&store.fetch(&id).await), vec![5.0, 10.0]);
}

#[tokio::test]
async fn test_append_rereads_store_before_writing() {
    // Two handles over one store stand in for two contexts.
    let kv = Arc::new(MemoryKvStore::new());
    let panel_side = TimestampStore::new(kv.clone(), SessionHandle::new());
    let page_side = TimestampStore::new(kv, SessionHandle::new());
    let id = video("abc123");

    panel_side.append(&id, Bookmark::at(1.0).unwrap()).await.unwrap();
    page_side.append(&id, Bookmark::at(2.0).unwrap()).await.unwrap();

    assert_eq!(times(&panel_side.fetch(&id).await), vec![1.0, 2.0]);
}

#[tokio::test]
async fn test_lists_are_isolated_per_video() {
    let store = memory_store();
    store.append(&video("a"), Bookmark::at(1.0).unwrap()).await.unwrap();
    store.append(&video("b"), Bookmark::at(2.0).unwrap()).await.unwrap();

    assert_eq!(times(&store.fetch(&video("a")).await), vec![1.0]);
    assert_eq!(times(&store.fetch(&video("b")).await), vec![2.0]);
}

#[tokio::test]
async fn test_remove_one_removes_matching_time() {
    let store = memory_store();
    let id = video("abc123");
    for t in [3.0, 1.5, 7.25] {
        store.append(&id, Bookmark::at(t).unwrap()).await.unwrap();
    }

    let remaining = store.remove_one(&id, 3.0).await.unwrap();
    assert_eq!(times(&remaining), vec![1.5, 7.25]);
    assert_eq!(times(&store.fetch(&id).await), vec![1.5, 7.25]);
}

#[tokio::test]
async fn test_remove_one_tolerates_float_drift() {
    let store = memory_store();
    let id = video("abc123");
    store.append(&id, Bookmark::at(0.1 + 0.2).unwrap()).await.unwrap();

    let remaining = store.remove_one(&id, 0.3).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_remove_one_missing_time_leaves_list_unchanged() {
    let (kv, _session, store) = faulty_store();
    let id = video("abc123");
    store.append(&id, Bookmark::at(10.0).unwrap()).await.unwrap();
    let before = store.fetch(&id).await;
    let sets_before = kv.set_calls();

    let result = store.remove_one(&id, 11.0).await;

    assert_eq!(result, Err(StoreError::NotFound(11.0)));
    assert_eq!(kv.set_calls(), sets_before, "nothing may be written on a miss");
    assert_eq!(store.fetch(&id).await, before);
}

#[tokio::test]
async fn test_remove_all_empties_any_list() {
    let store = memory_store();
    let id = video("abc123");
    for t in [1.0, 2.0, 3.0] {
        store.append(&id, Bookmark::at(t).unwrap()).await.unwrap();
    }

    store.remove_all(&id).await.unwrap();
    assert!(store.fetch(&id).await.is_empty());

    // Clearing an absent list is fine too.
    store.remove_all(&video("never-seen")).await.unwrap();
    assert!(store.fetch(&video("never-seen")).await.is_empty());
}

#[tokio::test]
async fn test_invalid_session_fetch_skips_store() {
    let (kv, session, store) = faulty_store();
    let id = video("abc123");
    store.append(&id, Bookmark::at(1.0).unwrap()).await.unwrap();
    let gets_before = kv.get_calls();

    session.invalidate();

    assert!(store.fetch(&id).await.is_empty());
    assert_eq!(kv.get_calls(), gets_before);
}

#[tokio::test]
async fn test_invalid_session_mutations_fail_without_store_calls() {
    let (kv, session, store) = faulty_store();
    let id = video("abc123");
    session.invalidate();

    assert_eq!(store.append(&id, Bookmark::at(1.0).unwrap()).await, Err(StoreError::SessionInvalid));
    assert_eq!(store.remove_one(&id, 1.0).await, Err(StoreError::SessionInvalid));
    assert_eq!(store.remove_all(&id).await, Err(StoreError::SessionInvalid));
    assert_eq!(kv.get_calls(), 0);
    assert_eq!(kv.set_calls(), 0);
}

#[tokio::test]
async fn test_unreadable_store_fetch_degrades_to_empty() {
    let (kv, _session, store) = faulty_store();
    let id = video("abc123");
    store.append(&id, Bookmark::at(1.0).unwrap()).await.unwrap();

    kv.fail_gets(true);
    assert!(store.fetch(&id).await.is_empty());
}

#[tokio::test]
async fn test_failed_save_is_reported() {
    let (kv, _session, store) = faulty_store();
    let id = video("abc123");
    kv.fail_sets(true);

    let result = store.append(&id, Bookmark::at(1.0).unwrap()).await;
    assert!(matches!(result, Err(StoreError::StoreUnavailable(_))));

    kv.fail_sets(false);
    assert!(store.fetch(&id).await.is_empty());
}

#[tokio::test]
async fn test_failed_read_aborts_append_without_overwrite() {
    let (kv, _session, store) = faulty_store();
    let id = video("abc123");
    store.append(&id, Bookmark::at(1.0).unwrap()).await.unwrap();
    let sets_before = kv.set_calls();

    kv.fail_gets(true);
    let result = store.append(&id, Bookmark::at(2.0).unwrap()).await;
    assert!(matches!(result, Err(StoreError::StoreUnavailable(_))));
    assert_eq!(kv.set_calls(), sets_before);

    kv.fail_gets(false);
    assert_eq!(times(&store.fetch(&id).await), vec![1.0]);
}

#[tokio::test]
async fn test_corrupt_value_reads_empty_but_is_not_overwritten() {
    let (kv, _session, store) = faulty_store();
    let id = video("abc123");
    kv.put_raw("abc123", "{not json").await;

    assert!(store.fetch(&id).await.is_empty());
    let result = store.append(&id, Bookmark::at(1.0).unwrap()).await;
    assert_eq!(result, Err(StoreError::Corrupt("abc123".to_string())));

    // Clearing is the way out of a corrupt list.
    store.remove_all(&id).await.unwrap();
    store.append(&id, Bookmark::at(1.0).unwrap()).await.unwrap();
    assert_eq!(store.fetch(&id).await.len(), 1);
}

#[tokio::test]
async fn test_reads_lists_written_by_page_scripts() {
    let (kv, _session, store) = faulty_store();
    kv.put_raw(
        "abc123",
        r#"[{"time":12.5,"title":"Intro","description":"","createdAt":"2024-05-01T10:00:00.000Z"}]"#,
    )
    .await;

    let bookmarks = store.fetch(&video("abc123")).await;
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].title, "Intro");
    assert_eq!(bookmarks[0].time, 12.5);
}

#[tokio::test]
async fn test_subscribers_see_changes_from_other_handles() {
    let kv = Arc::new(SqliteKvStore::open_in_memory().unwrap());
    let writer = TimestampStore::new(kv.clone(), SessionHandle::new());
    let listener = TimestampStore::new(kv, SessionHandle::new());
    let mut changes = listener.subscribe();
    let id = video("abc123");

    writer.append(&id, Bookmark::at(8.0).unwrap()).await.unwrap();

    let (changed_id, bookmarks) = tokio::time::timeout(Duration::from_secs(1), changes.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(changed_id, id);
    assert_eq!(times(&bookmarks), vec![8.0]);
}

#[tokio::test]
async fn test_on_external_change_invokes_callback() {
    let store = memory_store();
    let seen: Arc<Mutex<Vec<(String, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let task = store.on_external_change(move |id, bookmarks| {
        sink.lock().unwrap().push((id.to_string(), bookmarks.len()));
    });

    store.append(&video("abc123"), Bookmark::at(1.0).unwrap()).await.unwrap();
    store.remove_all(&video("abc123")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), async {
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    task.abort();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![("abc123".to_string(), 1), ("abc123".to_string(), 0)]
    );
}
