//! Unit tests for the companion panel and the background coordinator.

use std::sync::{Arc, Mutex};

use serde_json::json;

use vidmarks::database::kv_store::MemoryKvStore;
use vidmarks::managers::coordinator::{announcement_for, Coordinator, SidePanelOpener};
use vidmarks::managers::panel::{PanelController, PanelView};
use vidmarks::services::lifecycle_guard::SessionHandle;
use vidmarks::services::message_bus::MessageBus;
use vidmarks::services::timestamp_store::TimestampStore;
use vidmarks::types::bookmark::{Bookmark, ContentId};
use vidmarks::types::errors::MessageError;
use vidmarks::types::message::{Command, ContextId, TabInfo, TabStatus};
use vidmarks::types::settings::HostSettings;

const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc123";

fn tab(url: &str) -> TabInfo {
    TabInfo {
        tab_id: 7,
        window_id: 1,
        url: url.to_string(),
    }
}

fn panel() -> (TimestampStore<MemoryKvStore>, Arc<MessageBus>, PanelController<MemoryKvStore>) {
    let session = SessionHandle::new();
    let store = TimestampStore::new(Arc::new(MemoryKvStore::new()), session.clone());
    let bus = Arc::new(MessageBus::new(session));
    let panel = PanelController::new(store.clone(), bus.clone(), HostSettings::default());
    (store, bus, panel)
}

// --- panel ---

#[tokio::test]
async fn test_panel_lists_bookmarks_with_labels() {
    let (store, _bus, mut panel) = panel();
    let id = ContentId::new("abc123").unwrap();
    store.append(&id, Bookmark::new(65.0, Some("Chorus"), Some("second one")).unwrap()).await.unwrap();
    store.append(&id, Bookmark::at(3.0).unwrap()).await.unwrap();

    let view = panel.open(&tab(WATCH_URL)).await.clone();

    let PanelView::Bookmarks { video_id, rows } = view else {
        panic!("expected bookmarks view");
    };
    assert_eq!(video_id, id);
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["00:00:03", "00:01:05"]);
    assert_eq!(rows[1].title, "Chorus");
    assert_eq!(rows[1].description, "second one");
}

#[tokio::test]
async fn test_panel_on_non_video_page() {
    let (_store, _bus, mut panel) = panel();

    let view = panel.open(&tab("https://www.youtube.com/feed/trending")).await;

    assert_eq!(*view, PanelView::NotAVideoPage);
}

#[tokio::test]
async fn test_panel_empty_list_for_unknown_video() {
    let (_store, _bus, mut panel) = panel();

    let view = panel.open(&tab(WATCH_URL)).await;

    assert!(matches!(view, PanelView::Bookmarks { rows, .. } if rows.is_empty()));
}

#[tokio::test]
async fn test_panel_applies_only_changes_for_shown_video() {
    let (_store, _bus, mut panel) = panel();
    panel.open(&tab(WATCH_URL)).await;
    let shown = ContentId::new("abc123").unwrap();
    let other = ContentId::new("zzz").unwrap();

    assert!(!panel.apply_change(&other, &[Bookmark::at(1.0).unwrap()]));
    assert!(panel.apply_change(&shown, &[Bookmark::at(2.0).unwrap()]));

    let PanelView::Bookmarks { rows, .. } = panel.view() else {
        panic!("expected bookmarks view");
    };
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].time, 2.0);
}

#[tokio::test]
async fn test_panel_commands_reach_active_page() {
    let (_store, bus, mut panel) = panel();
    let mut inbox = bus.register(ContextId::Page(7));
    panel.open(&tab(WATCH_URL)).await;

    panel.jump(12.0).unwrap();
    panel.delete(3.0).unwrap();
    panel.delete_all().unwrap();
    panel.create().unwrap();

    let received: Vec<_> = std::iter::from_fn(|| inbox.try_recv().ok()).collect();
    assert_eq!(
        received,
        vec![
            json!({"type": "JUMP", "value": 12.0}),
            json!({"type": "DELETE", "value": 3.0}),
            json!({"type": "DELETEALL"}),
            json!({"type": "CREATE_BOOKMARK"}),
        ]
    );
}

#[tokio::test]
async fn test_panel_without_active_tab_cannot_send() {
    let (_store, _bus, panel) = panel();

    assert_eq!(
        panel.jump(1.0),
        Err(MessageError::NoReceiver("no active tab".to_string()))
    );
}

#[tokio::test]
async fn test_panel_refuses_commands_once_tab_leaves_video() {
    let (store, bus, mut panel) = panel();
    let id = ContentId::new("abc123").unwrap();
    store.append(&id, Bookmark::at(42.0).unwrap()).await.unwrap();
    let mut inbox = bus.register(ContextId::Page(7));
    panel.open(&tab(WATCH_URL)).await;
    panel.open(&tab("https://www.youtube.com/feed/subscriptions")).await;

    let refused = Err(MessageError::NoReceiver("tab 7 shows no video".to_string()));
    assert_eq!(panel.delete_all(), refused);
    assert_eq!(panel.jump(1.0), refused);
    assert_eq!(panel.create(), refused);

    assert!(inbox.try_recv().is_err(), "nothing reached the page");
    assert_eq!(store.fetch(&id).await.len(), 1);
}

#[tokio::test]
async fn test_panel_reports_missing_page_context() {
    let (_store, _bus, mut panel) = panel();
    panel.open(&tab(WATCH_URL)).await;

    assert_eq!(panel.jump(1.0), Err(MessageError::NoReceiver("page:7".to_string())));
}

// --- coordinator ---

#[derive(Default)]
struct RecordingOpener {
    opened: Mutex<Vec<u64>>,
    fail: bool,
}

impl SidePanelOpener for RecordingOpener {
    fn open(&self, window_id: u64) -> Result<(), String> {
        if self.fail {
            return Err("side panel API unavailable".to_string());
        }
        self.opened.lock().unwrap().push(window_id);
        Ok(())
    }
}

#[test]
fn test_announcement_only_for_completed_watch_pages() {
    let host = HostSettings::default();

    assert_eq!(
        announcement_for(TabStatus::Complete, WATCH_URL, &host),
        Some(Command::New { video_id: "abc123".to_string() })
    );
    assert_eq!(announcement_for(TabStatus::Loading, WATCH_URL, &host), None);
    assert_eq!(announcement_for(TabStatus::Complete, "https://www.youtube.com/", &host), None);
    assert_eq!(announcement_for(TabStatus::Complete, "https://www.youtube.com/watch", &host), None);
    assert_eq!(
        announcement_for(TabStatus::Complete, "https://www.youtube.com/watch?v=", &host),
        None
    );
}

#[test]
fn test_announcement_keeps_other_query_parameters_out() {
    let host = HostSettings::default();
    let command = announcement_for(
        TabStatus::Complete,
        "https://www.youtube.com/watch?list=PL1&v=abc123&t=42s",
        &host,
    );
    assert_eq!(command, Some(Command::New { video_id: "abc123".to_string() }));
}

#[test]
fn test_coordinator_announces_to_registered_page() {
    let bus = Arc::new(MessageBus::new(SessionHandle::new()));
    let mut inbox = bus.register(ContextId::Page(3));
    let coordinator = Coordinator::new(bus, RecordingOpener::default(), HostSettings::default());

    let sent = coordinator.on_tab_updated(3, TabStatus::Complete, WATCH_URL);

    assert_eq!(sent, Some(Command::New { video_id: "abc123".to_string() }));
    assert_eq!(inbox.try_recv().unwrap(), json!({"type": "NEW", "videoId": "abc123"}));
}

#[test]
fn test_coordinator_tolerates_missing_page() {
    let bus = Arc::new(MessageBus::new(SessionHandle::new()));
    let coordinator = Coordinator::new(bus, RecordingOpener::default(), HostSettings::default());

    assert_eq!(coordinator.on_tab_updated(9, TabStatus::Complete, WATCH_URL), None);
}

#[test]
fn test_coordinator_stops_after_session_invalidated() {
    let session = SessionHandle::new();
    let bus = Arc::new(MessageBus::new(session.clone()));
    let mut inbox = bus.register(ContextId::Page(3));
    let coordinator = Coordinator::new(bus, RecordingOpener::default(), HostSettings::default());
    session.invalidate();

    assert_eq!(coordinator.on_tab_updated(3, TabStatus::Complete, WATCH_URL), None);
    assert!(inbox.try_recv().is_err());
}

#[test]
fn test_action_click_opens_side_panel() {
    let bus = Arc::new(MessageBus::new(SessionHandle::new()));
    let coordinator = Coordinator::new(bus, RecordingOpener::default(), HostSettings::default());

    coordinator.on_action_clicked(4);

    assert_eq!(coordinator_opened(&coordinator), vec![4]);
}

#[test]
fn test_action_click_failure_is_swallowed() {
    let bus = Arc::new(MessageBus::new(SessionHandle::new()));
    let opener = RecordingOpener {
        fail: true,
        ..RecordingOpener::default()
    };
    let coordinator = Coordinator::new(bus, opener, HostSettings::default());

    coordinator.on_action_clicked(4);
}

fn coordinator_opened(coordinator: &Coordinator<RecordingOpener>) -> Vec<u64> {
    coordinator.opener().opened.lock().unwrap().clone()
}
