//! End-to-end playback scenarios.
//!
//! These tests drive the controller through its public trait seams with a
//! scripted fake provider and file-backed storage, covering the full loop:
//! restore, play, skip errored entries, import/export, clear.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::RwLock;
use tubeloop_core::{
    FileStorage, PlaybackController, PlayerState, PlayerWidget, QueueStore, Result, SessionEvent,
    VideoId, VideoProvider, WidgetEvent, WidgetOptions,
};

const ID_A: &str = "aaaaaaaaaaa";
const ID_B: &str = "bbbbbbbbbbb";
const ID_C: &str = "ccccccccccc";

/// Records every widget interaction so scenarios can assert on the exact
/// load sequence.
#[derive(Debug, Default)]
struct WidgetLog {
    loads: Vec<String>,
    stopped: bool,
    destroyed: bool,
}

struct FakeWidget {
    log: Arc<Mutex<WidgetLog>>,
}

impl PlayerWidget for FakeWidget {
    fn load(&mut self, id: &VideoId) -> Result<()> {
        self.log.lock().unwrap().loads.push(id.as_str().to_string());
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.lock().unwrap().stopped = true;
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.log.lock().unwrap().destroyed = true;
        Ok(())
    }
}

/// Scripted embed provider: readiness is a flag the test flips.
struct FakeProvider {
    ready: AtomicBool,
    loaded: AtomicBool,
    log: Arc<Mutex<WidgetLog>>,
}

impl FakeProvider {
    fn ready(log: &Arc<Mutex<WidgetLog>>) -> Self {
        Self {
            ready: AtomicBool::new(true),
            loaded: AtomicBool::new(true),
            log: Arc::clone(log),
        }
    }

    fn not_ready(log: &Arc<Mutex<WidgetLog>>) -> Self {
        Self {
            ready: AtomicBool::new(false),
            loaded: AtomicBool::new(false),
            log: Arc::clone(log),
        }
    }
}

impl VideoProvider for FakeProvider {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    fn create_widget(
        &self,
        id: &VideoId,
        _options: &WidgetOptions,
    ) -> Result<Box<dyn PlayerWidget>> {
        let mut log = self.log.lock().unwrap();
        log.loads.push(id.as_str().to_string());
        Ok(Box::new(FakeWidget {
            log: Arc::clone(&self.log),
        }))
    }
}

fn shared_store(temp: &TempDir) -> Arc<RwLock<QueueStore>> {
    Arc::new(RwLock::new(QueueStore::load(Box::new(FileStorage::new(
        temp.path(),
    )))))
}

fn loads(log: &Arc<Mutex<WidgetLog>>) -> Vec<String> {
    log.lock().unwrap().loads.clone()
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A restored non-empty queue starts loading entry 0 and reaches `Playing`
/// once the widget reports ready.
#[tokio::test]
async fn restored_queue_starts_playing_at_cursor_zero() {
    let temp = TempDir::new().expect("temp dir");
    std::fs::write(
        temp.path().join("playlist.json"),
        format!(
            r#"[{{"id":"{ID_A}","hasError":false,"errorCode":null,"title":"First","titleLoaded":true}},{{"id":"{ID_B}","hasError":false,"errorCode":null,"title":"Video 2","titleLoaded":false}}]"#
        ),
    )
    .unwrap();

    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);
    assert_eq!(store.read().await.len(), 2);

    let (mut controller, mut rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.start().await.unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();

    assert_eq!(controller.state(), PlayerState::Playing);
    assert_eq!(store.read().await.cursor(), Some(0));
    assert_eq!(loads(&log), vec![ID_A.to_string()]);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::NowPlaying { index: 0, .. }
    )));
}

/// Queue `[A(ok), B(error), C(ok)]`, cursor 0: an "ended" signal skips the
/// errored entry and lands playback on C at index 2.
#[tokio::test]
async fn ended_skips_past_errored_entry() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);
    {
        let mut store = store.write().await;
        store.add(ID_A).unwrap();
        store.add(ID_B).unwrap();
        store.add(ID_C).unwrap();
        store.mark_error(1, 101).unwrap();
    }

    let (mut controller, _rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.start().await.unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();

    controller
        .handle_widget_event(WidgetEvent::Ended)
        .await
        .unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();

    assert_eq!(store.read().await.cursor(), Some(2));
    assert_eq!(controller.state(), PlayerState::Playing);
    assert_eq!(loads(&log), vec![ID_A.to_string(), ID_C.to_string()]);
}

/// Every entry failing in sequence exhausts the queue: each failure is
/// marked sticky and persisted, and the controller finishes instead of
/// looping.
#[tokio::test(start_paused = true)]
async fn playback_errors_exhaust_the_queue() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);
    {
        let mut store = store.write().await;
        store.add(ID_A).unwrap();
        store.add(ID_B).unwrap();
    }

    let (mut controller, mut rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.start().await.unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();

    controller
        .handle_widget_event(WidgetEvent::Error { code: 150 })
        .await
        .unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();
    controller
        .handle_widget_event(WidgetEvent::Error { code: 101 })
        .await
        .unwrap();

    assert_eq!(controller.state(), PlayerState::Finished);
    let events = drain(&mut rx);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::PlaybackFinished))
    );

    // Sticky errors reached storage with their codes.
    let blob = std::fs::read_to_string(temp.path().join("playlist.json")).unwrap();
    let stored = tubeloop_core::parse_document(&blob).unwrap();
    assert!(stored[0].has_error);
    assert_eq!(stored[0].error_code, Some(150));
    assert!(stored[1].has_error);
    assert_eq!(stored[1].error_code, Some(101));

    // Errored entries stay permanently filtered: a fresh session over the
    // same storage has nothing to play.
    let store2 = shared_store(&temp);
    let (mut controller2, _rx2) =
        PlaybackController::new(store2, Arc::new(FakeProvider::ready(&log)));
    controller2.start().await.unwrap();
    assert_eq!(controller2.state(), PlayerState::Finished);
}

/// Exported documents import losslessly into a fresh session, and importing
/// them again only counts duplicates.
#[tokio::test]
async fn export_import_roundtrip_between_sessions() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);

    let (mut controller, _rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.add(ID_A).await.unwrap();
    controller.add(ID_B).await.unwrap();
    controller.add(ID_C).await.unwrap();
    store.write().await.mark_error(1, 5).unwrap();

    let document = controller.export_document().await.unwrap();

    // Fresh session, separate storage.
    let temp2 = TempDir::new().expect("temp dir");
    let log2 = Arc::new(Mutex::new(WidgetLog::default()));
    let store2 = shared_store(&temp2);
    let (mut controller2, _rx2) =
        PlaybackController::new(Arc::clone(&store2), Arc::new(FakeProvider::ready(&log2)));

    let report = controller2.import_document(&document).await.unwrap();
    assert_eq!(report.added, 3);
    assert_eq!(report.duplicates, 0);

    // Error state carried over verbatim, not reset.
    assert_eq!(controller2.export_document().await.unwrap(), document);

    // Importing the same document again adds nothing.
    let report = controller2.import_document(&document).await.unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(report.duplicates, 3);
    assert_eq!(store2.read().await.len(), 3);
}

/// The bounded readiness wait picks up a provider that becomes ready while
/// polling is in progress.
#[tokio::test(start_paused = true)]
async fn load_waits_for_provider_readiness() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);
    store.write().await.add(ID_A).unwrap();

    let provider = Arc::new(FakeProvider::not_ready(&log));

    // The provider signals ready 800 ms into the 5 s window.
    let flag = Arc::clone(&provider);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(800)).await;
        flag.ready.store(true, Ordering::SeqCst);
        flag.loaded.store(true, Ordering::SeqCst);
    });

    let (mut controller, _rx) = PlaybackController::new(Arc::clone(&store), provider);
    controller.start().await.unwrap();

    assert_eq!(controller.state(), PlayerState::Loading);
    assert_eq!(loads(&log), vec![ID_A.to_string()]);
}

/// Clearing the queue destroys the widget, returns to `Idle`, and persists
/// an empty array.
#[tokio::test]
async fn clear_resets_session_and_storage() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);

    let (mut controller, _rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.add(ID_A).await.unwrap();
    controller.add(ID_B).await.unwrap();
    controller.add(ID_C).await.unwrap();

    controller.clear().await;

    assert_eq!(controller.state(), PlayerState::Idle);
    assert_eq!(store.read().await.cursor(), None);
    assert!(log.lock().unwrap().destroyed);
    assert_eq!(
        std::fs::read_to_string(temp.path().join("playlist.json")).unwrap(),
        "[]"
    );
}

/// Removing the current tail entry falls back to the nearest playable entry
/// before it.
#[tokio::test]
async fn removing_current_tail_plays_previous_entry() {
    let temp = TempDir::new().expect("temp dir");
    let log = Arc::new(Mutex::new(WidgetLog::default()));
    let store = shared_store(&temp);
    {
        let mut store = store.write().await;
        store.add(ID_A).unwrap();
        store.add(ID_B).unwrap();
        store.add(ID_C).unwrap();
        store.set_cursor(2).unwrap();
    }

    let (mut controller, _rx) =
        PlaybackController::new(Arc::clone(&store), Arc::new(FakeProvider::ready(&log)));
    controller.start().await.unwrap();
    controller
        .handle_widget_event(WidgetEvent::Ready)
        .await
        .unwrap();

    controller.remove(2).await.unwrap();

    assert_eq!(store.read().await.cursor(), Some(1));
    assert_eq!(loads(&log), vec![ID_C.to_string(), ID_B.to_string()]);
    assert_eq!(controller.state(), PlayerState::Loading);
}
