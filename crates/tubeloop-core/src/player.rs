//! Playback controller and the embed-provider boundary.
//!
//! This module provides:
//! - [`VideoProvider`] and [`PlayerWidget`] traits over the external embed
//!   widget (readiness signal, construction, load/stop/destroy)
//! - [`WidgetEvent`]s fed in from the widget's lifecycle callbacks
//! - [`SessionEvent`]s emitted toward the presentation layer
//! - [`PlaybackController`], the state machine deciding what plays next
//!
//! The controller exclusively owns the single widget instance; every
//! load/stop/destroy request goes through it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use tokio::time::{interval, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{SessionConfig, WidgetOptions};
use crate::error::{Error, ProviderError, QueueError, Result};
use crate::ident::VideoId;
use crate::store::{MergeReport, QueueStore};
use crate::transfer;

/// Boundary to the external embed provider.
///
/// Implementations bridge to the provider's script object; tests substitute
/// a mock.
#[cfg_attr(test, mockall::automock)]
pub trait VideoProvider: Send + Sync {
    /// Whether the provider has fired its API-ready signal.
    fn is_ready(&self) -> bool;

    /// Whether the provider object is present at all (script loaded), even
    /// if it has not signalled ready yet.
    fn is_loaded(&self) -> bool;

    /// Create the playback widget, loading `id` immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the widget cannot be constructed.
    fn create_widget(&self, id: &VideoId, options: &WidgetOptions)
    -> Result<Box<dyn PlayerWidget>>;
}

/// Handle to the single live playback widget.
#[cfg_attr(test, mockall::automock)]
pub trait PlayerWidget: Send {
    /// Load and play a new video in the existing widget.
    fn load(&mut self, id: &VideoId) -> Result<()>;

    /// Stop playback.
    fn stop(&mut self) -> Result<()>;

    /// Tear the widget down; the handle is dropped afterwards.
    fn destroy(&mut self) -> Result<()>;
}

/// Lifecycle signals from the embed widget, forwarded by the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WidgetEvent {
    /// The widget finished loading the requested video.
    Ready,
    /// The current video played to its end.
    Ended,
    /// The provider reported a playback error for the current video.
    Error {
        /// Provider error code, passed through as-is.
        code: u32,
    },
}

/// Events emitted toward the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// The queue changed; re-render the list.
    QueueChanged,
    /// A widget load was issued for the entry at `index`.
    LoadStarted {
        /// Queue index being loaded.
        index: usize,
        /// Identifier being loaded.
        id: VideoId,
    },
    /// The widget reported the entry at `index` playing.
    NowPlaying {
        /// Queue index now playing.
        index: usize,
        /// Identifier now playing.
        id: VideoId,
    },
    /// An entry failed playback and was marked errored.
    EntryFailed {
        /// Queue index that failed.
        index: usize,
        /// Provider error code.
        code: u32,
    },
    /// No playable entry remains; playback stopped.
    PlaybackFinished,
    /// A title resolved for the given identifier.
    TitleResolved {
        /// Identifier whose title resolved.
        id: VideoId,
    },
}

/// Playback controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// No widget; the queue is empty.
    Idle,
    /// A widget load was requested; the asynchronous handshake is pending.
    Loading,
    /// The widget reported an active video at the cursor.
    Playing,
    /// No playable entry remains at or after the last playable position.
    Finished,
}

/// The playback-advancement state machine.
///
/// Owns the shared queue store, the single widget handle, and the
/// advance/skip-on-error policy. User intents and widget lifecycle events
/// both funnel through here; the presentation layer observes the resulting
/// [`SessionEvent`] stream.
pub struct PlaybackController {
    store: Arc<RwLock<QueueStore>>,
    provider: Arc<dyn VideoProvider>,
    widget: Option<Box<dyn PlayerWidget>>,
    state: PlayerState,
    config: SessionConfig,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl PlaybackController {
    /// Create a controller with default configuration.
    ///
    /// Returns the controller and the session event stream.
    #[must_use]
    pub fn new(
        store: Arc<RwLock<QueueStore>>,
        provider: Arc<dyn VideoProvider>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_config(store, provider, SessionConfig::default())
    }

    /// Create a controller with custom configuration.
    #[must_use]
    pub fn with_config(
        store: Arc<RwLock<QueueStore>>,
        provider: Arc<dyn VideoProvider>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                provider,
                widget: None,
                state: PlayerState::Idle,
                config,
                event_tx,
            },
            event_rx,
        )
    }

    /// Current controller state.
    #[must_use]
    pub const fn state(&self) -> PlayerState {
        self.state
    }

    /// Get a clone of the shared queue store.
    #[must_use]
    pub fn store(&self) -> Arc<RwLock<QueueStore>> {
        Arc::clone(&self.store)
    }

    /// Get a clone of the session event sender, for components that emit
    /// their own events (e.g. the title enricher).
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    /// Begin playback of the first playable entry, if any.
    ///
    /// Used at startup with a restored queue and after an import lands
    /// entries in an empty queue.
    ///
    /// # Errors
    ///
    /// Propagates load failures (`ProviderError::Unavailable`).
    pub async fn start(&mut self) -> Result<()> {
        let target = {
            let store = self.store.read().await;
            store
                .cursor()
                .and_then(|cursor| store.next_playable_at_or_after(cursor))
        };

        match target {
            Some(index) => self.play_at(index).await,
            None => {
                let empty = self.store.read().await.is_empty();
                if !empty {
                    info!("No playable entries in restored queue");
                    self.state = PlayerState::Finished;
                    self.emit(SessionEvent::PlaybackFinished);
                }
                Ok(())
            }
        }
    }

    /// Request playback of the entry at `index`.
    ///
    /// # Errors
    ///
    /// `QueueError::IndexOutOfRange` for an invalid index (stale UI
    /// references are expected; callers log and drop it),
    /// `QueueError::EntryUnplayable` when the entry carries a sticky error,
    /// and provider errors from the widget load itself.
    pub async fn play_at(&mut self, index: usize) -> Result<()> {
        let id = {
            let mut store = self.store.write().await;
            let len = store.len();
            let Some(entry) = store.entry(index) else {
                return Err(Error::Queue(QueueError::IndexOutOfRange { index, len }));
            };
            if !entry.playback.is_playable() {
                return Err(Error::Queue(QueueError::EntryUnplayable { index }));
            }
            let id = entry.id.clone();
            store.set_cursor(index)?;
            id
        };

        self.load_current(index, id).await
    }

    /// Play the next playable entry after the cursor.
    ///
    /// Equivalent to the auto-advance on "ended": lands in `Finished` when
    /// nothing playable remains.
    ///
    /// # Errors
    ///
    /// Propagates widget load failures.
    pub async fn play_next(&mut self) -> Result<()> {
        self.advance().await
    }

    /// Play the nearest playable entry before the cursor, if one exists.
    ///
    /// # Errors
    ///
    /// Propagates widget load failures.
    pub async fn play_previous(&mut self) -> Result<()> {
        let target = {
            let store = self.store.read().await;
            store.cursor().and_then(|cursor| {
                if cursor == 0 {
                    None
                } else {
                    store.last_playable_at_or_before(cursor - 1)
                }
            })
        };

        match target {
            Some(index) => self.play_at(index).await,
            None => Ok(()),
        }
    }

    /// Resolve `raw` and append it to the queue.
    ///
    /// The first entry of a fresh queue starts loading immediately. While
    /// the widget is live (`Playing`/`Loading`), playback jumps to the newly
    /// added entry. In `Finished`, nothing auto-resumes; an explicit play
    /// request is required.
    ///
    /// # Errors
    ///
    /// `QueueError::InvalidInput` and `QueueError::DuplicateEntry` from the
    /// store; both leave queue and playback untouched.
    pub async fn add(&mut self, raw: &str) -> Result<usize> {
        let (index, was_empty) = {
            let mut store = self.store.write().await;
            let was_empty = store.is_empty();
            let index = store.add(raw)?;
            (index, was_empty)
        };
        self.emit(SessionEvent::QueueChanged);

        let should_load =
            was_empty || matches!(self.state, PlayerState::Playing | PlayerState::Loading);
        if should_load && let Err(e) = self.play_at(index).await {
            // The entry is queued either way; the load can be retried.
            warn!("Failed to start playback for new entry: {}", e);
        }

        Ok(index)
    }

    /// Remove the entry at `index` and reconcile playback.
    ///
    /// Removing the current entry plays the entry that shifted into its
    /// slot, falling back to the nearest playable entry before it; with no
    /// playable entry left the widget stops. Emptying the queue tears the
    /// widget down entirely.
    ///
    /// # Errors
    ///
    /// `QueueError::IndexOutOfRange` for stale indices; no mutation.
    pub async fn remove(&mut self, index: usize) -> Result<()> {
        let (was_current, now_empty, cursor) = {
            let mut store = self.store.write().await;
            let removal = store.remove(index)?;
            (removal.was_current, store.is_empty(), store.cursor())
        };
        self.emit(SessionEvent::QueueChanged);

        if now_empty {
            self.teardown();
            return Ok(());
        }
        if !was_current {
            return Ok(());
        }
        let Some(cursor) = cursor else {
            return Ok(());
        };

        let target = {
            let store = self.store.read().await;
            store
                .next_playable_at_or_after(cursor)
                .or_else(|| store.last_playable_at_or_before(cursor))
        };

        match target {
            Some(next) => {
                if let Err(e) = self.play_at(next).await {
                    warn!("Failed to resume playback after removal: {}", e);
                }
            }
            None => {
                info!("No playable videos left after removal");
                if let Some(widget) = self.widget.as_mut()
                    && let Err(e) = widget.stop()
                {
                    debug!("Widget stop failed: {}", e);
                }
                self.state = PlayerState::Finished;
                self.emit(SessionEvent::PlaybackFinished);
            }
        }
        Ok(())
    }

    /// Empty the queue, tear down the widget, and return to `Idle`.
    pub async fn clear(&mut self) {
        {
            let mut store = self.store.write().await;
            store.clear();
        }
        self.emit(SessionEvent::QueueChanged);
        self.teardown();
    }

    /// Merge an uploaded playlist document into the queue.
    ///
    /// If the queue was empty and the import added entries, playback starts
    /// at the first playable entry. An already-running session is not
    /// interrupted.
    ///
    /// # Errors
    ///
    /// `TransferError::MalformedDocument` when the document is not an array
    /// of entry-shaped records; the queue is left untouched.
    pub async fn import_document(&mut self, document: &str) -> Result<MergeReport> {
        let entries = transfer::parse_document(document)?;

        let (report, was_empty) = {
            let mut store = self.store.write().await;
            let was_empty = store.is_empty();
            let report = store.merge_import(entries);
            (report, was_empty)
        };

        if report.added > 0 {
            self.emit(SessionEvent::QueueChanged);
            if was_empty && let Err(e) = self.start().await {
                warn!("Failed to start playback after import: {}", e);
            }
        }

        Ok(report)
    }

    /// Serialize the queue as a downloadable document.
    ///
    /// # Errors
    ///
    /// `TransferError::EmptyQueue` when there is nothing to export.
    pub async fn export_document(&self) -> Result<String> {
        let snapshot = self.store.read().await.export_snapshot();
        transfer::render_document(&snapshot)
    }

    /// React to a widget lifecycle event.
    ///
    /// `Ready` confirms the pending load; `Ended` advances past the current
    /// entry; `Error` marks the entry, waits the configured delay, then
    /// advances exactly like `Ended`.
    ///
    /// # Errors
    ///
    /// Propagates widget load failures from the advance.
    pub async fn handle_widget_event(&mut self, event: WidgetEvent) -> Result<()> {
        match event {
            WidgetEvent::Ready => {
                if self.state != PlayerState::Loading {
                    debug!("Ignoring ready signal in state {:?}", self.state);
                    return Ok(());
                }
                let current = {
                    let store = self.store.read().await;
                    store
                        .cursor()
                        .and_then(|index| store.entry(index).map(|e| (index, e.id.clone())))
                };
                if let Some((index, id)) = current {
                    info!("Now playing {} at index {}", id, index);
                    self.state = PlayerState::Playing;
                    self.emit(SessionEvent::NowPlaying { index, id });
                }
                Ok(())
            }
            WidgetEvent::Ended => {
                debug!("Current video ended, advancing");
                self.advance().await
            }
            WidgetEvent::Error { code } => {
                let index = self.store.read().await.cursor();
                if let Some(index) = index {
                    {
                        let mut store = self.store.write().await;
                        store.mark_error(index, code)?;
                    }
                    self.emit(SessionEvent::EntryFailed { index, code });
                    self.emit(SessionEvent::QueueChanged);
                }
                // Short pause so back-to-back failures don't hammer the
                // provider.
                sleep(self.config.error_advance_delay()).await;
                self.advance().await
            }
        }
    }

    /// Scan forward from the cursor for the next playable entry and load
    /// it, or transition to `Finished`.
    async fn advance(&mut self) -> Result<()> {
        let next = {
            let store = self.store.read().await;
            store
                .cursor()
                .and_then(|cursor| store.next_playable_at_or_after(cursor + 1))
        };

        match next {
            Some(index) => self.play_at(index).await,
            None => {
                let empty = self.store.read().await.is_empty();
                if !empty {
                    info!("Playlist finished");
                    self.state = PlayerState::Finished;
                    self.emit(SessionEvent::PlaybackFinished);
                }
                Ok(())
            }
        }
    }

    /// Issue the widget load for the entry at the cursor.
    async fn load_current(&mut self, index: usize, id: VideoId) -> Result<()> {
        self.state = PlayerState::Loading;
        self.emit(SessionEvent::LoadStarted {
            index,
            id: id.clone(),
        });

        // Fast path: a live widget and a ready provider.
        if self.widget.is_some() && self.provider.is_ready() {
            if let Some(widget) = self.widget.as_mut() {
                debug!("Loading video {} in existing widget", id);
                widget.load(&id)?;
            }
            return Ok(());
        }

        self.wait_for_provider().await?;

        if let Some(widget) = self.widget.as_mut() {
            debug!("Loading video {} in now-ready widget", id);
            widget.load(&id)?;
        } else {
            info!("Creating widget for video {}", id);
            self.widget = Some(self.provider.create_widget(&id, &self.config.widget)?);
        }
        Ok(())
    }

    /// Bounded wait for the provider's readiness signal.
    ///
    /// Polls the readiness flag at the configured interval under the
    /// configured deadline. On timeout, proceeds anyway when the provider
    /// object is minimally present; otherwise fails with `Unavailable`,
    /// leaving the controller in `Loading` so the caller can retry.
    async fn wait_for_provider(&self) -> Result<()> {
        if self.provider.is_ready() {
            return Ok(());
        }

        let provider = Arc::clone(&self.provider);
        let poll = self.config.ready_poll_interval();
        let wait = async move {
            let mut ticker = interval(poll);
            loop {
                ticker.tick().await;
                if provider.is_ready() {
                    return;
                }
            }
        };

        if timeout(self.config.ready_timeout(), wait).await.is_ok() {
            return Ok(());
        }

        if self.provider.is_loaded() {
            warn!(
                "Provider not ready after {} ms, forcing ready state",
                self.config.ready_timeout_ms
            );
            return Ok(());
        }

        Err(Error::Provider(ProviderError::Unavailable {
            waited_ms: self.config.ready_timeout_ms,
        }))
    }

    /// Stop and destroy the widget, returning to `Idle`.
    fn teardown(&mut self) {
        if let Some(mut widget) = self.widget.take() {
            if let Err(e) = widget.stop() {
                debug!("Widget stop during teardown failed: {}", e);
            }
            if let Err(e) = widget.destroy() {
                debug!("Widget destroy failed: {}", e);
            }
            info!("Destroyed playback widget");
        }
        self.state = PlayerState::Idle;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &self.state)
            .field("has_widget", &self.widget.is_some())
            .finish_non_exhaustive()
    }
}
