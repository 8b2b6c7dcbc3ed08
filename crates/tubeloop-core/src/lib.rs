//! `Tubeloop` Core Library
//!
//! This crate provides the engine of the `Tubeloop` playlist player:
//! - An ordered video queue with a current-playback cursor, persisted locally
//! - A playback-advancement state machine over an external embed widget,
//!   skipping entries that fail
//! - Free-form input resolution into canonical video identifiers
//! - Best-effort title enrichment via the provider's oEmbed endpoint
//! - Playlist import/export as portable JSON documents
//!
//! The embed widget, the storage medium, and the presentation layer sit
//! behind trait seams ([`VideoProvider`]/[`PlayerWidget`], [`QueueStorage`])
//! and an event stream ([`SessionEvent`]); hosts wire those to their
//! environment.
//!
//! # Error Handling
//!
//! This crate uses typed errors grouped by domain. See the [`error`] module
//! for details.
//!
//! ```rust,ignore
//! use tubeloop_core::{FileStorage, PlaybackController, QueueStore, Result};
//!
//! async fn session(provider: std::sync::Arc<dyn tubeloop_core::VideoProvider>) -> Result<()> {
//!     let store = QueueStore::load(Box::new(FileStorage::in_default_location()));
//!     let store = std::sync::Arc::new(tokio::sync::RwLock::new(store));
//!     let (mut controller, mut events) = PlaybackController::new(store, provider);
//!     controller.start().await?;
//!     // Feed widget callbacks into controller.handle_widget_event(..)
//!     // and render on each event from `events`.
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ident;
pub mod logging;
pub mod persist;
pub mod player;
pub mod store;
pub mod titles;
pub mod transfer;

pub use config::{
    DEFAULT_ERROR_ADVANCE_DELAY_MS, DEFAULT_READY_POLL_INTERVAL_MS, DEFAULT_READY_TIMEOUT_MS,
    DEFAULT_TITLE_STAGGER_MS, DEFAULT_TITLE_TIMEOUT_SECS, SessionConfig, WidgetOptions,
    config_file_path,
};
pub use error::{
    Error, ErrorKind, ProviderError, QueueError, Result, StorageError, TransferError,
};
pub use ident::{VIDEO_ID_LENGTH, VideoId, resolve};
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, default_log_directory};
pub use persist::{FileStorage, QUEUE_STORAGE_KEY, QueueStorage, default_data_directory};
pub use player::{
    PlaybackController, PlayerState, PlayerWidget, SessionEvent, VideoProvider, WidgetEvent,
};
pub use store::{
    Entry, MergeReport, PlaybackState, QueueStore, Removal, StoredEntry, placeholder_title,
};
pub use titles::{OEMBED_ENDPOINT, OEmbedFetcher, TitleEnricher, TitleFetcher};
pub use transfer::{EXPORT_FILE_NAME, parse_document, render_document};
