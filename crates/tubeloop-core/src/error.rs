//! Error types for Tubeloop core operations.
//!
//! Errors are grouped by domain (queue, transfer, provider, storage) and
//! wrapped by the top-level [`Error`]. Hosts that need to branch on a
//! category without matching every variant can use [`Error::kind`], and
//! [`Error::is_retryable`] tells them whether re-issuing the same operation
//! can succeed.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by queue mutations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The input could not be resolved to a video identifier.
    #[error("Not a valid video URL or ID: {input}")]
    InvalidInput {
        /// The rejected input, trimmed.
        input: String,
    },

    /// The identifier is already present in the queue.
    #[error("Video {id} is already in the playlist")]
    DuplicateEntry {
        /// The identifier that was already queued.
        id: String,
    },

    /// An index does not refer to a queued entry (typically a stale UI
    /// reference to a removed row).
    #[error("Index {index} is out of range for a playlist of {len} entries")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Queue length at the time of the request.
        len: usize,
    },

    /// The target entry carries a sticky playback error and is skipped for
    /// the rest of the session.
    #[error("Entry {index} previously failed playback and cannot be played")]
    EntryUnplayable {
        /// Index of the errored entry.
        index: usize,
    },
}

/// Errors raised by playlist import/export.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The uploaded document did not deserialize to an array of entries.
    #[error("Invalid playlist document: {reason}")]
    MalformedDocument {
        /// Why the document was rejected.
        reason: String,
    },

    /// Export was requested on an empty queue.
    #[error("Playlist is empty, nothing to export")]
    EmptyQueue,
}

/// Errors raised by the embed provider boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider did not signal readiness within the bounded wait.
    #[error("Embed provider failed to become ready within {waited_ms} ms")]
    Unavailable {
        /// How long the controller waited, in milliseconds.
        waited_ms: u64,
    },

    /// The provider reported a runtime playback error for an entry.
    ///
    /// Non-fatal to the session; the entry is marked errored and playback
    /// advances past it.
    #[error("Provider reported playback error code {code}")]
    Playback {
        /// The provider's error code, informational only.
        code: u32,
    },

    /// A title lookup against the provider's metadata endpoint failed.
    ///
    /// Best-effort only; the placeholder title stays and nothing retries.
    #[error("Title lookup for {id} failed: {reason}")]
    TitleLookupFailed {
        /// The identifier whose title was requested.
        id: String,
        /// The underlying failure.
        reason: String,
    },
}

/// Errors raised by the durable key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A stored value could not be read.
    #[error("Failed to read stored value '{key}': {reason}")]
    ReadFailed {
        /// The storage key.
        key: String,
        /// The underlying failure.
        reason: String,
    },

    /// A value could not be written.
    #[error("Failed to write stored value '{key}': {reason}")]
    WriteFailed {
        /// The storage key.
        key: String,
        /// The underlying failure.
        reason: String,
    },
}

/// Top-level error type for Tubeloop core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Queue mutation error.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Import/export error.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Embed provider error.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Durable storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse error category for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Queue mutation error.
    Queue,
    /// Import/export error.
    Transfer,
    /// Embed provider error.
    Provider,
    /// Durable storage error.
    Storage,
    /// JSON serialization error.
    Serialization,
}

impl Error {
    /// Get the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Queue(_) => ErrorKind::Queue,
            Self::Transfer(_) => ErrorKind::Transfer,
            Self::Provider(_) => ErrorKind::Provider,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Whether re-issuing the failed operation can succeed.
    ///
    /// Only a provider readiness timeout is retryable: the controller stays
    /// in its loading state and the caller may request the load again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(ProviderError::Unavailable { .. }))
    }

    /// Suggested delay before retrying, in seconds.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        if self.is_retryable() { Some(2) } else { None }
    }
}
