//! Playlist queue state and mutations.
//!
//! This module owns the ordered entry list and the current-playback cursor:
//! - Entry lifecycle (add, remove, error marking, clear)
//! - Import merging and export snapshots in the stable wire format
//! - Write-through persistence on every successful mutation
//!
//! Persistence failures are logged and swallowed; the in-memory queue stays
//! authoritative for the session.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, QueueError, Result};
use crate::ident::{self, VideoId};
use crate::persist::{QUEUE_STORAGE_KEY, QueueStorage};

/// Playback health of a queued entry.
///
/// `Errored` is sticky for the session: the auto-advance scan never selects
/// an errored entry, and only removal clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// The entry is eligible for playback.
    Playable,
    /// The provider reported a playback error for this entry.
    Errored {
        /// Last widget-reported error code, informational only.
        code: Option<u32>,
    },
}

impl PlaybackState {
    /// Whether the entry may be selected for playback.
    #[must_use]
    pub const fn is_playable(self) -> bool {
        matches!(self, Self::Playable)
    }

    /// The recorded error code, if the entry is errored.
    #[must_use]
    pub const fn error_code(self) -> Option<u32> {
        match self {
            Self::Playable => None,
            Self::Errored { code } => code,
        }
    }
}

/// One queued video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Canonical video identifier, unique within the queue.
    pub id: VideoId,
    /// Display title; the ordinal placeholder until a real title resolves.
    pub title: String,
    /// True once a real title has been fetched. Never reverts.
    pub title_resolved: bool,
    /// Sticky playback health.
    pub playback: PlaybackState,
}

impl Entry {
    /// Create a fresh entry with the placeholder title for 1-based `ordinal`.
    fn with_placeholder(id: VideoId, ordinal: usize) -> Self {
        Self {
            id,
            title: placeholder_title(ordinal),
            title_resolved: false,
            playback: PlaybackState::Playable,
        }
    }
}

/// Placeholder title for the entry at 1-based `ordinal`.
#[must_use]
pub fn placeholder_title(ordinal: usize) -> String {
    format!("Video {ordinal}")
}

/// Wire-format entry, shared by the persisted blob and export documents.
///
/// Field set, naming and order are stable across versions so that persisted
/// queues and exported documents round-trip. Every field defaults so
/// imported documents with missing fields still merge (trusted as-is).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEntry {
    /// Canonical video identifier.
    #[serde(default)]
    pub id: String,
    /// Whether the entry carries a sticky playback error.
    #[serde(default)]
    pub has_error: bool,
    /// Last provider-reported error code, if any.
    #[serde(default)]
    pub error_code: Option<u32>,
    /// Display title; empty means "not yet titled".
    #[serde(default)]
    pub title: String,
    /// Whether a real title has been fetched.
    #[serde(default)]
    pub title_loaded: bool,
}

impl From<&Entry> for StoredEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id.as_str().to_string(),
            has_error: !entry.playback.is_playable(),
            error_code: entry.playback.error_code(),
            title: entry.title.clone(),
            title_loaded: entry.title_resolved,
        }
    }
}

impl From<StoredEntry> for Entry {
    fn from(stored: StoredEntry) -> Self {
        let playback = if stored.has_error {
            PlaybackState::Errored {
                code: stored.error_code,
            }
        } else {
            PlaybackState::Playable
        };
        Self {
            id: VideoId::from_raw(stored.id),
            title: stored.title,
            title_resolved: stored.title_loaded,
            playback,
        }
    }
}

/// Outcome of merging an imported document into the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Entries appended to the queue.
    pub added: usize,
    /// Incoming entries skipped because their identifier was already queued.
    pub duplicates: usize,
}

/// Outcome of removing an entry.
#[derive(Debug, Clone)]
pub struct Removal {
    /// The removed entry.
    pub entry: Entry,
    /// Whether the removed entry was the one at the cursor.
    pub was_current: bool,
}

/// The ordered playlist queue with its current-playback cursor.
///
/// All mutations persist synchronously within the same call, so two rapid
/// mutations always reach storage in the order issued.
pub struct QueueStore {
    entries: Vec<Entry>,
    cursor: Option<usize>,
    storage: Box<dyn QueueStorage>,
}

impl QueueStore {
    /// Restore the queue from storage.
    ///
    /// An absent or unreadable blob yields an empty queue; corruption is
    /// logged, never propagated.
    #[must_use]
    pub fn load(storage: Box<dyn QueueStorage>) -> Self {
        let entries = match storage.read(QUEUE_STORAGE_KEY) {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<StoredEntry>>(&blob) {
                Ok(stored) => stored.into_iter().map(Entry::from).collect(),
                Err(e) => {
                    warn!("Stored playlist is corrupt, starting empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read stored playlist, starting empty: {}", e);
                Vec::new()
            }
        };

        let cursor = if entries.is_empty() { None } else { Some(0) };
        info!("Restored playlist with {} entries", entries.len());

        Self {
            entries,
            cursor,
            storage,
        }
    }

    /// Number of queued entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current-playback cursor, `None` when the queue is empty.
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The ordered entries.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The entry at `index`, if any.
    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// The index of the entry with the given identifier, if queued.
    #[must_use]
    pub fn index_of(&self, id: &VideoId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == *id)
    }

    /// Whether an entry with the given raw identifier is queued.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id.as_str() == id)
    }

    /// Move the cursor to `index`.
    ///
    /// Cursor movement is playback tracking only; it is not persisted.
    pub fn set_cursor(&mut self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(Error::Queue(QueueError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            }));
        }
        self.cursor = Some(index);
        Ok(())
    }

    /// Resolve `raw` and append a new entry with a placeholder title.
    ///
    /// Returns the index of the new entry.
    ///
    /// # Errors
    ///
    /// `QueueError::InvalidInput` when `raw` does not resolve to an
    /// identifier, `QueueError::DuplicateEntry` when the identifier is
    /// already queued. Neither mutates the queue.
    pub fn add(&mut self, raw: &str) -> Result<usize> {
        let Some(id) = ident::resolve(raw) else {
            return Err(Error::Queue(QueueError::InvalidInput {
                input: raw.trim().to_string(),
            }));
        };

        if self.contains_id(id.as_str()) {
            return Err(Error::Queue(QueueError::DuplicateEntry {
                id: id.as_str().to_string(),
            }));
        }

        info!("Adding video {} to playlist", id);
        self.entries
            .push(Entry::with_placeholder(id, self.entries.len() + 1));
        if self.cursor.is_none() {
            self.cursor = Some(0);
        }
        self.persist();
        Ok(self.entries.len() - 1)
    }

    /// Remove the entry at `index`, shifting later entries down.
    ///
    /// The cursor is decremented when it pointed past the removed index and
    /// clamped into range when it pointed at the removed tail entry.
    ///
    /// # Errors
    ///
    /// `QueueError::IndexOutOfRange` when `index` does not refer to an entry.
    pub fn remove(&mut self, index: usize) -> Result<Removal> {
        if index >= self.entries.len() {
            return Err(Error::Queue(QueueError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            }));
        }

        let was_current = self.cursor == Some(index);
        let entry = self.entries.remove(index);
        info!("Removed video {} from playlist", entry.id);

        if self.entries.is_empty() {
            self.cursor = None;
        } else if let Some(cursor) = self.cursor {
            if cursor > index {
                self.cursor = Some(cursor - 1);
            } else if cursor >= self.entries.len() {
                self.cursor = Some(self.entries.len() - 1);
            }
        }

        self.persist();
        Ok(Removal { entry, was_current })
    }

    /// Record a sticky playback error for the entry at `index`.
    ///
    /// Idempotent; a repeated error overwrites the recorded code.
    ///
    /// # Errors
    ///
    /// `QueueError::IndexOutOfRange` when `index` does not refer to an entry.
    pub fn mark_error(&mut self, index: usize, code: u32) -> Result<()> {
        let len = self.entries.len();
        let Some(entry) = self.entries.get_mut(index) else {
            return Err(Error::Queue(QueueError::IndexOutOfRange { index, len }));
        };

        warn!("Marking video {} as errored (code {})", entry.id, code);
        entry.playback = PlaybackState::Errored { code: Some(code) };
        self.persist();
        Ok(())
    }

    /// Empty the queue and reset the cursor.
    pub fn clear(&mut self) {
        info!("Clearing playlist ({} entries)", self.entries.len());
        self.entries.clear();
        self.cursor = None;
        self.persist();
    }

    /// Merge imported entries, skipping identifiers that are already queued.
    ///
    /// Incoming entries keep their relative order and are appended after the
    /// existing entries, verbatim. Persists once when anything was added.
    pub fn merge_import(&mut self, incoming: Vec<StoredEntry>) -> MergeReport {
        let mut report = MergeReport::default();

        for stored in incoming {
            if self.contains_id(&stored.id) {
                report.duplicates += 1;
            } else {
                self.entries.push(Entry::from(stored));
                report.added += 1;
            }
        }

        if report.added > 0 {
            if self.cursor.is_none() {
                self.cursor = Some(0);
            }
            self.persist();
        }

        info!(
            "Merged import: {} added, {} duplicates skipped",
            report.added, report.duplicates
        );
        report
    }

    /// Snapshot the full ordered entry list in the wire format.
    #[must_use]
    pub fn export_snapshot(&self) -> Vec<StoredEntry> {
        self.entries.iter().map(StoredEntry::from).collect()
    }

    /// Display title for the entry at `index`.
    ///
    /// Entries imported without a title fall back to the ordinal placeholder
    /// here, at render time.
    #[must_use]
    pub fn display_title(&self, index: usize) -> Option<String> {
        self.entries.get(index).map(|entry| {
            if entry.title.is_empty() {
                placeholder_title(index + 1)
            } else {
                entry.title.clone()
            }
        })
    }

    /// First playable entry at or after `start`.
    #[must_use]
    pub fn next_playable_at_or_after(&self, start: usize) -> Option<usize> {
        (start..self.entries.len()).find(|&i| self.entries[i].playback.is_playable())
    }

    /// Last playable entry at or before `start`.
    #[must_use]
    pub fn last_playable_at_or_before(&self, start: usize) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        (0..=start.min(self.entries.len() - 1))
            .rev()
            .find(|&i| self.entries[i].playback.is_playable())
    }

    /// Identifiers still awaiting a title: not resolved and not errored.
    #[must_use]
    pub fn pending_titles(&self) -> Vec<VideoId> {
        self.entries
            .iter()
            .filter(|e| !e.title_resolved && e.playback.is_playable())
            .map(|e| e.id.clone())
            .collect()
    }

    /// Apply a fetched title to the entry with the given identifier.
    ///
    /// Lookup is by identifier, never by index, so results arriving after a
    /// removal or shift are discarded. Returns whether the title was applied.
    pub fn apply_title(&mut self, id: &VideoId, title: String) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == *id) else {
            debug!("Discarding stale title for removed video {}", id);
            return false;
        };
        if entry.title_resolved {
            return false;
        }

        entry.title = title;
        entry.title_resolved = true;
        self.persist();
        true
    }

    /// Write the current queue through to storage.
    ///
    /// Failures are logged and swallowed; the in-memory queue remains
    /// authoritative and no retry is attempted.
    fn persist(&self) {
        let snapshot = self.export_snapshot();
        let blob = match serde_json::to_string(&snapshot) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize playlist: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.write(QUEUE_STORAGE_KEY, &blob) {
            warn!("Failed to persist playlist: {}", e);
        }
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("entries", &self.entries)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
