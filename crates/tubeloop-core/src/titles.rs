//! Best-effort title enrichment via the provider's oEmbed endpoint.
//!
//! Titles are purely additive: lookups never block playback, never retry,
//! and never mark an entry errored. Requests are spaced by a fixed stagger
//! to avoid bursts, and results apply by identifier so entries removed
//! mid-flight are skipped.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{DEFAULT_TITLE_STAGGER_MS, DEFAULT_TITLE_TIMEOUT_SECS};
use crate::error::{Error, ProviderError, Result};
use crate::ident::VideoId;
use crate::player::SessionEvent;
use crate::store::QueueStore;

/// The provider's oEmbed endpoint.
pub const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

/// Title lookup transport.
#[cfg_attr(test, mockall::automock)]
pub trait TitleFetcher: Send + Sync {
    /// Fetch the display title for a video.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::TitleLookupFailed` when the lookup fails for
    /// any reason.
    async fn fetch_title(&self, id: &VideoId) -> Result<String>;
}

/// Subset of the oEmbed response the enricher cares about.
#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
}

/// Title fetcher backed by the provider's oEmbed endpoint.
#[derive(Debug, Clone)]
pub struct OEmbedFetcher {
    timeout: Duration,
}

impl OEmbedFetcher {
    /// Create a fetcher with the default request timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TITLE_TIMEOUT_SECS),
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for OEmbedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup_error(id: &VideoId, reason: String) -> Error {
    Error::Provider(ProviderError::TitleLookupFailed {
        id: id.as_str().to_string(),
        reason,
    })
}

impl TitleFetcher for OEmbedFetcher {
    async fn fetch_title(&self, id: &VideoId) -> Result<String> {
        let url =
            format!("{OEMBED_ENDPOINT}?url=https://www.youtube.com/watch?v={id}&format=json");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| lookup_error(id, format!("Failed to create HTTP client: {e}")))?;

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| lookup_error(id, e.to_string()))?;

        if !response.status().is_success() {
            return Err(lookup_error(
                id,
                format!("Unexpected HTTP status {}", response.status()),
            ));
        }

        let body: OEmbedResponse = response
            .json()
            .await
            .map_err(|e| lookup_error(id, e.to_string()))?;
        Ok(body.title)
    }
}

/// Walks the queue and fills in titles for entries that still carry the
/// placeholder.
pub struct TitleEnricher<F: TitleFetcher> {
    store: Arc<RwLock<QueueStore>>,
    fetcher: F,
    events: mpsc::UnboundedSender<SessionEvent>,
    stagger: Duration,
}

impl<F: TitleFetcher> TitleEnricher<F> {
    /// Create an enricher with the default stagger.
    pub fn new(
        store: Arc<RwLock<QueueStore>>,
        fetcher: F,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            store,
            fetcher,
            events,
            stagger: Duration::from_millis(DEFAULT_TITLE_STAGGER_MS),
        }
    }

    /// Set the spacing between lookup requests.
    #[must_use]
    pub const fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// One enrichment pass over every entry still awaiting a title.
    ///
    /// Entries that resolve persist immediately and announce themselves via
    /// [`SessionEvent::TitleResolved`]. Failed lookups keep the placeholder
    /// and are not retried.
    pub async fn run(&self) {
        let pending = self.store.read().await.pending_titles();
        if pending.is_empty() {
            return;
        }
        info!("Fetching titles for {} videos", pending.len());

        for (i, id) in pending.iter().enumerate() {
            if i > 0 {
                sleep(self.stagger).await;
            }

            match self.fetcher.fetch_title(id).await {
                Ok(title) => {
                    let applied = self.store.write().await.apply_title(id, title);
                    if applied {
                        debug!("Resolved title for {}", id);
                        let _ = self.events.send(SessionEvent::TitleResolved { id: id.clone() });
                    }
                }
                Err(e) => {
                    // Keep the placeholder title.
                    debug!("Could not fetch title for {}: {}", id, e);
                }
            }
        }
    }
}
