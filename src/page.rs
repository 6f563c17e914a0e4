use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::api::QuranApi;
use crate::audio::PlaybackManager;
use crate::error::Fetched;
use crate::formats::{ChapterSummary, VerseBatch};

#[derive(Debug, Clone)]
pub struct ChapterPage {
    pub chapter: Fetched<ChapterSummary>,
    pub verses: Fetched<VerseBatch>,
}

#[derive(Debug, Clone)]
pub enum PageLoad {
    Current(ChapterPage),
    /// A newer navigation started before this load finished.
    Stale,
}

/// Loads chapter pages and discards results that arrive after the user has
/// navigated elsewhere.
pub struct ChapterPageLoader {
    api: QuranApi,
    playback: Option<Arc<PlaybackManager>>,
    generation: AtomicU64,
    cancel: std::sync::Mutex<CancellationToken>,
}

impl ChapterPageLoader {
    pub fn new(api: QuranApi) -> Self {
        Self {
            api,
            playback: None,
            generation: AtomicU64::new(0),
            cancel: std::sync::Mutex::new(CancellationToken::new()),
        }
    }

    /// Stops any playing verse whenever a new page is loaded.
    pub fn with_playback(mut self, playback: Arc<PlaybackManager>) -> Self {
        self.playback = Some(playback);
        self
    }

    /// Token cancelled when the next navigation starts. Hand it to verse
    /// players so in-flight audio loads stop with the page.
    pub fn current_cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .map(|token| token.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub async fn load(&self, chapter_id: u32) -> PageLoad {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.begin_navigation();
        if let Some(playback) = &self.playback {
            playback.stop_all().await;
        }

        let fetch = async {
            tokio::join!(
                crate::chapter::fetch_chapter(&self.api, chapter_id),
                crate::verses::fetch_verses(&self.api, chapter_id),
            )
        };
        let (chapter, verses) = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(chapter_id, generation, "chapter load cancelled");
                return PageLoad::Stale;
            }
            loaded = fetch => loaded,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(chapter_id, generation, "discarding stale chapter load");
            return PageLoad::Stale;
        }
        PageLoad::Current(ChapterPage { chapter, verses })
    }

    fn begin_navigation(&self) -> CancellationToken {
        let fresh = CancellationToken::new();
        let mut current = self
            .cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = std::mem::replace(&mut *current, fresh.clone());
        previous.cancel();
        fresh
    }
}
