use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::audio::element::{PlayError, SharedElement};
use crate::audio::resolver::{AudioResolver, Resolution};
use crate::audio::source::AudioSource;
use crate::formats::VerseKey;

/// Proof that a verse currently owns the playback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackToken {
    id: u64,
    verse: VerseKey,
}

impl PlaybackToken {
    pub fn verse(&self) -> VerseKey {
        self.verse
    }
}

struct ActiveEntry {
    token: PlaybackToken,
    element: SharedElement,
}

/// Owner of the single "currently playing" slot.
///
/// Acquiring the slot pauses whatever held it before, so at most one element
/// plays at a time. Releases with an outdated token are ignored, which keeps
/// late callbacks from a previous verse from clearing the current one.
#[derive(Default)]
pub struct PlaybackManager {
    active: Mutex<Option<ActiveEntry>>,
    next_id: AtomicU64,
}

impl PlaybackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, verse: VerseKey, element: SharedElement) -> PlaybackToken {
        let token = PlaybackToken {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            verse,
        };

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::debug!(from = %previous.token.verse, to = %verse, "handing over playback");
            previous.element.lock().await.pause();
        }
        *active = Some(ActiveEntry { token, element });
        token
    }

    /// Clears the slot if `token` still owns it. Returns whether it did.
    pub async fn release(&self, token: PlaybackToken) -> bool {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|entry| entry.token == token) {
            *active = None;
            return true;
        }
        tracing::debug!(verse = %token.verse, "ignoring release of stale playback token");
        false
    }

    pub async fn is_current(&self, token: PlaybackToken) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(|entry| entry.token == token)
    }

    pub async fn current_verse(&self) -> Option<VerseKey> {
        self.active.lock().await.as_ref().map(|entry| entry.token.verse)
    }

    /// Pauses and detaches the active element. Used when leaving a page.
    pub async fn stop_all(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            let mut element = previous.element.lock().await;
            element.pause();
            element.release();
            tracing::debug!(verse = %previous.token.verse, "stopped playback");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
    Unavailable,
}

impl PlaybackPhase {
    fn can_become(self, next: Self) -> bool {
        use PlaybackPhase::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Loading, Ready)
                | (Loading, Unavailable)
                | (Loading, Idle)
                | (Ready, Playing)
                | (Ready, Unavailable)
                | (Ready, Idle)
                | (Playing, Paused)
                | (Playing, Ended)
                | (Paused, Playing)
                | (Paused, Unavailable)
                | (Paused, Idle)
                | (Ended, Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    Playing,
    Paused,
    /// Needs a user gesture; try again from an interaction handler.
    AutoplayBlocked,
    Unavailable,
    Cancelled,
}

/// Playback controller for one verse.
pub struct VersePlayer {
    verse: VerseKey,
    source: AudioSource,
    element: SharedElement,
    resolver: Arc<AudioResolver>,
    manager: Arc<PlaybackManager>,
    phase: PlaybackPhase,
    token: Option<PlaybackToken>,
    url: Option<String>,
}

impl VersePlayer {
    pub fn new(
        verse: VerseKey,
        source: AudioSource,
        element: SharedElement,
        resolver: Arc<AudioResolver>,
        manager: Arc<PlaybackManager>,
    ) -> Self {
        Self {
            verse,
            source,
            element,
            resolver,
            manager,
            phase: PlaybackPhase::Idle,
            token: None,
            url: None,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn transition(&mut self, next: PlaybackPhase) -> anyhow::Result<()> {
        if !self.phase.can_become(next) {
            anyhow::bail!(
                "illegal playback transition for {}: {:?} -> {:?}",
                self.verse,
                self.phase,
                next
            );
        }
        tracing::trace!(verse = %self.verse, from = ?self.phase, to = ?next, "playback phase");
        self.phase = next;
        Ok(())
    }

    /// Reconciles with the manager: if another verse took the slot, this one
    /// is paused. If the element was also released (`stop_all` on
    /// navigation), the player falls back to `Idle` so the next play
    /// resolves again.
    pub async fn sync(&mut self) -> anyhow::Result<()> {
        if self.phase == PlaybackPhase::Playing {
            let still_current = match self.token {
                Some(token) => self.manager.is_current(token).await,
                None => false,
            };
            if !still_current {
                self.token = None;
                self.transition(PlaybackPhase::Paused)?;
            }
        }
        self.reset_if_released().await
    }

    async fn reset_if_released(&mut self) -> anyhow::Result<()> {
        if !matches!(self.phase, PlaybackPhase::Ready | PlaybackPhase::Paused) {
            return Ok(());
        }
        if self.element.lock().await.source().is_some() {
            return Ok(());
        }
        tracing::debug!(verse = %self.verse, "element was released; resolving again on next play");
        self.url = None;
        self.transition(PlaybackPhase::Idle)
    }

    pub async fn is_playing(&mut self) -> anyhow::Result<bool> {
        self.sync().await?;
        Ok(self.phase == PlaybackPhase::Playing)
    }

    pub async fn toggle(&mut self, cancel: &CancellationToken) -> anyhow::Result<PlayOutcome> {
        if self.is_playing().await? {
            self.pause().await?;
            return Ok(PlayOutcome::Paused);
        }
        self.play(cancel).await
    }

    pub async fn play(&mut self, cancel: &CancellationToken) -> anyhow::Result<PlayOutcome> {
        self.sync().await?;
        match self.phase {
            PlaybackPhase::Playing => return Ok(PlayOutcome::Playing),
            PlaybackPhase::Unavailable => return Ok(PlayOutcome::Unavailable),
            PlaybackPhase::Loading => anyhow::bail!("{} is already loading", self.verse),
            PlaybackPhase::Ended => self.transition(PlaybackPhase::Idle)?,
            PlaybackPhase::Idle | PlaybackPhase::Ready | PlaybackPhase::Paused => {}
        }

        if self.phase == PlaybackPhase::Idle {
            self.transition(PlaybackPhase::Loading)?;
            let resolution = {
                let mut element = self.element.lock().await;
                self.resolver
                    .resolve(&mut *element, &self.source, cancel)
                    .await
            };
            match resolution {
                Resolution::Ready(url) => {
                    self.url = Some(url);
                    self.transition(PlaybackPhase::Ready)?;
                }
                Resolution::Unavailable => {
                    self.transition(PlaybackPhase::Unavailable)?;
                    return Ok(PlayOutcome::Unavailable);
                }
                Resolution::Cancelled => {
                    self.transition(PlaybackPhase::Idle)?;
                    return Ok(PlayOutcome::Cancelled);
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(PlayOutcome::Cancelled);
        }

        // The previous owner must be paused before this element starts.
        let token = self
            .manager
            .acquire(self.verse, Arc::clone(&self.element))
            .await;
        let started = self.element.lock().await.play().await;
        match started {
            Ok(()) => {
                self.token = Some(token);
                self.transition(PlaybackPhase::Playing)?;
                Ok(PlayOutcome::Playing)
            }
            Err(PlayError::AutoplayBlocked) => {
                self.manager.release(token).await;
                tracing::info!(verse = %self.verse, "autoplay blocked; waiting for user gesture");
                Ok(PlayOutcome::AutoplayBlocked)
            }
            Err(PlayError::Failed(reason)) => {
                self.manager.release(token).await;
                tracing::warn!(verse = %self.verse, %reason, "playback failed");
                self.element.lock().await.release();
                self.resolver.mark_unavailable(&self.source).await;
                self.transition(PlaybackPhase::Unavailable)?;
                Ok(PlayOutcome::Unavailable)
            }
        }
    }

    pub async fn pause(&mut self) -> anyhow::Result<()> {
        self.sync().await?;
        if self.phase != PlaybackPhase::Playing {
            return Ok(());
        }
        self.element.lock().await.pause();
        if let Some(token) = self.token.take() {
            self.manager.release(token).await;
        }
        self.transition(PlaybackPhase::Paused)
    }

    /// Natural end of the recording.
    pub async fn on_ended(&mut self) -> anyhow::Result<()> {
        if let Some(token) = self.token.take() {
            self.manager.release(token).await;
        }
        self.transition(PlaybackPhase::Ended)?;
        self.url = None;
        self.transition(PlaybackPhase::Idle)
    }

    /// Tears the player down when its verse leaves the screen.
    pub async fn detach(&mut self) {
        if let Some(token) = self.token.take() {
            self.manager.release(token).await;
        }
        let mut element = self.element.lock().await;
        element.pause();
        element.release();
        drop(element);
        if self.phase != PlaybackPhase::Unavailable {
            self.phase = PlaybackPhase::Idle;
            self.url = None;
        }
    }
}
