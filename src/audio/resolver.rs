use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::audio::element::{LoadSignal, PlaybackElement};
use crate::audio::memo::{AudioAvailabilityMemo, AudioKey};
use crate::audio::source::{AudioCandidateSet, AudioSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The element is bound to this URL and has its metadata.
    Ready(String),
    /// Every candidate failed, now or in an earlier attempt.
    Unavailable,
    /// The caller navigated away; the element was released.
    Cancelled,
}

/// Tries candidate URLs one at a time and remembers keys that had none.
pub struct AudioResolver {
    templates: Vec<String>,
    load_timeout: Duration,
    memo: Mutex<AudioAvailabilityMemo>,
}

impl AudioResolver {
    pub fn new(
        templates: Vec<String>,
        load_timeout: Duration,
        memo: AudioAvailabilityMemo,
    ) -> Self {
        Self {
            templates,
            load_timeout,
            memo: Mutex::new(memo),
        }
    }

    pub fn candidates(&self, source: &AudioSource) -> AudioCandidateSet {
        AudioCandidateSet::build(source, &self.templates)
    }

    pub async fn is_unavailable(&self, source: &AudioSource) -> bool {
        self.memo
            .lock()
            .await
            .is_unavailable(&AudioKey::for_source(source))
    }

    /// Records a key as unavailable. Persistence failures are logged only.
    pub async fn mark_unavailable(&self, source: &AudioSource) {
        let key = AudioKey::for_source(source);
        if let Err(err) = self.memo.lock().await.mark_unavailable(&key).await {
            tracing::warn!(%key, ?err, "failed to persist audio memo entry");
        }
    }

    pub async fn clear_memo(&self) -> anyhow::Result<usize> {
        self.memo.lock().await.clear().await
    }

    /// Binds `element` to the first candidate that reports ready.
    ///
    /// Candidate K+1 is only tried after candidate K errored or timed out.
    pub async fn resolve(
        &self,
        element: &mut dyn PlaybackElement,
        source: &AudioSource,
        cancel: &CancellationToken,
    ) -> Resolution {
        let key = AudioKey::for_source(source);
        if self.memo.lock().await.is_unavailable(&key) {
            tracing::debug!(%key, "audio memoized as unavailable; skipping network");
            return Resolution::Unavailable;
        }

        let candidates = self.candidates(source);
        let total = candidates.len();
        for (index, url) in candidates.into_iter().enumerate() {
            if cancel.is_cancelled() {
                element.release();
                return Resolution::Cancelled;
            }

            element.bind(&url);
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                outcome = tokio::time::timeout(self.load_timeout, element.load_metadata()) => Some(outcome),
            };
            let Some(outcome) = outcome else {
                element.release();
                tracing::debug!(%key, "audio load cancelled");
                return Resolution::Cancelled;
            };

            match outcome {
                Ok(LoadSignal::Ready) => {
                    tracing::info!(%key, %url, attempt = index + 1, "audio source ready");
                    return Resolution::Ready(url);
                }
                Ok(LoadSignal::Error(reason)) => {
                    tracing::debug!(
                        %key,
                        %url,
                        attempt = index + 1,
                        total,
                        %reason,
                        "audio source failed"
                    );
                }
                Err(_) => {
                    tracing::debug!(
                        %key,
                        %url,
                        attempt = index + 1,
                        total,
                        timeout_ms = self.load_timeout.as_millis() as u64,
                        "audio source timed out"
                    );
                }
            }
        }

        element.release();
        tracing::info!(%key, candidates = total, "no audio source available");
        self.mark_unavailable(source).await;
        Resolution::Unavailable
    }
}
