use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use tokio::fs;

use crate::audio::source::AudioSource;
use crate::formats::VerseKey;

/// Stable memo key. Every URL spelling of the same verse maps to one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AudioKey {
    Verse(VerseKey),
    Url(String),
}

impl AudioKey {
    pub fn for_source(source: &AudioSource) -> Self {
        if let Some(key) = source.verse_key() {
            return Self::Verse(key);
        }
        match source {
            AudioSource::Url(url) => Self::Url(url_digest(url)),
            AudioSource::Verse(key) => Self::Verse(*key),
        }
    }
}

impl fmt::Display for AudioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verse(key) => write!(f, "verse:{}:{}", key.chapter, key.verse),
            Self::Url(digest) => write!(f, "url:{digest}"),
        }
    }
}

fn url_digest(raw: &str) -> String {
    let normalized = match url::Url::parse(raw.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => raw.trim().to_owned(),
    };
    let mut hasher = sha2::Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoEntry {
    pub unavailable: bool,
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoSnapshot {
    #[serde(default)]
    pub entries: BTreeMap<String, MemoEntry>,
}

#[async_trait]
pub trait MemoStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<MemoSnapshot>;
    async fn save(&self, snapshot: &MemoSnapshot) -> anyhow::Result<()>;
}

/// Memo persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileMemoStore {
    path: PathBuf,
}

impl JsonFileMemoStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MemoStore for JsonFileMemoStore {
    async fn load(&self) -> anyhow::Result<MemoSnapshot> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MemoSnapshot::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read memo: {}", self.path.display()));
            }
        };
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse memo: {}", self.path.display()))
    }

    async fn save(&self, snapshot: &MemoSnapshot) -> anyhow::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("create memo dir: {}", parent.display()))?;

        let tmp_path = self
            .path
            .with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
        let data = serde_json::to_vec_pretty(snapshot).context("serialize memo")?;
        fs::write(&tmp_path, &data)
            .await
            .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("rename tmp to final: {}", self.path.display()))?;
        Ok(())
    }
}

/// Memo that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryMemoStore {
    snapshot: Mutex<MemoSnapshot>,
}

#[async_trait]
impl MemoStore for InMemoryMemoStore {
    async fn load(&self) -> anyhow::Result<MemoSnapshot> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|_| anyhow::anyhow!("memo lock poisoned"))?;
        Ok(snapshot.clone())
    }

    async fn save(&self, snapshot: &MemoSnapshot) -> anyhow::Result<()> {
        let mut current = self
            .snapshot
            .lock()
            .map_err(|_| anyhow::anyhow!("memo lock poisoned"))?;
        *current = snapshot.clone();
        Ok(())
    }
}

/// Which audio keys are known to have no playable source.
///
/// Entries never expire. A key stays unavailable until [`clear`] even if the
/// remote service starts serving it again.
///
/// [`clear`]: AudioAvailabilityMemo::clear
pub struct AudioAvailabilityMemo {
    store: Box<dyn MemoStore>,
    snapshot: MemoSnapshot,
}

impl AudioAvailabilityMemo {
    pub async fn open(store: impl MemoStore + 'static) -> anyhow::Result<Self> {
        let snapshot = store.load().await.context("load audio memo")?;
        tracing::debug!(entries = snapshot.entries.len(), "opened audio memo");
        Ok(Self {
            store: Box::new(store),
            snapshot,
        })
    }

    pub async fn open_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::open(JsonFileMemoStore::new(path)).await
    }

    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::open(InMemoryMemoStore::default()).await
    }

    pub fn is_unavailable(&self, key: &AudioKey) -> bool {
        self.snapshot
            .entries
            .get(&key.to_string())
            .is_some_and(|entry| entry.unavailable)
    }

    pub async fn mark_unavailable(&mut self, key: &AudioKey) -> anyhow::Result<()> {
        self.snapshot.entries.insert(
            key.to_string(),
            MemoEntry {
                unavailable: true,
                marked_at: Utc::now(),
            },
        );
        self.store
            .save(&self.snapshot)
            .await
            .with_context(|| format!("persist memo entry {key}"))
    }

    /// Forgets every entry. Returns how many were removed.
    pub async fn clear(&mut self) -> anyhow::Result<usize> {
        let removed = self.snapshot.entries.len();
        self.snapshot.entries.clear();
        self.store.save(&self.snapshot).await.context("persist cleared memo")?;
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.snapshot.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.entries.is_empty()
    }
}
