use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RANGE, USER_AGENT};

/// What a metadata load reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSignal {
    Ready,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    /// Playback needs a user gesture first. Transient.
    #[error("autoplay blocked until the user interacts")]
    AutoplayBlocked,

    #[error("playback failed: {0}")]
    Failed(String),
}

/// Something that can be pointed at a URL and played.
///
/// `load_metadata` may never complete; callers bound it with a timeout.
#[async_trait]
pub trait PlaybackElement: Send {
    fn bind(&mut self, url: &str);
    async fn load_metadata(&mut self) -> LoadSignal;
    async fn play(&mut self) -> Result<(), PlayError>;
    fn pause(&mut self);
    /// Detaches the source so no further loading happens.
    fn release(&mut self);
    fn is_playing(&self) -> bool;
    fn source(&self) -> Option<&str>;
}

pub type SharedElement = Arc<tokio::sync::Mutex<dyn PlaybackElement>>;

pub fn shared(element: impl PlaybackElement + 'static) -> SharedElement {
    Arc::new(tokio::sync::Mutex::new(element))
}

/// Headless element that checks availability over HTTP.
///
/// Loading issues a two-byte ranged GET; playing only tracks state, which is
/// enough for resolving and probing CDNs from the command line.
#[derive(Debug)]
pub struct HttpProbeElement {
    client: reqwest::Client,
    source: Option<String>,
    ready: bool,
    playing: bool,
}

impl HttpProbeElement {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build audio probe http client")?;
        Ok(Self {
            client,
            source: None,
            ready: false,
            playing: false,
        })
    }
}

#[async_trait]
impl PlaybackElement for HttpProbeElement {
    fn bind(&mut self, url: &str) {
        self.source = Some(url.to_owned());
        self.ready = false;
        self.playing = false;
    }

    async fn load_metadata(&mut self) -> LoadSignal {
        let Some(url) = self.source.clone() else {
            return LoadSignal::Error("no source bound".to_owned());
        };

        let response = match self
            .client
            .get(&url)
            .header(USER_AGENT, concat!("quranview/", env!("CARGO_PKG_VERSION")))
            .header(RANGE, "bytes=0-1")
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return LoadSignal::Error(format!("GET {url}: {err}")),
        };

        let status = response.status();
        if !status.is_success() {
            return LoadSignal::Error(format!("GET {url}: status {status}"));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);
        if let Some(content_type) = content_type
            && !(content_type.starts_with("audio/")
                || content_type.starts_with("application/octet-stream"))
        {
            return LoadSignal::Error(format!("GET {url}: not audio ({content_type})"));
        }

        self.ready = true;
        LoadSignal::Ready
    }

    async fn play(&mut self) -> Result<(), PlayError> {
        if !self.ready {
            return Err(PlayError::Failed("source is not loaded".to_owned()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn release(&mut self) {
        self.source = None;
        self.ready = false;
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}
