use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;

pub const DEFAULT_API_BASE_URL: &str = "https://api.quran.com/api/v4";
pub const DEFAULT_AUDIO_CDN: &str = "https://audio.qurancdn.com";
pub const DEFAULT_TRANSLATION_ID: u32 = 131;
pub const DEFAULT_PER_PAGE: u32 = 50;
pub const DEFAULT_MAX_PAGES: u32 = 100;
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Candidate templates, most preferred first.
///
/// `{chapter}`/`{verse}` are substituted verbatim, `{chapter3}`/`{verse3}`
/// zero-padded to three digits.
pub const DEFAULT_AUDIO_TEMPLATES: &[&str] = &[
    "https://audio.qurancdn.com/Alafasy/{chapter3}{verse3}.mp3",
    "https://cdn.islamic.network/quran/audio/128/ar.alafasy/{chapter}_{verse}.mp3",
    "https://verses.quran.com/Alafasy/{chapter3}{verse3}.mp3",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub translation_id: u32,
    pub per_page: u32,
    pub max_pages: u32,
    pub audio_cdn: String,
    pub audio_templates: Vec<String>,
    pub memo_path: PathBuf,
    pub load_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            translation_id: DEFAULT_TRANSLATION_ID,
            per_page: DEFAULT_PER_PAGE,
            max_pages: DEFAULT_MAX_PAGES,
            audio_cdn: DEFAULT_AUDIO_CDN.to_owned(),
            audio_templates: DEFAULT_AUDIO_TEMPLATES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            memo_path: default_memo_path(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = env_var("QURANVIEW_API_BASE_URL") {
            config.api_base_url = raw;
        }
        if let Some(raw) = env_var("QURANVIEW_TRANSLATION_ID") {
            config.translation_id = raw
                .parse()
                .with_context(|| format!("invalid QURANVIEW_TRANSLATION_ID={raw:?}"))?;
        }
        if let Some(raw) = env_var("QURANVIEW_PER_PAGE") {
            config.per_page = raw
                .parse()
                .with_context(|| format!("invalid QURANVIEW_PER_PAGE={raw:?}"))?;
        }
        if let Some(raw) = env_var("QURANVIEW_AUDIO_CDN") {
            config.audio_cdn = raw;
        }
        if let Some(raw) = env_var("QURANVIEW_MEMO_PATH") {
            config.memo_path = PathBuf::from(raw);
        }
        if let Some(raw) = env_var("QURANVIEW_LOAD_TIMEOUT_MS") {
            let millis: u64 = raw
                .parse()
                .with_context(|| format!("invalid QURANVIEW_LOAD_TIMEOUT_MS={raw:?}"))?;
            config.load_timeout = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("api base url", &self.api_base_url),
            ("audio cdn", &self.audio_cdn),
        ] {
            let parsed =
                url::Url::parse(value).with_context(|| format!("parse {name}: {value:?}"))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("{name} must be http/https: {value}");
            }
        }
        if self.per_page == 0 {
            anyhow::bail!("per_page must be > 0");
        }
        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be > 0");
        }
        if self.load_timeout.is_zero() {
            anyhow::bail!("load timeout must be > 0");
        }
        if self.audio_templates.is_empty() {
            anyhow::bail!("at least one audio template is required");
        }
        Ok(())
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn audio_cdn(&self) -> &str {
        self.audio_cdn.trim_end_matches('/')
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn default_memo_path() -> PathBuf {
    let cache_dir = env_var("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| env_var("HOME").map(|home| PathBuf::from(home).join(".cache")));
    match cache_dir {
        Some(dir) => dir.join("quranview").join("audio-memo.json"),
        None => PathBuf::from(".quranview").join("audio-memo.json"),
    }
}
