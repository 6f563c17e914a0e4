use std::sync::Arc;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde_json::Value;

use crate::config::Config;
use crate::error::FetchError;

const CLIENT_USER_AGENT: &str = concat!("quranview/", env!("CARGO_PKG_VERSION"));

/// Thin JSON client over the chapters/verses endpoints.
#[derive(Debug, Clone)]
pub struct QuranApi {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl QuranApi {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("build api http client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chapters_url(&self) -> String {
        format!("{}/chapters?language=en", self.config.api_base_url())
    }

    pub fn chapter_url(&self, chapter_id: u32) -> String {
        format!(
            "{}/chapters/{chapter_id}?language=en",
            self.config.api_base_url()
        )
    }

    pub fn verses_url(&self, chapter_id: u32, page: u32) -> String {
        format!(
            "{}/verses/by_chapter/{chapter_id}?words=true&audio=1&translations={}&fields=text_uthmani&page={page}&per_page={}",
            self.config.api_base_url(),
            self.config.translation_id,
            self.config.per_page,
        )
    }

    pub async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let raw = response.text().await?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|err| FetchError::malformed(format!("decode json from {url}: {err}")))?;
        if value.is_null() {
            return Err(FetchError::malformed(format!("empty response from {url}")));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> QuranApi {
        let config = Config {
            api_base_url: "http://127.0.0.1:9/api/v4/".to_owned(),
            per_page: 10,
            translation_id: 20,
            ..Config::default()
        };
        QuranApi::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn builds_endpoint_urls() {
        let api = api();
        assert_eq!(
            api.chapter_url(2),
            "http://127.0.0.1:9/api/v4/chapters/2?language=en"
        );
        let verses = api.verses_url(2, 3);
        assert!(verses.starts_with("http://127.0.0.1:9/api/v4/verses/by_chapter/2?"));
        assert!(verses.contains("translations=20"));
        assert!(verses.contains("page=3&per_page=10"));
    }
}
