use std::sync::LazyLock;

use regex::Regex;

use crate::formats::{VerseKey, VerseRecord};

// Both patterns only look at the file name, so numbered host or directory
// segments such as `v2_128/` are not mistaken for a verse.
static RE_UNDERSCORE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d+)_(\d+)\.mp3(?:[?#]|$)").expect("invalid underscore pair pattern")
});
static RE_PATH_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d+)/(\d+)\.mp3(?:[?#]|$)").expect("invalid path pair pattern")
});

/// What the caller knows about the audio it wants to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    Url(String),
    Verse(VerseKey),
}

impl AudioSource {
    /// Uses the verse's resolved URL, or its key when the payload had none.
    pub fn for_verse(verse: &VerseRecord) -> Self {
        match verse.audio_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Self::Url(url.to_owned()),
            _ => Self::Verse(verse.key()),
        }
    }

    /// The verse this source refers to, when it can be determined.
    pub fn verse_key(&self) -> Option<VerseKey> {
        match self {
            Self::Verse(key) => Some(*key),
            Self::Url(url) => verse_key_from_url(url),
        }
    }
}

/// Extracts a (chapter, verse) pair from `.../1_1.mp3` or `.../1/1.mp3`.
pub fn verse_key_from_url(url: &str) -> Option<VerseKey> {
    let caps = RE_UNDERSCORE_PAIR
        .captures(url)
        .or_else(|| RE_PATH_PAIR.captures(url))?;
    let chapter = caps.get(1)?.as_str().parse().ok()?;
    let verse = caps.get(2)?.as_str().parse().ok()?;
    Some(VerseKey::new(chapter, verse))
}

/// Ordered candidate URLs, most preferred first. Rebuilt for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCandidateSet(Vec<String>);

impl AudioCandidateSet {
    /// Expands the templates for a known verse; a bare URL is its own
    /// single candidate.
    pub fn build(source: &AudioSource, templates: &[String]) -> Self {
        if let Some(key) = source.verse_key() {
            return Self(
                templates
                    .iter()
                    .map(|template| expand_template(template, key))
                    .collect(),
            );
        }
        match source {
            AudioSource::Url(url) => Self(vec![url.clone()]),
            AudioSource::Verse(_) => Self(Vec::new()),
        }
    }

    pub fn urls(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for AudioCandidateSet {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

pub fn expand_template(template: &str, key: VerseKey) -> String {
    template
        .replace("{chapter3}", &format!("{:03}", key.chapter))
        .replace("{verse3}", &format!("{:03}", key.verse))
        .replace("{chapter}", &key.chapter.to_string())
        .replace("{verse}", &key.verse.to_string())
}
