use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RevelationPlace {
    Meccan,
    Medinan,
    #[default]
    Unknown,
}

impl RevelationPlace {
    /// Maps the API's free-form tag (`makkah`, `madinah`, ...) onto the enum.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "makkah" | "meccan" | "mecca" | "makki" => Self::Meccan,
            "madinah" | "medinan" | "medina" | "madani" => Self::Medinan,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterSummary {
    pub id: u32,
    pub name_simple: String,
    pub name_arabic: String,
    pub translated_name: String,
    pub verses_count: u32,
    pub revelation_place: RevelationPlace,
}

impl ChapterSummary {
    /// Stand-in shown when the chapter could not be fetched.
    pub fn placeholder(id: u32) -> Self {
        Self {
            id,
            name_simple: format!("Chapter {id}"),
            name_arabic: String::new(),
            translated_name: "Loading failed".to_owned(),
            verses_count: 0,
            revelation_place: RevelationPlace::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordGloss {
    pub position: u32,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerseRecord {
    pub id: u64,
    pub chapter_id: u32,
    pub verse_number: u32,
    pub text_uthmani: String,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordGloss>>,
}

impl VerseRecord {
    pub fn key(&self) -> VerseKey {
        VerseKey::new(self.chapter_id, self.verse_number)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VerseKey {
    pub chapter: u32,
    pub verse: u32,
}

impl VerseKey {
    pub fn new(chapter: u32, verse: u32) -> Self {
        Self { chapter, verse }
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chapter, self.verse)
    }
}

/// All verses of one chapter, in source order.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VerseBatch {
    pub chapter_id: u32,
    pub verses: Vec<VerseRecord>,
    /// Pages successfully read.
    pub pages: u32,
    /// Pagination stopped early on a malformed page or the page cap.
    pub truncated: bool,
}

impl VerseBatch {
    pub fn empty(chapter_id: u32) -> Self {
        Self {
            chapter_id,
            verses: Vec::new(),
            pages: 0,
            truncated: false,
        }
    }
}
