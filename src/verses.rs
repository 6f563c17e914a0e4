use serde_json::Value;

use crate::api::QuranApi;
use crate::error::{FetchError, Fetched};
use crate::formats::{VerseBatch, VerseRecord, WordGloss};
use crate::translation::clean_translation;

/// Fetches every page of a chapter's verses and normalizes them.
///
/// Never fails: transport and decoding errors produce an empty
/// `Fetched::Fallback`, while a page with an unexpected shape or a malformed
/// verse ends pagination and keeps what was already read.
pub async fn fetch_verses(api: &QuranApi, chapter_id: u32) -> Fetched<VerseBatch> {
    match try_fetch_verses(api, chapter_id).await {
        Ok(batch) => {
            tracing::info!(
                chapter_id,
                verses = batch.verses.len(),
                pages = batch.pages,
                truncated = batch.truncated,
                "fetched verses"
            );
            Fetched::Loaded(batch)
        }
        Err(reason) => {
            tracing::warn!(chapter_id, %reason, "verse fetch failed; returning empty batch");
            Fetched::Fallback {
                value: VerseBatch::empty(chapter_id),
                reason,
            }
        }
    }
}

async fn try_fetch_verses(api: &QuranApi, chapter_id: u32) -> Result<VerseBatch, FetchError> {
    let max_pages = api.config().max_pages;
    let audio_cdn = api.config().audio_cdn().to_owned();
    let mut batch = VerseBatch::empty(chapter_id);
    let mut page = 1u32;

    loop {
        let url = api.verses_url(chapter_id, page);
        let body = api.get_json(&url).await?;

        let Some(raw_verses) = page_verses(&body) else {
            tracing::warn!(chapter_id, page, "page has no verse array; stopping pagination");
            batch.truncated = true;
            break;
        };

        let normalized = match raw_verses
            .iter()
            .map(|raw| normalize_verse(raw, chapter_id, &audio_cdn))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(normalized) => normalized,
            Err(reason) => {
                tracing::warn!(chapter_id, page, %reason, "malformed verse; stopping pagination");
                batch.truncated = true;
                break;
            }
        };

        let last = batch.verses.last().map(|v| v.verse_number);
        if !is_strictly_increasing(last, &normalized) {
            tracing::warn!(
                chapter_id,
                page,
                "verse numbers out of order; stopping pagination"
            );
            batch.truncated = true;
            break;
        }

        batch.verses.extend(normalized);
        batch.pages = page;

        match next_page(&body, page) {
            Some(next) if batch.pages >= max_pages => {
                tracing::warn!(chapter_id, next, max_pages, "page cap reached");
                batch.truncated = true;
                break;
            }
            Some(next) => page = next,
            None => break,
        }
    }

    Ok(batch)
}

/// Verses live at the top level or under a `data` wrapper.
fn page_verses(body: &Value) -> Option<&Vec<Value>> {
    body.get("verses")
        .or_else(|| body.get("data").and_then(|data| data.get("verses")))
        .and_then(Value::as_array)
}

fn next_page(body: &Value, current: u32) -> Option<u32> {
    let next = body
        .get("pagination")
        .and_then(|p| p.get("next_page"))
        .and_then(Value::as_u64)?;
    let next = u32::try_from(next).ok()?;
    (next > current).then_some(next)
}

fn is_strictly_increasing(previous: Option<u32>, verses: &[VerseRecord]) -> bool {
    let mut previous = previous;
    for verse in verses {
        if previous.is_some_and(|p| verse.verse_number <= p) {
            return false;
        }
        previous = Some(verse.verse_number);
    }
    true
}

pub fn normalize_verse(
    raw: &Value,
    chapter_id: u32,
    audio_cdn: &str,
) -> Result<VerseRecord, FetchError> {
    let id = raw
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| FetchError::malformed("verse is missing numeric `id`"))?;
    let verse_number = raw
        .get("verse_number")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| FetchError::malformed(format!("verse {id} has no valid `verse_number`")))?;

    if let Some(reported) = raw.get("chapter_id").and_then(Value::as_u64)
        && reported != u64::from(chapter_id)
    {
        return Err(FetchError::malformed(format!(
            "verse {id} belongs to chapter {reported}, expected {chapter_id}"
        )));
    }

    let text_uthmani = raw
        .get("text_uthmani")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let translation = raw
        .pointer("/translations/0/text")
        .and_then(Value::as_str)
        .map(clean_translation)
        .unwrap_or_default();

    let audio_url = verse_audio_url(raw).map(|url| format_audio_url(url, audio_cdn));
    if audio_url.is_none() {
        tracing::debug!(chapter_id, verse_number, "no audio url in payload");
    }

    Ok(VerseRecord {
        id,
        chapter_id,
        verse_number,
        text_uthmani,
        translation,
        audio_url,
        words: raw.get("words").and_then(Value::as_array).map(|w| word_glosses(w)),
    })
}

/// Picks the audio URL by priority: `audio_file`, an `audio` object, then the
/// first mp3 entry of an `audio`/`audio_resources` array.
fn verse_audio_url(raw: &Value) -> Option<&str> {
    if let Some(url) = raw.pointer("/audio_file/url").and_then(non_empty_str) {
        return Some(url);
    }
    if let Some(audio) = raw.get("audio").filter(|a| a.is_object())
        && let Some(url) = audio.get("url").and_then(non_empty_str)
    {
        return Some(url);
    }

    let resources = raw
        .get("audio")
        .and_then(Value::as_array)
        .or_else(|| raw.get("audio_resources").and_then(Value::as_array))?;
    resources
        .iter()
        .filter(|res| res.get("format").and_then(Value::as_str) == Some("mp3"))
        .find_map(|res| res.get("url").and_then(non_empty_str))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

pub fn format_audio_url(url: &str, audio_cdn: &str) -> String {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_owned()
    } else if url.starts_with("//") {
        format!("https:{url}")
    } else if url.starts_with('/') {
        format!("{}{url}", audio_cdn.trim_end_matches('/'))
    } else {
        format!("https://{url}")
    }
}

fn word_glosses(words: &[Value]) -> Vec<WordGloss> {
    words
        .iter()
        .enumerate()
        .map(|(index, word)| WordGloss {
            position: word
                .get("position")
                .and_then(Value::as_u64)
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(index as u32 + 1),
            text: word
                .get("text_uthmani")
                .or_else(|| word.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            translation: word
                .pointer("/translation/text")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const CDN: &str = "https://audio.qurancdn.com";

    #[test]
    fn normalizes_full_verse() -> anyhow::Result<()> {
        let raw = json!({
            "id": 8,
            "chapter_id": 2,
            "verse_number": 1,
            "text_uthmani": "الٓمٓ",
            "translations": [{ "text": "Alif-Lãm-Mĩm.<sup foot_note=1>1</sup>" }],
            "audio": { "url": "Alafasy/mp3/002001.mp3" },
            "words": [
                { "position": 1, "text_uthmani": "الٓمٓ", "translation": { "text": "Alif Laam Meem" } },
                { "position": 2, "text_uthmani": "۝١" }
            ]
        });
        let verse = normalize_verse(&raw, 2, CDN)?;
        assert_eq!(verse.translation, "Alif-Lãm-Mĩm.");
        assert_eq!(
            verse.audio_url.as_deref(),
            Some("https://Alafasy/mp3/002001.mp3")
        );
        let words = verse.words.unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].translation.as_deref(), Some("Alif Laam Meem"));
        assert_eq!(words[1].translation, None);
        Ok(())
    }

    #[test]
    fn audio_file_wins_over_resources() -> anyhow::Result<()> {
        let raw = json!({
            "id": 1, "verse_number": 1,
            "audio_file": { "url": "/Alafasy/001001.mp3" },
            "audio_resources": [{ "format": "mp3", "url": "https://other/1.mp3" }]
        });
        let verse = normalize_verse(&raw, 1, CDN)?;
        assert_eq!(
            verse.audio_url.as_deref(),
            Some("https://audio.qurancdn.com/Alafasy/001001.mp3")
        );
        Ok(())
    }

    #[test]
    fn picks_first_mp3_resource() -> anyhow::Result<()> {
        let raw = json!({
            "id": 1, "verse_number": 1,
            "audio": [
                { "format": "ogg", "url": "https://cdn/1.ogg" },
                { "format": "mp3", "url": "cdn.example/1.mp3" }
            ]
        });
        let verse = normalize_verse(&raw, 1, CDN)?;
        assert_eq!(verse.audio_url.as_deref(), Some("https://cdn.example/1.mp3"));
        assert!(verse.words.is_none());
        Ok(())
    }

    #[test]
    fn missing_audio_is_none() -> anyhow::Result<()> {
        let raw = json!({ "id": 1, "verse_number": 1, "audio_resources": [] });
        assert_eq!(normalize_verse(&raw, 1, CDN)?.audio_url, None);
        Ok(())
    }

    #[test]
    fn rejects_verse_without_number() {
        let raw = json!({ "id": 1 });
        assert!(matches!(
            normalize_verse(&raw, 1, CDN),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_foreign_chapter() {
        let raw = json!({ "id": 1, "chapter_id": 3, "verse_number": 1 });
        assert!(normalize_verse(&raw, 1, CDN).is_err());
    }

    #[test]
    fn formats_audio_urls() {
        assert_eq!(format_audio_url("https://a/b.mp3", CDN), "https://a/b.mp3");
        assert_eq!(format_audio_url("//a/b.mp3", CDN), "https://a/b.mp3");
        assert_eq!(
            format_audio_url("/b.mp3", CDN),
            "https://audio.qurancdn.com/b.mp3"
        );
        assert_eq!(format_audio_url("a.com/b.mp3", CDN), "https://a.com/b.mp3");
    }

    #[test]
    fn next_page_must_advance() {
        let body = json!({ "pagination": { "next_page": 2 } });
        assert_eq!(next_page(&body, 1), Some(2));
        assert_eq!(next_page(&body, 2), None);
        assert_eq!(next_page(&json!({ "pagination": { "next_page": null } }), 1), None);
    }

    #[test]
    fn reads_wrapped_verses() {
        let body = json!({ "data": { "verses": [{ "id": 1 }] } });
        assert_eq!(page_verses(&body).map(Vec::len), Some(1));
        assert!(page_verses(&json!({ "verses": "nope" })).is_none());
    }
}
