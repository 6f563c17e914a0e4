use serde_json::Value;

use crate::api::QuranApi;
use crate::error::{FetchError, Fetched};
use crate::formats::{ChapterSummary, RevelationPlace};

/// Fetches one chapter summary, substituting a placeholder on any failure.
pub async fn fetch_chapter(api: &QuranApi, chapter_id: u32) -> Fetched<ChapterSummary> {
    let result = api
        .get_json(&api.chapter_url(chapter_id))
        .await
        .and_then(|body| {
            let raw = body
                .get("chapter")
                .ok_or_else(|| FetchError::malformed("response has no `chapter` object"))?;
            parse_chapter(raw)
        });

    match result {
        Ok(chapter) => Fetched::Loaded(chapter),
        Err(reason) => {
            tracing::warn!(chapter_id, %reason, "chapter fetch failed; using placeholder");
            Fetched::Fallback {
                value: ChapterSummary::placeholder(chapter_id),
                reason,
            }
        }
    }
}

/// Fetches the chapter list. Entries that cannot be parsed are skipped.
pub async fn fetch_chapters(api: &QuranApi) -> Fetched<Vec<ChapterSummary>> {
    let result = api.get_json(&api.chapters_url()).await.and_then(|body| {
        let raw = body
            .get("chapters")
            .and_then(Value::as_array)
            .ok_or_else(|| FetchError::malformed("response has no `chapters` array"))?;
        Ok(raw
            .iter()
            .filter_map(|entry| match parse_chapter(entry) {
                Ok(chapter) => Some(chapter),
                Err(err) => {
                    tracing::debug!(%err, "skipping unparseable chapter entry");
                    None
                }
            })
            .collect::<Vec<_>>())
    });

    match result {
        Ok(chapters) => {
            tracing::info!(chapters = chapters.len(), "fetched chapter list");
            Fetched::Loaded(chapters)
        }
        Err(reason) => {
            tracing::warn!(%reason, "chapter list fetch failed");
            Fetched::Fallback {
                value: Vec::new(),
                reason,
            }
        }
    }
}

pub fn parse_chapter(raw: &Value) -> Result<ChapterSummary, FetchError> {
    let id = raw
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| FetchError::malformed("chapter has no positive `id`"))?;
    let name_simple = raw
        .get("name_simple")
        .and_then(Value::as_str)
        .ok_or_else(|| FetchError::malformed(format!("chapter {id} has no `name_simple`")))?
        .to_owned();

    let text = |pointer: &str| {
        raw.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()
    };

    Ok(ChapterSummary {
        id,
        name_simple,
        name_arabic: text("/name_arabic"),
        translated_name: text("/translated_name/name"),
        verses_count: raw
            .get("verses_count")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0),
        revelation_place: RevelationPlace::from_tag(&text("/revelation_place")),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_api_chapter() -> anyhow::Result<()> {
        let raw = json!({
            "id": 1,
            "revelation_place": "makkah",
            "name_simple": "Al-Fatihah",
            "name_arabic": "الفاتحة",
            "verses_count": 7,
            "translated_name": { "language_name": "english", "name": "The Opener" }
        });
        let chapter = parse_chapter(&raw)?;
        assert_eq!(chapter.translated_name, "The Opener");
        assert_eq!(chapter.verses_count, 7);
        assert_eq!(chapter.revelation_place, RevelationPlace::Meccan);
        Ok(())
    }

    #[test]
    fn optional_fields_default() -> anyhow::Result<()> {
        let chapter = parse_chapter(&json!({ "id": 9, "name_simple": "At-Tawbah" }))?;
        assert_eq!(chapter.name_arabic, "");
        assert_eq!(chapter.verses_count, 0);
        assert_eq!(chapter.revelation_place, RevelationPlace::Unknown);
        Ok(())
    }

    #[test]
    fn rejects_zero_id() {
        assert!(parse_chapter(&json!({ "id": 0, "name_simple": "x" })).is_err());
    }
}
