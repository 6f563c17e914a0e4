mod api_stub;

use std::sync::Arc;
use std::time::Duration;

use api_stub::{StubResponse, StubServer, query_param, verse_json};
use quranview::api::QuranApi;
use quranview::audio::PlaybackManager;
use quranview::config::Config;
use quranview::error::FetchError;
use quranview::formats::RevelationPlace;
use quranview::page::{ChapterPageLoader, PageLoad};

fn api_for(server: &StubServer) -> QuranApi {
    let config = Config {
        api_base_url: server.base_url.clone(),
        ..Config::default()
    };
    QuranApi::new(Arc::new(config)).expect("build api")
}

fn chapter_json(id: u32, name: &str, verses: u32) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "revelation_place": "makkah",
        "name_simple": name,
        "name_arabic": "الفاتحة",
        "verses_count": verses,
        "translated_name": { "name": "The Opener" }
    })
}

#[tokio::test]
async fn non_ok_status_returns_placeholder() {
    let server = StubServer::spawn(|_| StubResponse::status(503));
    let api = api_for(&server);

    let fetched = quranview::chapter::fetch_chapter(&api, 42).await;
    assert!(!fetched.is_loaded());
    assert_eq!(fetched.reason(), Some(&FetchError::Status(503)));
    let chapter = fetched.value();
    assert_eq!(chapter.id, 42);
    assert_eq!(chapter.verses_count, 0);
    assert_eq!(chapter.name_simple, "Chapter 42");
    assert_eq!(chapter.translated_name, "Loading failed");
    assert_eq!(chapter.name_arabic, "");
}

#[tokio::test]
async fn missing_chapter_object_returns_placeholder() {
    let server = StubServer::spawn(|_| StubResponse::json(serde_json::json!({ "other": 1 })));
    let api = api_for(&server);

    let fetched = quranview::chapter::fetch_chapter(&api, 3).await;
    assert!(matches!(fetched.reason(), Some(FetchError::Malformed(_))));
    assert_eq!(fetched.value().id, 3);
}

#[tokio::test]
async fn loads_chapter_and_list() {
    let server = StubServer::spawn(|url| {
        if url.starts_with("/chapters/1") {
            StubResponse::json(serde_json::json!({ "chapter": chapter_json(1, "Al-Fatihah", 7) }))
        } else if url.starts_with("/chapters?") {
            StubResponse::json(serde_json::json!({
                "chapters": [
                    chapter_json(1, "Al-Fatihah", 7),
                    { "id": "bad" },
                    chapter_json(2, "Al-Baqarah", 286)
                ]
            }))
        } else {
            StubResponse::status(404)
        }
    });
    let api = api_for(&server);

    let chapter = quranview::chapter::fetch_chapter(&api, 1).await;
    assert!(chapter.is_loaded());
    assert_eq!(chapter.value().verses_count, 7);
    assert_eq!(chapter.value().revelation_place, RevelationPlace::Meccan);

    let list = quranview::chapter::fetch_chapters(&api).await;
    assert!(list.is_loaded());
    let ids: Vec<u32> = list.value().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn page_loader_returns_chapter_and_verses() {
    let server = StubServer::spawn(|url| {
        if url.starts_with("/chapters/1") {
            StubResponse::json(serde_json::json!({ "chapter": chapter_json(1, "Al-Fatihah", 2) }))
        } else {
            StubResponse::json(serde_json::json!({
                "verses": [verse_json(1, 1), verse_json(1, 2)],
                "pagination": { "next_page": null }
            }))
        }
    });
    let loader =
        ChapterPageLoader::new(api_for(&server)).with_playback(Arc::new(PlaybackManager::new()));
    let before = loader.current_cancel_token();

    match loader.load(1).await {
        PageLoad::Current(page) => {
            assert!(page.chapter.is_loaded());
            assert!(page.verses.is_loaded());
            assert_eq!(page.verses.value().verses.len(), 2);
        }
        PageLoad::Stale => panic!("single load must not be stale"),
    }
    assert!(before.is_cancelled());
    assert!(!loader.current_cancel_token().is_cancelled());
}

#[tokio::test]
async fn newer_navigation_discards_older_load() {
    let server = StubServer::spawn(|url| {
        // Chapter 1 is slow so the second navigation overtakes it.
        if url.contains("/1?") || url.contains("/by_chapter/1?") {
            std::thread::sleep(Duration::from_millis(300));
        }
        let id: u32 = if url.contains("/1?") || url.contains("/by_chapter/1?") { 1 } else { 2 };
        if url.starts_with("/chapters/") {
            StubResponse::json(serde_json::json!({ "chapter": chapter_json(id, "X", 1) }))
        } else {
            let page = query_param(url, "page").unwrap_or("1");
            assert_eq!(page, "1");
            StubResponse::json(serde_json::json!({
                "verses": [verse_json(id, 1)],
                "pagination": { "next_page": null }
            }))
        }
    });
    let loader = Arc::new(ChapterPageLoader::new(api_for(&server)));

    let first = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load(1).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = loader.load(2).await;

    assert!(matches!(first.await.expect("join first load"), PageLoad::Stale));
    match second {
        PageLoad::Current(page) => assert_eq!(page.chapter.value().id, 2),
        PageLoad::Stale => panic!("latest navigation must win"),
    }
}
