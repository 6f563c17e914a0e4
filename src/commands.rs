use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use crate::api::QuranApi;
use crate::audio::{AudioAvailabilityMemo, AudioResolver, AudioSource, HttpProbeElement, Resolution};
use crate::cli::{AudioSourceArgs, ChapterArgs, VersesArgs};
use crate::config::Config;
use crate::error::{FetchStatus, Fetched};
use crate::formats::{ChapterSummary, VerseKey};

#[derive(serde::Serialize)]
struct ChapterOutput<'a> {
    status: FetchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    chapter: &'a ChapterSummary,
}

pub async fn chapters(config: Arc<Config>) -> anyhow::Result<()> {
    let api = QuranApi::new(config)?;
    let fetched = crate::chapter::fetch_chapters(&api).await;
    if let Some(reason) = fetched.reason() {
        anyhow::bail!("chapter list unavailable: {reason}");
    }

    let mut out = std::io::stdout().lock();
    for chapter in fetched.value() {
        serde_json::to_writer(&mut out, chapter).context("write chapter json")?;
        out.write_all(b"\n").context("write newline")?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}

pub async fn chapter(config: Arc<Config>, args: ChapterArgs) -> anyhow::Result<()> {
    let api = QuranApi::new(config)?;
    let fetched = crate::chapter::fetch_chapter(&api, args.id).await;

    let output = ChapterOutput {
        status: fetched.status(),
        reason: fetched.reason().map(ToString::to_string),
        chapter: fetched.value(),
    };
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, &output).context("write chapter json")?;
    out.write_all(b"\n").context("write newline")?;
    Ok(())
}

pub async fn verses(config: Arc<Config>, args: VersesArgs) -> anyhow::Result<()> {
    let api = QuranApi::new(config)?;
    let fetched = crate::verses::fetch_verses(&api, args.chapter).await;
    let batch = match fetched {
        Fetched::Loaded(batch) => batch,
        Fetched::Fallback { reason, .. } => {
            anyhow::bail!("verses for chapter {} unavailable: {reason}", args.chapter)
        }
    };
    if batch.truncated {
        tracing::warn!(
            chapter = args.chapter,
            pages = batch.pages,
            "verse list is incomplete"
        );
    }

    let mut out = std::io::stdout().lock();
    for verse in &batch.verses {
        serde_json::to_writer(&mut out, verse).context("write verse json")?;
        out.write_all(b"\n").context("write newline")?;
    }
    out.flush().context("flush stdout")?;
    Ok(())
}

pub fn audio_candidates(config: Arc<Config>, args: AudioSourceArgs) -> anyhow::Result<()> {
    let source = audio_source(&args)?;
    let set = crate::audio::AudioCandidateSet::build(&source, &config.audio_templates);
    let mut out = std::io::stdout().lock();
    for url in set.urls() {
        writeln!(out, "{url}").context("write candidate")?;
    }
    Ok(())
}

pub async fn audio_resolve(config: Arc<Config>, args: AudioSourceArgs) -> anyhow::Result<()> {
    let source = audio_source(&args)?;
    let memo = AudioAvailabilityMemo::open_file(&config.memo_path).await?;
    let resolver = AudioResolver::new(config.audio_templates.clone(), config.load_timeout, memo);
    let mut element = HttpProbeElement::new(config.load_timeout)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let resolution = resolver.resolve(&mut element, &source, &cancel).await;
    match resolution {
        Resolution::Ready(url) => println!("{url}"),
        Resolution::Unavailable => println!("unavailable"),
        Resolution::Cancelled => anyhow::bail!("audio resolution cancelled"),
    }
    Ok(())
}

pub async fn audio_clear_memo(config: Arc<Config>) -> anyhow::Result<()> {
    let mut memo = AudioAvailabilityMemo::open_file(&config.memo_path).await?;
    let removed = memo.clear().await?;
    tracing::info!(removed, path = %config.memo_path.display(), "cleared audio memo");
    println!("cleared {removed}");
    Ok(())
}

fn audio_source(args: &AudioSourceArgs) -> anyhow::Result<AudioSource> {
    match (args.chapter, args.verse, args.url.as_deref()) {
        (Some(chapter), Some(verse), _) => {
            if chapter == 0 || verse == 0 {
                anyhow::bail!("--chapter and --verse are 1-based");
            }
            Ok(AudioSource::Verse(VerseKey::new(chapter, verse)))
        }
        (_, _, Some(url)) if !url.trim().is_empty() => Ok(AudioSource::Url(url.trim().to_owned())),
        _ => anyhow::bail!("pass --chapter and --verse, or --url"),
    }
}
