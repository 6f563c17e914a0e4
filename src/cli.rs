use clap::{Args, Parser, Subcommand};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase log detail (-v debug, -vv trace). `RUST_LOG` overrides it.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// API base URL (default: QURANVIEW_API_BASE_URL or the public API).
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Path of the audio availability memo file.
    #[arg(long, global = true)]
    pub memo_path: Option<String>,

    /// Per-candidate audio load timeout.
    #[arg(long, global = true)]
    pub load_timeout_ms: Option<u64>,
}

impl GlobalArgs {
    /// Applies command-line overrides on top of `config`.
    pub fn apply(&self, config: &mut Config) -> anyhow::Result<()> {
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(path) = &self.memo_path {
            config.memo_path = path.into();
        }
        if let Some(ms) = self.load_timeout_ms {
            config.load_timeout = std::time::Duration::from_millis(ms);
        }
        config.validate()
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List all chapters.
    Chapters,
    /// Show one chapter summary.
    Chapter(ChapterArgs),
    /// Dump a chapter's normalized verses as JSON lines.
    Verses(VersesArgs),
    Audio {
        #[command(subcommand)]
        command: AudioCommand,
    },
}

#[derive(Debug, Args)]
pub struct ChapterArgs {
    #[arg(long)]
    pub id: u32,
}

#[derive(Debug, Args)]
pub struct VersesArgs {
    #[arg(long)]
    pub chapter: u32,
}

#[derive(Debug, Subcommand)]
pub enum AudioCommand {
    /// Print candidate URLs in the order they would be tried.
    Candidates(AudioSourceArgs),
    /// Probe candidates and print the first playable URL.
    Resolve(AudioSourceArgs),
    /// Forget every memoized unavailable source.
    ClearMemo,
}

#[derive(Debug, Args)]
pub struct AudioSourceArgs {
    #[arg(long, requires = "verse", conflicts_with = "url")]
    pub chapter: Option<u32>,

    #[arg(long, requires = "chapter")]
    pub verse: Option<u32>,

    /// Raw audio URL hint.
    #[arg(long, required_unless_present = "chapter")]
    pub url: Option<String>,
}
