use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;
use quranview::cli::{AudioCommand, Command};
use quranview::commands;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = quranview::cli::Cli::parse();
    quranview::logging::init(quranview::logging::directive_for_verbosity(cli.global.verbose))
        .context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let mut config = quranview::config::Config::from_env().context("load config")?;
    cli.global.apply(&mut config).context("apply cli overrides")?;
    let config = Arc::new(config);

    match cli.command {
        Command::Chapters => commands::chapters(config).await.context("chapters")?,
        Command::Chapter(args) => commands::chapter(config, args).await.context("chapter")?,
        Command::Verses(args) => commands::verses(config, args).await.context("verses")?,
        Command::Audio {
            command: AudioCommand::Candidates(args),
        } => commands::audio_candidates(config, args).context("audio candidates")?,
        Command::Audio {
            command: AudioCommand::Resolve(args),
        } => commands::audio_resolve(config, args)
            .await
            .context("audio resolve")?,
        Command::Audio {
            command: AudioCommand::ClearMemo,
        } => commands::audio_clear_memo(config)
            .await
            .context("audio clear-memo")?,
    }

    Ok(())
}
