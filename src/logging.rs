use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "info";

/// Filter for `-v` / `-vv`. Only this crate gets louder; the HTTP stack stays
/// at `info` so probe traffic does not drown the output.
pub fn directive_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_DIRECTIVE,
        1 => "info,quranview=debug",
        _ => "info,quranview=trace",
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `default_directive`.
pub fn init(default_directive: &str) -> anyhow::Result<()> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_directive)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn build_filter(env: Option<&str>, default_directive: &str) -> anyhow::Result<EnvFilter> {
    match env.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => EnvFilter::try_new(value).with_context(|| format!("parse RUST_LOG {value:?}")),
        None => EnvFilter::try_new(default_directive)
            .with_context(|| format!("build log filter from {default_directive:?}")),
    }
}
