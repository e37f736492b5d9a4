//! Headless wordscope host.
//!
//! Reads one query per line from stdin and writes engine updates as
//! newline-delimited JSON to stdout. All diagnostic output goes to stderr.
//!
//! ```text
//! wordscope-host [--config <path>]
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use tokio::io::BufReader;
use wordscope::AppConfig;

fn config_path() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    match (args.next().as_deref(), args.next(), args.next()) {
        (None, _, _) => Ok(AppConfig::default_config_path()),
        (Some("--config"), Some(path), None) => Ok(PathBuf::from(path)),
        _ => bail!("usage: wordscope-host [--config <path>]"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path()?;
    let config = AppConfig::load_or_default(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    wordscope::logging::init(&config.logging);

    tracing::info!(config = %path.display(), "wordscope-host starting");

    let input = BufReader::new(tokio::io::stdin());
    wordscope::host::run(config, input, tokio::io::stdout())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "wordscope-host exited with error");
            anyhow::anyhow!("wordscope-host failed: {e}")
        })?;

    Ok(())
}
