//! Headless line-oriented host.
//!
//! Each stdin line is an input change; `:select <n>` picks the n-th hit
//! (1-based) of the latest list and `:quit` closes. Every engine update is
//! written to stdout as one JSON line:
//!
//! ```text
//! {"session":3,"signal":"results","hits":[{"score":1.0,"text":"apple","help":"Autocomplete (1.0000)"}]}
//! {"session":3,"signal":"busy","on":true}
//! {"session":4,"signal":"selected","hit":{...}}
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use wordscope_search::{
    Aggregator, Hit, LookupProvider, ProviderRegistry, SearchProvider, Signal, Update,
};

use crate::config::AppConfig;
use crate::datamuse::DatamuseClient;
use crate::error::{AppError, Result};

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The input text changed.
    Input(String),
    /// Choose the n-th hit (1-based) of the latest list.
    Select(usize),
    Quit,
}

impl Command {
    /// Parse one line, without its line terminator.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Protocol`] for a malformed `:select` or an
    /// unknown `:` command. Use `::text` to search for text starting with `:`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Self::Input(line.to_owned()));
        };
        if rest.starts_with(':') {
            return Ok(Self::Input(rest.to_owned()));
        }
        let mut parts = rest.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("quit"), None, None) => Ok(Self::Quit),
            (Some("select"), Some(n), None) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Self::Select(n)),
                _ => Err(AppError::Protocol(format!("invalid hit number: {n}"))),
            },
            _ => Err(AppError::Protocol(format!("unknown command: {line}"))),
        }
    }
}

/// Wire view of a [`Hit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitView {
    pub score: f64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl From<&Hit> for HitView {
    fn from(hit: &Hit) -> Self {
        Self {
            score: hit.score(),
            text: hit.text().to_owned(),
            help: hit.help().map(str::to_owned),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
enum SignalView {
    Results { hits: Vec<HitView> },
    Busy { on: bool },
    NoMatches { on: bool },
    Selected { hit: HitView },
}

#[derive(Debug, Serialize)]
struct UpdateView {
    session: u64,
    #[serde(flatten)]
    signal: SignalView,
}

/// Render one update as a JSON line (without the newline).
///
/// # Errors
///
/// Returns [`AppError::Protocol`] if serialization fails.
pub fn render(update: &Update) -> Result<String> {
    let signal = match &update.signal {
        Signal::Results(hits) => SignalView::Results {
            hits: hits.iter().map(HitView::from).collect(),
        },
        Signal::Busy(on) => SignalView::Busy { on: *on },
        Signal::NoMatches(on) => SignalView::NoMatches { on: *on },
        Signal::Selected(hit) => SignalView::Selected {
            hit: HitView::from(hit),
        },
    };
    let view = UpdateView {
        session: update.session.get(),
        signal,
    };
    serde_json::to_string(&view)
        .map_err(|e| AppError::Protocol(format!("failed to serialize update: {e}")))
}

/// Register the providers enabled in `config`.
///
/// # Errors
///
/// Returns an error if a provider's configuration is invalid.
pub fn build_registry(config: &AppConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    if config.datamuse.enabled {
        let client = DatamuseClient::new(config.datamuse.clone())?;
        let provider = LookupProvider::new("datamuse", Arc::new(client), config.provider.clone())?;
        registry.register("datamuse", move || {
            Arc::new(provider.clone()) as Arc<dyn SearchProvider>
        })?;
    } else {
        tracing::warn!("datamuse provider disabled; searches will find nothing");
    }
    Ok(registry)
}

/// Drive the engine from `input` lines and write updates to `output` until
/// `:quit` or end of input.
///
/// At end of input the running session is allowed to settle first, so
/// piped queries still produce their results.
///
/// # Errors
///
/// Returns an error if the config is invalid or `input`/`output` fail.
pub async fn run<R, W>(config: AppConfig, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    config.validate()?;
    let registry = build_registry(&config)?;
    tracing::info!(providers = ?registry.names(), "wordscope host starting");
    let (mut aggregator, mut updates) = Aggregator::from_registry(&registry, config.engine)?;

    let mut lines = input.lines();
    let mut latest: Vec<Hit> = Vec::new();

    let quit = loop {
        tokio::select! {
            Some(update) = updates.recv() => {
                write_update(&mut output, &update, &mut latest).await?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break false };
                match Command::parse(&line) {
                    Ok(Command::Input(text)) => {
                        aggregator.input_changed(&text);
                    }
                    Ok(Command::Select(n)) => match latest.get(n - 1).cloned() {
                        Some(hit) => {
                            aggregator.select(hit);
                        }
                        None => tracing::warn!(n, available = latest.len(), "no such hit"),
                    },
                    Ok(Command::Quit) => break true,
                    Err(e) => tracing::warn!(error = %e, "ignoring line"),
                }
            }
        }
    };

    if !quit {
        tracing::debug!("input closed; waiting for the running session");
        aggregator.wait_settled().await;
    }
    while let Ok(update) = updates.try_recv() {
        write_update(&mut output, &update, &mut latest).await?;
    }
    aggregator.close().await;
    output.flush().await?;
    tracing::info!("wordscope host shut down cleanly");
    Ok(())
}

async fn write_update<W>(output: &mut W, update: &Update, latest: &mut Vec<Hit>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if let Signal::Results(hits) = &update.signal {
        latest.clone_from(hits);
    }
    let json = render(update)?;
    output.write_all(json.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(())
}
