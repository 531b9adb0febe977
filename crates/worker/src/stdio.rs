//! Stdio host binding: newline-delimited JSON events in, outcomes out.
//!
//! Logging goes to stderr so this protocol stream stays clean. One line in,
//! one outcome line out, with any pending host signals written first;
//! events are processed strictly in order, and an event's outcome is not
//! written until its side effects have settled. Response bodies are
//! base64-encoded on the wire.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use url::Url;

use rmnnt_core::cache::{CacheStore, CachedResponse};
use rmnnt_core::manifest::resolve_url;
use rmnnt_core::{Network, Request, RequestMode};

use crate::interceptor::{FetchOutcome, ResponseSource};
use crate::runtime::{EventOutcome, HostSignal, WorkerEvent, WorkerRuntime};
use crate::state::WorkerState;

/// An incoming host event line.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WireEvent {
    Install,
    Activate,
    Fetch { request: WireRequest },
}

/// A fetch request as the host writes it. The URL may be relative to the
/// deployment scope.
#[derive(Debug, Deserialize)]
pub struct WireRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// A response on the wire.
#[derive(Debug, Serialize)]
pub struct WireResponse {
    pub url: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<serde_json::Value>,
    pub body_base64: String,
    pub fetched_at: String,
}

impl From<CachedResponse> for WireResponse {
    fn from(response: CachedResponse) -> Self {
        Self {
            url: response.url,
            status: response.status,
            content_type: response.content_type,
            headers: response
                .headers_json
                .as_deref()
                .and_then(|json| serde_json::from_str(json).ok()),
            body_base64: BASE64.encode(&response.body),
            fetched_at: response.fetched_at,
        }
    }
}

/// Per-generation sweep report on the wire.
#[derive(Debug, Serialize)]
pub struct WireSweep {
    pub generation: String,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An outgoing line.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Signal { signal: &'static str },
    InstallOk { generation: String, assets: usize },
    InstallError { error: String },
    ActivateOk { swept: Vec<WireSweep> },
    ActivateError { error: String },
    FetchBypass,
    FetchRespond { source: ResponseSource, response: WireResponse },
    FetchUnreachable,
    Ignored { event: &'static str, state: WorkerState },
    ProtocolError { error: String },
}

impl From<EventOutcome> for WireMessage {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Installed(report) => {
                WireMessage::InstallOk { generation: report.generation, assets: report.assets }
            }
            EventOutcome::InstallFailed(e) => WireMessage::InstallError { error: e.to_string() },
            EventOutcome::Activated(outcomes) => WireMessage::ActivateOk {
                swept: outcomes
                    .into_iter()
                    .map(|o| match o.result {
                        Ok(deleted) => WireSweep { generation: o.generation, deleted, error: None },
                        Err(e) => WireSweep { generation: o.generation, deleted: false, error: Some(e.to_string()) },
                    })
                    .collect(),
            },
            EventOutcome::ActivateFailed(e) => WireMessage::ActivateError { error: e.to_string() },
            EventOutcome::Fetch(FetchOutcome::Bypass) => WireMessage::FetchBypass,
            EventOutcome::Fetch(FetchOutcome::Respond { response, source }) => {
                WireMessage::FetchRespond { source, response: response.into() }
            }
            EventOutcome::Fetch(FetchOutcome::Unreachable) => WireMessage::FetchUnreachable,
            EventOutcome::Ignored { event, state } => WireMessage::Ignored { event, state },
        }
    }
}

fn parse_line(line: &str, scope: &Url) -> Result<WorkerEvent, String> {
    let event: WireEvent = serde_json::from_str(line).map_err(|e| e.to_string())?;
    match event {
        WireEvent::Install => Ok(WorkerEvent::Install),
        WireEvent::Activate => Ok(WorkerEvent::Activate),
        WireEvent::Fetch { request } => {
            let url = resolve_url(scope, &request.url).map_err(|e| e.to_string())?;
            Ok(WorkerEvent::Fetch(Request {
                method: request.method.to_ascii_uppercase(),
                url,
                mode: request.mode,
                accept: request.accept,
            }))
        }
    }
}

/// Drive the runtime over a line-oriented transport until EOF.
pub async fn serve<S, N, R, W>(
    mut runtime: WorkerRuntime<S, N>, mut signals: mpsc::UnboundedReceiver<HostSignal>, scope: Url, reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    S: CacheStore + 'static,
    N: Network + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_line(&line, &scope) {
            Ok(event) => WireMessage::from(runtime.handle(event).await),
            Err(error) => {
                tracing::warn!(error = %error, "malformed event line");
                WireMessage::ProtocolError { error }
            }
        };

        // Signals raised while handling the event precede its outcome.
        while let Ok(HostSignal::SkipWaiting) = signals.try_recv() {
            write_line(&mut writer, &WireMessage::Signal { signal: "skip_waiting" }).await?;
        }

        write_line(&mut writer, &message).await?;
    }

    Ok(())
}

/// Serve on this process's stdin/stdout.
pub async fn run<S, N>(
    runtime: WorkerRuntime<S, N>, signals: mpsc::UnboundedReceiver<HostSignal>, scope: Url,
) -> anyhow::Result<()>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    serve(runtime, signals, scope, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, message: &WireMessage) -> anyhow::Result<()> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
