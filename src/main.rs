mod attendance;
mod backup;
mod calc;
mod config;
mod db;
mod export;
mod ipc;
mod periods;
mod service;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_logging();
    let config = config::Config::from_env();

    let mut state = ipc::AppState::default();
    if let Some(path) = config.workspace {
        match db::Store::open(&path).await {
            Ok(store) => {
                state.workspace = Some(path);
                state.store = Some(store);
            }
            Err(e) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %e, "startup workspace not opened");
            }
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    // One request per line, answered in order.
    loop {
        let line = match lines.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req).await,
            Err(e) => {
                // Can't echo an id we could not parse.
                let mut resp = ipc::err("", "bad_json", e.to_string(), None);
                resp["id"] = json!(null);
                resp
            }
        };
        let text = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        if let Err(e) = write_line(&mut stdout, &text).await {
            tracing::error!(error = %e, "stdout write failed");
            break;
        }
    }

    if let Some(store) = state.store.take() {
        store.close();
    }
}

async fn write_line(stdout: &mut tokio::io::Stdout, text: &str) -> std::io::Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

/// Logs go to stderr; stdout carries the response stream.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
