//! Vidmarks host: JSON-RPC over stdin/stdout for the browser extension.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"bookmarks.add", "params":{"videoId":"...","time":42}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}

use std::io::Write;
use std::process::ExitCode;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{error, info, warn};

use vidmarks::app::App;
use vidmarks::logging;
use vidmarks::rpc_handler::{handle_method, RequestBudget};
use vidmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

fn emit(value: &Value) {
    let mut out = std::io::stdout().lock();
    if writeln!(out, "{}", value).and_then(|_| out.flush()).is_err() {
        error!("stdout closed");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut settings_engine = SettingsEngine::new(std::env::var("VIDMARKS_CONFIG").ok());
    let loaded = settings_engine.load();
    let settings = settings_engine.get_settings().clone();
    logging::init(&settings.logging.filter);
    if let Err(e) = loaded {
        warn!(error = %e, "settings unreadable, using defaults");
    }

    let db_path = App::default_db_path(&settings);
    if let Some(parent) = db_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!(dir = %parent.display(), error = %e, "cannot create data directory");
            return ExitCode::FAILURE;
        }
    }
    let app = match App::new(&db_path.to_string_lossy(), settings_engine) {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "failed to initialize");
            return ExitCode::FAILURE;
        }
    };

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    info!("host ready");

    let mut budget = RequestBudget::new(&settings.rpc, Instant::now());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        if !budget.try_spend(Instant::now()) {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    info!("stdin closed, shutting down");
    ExitCode::SUCCESS
}
