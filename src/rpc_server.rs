//! Passdrop RPC server: JSON-RPC over stdin/stdout.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"share.access", "params":{"token":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"...", "code":"..."}
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use passdrop::app::App;
use passdrop::platform;
use passdrop::rpc_handler::handle_method;
use passdrop::services::settings_engine::{SettingsEngine, SettingsEngineTrait};

/// Fixed-window rate limiter over all methods.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn emit(response: &Value) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", response)?;
    out.flush()
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut settings_engine = SettingsEngine::new(platform::config_file_override());
    // Only used to pick the log filter before tracing is up; App reloads it.
    let log_filter = settings_engine
        .load()
        .map(|s| s.logging.filter)
        .unwrap_or_else(|_| "passdrop=info".to_string());
    init_tracing(&log_filter);

    let settings = settings_engine.get_settings().clone();
    let data_dir = platform::get_data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join(&settings.storage.database_file);
    let db_path = db_path.to_str().ok_or("database path is not valid UTF-8")?;

    let app = Mutex::new(App::with_settings_engine(db_path, settings_engine)?);

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}))?;
    info!(db_path, "rpc server ready");

    let mut rate_limiter = RateLimiter::new(200);

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e), "code": "parse_error"}))?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            warn!("rate limit exceeded");
            emit(&json!({"id": id, "error": "rate limit exceeded", "code": "rate_limited"}))?;
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&app, method, &params) {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => {
                let mut body = err.to_json();
                body["id"] = id;
                body
            }
        };
        emit(&response)?;
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "passdrop-rpc failed");
            eprintln!("passdrop-rpc: {}", e);
            ExitCode::FAILURE
        }
    }
}
