mod db;
mod extract;
mod ipc;
mod model;
mod source;
mod walker;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

const WORKSPACE_ENV: &str = "GRADESD_WORKSPACE";

fn main() {
    // stdout carries the protocol; logs go to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut state = ipc::AppState::new();
    if let Some(ws) = std::env::var_os(WORKSPACE_ENV).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(ws);
        if let Err(e) = ipc::select_workspace(&mut state, &path) {
            log::warn!("{} {}: {e:#}", WORKSPACE_ENV, path.to_string_lossy());
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::error!("stdin closed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to reply to.
                log::warn!("bad request line: {}", e);
                serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                })
            }
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
