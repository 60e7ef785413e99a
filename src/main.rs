mod backup;
mod calc;
mod config;
mod curriculum;
mod error;
mod gateway;
mod ipc;
mod logging;
mod store;
mod table;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Workspace opened before the first request. A bad curriculum here stops
/// the process.
const WORKSPACE_ENV: &str = "GRADEBOOKD_WORKSPACE";

fn main() {
    logging::init_logger();

    let mut state = ipc::AppState {
        workspace: None,
        session: None,
    };

    if let Some(path) = std::env::var_os(WORKSPACE_ENV).map(PathBuf::from) {
        match ipc::open_workspace(&path, None, None) {
            Ok(session) => {
                state.workspace = Some(path);
                state.session = Some(session);
            }
            Err(e) => {
                tracing::error!(code = e.code(), error = %e, "cannot open startup workspace");
                std::process::exit(2);
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
