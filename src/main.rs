use std::io::{self, BufRead, Write};

use gradebookd::config::Config;
use gradebookd::{ipc, logging};

fn main() {
    let config = Config::from_env();
    if let Err(e) = logging::init_tracing(&config) {
        eprintln!("gradebookd: logging disabled: {e}");
    }
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradebookd started");

    let mut state = ipc::AppState::new(config);

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
                // Can't reply without id; answer with a bare error line.
                tracing::warn!(error = %e, "unparseable request");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed; exiting");
}
