mod admission;
mod backend;
mod calendar;
mod config;
mod db;
mod ipc;
mod student;
mod timetable;

use std::io::{self, BufRead, Write};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    // stdout carries the IPC stream, so logs go to stderr.
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let config = config::ClientConfig::from_env();
    let backend = backend::HttpBackend::new(
        &config.backend_url,
        Duration::from_secs(config.timeout_secs),
    )?;
    log::info!(
        "timetabled {} starting, backend {}",
        env!("CARGO_PKG_VERSION"),
        config.backend_url
    );
    let mut state = ipc::AppState::new(config, Box::new(backend));

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
                // No id to echo back.
                let _ = writeln!(stdout, "{}", ipc::err("", "bad_json", e.to_string(), None));
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
    log::info!("stdin closed, exiting");
    Ok(())
}
