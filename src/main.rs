//! # youtube-music-control
//!
//! Command-line remote control for the th-ch/youtube-music desktop player.
//! Talks to the player's local HTTP control API: authenticates, reads the
//! server's self-description from `/doc`, and sends one request to the chosen
//! endpoint, printing the JSON response.
//!
//! ## Architecture
//!
//! ```text
//! main.rs     — entry point, tracing setup, exit codes
//! config.rs   — clap arguments and validated ClientConfig
//! client.rs   — HTTP client for /doc, /auth and API endpoints
//! catalog.rs  — endpoint catalog from the discovery document (pure data)
//! request.rs  — method resolution and schema-guided body shaping (pure)
//! app.rs      — the run: discover → shape → authenticate → dispatch
//! ```
//!
//! ## Examples
//!
//! ```text
//! youtube-music-control --list
//! youtube-music-control song
//! youtube-music-control volume 75          # sends {"volume": 75}
//! youtube-music-control --delete queue/3
//! ```
//!
//! ## Exit codes
//!
//! - `0` — success, or the discovery document was unavailable but the run went on
//! - `2` — usage error or a data argument that can't be shaped into a body
//! - `3` — authentication or the request itself failed

mod app;
mod catalog;
mod client;
mod config;
mod request;

use std::io::{self, Write};

use clap::{CommandFactory, Parser};
use client::ControlClient;
use config::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over --log-level
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(io::stderr)
        .without_time()
        .with_target(false)
        .init();

    if !cli.list && cli.endpoint.is_none() {
        if let Err(e) = Cli::command().print_help() {
            let e = app::RunError::Output(e);
            eprintln!("youtube-music-control: {}", e);
            std::process::exit(e.exit_code());
        }
        return;
    }

    let config = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("youtube-music-control: configuration error: {}", e);
            std::process::exit(app::EXIT_USAGE);
        }
    };

    let client = match ControlClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("youtube-music-control: {}", e);
            std::process::exit(1);
        }
    };

    tracing::debug!(server = %config.server, api = %config.api, "client ready");

    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let result = app::run(&cli, &client, &mut out, &mut err).await;
    let _ = out.flush();

    if let Err(e) = result {
        let _ = writeln!(err, "{}", e);
        drop(err);
        std::process::exit(e.exit_code());
    }
}
