//! typed-wallet - a wallet-style CLI assembled entirely from typed command
//! schemas.
//!
//! Logs go to stderr (filtered by `RUST_LOG`); stdout carries only command
//! output.

mod commands;
mod config;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match commands::cli() {
        Ok(cli) => cli.run(),
        Err(err) => {
            eprintln!("Error: invalid command definition: {err}");
            ExitCode::FAILURE
        }
    }
}
