// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certwerk: vital-records certificate artifacts
//
// Entry point. Initialises logging, parses the command line and runs the
// requested command against the backend services.

mod cli;
mod commands;
mod services;

use std::process::ExitCode;

use certwerk_core::human_errors::humanize_error;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "certwerk starting");

    match commands::run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            let human = humanize_error(&err);
            tracing::error!(error = %err, kind = ?err.kind(), "command failed");
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::from(2)
        }
    }
}
