// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use certwerk_core::types::{RecordType, Strategy};
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "certwerk", version, about = "Vital-records certificate artifacts")]
pub struct Cli {
    /// Data directory holding config.json and audit.db
    #[arg(long, global = true, env = "CERTWERK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Produce certificate artifacts for one or more records
    Issue(IssueArgs),

    /// Encode or decode verification tokens
    #[command(subcommand)]
    Token(TokenCommands),

    /// Render a verification token as a QR code PNG
    Qr {
        /// Token text
        #[arg(short, long)]
        token: String,

        /// Edge length in pixels (defaults to the configured size)
        #[arg(short, long)]
        size: Option<u32>,

        /// Output file
        #[arg(short, long, default_value = "token.png")]
        out: PathBuf,
    },

    /// Check a scanned token against the registry
    Verify {
        /// Token text
        #[arg(short, long)]
        token: String,

        /// Registry base URL (defaults to the configured one)
        #[arg(long)]
        registry: Option<String>,
    },

    /// List audit trail entries, or check an artifact file against them
    Audit {
        /// Only entries for this certificate number
        #[arg(short, long)]
        certificate: Option<String>,

        /// Artifact file to check against the recorded hashes
        #[arg(short, long, requires = "certificate")]
        artifact: Option<PathBuf>,

        /// Number of recent entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Record JSON files (registry record bodies)
    #[arg(short, long = "record", conflicts_with = "from_registry")]
    pub records: Vec<PathBuf>,

    /// Fetch the record from the registry instead of a file
    #[arg(long, requires_all = ["record_type", "id"])]
    pub from_registry: bool,

    /// Record type: birth, death, marriage or divorce
    #[arg(short = 't', long = "type")]
    pub record_type: Option<RecordType>,

    /// Registry id of the record
    #[arg(long)]
    pub id: Option<String>,

    /// Registry base URL (defaults to the configured one)
    #[arg(long)]
    pub registry: Option<String>,

    /// programmatic_capture, auto or native_print. native_print needs a print
    /// facility supplied by an embedding application; this command has none
    /// and reports a print error for it.
    #[arg(short, long, default_value = "auto")]
    pub strategy: Strategy,

    /// TrueType/OpenType font used to paint certificate text
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Without --font, issue layout-only artifacts with the text left out
    /// instead of failing
    #[arg(long)]
    pub layout_only: bool,

    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Build a token for a certificate
    Encode {
        /// Certificate number
        #[arg(short, long)]
        number: String,

        /// Record type
        #[arg(short = 't', long = "type")]
        record_type: RecordType,

        /// Registry id of the record
        #[arg(long)]
        id: String,

        /// Issue date (RFC 3339, HTTP date or YYYY-MM-DD); defaults to now
        #[arg(long)]
        issued: Option<String>,
    },

    /// Show the fields carried by a token
    Decode {
        /// Token text
        #[arg(short, long)]
        token: String,
    },
}
