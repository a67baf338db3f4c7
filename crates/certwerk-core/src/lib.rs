// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Certwerk: Core types, error definitions, and configuration shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod lookup;
pub mod types;

pub use config::IssuerConfig;
pub use error::{CertwerkError, ErrorKind};
pub use lookup::RecordLookup;
pub use types::*;
