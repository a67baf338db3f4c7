// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certwerk-issue: Issuing certificates and checking them afterwards.
//
// The `Downloader` turns a certificate view plus its record into either a PDF
// artifact (programmatic capture) or a print-dialog request (native print),
// reporting every result as a `DownloadOutcome` instead of an error. Token
// verification decodes a scanned token and checks it against the registry.

pub mod clock;
pub mod download;
pub mod facility;
pub mod filename;
pub mod recommend;
pub mod retry;
pub mod verify;

pub use clock::{Clock, FixedClock, SystemClock};
pub use download::{BatchItem, BatchOutcome, DownloadOutcome, Downloader, validate_view};
pub use facility::{PrintFacility, UnavailablePrintFacility};
pub use filename::{artifact_filename, artifact_title};
pub use recommend::{Recommendation, recommend_strategy};
pub use verify::{Verification, VerificationOutcome, verify};
