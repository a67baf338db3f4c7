// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture retry policy.
//
// A failed capture is retried at most once, immediately, at reduced fidelity.
// Only transient failures qualify: a view with no area or a bad payload will
// fail the same way however often it is tried, and so will text with no font
// to paint it.

use certwerk_core::error::CertwerkError;
use certwerk_core::types::ErrorClass;
use certwerk_document::raster::{is_missing_font, is_zero_area};
use tracing::{info, warn};

/// Capture attempts allowed in total: the first plus one retry.
pub const MAX_CAPTURE_ATTEMPTS: u32 = 2;

/// What to do after a failed capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again at reduced fidelity.
    RetryReduced,
    /// Report the failure.
    GiveUp(ErrorClass),
    /// The retry has already been used.
    Exhausted,
}

/// Classify a capture-stage error.
pub fn classify_error(err: &CertwerkError) -> ErrorClass {
    match err {
        CertwerkError::Capture(_) if is_zero_area(err) || is_missing_font(err) => {
            ErrorClass::Permanent
        }
        // Backend hiccups: canvas limits, unsupported colours, task failures.
        CertwerkError::Capture(_) => ErrorClass::Transient,
        CertwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                ErrorClass::Permanent
            }
            _ => ErrorClass::Transient,
        },
        CertwerkError::InvalidPayload(_)
        | CertwerkError::MalformedToken(_)
        | CertwerkError::Render(_)
        | CertwerkError::Packaging(_)
        | CertwerkError::IntegrityMismatch { .. }
        | CertwerkError::Print(_)
        | CertwerkError::PlatformUnavailable
        | CertwerkError::Api { .. }
        | CertwerkError::Network(_)
        | CertwerkError::Decoding(_)
        | CertwerkError::Database(_)
        | CertwerkError::Config(_)
        | CertwerkError::Serialization(_) => ErrorClass::Permanent,
    }
}

/// Decide after attempt number `attempt` (1-based) failed with `err`.
pub fn should_retry(err: &CertwerkError, attempt: u32) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!("permanent capture failure, not retrying");
            RetryDecision::GiveUp(ErrorClass::Permanent)
        }
        ErrorClass::Transient if attempt >= MAX_CAPTURE_ATTEMPTS => {
            warn!(attempt, "reduced-fidelity retry also failed");
            RetryDecision::Exhausted
        }
        ErrorClass::Transient => RetryDecision::RetryReduced,
    }
}
