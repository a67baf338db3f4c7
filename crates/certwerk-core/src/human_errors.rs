// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for registry clerks and citizens.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The download orchestrator surfaces `message` verbatim.

use crate::error::CertwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Temporary problem; trying again may work.
    Transient,
    /// The user must do something (pick another method, fix the record).
    ActionRequired,
    /// Cannot be fixed by retrying (bad data, missing platform feature).
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether a manual retry is worth offering.
    pub retriable: bool,
    /// Severity level (drives icon/colour in UI).
    pub severity: Severity,
}

impl HumanError {
    /// Message and suggestion as a single line for notifications.
    pub fn one_line(&self) -> String {
        format!("{} {}", self.message, self.suggestion)
    }
}

/// Convert a `CertwerkError` into a `HumanError`.
pub fn humanize_error(err: &CertwerkError) -> HumanError {
    match err {
        // -- Verification token --
        CertwerkError::InvalidPayload(detail) => HumanError {
            message: "This certificate can't carry a verification code.".into(),
            suggestion: format!(
                "Check that the record has a certificate number and a registry id, and that the certificate layout has room for the QR code. ({detail})"
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CertwerkError::MalformedToken(_) => HumanError {
            message: "This verification code couldn't be read.".into(),
            suggestion: "Scan the QR code again, making sure the whole code is visible and in focus.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        // -- Artifact pipeline --
        CertwerkError::Render(_) => HumanError {
            message: "The verification QR code couldn't be drawn.".into(),
            suggestion: "Try a larger QR code size in Settings.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        CertwerkError::Capture(detail) if detail.starts_with("no font loaded") => HumanError {
            message: "The certificate text couldn't be drawn.".into(),
            suggestion: "Choose a font for certificate text and try again, or use the Print method.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CertwerkError::Capture(_) => HumanError {
            message: "Failed to capture the certificate.".into(),
            suggestion: "Please try using the Print method instead.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        CertwerkError::Packaging(_) => HumanError {
            message: "The PDF file couldn't be created.".into(),
            suggestion: "Make sure the certificate is fully shown on screen, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CertwerkError::IntegrityMismatch { .. } => HumanError {
            message: "This file has been changed since it was issued.".into(),
            suggestion: "Download the certificate again from the registry.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Platform print --
        CertwerkError::Print(detail) => HumanError {
            message: "The print dialog couldn't be opened.".into(),
            suggestion: format!("Try the Download PDF method instead. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        CertwerkError::PlatformUnavailable => HumanError {
            message: "Printing isn't available here.".into(),
            suggestion: "Use the Download PDF method and print the file afterwards.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        // -- Registry --
        CertwerkError::Api { status, message } => humanize_api_error(*status, message),

        CertwerkError::Network(_) => HumanError {
            message: "Network error.".into(),
            suggestion: "Please check your internet connection and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CertwerkError::Decoding(_) => HumanError {
            message: "The registry sent an answer we didn't understand.".into(),
            suggestion: "Try again later. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Storage --
        CertwerkError::Database(_) => HumanError {
            message: "The audit trail couldn't be updated.".into(),
            suggestion: "Try again. If this keeps happening, check the disk is not full.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CertwerkError::Config(detail) => HumanError {
            message: "The settings are not valid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CertwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The file couldn't be saved there.".into(),
                    suggestion: "Choose a folder you are allowed to write to.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        CertwerkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Map registry HTTP statuses to the messages clerks already know.
fn humanize_api_error(status: u16, detail: &str) -> HumanError {
    match status {
        401 => HumanError {
            message: "Session expired.".into(),
            suggestion: "Please login again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        403 => HumanError {
            message: "You do not have permission to perform this action.".into(),
            suggestion: "Ask an administrator for access to this record type.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        404 => HumanError {
            message: "The requested record was not found.".into(),
            suggestion: "Check the record type and identifier.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
        500..=599 => HumanError {
            message: "Server error.".into(),
            suggestion: "Please try again later.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
        _ => HumanError {
            message: "An error occurred.".into(),
            suggestion: format!("Please try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
