// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Certwerk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all Certwerk operations.
#[derive(Debug, Error)]
pub enum CertwerkError {
    // -- Verification token --
    #[error("invalid verification payload: {0}")]
    InvalidPayload(String),

    #[error("malformed verification token: {0}")]
    MalformedToken(String),

    // -- Artifact pipeline --
    #[error("token rendering failed: {0}")]
    Render(String),

    #[error("view capture failed: {0}")]
    Capture(String),

    #[error("artifact packaging failed: {0}")]
    Packaging(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    // -- Platform print facility --
    #[error("print facility error: {0}")]
    Print(String),

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Registry backend --
    #[error("registry request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("registry unreachable: {0}")]
    Network(String),

    #[error("unexpected registry response: {0}")]
    Decoding(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CertwerkError {
    /// Stable, serializable name of this error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPayload(_) => ErrorKind::InvalidPayload,
            Self::MalformedToken(_) => ErrorKind::MalformedToken,
            Self::Render(_) => ErrorKind::RenderError,
            Self::Capture(_) => ErrorKind::CaptureError,
            Self::Packaging(_) => ErrorKind::PackagingError,
            Self::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            Self::Print(_) | Self::PlatformUnavailable => ErrorKind::PrintError,
            Self::Api { .. } | Self::Network(_) | Self::Decoding(_) => ErrorKind::RegistryError,
            Self::Database(_) => ErrorKind::StorageError,
            Self::Config(_) => ErrorKind::ConfigError,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::IoError,
        }
    }
}

/// Error categories reported across the download boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidPayload,
    MalformedToken,
    RenderError,
    CaptureError,
    PackagingError,
    IntegrityMismatch,
    PrintError,
    RegistryError,
    StorageError,
    ConfigError,
    IoError,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CertwerkError>;
