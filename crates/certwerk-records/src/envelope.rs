// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Validated response envelope.
//
// The registry answers with a bare JSON body on success and `{"error": "..."}`
// on failure. Anything else on a 2xx status is a decoding error; non-2xx
// responses without an error body (gateway HTML pages, empty bodies) still
// become a `Failure` carrying the status.

use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::types::RecordType;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of one registry call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Success(T),
    Failure { status: u16, message: String },
}

impl<T: DeserializeOwned> ApiResponse<T> {
    /// Interpret a raw status and body.
    pub fn from_parts(status: u16, body: &[u8]) -> Result<Self> {
        let parsed: Option<Value> = serde_json::from_slice(body).ok();

        if let Some(message) = parsed.as_ref().and_then(error_message) {
            return Ok(Self::Failure { status, message });
        }

        if !(200..300).contains(&status) {
            return Ok(Self::Failure {
                status,
                message: fallback_message(status),
            });
        }

        let value = parsed.ok_or_else(|| {
            CertwerkError::Decoding(format!("{status} response body is not JSON"))
        })?;
        serde_json::from_value(value)
            .map(Self::Success)
            .map_err(|err| CertwerkError::Decoding(format!("unexpected response shape: {err}")))
    }
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Turn a failure into `CertwerkError::Api`.
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Success(body) => Ok(body),
            Self::Failure { status, message } => Err(CertwerkError::Api { status, message }),
        }
    }
}

fn error_message(body: &Value) -> Option<String> {
    body.as_object()?
        .get("error")?
        .as_str()
        .map(str::to_owned)
}

fn fallback_message(status: u16) -> String {
    match status {
        401 => "unauthorized".into(),
        403 => "forbidden".into(),
        404 => "not found".into(),
        408 => "request timeout".into(),
        500..=599 => "server error".into(),
        _ => format!("unexpected status {status}"),
    }
}

/// Pull the record array out of a list response.
///
/// Only the collection keys belonging to `record_type` are accepted, so a
/// response for the wrong collection is rejected rather than misread.
pub fn extract_list(record_type: RecordType, body: &Value) -> Result<Vec<Value>> {
    let object = body
        .as_object()
        .ok_or_else(|| CertwerkError::Decoding("list response is not a JSON object".into()))?;

    for key in record_type.list_keys() {
        if let Some(items) = object.get(key) {
            return items.as_array().cloned().ok_or_else(|| {
                CertwerkError::Decoding(format!("'{key}' is not an array"))
            });
        }
    }
    Err(CertwerkError::Decoding(format!(
        "list response has none of {:?}",
        record_type.list_keys()
    )))
}
