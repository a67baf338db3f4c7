// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Verification token codec.
//
// Wire format (compact JSON, field order fixed by the struct):
//
//   {"certNum":"BC-2024-001","type":"birth","id":"abc123",
//    "issued":"2024-01-15T00:00:00Z","timestamp":1705305600000,
//    "sum":"9f2c…"}
//
// `timestamp` is the generation time in epoch milliseconds. `sum` is the first
// 16 hex digits of SHA-256 over the canonical field string and only detects
// corruption; anyone can recompute it. Tokens printed by the earlier web
// client carry no `sum` and are still accepted.

use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::types::{RecordType, VerificationPayload, parse_registry_timestamp};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::integrity::hash_bytes;

/// Hex digits of the SHA-256 digest kept in the `sum` field.
const CHECKSUM_HEX_LEN: usize = 16;

#[derive(Debug, Serialize, Deserialize)]
struct TokenWire {
    #[serde(rename = "certNum")]
    cert_num: String,
    #[serde(rename = "type")]
    record_type: String,
    id: String,
    issued: String,
    timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sum: Option<String>,
}

impl TokenWire {
    fn checksum(&self) -> String {
        let canonical = format!(
            "{}|{}|{}|{}|{}",
            self.cert_num, self.record_type, self.id, self.issued, self.timestamp
        );
        let mut digest = hash_bytes(canonical.as_bytes());
        digest.truncate(CHECKSUM_HEX_LEN);
        digest
    }
}

/// Serialize `payload` into a verification token string.
///
/// Fails with `InvalidPayload` when the certificate number or record id is
/// empty, or the issue date falls outside years 0000 to 9999, which RFC 3339
/// cannot write.
#[instrument(skip(payload), fields(cert = payload.certificate_number()))]
pub fn encode(payload: &VerificationPayload) -> Result<String> {
    if payload.certificate_number().trim().is_empty() {
        return Err(CertwerkError::InvalidPayload(
            "certificate number is required".into(),
        ));
    }
    if payload.record_id().trim().is_empty() {
        return Err(CertwerkError::InvalidPayload("record id is required".into()));
    }
    let year = payload.issued_date().year();
    if !(0..=9999).contains(&year) {
        return Err(CertwerkError::InvalidPayload(format!(
            "issue date year {year} is outside 0000-9999"
        )));
    }

    let mut wire = TokenWire {
        cert_num: payload.certificate_number().to_owned(),
        record_type: payload.record_type().as_str().to_owned(),
        id: payload.record_id().to_owned(),
        issued: payload
            .issued_date()
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        timestamp: payload.generated_at().timestamp_millis(),
        sum: None,
    };
    wire.sum = Some(wire.checksum());

    let token = serde_json::to_string(&wire)?;
    debug!(token_len = token.len(), "verification token encoded");
    Ok(token)
}

/// Parse a verification token back into its payload.
///
/// Fails with `MalformedToken` when the text is not a token, a field is
/// empty or unparsable, or the checksum does not match.
#[instrument(skip(token), fields(token_len = token.len()))]
pub fn decode(token: &str) -> Result<VerificationPayload> {
    let wire: TokenWire = serde_json::from_str(token.trim())
        .map_err(|err| CertwerkError::MalformedToken(err.to_string()))?;

    if let Some(sum) = wire.sum.as_deref() {
        let expected = wire.checksum();
        if !sum.eq_ignore_ascii_case(&expected) {
            return Err(CertwerkError::MalformedToken(format!(
                "checksum mismatch: token says {sum}, fields give {expected}"
            )));
        }
    }

    if wire.cert_num.trim().is_empty() {
        return Err(CertwerkError::MalformedToken("empty certificate number".into()));
    }
    if wire.id.trim().is_empty() {
        return Err(CertwerkError::MalformedToken("empty record id".into()));
    }

    let record_type: RecordType = wire
        .record_type
        .parse()
        .map_err(|_| CertwerkError::MalformedToken(format!("unknown record type '{}'", wire.record_type)))?;

    let issued_date = parse_registry_timestamp(&wire.issued).ok_or_else(|| {
        CertwerkError::MalformedToken(format!("unparsable issue date '{}'", wire.issued))
    })?;

    let generated_at: DateTime<Utc> = DateTime::from_timestamp_millis(wire.timestamp)
        .ok_or_else(|| {
            CertwerkError::MalformedToken(format!("timestamp {} out of range", wire.timestamp))
        })?;

    Ok(VerificationPayload::new(
        wire.cert_num,
        record_type,
        wire.id,
        issued_date,
        generated_at,
    ))
}
