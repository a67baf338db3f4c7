// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Token verification.
//
// The token is only a lookup key with a corruption checksum; a certificate is
// genuine when the registry holds an approved record with the same number,
// id and issue date.

use certwerk_core::error::Result;
use certwerk_core::lookup::RecordLookup;
use certwerk_core::types::{CertificateRecord, VerificationPayload};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// What the registry says about a scanned certificate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Valid { record: Box<CertificateRecord> },
    NotApproved { status: String },
    NotFound,
    Mismatch { field: &'static str },
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Valid { .. } => "Certificate verified successfully.".into(),
            Self::NotApproved { status } => {
                format!("Certificate found but is not approved (status: {status}).")
            }
            Self::NotFound => "Certificate not found.".into(),
            Self::Mismatch { field } => {
                format!("Certificate details do not match the registry ({field} differs).")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub certificate_number: String,
    pub record_type: certwerk_core::types::RecordType,
    pub outcome: VerificationOutcome,
}

/// Decode `token` and check it against the registry.
///
/// A malformed token or a failed lookup is an error; every answer the
/// registry can give is an outcome.
#[instrument(skip(token, lookup), fields(token_len = token.len()))]
pub async fn verify<L: RecordLookup>(token: &str, lookup: &L) -> Result<Verification> {
    let payload = certwerk_security::decode(token)?;
    let record = lookup
        .find_by_certificate(payload.record_type(), payload.certificate_number())
        .await?;

    let outcome = match record {
        None => VerificationOutcome::NotFound,
        Some(record) => classify(&payload, record),
    };

    if outcome.is_valid() {
        info!(cert = payload.certificate_number(), "certificate verified");
    } else {
        warn!(cert = payload.certificate_number(), ?outcome, "certificate failed verification");
    }
    Ok(Verification {
        certificate_number: payload.certificate_number().to_owned(),
        record_type: payload.record_type(),
        outcome,
    })
}

fn classify(payload: &VerificationPayload, record: CertificateRecord) -> VerificationOutcome {
    if record.id != payload.record_id() {
        return VerificationOutcome::Mismatch { field: "id" };
    }
    if !record.is_approved() {
        return VerificationOutcome::NotApproved {
            status: record.status.clone().unwrap_or_else(|| "unknown".into()),
        };
    }
    // Registry dates may lose sub-second precision on the way through the API.
    if let Some(issued) = record.issued_date.or(record.created_at) {
        if issued.timestamp() != payload.issued_date().timestamp() {
            return VerificationOutcome::Mismatch {
                field: "issued_date",
            };
        }
    }
    VerificationOutcome::Valid {
        record: Box::new(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certwerk_core::error::CertwerkError;
    use certwerk_core::types::RecordType;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    #[derive(Default)]
    struct InMemoryRegistry {
        records: HashMap<String, CertificateRecord>,
    }

    impl InMemoryRegistry {
        fn with(record: CertificateRecord) -> Self {
            let mut registry = Self::default();
            let number = record.certificate_number().unwrap().to_owned();
            registry.records.insert(number, record);
            registry
        }
    }

    impl RecordLookup for InMemoryRegistry {
        async fn find_by_certificate(
            &self,
            record_type: RecordType,
            certificate_number: &str,
        ) -> Result<Option<CertificateRecord>> {
            Ok(self
                .records
                .get(certificate_number)
                .filter(|r| r.record_type == record_type)
                .cloned())
        }
    }

    fn record(status: &str) -> CertificateRecord {
        let mut record = CertificateRecord::new(RecordType::Birth, "abc123");
        record.certificate_number = Some("BC-2024-001".into());
        record.status = Some(status.into());
        record.issued_date = Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        record
    }

    fn token_for(record: &CertificateRecord) -> String {
        let payload = VerificationPayload::for_record(
            record,
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
        );
        certwerk_security::encode(&payload).unwrap()
    }

    #[tokio::test]
    async fn approved_record_is_valid() {
        let registry = InMemoryRegistry::with(record("approved"));
        let result = verify(&token_for(&record("approved")), &registry).await.unwrap();
        assert!(result.outcome.is_valid());
        assert_eq!(result.certificate_number, "BC-2024-001");
    }

    #[tokio::test]
    async fn pending_record_is_not_approved() {
        let registry = InMemoryRegistry::with(record("pending"));
        let result = verify(&token_for(&record("pending")), &registry).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::NotApproved {
                status: "pending".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_number_is_not_found() {
        let registry = InMemoryRegistry::default();
        let result = verify(&token_for(&record("approved")), &registry).await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::NotFound);
        assert_eq!(result.outcome.message(), "Certificate not found.");
    }

    #[tokio::test]
    async fn different_record_id_is_a_mismatch() {
        let mut stored = record("approved");
        stored.id = "zzz999".into();
        let registry = InMemoryRegistry::with(stored);
        let result = verify(&token_for(&record("approved")), &registry).await.unwrap();
        assert_eq!(result.outcome, VerificationOutcome::Mismatch { field: "id" });
    }

    #[tokio::test]
    async fn different_issue_date_is_a_mismatch() {
        let mut stored = record("approved");
        stored.issued_date = Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap());
        let registry = InMemoryRegistry::with(stored);
        let result = verify(&token_for(&record("approved")), &registry).await.unwrap();
        assert_eq!(
            result.outcome,
            VerificationOutcome::Mismatch {
                field: "issued_date"
            }
        );
    }

    #[tokio::test]
    async fn malformed_token_is_an_error() {
        let registry = InMemoryRegistry::default();
        let err = verify("not a token", &registry).await.unwrap_err();
        assert!(matches!(err, CertwerkError::MalformedToken(_)));
    }
}
