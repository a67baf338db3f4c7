// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record lookup seam used by token verification.

use std::future::Future;

use crate::error::Result;
use crate::types::{CertificateRecord, RecordType};

/// Finds registry records by certificate number.
///
/// `Ok(None)` means the registry answered and has no such certificate;
/// transport and API failures are errors.
pub trait RecordLookup: Send + Sync {
    fn find_by_certificate(
        &self,
        record_type: RecordType,
        certificate_number: &str,
    ) -> impl Future<Output = Result<Option<CertificateRecord>>> + Send;
}
