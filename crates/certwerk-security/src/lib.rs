// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certwerk-security: Verification tokens, integrity, and the audit trail.
//
// The verification token is a lookup key with a corruption checksum, not a
// credential: authenticity is established by checking the decoded fields
// against the registry. The audit trail records every certificate issued.

pub mod audit;
pub mod integrity;
pub mod token;

pub use audit::{AuditEntry, AuditEvent, AuditLog};
pub use integrity::{hash_bytes, verify_hash};
pub use token::{decode, encode};
