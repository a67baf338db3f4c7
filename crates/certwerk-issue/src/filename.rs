// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact naming.

use certwerk_core::types::RecordType;
use chrono::NaiveDate;

/// Stand-in for a missing certificate number.
pub const MISSING_NUMBER: &str = "Certificate";

/// `{prefix}_{number}_{YYYY-MM-DD}.pdf`.
///
/// Path separators and other characters that are unsafe in file names are
/// replaced by `-`.
pub fn artifact_filename(
    record_type: RecordType,
    certificate_number: Option<&str>,
    date: NaiveDate,
) -> String {
    let number = certificate_number
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(sanitize)
        .unwrap_or_else(|| MISSING_NUMBER.to_owned());
    format!(
        "{}_{}_{}.pdf",
        record_type.filename_prefix(),
        number,
        date.format("%Y-%m-%d")
    )
}

/// Document title: `"{Type name} - {number}"`.
pub fn artifact_title(record_type: RecordType, certificate_number: Option<&str>) -> String {
    format!(
        "{} - {}",
        record_type.display_name(),
        certificate_number.unwrap_or(MISSING_NUMBER)
    )
}

fn sanitize(number: &str) -> String {
    number
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}
