// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Certwerk certificate engine.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CertwerkError;

/// Unique identifier for a single download operation (log correlation only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadId(pub Uuid);

impl DownloadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// The four vital-event record types kept by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Birth,
    Death,
    Marriage,
    Divorce,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [Self::Birth, Self::Death, Self::Marriage, Self::Divorce];

    /// Wire name (`"birth"`, `"death"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Death => "death",
            Self::Marriage => "marriage",
            Self::Divorce => "divorce",
        }
    }

    /// Certificate title printed on the document and in PDF metadata.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Birth => "Birth Certificate",
            Self::Death => "Death Certificate",
            Self::Marriage => "Marriage Certificate",
            Self::Divorce => "Divorce Certificate",
        }
    }

    /// Prefix used in artifact filenames.
    pub fn filename_prefix(&self) -> &'static str {
        match self {
            Self::Birth => "BC",
            Self::Death => "DC",
            Self::Marriage => "MC",
            Self::Divorce => "DV",
        }
    }

    /// Accent colour of the certificate frame as an sRGB triple.
    pub fn accent_rgb(&self) -> (u8, u8, u8) {
        match self {
            Self::Birth => (0x00, 0x96, 0x39),
            Self::Death => (0xDA, 0x12, 0x1A),
            Self::Marriage => (0xE9, 0x1E, 0x63),
            Self::Divorce => (0xFF, 0x98, 0x00),
        }
    }

    /// Registry collection path segment (`/births`, `/deaths`, ...).
    pub fn api_collection(&self) -> &'static str {
        match self {
            Self::Birth => "births",
            Self::Death => "deaths",
            Self::Marriage => "marriages",
            Self::Divorce => "divorces",
        }
    }

    /// JSON keys the registry uses for list responses of this type.
    pub fn list_keys(&self) -> [&'static str; 2] {
        match self {
            Self::Birth => ["birth_records", "births"],
            Self::Death => ["death_records", "deaths"],
            Self::Marriage => ["marriage_records", "marriages"],
            Self::Divorce => ["divorce_records", "divorces"],
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = CertwerkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birth" => Ok(Self::Birth),
            "death" => Ok(Self::Death),
            "marriage" => Ok(Self::Marriage),
            "divorce" => Ok(Self::Divorce),
            other => Err(CertwerkError::InvalidPayload(format!(
                "unknown record type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Download strategies
// ---------------------------------------------------------------------------

/// How the caller asked for the artifact to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Hand the view to the platform print facility.
    NativePrint,
    /// Rasterize the view and package it as a PDF.
    ProgrammaticCapture,
    /// Let the orchestrator pick.
    Auto,
}

/// A strategy after `Auto` has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedStrategy {
    NativePrint,
    ProgrammaticCapture,
}

impl Strategy {
    /// Resolve `Auto` to `default`; concrete strategies map to themselves.
    pub fn resolve(self, default: ResolvedStrategy) -> ResolvedStrategy {
        match self {
            Self::NativePrint => ResolvedStrategy::NativePrint,
            Self::ProgrammaticCapture => ResolvedStrategy::ProgrammaticCapture,
            Self::Auto => default,
        }
    }
}

impl FromStr for Strategy {
    type Err = CertwerkError;

    /// Accepts the canonical names plus the method names the web client used.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native_print" | "print" | "print_to_pdf" => Ok(Self::NativePrint),
            "programmatic_capture" | "capture" | "html2canvas" => Ok(Self::ProgrammaticCapture),
            "auto" => Ok(Self::Auto),
            other => Err(CertwerkError::Config(format!(
                "unknown download strategy '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for ResolvedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativePrint => f.write_str("native_print"),
            Self::ProgrammaticCapture => f.write_str("programmatic_capture"),
        }
    }
}

// ---------------------------------------------------------------------------
// Page layout
// ---------------------------------------------------------------------------

/// Standard paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }
}

/// How a raster is placed onto pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFit {
    /// Scale down until the whole raster fits on one page.
    SinglePage,
    /// Scale to the usable page width and continue onto further pages.
    FitWidth,
}

/// Classification of errors for capture retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Backend hiccup, worth one more attempt at reduced fidelity.
    Transient,
    /// Bad input; retrying cannot help.
    Permanent,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A registry record as the certificate engine sees it.
///
/// Only the fields the engine needs are typed; everything else the registry
/// sends (names, places, parents, ...) is kept in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub record_type: RecordType,
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, with = "lenient_datetime")]
    pub issued_date: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_datetime")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub registration_date: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl CertificateRecord {
    /// Minimal record, mostly useful for tests and the CLI.
    pub fn new(record_type: RecordType, id: impl Into<String>) -> Self {
        Self {
            record_type,
            id: id.into(),
            certificate_number: None,
            status: None,
            issued_date: None,
            created_at: None,
            registration_date: None,
            fields: BTreeMap::new(),
        }
    }

    /// Build a record from a registry JSON body, which never carries its own
    /// type.
    pub fn from_registry_json(
        record_type: RecordType,
        mut body: serde_json::Value,
    ) -> Result<Self, CertwerkError> {
        let object = body.as_object_mut().ok_or_else(|| {
            CertwerkError::Decoding("record body is not a JSON object".into())
        })?;
        object.insert(
            "record_type".into(),
            serde_json::Value::String(record_type.as_str().into()),
        );
        serde_json::from_value(body).map_err(|err| CertwerkError::Decoding(err.to_string()))
    }

    /// Certificate number, if one has been assigned and is not blank.
    pub fn certificate_number(&self) -> Option<&str> {
        self.certificate_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Issue date: `issued_date`, else `created_at`, else `fallback`.
    pub fn issued_at(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.issued_date.or(self.created_at).unwrap_or(fallback)
    }

    pub fn is_approved(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("approved"))
    }

    /// Name(s) of the person or couple the certificate is about.
    pub fn subject_name(&self) -> String {
        match self.record_type {
            RecordType::Birth => self.join_fields(&[
                "child_first_name",
                "child_father_name",
                "child_grandfather_name",
            ]),
            RecordType::Death => self.join_fields(&[
                "deceased_first_name",
                "deceased_father_name",
                "deceased_grandfather_name",
            ]),
            RecordType::Marriage | RecordType::Divorce => {
                let first = self.field_str("spouse1_full_name").unwrap_or_default();
                let second = self.field_str("spouse2_full_name").unwrap_or_default();
                match (first.is_empty(), second.is_empty()) {
                    (false, false) => format!("{first} & {second}"),
                    (false, true) => first.to_owned(),
                    (true, false) => second.to_owned(),
                    (true, true) => String::new(),
                }
            }
        }
    }

    /// Date of the vital event itself, as the registry formatted it.
    pub fn event_date(&self) -> Option<&str> {
        let key = match self.record_type {
            RecordType::Birth => "date_of_birth",
            RecordType::Death => "date_of_death",
            RecordType::Marriage => "marriage_date",
            RecordType::Divorce => "divorce_date",
        };
        self.field_str(key)
    }

    /// `"city, region"` where the event took place.
    pub fn place(&self) -> String {
        let prefix = match self.record_type {
            RecordType::Birth => "birth",
            RecordType::Death => "death",
            RecordType::Marriage => "marriage",
            RecordType::Divorce => "divorce",
        };
        let city = self.field_str(&format!("{prefix}_city")).unwrap_or_default();
        let region = self.field_str(&format!("{prefix}_region")).unwrap_or_default();
        [city, region]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// A string-valued extra field, trimmed; `None` when absent or blank.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn join_fields(&self, keys: &[&str]) -> String {
        keys.iter()
            .filter_map(|key| self.field_str(key))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a timestamp in any of the formats the registry emits.
pub fn parse_registry_timestamp(text: &str) -> Option<DateTime<Utc>> {
    lenient_datetime::parse(text.trim())
}

/// Registry timestamps arrive as RFC 3339, as HTTP-style RFC 2822, as naive
/// ISO-8601 (assumed UTC), or as bare dates.
mod lenient_datetime {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse(text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{text}'"))),
        }
    }

    pub(super) fn parse(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

// ---------------------------------------------------------------------------
// Verification payload
// ---------------------------------------------------------------------------

/// The data carried by a certificate's scannable verification token.
///
/// Immutable once built. `generated_at` is kept at millisecond precision so
/// that it survives the token's epoch-millisecond encoding unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationPayload {
    certificate_number: String,
    record_type: RecordType,
    record_id: String,
    issued_date: DateTime<Utc>,
    generated_at: DateTime<Utc>,
}

impl VerificationPayload {
    pub fn new(
        certificate_number: impl Into<String>,
        record_type: RecordType,
        record_id: impl Into<String>,
        issued_date: DateTime<Utc>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            certificate_number: certificate_number.into(),
            record_type,
            record_id: record_id.into(),
            issued_date,
            generated_at: truncate_to_millis(generated_at),
        }
    }

    /// Payload for `record` generated at `generated_at`. A missing
    /// certificate number yields an empty one, which the codec rejects.
    pub fn for_record(record: &CertificateRecord, generated_at: DateTime<Utc>) -> Self {
        Self::new(
            record.certificate_number().unwrap_or_default(),
            record.record_type,
            record.id.clone(),
            record.issued_at(generated_at),
            generated_at,
        )
    }

    pub fn certificate_number(&self) -> &str {
        &self.certificate_number
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn issued_date(&self) -> DateTime<Utc> {
        self.issued_date
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}

fn truncate_to_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or(dt)
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// A finished, downloadable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: &'static str,
}

impl Artifact {
    pub fn pdf(bytes: Vec<u8>, filename: String) -> Self {
        Self {
            bytes,
            filename,
            mime_type: "application/pdf",
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn record_type_round_trips_through_str() {
        for ty in RecordType::ALL {
            assert_eq!(ty.as_str().parse::<RecordType>().unwrap(), ty);
        }
        assert!("adoption".parse::<RecordType>().is_err());
    }

    #[test]
    fn auto_resolves_to_the_default() {
        assert_eq!(
            Strategy::Auto.resolve(ResolvedStrategy::ProgrammaticCapture),
            ResolvedStrategy::ProgrammaticCapture
        );
        assert_eq!(
            Strategy::NativePrint.resolve(ResolvedStrategy::ProgrammaticCapture),
            ResolvedStrategy::NativePrint
        );
    }

    #[test]
    fn legacy_method_names_parse() {
        assert_eq!("html2canvas".parse::<Strategy>().unwrap(), Strategy::ProgrammaticCapture);
        assert_eq!("print_to_pdf".parse::<Strategy>().unwrap(), Strategy::NativePrint);
        assert!("direct_pdf".parse::<Strategy>().is_err());
    }

    #[test]
    fn registry_body_parses_with_mongo_id_and_naive_timestamps() {
        let body = json!({
            "_id": "abc123",
            "certificate_number": "BR/AD/01/2016/00001",
            "status": "approved",
            "created_at": "2024-01-15T08:30:00.123456",
            "child_first_name": "Abebe",
            "child_father_name": "Kebede",
            "birth_city": "Addis Ababa",
            "birth_region": "Addis Ababa",
        });
        let record = CertificateRecord::from_registry_json(RecordType::Birth, body).unwrap();
        assert_eq!(record.id, "abc123");
        assert!(record.is_approved());
        assert_eq!(record.subject_name(), "Abebe Kebede");
        assert_eq!(record.place(), "Addis Ababa, Addis Ababa");
        assert_eq!(
            record.created_at.unwrap().date_naive(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn non_object_body_is_a_decoding_error() {
        let err = CertificateRecord::from_registry_json(RecordType::Death, json!([1, 2])).unwrap_err();
        assert!(matches!(err, CertwerkError::Decoding(_)));
    }

    #[test]
    fn couple_names_are_joined() {
        let mut record = CertificateRecord::new(RecordType::Marriage, "m1");
        record.fields.insert("spouse1_full_name".into(), json!("Almaz Tesfaye"));
        record.fields.insert("spouse2_full_name".into(), json!("Dawit Bekele"));
        assert_eq!(record.subject_name(), "Almaz Tesfaye & Dawit Bekele");
    }

    #[test]
    fn issued_date_falls_back_to_created_then_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut record = CertificateRecord::new(RecordType::Birth, "b1");
        assert_eq!(record.issued_at(now), now);
        record.created_at = Some(created);
        assert_eq!(record.issued_at(now), created);
    }

    #[test]
    fn blank_certificate_number_counts_as_missing() {
        let mut record = CertificateRecord::new(RecordType::Birth, "b1");
        record.certificate_number = Some("   ".into());
        assert_eq!(record.certificate_number(), None);
    }

    #[test]
    fn payload_drops_sub_millisecond_precision() {
        let generated = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let payload = VerificationPayload::new(
            "BC-1",
            RecordType::Birth,
            "r1",
            generated,
            generated,
        );
        assert_eq!(payload.generated_at().timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(payload.issued_date(), generated);
    }

    #[test]
    fn lenient_parser_accepts_bare_dates() {
        let parsed = lenient_datetime::parse("2024-01-15").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert!(lenient_datetime::parse("15/01/2024").is_none());
    }

    #[test]
    fn lenient_parser_accepts_http_dates() {
        let parsed = lenient_datetime::parse("Mon, 15 Jan 2024 08:30:00 GMT").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }
}
