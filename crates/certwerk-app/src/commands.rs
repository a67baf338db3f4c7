// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command handlers.
//
// Each handler prints its result (plain text, or JSON with `--json`) and
// returns whether the operation succeeded. Errors go back to `main`, which
// prints them in plain language.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::types::{
    CertificateRecord, RecordType, VerificationPayload, parse_registry_timestamp,
};
use certwerk_document::{CertificateView, qr};
use certwerk_issue::{BatchItem, BatchOutcome};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::cli::{Cli, Commands, IssueArgs, TokenCommands};
use crate::services::app_services::AppServices;

pub async fn run(cli: Cli) -> Result<bool> {
    let services = AppServices::init(cli.data_dir.as_deref())?;
    debug!(data_dir = %services.data_dir().display(), "services ready");
    dispatch(&services, cli.command, cli.json).await
}

pub async fn dispatch(services: &AppServices, command: Commands, json: bool) -> Result<bool> {
    match command {
        Commands::Issue(args) => issue(services, args, json).await,
        Commands::Token(TokenCommands::Encode {
            number,
            record_type,
            id,
            issued,
        }) => {
            let token = encode_token(&number, record_type, &id, issued.as_deref(), Utc::now())?;
            if json {
                print_json(&json!({ "token": token }))?;
            } else {
                println!("{token}");
            }
            Ok(true)
        }
        Commands::Token(TokenCommands::Decode { token }) => {
            let payload = certwerk_security::decode(&token)?;
            let fields = describe_payload(&payload);
            if json {
                print_json(&fields)?;
            } else if let Value::Object(map) = fields {
                for (key, value) in map {
                    println!("{key:<20} {}", value.as_str().unwrap_or_default());
                }
            }
            Ok(true)
        }
        Commands::Qr { token, size, out } => {
            let size = size.unwrap_or(services.config().qr_size_px);
            write_qr(&token, size, &out).await?;
            if json {
                print_json(&json!({ "path": out.display().to_string(), "size": size }))?;
            } else {
                println!("QR code written to {}", out.display());
            }
            Ok(true)
        }
        Commands::Verify { token, registry } => {
            let client = services.records_client(registry.as_deref())?;
            let verification = certwerk_issue::verify(&token, &client).await?;
            if json {
                print_json(&verification)?;
            } else {
                println!("{}", verification.outcome.message());
            }
            Ok(verification.outcome.is_valid())
        }
        Commands::Audit {
            certificate: Some(number),
            artifact: Some(path),
            ..
        } => {
            let bytes = tokio::fs::read(&path).await?;
            let entry = services.check_artifact(&number, &bytes)?;
            if json {
                print_json(&entry)?;
            } else {
                println!(
                    "{} matches the certificate issued {} ({})",
                    path.display(),
                    entry.timestamp,
                    entry.action
                );
            }
            Ok(true)
        }
        Commands::Audit {
            certificate, limit, ..
        } => {
            let entries = services.audit_entries(certificate.as_deref(), limit)?;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No audit entries.");
            } else {
                for entry in entries {
                    println!(
                        "{}  {:<18} {:<9} {:<16} {}",
                        entry.timestamp,
                        entry.action,
                        entry.record_type,
                        entry.certificate_number,
                        if entry.success { "ok" } else { "FAILED" },
                    );
                }
            }
            Ok(true)
        }
    }
}

/// Issue every requested record and write the artifacts to `out_dir`.
#[instrument(skip(services, args), fields(strategy = ?args.strategy))]
async fn issue(services: &AppServices, args: IssueArgs, json: bool) -> Result<bool> {
    let records = if args.from_registry {
        let (Some(record_type), Some(id)) = (args.record_type, args.id.as_deref()) else {
            return Err(CertwerkError::Config(
                "--from-registry needs --type and --id".into(),
            ));
        };
        let client = services.records_client(args.registry.as_deref())?;
        vec![client.fetch_record(record_type, id).await?]
    } else if args.records.is_empty() {
        return Err(CertwerkError::Config(
            "give at least one --record file, or --from-registry".into(),
        ));
    } else {
        args.records
            .iter()
            .map(|path| load_record(path, args.record_type))
            .collect::<Result<Vec<_>>>()?
    };

    let downloader = services.downloader(args.font.as_deref(), args.layout_only)?;
    let authority = &services.config().authority_name;
    let views: Vec<CertificateView> = records
        .iter()
        .map(|record| CertificateView::new(record, authority.clone()))
        .collect();
    let items: Vec<BatchItem<'_>> = records
        .iter()
        .zip(&views)
        .map(|(record, view)| BatchItem {
            id: record.id.clone(),
            view,
            record,
        })
        .collect();

    let mut outcomes = downloader.download_many(&items, args.strategy).await;
    let written = write_artifacts(&mut outcomes, &args.out_dir).await?;

    if json {
        print_json(&outcomes)?;
    } else {
        for outcome in &outcomes {
            println!("{}: {}", outcome.item_id, outcome.outcome.message);
            if let Some(error) = &outcome.outcome.error {
                eprintln!("  {error}");
            }
        }
        for path in &written {
            println!("wrote {}", path.display());
        }
    }
    Ok(outcomes.iter().all(|o| o.outcome.success))
}

/// Write each artifact under its own name.
///
/// A name already used earlier in the batch gets a `_2`, `_3`, ... suffix, and
/// the outcome is updated to carry the name actually written.
async fn write_artifacts(outcomes: &mut [BatchOutcome], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut used = HashSet::new();
    for outcome in outcomes.iter_mut() {
        let Some(artifact) = outcome.outcome.artifact.as_mut() else {
            continue;
        };
        if written.is_empty() {
            tokio::fs::create_dir_all(out_dir).await?;
        }
        let filename = unique_filename(&artifact.filename, &mut used);
        if filename != artifact.filename {
            warn!(
                item = %outcome.item_id,
                requested = %artifact.filename,
                %filename,
                "artifact name already used in this batch"
            );
            artifact.filename = filename.clone();
            outcome.outcome.filename = Some(filename);
        }
        let path = out_dir.join(&artifact.filename);
        tokio::fs::write(&path, &artifact.bytes).await?;
        info!(path = %path.display(), bytes = artifact.len(), "artifact written");
        written.push(path);
    }
    Ok(written)
}

/// `name`, or `name` with the first free `_N` suffix before its extension.
fn unique_filename(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_owned()) {
        return name.to_owned();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    };
    let mut n = 2u32;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Read a registry record body from `path`.
///
/// The record type comes from `record_type`, else from the body's own
/// `record_type` field.
pub fn load_record(path: &Path, record_type: Option<RecordType>) -> Result<CertificateRecord> {
    let text = std::fs::read_to_string(path)?;
    let body: Value = serde_json::from_str(&text)?;
    let record_type = match record_type {
        Some(record_type) => record_type,
        None => body
            .get("record_type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CertwerkError::Config(format!(
                    "{} has no record_type; pass --type",
                    path.display()
                ))
            })?
            .parse()?,
    };
    CertificateRecord::from_registry_json(record_type, body)
}

pub fn encode_token(
    number: &str,
    record_type: RecordType,
    id: &str,
    issued: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String> {
    let issued_date = match issued {
        Some(text) => parse_registry_timestamp(text).ok_or_else(|| {
            CertwerkError::InvalidPayload(format!("unparsable issue date '{text}'"))
        })?,
        None => now,
    };
    let payload = VerificationPayload::new(number, record_type, id, issued_date, now);
    certwerk_security::encode(&payload)
}

pub fn describe_payload(payload: &VerificationPayload) -> Value {
    json!({
        "certificate_number": payload.certificate_number(),
        "record_type": payload.record_type().as_str(),
        "record_id": payload.record_id(),
        "issued_date": payload.issued_date().to_rfc3339_opts(SecondsFormat::AutoSi, true),
        "generated_at": payload.generated_at().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Render `token` as a QR PNG at `out`. The token is decoded first so that
/// only well-formed tokens get printed.
async fn write_qr(token: &str, size: u32, out: &Path) -> Result<()> {
    certwerk_security::decode(token)?;
    let png = qr::render_token(token.trim(), size)?;
    tokio::fs::write(out, png).await?;
    Ok(())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use certwerk_core::types::Strategy;
    use chrono::TimeZone;

    fn services(dir: &Path) -> AppServices {
        AppServices::init(Some(dir)).unwrap()
    }

    fn write_record(dir: &Path, body: Value) -> PathBuf {
        let path = dir.join("record.json");
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    fn issue_args(records: Vec<PathBuf>, out_dir: PathBuf) -> IssueArgs {
        IssueArgs {
            records,
            from_registry: false,
            record_type: None,
            id: None,
            registry: None,
            strategy: Strategy::ProgrammaticCapture,
            font: None,
            layout_only: true,
            out_dir,
        }
    }

    #[test]
    fn record_type_from_body_or_flag() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_record(
            tmp.path(),
            json!({"record_type": "death", "_id": "d1", "certificate_number": "DC-7"}),
        );
        let record = load_record(&path, None).unwrap();
        assert_eq!(record.record_type, RecordType::Death);
        assert_eq!(record.id, "d1");

        let path = write_record(tmp.path(), json!({"_id": "b1"}));
        assert!(matches!(load_record(&path, None), Err(CertwerkError::Config(_))));
        let record = load_record(&path, Some(RecordType::Birth)).unwrap();
        assert_eq!(record.record_type, RecordType::Birth);
    }

    #[test]
    fn encoded_token_decodes_to_the_same_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        let token =
            encode_token("BC-2024-001", RecordType::Birth, "abc123", Some("2024-01-15"), now).unwrap();
        let fields = describe_payload(&certwerk_security::decode(&token).unwrap());
        assert_eq!(fields["certificate_number"], "BC-2024-001");
        assert_eq!(fields["record_type"], "birth");
        assert_eq!(fields["issued_date"], "2024-01-15T00:00:00Z");
        assert_eq!(fields["generated_at"], "2024-01-15T09:30:00.000Z");
    }

    #[test]
    fn bad_issue_date_is_rejected() {
        let result = encode_token("BC-1", RecordType::Birth, "a", Some("soon"), Utc::now());
        assert!(matches!(result, Err(CertwerkError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn issue_writes_the_artifact_and_audits_it() {
        let tmp = tempfile::tempdir().unwrap();
        let services = services(&tmp.path().join("data"));
        let record = write_record(
            tmp.path(),
            json!({
                "record_type": "birth",
                "_id": "abc123",
                "certificate_number": "BC-2024-001",
                "status": "approved",
                "child_first_name": "Abebe",
                "issued_date": "2024-01-15T00:00:00Z"
            }),
        );
        let out_dir = tmp.path().join("out");

        let ok = issue(&services, issue_args(vec![record], out_dir.clone()), true)
            .await
            .unwrap();
        assert!(ok);

        let files: Vec<String> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("BC_BC-2024-001_"), "{files:?}");
        assert!(files[0].ends_with(".pdf"));

        let entries = services.audit_entries(Some("BC-2024-001"), 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].success);
    }

    #[tokio::test]
    async fn records_sharing_a_filename_are_all_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let services = services(&tmp.path().join("data"));
        let first = tmp.path().join("r1.json");
        let second = tmp.path().join("r2.json");
        std::fs::write(&first, json!({"record_type": "birth", "_id": "r1"}).to_string()).unwrap();
        std::fs::write(&second, json!({"record_type": "birth", "_id": "r2"}).to_string()).unwrap();
        let out_dir = tmp.path().join("out");

        let ok = issue(&services, issue_args(vec![first, second], out_dir.clone()), true)
            .await
            .unwrap();
        assert!(ok);

        let mut files: Vec<String> = std::fs::read_dir(&out_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files.len(), 2, "{files:?}");
        assert!(files.iter().all(|f| f.starts_with("BC_Certificate_")), "{files:?}");
        assert!(files.iter().any(|f| f.ends_with("_2.pdf")), "{files:?}");
    }

    #[test]
    fn unique_filename_suffixes_before_the_extension() {
        let mut used = HashSet::new();
        assert_eq!(unique_filename("BC_X_2024-01-15.pdf", &mut used), "BC_X_2024-01-15.pdf");
        assert_eq!(unique_filename("BC_X_2024-01-15.pdf", &mut used), "BC_X_2024-01-15_2.pdf");
        assert_eq!(unique_filename("BC_X_2024-01-15.pdf", &mut used), "BC_X_2024-01-15_3.pdf");
        assert_eq!(unique_filename("noext", &mut used), "noext");
        assert_eq!(unique_filename("noext", &mut used), "noext_2");
    }

    #[tokio::test]
    async fn issue_without_a_font_fails_unless_layout_only() {
        let tmp = tempfile::tempdir().unwrap();
        let services = services(&tmp.path().join("data"));
        let record = write_record(
            tmp.path(),
            json!({"record_type": "birth", "_id": "b1", "certificate_number": "BC-9"}),
        );
        let mut args = issue_args(vec![record], tmp.path().join("out"));
        args.layout_only = false;

        let ok = issue(&services, args, true).await.unwrap();
        assert!(!ok);
        assert!(!tmp.path().join("out").exists());
        let entries = services.audit_entries(Some("BC-9"), 10).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].success);
    }

    #[tokio::test]
    async fn native_print_without_a_print_facility_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let services = services(&tmp.path().join("data"));
        let record = write_record(
            tmp.path(),
            json!({"record_type": "marriage", "_id": "m1", "certificate_number": "MC-3"}),
        );
        let mut args = issue_args(vec![record], tmp.path().join("out"));
        args.strategy = Strategy::NativePrint;

        let ok = issue(&services, args, true).await.unwrap();
        assert!(!ok);
        assert!(!tmp.path().join("out").exists());
    }

    #[tokio::test]
    async fn issue_without_records_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let services = services(tmp.path());
        let result = issue(&services, issue_args(Vec::new(), tmp.path().into()), false).await;
        assert!(matches!(result, Err(CertwerkError::Config(_))));
    }

    #[tokio::test]
    async fn qr_refuses_text_that_is_not_a_token() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("qr.png");
        let result = write_qr("hello", 200, &out).await;
        assert!(matches!(result, Err(CertwerkError::MalformedToken(_))));
        assert!(!out.exists());

        let token = encode_token("BC-1", RecordType::Birth, "a", None, Utc::now()).unwrap();
        write_qr(&token, 200, &out).await.unwrap();
        let png = image::open(&out).unwrap();
        assert_eq!((png.width(), png.height()), (200, 200));
    }
}
