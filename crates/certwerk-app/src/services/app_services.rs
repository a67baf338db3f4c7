// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: loads the configuration, opens the audit trail and
// builds the downloader and registry client the commands use.
//
// `AuditLog` wraps a rusqlite connection, which is `Send` but not `Sync`, so
// it is shared as `Arc<Mutex<_>>`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use certwerk_core::config::IssuerConfig;
use certwerk_core::error::{CertwerkError, Result};
use certwerk_document::SoftwareBackend;
use certwerk_issue::Downloader;
use certwerk_records::{BearerAuth, LogNotifier, NotifyOnError, RecordsClient, RequestTimestamp};
use certwerk_security::audit::{AuditEntry, AuditLog};
use certwerk_security::integrity::{hash_bytes, verify_hash};
use tracing::info;

use super::data_dir;

pub const CONFIG_FILE: &str = "config.json";
pub const AUDIT_DB: &str = "audit.db";

/// Environment variable holding the registry bearer token.
pub const API_TOKEN_ENV: &str = "CERTWERK_API_TOKEN";

pub struct AppServices {
    data_dir: PathBuf,
    config: IssuerConfig,
    audit_log: Arc<Mutex<AuditLog>>,
}

impl AppServices {
    /// Resolve the data directory, load `config.json` (defaults when absent)
    /// and open the audit database.
    pub fn init(data_dir_override: Option<&Path>) -> Result<Self> {
        let dir = data_dir::data_dir(data_dir_override)?;
        info!(path = %dir.display(), "initialising app services");

        let config = IssuerConfig::load(dir.join(CONFIG_FILE))?;
        let audit_log = AuditLog::open(dir.join(AUDIT_DB))?;

        Ok(Self {
            data_dir: dir,
            config,
            audit_log: Arc::new(Mutex::new(audit_log)),
        })
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Downloader over the software rasterizer, audited.
    ///
    /// Without `font`, capturing a certificate with text fails unless
    /// `layout_only` asks for the text to be left out.
    pub fn downloader(&self, font: Option<&Path>, layout_only: bool) -> Result<Downloader> {
        let mut backend = match font {
            Some(path) => SoftwareBackend::new().with_font_file(path)?,
            None => SoftwareBackend::new(),
        };
        if layout_only {
            backend = backend.layout_only();
        }
        Ok(Downloader::new(self.config.clone(), Arc::new(backend)).with_audit(self.audit_log.clone()))
    }

    /// Registry client from the config, overriding the base URL when asked.
    pub fn records_client(&self, base_url: Option<&str>) -> Result<RecordsClient> {
        let mut builder = match base_url {
            Some(url) => RecordsClient::builder(url).timeout(self.config.registry_timeout()),
            None => RecordsClient::builder_from_config(&self.config),
        };
        if let Some(token) = std::env::var(API_TOKEN_ENV).ok().filter(|t| !t.is_empty()) {
            builder = builder.with(BearerAuth::new(token));
        }
        builder
            .with(RequestTimestamp)
            .with(NotifyOnError::new(Arc::new(LogNotifier)))
            .build()
    }

    /// Latest audit entries, or every entry for one certificate.
    pub fn audit_entries(&self, certificate: Option<&str>, limit: u32) -> Result<Vec<AuditEntry>> {
        let log = self
            .audit_log
            .lock()
            .map_err(|_| CertwerkError::Database("audit log lock poisoned".into()))?;
        match certificate {
            Some(number) => log.entries_for_certificate(number),
            None => log.recent_entries(limit),
        }
    }

    /// Find the successful audit entry whose artifact hash matches `bytes`.
    ///
    /// Fails with `IntegrityMismatch` against the latest recorded hash when no
    /// entry matches, and with `InvalidPayload` when the certificate has never
    /// been issued as an artifact.
    pub fn check_artifact(&self, certificate_number: &str, bytes: &[u8]) -> Result<AuditEntry> {
        let issued: Vec<AuditEntry> = self
            .audit_entries(Some(certificate_number), 0)?
            .into_iter()
            .filter(|entry| entry.success && entry.artifact_hash.is_some())
            .collect();

        if let Some(entry) = issued.iter().rev().find(|entry| {
            entry
                .artifact_hash
                .as_deref()
                .is_some_and(|hash| verify_hash(bytes, hash).is_ok())
        }) {
            return Ok(entry.clone());
        }

        match issued.last().and_then(|entry| entry.artifact_hash.clone()) {
            Some(expected) => Err(CertwerkError::IntegrityMismatch {
                expected,
                actual: hash_bytes(bytes),
            }),
            None => Err(CertwerkError::InvalidPayload(format!(
                "no artifact has been issued for certificate {certificate_number}"
            ))),
        }
    }
}
