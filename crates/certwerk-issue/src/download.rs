// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Download orchestrator.
//
// Programmatic capture runs token encode -> QR render -> capture -> package,
// with one reduced-fidelity retry of the capture. Native print embeds the
// token the same way and hands the settled snapshot to the print facility.
// Errors never cross `download`: they come back inside `DownloadOutcome`
// together with a message that can be shown as-is.

use std::sync::{Arc, Mutex};

use certwerk_core::config::IssuerConfig;
use certwerk_core::error::{CertwerkError, ErrorKind, Result};
use certwerk_core::human_errors::humanize_error;
use certwerk_core::types::{
    Artifact, CertificateRecord, DownloadId, ResolvedStrategy, Strategy, VerificationPayload,
};
use certwerk_document::pdf::ArtifactMetadata;
use certwerk_document::raster::{RasterBackend, zero_area_error};
use certwerk_document::{
    ArtifactPackager, CaptureOptions, DocumentView, QR_SLOT, RasterImage, Rasterizer,
    ViewSnapshot, qr,
};
use certwerk_security::audit::{AuditEvent, AuditLog};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::facility::{PrintFacility, UnavailablePrintFacility};
use crate::filename::{artifact_filename, artifact_title};
use crate::retry::{RetryDecision, should_retry};

pub const PRINT_MESSAGE: &str = "Print dialog opened. Select \"Save as PDF\" to download.";
pub const CAPTURE_MESSAGE: &str = "Certificate downloaded successfully";

/// Result of one download request.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub id: DownloadId,
    pub success: bool,
    pub method: ResolvedStrategy,
    pub filename: Option<String>,
    #[serde(skip)]
    pub artifact: Option<Artifact>,
    /// SHA-256 of the artifact bytes.
    pub artifact_hash: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// Technical detail of the failure.
    pub error: Option<String>,
    /// Text for the user.
    pub message: String,
    /// The capture only succeeded at reduced fidelity.
    pub reduced_fidelity: bool,
}

impl DownloadOutcome {
    fn succeeded(method: ResolvedStrategy, message: &str) -> Self {
        Self {
            id: DownloadId::new(),
            success: true,
            method,
            filename: None,
            artifact: None,
            artifact_hash: None,
            error_kind: None,
            error: None,
            message: message.to_owned(),
            reduced_fidelity: false,
        }
    }

    fn failed(method: ResolvedStrategy, err: &CertwerkError) -> Self {
        Self {
            id: DownloadId::new(),
            success: false,
            method,
            filename: None,
            artifact: None,
            artifact_hash: None,
            error_kind: Some(err.kind()),
            error: Some(err.to_string()),
            message: humanize_error(err).one_line(),
            reduced_fidelity: false,
        }
    }
}

/// One entry of a batch download.
pub struct BatchItem<'a> {
    /// Caller's identifier, echoed back in the outcome.
    pub id: String,
    pub view: &'a dyn DocumentView,
    pub record: &'a CertificateRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub item_id: String,
    #[serde(flatten)]
    pub outcome: DownloadOutcome,
}

/// Report a view that cannot be captured before any work is done.
pub fn validate_view(view: &dyn DocumentView) -> Result<()> {
    let (width, height) = view.dimensions();
    if width == 0 || height == 0 {
        return Err(zero_area_error(width, height));
    }
    Ok(())
}

/// Produces certificate artifacts.
pub struct Downloader {
    config: IssuerConfig,
    rasterizer: Rasterizer,
    packager: ArtifactPackager,
    print: Arc<dyn PrintFacility>,
    clock: Arc<dyn Clock>,
    audit: Option<Arc<Mutex<AuditLog>>>,
}

impl Downloader {
    pub fn new(config: IssuerConfig, backend: Arc<dyn RasterBackend>) -> Self {
        Self {
            packager: ArtifactPackager::from_config(&config),
            rasterizer: Rasterizer::new(backend),
            print: Arc::new(UnavailablePrintFacility),
            clock: Arc::new(SystemClock),
            audit: None,
            config,
        }
    }

    pub fn with_print_facility(mut self, print: Arc<dyn PrintFacility>) -> Self {
        self.print = print;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record every download in `audit`.
    ///
    /// Ignored when auditing is disabled in the config.
    pub fn with_audit(mut self, audit: Arc<Mutex<AuditLog>>) -> Self {
        if self.config.audit_enabled {
            self.audit = Some(audit);
        }
        self
    }

    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }

    /// Produce the certificate for `record` from `view` using `strategy`.
    #[instrument(skip(self, view, record), fields(record_type = %record.record_type, id = %record.id))]
    pub async fn download(
        &self,
        view: &dyn DocumentView,
        record: &CertificateRecord,
        strategy: Strategy,
    ) -> DownloadOutcome {
        let method = strategy.resolve(self.config.auto_strategy);
        let generated_at = self.clock.now();
        info!(%method, "download requested");

        let outcome = match method {
            ResolvedStrategy::NativePrint => self
                .native_print(view, record, generated_at)
                .await
                .map(|()| DownloadOutcome::succeeded(method, PRINT_MESSAGE)),
            ResolvedStrategy::ProgrammaticCapture => self
                .programmatic_capture(view, record, generated_at)
                .await
                .map(|(artifact, reduced)| {
                    let mut outcome = DownloadOutcome::succeeded(method, CAPTURE_MESSAGE);
                    outcome.filename = Some(artifact.filename.clone());
                    outcome.artifact_hash = Some(certwerk_security::hash_bytes(&artifact.bytes));
                    outcome.artifact = Some(artifact);
                    outcome.reduced_fidelity = reduced;
                    outcome
                }),
        };

        let outcome = outcome.unwrap_or_else(|err| {
            warn!(%method, error = %err, "download failed");
            DownloadOutcome::failed(method, &err)
        });
        self.record_audit(record, &outcome);
        outcome
    }

    /// Download each item in turn, pausing between items.
    pub async fn download_many(
        &self,
        items: &[BatchItem<'_>],
        strategy: Strategy,
    ) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            if index > 0 && !self.config.batch_pause().is_zero() {
                tokio::time::sleep(self.config.batch_pause()).await;
            }
            let outcome = self.download(item.view, item.record, strategy).await;
            outcomes.push(BatchOutcome {
                item_id: item.id.clone(),
                outcome,
            });
        }
        let succeeded = outcomes.iter().filter(|o| o.outcome.success).count();
        info!(total = outcomes.len(), succeeded, "batch download finished");
        outcomes
    }

    /// Snapshot `view` and queue the verification token image.
    fn prepare_snapshot(
        &self,
        view: &dyn DocumentView,
        record: &CertificateRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<ViewSnapshot> {
        let mut snapshot = view.snapshot();

        if record.certificate_number().is_none() {
            if self.config.require_token {
                return Err(CertwerkError::InvalidPayload(
                    "record has no certificate number to put in a verification token".into(),
                ));
            }
            warn!("record has no certificate number; issuing without a verification token");
            return Ok(snapshot);
        }

        if !snapshot.has_slot(QR_SLOT) {
            if self.config.require_token {
                return Err(CertwerkError::InvalidPayload(format!(
                    "view has no '{QR_SLOT}' slot for the verification token"
                )));
            }
            warn!("view has no QR slot; issuing without a verification token");
            return Ok(snapshot);
        }

        let payload = VerificationPayload::for_record(record, generated_at);
        let png = qr::render(&payload, self.config.qr_size_px)?;
        snapshot.attach_image(QR_SLOT, png);
        debug!("verification token queued for embedding");
        Ok(snapshot)
    }

    async fn native_print(
        &self,
        view: &dyn DocumentView,
        record: &CertificateRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut snapshot = self.prepare_snapshot(view, record, generated_at)?;
        snapshot.settle().await?;
        let title = artifact_title(record.record_type, record.certificate_number());
        self.print.show_print_dialog(&snapshot, &title)?;
        info!(facility = self.print.name(), "print dialog requested");
        Ok(())
    }

    async fn programmatic_capture(
        &self,
        view: &dyn DocumentView,
        record: &CertificateRecord,
        generated_at: DateTime<Utc>,
    ) -> Result<(Artifact, bool)> {
        validate_view(view)?;
        let mut snapshot = self.prepare_snapshot(view, record, generated_at)?;
        snapshot.settle().await?;

        let (raster, reduced) = self.capture_with_retry(snapshot).await?;

        let number = record.certificate_number();
        let metadata = ArtifactMetadata {
            title: artifact_title(record.record_type, number),
            subject: record.record_type.display_name().to_owned(),
            author: self.config.authority_name.clone(),
            creator: self.config.creator.clone(),
            filename: artifact_filename(record.record_type, number, generated_at.date_naive()),
        };

        let packager = self.packager;
        let artifact = tokio::task::spawn_blocking(move || packager.pack(&raster, &metadata))
            .await
            .map_err(|err| CertwerkError::Packaging(format!("packaging task failed: {err}")))??;

        info!(filename = %artifact.filename, bytes = artifact.len(), reduced, "certificate captured");
        Ok((artifact, reduced))
    }

    async fn capture_with_retry(&self, snapshot: ViewSnapshot) -> Result<(RasterImage, bool)> {
        let high = CaptureOptions::high(self.config.capture_scale);
        let first = self.rasterizer.capture(snapshot.clone(), high).await;
        let err = match first {
            Ok(raster) => return Ok((raster, false)),
            Err(err) => err,
        };

        match should_retry(&err, 1) {
            RetryDecision::RetryReduced => {
                warn!(error = %err, scale = self.config.reduced_capture_scale, "capture failed, retrying at reduced fidelity");
                let reduced = CaptureOptions::reduced(self.config.reduced_capture_scale);
                self.rasterizer
                    .capture(snapshot, reduced)
                    .await
                    .map(|raster| (raster, true))
            }
            RetryDecision::GiveUp(_) | RetryDecision::Exhausted => Err(err),
        }
    }

    fn record_audit(&self, record: &CertificateRecord, outcome: &DownloadOutcome) {
        let Some(audit) = &self.audit else {
            return;
        };
        let action = match outcome.method {
            ResolvedStrategy::NativePrint => "download_print",
            ResolvedStrategy::ProgrammaticCapture => "download_capture",
        };
        let details = if outcome.success {
            outcome
                .reduced_fidelity
                .then_some("captured at reduced fidelity")
        } else {
            outcome.error.as_deref()
        };
        let event = AuditEvent {
            action,
            certificate_number: record.certificate_number().unwrap_or_default(),
            record_type: record.record_type,
            artifact_hash: outcome.artifact_hash.as_deref(),
            success: outcome.success,
            details,
        };

        let result = match audit.lock() {
            Ok(log) => log.record(&event),
            Err(_) => Err(CertwerkError::Database("audit log lock poisoned".into())),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to record download in audit log");
        }
    }
}
