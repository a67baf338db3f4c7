// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Issuer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CertwerkError, Result};
use crate::{PageFit, PaperSize, ResolvedStrategy};

/// Persistent settings for certificate issuing.
///
/// Every field has a default, so a config file only needs to list what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Paper size of generated PDF pages.
    pub paper_size: PaperSize,
    /// Margin kept clear on every side of a page, in millimetres.
    pub margin_mm: f32,
    /// How captured rasters are placed onto pages.
    pub page_fit: PageFit,
    /// Edge length of the rendered verification QR code, in pixels.
    pub qr_size_px: u32,
    /// Scale factor of the first, high-fidelity capture attempt.
    pub capture_scale: f32,
    /// Scale factor of the single reduced-fidelity retry.
    pub reduced_capture_scale: f32,
    /// What `Strategy::Auto` resolves to.
    pub auto_strategy: ResolvedStrategy,
    /// Refuse to issue certificates that cannot carry a verification token.
    pub require_token: bool,
    /// Issuing authority, embedded as the PDF author and printed on the view.
    pub authority_name: String,
    /// PDF creator field.
    pub creator: String,
    /// Record every download in the audit trail.
    pub audit_enabled: bool,
    /// Pause between items of a batch download, in milliseconds.
    pub batch_pause_ms: u64,
    /// Base URL of the registry REST API.
    pub registry_url: String,
    /// Registry request timeout, in seconds.
    pub registry_timeout_secs: u64,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            paper_size: PaperSize::A4,
            margin_mm: 10.0,
            page_fit: PageFit::SinglePage,
            qr_size_px: 200,
            capture_scale: 2.0,
            reduced_capture_scale: 1.0,
            auto_strategy: ResolvedStrategy::ProgrammaticCapture,
            require_token: false,
            authority_name: "Civil Registration Authority".into(),
            creator: "Certwerk".into(),
            audit_enabled: true,
            batch_pause_ms: 500,
            registry_url: "http://localhost:5000/api".into(),
            registry_timeout_secs: 30,
        }
    }
}

impl IssuerConfig {
    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values that would make layout or capture meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(self.margin_mm >= 0.0) {
            return Err(CertwerkError::Config("margin_mm must be non-negative".into()));
        }
        let (w, h) = self.paper_size.dimensions_mm();
        if self.margin_mm * 2.0 >= w.min(h) as f32 {
            return Err(CertwerkError::Config(format!(
                "margin of {}mm leaves no printable area on {w}x{h}mm paper",
                self.margin_mm
            )));
        }
        if self.qr_size_px == 0 {
            return Err(CertwerkError::Config("qr_size_px must be positive".into()));
        }
        if !(self.capture_scale > 0.0) || !(self.reduced_capture_scale > 0.0) {
            return Err(CertwerkError::Config("capture scales must be positive".into()));
        }
        if self.reduced_capture_scale > self.capture_scale {
            return Err(CertwerkError::Config(
                "reduced_capture_scale must not exceed capture_scale".into(),
            ));
        }
        Ok(())
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(IssuerConfig::default().validate().is_ok());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = IssuerConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, IssuerConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_listed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "qr_size_px": 320, "auto_strategy": "native_print" }"#).unwrap();
        let config = IssuerConfig::load(&path).unwrap();
        assert_eq!(config.qr_size_px, 320);
        assert_eq!(config.auto_strategy, ResolvedStrategy::NativePrint);
        assert_eq!(config.margin_mm, 10.0);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = IssuerConfig {
            page_fit: PageFit::FitWidth,
            require_token: true,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(IssuerConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn oversized_margin_is_rejected() {
        let config = IssuerConfig {
            margin_mm: 120.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CertwerkError::Config(_))));
    }

    #[test]
    fn reduced_scale_above_full_scale_is_rejected() {
        let config = IssuerConfig {
            reduced_capture_scale: 3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
