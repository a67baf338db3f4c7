// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scannable token renderer: QR code PNGs for verification tokens.
//
// Error correction is fixed at level H so a certificate stays scannable with
// up to ~30% of the symbol damaged (folds, stamps, staples). The symbol is
// surrounded by a one-module quiet zone and stretched to exactly
// `size` x `size` pixels.

use std::io::Cursor;

use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::types::VerificationPayload;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use tracing::{debug, instrument};

/// Modules of light border drawn around the symbol.
const QUIET_ZONE: usize = 1;

/// Render the verification token for `payload` as a PNG.
#[instrument(skip(payload), fields(cert = payload.certificate_number(), size))]
pub fn render(payload: &VerificationPayload, size: u32) -> Result<Vec<u8>> {
    let token = certwerk_security::encode(payload)?;
    render_token(&token, size)
}

/// Render an already-encoded token string as a PNG.
pub fn render_token(token: &str, size: u32) -> Result<Vec<u8>> {
    let image = render_image(token, size)?;
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| CertwerkError::Render(format!("PNG encoding failed: {err}")))?;
    debug!(png_bytes = bytes.len(), "QR code rendered");
    Ok(bytes)
}

/// Render `token` as a `size` x `size` greyscale bitmap.
pub fn render_image(token: &str, size: u32) -> Result<GrayImage> {
    if size == 0 {
        return Err(CertwerkError::Render("QR size must be positive".into()));
    }

    let code = QrCode::with_error_correction_level(token.as_bytes(), EcLevel::H)
        .map_err(|err| CertwerkError::Render(format!("token does not fit a QR code: {err}")))?;
    let symbol = code.width();
    let modules = symbol + 2 * QUIET_ZONE;
    if (size as usize) < modules {
        return Err(CertwerkError::Render(format!(
            "{size}px cannot hold {modules} modules at one pixel each"
        )));
    }

    let colors = code.to_colors();
    let dark_at = |module_x: usize, module_y: usize| -> bool {
        let (Some(x), Some(y)) = (
            module_x.checked_sub(QUIET_ZONE),
            module_y.checked_sub(QUIET_ZONE),
        ) else {
            return false;
        };
        x < symbol && y < symbol && colors[y * symbol + x] == qrcode::Color::Dark
    };

    let edge = size as usize;
    let image = GrayImage::from_fn(size, size, |px, py| {
        let module_x = px as usize * modules / edge;
        let module_y = py as usize * modules / edge;
        if dark_at(module_x, module_y) {
            Luma([0x00])
        } else {
            Luma([0xFF])
        }
    });

    debug!(version_width = symbol, modules, size, "QR symbol laid out");
    Ok(image)
}
