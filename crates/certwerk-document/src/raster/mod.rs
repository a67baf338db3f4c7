// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document rasterizer: turn a view snapshot into a fixed bitmap.
//
// Sampling itself is delegated to a `RasterBackend`; this module owns the
// steps every backend relies on: dimension checks, waiting for pending image
// loads, colour normalization, and moving the CPU-bound work off the async
// runtime.

pub mod software;

use std::sync::Arc;

use certwerk_core::error::{CertwerkError, Result};
use image::RgbaImage;
use tracing::{debug, info, instrument, warn};

use crate::view::ViewSnapshot;

/// Capture quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    High,
    Reduced,
}

/// Settings for one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    pub fidelity: Fidelity,
    /// Output pixels per view pixel.
    pub scale: f32,
    /// Convert colours the backend cannot paint before sampling.
    pub normalize_colors: bool,
}

impl CaptureOptions {
    pub fn high(scale: f32) -> Self {
        Self {
            fidelity: Fidelity::High,
            scale,
            normalize_colors: true,
        }
    }

    pub fn reduced(scale: f32) -> Self {
        Self {
            fidelity: Fidelity::Reduced,
            scale,
            normalize_colors: true,
        }
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::high(2.0)
    }
}

/// A captured bitmap and the scale it was sampled at.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub pixels: RgbaImage,
    pub scale: f32,
}

impl RasterImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Size of the view this was captured from, in view pixels.
    pub fn view_size(&self) -> (f32, f32) {
        (
            self.width() as f32 / self.scale,
            self.height() as f32 / self.scale,
        )
    }
}

/// Something that can paint a settled snapshot into pixels.
///
/// Called on the blocking pool; implementations may be slow.
pub trait RasterBackend: Send + Sync {
    fn name(&self) -> &str;

    fn rasterize(&self, snapshot: &ViewSnapshot, options: &CaptureOptions) -> Result<RgbaImage>;
}

/// Front end that prepares snapshots and drives a backend.
#[derive(Clone)]
pub struct Rasterizer {
    backend: Arc<dyn RasterBackend>,
}

impl Rasterizer {
    pub fn new(backend: Arc<dyn RasterBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Capture `snapshot` at the given options.
    ///
    /// A zero-width or zero-height snapshot fails with `Capture` before any
    /// work is done.
    #[instrument(skip(self, snapshot), fields(backend = self.backend.name(), width = snapshot.width, height = snapshot.height, scale = options.scale))]
    pub async fn capture(
        &self,
        mut snapshot: ViewSnapshot,
        options: CaptureOptions,
    ) -> Result<RasterImage> {
        if snapshot.has_zero_area() {
            return Err(zero_area_error(snapshot.width, snapshot.height));
        }
        if !(options.scale > 0.0) {
            return Err(CertwerkError::Capture(format!(
                "invalid capture scale {}",
                options.scale
            )));
        }

        snapshot.settle().await?;

        if options.normalize_colors {
            let converted = snapshot.normalize_colors();
            if converted > 0 {
                debug!(converted, "normalized unsupported colours");
            }
        } else if snapshot.unsupported_colors() > 0 {
            warn!("snapshot carries colours the backend may reject");
        }

        let backend = Arc::clone(&self.backend);
        let pixels = tokio::task::spawn_blocking(move || backend.rasterize(&snapshot, &options))
            .await
            .map_err(|err| CertwerkError::Capture(format!("rasterization task failed: {err}")))??;

        info!(
            width = pixels.width(),
            height = pixels.height(),
            fidelity = ?options.fidelity,
            "view captured"
        );
        Ok(RasterImage {
            pixels,
            scale: options.scale,
        })
    }
}

/// The error reported for a view with no area. Never worth retrying.
pub fn zero_area_error(width: u32, height: u32) -> CertwerkError {
    CertwerkError::Capture(format!("view has zero area ({width}x{height})"))
}

/// Whether `err` is the zero-area capture failure.
pub fn is_zero_area(err: &CertwerkError) -> bool {
    matches!(err, CertwerkError::Capture(msg) if msg.starts_with("view has zero area"))
}

/// The error reported when text would go unpainted for lack of a font.
pub fn missing_font_error(unpainted: usize) -> CertwerkError {
    CertwerkError::Capture(format!(
        "no font loaded, {unpainted} text element(s) cannot be painted"
    ))
}

/// Whether `err` is the missing-font capture failure.
pub fn is_missing_font(err: &CertwerkError) -> bool {
    matches!(err, CertwerkError::Capture(msg) if msg.starts_with("no font loaded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Color, Element, Rect};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records what it was asked to paint.
    struct Probe {
        calls: AtomicUsize,
    }

    impl RasterBackend for Probe {
        fn name(&self) -> &str {
            "probe"
        }

        fn rasterize(&self, snapshot: &ViewSnapshot, options: &CaptureOptions) -> Result<RgbaImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if snapshot.unsupported_colors() > 0 {
                return Err(CertwerkError::Capture("unsupported colour".into()));
            }
            let w = (snapshot.width as f32 * options.scale) as u32;
            let h = (snapshot.height as f32 * options.scale) as u32;
            Ok(RgbaImage::new(w, h))
        }
    }

    fn probe() -> (Arc<Probe>, Rasterizer) {
        let backend = Arc::new(Probe {
            calls: AtomicUsize::new(0),
        });
        (Arc::clone(&backend), Rasterizer::new(backend))
    }

    #[tokio::test]
    async fn zero_width_view_fails_without_sampling() {
        let (backend, rasterizer) = probe();
        let err = rasterizer
            .capture(ViewSnapshot::new(0, 100), CaptureOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CertwerkError::Capture(_)));
        assert!(is_zero_area(&err));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn capture_scales_output() {
        let (_, rasterizer) = probe();
        let raster = rasterizer
            .capture(ViewSnapshot::new(100, 50), CaptureOptions::high(2.0))
            .await
            .unwrap();
        assert_eq!((raster.width(), raster.height()), (200, 100));
        assert_eq!(raster.view_size(), (100.0, 50.0));
    }

    #[tokio::test]
    async fn oklch_is_normalized_before_sampling() {
        let (_, rasterizer) = probe();
        let mut snapshot = ViewSnapshot::new(10, 10);
        snapshot.push(Element::Fill {
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            color: Color::Oklch { l: 0.5, c: 0.1, h: 200.0 },
        });

        assert!(rasterizer.capture(snapshot.clone(), CaptureOptions::high(1.0)).await.is_ok());

        let raw = CaptureOptions {
            normalize_colors: false,
            ..CaptureOptions::high(1.0)
        };
        assert!(rasterizer.capture(snapshot, raw).await.is_err());
    }

    #[tokio::test]
    async fn non_positive_scale_is_rejected() {
        let (_, rasterizer) = probe();
        let result = rasterizer
            .capture(ViewSnapshot::new(10, 10), CaptureOptions::high(0.0))
            .await;
        assert!(matches!(result, Err(CertwerkError::Capture(_))));
    }
}
