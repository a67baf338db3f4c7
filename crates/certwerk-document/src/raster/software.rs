// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CPU raster backend built on `imageproc`.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use certwerk_core::error::{CertwerkError, Result};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect as PixelRect;
use tracing::{debug, instrument};

use super::{CaptureOptions, RasterBackend};
use crate::view::{Color, Element, Rect, ViewSnapshot};

/// Largest canvas the backend will allocate (width x height), ~ 8K x 8K.
pub const DEFAULT_MAX_CANVAS_PIXELS: u64 = 64 * 1024 * 1024;

/// Paints fills, borders, images and text with `imageproc`.
///
/// Text needs a font. Without one, a snapshot carrying text fails with a
/// permanent `Capture` error unless the backend is in layout-only mode.
#[derive(Clone)]
pub struct SoftwareBackend {
    font: Option<FontArc>,
    max_canvas_pixels: u64,
    layout_only: bool,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            font: None,
            max_canvas_pixels: DEFAULT_MAX_CANVAS_PIXELS,
            layout_only: false,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn with_font_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let font = FontArc::try_from_vec(bytes).map_err(|err| {
            CertwerkError::Config(format!(
                "{} is not a usable font: {err}",
                path.as_ref().display()
            ))
        })?;
        Ok(self.with_font(font))
    }

    pub fn with_max_canvas_pixels(mut self, max: u64) -> Self {
        self.max_canvas_pixels = max;
        self
    }

    /// Paint boxes and images only, leaving text out when no font is loaded.
    pub fn layout_only(mut self) -> Self {
        self.layout_only = true;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Text elements that would go unpainted for lack of a font.
    fn unpaintable_text(&self, snapshot: &ViewSnapshot) -> usize {
        if self.font.is_some() {
            return 0;
        }
        snapshot
            .elements
            .iter()
            .filter(|element| matches!(element, Element::Text { content, .. } if !content.is_empty()))
            .count()
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn pixel(color: &Color) -> Result<Rgba<u8>> {
    color
        .to_rgba()
        .ok_or_else(|| CertwerkError::Capture(format!("unsupported colour format: {color}")))
}

/// Scale a view rect to canvas pixels; `None` when it covers no pixel.
fn to_pixels(rect: &Rect, scale: f32) -> Option<PixelRect> {
    let x = (rect.x * scale).round();
    let y = (rect.y * scale).round();
    let w = (rect.width * scale).round();
    let h = (rect.height * scale).round();
    if w < 1.0 || h < 1.0 {
        return None;
    }
    Some(PixelRect::at(x as i32, y as i32).of_size(w as u32, h as u32))
}

impl RasterBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    #[instrument(skip_all, fields(elements = snapshot.elements.len(), scale = options.scale))]
    fn rasterize(&self, snapshot: &ViewSnapshot, options: &CaptureOptions) -> Result<RgbaImage> {
        let scale = options.scale;
        let width = (snapshot.width as f32 * scale).round() as u32;
        let height = (snapshot.height as f32 * scale).round() as u32;
        if width == 0 || height == 0 {
            return Err(super::zero_area_error(width, height));
        }
        let area = u64::from(width) * u64::from(height);
        if area > self.max_canvas_pixels {
            return Err(CertwerkError::Capture(format!(
                "canvas of {width}x{height} exceeds the {} pixel limit",
                self.max_canvas_pixels
            )));
        }
        let skipped_text = self.unpaintable_text(snapshot);
        if skipped_text > 0 && !self.layout_only {
            return Err(super::missing_font_error(skipped_text));
        }

        let mut canvas = RgbaImage::from_pixel(width, height, pixel(&snapshot.background)?);

        for element in &snapshot.elements {
            match element {
                Element::Fill { rect, color } => {
                    if let Some(area) = to_pixels(rect, scale) {
                        draw_filled_rect_mut(&mut canvas, area, pixel(color)?);
                    }
                }
                Element::Border {
                    rect,
                    color,
                    thickness,
                } => {
                    let ink = pixel(color)?;
                    let t = thickness.min(rect.width / 2.0).min(rect.height / 2.0);
                    let edges = [
                        Rect::new(rect.x, rect.y, rect.width, t),
                        Rect::new(rect.x, rect.y + rect.height - t, rect.width, t),
                        Rect::new(rect.x, rect.y, t, rect.height),
                        Rect::new(rect.x + rect.width - t, rect.y, t, rect.height),
                    ];
                    for edge in edges.iter().filter_map(|edge| to_pixels(edge, scale)) {
                        draw_filled_rect_mut(&mut canvas, edge, ink);
                    }
                }
                Element::Text {
                    x,
                    y,
                    size,
                    color,
                    content,
                } => {
                    let ink = pixel(color)?;
                    match &self.font {
                        Some(font) if !content.is_empty() => draw_text_mut(
                            &mut canvas,
                            ink,
                            (x * scale).round() as i32,
                            (y * scale).round() as i32,
                            PxScale::from(size * scale),
                            font,
                            content,
                        ),
                        _ => {}
                    }
                }
                Element::Image { rect, image, .. } => {
                    let (Some(image), Some(area)) = (image, to_pixels(rect, scale)) else {
                        continue;
                    };
                    let fitted = imageops::resize(
                        &image.to_rgba8(),
                        area.width(),
                        area.height(),
                        FilterType::Nearest,
                    );
                    imageops::overlay(
                        &mut canvas,
                        &fitted,
                        i64::from(area.left()),
                        i64::from(area.top()),
                    );
                }
            }
        }

        if skipped_text > 0 {
            debug!(skipped_text, "layout only, text elements not painted");
        }
        Ok(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma};
    use std::sync::Arc;

    fn opts(scale: f32) -> CaptureOptions {
        CaptureOptions::high(scale)
    }

    #[test]
    fn paints_background_and_fill() {
        let mut snapshot = ViewSnapshot::new(10, 10);
        snapshot.push(Element::Fill {
            rect: Rect::new(2.0, 2.0, 3.0, 3.0),
            color: Color::Rgb(0x00, 0x96, 0x39),
        });
        let canvas = SoftwareBackend::new().rasterize(&snapshot, &opts(2.0)).unwrap();
        assert_eq!(canvas.dimensions(), (20, 20));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([0xFF, 0xFF, 0xFF, 0xFF]));
        assert_eq!(*canvas.get_pixel(5, 5), Rgba([0x00, 0x96, 0x39, 0xFF]));
    }

    #[test]
    fn border_leaves_the_inside_clear() {
        let mut snapshot = ViewSnapshot::new(20, 20);
        snapshot.push(Element::Border {
            rect: Rect::new(0.0, 0.0, 20.0, 20.0),
            color: Color::BLACK,
            thickness: 2.0,
        });
        let canvas = SoftwareBackend::new().rasterize(&snapshot, &opts(1.0)).unwrap();
        assert_eq!(canvas.get_pixel(0, 10)[0], 0x00);
        assert_eq!(canvas.get_pixel(19, 10)[0], 0x00);
        assert_eq!(canvas.get_pixel(10, 10)[0], 0xFF);
    }

    #[test]
    fn images_are_scaled_into_their_box() {
        let black = GrayImage::from_pixel(2, 2, Luma([0]));
        let mut snapshot = ViewSnapshot::new(10, 10);
        snapshot.push(Element::Image {
            rect: Rect::new(5.0, 5.0, 5.0, 5.0),
            slot: None,
            image: Some(Arc::new(DynamicImage::ImageLuma8(black))),
        });
        let canvas = SoftwareBackend::new().rasterize(&snapshot, &opts(1.0)).unwrap();
        assert_eq!(canvas.get_pixel(9, 9)[0], 0x00);
        assert_eq!(canvas.get_pixel(4, 4)[0], 0xFF);
    }

    #[test]
    fn degenerate_rects_are_skipped() {
        let mut snapshot = ViewSnapshot::new(10, 10);
        snapshot.push(Element::Fill {
            rect: Rect::new(1.0, 1.0, 0.0, 5.0),
            color: Color::BLACK,
        });
        assert!(SoftwareBackend::new().rasterize(&snapshot, &opts(1.0)).is_ok());
    }

    #[test]
    fn oklch_is_rejected() {
        let snapshot = ViewSnapshot::new(4, 4).with_background(Color::Oklch {
            l: 0.9,
            c: 0.0,
            h: 0.0,
        });
        let result = SoftwareBackend::new().rasterize(&snapshot, &opts(1.0));
        assert!(matches!(result, Err(CertwerkError::Capture(_))));
    }

    #[test]
    fn oversized_canvas_is_rejected() {
        let backend = SoftwareBackend::new().with_max_canvas_pixels(100);
        let result = backend.rasterize(&ViewSnapshot::new(20, 20), &opts(1.0));
        assert!(matches!(result, Err(CertwerkError::Capture(_))));
    }

    fn text_snapshot(content: &str) -> ViewSnapshot {
        let mut snapshot = ViewSnapshot::new(10, 10);
        snapshot.push(Element::Text {
            x: 0.0,
            y: 0.0,
            size: 8.0,
            color: Color::BLACK,
            content: content.into(),
        });
        snapshot
    }

    #[test]
    fn text_without_font_fails() {
        let backend = SoftwareBackend::new();
        assert!(!backend.has_font());
        let err = backend.rasterize(&text_snapshot("A"), &opts(1.0)).unwrap_err();
        assert!(crate::raster::is_missing_font(&err));
    }

    #[test]
    fn layout_only_skips_text_without_font() {
        let backend = SoftwareBackend::new().layout_only();
        let canvas = backend.rasterize(&text_snapshot("A"), &opts(1.0)).unwrap();
        assert!(canvas.pixels().all(|p| p[0] == 0xFF));
    }

    #[test]
    fn empty_text_needs_no_font() {
        let canvas = SoftwareBackend::new()
            .rasterize(&text_snapshot(""), &opts(1.0))
            .unwrap();
        assert_eq!(canvas.dimensions(), (10, 10));
    }
}
