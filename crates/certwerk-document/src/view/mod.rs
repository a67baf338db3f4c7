// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document view model.
//
// A `DocumentView` is owned by the caller and only ever read: the engine asks
// it for a `ViewSnapshot`, an owned copy it can freely modify (attach the
// verification token, normalize colours) and then hand to a rasterizer or the
// print facility. Images attached to a snapshot are decoded lazily; `settle`
// is the single point where all pending loads resolve.

pub mod certificate;
pub mod color;

use std::sync::Arc;

use certwerk_core::error::{CertwerkError, Result};
use image::DynamicImage;
use tracing::{debug, instrument};

pub use color::Color;

/// Axis-aligned rectangle in view (CSS pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink by `amount` on every side.
    pub fn inset(&self, amount: f32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            width: (self.width - 2.0 * amount).max(0.0),
            height: (self.height - 2.0 * amount).max(0.0),
        }
    }
}

/// One drawing instruction, painted in order.
#[derive(Debug, Clone)]
pub enum Element {
    Fill {
        rect: Rect,
        color: Color,
    },
    Border {
        rect: Rect,
        color: Color,
        thickness: f32,
    },
    /// Single line of text; `(x, y)` is the top-left of the line box.
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: Color,
        content: String,
    },
    /// An image box. `slot` names boxes whose content is supplied later.
    Image {
        rect: Rect,
        slot: Option<String>,
        image: Option<Arc<DynamicImage>>,
    },
}

/// Encoded image bytes waiting to be decoded into a slot.
#[derive(Debug, Clone)]
struct PendingImage {
    slot: String,
    bytes: Vec<u8>,
}

/// An owned, laid-out copy of a document view.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub elements: Vec<Element>,
    pending: Vec<PendingImage>,
}

impl ViewSnapshot {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Color::WHITE,
            elements: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn push(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    pub fn has_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn has_slot(&self, name: &str) -> bool {
        self.elements.iter().any(|element| {
            matches!(element, Element::Image { slot: Some(slot), .. } if slot == name)
        })
    }

    /// Queue encoded image bytes for the named slot.
    ///
    /// Returns `false` (and queues nothing) when the view has no such slot.
    pub fn attach_image(&mut self, slot: &str, bytes: Vec<u8>) -> bool {
        if !self.has_slot(slot) {
            return false;
        }
        self.pending.push(PendingImage {
            slot: slot.to_owned(),
            bytes,
        });
        true
    }

    /// Number of image loads not yet resolved.
    pub fn pending_loads(&self) -> usize {
        self.pending.len()
    }

    /// Decode every pending image on the blocking pool and install the
    /// results into their slots.
    ///
    /// Sampling a snapshot before this returns silently drops those images.
    #[instrument(skip(self), fields(pending = self.pending.len()))]
    pub async fn settle(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let handles: Vec<_> = self
            .pending
            .drain(..)
            .map(|pending| {
                let slot = pending.slot;
                let handle = tokio::task::spawn_blocking(move || {
                    image::load_from_memory(&pending.bytes)
                });
                (slot, handle)
            })
            .collect();

        for (slot, handle) in handles {
            let decoded = handle
                .await
                .map_err(|err| CertwerkError::Capture(format!("image load task failed: {err}")))?
                .map_err(|err| {
                    CertwerkError::Capture(format!("image for slot '{slot}' failed to load: {err}"))
                })?;
            debug!(slot, width = decoded.width(), height = decoded.height(), "slot image loaded");
            self.install(&slot, Arc::new(decoded));
        }
        Ok(())
    }

    fn install(&mut self, name: &str, decoded: Arc<DynamicImage>) {
        for element in &mut self.elements {
            if let Element::Image {
                slot: Some(slot),
                image,
                ..
            } = element
            {
                if slot == name {
                    *image = Some(Arc::clone(&decoded));
                }
            }
        }
    }

    /// Colours a plain sRGB backend cannot paint.
    pub fn unsupported_colors(&self) -> usize {
        let background = usize::from(!self.background.is_srgb());
        background
            + self
                .elements
                .iter()
                .filter(|element| match element {
                    Element::Fill { color, .. }
                    | Element::Border { color, .. }
                    | Element::Text { color, .. } => !color.is_srgb(),
                    Element::Image { .. } => false,
                })
                .count()
    }

    /// Rewrite every colour to sRGB. Returns how many were converted.
    pub fn normalize_colors(&mut self) -> usize {
        let mut converted = 0;
        let mut fix = |color: &mut Color| {
            if !color.is_srgb() {
                *color = color.normalized();
                converted += 1;
            }
        };
        fix(&mut self.background);
        for element in &mut self.elements {
            match element {
                Element::Fill { color, .. }
                | Element::Border { color, .. }
                | Element::Text { color, .. } => fix(color),
                Element::Image { .. } => {}
            }
        }
        converted
    }
}

/// A renderable surface owned by the embedding application.
///
/// Implementations must return a fresh, independent copy from `snapshot`;
/// nothing the engine does to a snapshot may reach the view.
pub trait DocumentView: Send + Sync {
    fn snapshot(&self) -> ViewSnapshot;

    /// Laid-out size in view pixels.
    fn dimensions(&self) -> (u32, u32) {
        let snapshot = self.snapshot();
        (snapshot.width, snapshot.height)
    }
}

impl DocumentView for ViewSnapshot {
    fn snapshot(&self) -> ViewSnapshot {
        self.clone()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn view_with_slot() -> ViewSnapshot {
        let mut view = ViewSnapshot::new(100, 100);
        view.push(Element::Image {
            rect: Rect::new(10.0, 10.0, 20.0, 20.0),
            slot: Some("qr-code".into()),
            image: None,
        });
        view
    }

    #[test]
    fn attach_requires_a_matching_slot() {
        let mut view = view_with_slot();
        assert!(!view.attach_image("signature", png(2, 2)));
        assert!(view.attach_image("qr-code", png(2, 2)));
        assert_eq!(view.pending_loads(), 1);
    }

    #[tokio::test]
    async fn settle_installs_pending_images() {
        let mut view = view_with_slot();
        view.attach_image("qr-code", png(4, 3));
        view.settle().await.unwrap();
        assert_eq!(view.pending_loads(), 0);
        match &view.elements[0] {
            Element::Image { image: Some(img), .. } => {
                assert_eq!((img.width(), img.height()), (4, 3));
            }
            other => panic!("slot not filled: {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_image_is_a_capture_error() {
        let mut view = view_with_slot();
        view.attach_image("qr-code", b"definitely not a png".to_vec());
        assert!(matches!(view.settle().await, Err(CertwerkError::Capture(_))));
    }

    #[test]
    fn snapshot_is_independent_of_the_view() {
        let view = view_with_slot();
        let mut copy = view.snapshot();
        copy.attach_image("qr-code", png(1, 1));
        copy.push(Element::Fill {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Color::BLACK,
        });
        assert_eq!(view.pending_loads(), 0);
        assert_eq!(view.elements.len(), 1);
    }

    #[test]
    fn normalize_rewrites_oklch_only() {
        let mut view = ViewSnapshot::new(10, 10).with_background(Color::Oklch {
            l: 1.0,
            c: 0.0,
            h: 0.0,
        });
        view.push(Element::Text {
            x: 0.0,
            y: 0.0,
            size: 12.0,
            color: Color::Oklch { l: 0.0, c: 0.0, h: 0.0 },
            content: "x".into(),
        });
        view.push(Element::Fill {
            rect: Rect::new(0.0, 0.0, 5.0, 5.0),
            color: Color::BLACK,
        });
        assert_eq!(view.unsupported_colors(), 2);
        assert_eq!(view.normalize_colors(), 2);
        assert_eq!(view.unsupported_colors(), 0);
        assert_eq!(view.background, Color::WHITE);
    }

    #[test]
    fn inset_never_goes_negative() {
        let rect = Rect::new(0.0, 0.0, 4.0, 4.0).inset(3.0);
        assert_eq!(rect.width, 0.0);
        assert_eq!(rect.x, 3.0);
    }
}
