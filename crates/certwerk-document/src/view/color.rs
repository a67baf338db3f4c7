// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Colour values carried by view elements.
//
// Style sheets increasingly emit OKLCH colours, which raster backends may not
// understand. `Color::normalized` converts them to sRGB on a cloned snapshot
// before sampling.

use image::Rgba;

/// A colour as declared by the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// 8-bit sRGB.
    Rgb(u8, u8, u8),
    /// OKLCH: lightness 0..=1, chroma (≈0..0.4), hue in degrees.
    Oklch { l: f32, c: f32, h: f32 },
}

impl Color {
    pub const WHITE: Color = Color::Rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::Rgb(0x00, 0x00, 0x00);

    /// Parse `#rrggbb` or `#rgb`.
    pub fn hex(text: &str) -> Option<Color> {
        let digits = text.strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match digits.len() {
            6 => Some(Color::Rgb(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Some(Color::Rgb(
                    expand(&digits[0..1])?,
                    expand(&digits[1..2])?,
                    expand(&digits[2..3])?,
                ))
            }
            _ => None,
        }
    }

    pub fn from_rgb((r, g, b): (u8, u8, u8)) -> Color {
        Color::Rgb(r, g, b)
    }

    /// Whether a plain sRGB backend can paint this colour directly.
    pub fn is_srgb(&self) -> bool {
        matches!(self, Color::Rgb(..))
    }

    /// The same colour expressed in sRGB.
    pub fn normalized(self) -> Color {
        match self {
            Color::Rgb(..) => self,
            Color::Oklch { l, c, h } => {
                let (r, g, b) = oklch_to_srgb(l, c, h);
                Color::Rgb(r, g, b)
            }
        }
    }

    /// Opaque pixel value, or `None` for colours that need normalizing first.
    pub fn to_rgba(&self) -> Option<Rgba<u8>> {
        match *self {
            Color::Rgb(r, g, b) => Some(Rgba([r, g, b, 0xFF])),
            Color::Oklch { .. } => None,
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Color::Oklch { l, c, h } => write!(f, "oklch({l} {c} {h})"),
        }
    }
}

/// OKLCH → OKLab → linear sRGB → gamma-encoded sRGB, clamped to gamut.
fn oklch_to_srgb(l: f32, c: f32, h: f32) -> (u8, u8, u8) {
    let hue = h.to_radians();
    let a = c * hue.cos();
    let b = c * hue.sin();

    let l_ = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_ = l - 0.105_561_346 * a - 0.063_854_17 * b;
    let s_ = l - 0.089_484_18 * a - 1.291_485_5 * b;

    let (l3, m3, s3) = (l_ * l_ * l_, m_ * m_ * m_, s_ * s_ * s_);

    let r = 4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3;
    let g = -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_4 * s3;
    let bl = -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3;

    (encode_gamma(r), encode_gamma(g), encode_gamma(bl))
}

fn encode_gamma(linear: f32) -> u8 {
    let linear = linear.clamp(0.0, 1.0);
    let encoded = if linear <= 0.003_130_8 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}
