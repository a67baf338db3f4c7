// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standard certificate layout: one A4 sheet at 96 px/inch (794 x 1123),
// accent border in the record type's colour, heading band, detail rows, the
// verification QR slot in the bottom-right corner, and the authority footer.

use certwerk_core::types::{CertificateRecord, RecordType};

use super::{Color, DocumentView, Element, Rect, ViewSnapshot};

/// Slot the verification token image is attached to.
pub const QR_SLOT: &str = "qr-code";

const WIDTH: u32 = 794;
const HEIGHT: u32 = 1123;
const QR_EDGE: f32 = 200.0;
const PAGE_PAD: f32 = 24.0;
const LABEL_X: f32 = 96.0;
const VALUE_X: f32 = 340.0;
const FIRST_ROW_Y: f32 = 300.0;
const ROW_STEP: f32 = 56.0;

const INK: Color = Color::Rgb(0x21, 0x21, 0x21);
const MUTED: Color = Color::Rgb(0x75, 0x75, 0x75);
const RULE: Color = Color::Rgb(0xE0, 0xE0, 0xE0);

/// Laid-out certificate for one record.
#[derive(Debug, Clone)]
pub struct CertificateView {
    record_type: RecordType,
    rows: Vec<(&'static str, String)>,
    authority: String,
    accent: Color,
}

impl CertificateView {
    pub fn new(record: &CertificateRecord, authority: impl Into<String>) -> Self {
        let mut rows = vec![
            (
                "Certificate No.",
                record.certificate_number().unwrap_or("Pending").to_owned(),
            ),
            (subject_label(record.record_type), record.subject_name()),
        ];
        if let Some(date) = record.event_date() {
            rows.push(("Date", date.to_owned()));
        }
        let place = record.place();
        if !place.is_empty() {
            rows.push(("Place", place));
        }
        if let Some(registered) = record.registration_date.as_deref() {
            rows.push(("Registered", registered.to_owned()));
        }
        if let Some(issued) = record.issued_date.or(record.created_at) {
            rows.push(("Issued", issued.format("%Y-%m-%d").to_string()));
        }

        Self {
            record_type: record.record_type,
            rows,
            authority: authority.into(),
            accent: Color::from_rgb(record.record_type.accent_rgb()),
        }
    }

    /// Override the accent colour, e.g. with a theme's OKLCH value.
    pub fn with_accent(mut self, accent: Color) -> Self {
        self.accent = accent;
        self
    }

    pub fn rows(&self) -> &[(&'static str, String)] {
        &self.rows
    }
}

fn subject_label(record_type: RecordType) -> &'static str {
    match record_type {
        RecordType::Birth => "Child",
        RecordType::Death => "Deceased",
        RecordType::Marriage | RecordType::Divorce => "Spouses",
    }
}

impl DocumentView for CertificateView {
    fn snapshot(&self) -> ViewSnapshot {
        let (w, h) = (WIDTH as f32, HEIGHT as f32);
        let mut view = ViewSnapshot::new(WIDTH, HEIGHT);

        let frame = Rect::new(0.0, 0.0, w, h).inset(PAGE_PAD);
        view.push(Element::Border {
            rect: frame,
            color: self.accent,
            thickness: 6.0,
        });
        view.push(Element::Border {
            rect: frame.inset(12.0),
            color: RULE,
            thickness: 1.0,
        });

        // Heading band.
        view.push(Element::Fill {
            rect: Rect::new(frame.x + 18.0, frame.y + 18.0, frame.width - 36.0, 140.0),
            color: self.accent,
        });
        view.push(Element::Text {
            x: LABEL_X,
            y: 80.0,
            size: 22.0,
            color: Color::WHITE,
            content: "CIVIL REGISTRATION".into(),
        });
        view.push(Element::Text {
            x: LABEL_X,
            y: 118.0,
            size: 34.0,
            color: Color::WHITE,
            content: self.record_type.display_name().to_uppercase(),
        });

        for (index, (label, value)) in self.rows.iter().enumerate() {
            let y = FIRST_ROW_Y + index as f32 * ROW_STEP;
            view.push(Element::Text {
                x: LABEL_X,
                y,
                size: 16.0,
                color: MUTED,
                content: (*label).to_owned(),
            });
            view.push(Element::Text {
                x: VALUE_X,
                y,
                size: 18.0,
                color: INK,
                content: value.clone(),
            });
            view.push(Element::Fill {
                rect: Rect::new(LABEL_X, y + 32.0, w - 2.0 * LABEL_X, 1.0),
                color: RULE,
            });
        }

        let qr_x = frame.x + frame.width - 36.0 - QR_EDGE;
        let qr_y = frame.y + frame.height - 36.0 - QR_EDGE;
        view.push(Element::Image {
            rect: Rect::new(qr_x, qr_y, QR_EDGE, QR_EDGE),
            slot: Some(QR_SLOT.into()),
            image: None,
        });
        view.push(Element::Text {
            x: qr_x,
            y: qr_y + QR_EDGE + 4.0,
            size: 11.0,
            color: MUTED,
            content: "Scan to verify".into(),
        });

        view.push(Element::Text {
            x: LABEL_X,
            y: qr_y + QR_EDGE - 60.0,
            size: 16.0,
            color: INK,
            content: self.authority.clone(),
        });
        view.push(Element::Fill {
            rect: Rect::new(LABEL_X, qr_y + QR_EDGE - 70.0, 260.0, 1.0),
            color: INK,
        });

        view
    }

    fn dimensions(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }
}
