// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact packager: place a captured raster onto fixed-size PDF pages using
// `printpdf` 0.8.
//
// Images are embedded at 72 dpi so one raster pixel is one point before
// scaling; `compute_layout` then works entirely in points. The layout depends
// only on the raster size, the paper, the margin and the fit mode.

use certwerk_core::config::IssuerConfig;
use certwerk_core::error::{CertwerkError, Result};
use certwerk_core::types::{Artifact, PageFit, PaperSize};
use image::{DynamicImage, imageops};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::raster::RasterImage;

/// Raster pixels per point at which images are embedded.
const EMBED_DPI: f32 = 72.0;

/// Document information and output name for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub title: String,
    pub subject: String,
    pub author: String,
    pub creator: String,
    pub filename: String,
}

/// Where one horizontal band of the raster goes on one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// First raster row of the band.
    pub source_y: u32,
    /// Rows in the band.
    pub source_height: u32,
    /// Lower-left corner of the placed image, in points from the page origin.
    pub x_pt: f32,
    pub y_pt: f32,
    /// Points per raster pixel.
    pub scale: f32,
}

/// Compute page placements for a `width` x `height` raster.
///
/// `SinglePage` scales (up or down) until the whole raster fits inside the
/// margins and centres it. `FitWidth` scales to the usable width and cuts the
/// raster into bands one page high; a raster that fits on one page is
/// centred, longer ones are top-aligned.
pub fn compute_layout(
    width: u32,
    height: u32,
    page_pt: (f32, f32),
    margin_pt: f32,
    fit: PageFit,
) -> Result<Vec<Placement>> {
    if width == 0 || height == 0 {
        return Err(CertwerkError::Packaging(format!(
            "raster has zero area ({width}x{height})"
        )));
    }
    let usable_w = page_pt.0 - 2.0 * margin_pt;
    let usable_h = page_pt.1 - 2.0 * margin_pt;
    if !(usable_w > 0.0 && usable_h > 0.0) {
        return Err(CertwerkError::Packaging(
            "page margins leave no usable area".into(),
        ));
    }

    let (w, h) = (width as f32, height as f32);
    let centred = |scale: f32| Placement {
        source_y: 0,
        source_height: height,
        x_pt: margin_pt + (usable_w - w * scale) / 2.0,
        y_pt: margin_pt + (usable_h - h * scale) / 2.0,
        scale,
    };

    match fit {
        PageFit::SinglePage => Ok(vec![centred((usable_w / w).min(usable_h / h))]),
        PageFit::FitWidth => {
            let scale = usable_w / w;
            if h * scale <= usable_h {
                return Ok(vec![centred(scale)]);
            }
            let band = ((usable_h / scale).floor() as u32).max(1);
            let mut placements = Vec::new();
            let mut source_y = 0;
            while source_y < height {
                let source_height = band.min(height - source_y);
                placements.push(Placement {
                    source_y,
                    source_height,
                    x_pt: margin_pt,
                    y_pt: margin_pt + usable_h - source_height as f32 * scale,
                    scale,
                });
                source_y += source_height;
            }
            Ok(placements)
        }
    }
}

/// Turns rasters into paginated PDF artifacts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArtifactPackager {
    paper_size: PaperSize,
    margin_mm: f32,
    fit: PageFit,
}

impl ArtifactPackager {
    pub fn new(paper_size: PaperSize, margin_mm: f32, fit: PageFit) -> Self {
        Self {
            paper_size,
            margin_mm,
            fit,
        }
    }

    /// A4, 10 mm margin, one page.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4, 10.0, PageFit::SinglePage)
    }

    pub fn from_config(config: &IssuerConfig) -> Self {
        Self::new(config.paper_size, config.margin_mm, config.page_fit)
    }

    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Page placements for `raster` under this packager's settings.
    pub fn layout(&self, raster: &RasterImage) -> Result<Vec<Placement>> {
        let (page_w, page_h) = self.page_dimensions();
        compute_layout(
            raster.width(),
            raster.height(),
            (page_w.into_pt().0, page_h.into_pt().0),
            Mm(self.margin_mm).into_pt().0,
            self.fit,
        )
    }

    /// Build the in-memory document without serializing it.
    pub fn build_document(
        &self,
        raster: &RasterImage,
        metadata: &ArtifactMetadata,
    ) -> Result<PdfDocument> {
        let placements = self.layout(raster)?;
        let (page_w, page_h) = self.page_dimensions();

        let mut doc = PdfDocument::new(&metadata.title);
        doc.metadata.info.subject = metadata.subject.clone();
        doc.metadata.info.author = metadata.author.clone();
        doc.metadata.info.creator = metadata.creator.clone();

        let mut pages = Vec::with_capacity(placements.len());
        for placement in &placements {
            let band = imageops::crop_imm(
                &raster.pixels,
                0,
                placement.source_y,
                raster.width(),
                placement.source_height,
            )
            .to_image();
            let rgb = DynamicImage::ImageRgba8(band).to_rgb8();
            let raw = RawImage {
                width: rgb.width() as usize,
                height: rgb.height() as usize,
                pixels: RawImageData::U8(rgb.into_raw()),
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(placement.x_pt)),
                    translate_y: Some(Pt(placement.y_pt)),
                    scale_x: Some(placement.scale),
                    scale_y: Some(placement.scale),
                    dpi: Some(EMBED_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(page_w, page_h, ops));
        }
        doc.with_pages(pages);

        debug!(
            pages = placements.len(),
            scale = placements.first().map(|p| p.scale),
            "raster placed"
        );
        Ok(doc)
    }

    /// Package `raster` into a PDF artifact named `metadata.filename`.
    #[instrument(skip(self, raster, metadata), fields(width = raster.width(), height = raster.height(), filename = %metadata.filename))]
    pub fn pack(&self, raster: &RasterImage, metadata: &ArtifactMetadata) -> Result<Artifact> {
        let doc = self.build_document(raster, metadata)?;

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "PDF serializer reported warnings");
        }
        if bytes.is_empty() {
            return Err(CertwerkError::Packaging("PDF serializer produced no output".into()));
        }

        info!(bytes = bytes.len(), paper = ?self.paper_size, "artifact packaged");
        Ok(Artifact::pdf(bytes, metadata.filename.clone()))
    }
}

impl Default for ArtifactPackager {
    fn default() -> Self {
        Self::a4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const A4_PT: (f32, f32) = (595.2756, 841.8898);
    const MARGIN_PT: f32 = 28.346457;

    fn raster(width: u32, height: u32) -> RasterImage {
        RasterImage {
            pixels: RgbaImage::from_pixel(width, height, Rgba([0x10, 0x20, 0x30, 0xFF])),
            scale: 2.0,
        }
    }

    fn metadata() -> ArtifactMetadata {
        ArtifactMetadata {
            title: "Birth Certificate - BC-2024-001".into(),
            subject: "Abebe Kebede".into(),
            author: "Civil Registration Authority".into(),
            creator: "Certwerk".into(),
            filename: "BC_BC-2024-001_2024-01-15.pdf".into(),
        }
    }

    #[test]
    fn single_page_preserves_aspect_and_centres() {
        // 1588x2246 is a 794x1123 view captured at scale 2.
        let placements = compute_layout(1588, 2246, A4_PT, MARGIN_PT, PageFit::SinglePage).unwrap();
        assert_eq!(placements.len(), 1);
        let p = placements[0];
        let placed_w = 1588.0 * p.scale;
        let placed_h = 2246.0 * p.scale;
        assert!(placed_w <= A4_PT.0 - 2.0 * MARGIN_PT + 0.01);
        assert!(placed_h <= A4_PT.1 - 2.0 * MARGIN_PT + 0.01);
        let left = p.x_pt;
        let right = A4_PT.0 - (p.x_pt + placed_w);
        assert!((left - right).abs() < 0.01);
        let bottom = p.y_pt;
        let top = A4_PT.1 - (p.y_pt + placed_h);
        assert!((bottom - top).abs() < 0.01);
    }

    #[test]
    fn small_rasters_scale_up() {
        let placements = compute_layout(100, 100, A4_PT, MARGIN_PT, PageFit::SinglePage).unwrap();
        assert!(placements[0].scale > 1.0);
    }

    #[test]
    fn fit_width_splits_tall_rasters() {
        let placements = compute_layout(100, 1000, A4_PT, MARGIN_PT, PageFit::FitWidth).unwrap();
        assert!(placements.len() > 1);
        let covered: u32 = placements.iter().map(|p| p.source_height).sum();
        assert_eq!(covered, 1000);
        for pair in placements.windows(2) {
            assert_eq!(pair[0].source_y + pair[0].source_height, pair[1].source_y);
        }
    }

    #[test]
    fn fit_width_keeps_short_rasters_on_one_page() {
        let placements = compute_layout(1000, 100, A4_PT, MARGIN_PT, PageFit::FitWidth).unwrap();
        assert_eq!(placements.len(), 1);
    }

    #[test]
    fn empty_raster_is_a_packaging_error() {
        let result = ArtifactPackager::a4().pack(&raster(0, 0), &metadata());
        assert!(matches!(result, Err(CertwerkError::Packaging(_))));
    }

    #[test]
    fn metadata_lands_in_the_document_info() {
        let doc = ArtifactPackager::a4()
            .build_document(&raster(40, 60), &metadata())
            .unwrap();
        assert_eq!(doc.metadata.info.document_title, "Birth Certificate - BC-2024-001");
        assert_eq!(doc.metadata.info.subject, "Abebe Kebede");
        assert_eq!(doc.metadata.info.author, "Civil Registration Authority");
        assert_eq!(doc.metadata.info.creator, "Certwerk");
    }

    #[test]
    fn pack_produces_a_readable_pdf() {
        let artifact = ArtifactPackager::a4().pack(&raster(40, 60), &metadata()).unwrap();
        assert_eq!(artifact.mime_type, "application/pdf");
        assert_eq!(artifact.filename, "BC_BC-2024-001_2024-01-15.pdf");
        assert!(artifact.bytes.starts_with(b"%PDF"));

        let parsed = lopdf::Document::load_mem(&artifact.bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn fit_width_pack_has_one_page_per_band() {
        let packager = ArtifactPackager::new(PaperSize::A5, 10.0, PageFit::FitWidth);
        let artifact = packager.pack(&raster(50, 600), &metadata()).unwrap();
        let parsed = lopdf::Document::load_mem(&artifact.bytes).unwrap();
        let expected = packager.layout(&raster(50, 600)).unwrap().len();
        assert!(expected > 1);
        assert_eq!(parsed.get_pages().len(), expected);
    }
}
