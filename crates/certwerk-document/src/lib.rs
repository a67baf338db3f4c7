// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// certwerk-document: Turning certificate views into portable artifacts.
//
// Provides the document view model (snapshots, drawing elements, pending
// image loads), the built-in certificate layout, the scannable verification
// token renderer, the rasterizer with its pluggable backend, and the PDF
// artifact packager.

pub mod pdf;
pub mod qr;
pub mod raster;
pub mod view;

// Re-export the primary structs so callers can use `certwerk_document::Rasterizer` etc.
pub use pdf::packager::{ArtifactMetadata, ArtifactPackager};
pub use raster::{CaptureOptions, Fidelity, RasterBackend, RasterImage, Rasterizer};
pub use raster::software::SoftwareBackend;
pub use view::certificate::{CertificateView, QR_SLOT};
pub use view::{Color, DocumentView, Element, Rect, ViewSnapshot};
