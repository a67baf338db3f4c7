// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: packaging captured certificates as paginated documents.

pub mod packager;

pub use packager::{ArtifactMetadata, ArtifactPackager, Placement, compute_layout};
