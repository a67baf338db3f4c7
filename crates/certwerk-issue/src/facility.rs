// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform print facility.
//
// Embedders that can show an OS print dialog implement `PrintFacility`.
// Headless builds use `UnavailablePrintFacility`, which refuses every request
// with `PlatformUnavailable`.

use certwerk_core::error::{CertwerkError, Result};
use certwerk_document::ViewSnapshot;

/// Send a settled snapshot to the OS-level print dialog.
pub trait PrintFacility: Send + Sync {
    fn name(&self) -> &str;

    /// Request the print dialog for `snapshot`.
    ///
    /// `Ok(())` means the dialog was requested; the user may still cancel it.
    fn show_print_dialog(&self, snapshot: &ViewSnapshot, title: &str) -> Result<()>;
}

/// Print facility for environments with no print dialog (CLI, CI, servers).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePrintFacility;

impl PrintFacility for UnavailablePrintFacility {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn show_print_dialog(&self, _snapshot: &ViewSnapshot, title: &str) -> Result<()> {
        tracing::warn!(title, "print dialog requested with no print facility");
        Err(CertwerkError::PlatformUnavailable)
    }
}
