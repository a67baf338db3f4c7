// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Strategy recommendation from a browser user agent.

use certwerk_core::types::Strategy;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub strategy: Strategy,
    pub reason: &'static str,
}

/// Chromium browsers and Firefox print best through their own dialog;
/// Safari gives more consistent results from a capture.
pub fn recommend_strategy(user_agent: &str) -> Recommendation {
    let ua = user_agent.to_ascii_lowercase();

    if ua.contains("chrome") || ua.contains("edg") {
        return Recommendation {
            strategy: Strategy::NativePrint,
            reason: "Browser print provides best quality in Chrome/Edge",
        };
    }
    if ua.contains("firefox") {
        return Recommendation {
            strategy: Strategy::NativePrint,
            reason: "Browser print provides best quality in Firefox",
        };
    }
    if ua.contains("safari") {
        return Recommendation {
            strategy: Strategy::ProgrammaticCapture,
            reason: "Capture provides more consistent results in Safari",
        };
    }
    Recommendation {
        strategy: Strategy::NativePrint,
        reason: "Browser print is the recommended default method",
    }
}
