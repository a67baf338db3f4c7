// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

use certwerk_core::error::Result;

/// Return the application data directory, creating it if needed.
///
/// `override_dir` (from `--data-dir`) wins over the environment.
pub fn data_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => base_dir(
            std::env::var("XDG_DATA_HOME").ok(),
            std::env::var("HOME").ok(),
        )
        .join("certwerk"),
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn base_dir(xdg_data_home: Option<String>, home: Option<String>) -> PathBuf {
    // XDG first, then ~/.local/share
    if let Some(xdg) = xdg_data_home.filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = home.filter(|v| !v.is_empty()) {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_wins_over_home() {
        let base = base_dir(Some("/xdg".into()), Some("/home/clerk".into()));
        assert_eq!(base, PathBuf::from("/xdg"));
    }

    #[test]
    fn home_fallback() {
        let base = base_dir(None, Some("/home/clerk".into()));
        assert_eq!(base, PathBuf::from("/home/clerk/.local/share"));
        assert_eq!(base_dir(Some(String::new()), None), std::env::temp_dir());
    }

    #[test]
    fn override_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let wanted = tmp.path().join("nested").join("certwerk");
        let dir = data_dir(Some(&wanted)).unwrap();
        assert_eq!(dir, wanted);
        assert!(dir.is_dir());
    }
}
