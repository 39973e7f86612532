// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware default output directory.

use std::path::{Path, PathBuf};

use scanwerk_core::error::Result;

/// Directory scans go to when none is given: `scanwerk/scans` under the XDG
/// data directory.
pub fn default_output_dir() -> PathBuf {
    data_home().join("scanwerk").join("scans")
}

/// Resolve the output directory and make sure it exists.
pub fn prepare_output_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let dir = requested.map_or_else(default_output_dir, Path::to_path_buf);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn data_home() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_directory_is_created() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let want = tmp.path().join("a").join("b");
        let got = prepare_output_dir(Some(&want)).expect("prepare");
        assert_eq!(got, want);
        assert!(want.is_dir());
    }

    #[test]
    fn default_ends_in_scans() {
        assert!(default_output_dir().ends_with("scanwerk/scans"));
    }
}
