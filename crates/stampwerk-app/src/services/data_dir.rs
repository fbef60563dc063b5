// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::PathBuf;

/// File name of the settings file inside the data directory.
pub const CONFIG_FILE: &str = "config.json";

/// The per-user application data directory. Not created here; the program
/// only reads from it.
pub fn data_dir() -> PathBuf {
    base_dir().join("stampwerk")
}

/// Default settings file location.
pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

fn base_dir() -> PathBuf {
    // Try XDG data dir, then fall back to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
