// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings loading.

use std::path::Path;

use stampwerk_core::StampConfig;
use stampwerk_core::error::Result;
use tracing::{debug, info, warn};

use super::data_dir;

/// Load settings from `explicit`, or from the data directory.
///
/// An explicitly named file must be readable. The default file is optional:
/// when it is missing or broken the defaults are used.
pub fn load_config(explicit: Option<&Path>) -> Result<StampConfig> {
    if let Some(path) = explicit {
        let config = StampConfig::load(path)?;
        info!(path = %path.display(), "Settings loaded");
        return Ok(config);
    }
    Ok(load_default_location(&data_dir::config_path()))
}

fn load_default_location(path: &Path) -> StampConfig {
    if !path.is_file() {
        debug!(path = %path.display(), "No settings file, using defaults");
        return StampConfig::default();
    }
    match StampConfig::load(path) {
        Ok(config) => {
            info!(path = %path.display(), "Settings loaded");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), "Settings unreadable, using defaults: {e}");
            StampConfig::default()
        }
    }
}
