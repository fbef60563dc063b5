// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StampError};
use crate::types::{PlacementMode, Rotation, StampKind};

/// File name of the registration template expected beside the executable.
pub const DEFAULT_TEMPLATE_NAME: &str = "stamp.png";

/// Global placement, preview, and asset settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Stamp width as a fraction of page width.
    pub width_ratio: f64,
    /// Distance from the page's right edge in anchored mode.
    pub right_margin_mm: f64,
    /// Distance from the page's bottom edge in anchored mode.
    pub bottom_margin_mm: f64,
    /// Vertical gap between stacked stamps.
    pub stamp_gap_mm: f64,
    pub rotation: Rotation,
    /// Stamp only the first page on export.
    pub first_page_only: bool,
    /// Place a registration and a resolution stamp together.
    pub dual_stamp: bool,
    /// Enable drag positioning.
    pub free_position: bool,
    /// Stamp kind used when `dual_stamp` is off.
    pub kind: StampKind,
    /// Preview zoom, percent of one pixel per point.
    pub zoom_percent: u32,
    /// Registration template image. Relative paths resolve beside the executable.
    pub template_path: PathBuf,
    /// Font families tried in order before any sans-serif on the system.
    pub font_preferences: Vec<String>,
}

impl StampConfig {
    pub const WIDTH_RATIO_RANGE: (f64, f64) = (0.10, 0.80);
    pub const MARGIN_RANGE_MM: (f64, f64) = (0.0, 50.0);
    pub const ZOOM_RANGE: (u32, u32) = (60, 250);

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|err| StampError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Ok(config.normalized())
    }

    /// Clamp every numeric knob into its accepted range.
    pub fn normalized(mut self) -> Self {
        let clamp = |v: f64, (lo, hi): (f64, f64), fallback: f64| {
            if v.is_finite() { v.clamp(lo, hi) } else { fallback }
        };
        self.width_ratio = clamp(self.width_ratio, Self::WIDTH_RATIO_RANGE, 0.45);
        self.right_margin_mm = clamp(self.right_margin_mm, Self::MARGIN_RANGE_MM, 10.0);
        self.bottom_margin_mm = clamp(self.bottom_margin_mm, Self::MARGIN_RANGE_MM, 10.0);
        self.stamp_gap_mm = clamp(self.stamp_gap_mm, Self::MARGIN_RANGE_MM, 5.0);
        self.zoom_percent = self
            .zoom_percent
            .clamp(Self::ZOOM_RANGE.0, Self::ZOOM_RANGE.1);
        self
    }

    /// Preview scale in pixels per point.
    pub fn zoom(&self) -> f64 {
        f64::from(self.zoom_percent) / 100.0
    }

    pub fn placement_mode(&self) -> PlacementMode {
        if self.free_position {
            PlacementMode::Free
        } else {
            PlacementMode::Anchored
        }
    }

    /// Stamp kinds composed on a page, in stacking and hit-test order.
    pub fn active_kinds(&self) -> Vec<StampKind> {
        if self.dual_stamp {
            vec![StampKind::Registration, StampKind::Resolution]
        } else {
            vec![self.kind]
        }
    }

    /// Absolute template location.
    pub fn template_location(&self) -> PathBuf {
        if self.template_path.is_absolute() {
            return self.template_path.clone();
        }
        app_dir().join(&self.template_path)
    }
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.45,
            right_margin_mm: 10.0,
            bottom_margin_mm: 10.0,
            stamp_gap_mm: 5.0,
            rotation: Rotation::Deg0,
            first_page_only: false,
            dual_stamp: false,
            free_position: false,
            kind: StampKind::Registration,
            zoom_percent: 120,
            template_path: PathBuf::from(DEFAULT_TEMPLATE_NAME),
            font_preferences: vec![
                "DejaVu Sans".into(),
                "Arial".into(),
                "Liberation Sans".into(),
            ],
        }
    }
}

/// Directory containing the running executable, or the working directory.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_clamps_out_of_range_values() {
        let config = StampConfig {
            width_ratio: 2.0,
            right_margin_mm: -4.0,
            bottom_margin_mm: f64::NAN,
            zoom_percent: 10,
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.width_ratio, 0.80);
        assert_eq!(config.right_margin_mm, 0.0);
        assert_eq!(config.bottom_margin_mm, 10.0);
        assert_eq!(config.zoom_percent, 60);
    }

    #[test]
    fn load_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "width_ratio": 0.3, "rotation": 90, "dual_stamp": true }"#)
            .unwrap();

        let config = StampConfig::load(&path).unwrap();
        assert_eq!(config.width_ratio, 0.3);
        assert_eq!(config.rotation, Rotation::Deg90);
        assert!(config.dual_stamp);
        assert_eq!(config.zoom_percent, 120);
        assert_eq!(
            config.active_kinds(),
            vec![StampKind::Registration, StampKind::Resolution]
        );
    }

    #[test]
    fn load_rejects_invalid_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "rotation": 45 }"#).unwrap();
        let detail = match StampConfig::load(&path) {
            Err(StampError::InvalidConfig(detail)) => detail,
            other => panic!("expected an invalid-config error, got {other:?}"),
        };
        assert!(detail.contains("config.json"));
        assert!(detail.contains("rotation"));
    }

    #[test]
    fn absolute_template_path_is_kept() {
        let config = StampConfig {
            template_path: PathBuf::from("/opt/stamps/stamp.png"),
            ..Default::default()
        };
        assert_eq!(
            config.template_location(),
            PathBuf::from("/opt/stamps/stamp.png")
        );
    }
}
