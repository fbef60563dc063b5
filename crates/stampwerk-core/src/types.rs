// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Stampwerk stamping engine.

use serde::{Deserialize, Serialize};

/// Points per millimetre (1 pt = 1/72 in, 1 in = 25.4 mm).
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_MM
}

/// The two fixed stamp templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampKind {
    /// Incoming-document registration mark drawn over the template image.
    Registration,
    /// Approval/refusal annotation drawn on a transparent canvas.
    Resolution,
}

impl StampKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Resolution => "resolution",
        }
    }
}

impl std::fmt::Display for StampKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Clockwise rotation applied to a finished stamp image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    pub fn degrees(&self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Parse a clockwise angle. Only exact multiples of 90 are accepted;
    /// negative and >360 values wrap.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Composition of two clockwise rotations.
    pub fn then(self, other: Rotation) -> Rotation {
        let sum = i32::from(self.degrees()) + i32::from(other.degrees());
        Self::from_degrees(sum).unwrap_or_default()
    }

    /// Whether the rotation swaps width and height.
    pub fn is_quarter_turn(&self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_degrees(i32::from(value))
            .filter(|_| value < 360)
            .ok_or_else(|| format!("rotation must be one of 0, 90, 180, 270 (got {value})"))
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

/// How a slot's rectangle is derived on each render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementMode {
    /// Bottom-right margin offsets, recomputed every render.
    #[default]
    Anchored,
    /// Persisted page-relative fraction, settable by drag.
    Free,
}

/// Top-left corner of a stamp as a fraction of page width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreePosition {
    pub x_pct: f64,
    pub y_pct: f64,
}

impl FreePosition {
    pub fn new(x_pct: f64, y_pct: f64) -> Self {
        Self { x_pct, y_pct }
    }

    /// Fractional position of `rect` on a surface of the given size.
    pub fn of_rect(rect: &Rect, surface_width: f64, surface_height: f64) -> Self {
        let frac = |v: f64, extent: f64| if extent > 0.0 { v / extent } else { 0.0 };
        Self {
            x_pct: frac(rect.x, surface_width),
            y_pct: frac(rect.y, surface_height),
        }
    }
}

/// Axis-aligned rectangle, origin top-left, y growing downward.
///
/// Units depend on the caller: preview pixels or page points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: left/top edges inside, right/bottom outside.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && px >= self.x
            && px < self.right()
            && py >= self.y
            && py < self.bottom()
    }

    pub fn with_origin(&self, x: f64, y: f64) -> Self {
        Self { x, y, ..*self }
    }
}

/// Physical page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width_pt: 595.276,
        height_pt: 841.89,
    };

    pub fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }

    /// Raster size of this page at `zoom` pixels per point, never below 50 px.
    pub fn preview_pixels(&self, zoom: f64) -> (u32, u32) {
        let px = |pt: f64| ((pt * zoom).floor().max(50.0)) as u32;
        (px(self.width_pt), px(self.height_pt))
    }
}

/// One placeable stamp instance within a page composition.
#[derive(Debug, Clone, PartialEq)]
pub struct StampSlot {
    pub kind: StampKind,
    pub mode: PlacementMode,
    /// Persisted free position; `None` until first resolved in Free mode.
    pub free_position: Option<FreePosition>,
    /// Rectangle from the most recent composite pass, in preview pixels.
    pub last_rendered_rect: Option<Rect>,
}

impl StampSlot {
    pub fn new(kind: StampKind) -> Self {
        Self {
            kind,
            mode: PlacementMode::Anchored,
            free_position: None,
            last_rendered_rect: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_parses_multiples_of_ninety() {
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn rotation_composes_like_a_group() {
        for r in Rotation::ALL {
            assert_eq!(r.then(Rotation::Deg0), r);
        }
        assert_eq!(Rotation::Deg90.then(Rotation::Deg270), Rotation::Deg0);
        assert_eq!(Rotation::Deg180.then(Rotation::Deg180), Rotation::Deg0);
    }

    #[test]
    fn rotation_serde_uses_degrees() {
        let json = serde_json::to_string(&Rotation::Deg270).unwrap();
        assert_eq!(json, "270");
        let back: Rotation = serde_json::from_str("180").unwrap();
        assert_eq!(back, Rotation::Deg180);
        assert!(serde_json::from_str::<Rotation>("45").is_err());
    }

    #[test]
    fn rect_containment_is_half_open() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert!(r.contains(10.0, 20.0));
        assert!(r.contains(39.9, 59.9));
        assert!(!r.contains(40.0, 30.0));
        assert!(!r.contains(15.0, 60.0));
        assert!(!Rect::new(0.0, 0.0, 0.0, 10.0).contains(0.0, 5.0));
    }

    #[test]
    fn preview_pixels_has_floor_of_fifty() {
        let page = PageSize::new(20.0, 842.0);
        assert_eq!(page.preview_pixels(1.2), (50, 1010));
    }

    #[test]
    fn mm_conversion_matches_inch() {
        assert!((mm_to_pt(25.4) - 72.0).abs() < 1e-9);
    }
}
