// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stampwerk-render — Stamp rendering for the Stampwerk engine.
//
// Provides the fixed field layout tables, system font discovery, the field
// text renderer, the stamp builder for both stamp kinds, quarter-turn
// rotation, and the raster preview compositor.

pub mod builder;
pub mod compose;
pub mod fields;
pub mod font;
pub mod image;
pub mod text;

pub use builder::StampBuilder;
pub use compose::{PreviewLayer, composite_preview, error_card};
pub use fields::{FieldAnchor, FieldSpec};
pub use font::FontBook;
pub use image::processor::ImageProcessor;
