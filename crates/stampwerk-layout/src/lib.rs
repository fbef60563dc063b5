// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stampwerk-layout — Where stamps go on a page.
//
// The placement resolver turns page size, stamp aspect ratio, and placement
// settings into draw rectangles in page units (preview pixels or PDF points).
// The drag controller moves free-positioned slots in response to pointer
// events on the preview surface.

pub mod drag;
pub mod placement;

pub use drag::{DragController, DragOutcome, DragState};
pub use placement::{PlacementParams, resolve_slots};
