// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization for the preview surface.

use std::path::Path;
use std::process::Command;

use image::{Rgba, RgbaImage, imageops};
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, instrument, warn};

/// Renders one PDF page to an RGBA raster of an exact pixel size.
pub trait PageRasterizer {
    fn name(&self) -> &str;

    /// Render zero-based page `index` of `pdf` at `width` x `height` pixels.
    fn render_page(&self, pdf: &Path, index: usize, width: u32, height: u32) -> Result<RgbaImage>;
}

/// Paper-white page of the requested size, without any page content.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlankPageRasterizer;

impl PageRasterizer for BlankPageRasterizer {
    fn name(&self) -> &str {
        "blank"
    }

    fn render_page(&self, _pdf: &Path, _index: usize, width: u32, height: u32) -> Result<RgbaImage> {
        Ok(RgbaImage::from_pixel(
            width.max(1),
            height.max(1),
            Rgba([255, 255, 255, 255]),
        ))
    }
}

/// Poppler's `pdftoppm` command-line renderer.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            program: "pdftoppm".into(),
        }
    }
}

impl PdftoppmRasterizer {
    /// Whether the renderer can be started on this system.
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        "pdftoppm"
    }

    #[instrument(skip(self, pdf), fields(pdf = %pdf.display()))]
    fn render_page(&self, pdf: &Path, index: usize, width: u32, height: u32) -> Result<RgbaImage> {
        let temp = tempfile::Builder::new().prefix("stamp_page_").tempdir()?;
        let prefix = temp.path().join("page");
        let page = (index + 1).to_string();

        let output = Command::new(&self.program)
            .args(["-f", &page, "-l", &page, "-png", "-singlefile"])
            .arg("-scale-to-x")
            .arg(width.to_string())
            .arg("-scale-to-y")
            .arg(height.to_string())
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|err| StampError::Pdf(format!("pdftoppm: {err}")))?;
        if !output.status.success() {
            return Err(StampError::Pdf(format!(
                "pdftoppm exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let rendered = image::open(prefix.with_extension("png"))
            .map_err(|err| StampError::Image(format!("failed to read rendered page: {err}")))?
            .into_rgba8();
        debug!(
            width = rendered.width(),
            height = rendered.height(),
            "Page rendered"
        );
        if rendered.dimensions() == (width, height) {
            return Ok(rendered);
        }
        Ok(imageops::resize(
            &rendered,
            width.max(1),
            height.max(1),
            imageops::FilterType::Triangle,
        ))
    }
}

/// `pdftoppm` when installed, otherwise blank pages.
pub fn default_rasterizer() -> Box<dyn PageRasterizer> {
    let pdftoppm = PdftoppmRasterizer::default();
    if pdftoppm.is_available() {
        Box::new(pdftoppm)
    } else {
        warn!("pdftoppm not found; previews will show blank pages");
        Box::new(BlankPageRasterizer)
    }
}
