// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: load, rotate by quarter turns, resize, encode. Operates on
// in-memory RGBA images using the `image` crate.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbaImage, imageops};
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::types::Rotation;
use tracing::{debug, info, instrument};

/// Processing pipeline over a single RGBA image.
///
/// Each transformation consumes `self` and returns a new processor, so calls
/// chain:
///
/// ```ignore
/// let png = ImageProcessor::open("stamp.png")?
///     .rotate(Rotation::Deg90)
///     .to_png_bytes()?;
/// ```
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image file. A missing file is reported as a missing asset.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StampError::AssetNotFound {
                path: path.to_path_buf(),
            });
        }
        let img = image::open(path).map_err(|err| {
            StampError::Image(format!("failed to open {}: {}", path.display(), err))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self {
            image: img.into_rgba8(),
        })
    }

    /// Decode an encoded image (PNG, JPEG, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| StampError::Image(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self {
            image: img.into_rgba8(),
        })
    }

    /// Wrap an already-decoded RGBA image.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Height over width; 1.0 for an empty image.
    pub fn aspect_ratio(&self) -> f64 {
        aspect_ratio(&self.image)
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    // -- Transformations --------------------------------------------------------

    /// Rotate clockwise. The result canvas is exactly the rotated bounding box
    /// of the source; uncovered pixels stay transparent.
    #[instrument(skip(self), fields(degrees = rotation.degrees()))]
    pub fn rotate(self, rotation: Rotation) -> Self {
        let (w, h) = (self.image.width(), self.image.height());
        let (new_w, new_h) = rotated_extent(w, h, rotation);
        let turned = match rotation {
            Rotation::Deg0 => return self,
            Rotation::Deg90 => imageops::rotate90(&self.image),
            Rotation::Deg180 => imageops::rotate180(&self.image),
            Rotation::Deg270 => imageops::rotate270(&self.image),
        };
        debug!(from_w = w, from_h = h, new_w, new_h, "Rotation complete");
        if turned.dimensions() == (new_w, new_h) {
            return Self { image: turned };
        }

        let mut canvas = RgbaImage::new(new_w, new_h);
        let dx = (i64::from(new_w) - i64::from(turned.width())) / 2;
        let dy = (i64::from(new_h) - i64::from(turned.height())) / 2;
        imageops::overlay(&mut canvas, &turned, dx, dy);
        Self { image: canvas }
    }

    /// Resize to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if (width, height) == self.image.dimensions() {
            return self;
        }
        let resized = imageops::resize(
            &self.image,
            width.max(1),
            height.max(1),
            imageops::FilterType::Lanczos3,
        );
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|err| StampError::Image(format!("PNG encoding failed: {}", err)))?;
        Ok(buf.into_inner())
    }

    /// Write a PNG file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_png_bytes()?)?;
        info!(
            width = self.width(),
            height = self.height(),
            "PNG written"
        );
        Ok(())
    }
}

/// Height over width of an image; 1.0 for an empty image.
pub fn aspect_ratio(image: &RgbaImage) -> f64 {
    if image.width() == 0 {
        return 1.0;
    }
    f64::from(image.height()) / f64::from(image.width())
}

/// Canvas size of a `width` x `height` image after rotating about its centre.
///
/// Corners are rotated in floating point; the extents are rounded to a
/// micro-pixel first so trig noise cannot push an exact size up by one.
pub fn rotated_extent(width: u32, height: u32, rotation: Rotation) -> (u32, u32) {
    let theta = f64::from(rotation.degrees()).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (hw, hh) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let corners = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (x, y) in corners {
        let rx = x * cos - y * sin;
        let ry = x * sin + y * cos;
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_y = min_y.min(ry);
        max_y = max_y.max(ry);
    }
    let snap = |v: f64| ((v * 1e6).round() / 1e6).ceil() as u32;
    (snap(max_x - min_x), snap(max_y - min_y))
}
