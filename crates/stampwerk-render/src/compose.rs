// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preview compositor and the inline error card.

use image::{Rgba, RgbaImage, imageops};
use stampwerk_core::types::Rect;
use tracing::{debug, instrument};

use crate::font::FontBook;
use crate::image::ImageProcessor;
use crate::text::{self, TextStyle};

/// Size of the card shown in place of a stamp that failed to build.
pub const ERROR_CARD_SIZE: (u32, u32) = (308, 197);

const ERROR_TEXT_PX: f32 = 14.0;
const ERROR_MARGIN: f32 = 8.0;
const ERROR_COLOR: Rgba<u8> = Rgba([200, 0, 0, 255]);

/// One stamp image and the preview-pixel rectangle it is drawn into.
#[derive(Debug, Clone)]
pub struct PreviewLayer {
    pub image: RgbaImage,
    pub rect: Rect,
}

/// Draw every layer onto a copy of the page raster, in order.
///
/// Each stamp is scaled to its rectangle; pixels falling outside the page are
/// clipped.
#[instrument(skip_all, fields(layers = layers.len()))]
pub fn composite_preview(page: &RgbaImage, layers: &[PreviewLayer]) -> RgbaImage {
    let mut surface = page.clone();
    for layer in layers {
        let w = layer.rect.width.round().max(1.0) as u32;
        let h = layer.rect.height.round().max(1.0) as u32;
        let scaled = ImageProcessor::from_rgba(layer.image.clone())
            .resize_exact(w, h)
            .into_rgba();
        let (x, y) = (layer.rect.x.round() as i64, layer.rect.y.round() as i64);
        debug!(x, y, w, h, "Compositing stamp");
        imageops::overlay(&mut surface, &scaled, x, y);
    }
    surface
}

/// White card carrying `message` in red, word-wrapped to the card width.
pub fn error_card(message: &str, fonts: &FontBook) -> RgbaImage {
    let (w, h) = ERROR_CARD_SIZE;
    let mut card = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
    let Some(font) = fonts.sans() else {
        return card;
    };
    let style = TextStyle {
        font,
        em_px: ERROR_TEXT_PX,
        stroke_width: 0.0,
    };
    let max_width = w as f32 - 2.0 * ERROR_MARGIN;
    let line_step = ERROR_TEXT_PX * 1.3;

    let measure = |s: &str| text::measure_ink(&style, s).map_or(0.0, |ink| ink.max_x);
    let mut y = ERROR_MARGIN;
    for line in wrap(message, measure, max_width) {
        if y + line_step > h as f32 {
            break;
        }
        text::draw_text_colored(&mut card, &style, (ERROR_MARGIN, y), &line, ERROR_COLOR);
        y += line_step;
    }
    card
}

/// Greedy word wrap; `measure` returns the rendered width of a candidate line.
fn wrap(message: &str, measure: impl Fn(&str) -> f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in message.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layers_are_scaled_into_their_rect() {
        let page = RgbaImage::from_pixel(200, 300, Rgba([255, 255, 255, 255]));
        let stamp = RgbaImage::from_pixel(90, 56, Rgba([0, 0, 255, 255]));
        let out = composite_preview(
            &page,
            &[PreviewLayer {
                image: stamp,
                rect: Rect::new(100.0, 200.0, 45.0, 28.0),
            }],
        );
        assert_eq!(out.dimensions(), (200, 300));
        assert_eq!(out.get_pixel(120, 210).0, [0, 0, 255, 255]);
        assert_eq!(out.get_pixel(99, 210).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(145, 210).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(120, 228).0, [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_stamp_pixels_keep_the_page() {
        let page = RgbaImage::from_pixel(50, 50, Rgba([255, 255, 255, 255]));
        let out = composite_preview(
            &page,
            &[PreviewLayer {
                image: RgbaImage::new(10, 10),
                rect: Rect::new(5.0, 5.0, 10.0, 10.0),
            }],
        );
        assert_eq!(out, page);
    }

    #[test]
    fn overhanging_layers_are_clipped() {
        let page = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        let stamp = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        let out = composite_preview(
            &page,
            &[PreviewLayer {
                image: stamp,
                rect: Rect::new(30.0, -10.0, 20.0, 20.0),
            }],
        );
        assert_eq!(out.get_pixel(35, 5).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(35, 15).0, [255, 255, 255, 255]);
    }

    #[test]
    fn error_card_has_fixed_size() {
        let card = error_card("The stamp template 'stamp.png' is missing.", &FontBook::empty());
        assert_eq!(card.dimensions(), ERROR_CARD_SIZE);
        assert!(card.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn error_card_text_is_red() {
        let fonts = FontBook::discover(&[]);
        if fonts.sans().is_none() {
            return;
        }
        let card = error_card("Missing template", &fonts);
        assert!(card.pixels().any(|p| p.0[0] > 150 && p.0[1] < 100));
    }

    #[test]
    fn wrap_breaks_on_width() {
        let lines = wrap("aaa bbb ccc\nddd", |s| s.len() as f32, 7.0);
        assert_eq!(lines, vec!["aaa bbb", "ccc", "ddd"]);
    }
}
