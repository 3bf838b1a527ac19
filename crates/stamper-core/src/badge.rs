//! Numbered badge bitmaps.
//!
//! The compositor only asks a [`BadgeRenderer`] for a square RGBA bitmap of a
//! given label and side length. [`DiscBadgeRenderer`] draws a filled disc with
//! the label in a built-in 5×7 digit font, supersampled for smooth edges.

use image::{Rgba, RgbaImage};

/// Produces a `size × size` badge showing `label`.
///
/// Implementations must be deterministic for a given `(label, size)`.
pub trait BadgeRenderer {
    fn render(&self, label: u32, size: u32) -> RgbaImage;
}

impl<F> BadgeRenderer for F
where
    F: Fn(u32, u32) -> RgbaImage,
{
    fn render(&self, label: u32, size: u32) -> RgbaImage {
        self(label, size)
    }
}

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
/// Glyph advance in font units, one blank column between digits.
const GLYPH_ADVANCE: u32 = GLYPH_COLUMNS + 1;
const SUPERSAMPLE: u32 = 4;

/// Row bitmaps for `0`..=`9`, most significant of the low five bits on the left.
const DIGITS: [[u8; GLYPH_ROWS as usize]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

/// Black disc with white digits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscBadgeRenderer {
    pub fill: Rgba<u8>,
    pub text: Rgba<u8>,
    /// Digit height relative to the diameter
    pub text_height: f32,
    /// Widest the label may get relative to the diameter
    pub max_text_width: f32,
}

impl Default for DiscBadgeRenderer {
    fn default() -> Self {
        Self {
            fill: Rgba([0, 0, 0, 255]),
            text: Rgba([255, 255, 255, 255]),
            text_height: 0.6,
            max_text_width: 0.8,
        }
    }
}

impl BadgeRenderer for DiscBadgeRenderer {
    fn render(&self, label: u32, size: u32) -> RgbaImage {
        let mut badge = RgbaImage::new(size, size);
        if size == 0 {
            return badge;
        }

        let layout = LabelLayout::new(label, size as f32, self.text_height, self.max_text_width);
        let center = size as f32 / 2.0;
        let radius_sq = center * center;
        let samples = (SUPERSAMPLE * SUPERSAMPLE) as f32;

        for (px, py, pixel) in badge.enumerate_pixels_mut() {
            let mut disc_hits = 0u32;
            let mut text_hits = 0u32;

            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let x = px as f32 + (sx as f32 + 0.5) / SUPERSAMPLE as f32;
                    let y = py as f32 + (sy as f32 + 0.5) / SUPERSAMPLE as f32;
                    let (dx, dy) = (x - center, y - center);
                    if dx * dx + dy * dy > radius_sq {
                        continue;
                    }
                    disc_hits += 1;
                    if layout.covers(x, y) {
                        text_hits += 1;
                    }
                }
            }

            if disc_hits == 0 {
                continue;
            }

            let text_share = text_hits as f32 / disc_hits as f32;
            let mut color = [0u8; 4];
            for channel in 0..3 {
                let mixed = self.text.0[channel] as f32 * text_share
                    + self.fill.0[channel] as f32 * (1.0 - text_share);
                color[channel] = mixed.round() as u8;
            }
            let coverage = disc_hits as f32 / samples;
            color[3] = (self.fill.0[3] as f32 * coverage).round() as u8;
            *pixel = Rgba(color);
        }

        badge
    }
}

/// Placement of the label's digit cells inside the badge.
struct LabelLayout {
    digits: Vec<usize>,
    left: f32,
    top: f32,
    /// Side of one font unit in badge pixels
    cell: f32,
}

impl LabelLayout {
    fn new(label: u32, size: f32, text_height: f32, max_text_width: f32) -> Self {
        let digits: Vec<usize> =
            label.to_string().bytes().map(|digit| (digit - b'0') as usize).collect();
        let columns = text_columns(digits.len());

        let mut cell = size * text_height / GLYPH_ROWS as f32;
        let max_width = size * max_text_width;
        if cell * columns as f32 > max_width {
            cell = max_width / columns as f32;
        }

        let center = size / 2.0;
        Self {
            left: center - cell * columns as f32 / 2.0,
            top: center - cell * GLYPH_ROWS as f32 / 2.0,
            cell,
            digits,
        }
    }

    fn covers(&self, x: f32, y: f32) -> bool {
        let u = (x - self.left) / self.cell;
        let v = (y - self.top) / self.cell;
        if u < 0.0 || v < 0.0 {
            return false;
        }

        let (column, row) = (u as u32, v as u32);
        if row >= GLYPH_ROWS || column >= text_columns(self.digits.len()) {
            return false;
        }

        let glyph_column = column % GLYPH_ADVANCE;
        if glyph_column >= GLYPH_COLUMNS {
            return false;
        }

        let digit = self.digits[(column / GLYPH_ADVANCE) as usize];
        let bits = DIGITS[digit][row as usize];
        bits & (1 << (GLYPH_COLUMNS - 1 - glyph_column)) != 0
    }
}

fn text_columns(digit_count: usize) -> u32 {
    (digit_count as u32 * GLYPH_ADVANCE).saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    #[test]
    fn badge_has_requested_size() {
        let renderer = DiscBadgeRenderer::default();
        for size in [1, 20, 40, 33] {
            let badge = renderer.render(7, size);
            assert_eq!(badge.dimensions(), (size, size));
        }
    }

    #[test]
    fn corners_are_transparent() {
        let badge = DiscBadgeRenderer::default().render(1, 20);
        assert_eq!(badge.get_pixel(0, 0).0[3], 0);
        assert_eq!(badge.get_pixel(19, 19).0[3], 0);
    }

    #[test]
    fn disc_is_filled_and_digit_is_drawn() {
        let badge = DiscBadgeRenderer::default().render(1, 20);

        // Inside the disc, above the label.
        assert_eq!(*badge.get_pixel(10, 1), BLACK);
        // Stem of the "1", mostly covered.
        let stem = badge.get_pixel(10, 10);
        assert!(stem.0[0] > 128);
        assert_eq!(stem.0[3], 255);
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = DiscBadgeRenderer::default();
        assert_eq!(renderer.render(12, 24), renderer.render(12, 24));
        assert_ne!(renderer.render(12, 24), renderer.render(21, 24));
    }

    #[test]
    fn long_labels_shrink_to_fit() {
        let layout = LabelLayout::new(1234, 20.0, 0.6, 0.8);
        assert!((layout.left - 2.0).abs() < 1e-3);
        assert!(layout.cell < 20.0 * 0.6 / GLYPH_ROWS as f32);
    }

    #[test]
    fn closures_are_renderers() {
        let solid = |_label: u32, size: u32| RgbaImage::from_pixel(size, size, WHITE);
        assert_eq!(solid.render(3, 4).dimensions(), (4, 4));
    }
}
