//! Badge compositing.
//!
//! Badges are centred on each stamp's position scaled by the device pixel
//! ratio and blended source-over in ascending id order, so higher ids end up
//! on top. Anything falling outside the canvas is clipped.

use crate::background::{normalize_color, save_image, Background, Resolution};
use crate::badge::BadgeRenderer;
use crate::collection::StampCollection;
use crate::config::{scaled_size, StamperConfig, DEFAULT_BADGE_SIZE, DEFAULT_DPI};
use crate::error::Result;
use crate::naming::StampPaths;
use image::{DynamicImage, RgbImage, RgbaImage};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Compositor<R> {
    renderer: R,
    badge_size: u32,
    pixel_ratio: f64,
    default_dpi: u32,
}

impl<R: BadgeRenderer> Compositor<R> {
    pub fn new(renderer: R) -> Self {
        Self { renderer, badge_size: DEFAULT_BADGE_SIZE, pixel_ratio: 1.0, default_dpi: DEFAULT_DPI }
    }

    pub fn from_config(renderer: R, config: &StamperConfig) -> Self {
        Self {
            renderer,
            badge_size: config.badge_size,
            pixel_ratio: config.pixel_ratio,
            default_dpi: config.default_dpi,
        }
    }

    pub fn with_badge_size(mut self, size: u32) -> Self {
        self.badge_size = size;
        self
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    /// Side length of every badge in background pixels.
    pub fn badge_pixels(&self) -> u32 {
        scaled_size(self.badge_size, self.pixel_ratio)
    }

    /// Draw every stamp's badge onto a copy of `background`.
    ///
    /// The result is 8-bit RGB or RGBA and has the background's dimensions.
    pub fn composite(&self, background: &DynamicImage, stamps: &StampCollection) -> DynamicImage {
        let mut canvas = match normalize_color(background.clone()) {
            DynamicImage::ImageRgb8(rgb) => Canvas::Rgb(rgb),
            other => Canvas::Rgba(other.into_rgba8()),
        };
        let size = self.badge_pixels();
        let (width, height) = (i64::from(background.width()), i64::from(background.height()));

        for stamp in stamps.iter() {
            let badge = self.renderer.render(stamp.id.label(), size);
            let x = origin(stamp.x, self.pixel_ratio, badge.width());
            let y = origin(stamp.y, self.pixel_ratio, badge.height());

            // Entirely off-canvas.
            if x >= width
                || y >= height
                || x.saturating_add(i64::from(badge.width())) <= 0
                || y.saturating_add(i64::from(badge.height())) <= 0
            {
                continue;
            }

            match &mut canvas {
                Canvas::Rgba(target) => image::imageops::overlay(target, &badge, x, y),
                Canvas::Rgb(target) => blend_onto_rgb(target, &badge, x, y),
            }
        }

        match canvas {
            Canvas::Rgb(rgb) => DynamicImage::ImageRgb8(rgb),
            Canvas::Rgba(rgba) => DynamicImage::ImageRgba8(rgba),
        }
    }

    /// Composite and write `paths.stamped()`.
    ///
    /// Without a supplied background the conventional original/plain image is
    /// loaded. The output keeps the background's resolution, or gets the
    /// default DPI when it had none.
    pub fn render_file(
        &self,
        paths: &StampPaths,
        stamps: &StampCollection,
        background: Option<Background>,
    ) -> Result<PathBuf> {
        let background = match background {
            Some(background) => background,
            None => Background::open(&paths.resolve_background()?)?,
        };

        let composed = self.composite(&background.image, stamps);
        let resolution =
            background.resolution.unwrap_or_else(|| Resolution::from_dpi(self.default_dpi));

        let output = paths.stamped();
        save_image(&composed, &output, resolution)?;
        tracing::info!(
            path = %output.display(),
            stamps = stamps.len(),
            pixel_ratio = self.pixel_ratio,
            "stamped image written"
        );

        Ok(output)
    }
}

/// Top-left badge coordinate centring a badge of `extent` pixels on `value × ratio`.
fn origin(value: f64, ratio: f64, extent: u32) -> i64 {
    ((value * ratio).round() as i64).saturating_sub(i64::from(extent / 2))
}

enum Canvas {
    Rgb(RgbImage),
    Rgba(RgbaImage),
}

/// Source-over blend of an RGBA badge onto an opaque RGB canvas.
fn blend_onto_rgb(target: &mut RgbImage, badge: &RgbaImage, x: i64, y: i64) {
    let (width, height) = (i64::from(target.width()), i64::from(target.height()));

    for (bx, by, source) in badge.enumerate_pixels() {
        let alpha = source.0[3] as f32 / 255.0;
        if alpha <= 0.0 {
            continue;
        }

        let tx = x.saturating_add(i64::from(bx));
        let ty = y.saturating_add(i64::from(by));
        if tx < 0 || ty < 0 || tx >= width || ty >= height {
            continue;
        }

        let destination = target.get_pixel_mut(tx as u32, ty as u32);
        for channel in 0..3 {
            let blended = source.0[channel] as f32 * alpha
                + destination.0[channel] as f32 * (1.0 - alpha);
            destination.0[channel] = blended.round() as u8;
        }
    }
}
