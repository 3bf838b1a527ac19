//! Background raster I/O.
//!
//! Pixels are decoded with `image`. PNG resolution metadata (`pHYs`) is read
//! and written with `png` directly since `image` does not carry it through.

use crate::error::{Result, StampError};
use image::{DynamicImage, ImageFormat};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

const METERS_PER_INCH: f64 = 0.0254;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionUnit {
    /// Only the aspect ratio is meaningful.
    Unspecified,
    Meter,
}

/// Pixel density as stored in a PNG `pHYs` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub x_pixels_per_unit: u32,
    pub y_pixels_per_unit: u32,
    pub unit: ResolutionUnit,
}

impl Resolution {
    pub fn from_dpi(dpi: u32) -> Self {
        let per_meter = (dpi as f64 / METERS_PER_INCH).round() as u32;
        Self { x_pixels_per_unit: per_meter, y_pixels_per_unit: per_meter, unit: ResolutionUnit::Meter }
    }

    /// Horizontal and vertical DPI, when the unit is physical.
    pub fn dpi(&self) -> Option<(f64, f64)> {
        match self.unit {
            ResolutionUnit::Meter => Some((
                self.x_pixels_per_unit as f64 * METERS_PER_INCH,
                self.y_pixels_per_unit as f64 * METERS_PER_INCH,
            )),
            ResolutionUnit::Unspecified => None,
        }
    }

    fn to_png(self) -> png::PixelDimensions {
        png::PixelDimensions {
            xppu: self.x_pixels_per_unit,
            yppu: self.y_pixels_per_unit,
            unit: match self.unit {
                ResolutionUnit::Meter => png::Unit::Meter,
                ResolutionUnit::Unspecified => png::Unit::Unspecified,
            },
        }
    }

    fn from_png(dims: &png::PixelDimensions) -> Self {
        Self {
            x_pixels_per_unit: dims.xppu,
            y_pixels_per_unit: dims.yppu,
            unit: match dims.unit {
                png::Unit::Meter => ResolutionUnit::Meter,
                png::Unit::Unspecified => ResolutionUnit::Unspecified,
            },
        }
    }
}

/// Decoded background plus the resolution it was stored with.
#[derive(Debug, Clone)]
pub struct Background {
    pub image: DynamicImage,
    pub resolution: Option<Resolution>,
}

impl Background {
    pub fn new(image: DynamicImage) -> Self {
        Self { image, resolution: None }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|err| match err {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                StampError::not_found(path)
            }
            other => StampError::Image(other),
        })?;

        let resolution = if is_png(path) { read_png_resolution(path) } else { None };
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            ?resolution,
            "background loaded"
        );

        Ok(Self { image, resolution })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Bring any decoded colour layout to 8-bit RGB or RGBA.
///
/// Layouts with an alpha channel become RGBA; all others become RGB.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
        other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Write `image` to `path` in the format implied by its extension.
///
/// PNG outputs carry `resolution`; other formats are written without it.
pub fn save_image(image: &DynamicImage, path: &Path, resolution: Resolution) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| StampError::io(parent, err))?;
    }

    let result = if is_png(path) {
        write_png(image, path, resolution)
    } else {
        write_other(image, path)
    };

    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn write_png(image: &DynamicImage, path: &Path, resolution: Resolution) -> Result<()> {
    let file = File::create(path).map_err(|err| StampError::io(path, err))?;

    let rgba;
    let (color, data): (png::ColorType, &[u8]) = match image {
        DynamicImage::ImageRgb8(buffer) => (png::ColorType::Rgb, buffer.as_raw().as_slice()),
        DynamicImage::ImageRgba8(buffer) => (png::ColorType::Rgba, buffer.as_raw().as_slice()),
        other => {
            rgba = other.to_rgba8();
            (png::ColorType::Rgba, rgba.as_raw().as_slice())
        }
    };

    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(color);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(resolution.to_png()));

    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;
    Ok(())
}

fn write_other(image: &DynamicImage, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)?;
    if format == ImageFormat::Jpeg && image.color().has_alpha() {
        DynamicImage::ImageRgb8(image.to_rgb8()).save_with_format(path, format)?;
    } else {
        image.save_with_format(path, format)?;
    }
    Ok(())
}

fn read_png_resolution(path: &Path) -> Option<Resolution> {
    let file = File::open(path).ok()?;
    match png::Decoder::new(BufReader::new(file)).read_info() {
        Ok(reader) => reader.info().pixel_dims.as_ref().map(Resolution::from_png),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "could not read PNG resolution");
            None
        }
    }
}

fn is_png(path: &Path) -> bool {
    matches!(ImageFormat::from_path(path), Ok(ImageFormat::Png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn dpi_conversion_matches_png_convention() {
        let resolution = Resolution::from_dpi(72);
        assert_eq!(resolution.x_pixels_per_unit, 2835);
        let (x, _) = resolution.dpi().unwrap();
        assert!((x - 72.0).abs() < 0.01);
    }

    #[test]
    fn grey_becomes_rgb_and_alpha_is_kept() {
        let grey = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([9])));
        assert!(matches!(normalize_color(grey), DynamicImage::ImageRgb8(_)));

        let grey_alpha = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(2, 2));
        assert!(matches!(normalize_color(grey_alpha), DynamicImage::ImageRgba8(_)));

        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        assert!(matches!(normalize_color(rgba), DynamicImage::ImageRgba8(_)));
    }

    #[test]
    fn png_resolution_survives_save_and_open() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("out.png");
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])));
        let resolution = Resolution::from_dpi(144);

        save_image(&image, &path, resolution).unwrap();
        let loaded = Background::open(&path).unwrap();

        assert_eq!(loaded.resolution, Some(resolution));
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
        assert_eq!(loaded.image.to_rgba8().get_pixel(2, 1), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn non_png_outputs_are_written_by_extension() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("out.bmp");
        let image = DynamicImage::ImageRgb8(image::RgbImage::new(4, 4));

        save_image(&image, &path, Resolution::from_dpi(72)).unwrap();
        let loaded = Background::open(&path).unwrap();
        assert_eq!(loaded.resolution, None);
        assert_eq!(loaded.width(), 4);
    }

    #[test]
    fn open_missing_file_is_not_found() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let err = Background::open(&temp.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, StampError::NotFound { .. }));
    }
}
