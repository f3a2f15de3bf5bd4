//! Single-image downsize + recompress.
//!
//! Decode, cap the width (Lanczos3, never upscale), normalise the colour
//! type for the output codec, re-encode and swap the result in atomically.
//! On any error the original is left byte-identical.

use image::codecs::png::{self, CompressionType, PngEncoder};
use image::error::{EncodingError, ImageFormatHint, LimitError, LimitErrorKind};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageError, ImageFormat, ImageReader};
use shared_utils::common_utils::get_extension_lowercase;
use shared_utils::img_errors::{ImgShrinkError, Result};
use shared_utils::{replace_atomically, FileOutcome, ImagePolicy};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// Output codec, chosen by the file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match get_extension_lowercase(path).as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

/// Size after capping `width` at `max_width`, keeping the aspect ratio.
/// The height is floored and never below 1.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = u64::from(height) * u64::from(max_width) / u64::from(width);
    (max_width, scaled.max(1) as u32)
}

/// Make `img` encodable by `format`.
///
/// JPEG has no alpha channel: greyscale stays 8-bit luma, everything else
/// becomes RGB8 with the alpha dropped. PNG keeps its integer colour types;
/// anything else becomes RGBA8 or RGB8 depending on alpha.
pub fn normalize_color(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    let color = img.color();
    match format {
        OutputFormat::Jpeg => match color {
            ColorType::L8 => img,
            ColorType::L16 => DynamicImage::ImageLuma8(img.into_luma8()),
            _ => DynamicImage::ImageRgb8(img.into_rgb8()),
        },
        OutputFormat::Png => match color {
            ColorType::L8
            | ColorType::La8
            | ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16 => img,
            _ if color.has_alpha() => DynamicImage::ImageRgba8(img.into_rgba8()),
            _ => DynamicImage::ImageRgb8(img.into_rgb8()),
        },
    }
}

/// Progressive JPEG with optimized Huffman tables. `img` must already be
/// normalized for JPEG (L8 or RGB8).
fn encode_jpeg(
    img: &DynamicImage,
    quality: u8,
    writer: &mut BufWriter<&mut File>,
) -> std::result::Result<(), ImageError> {
    let too_large = || ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError));
    let width = u16::try_from(img.width()).map_err(|_| too_large())?;
    let height = u16::try_from(img.height()).map_err(|_| too_large())?;

    let mut encoder = jpeg_encoder::Encoder::new(writer, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);

    let encoded = match img {
        DynamicImage::ImageLuma8(gray) => {
            encoder.encode(gray.as_raw(), width, height, jpeg_encoder::ColorType::Luma)
        }
        other => encoder.encode(
            other.to_rgb8().as_raw(),
            width,
            height,
            jpeg_encoder::ColorType::Rgb,
        ),
    };
    encoded.map_err(|e| {
        ImageError::Encoding(EncodingError::new(
            ImageFormatHint::Exact(ImageFormat::Jpeg),
            e,
        ))
    })
}

fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    policy: &ImagePolicy,
    writer: &mut BufWriter<&mut File>,
) -> std::result::Result<(), ImageError> {
    match format {
        OutputFormat::Jpeg => encode_jpeg(img, policy.jpeg_quality, writer),
        OutputFormat::Png if policy.png_optimize => img.write_with_encoder(
            PngEncoder::new_with_quality(writer, CompressionType::Best, png::FilterType::Adaptive),
        ),
        OutputFormat::Png => img.write_with_encoder(PngEncoder::new(writer)),
    }
}

/// Downsize and recompress `path` in place according to `policy`.
pub fn compress_image(path: &Path, policy: &ImagePolicy) -> Result<FileOutcome> {
    let format = OutputFormat::from_path(path)
        .ok_or_else(|| ImgShrinkError::UnsupportedFormat(path.display().to_string()))?;

    let before = std::fs::metadata(path)
        .map_err(|e| ImgShrinkError::io(path, e))?
        .len();

    let img = ImageReader::open(path)
        .map_err(|e| ImgShrinkError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| ImgShrinkError::io(path, e))?
        .decode()
        .map_err(|source| ImgShrinkError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let (width, height) = (img.width(), img.height());
    let (new_width, new_height) = target_dimensions(width, height, policy.max_width);
    let img = if (new_width, new_height) != (width, height) {
        debug!(
            file = %path.display(),
            from = %format!("{}x{}", width, height),
            to = %format!("{}x{}", new_width, new_height),
            "Resizing"
        );
        img.resize_exact(new_width, new_height, FilterType::Lanczos3)
    } else {
        img
    };
    let img = normalize_color(img, format);

    let after = replace_atomically(path, |w| encode(&img, format, policy, w)).map_err(
        |err| match err {
            ImageError::IoError(source) => ImgShrinkError::io(path, source),
            source => ImgShrinkError::Encode {
                path: path.to_path_buf(),
                source,
            },
        },
    )?;

    info!(
        file = %path.display(),
        before,
        after,
        width = new_width,
        height = new_height,
        "Image recompressed"
    );
    Ok(FileOutcome::Compressed { before, after })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    fn gradient_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    #[test]
    fn test_target_dimensions_no_upscale() {
        assert_eq!(target_dimensions(800, 600, 1200), (800, 600));
        assert_eq!(target_dimensions(1200, 10, 1200), (1200, 10));
    }

    #[test]
    fn test_target_dimensions_floor_and_minimum() {
        assert_eq!(target_dimensions(2000, 1000, 900), (900, 450));
        assert_eq!(target_dimensions(1000, 333, 500), (500, 166));
        assert_eq!(target_dimensions(5000, 1, 900), (900, 1));
    }

    #[test]
    fn test_output_format_from_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("a.JPEG")), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_path(Path::new("a.Png")), Some(OutputFormat::Png));
        assert_eq!(OutputFormat::from_path(Path::new("a.gif")), None);
    }

    #[test]
    fn test_normalize_drops_alpha_for_jpeg() {
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        assert_eq!(normalize_color(rgba.clone(), OutputFormat::Jpeg).color(), ColorType::Rgb8);
        assert_eq!(normalize_color(rgba, OutputFormat::Png).color(), ColorType::Rgba8);

        let la = DynamicImage::ImageLumaA8(image::GrayAlphaImage::new(4, 4));
        assert_eq!(normalize_color(la, OutputFormat::Jpeg).color(), ColorType::Rgb8);

        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        assert_eq!(normalize_color(gray, OutputFormat::Jpeg).color(), ColorType::L8);
    }

    #[test]
    fn test_ultra_preset_large_jpeg() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("wide.jpg");
        gradient_rgb(2000, 1000).save(&path).unwrap();

        let outcome = compress_image(&path, &ImagePolicy::ultra()).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!(reread.dimensions(), (900, 450));
        assert_eq!(image::guess_format(&fs::read(&path).unwrap()).unwrap(), ImageFormat::Jpeg);
        match outcome {
            FileOutcome::Compressed { after, .. } => {
                assert_eq!(after, fs::metadata(&path).unwrap().len())
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    /// Start-of-frame markers cannot occur inside entropy-coded data, where
    /// every 0xFF byte is stuffed with 0x00.
    fn has_marker(bytes: &[u8], marker: u8) -> bool {
        bytes.windows(2).any(|w| w == [0xFF, marker])
    }

    #[test]
    fn test_jpeg_output_is_progressive() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("landscape.jpg");
        gradient_rgb(1600, 800).save(&path).unwrap();
        assert!(has_marker(&fs::read(&path).unwrap(), 0xC0));

        compress_image(&path, &ImagePolicy::standard()).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(has_marker(&bytes, 0xC2), "expected a progressive SOF2 frame");
        assert!(!has_marker(&bytes, 0xC0), "baseline SOF0 frame still present");
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (1200, 600));
    }

    #[test]
    fn test_grayscale_jpeg_stays_grayscale() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("scan.jpg");
        image::GrayImage::from_fn(1300, 200, |x, _| image::Luma([(x % 256) as u8]))
            .save(&path)
            .unwrap();

        compress_image(&path, &ImagePolicy::standard()).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!(reread.color(), ColorType::L8);
        assert_eq!(reread.dimensions(), (1200, 184));
    }

    #[test]
    fn test_small_image_keeps_dimensions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("small.jpeg");
        gradient_rgb(640, 480).save(&path).unwrap();

        compress_image(&path, &ImagePolicy::standard()).unwrap();

        assert_eq!(image::open(&path).unwrap().dimensions(), (640, 480));
    }

    #[test]
    fn test_png_with_alpha_stays_rgba() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logo.png");
        RgbaImage::from_fn(1600, 400, |x, _| Rgba([255, 0, 0, (x % 256) as u8]))
            .save(&path)
            .unwrap();

        compress_image(&path, &ImagePolicy::standard()).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!(reread.dimensions(), (1200, 300));
        assert!(reread.color().has_alpha());
    }

    #[test]
    fn test_png_bytes_under_jpg_name_become_jpeg_without_alpha() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mislabelled.jpg");
        RgbaImage::from_pixel(50, 50, Rgba([10, 20, 30, 128]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        compress_image(&path, &ImagePolicy::standard()).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert!(!image::load_from_memory(&bytes).unwrap().color().has_alpha());
    }

    #[test]
    fn test_corrupt_file_is_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.jpg");
        fs::write(&path, b"definitely not a jpeg").unwrap();

        let err = compress_image(&path, &ImagePolicy::standard()).unwrap_err();

        assert!(matches!(err, ImgShrinkError::Decode { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"definitely not a jpeg");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
