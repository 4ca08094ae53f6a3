//! Pixel baking: decode -> transform -> re-encode.
//!
//! Rotations, flips and crops are written into new pixel data instead of
//! being stacked as style transforms. Works on `data:` URLs so it runs the
//! same natively and in the browser.

use crate::config::EditorConfig;
use crate::manipulate::image::PixelRect;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("not a base64 data URL")]
    UnsupportedDataUrl,
    #[error("base64 payload is invalid: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image could not be decoded: {0}")]
    Decode(image::ImageError),
    #[error("image could not be encoded: {0}")]
    Encode(image::ImageError),
    #[error("crop {0:?} is outside a {1}x{2} image")]
    InvalidGeometry(PixelRect, u32, u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RasterOp {
    /// Clockwise, degrees.
    Rotate { degrees: f64 },
    FlipHorizontal,
    FlipVertical,
    Crop(PixelRect),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg { quality: u8 },
}

impl OutputFormat {
    fn mime(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg { .. } => "image/jpeg",
        }
    }
}

/// Result of a bake: the new source and its natural size.
#[derive(Clone, Debug, PartialEq)]
pub struct Baked {
    pub data_url: String,
    pub width: u32,
    pub height: u32,
}

pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>), RasterError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or(RasterError::UnsupportedDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(RasterError::UnsupportedDataUrl)?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or(RasterError::UnsupportedDataUrl)?;
    Ok((mime.to_string(), STANDARD.decode(payload.trim())?))
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn decode(url: &str) -> Result<(String, DynamicImage), RasterError> {
    let (mime, bytes) = decode_data_url(url)?;
    let img = image::load_from_memory(&bytes).map_err(RasterError::Decode)?;
    Ok((mime, img))
}

pub fn encode(img: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, RasterError> {
    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => img
            .to_rgba8()
            .write_with_encoder(PngEncoder::new(&mut buf))
            .map_err(RasterError::Encode)?,
        // JPEG has no alpha channel.
        OutputFormat::Jpeg { quality } => img
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            .map_err(RasterError::Encode)?,
    }
    Ok(buf)
}

/// Rotate into expanded bounds, nearest-neighbour, transparent corners.
fn rotate_any(img: &DynamicImage, degrees: f64) -> DynamicImage {
    let src = img.to_rgba8();
    let (w, h) = src.dimensions();
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();

    let out_w = (w as f64 * cos.abs() + h as f64 * sin.abs()).round().max(1.0) as u32;
    let out_h = (w as f64 * sin.abs() + h as f64 * cos.abs()).round().max(1.0) as u32;
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);

    let mut out = RgbaImage::from_pixel(out_w, out_h, Rgba([0, 0, 0, 0]));
    for (x, y, px) in out.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - ocx;
        let dy = y as f64 + 0.5 - ocy;
        let sx = cos * dx + sin * dy + cx;
        let sy = -sin * dx + cos * dy + cy;
        if sx >= 0.0 && sy >= 0.0 && sx < w as f64 && sy < h as f64 {
            *px = *src.get_pixel(sx as u32, sy as u32);
        }
    }
    DynamicImage::ImageRgba8(out)
}

fn rotate(img: DynamicImage, degrees: f64) -> DynamicImage {
    let d = degrees.rem_euclid(360.0);
    let near = |target: f64| (d - target).abs() < 1e-6;
    if near(0.0) || near(360.0) {
        img
    } else if near(90.0) {
        img.rotate90()
    } else if near(180.0) {
        img.rotate180()
    } else if near(270.0) {
        img.rotate270()
    } else {
        rotate_any(&img, d)
    }
}

pub fn apply(img: DynamicImage, op: RasterOp) -> Result<DynamicImage, RasterError> {
    Ok(match op {
        RasterOp::Rotate { degrees } => rotate(img, degrees),
        RasterOp::FlipHorizontal => img.fliph(),
        RasterOp::FlipVertical => img.flipv(),
        RasterOp::Crop(r) => {
            let (w, h) = img.dimensions();
            if r.width == 0
                || r.height == 0
                || r.x.saturating_add(r.width) > w
                || r.y.saturating_add(r.height) > h
            {
                return Err(RasterError::InvalidGeometry(r, w, h));
            }
            img.crop_imm(r.x, r.y, r.width, r.height)
        }
    })
}

fn is_right_angle(degrees: f64) -> bool {
    let d = degrees.rem_euclid(90.0);
    d < 1e-6 || (90.0 - d) < 1e-6
}

/// Decode `src`, run `ops` in order and re-encode.
///
/// PNG sources stay PNG, as do free-angle rotations (their corners are
/// transparent); everything else goes out as JPEG.
pub fn bake(src: &str, ops: &[RasterOp], quality: u8) -> Result<Baked, RasterError> {
    let (mime, mut img) = decode(src)?;
    for op in ops {
        img = apply(img, *op)?;
    }

    let needs_alpha = ops.iter().any(|op| match op {
        RasterOp::Rotate { degrees } => !is_right_angle(*degrees),
        _ => false,
    });
    let format = if mime == "image/png" || needs_alpha {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg { quality }
    };

    let bytes = encode(&img, format)?;
    Ok(Baked {
        data_url: encode_data_url(format.mime(), &bytes),
        width: img.width(),
        height: img.height(),
    })
}

/// Prepare an uploaded image for embedding.
///
/// Oversized files (bytes or dimensions) are downscaled, aspect preserved, and
/// re-encoded as JPEG. Anything else is kept byte-for-byte.
pub fn prepare_upload(src: &str, cfg: &EditorConfig) -> Result<Baked, RasterError> {
    let (_, bytes) = decode_data_url(src)?;
    let img = image::load_from_memory(&bytes).map_err(RasterError::Decode)?;
    let (w, h) = img.dimensions();
    let max = cfg.image_max_dimension;

    if bytes.len() <= cfg.image_max_bytes && w <= max && h <= max {
        return Ok(Baked {
            data_url: src.to_string(),
            width: w,
            height: h,
        });
    }

    let scaled = if w > max || h > max {
        img.resize(max, max, FilterType::Triangle)
    } else {
        img
    };
    let format = OutputFormat::Jpeg {
        quality: cfg.image_quality,
    };
    let out = encode(&scaled, format)?;
    log::debug!(
        "downscaled upload {w}x{h} ({} bytes) to {}x{} ({} bytes)",
        bytes.len(),
        scaled.width(),
        scaled.height(),
        out.len()
    );
    Ok(Baked {
        data_url: encode_data_url(format.mime(), &out),
        width: scaled.width(),
        height: scaled.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// 4x2 image, left half red, right half blue.
    fn sample_png() -> String {
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });
        let bytes = encode(&DynamicImage::ImageRgba8(img), OutputFormat::Png).expect("encode");
        encode_data_url("image/png", &bytes)
    }

    #[test]
    fn test_rotate_90_swaps_dimensions() {
        let baked = bake(&sample_png(), &[RasterOp::Rotate { degrees: 90.0 }], 85).expect("bake");
        assert_eq!((baked.width, baked.height), (2, 4));
        assert!(baked.data_url.starts_with("data:image/png;base64,"));

        let (_, img) = decode(&baked.data_url).expect("decode");
        // Clockwise: the left (red) half ends up on top.
        assert_eq!(img.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(0, 3), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_flip_horizontal_mirrors_pixels() {
        let baked = bake(&sample_png(), &[RasterOp::FlipHorizontal], 85).expect("bake");
        let (_, img) = decode(&baked.data_url).expect("decode");
        assert_eq!(img.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_crop_extracts_region() {
        let rect = PixelRect {
            x: 2,
            y: 0,
            width: 2,
            height: 2,
        };
        let baked = bake(&sample_png(), &[RasterOp::Crop(rect)], 85).expect("bake");
        assert_eq!((baked.width, baked.height), (2, 2));
        let (_, img) = decode(&baked.data_url).expect("decode");
        assert_eq!(img.get_pixel(1, 1), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_crop_outside_image_is_rejected() {
        let rect = PixelRect {
            x: 3,
            y: 0,
            width: 5,
            height: 1,
        };
        assert!(matches!(
            bake(&sample_png(), &[RasterOp::Crop(rect)], 85),
            Err(RasterError::InvalidGeometry(..))
        ));
    }

    #[test]
    fn test_free_rotation_expands_bounds() {
        let baked = bake(&sample_png(), &[RasterOp::Rotate { degrees: 45.0 }], 85).expect("bake");
        assert!(baked.width >= 4 && baked.height >= 4);
    }

    #[test]
    fn test_upload_downscaled_above_limits() {
        let cfg = EditorConfig {
            image_max_dimension: 2,
            ..EditorConfig::default()
        };
        let baked = prepare_upload(&sample_png(), &cfg).expect("prepare");
        assert_eq!((baked.width, baked.height), (2, 1));
        assert!(baked.data_url.starts_with("data:image/jpeg;base64,"));

        let kept = prepare_upload(&sample_png(), &EditorConfig::default()).expect("prepare");
        assert_eq!(kept.data_url, sample_png());
    }

    #[test]
    fn test_rejects_non_data_urls() {
        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(RasterError::UnsupportedDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png,raw"),
            Err(RasterError::UnsupportedDataUrl)
        ));
    }
}
