//! Photo clean-up ahead of recognition.
//!
//! Pipeline: optional ×2 Lanczos upscale (longest side capped) → 3×3 unsharp
//! mask → linear contrast stretch around mid-grey. Every step returns a new
//! buffer; the caller's image is never touched.

use image::{
    codecs::png::PngEncoder,
    error::{ParameterError, ParameterErrorKind},
    imageops::FilterType,
    DynamicImage, GenericImageView, ImageEncoder, ImageError, RgbaImage,
};
use rayon::prelude::*;

use crate::config::PreprocessConfig;
use crate::error::Result;

/// Prepare `image` for the recognition engine.
///
/// `byte_size` is the size of the encoded upload; small files are usually
/// heavily compressed phone shots and get upscaled even when their pixel
/// dimensions look large enough.
pub fn preprocess(
    image: &DynamicImage,
    byte_size: usize,
    config: &PreprocessConfig,
) -> Result<DynamicImage> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        ))
        .into());
    }

    let mut rgba = image.to_rgba8();
    let upscale = needs_upscale(w, h, byte_size, config);
    if upscale {
        let (nw, nh) = upscaled_dimensions(w, h, config);
        rgba = image::imageops::resize(&rgba, nw, nh, FilterType::Lanczos3);
    }
    tracing::debug!(
        from = ?(w, h),
        to = ?rgba.dimensions(),
        byte_size,
        upscale,
        "preprocess"
    );

    let strength = if upscale {
        config.sharpen_strength_upscaled
    } else {
        config.sharpen_strength
    };
    let mut out = unsharp_mask(&rgba, strength);
    stretch_contrast(&mut out, config.contrast);
    Ok(DynamicImage::ImageRgba8(out))
}

fn needs_upscale(w: u32, h: u32, byte_size: usize, config: &PreprocessConfig) -> bool {
    w.max(h) < config.upscale_below_px || byte_size < config.upscale_below_bytes
}

/// Both sides × `upscale_factor`, then shrunk proportionally so the longest
/// side fits `max_dimension`.
fn upscaled_dimensions(w: u32, h: u32, config: &PreprocessConfig) -> (u32, u32) {
    let factor = config.upscale_factor.max(1);
    let (nw, nh) = (w.saturating_mul(factor), h.saturating_mul(factor));
    let longest = nw.max(nh);
    if longest <= config.max_dimension {
        return (nw, nh);
    }
    let scale = config.max_dimension as f64 / longest as f64;
    let fit = |v: u32| ((v as f64 * scale).round() as u32).max(1);
    (fit(nw), fit(nh))
}

/// `out = p + strength * (p - mean3x3)` on R, G and B of every interior pixel.
/// Border rows and columns, and alpha, are copied unchanged.
fn unsharp_mask(img: &RgbaImage, strength: f32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    let mut out = img.clone();
    if w < 3 || h < 3 || strength == 0.0 {
        return out;
    }

    let src = img.as_raw();
    let stride = w * 4;
    out.par_chunks_mut(stride)
        .enumerate()
        .filter(|(y, _)| *y > 0 && *y < h - 1)
        .for_each(|(y, row)| {
            for x in 1..w - 1 {
                for c in 0..3 {
                    let mut sum = 0u32;
                    for dy in [y - 1, y, y + 1] {
                        let base = dy * stride + c;
                        sum += src[base + (x - 1) * 4] as u32
                            + src[base + x * 4] as u32
                            + src[base + (x + 1) * 4] as u32;
                    }
                    let mean = sum as f32 / 9.0;
                    let p = src[y * stride + x * 4 + c] as f32;
                    row[x * 4 + c] = clamp_u8(p + strength * (p - mean));
                }
            }
        });
    out
}

/// `out = factor * (p - 128) + 128` on R, G and B; alpha untouched.
fn stretch_contrast(img: &mut RgbaImage, factor: f32) {
    img.par_chunks_mut(4).for_each(|px| {
        for v in &mut px[..3] {
            *v = clamp_u8(factor * (*v as f32 - 128.0) + 128.0);
        }
    });
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Lossless PNG bytes of `image`, for engines that take an encoded file.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(image.as_bytes(), w, h, image.color().into())?;
    Ok(png)
}
