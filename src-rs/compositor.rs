//! Side-by-side stitching of a group's images.

use crate::error::{StitchError, StitchResult};
use crate::grouping::Group;
use crate::source::ImageSource;
use image::error::{LimitError, LimitErrorKind};
use image::{DynamicImage, ImageError, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

/// Canvas fill: white, fully transparent.
pub const CANVAS_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 0]);

/// Decode a source and normalize it to 8-bit RGBA.
///
/// Palette, grayscale and opaque formats gain an alpha channel set to 255.
pub fn decode_rgba(source: &ImageSource) -> StitchResult<RgbaImage> {
    let bytes = source.read_bytes()?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| StitchError::decode(source.name(), e))?;
    Ok(image.into_rgba8())
}

/// Source-over blend of `src` onto `dst`.
///
/// A fully transparent `src` leaves `dst` untouched; over a transparent `dst`
/// the result is `src` itself.
pub fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = f64::from(src[3]) / 255.0;
    if sa <= 0.0 {
        return dst;
    }
    let da = f64::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let channel = |i: usize| {
        let c = (f64::from(src[i]) * sa + f64::from(dst[i]) * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

fn paste(canvas: &mut RgbaImage, image: &RgbaImage, x_offset: u32) {
    for (x, y, src) in image.enumerate_pixels() {
        let dst = canvas.get_pixel_mut(x_offset + x, y);
        *dst = blend_over(*dst, *src);
    }
}

fn too_large() -> ImageError {
    ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError))
}

/// Lay `images` out left to right, top-aligned.
///
/// The canvas is as wide as all images together and as tall as the tallest.
pub fn stitch_horizontally(images: &[RgbaImage]) -> Result<RgbaImage, ImageError> {
    let width = images
        .iter()
        .try_fold(0u32, |acc, img| acc.checked_add(img.width()))
        .ok_or_else(too_large)?;
    let height = images.iter().map(RgbaImage::height).max().unwrap_or(0);

    let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_BACKGROUND);
    let mut x_offset = 0u32;
    for image in images {
        paste(&mut canvas, image, x_offset);
        x_offset += image.width();
    }
    Ok(canvas)
}

/// Decode every member of `group` and stitch them in member order.
pub fn composite(group: &Group) -> StitchResult<RgbaImage> {
    let images = group
        .members()
        .iter()
        .map(decode_rgba)
        .collect::<StitchResult<Vec<_>>>()?;
    let canvas = stitch_horizontally(&images).map_err(|e| StitchError::Encode {
        name: group.first().name().to_string(),
        source: e,
    })?;
    debug!(
        "stitched {} images from {} into {}x{}",
        images.len(),
        group.first().name(),
        canvas.width(),
        canvas.height()
    );
    Ok(canvas)
}

/// Encode as PNG: lossless, alpha kept.
pub fn encode_png(image: RgbaImage, name: &str) -> StitchResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| StitchError::Encode {
            name: name.to_string(),
            source: e,
        })?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StitchOptions;
    use crate::grouping::group_sources;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn canvas_spans_total_width_and_max_height() {
        let red = solid(100, 50, [255, 0, 0, 255]);
        let blue = solid(150, 80, [0, 0, 255, 255]);
        let canvas = stitch_horizontally(&[red, blue]).unwrap();

        assert_eq!(canvas.dimensions(), (250, 80));
        assert_eq!(*canvas.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(99, 49), Rgba([255, 0, 0, 255]));
        assert_eq!(*canvas.get_pixel(100, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(*canvas.get_pixel(249, 79), Rgba([0, 0, 255, 255]));
        // below the shorter image the canvas stays blank
        assert_eq!(*canvas.get_pixel(50, 60), CANVAS_BACKGROUND);
    }

    #[test]
    fn transparent_pixels_do_not_overwrite() {
        assert_eq!(
            blend_over(Rgba([1, 2, 3, 200]), Rgba([9, 9, 9, 0])),
            Rgba([1, 2, 3, 200])
        );
        assert_eq!(
            blend_over(CANVAS_BACKGROUND, Rgba([10, 20, 30, 128])),
            Rgba([10, 20, 30, 128])
        );
        assert_eq!(
            blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 255])),
            Rgba([255, 255, 255, 255])
        );
    }

    #[test]
    fn half_alpha_over_opaque_mixes() {
        let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]));
    }

    #[test]
    fn formats_without_alpha_become_opaque_rgba() {
        let gray = png_bytes(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            3,
            2,
            Luma([40]),
        )));
        let rgb = png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            2,
            2,
            Rgb([1, 2, 3]),
        )));

        let gray = decode_rgba(&ImageSource::from_bytes("g.png", gray)).unwrap();
        assert_eq!(*gray.get_pixel(0, 0), Rgba([40, 40, 40, 255]));
        let rgb = decode_rgba(&ImageSource::from_bytes("c.png", rgb)).unwrap();
        assert_eq!(*rgb.get_pixel(1, 1), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn undecodable_bytes_report_the_source_name() {
        let err = decode_rgba(&ImageSource::from_bytes("broken.png", b"not an image".to_vec()))
            .unwrap_err();
        match err {
            StitchError::Decode { name, .. } => assert_eq!(name, "broken.png"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn four_numbered_images_make_one_strip() {
        let sizes = [(10, 5), (20, 7), (30, 3), (40, 9)];
        let sources: Vec<ImageSource> = sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| {
                ImageSource::from_bytes(
                    format!("img_{}.png", i + 1),
                    png_bytes(DynamicImage::ImageRgba8(solid(w, h, [i as u8, 0, 0, 255]))),
                )
            })
            .collect();

        let groups = group_sources(sources, &StitchOptions::default());
        assert_eq!(groups.len(), 1);
        let canvas = composite(&groups[0]).unwrap();
        assert_eq!(canvas.dimensions(), (100, 9));
        assert_eq!(canvas.get_pixel(10, 0)[0], 1);
        assert_eq!(canvas.get_pixel(30, 0)[0], 2);
        assert_eq!(canvas.get_pixel(60, 0)[0], 3);
    }

    #[test]
    fn png_encoding_is_lossless() {
        let mut image = solid(4, 4, [10, 20, 30, 0]);
        image.put_pixel(1, 2, Rgba([200, 100, 50, 77]));
        let bytes = encode_png(image.clone(), "x").unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded, image);
    }
}
