//! Mask-guided inpainting on RGBA buffers.
//!
//! Converts an RGBA image and an RGBA brush mask into the layouts the
//! primitive works with (3-channel colour, binary 1-channel mask), runs it,
//! and converts the result back to opaque RGBA.

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::primitive::{ColorConversion, InpaintMethod, InpaintPrimitive, MatScope};

/// Smallest radius passed to the primitive.
pub const MIN_RADIUS: u32 = 1;

/// Largest radius passed to the primitive.
pub const MAX_RADIUS: u32 = 30;

/// Mask intensities at or above this are selected. Anti-aliased brush edges
/// with intensity 1 count as selected.
pub const MASK_CUTOFF: u8 = 1;

/// Value written for selected mask pixels.
const MASK_SELECTED: u8 = 255;

/// Clamp a user-supplied radius to `[MIN_RADIUS, MAX_RADIUS]`.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn clamp_radius(radius: i32) -> u32 {
    radius.clamp(MIN_RADIUS as i32, MAX_RADIUS as i32) as u32
}

/// Inpaint the pixels of `image` selected by `mask`.
///
/// `mask` must have the same dimensions as `image`; any pixel whose
/// luminance is non-zero is synthesized. The radius is clamped with
/// [`clamp_radius`]. The returned image is fully opaque.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the buffers differ in size and
/// [`Error::Processing`] if the primitive fails. Every buffer allocated from
/// the primitive is released before returning, on both paths.
pub fn inpaint<P: InpaintPrimitive + ?Sized>(
    primitive: &P,
    image: &RgbaImage,
    mask: &RgbaImage,
    radius: i32,
    method: InpaintMethod,
) -> Result<RgbaImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch {
            width: image.width(),
            height: image.height(),
            mask_width: mask.width(),
            mask_height: mask.height(),
        });
    }

    let radius = clamp_radius(radius);
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        radius,
        ?method,
        "inpainting masked region"
    );

    let mut scope = MatScope::new(primitive);
    run_pipeline(&mut scope, image, mask, radius, method).map_err(|e| match e {
        Error::Processing(_) => e,
        other => Error::Processing(other.to_string()),
    })
}

fn run_pipeline<P: InpaintPrimitive + ?Sized>(
    scope: &mut MatScope<'_, P>,
    image: &RgbaImage,
    mask: &RgbaImage,
    radius: u32,
    method: InpaintMethod,
) -> Result<RgbaImage> {
    let primitive = scope.primitive();
    let (width, height) = image.dimensions();

    let src = primitive.alloc(width, height, 4, image.as_raw().clone())?;
    let src = scope.keep(src);
    let mask_src = primitive.alloc(width, height, 4, mask.as_raw().clone())?;
    let mask_src = scope.keep(mask_src);

    let rgb = primitive.convert_color(scope.get(src), ColorConversion::RgbaToRgb)?;
    let rgb = scope.keep(rgb);

    let gray = primitive.convert_color(scope.get(mask_src), ColorConversion::RgbaToGray)?;
    let gray = scope.keep(gray);
    let binary = primitive.threshold(scope.get(gray), MASK_CUTOFF, MASK_SELECTED)?;
    let binary = scope.keep(binary);

    let filled = primitive.inpaint(scope.get(rgb), scope.get(binary), radius, method)?;
    let filled = scope.keep(filled);

    let rgba = primitive.convert_color(scope.get(filled), ColorConversion::RgbToRgba)?;
    let rgba = scope.keep(rgba);

    let out = scope.get(rgba);
    if out.width() != width || out.height() != height || out.channels() != 4 {
        return Err(Error::Processing(format!(
            "primitive returned {}x{}x{}, expected {width}x{height}x4",
            out.width(),
            out.height(),
            out.channels()
        )));
    }

    RgbaImage::from_raw(width, height, out.data().to_vec())
        .ok_or_else(|| Error::Processing("primitive returned a short buffer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativePrimitive;
    use crate::primitive::Mat;
    use image::Rgba;

    /// Delegates to [`NativePrimitive`] but fails every inpaint call.
    struct Failing(NativePrimitive);

    impl InpaintPrimitive for Failing {
        fn alloc(&self, width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Mat> {
            self.0.alloc(width, height, channels, data)
        }

        fn convert_color(&self, src: &Mat, conversion: ColorConversion) -> Result<Mat> {
            self.0.convert_color(src, conversion)
        }

        fn threshold(&self, src: &Mat, cutoff: u8, max_value: u8) -> Result<Mat> {
            self.0.threshold(src, cutoff, max_value)
        }

        fn inpaint(
            &self,
            _image: &Mat,
            _mask: &Mat,
            _radius: u32,
            _method: InpaintMethod,
        ) -> Result<Mat> {
            Err(Error::UnsupportedFormat("buffer too large".to_string()))
        }

        fn release(&self, mat: Mat) {
            self.0.release(mat);
        }
    }

    fn gray_with_black_dot(size: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(size, size, Rgba([90, 90, 90, 255]));
        img.put_pixel(size / 2, size / 2, Rgba([0, 0, 0, 255]));
        img
    }

    fn dot_mask(size: u32, intensity: u8) -> RgbaImage {
        let mut mask = RgbaImage::new(size, size);
        mask.put_pixel(size / 2, size / 2, Rgba([intensity, intensity, intensity, 255]));
        mask
    }

    #[test]
    fn radius_is_clamped() {
        assert_eq!(clamp_radius(-5), 1);
        assert_eq!(clamp_radius(0), 1);
        assert_eq!(clamp_radius(1), 1);
        assert_eq!(clamp_radius(12), 12);
        assert_eq!(clamp_radius(30), 30);
        assert_eq!(clamp_radius(31), 30);
        assert_eq!(clamp_radius(i32::MAX), 30);
    }

    #[test]
    fn empty_mask_is_a_no_op() {
        let primitive = NativePrimitive::new();
        let img = gray_with_black_dot(12);
        let mask = RgbaImage::new(12, 12);
        let out = inpaint(&primitive, &img, &mask, 5, InpaintMethod::Telea).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn output_is_opaque() {
        let primitive = NativePrimitive::new();
        let img = RgbaImage::from_pixel(6, 6, Rgba([10, 20, 30, 40]));
        let mask = RgbaImage::new(6, 6);
        let out = inpaint(&primitive, &img, &mask, 3, InpaintMethod::Telea).unwrap();
        assert!(out.pixels().all(|px| *px == Rgba([10, 20, 30, 255])));
    }

    #[test]
    fn faint_and_full_mask_pixels_are_treated_alike() {
        let primitive = NativePrimitive::new();
        let img = gray_with_black_dot(12);

        let faint = inpaint(&primitive, &img, &dot_mask(12, 1), 3, InpaintMethod::Telea).unwrap();
        let full = inpaint(&primitive, &img, &dot_mask(12, 255), 3, InpaintMethod::Telea).unwrap();

        assert_eq!(faint, full);
        let px = full.get_pixel(6, 6);
        assert!(px.0[..3].iter().all(|&c| c.abs_diff(90) <= 1), "got {px:?}");
        assert_eq!(px[3], 255);
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let primitive = NativePrimitive::new();
        let img = RgbaImage::new(8, 8);
        let mask = RgbaImage::new(4, 8);
        let err = inpaint(&primitive, &img, &mask, 3, InpaintMethod::Telea).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert_eq!(primitive.live_mats(), 0);
    }

    #[test]
    fn all_buffers_released_after_success() {
        let primitive = NativePrimitive::new();
        let img = gray_with_black_dot(10);
        inpaint(&primitive, &img, &dot_mask(10, 255), 50, InpaintMethod::Mean).unwrap();
        assert_eq!(primitive.live_mats(), 0);
    }

    #[test]
    fn primitive_failure_is_reported_as_processing_error() {
        let primitive = Failing(NativePrimitive::new());
        let img = gray_with_black_dot(10);
        let err = inpaint(&primitive, &img, &dot_mask(10, 255), 5, InpaintMethod::Telea)
            .unwrap_err();
        assert!(matches!(err, Error::Processing(_)));
        assert_eq!(primitive.0.live_mats(), 0);
    }
}
