//! In-process inpainting primitive.
//!
//! [`InpaintMethod::Telea`] runs the fast-marching method from the `inpaint`
//! crate. [`InpaintMethod::Mean`] fills the hole from the outside in: each
//! pass collects the hole pixels that touch a known pixel and sets them to
//! the plain mean of the known pixels within `radius`, and those pixels then
//! become known for the next pass.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, RgbImage};
use inpaint::prelude::*;

use crate::error::{Error, Result};
use crate::primitive::{ColorConversion, InpaintMethod, InpaintPrimitive, Mat};

/// Built-in [`InpaintPrimitive`] that counts its live buffers.
#[derive(Debug, Default)]
pub struct NativePrimitive {
    live: AtomicUsize,
}

impl NativePrimitive {
    /// Create a primitive with no live buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers handed out and not yet released.
    #[must_use]
    pub fn live_mats(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    fn track(&self, mat: Mat) -> Mat {
        self.live.fetch_add(1, Ordering::Relaxed);
        mat
    }
}

impl InpaintPrimitive for NativePrimitive {
    fn alloc(&self, width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Mat> {
        Ok(self.track(Mat::new(width, height, channels, data)?))
    }

    fn convert_color(&self, src: &Mat, conversion: ColorConversion) -> Result<Mat> {
        if src.channels() != conversion.source_channels() {
            return Err(Error::Processing(format!(
                "{conversion:?} expects {} channels, got {}",
                conversion.source_channels(),
                src.channels()
            )));
        }

        let data: Vec<u8> = match conversion {
            ColorConversion::RgbaToRgb => src
                .data()
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect(),
            ColorConversion::RgbaToGray => src
                .data()
                .chunks_exact(4)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect(),
            ColorConversion::RgbToRgba => src
                .data()
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
        };

        self.alloc(src.width(), src.height(), conversion.target_channels(), data)
    }

    fn threshold(&self, src: &Mat, cutoff: u8, max_value: u8) -> Result<Mat> {
        let data = src
            .data()
            .iter()
            .map(|&v| if v >= cutoff { max_value } else { 0 })
            .collect();
        self.alloc(src.width(), src.height(), src.channels(), data)
    }

    fn inpaint(
        &self,
        image: &Mat,
        mask: &Mat,
        radius: u32,
        method: InpaintMethod,
    ) -> Result<Mat> {
        if image.channels() != 3 || mask.channels() != 1 {
            return Err(Error::Processing(format!(
                "inpaint needs a 3-channel image and 1-channel mask, got {} and {}",
                image.channels(),
                mask.channels()
            )));
        }
        if image.width() != mask.width() || image.height() != mask.height() {
            return Err(Error::DimensionMismatch {
                width: image.width(),
                height: image.height(),
                mask_width: mask.width(),
                mask_height: mask.height(),
            });
        }

        let radius = radius.max(1);
        let data = match method {
            InpaintMethod::Telea => telea(image, mask, radius)?,
            InpaintMethod::Mean => fill_onion(image, mask, radius),
        };
        self.alloc(image.width(), image.height(), 3, data)
    }

    fn release(&self, mat: Mat) {
        drop(mat);
        let _ = self
            .live
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}

/// BT.601 luminance in 14-bit fixed point, rounded.
#[allow(clippy::cast_possible_truncation)] // weights sum to 1 << 14
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 4899 + u32::from(g) * 9617 + u32::from(b) * 1868 + (1 << 13)) >> 14) as u8
}

fn telea(image: &Mat, mask: &Mat, radius: u32) -> Result<Vec<u8>> {
    let mut rgb = RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
        .ok_or_else(|| Error::Processing("image buffer is shorter than its size".to_string()))?;
    let gray = GrayImage::from_raw(mask.width(), mask.height(), mask.data().to_vec())
        .ok_or_else(|| Error::Processing("mask buffer is shorter than its size".to_string()))?;
    let radius = i32::try_from(radius)
        .map_err(|_| Error::Processing(format!("radius {radius} out of range")))?;

    rgb.telea_inpaint(&gray, radius)
        .map_err(|e| Error::Processing(format!("telea inpaint failed: {e}")))?;
    Ok(rgb.into_raw())
}

/// Returns true if pixel `i` has a known 4-connected neighbour.
fn touches_known(known: &[bool], width: usize, height: usize, i: usize) -> bool {
    let (x, y) = (i % width, i / width);
    (x > 0 && known[i - 1])
        || (x + 1 < width && known[i + 1])
        || (y > 0 && known[i - width])
        || (y + 1 < height && known[i + width])
}

fn fill_onion(image: &Mat, mask: &Mat, radius: u32) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let mut out = image.data().to_vec();
    let mut known: Vec<bool> = mask.data().iter().map(|&m| m == 0).collect();

    loop {
        let boundary: Vec<usize> = (0..width * height)
            .filter(|&i| !known[i] && touches_known(&known, width, height, i))
            .collect();
        if boundary.is_empty() {
            break;
        }

        // Every pixel in this layer samples the previous layers only.
        let fills: Vec<(usize, [u8; 3])> = boundary
            .iter()
            .filter_map(|&i| {
                known_mean(&out, &known, width, height, i, radius).map(|rgb| (i, rgb))
            })
            .collect();

        for (i, rgb) in fills {
            out[i * 3..i * 3 + 3].copy_from_slice(&rgb);
        }
        for &i in &boundary {
            known[i] = true;
        }
    }

    out
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn known_mean(
    data: &[u8],
    known: &[bool],
    width: usize,
    height: usize,
    i: usize,
    radius: u32,
) -> Option<[u8; 3]> {
    let (cx, cy) = ((i % width) as i64, (i / width) as i64);
    let r = i64::from(radius);
    let r2 = r * r;
    let (w, h) = (width as i64, height as i64);

    let mut sum = [0u64; 3];
    let mut count = 0u64;

    for y in (cy - r).max(0)..=(cy + r).min(h - 1) {
        for x in (cx - r).max(0)..=(cx + r).min(w - 1) {
            let d2 = (x - cx).pow(2) + (y - cy).pow(2);
            if d2 == 0 || d2 > r2 {
                continue;
            }
            let j = (y * w + x) as usize;
            if !known[j] {
                continue;
            }
            for (acc, &v) in sum.iter_mut().zip(&data[j * 3..j * 3 + 3]) {
                *acc += u64::from(v);
            }
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    Some(sum.map(|s| ((s + count / 2) / count) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(primitive: &NativePrimitive, width: u32, height: u32, fill: [u8; 3]) -> Mat {
        let data = fill.repeat(width as usize * height as usize);
        primitive.alloc(width, height, 3, data).unwrap()
    }

    fn near(a: &[u8], b: &[u8]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.abs_diff(*y) <= 1)
    }

    #[test]
    fn luma_extremes() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(1, 1, 1), 1);
        assert_eq!(luma(255, 255, 255), 255);
    }

    #[test]
    fn rgba_to_rgb_drops_alpha() {
        let p = NativePrimitive::new();
        let src = p.alloc(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let out = p.convert_color(&src, ColorConversion::RgbaToRgb).unwrap();
        assert_eq!(out.data(), &[1, 2, 3, 5, 6, 7]);
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn rgb_to_rgba_is_opaque() {
        let p = NativePrimitive::new();
        let src = p.alloc(1, 1, 3, vec![9, 8, 7]).unwrap();
        let out = p.convert_color(&src, ColorConversion::RgbToRgba).unwrap();
        assert_eq!(out.data(), &[9, 8, 7, 255]);
    }

    #[test]
    fn conversion_rejects_wrong_channels() {
        let p = NativePrimitive::new();
        let src = p.alloc(1, 1, 3, vec![0, 0, 0]).unwrap();
        assert!(p.convert_color(&src, ColorConversion::RgbaToGray).is_err());
    }

    #[test]
    fn threshold_is_inclusive() {
        let p = NativePrimitive::new();
        let src = p.alloc(4, 1, 1, vec![0, 1, 128, 255]).unwrap();
        let out = p.threshold(&src, 1, 255).unwrap();
        assert_eq!(out.data(), &[0, 255, 255, 255]);
    }

    #[test]
    fn empty_mask_leaves_image_unchanged() {
        let p = NativePrimitive::new();
        let image = p.alloc(3, 1, 3, vec![10, 20, 30, 40, 50, 60, 70, 80, 90]).unwrap();
        let mask = p.alloc(3, 1, 1, vec![0, 0, 0]).unwrap();
        let out = p.inpaint(&image, &mask, 5, InpaintMethod::Telea).unwrap();
        assert_eq!(out.data(), image.data());
    }

    #[test]
    fn hole_in_uniform_image_is_filled_uniformly() {
        let p = NativePrimitive::new();
        let mut data = [40u8, 80, 120].repeat(100);
        // Paint a 4x4 black hole in the middle of a 10x10 image.
        let mut mask = vec![0u8; 100];
        for y in 3..7 {
            for x in 3..7 {
                let i = y * 10 + x;
                mask[i] = 255;
                data[i * 3..i * 3 + 3].copy_from_slice(&[0, 0, 0]);
            }
        }
        let image = p.alloc(10, 10, 3, data).unwrap();
        let mask = p.alloc(10, 10, 1, mask).unwrap();

        for method in [InpaintMethod::Telea, InpaintMethod::Mean] {
            let out = p.inpaint(&image, &mask, 3, method).unwrap();
            for px in out.data().chunks_exact(3) {
                assert!(near(px, &[40, 80, 120]), "{method:?} gave {px:?}");
            }
        }
    }

    #[test]
    fn hole_takes_colour_from_nearest_side() {
        let p = NativePrimitive::new();
        // Left half red, right half blue, single hole pixel next to red edge.
        let mut data: Vec<u8> = Vec::new();
        for x in 0..8 {
            data.extend_from_slice(if x < 4 { &[255, 0, 0] } else { &[0, 0, 255] });
        }
        let mut mask = vec![0u8; 8];
        mask[1] = 255;
        let image = p.alloc(8, 1, 3, data).unwrap();
        let mask = p.alloc(8, 1, 1, mask).unwrap();

        for method in [InpaintMethod::Telea, InpaintMethod::Mean] {
            let out = p.inpaint(&image, &mask, 1, method).unwrap();
            assert!(near(&out.data()[3..6], &[255, 0, 0]), "{method:?}");
        }
    }

    #[test]
    fn telea_replaces_hole_content() {
        let p = NativePrimitive::new();
        // Top half white, bottom half black. The hole sits in the white rows
        // and its second row was painted black.
        let mut data: Vec<u8> = Vec::new();
        for y in 0..12 {
            for _ in 0..12 {
                data.extend_from_slice(if y < 6 { &[255, 255, 255] } else { &[0, 0, 0] });
            }
        }
        let mut mask = vec![0u8; 144];
        for x in 4..8 {
            mask[12 + x] = 255;
            mask[24 + x] = 255;
            let i = 24 + x;
            data[i * 3..i * 3 + 3].copy_from_slice(&[0, 0, 0]);
        }
        let image = p.alloc(12, 12, 3, data).unwrap();
        let mask = p.alloc(12, 12, 1, mask).unwrap();

        let out = p.inpaint(&image, &mask, 3, InpaintMethod::Telea).unwrap();
        let i = 24 + 5;
        assert!(out.data()[i * 3] > 200, "got {}", out.data()[i * 3]);
    }

    #[test]
    fn full_mask_has_nothing_to_sample() {
        let p = NativePrimitive::new();
        let image = rgb(&p, 4, 4, [7, 7, 7]);
        let mask = p.alloc(4, 4, 1, vec![255; 16]).unwrap();
        for method in [InpaintMethod::Telea, InpaintMethod::Mean] {
            let out = p.inpaint(&image, &mask, 3, method).unwrap();
            assert_eq!(out.data(), image.data());
        }
    }

    #[test]
    fn inpaint_rejects_mismatched_mask() {
        let p = NativePrimitive::new();
        let image = rgb(&p, 4, 4, [0, 0, 0]);
        let mask = p.alloc(2, 2, 1, vec![0; 4]).unwrap();
        assert!(matches!(
            p.inpaint(&image, &mask, 3, InpaintMethod::Telea),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn release_balances_allocations() {
        let p = NativePrimitive::new();
        let a = rgb(&p, 2, 2, [1, 2, 3]);
        let b = p.convert_color(&a, ColorConversion::RgbToRgba).unwrap();
        assert_eq!(p.live_mats(), 2);
        p.release(a);
        p.release(b);
        assert_eq!(p.live_mats(), 0);
    }
}
