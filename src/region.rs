//! Region-average fill for corner watermarks.
//!
//! The watermark is assumed to sit in a fixed rectangle in the bottom-right
//! corner. Each pixel of that rectangle is replaced by the mean colour of a
//! 3x3 neighbourhood taken from the row mirrored above the rectangle's top
//! edge, so the content directly above the watermark is reflected down into
//! it.

use image::RgbaImage;

/// Upper bound on the rectangle height in pixels.
pub const MAX_REGION_HEIGHT: u32 = 100;

/// Upper bound on the rectangle width in pixels.
pub const MAX_REGION_WIDTH: u32 = 150;

/// Rectangle height as a percentage of the image height.
const HEIGHT_PERCENT: u64 = 15;

/// Rectangle width as a percentage of the image width.
const WIDTH_PERCENT: u64 = 25;

/// The bottom-right rectangle that gets overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionRect {
    /// Left edge (inclusive).
    pub x: u32,
    /// Top edge (inclusive). Rows above it are the clean source rows.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl RegionRect {
    /// Whether `(x, y)` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Whether the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Compute the fill rectangle for an image of the given dimensions.
///
/// Height is `min(100, 15% of height)`, width is `min(150, 25% of width)`,
/// both truncated to whole pixels and anchored to the bottom-right corner.
#[must_use]
pub fn region_for(width: u32, height: u32) -> RegionRect {
    let region_h = percent_of(height, HEIGHT_PERCENT).min(MAX_REGION_HEIGHT);
    let region_w = percent_of(width, WIDTH_PERCENT).min(MAX_REGION_WIDTH);

    RegionRect {
        x: width.saturating_sub(region_w),
        y: height.saturating_sub(region_h),
        width: region_w,
        height: region_h,
    }
}

#[allow(clippy::cast_possible_truncation)] // result <= value
fn percent_of(value: u32, percent: u64) -> u32 {
    (u64::from(value) * percent / 100) as u32
}

/// Return a copy of `image` with the corner rectangle filled.
///
/// Pixels outside the rectangle are byte-identical to the input.
#[must_use]
pub fn fill_region(image: &RgbaImage) -> RgbaImage {
    let mut out = image.clone();
    fill_region_in_place(&mut out);
    out
}

/// Fill the corner rectangle of `image` in-place.
///
/// Only rows above the rectangle are sampled and those rows are never
/// written, so reading from the buffer being modified matches reading from
/// the original.
pub fn fill_region_in_place(image: &mut RgbaImage) {
    let rect = region_for(image.width(), image.height());
    if rect.is_empty() {
        return;
    }

    tracing::debug!(
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "filling corner region"
    );

    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            let Some(rgb) = mirrored_mean(image, &rect, x, y) else {
                continue;
            };
            let px = image.get_pixel_mut(x, y);
            px[0] = rgb[0];
            px[1] = rgb[1];
            px[2] = rgb[2];
            px[3] = 255;
        }
    }
}

/// Mean RGB of the 3x3 neighbourhood around the mirrored source pixel.
///
/// Neighbours outside the clean rows `[0, rect.y)` or outside the image
/// columns are skipped. Returns `None` when no neighbour qualifies.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mirrored_mean(image: &RgbaImage, rect: &RegionRect, x: u32, y: u32) -> Option<[u8; 3]> {
    let top = i64::from(rect.y);
    let source_row = (top - (i64::from(y) - top) - 1).max(0);
    if source_row >= top {
        return None;
    }

    let img_w = i64::from(image.width());
    let cx = i64::from(x);
    let mut sum = [0u32; 3];
    let mut count = 0u32;

    for ny in source_row - 1..=source_row + 1 {
        if ny < 0 || ny >= top {
            continue;
        }
        for nx in cx - 1..=cx + 1 {
            if nx < 0 || nx >= img_w {
                continue;
            }
            let px = image.get_pixel(nx as u32, ny as u32);
            for (acc, &v) in sum.iter_mut().zip(px.0.iter()) {
                *acc += u32::from(v);
            }
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    Some(sum.map(|s| (s / count) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([y as u8, x as u8, 7, 128]))
    }

    #[test]
    fn region_for_200_square_is_50_by_30() {
        let rect = region_for(200, 200);
        assert_eq!(
            rect,
            RegionRect {
                x: 150,
                y: 170,
                width: 50,
                height: 30,
            }
        );
    }

    #[test]
    fn region_is_capped_on_large_images() {
        let rect = region_for(4000, 3000);
        assert_eq!(rect.width, MAX_REGION_WIDTH);
        assert_eq!(rect.height, MAX_REGION_HEIGHT);
        assert_eq!(rect.x, 4000 - MAX_REGION_WIDTH);
        assert_eq!(rect.y, 3000 - MAX_REGION_HEIGHT);
    }

    #[test]
    fn region_never_exceeds_bounds() {
        for (w, h) in [(1, 1), (2, 2), (3, 7), (17, 5), (640, 480), (1920, 1080)] {
            let rect = region_for(w, h);
            assert!(rect.width <= MAX_REGION_WIDTH.min(w / 4));
            assert!(rect.height <= MAX_REGION_HEIGHT.min(h * 15 / 100));
            assert!(rect.x + rect.width <= w);
            assert!(rect.y + rect.height <= h);
        }
    }

    #[test]
    fn uniform_white_fills_with_white() {
        let img = RgbaImage::from_pixel(200, 200, Rgba([255, 255, 255, 255]));
        let out = fill_region(&img);
        let rect = region_for(200, 200);
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                assert_eq!(out.get_pixel(x, y), &Rgba([255, 255, 255, 255]));
            }
        }
    }

    #[test]
    fn pixels_outside_region_are_untouched() {
        let img = gradient(120, 90);
        let out = fill_region(&img);
        let rect = region_for(120, 90);
        for (x, y, px) in out.enumerate_pixels() {
            if !rect.contains(x, y) {
                assert_eq!(px, img.get_pixel(x, y), "pixel ({x},{y}) changed");
            }
        }
    }

    #[test]
    fn filled_region_is_opaque() {
        let img = RgbaImage::from_pixel(64, 64, Rgba([10, 20, 30, 0]));
        let out = fill_region(&img);
        let rect = region_for(64, 64);
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                assert_eq!(out.get_pixel(x, y)[3], 255);
            }
        }
    }

    #[test]
    fn first_row_mirrors_row_just_above() {
        // 40x40: rect is x=30, y=34, 10x6
        let img = gradient(40, 40);
        let out = fill_region(&img);

        // Source row 33, neighbours from rows 32 and 33 only.
        let px = out.get_pixel(35, 34);
        assert_eq!(px[0], 32); // (32*3 + 33*3) / 6 = 32.5 truncated
        assert_eq!(px[1], 35);
        assert_eq!(px[2], 7);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn deeper_rows_mirror_further_up() {
        let img = gradient(40, 40);
        let out = fill_region(&img);

        // y=36 mirrors to source row 34 - 2 - 1 = 31, rows 30..=32
        let px = out.get_pixel(35, 36);
        assert_eq!(px[0], 31);
        assert_eq!(px[1], 35);
    }

    #[test]
    fn right_edge_drops_out_of_bounds_columns() {
        let img = gradient(40, 40);
        let out = fill_region(&img);

        // x=39 samples columns 38 and 39 only
        let px = out.get_pixel(39, 34);
        assert_eq!(px[1], 38);
    }

    #[test]
    fn in_place_matches_pure_version() {
        let img = gradient(90, 70);
        let expected = fill_region(&img);
        let mut actual = img.clone();
        fill_region_in_place(&mut actual);
        assert_eq!(actual, expected);
    }

    #[test]
    fn tiny_images_are_returned_unchanged() {
        let empty = RgbaImage::new(0, 0);
        assert_eq!(fill_region(&empty), empty);

        let one = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4]));
        assert_eq!(fill_region(&one), one);
    }
}
