//! Brush-painted masks.
//!
//! Pointer input is accumulated into an RGBA canvas with two primitives: a
//! *stamp* paints one filled circle, a *stroke* paints a run of stamps
//! between two pointer positions so fast drags still leave continuous
//! coverage.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;

/// Colour painted into the mask. Any non-zero intensity counts as selected.
const BRUSH_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// A pointer position in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Positions stamped when dragging continuously from `from` to `to`.
///
/// Produces `ceil(distance / max(1, brush_size / 3))` evenly spaced points
/// ending at `to`. `from` itself is not included since it was stamped by the
/// previous event. Coincident points yield a single stamp at `to`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn stroke_points(from: Point, to: Point, brush_size: u32) -> Vec<Point> {
    let spacing = (brush_size as f32 / 3.0).max(1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (from.distance(to) / spacing).ceil() as usize;

    if steps == 0 {
        return vec![to];
    }

    (1..=steps)
        .map(|i| from.lerp(to, i as f32 / steps as f32))
        .collect()
}

/// The canvas brush strokes are painted into.
#[derive(Debug, Clone)]
pub struct MaskCanvas {
    canvas: RgbaImage,
}

impl MaskCanvas {
    /// Create an empty (fully transparent) mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
        }
    }

    /// Mask width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Mask height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    /// Paint a filled circle centred on `at`.
    ///
    /// The disc is `brush_size` pixels across for odd sizes and one pixel
    /// narrower for even sizes, since a pixel-centred circle has odd width.
    pub fn stamp(&mut self, at: Point, brush_size: u32) {
        let radius = i32::try_from(brush_size.saturating_sub(1) / 2).unwrap_or(i32::MAX);
        #[allow(clippy::cast_possible_truncation)]
        let center = (at.x.round() as i32, at.y.round() as i32);
        draw_filled_circle_mut(&mut self.canvas, center, radius, BRUSH_COLOR);
    }

    /// Paint the movement from `from` to `to`.
    ///
    /// With `shift` held the segment is filled with interpolated stamps.
    /// Without it only `to` is stamped, which gives isolated dabs.
    /// Both ends are first pulled back to within one brush radius of the
    /// canvas. Returns the number of stamps drawn.
    pub fn stroke(&mut self, from: Point, to: Point, brush_size: u32, shift: bool) -> usize {
        let to = self.within_reach(to, brush_size);
        if !shift {
            self.stamp(to, brush_size);
            return 1;
        }

        let from = self.within_reach(from, brush_size);
        let points = stroke_points(from, to, brush_size);
        for &p in &points {
            self.stamp(p, brush_size);
        }
        points.len()
    }

    /// Clamp `p` to the canvas widened by half the brush on each side.
    #[allow(clippy::cast_precision_loss)]
    fn within_reach(&self, p: Point, brush_size: u32) -> Point {
        let reach = brush_size as f32 / 2.0;
        Point {
            x: p.x.clamp(-reach, self.width() as f32 + reach),
            y: p.y.clamp(-reach, self.height() as f32 + reach),
        }
    }

    /// Erase everything painted so far.
    pub fn clear(&mut self) {
        for px in self.canvas.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    /// Whether nothing has been painted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canvas
            .pixels()
            .all(|px| px[0] == 0 && px[1] == 0 && px[2] == 0)
    }

    /// Whether the pixel at `(x, y)` has been painted.
    #[must_use]
    pub fn is_painted(&self, x: u32, y: u32) -> bool {
        self.canvas
            .get_pixel_checked(x, y)
            .is_some_and(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
    }

    /// The underlying RGBA buffer.
    #[must_use]
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.canvas
    }
}
