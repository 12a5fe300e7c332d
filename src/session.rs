//! Interactive inpainting session.
//!
//! Holds everything a brush-driven eraser needs between pointer events:
//! brush settings, the last pointer position, the mask being painted, the
//! loaded image and the rendered output.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbaImage;

use crate::adapter;
use crate::engine::save_png;
use crate::error::{Error, Result};
use crate::mask::{MaskCanvas, Point};
use crate::primitive::{InpaintMethod, InpaintPrimitive, PrimitiveSlot};

/// Brush diameter used by a new session.
pub const DEFAULT_BRUSH_SIZE: u32 = 20;

/// Inpaint radius used by a new session.
pub const DEFAULT_RADIUS: i32 = 5;

/// Pause before the primitive runs, so a "working" indicator can be shown.
pub const WORK_YIELD: Duration = Duration::from_millis(30);

/// File name used when exporting the session output.
pub const INPAINT_EXPORT_NAME: &str = "inpainted.png";

/// What the session last did, suitable for a status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing loaded yet.
    Idle,
    /// An image is loaded and can be painted on.
    ImageLoaded,
    /// The primitive was not loaded when inpainting was requested.
    NotReady,
    /// The primitive is running.
    Working,
    /// The last inpaint succeeded.
    Done,
    /// The last inpaint failed; the message says why.
    Failed(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Load an image to start"),
            Self::ImageLoaded => f.write_str("Paint over the area to remove"),
            Self::NotReady => f.write_str("Inpainting engine is still loading, try again shortly"),
            Self::Working => f.write_str("Processing..."),
            Self::Done => f.write_str("Done"),
            Self::Failed(reason) => write!(f, "Processing failed: {reason}"),
        }
    }
}

/// State of one interactive eraser.
#[derive(Debug)]
pub struct EraserSession {
    source: Option<RgbaImage>,
    mask: MaskCanvas,
    output: Option<RgbaImage>,
    brush_size: u32,
    radius: i32,
    method: InpaintMethod,
    last_point: Option<Point>,
    status: Status,
}

impl Default for EraserSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EraserSession {
    /// A session with no image and default brush settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            mask: MaskCanvas::new(0, 0),
            output: None,
            brush_size: DEFAULT_BRUSH_SIZE,
            radius: DEFAULT_RADIUS,
            method: InpaintMethod::default(),
            last_point: None,
            status: Status::Idle,
        }
    }

    /// Load `image`, discarding any mask and previous output.
    pub fn load_image(&mut self, image: RgbaImage) {
        self.mask = MaskCanvas::new(image.width(), image.height());
        self.source = Some(image);
        self.output = None;
        self.last_point = None;
        self.status = Status::ImageLoaded;
    }

    /// Begin a stroke with a single stamp at `at`.
    pub fn pointer_down(&mut self, at: Point) {
        if self.source.is_none() {
            return;
        }
        self.mask.stamp(at, self.brush_size);
        self.last_point = Some(at);
    }

    /// Continue the current stroke to `at`.
    ///
    /// With `shift` held the gap from the previous position is filled in;
    /// otherwise only `at` is stamped. Returns the number of stamps drawn,
    /// zero when no stroke is in progress.
    pub fn pointer_move(&mut self, at: Point, shift: bool) -> usize {
        let Some(last) = self.last_point else {
            return 0;
        };
        let drawn = self.mask.stroke(last, at, self.brush_size, shift);
        self.last_point = Some(at);
        drawn
    }

    /// End the current stroke.
    pub fn pointer_up(&mut self) {
        self.last_point = None;
    }

    /// Erase the painted mask.
    pub fn clear_mask(&mut self) {
        self.mask.clear();
    }

    /// Set the brush diameter (at least 1).
    pub fn set_brush_size(&mut self, size: u32) {
        self.brush_size = size.max(1);
    }

    /// Set the inpaint radius. Out-of-range values are clamped when used.
    pub fn set_radius(&mut self, radius: i32) {
        self.radius = radius;
    }

    /// Set the inpaint method.
    pub fn set_method(&mut self, method: InpaintMethod) {
        self.method = method;
    }

    /// Current brush diameter.
    #[must_use]
    pub fn brush_size(&self) -> u32 {
        self.brush_size
    }

    /// Radius as entered, before clamping.
    #[must_use]
    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// The mask painted so far.
    #[must_use]
    pub fn mask(&self) -> &MaskCanvas {
        &self.mask
    }

    /// The last successful result, if any.
    #[must_use]
    pub fn output(&self) -> Option<&RgbaImage> {
        self.output.as_ref()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Inpaint the masked area of the loaded image.
    ///
    /// Refuses to run when the primitive in `slot` has not been provided.
    /// On failure the previous output is kept.
    ///
    /// # Errors
    ///
    /// [`Error::NoImage`] without a loaded image, [`Error::NotReady`] when the
    /// primitive is missing, and whatever [`adapter::inpaint`] reports.
    pub async fn run_inpaint<P: InpaintPrimitive>(&mut self, slot: &PrimitiveSlot<P>) -> Result<()> {
        let Some(source) = self.source.as_ref() else {
            return Err(Error::NoImage);
        };
        let Some(primitive) = slot.get() else {
            tracing::warn!("inpaint requested before primitive was ready");
            self.status = Status::NotReady;
            return Err(Error::NotReady {
                waited: Duration::ZERO,
            });
        };

        self.status = Status::Working;
        tokio::time::sleep(WORK_YIELD).await;

        match adapter::inpaint(primitive, source, self.mask.as_rgba(), self.radius, self.method) {
            Ok(image) => {
                self.output = Some(image);
                self.status = Status::Done;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "inpaint failed");
                self.status = Status::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Write the output to `dir/inpainted.png` and return the path.
    ///
    /// # Errors
    ///
    /// [`Error::NoImage`] if nothing has been rendered yet, or an I/O or
    /// encoding error from saving.
    pub fn export_png(&self, dir: &Path) -> Result<PathBuf> {
        let output = self.output.as_ref().ok_or(Error::NoImage)?;
        let path = dir.join(INPAINT_EXPORT_NAME);
        save_png(output, &path)?;
        Ok(path)
    }
}
