//! Interface to the inpainting primitive.
//!
//! The primitive owns its buffers ([`Mat`]) and expects every one of them to
//! be handed back through [`InpaintPrimitive::release`]. [`MatScope`] collects
//! the buffers created during one call and releases them when it goes out of
//! scope, whether the call succeeded or not.
//!
//! A primitive may be loaded asynchronously. [`PrimitiveSlot`] is the shared
//! readiness cell callers check (or wait on) before first use.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::error::{Error, Result};

/// How long [`PrimitiveSlot::wait_ready`] waits by default.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Interval between readiness checks.
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A row-major pixel buffer owned by a primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mat {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Mat {
    /// Wrap `data` as a `width` x `height` buffer with `channels` samples per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processing`] if `data` has the wrong length or
    /// `channels` is zero.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * usize::from(channels);
        if channels == 0 || data.len() != expected {
            return Err(Error::Processing(format!(
                "buffer of {} bytes does not match {width}x{height}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel.
    #[must_use]
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Raw samples.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Channel layout conversions the primitive supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorConversion {
    /// Drop the alpha channel.
    RgbaToRgb,
    /// Luminance of the colour channels; alpha is ignored.
    RgbaToGray,
    /// Add an opaque alpha channel.
    RgbToRgba,
}

impl ColorConversion {
    /// Channels expected on the input.
    #[must_use]
    pub fn source_channels(self) -> u8 {
        match self {
            Self::RgbaToRgb | Self::RgbaToGray => 4,
            Self::RgbToRgba => 3,
        }
    }

    /// Channels produced on the output.
    #[must_use]
    pub fn target_channels(self) -> u8 {
        match self {
            Self::RgbaToRgb => 3,
            Self::RgbaToGray => 1,
            Self::RgbToRgba => 4,
        }
    }
}

/// Inpainting flavour requested from the primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InpaintMethod {
    /// Telea's fast-marching method: the hole is filled in order of
    /// distance from its border, weighting known neighbours by direction,
    /// distance and level-set proximity.
    #[default]
    Telea,
    /// Layer-by-layer fill with the plain mean of known neighbours.
    Mean,
}

/// The capability that performs the actual inpainting.
pub trait InpaintPrimitive {
    /// Allocate a buffer holding `data`.
    ///
    /// # Errors
    ///
    /// Fails when `data` does not match the requested shape.
    fn alloc(&self, width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Mat>;

    /// Convert `src` to another channel layout.
    ///
    /// # Errors
    ///
    /// Fails when `src` does not have the channels `conversion` expects.
    fn convert_color(&self, src: &Mat, conversion: ColorConversion) -> Result<Mat>;

    /// Map every sample `>= cutoff` to `max_value` and every other sample to 0.
    ///
    /// # Errors
    ///
    /// Fails when the buffer cannot be processed.
    fn threshold(&self, src: &Mat, cutoff: u8, max_value: u8) -> Result<Mat>;

    /// Synthesize the pixels of the 3-channel `image` where the 1-channel
    /// `mask` is non-zero.
    ///
    /// # Errors
    ///
    /// Fails on mismatched or unsupported buffers.
    fn inpaint(&self, image: &Mat, mask: &Mat, radius: u32, method: InpaintMethod)
        -> Result<Mat>;

    /// Return a buffer to the primitive.
    fn release(&self, mat: Mat);
}

/// Index of a buffer held by a [`MatScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatId(usize);

/// Holds the buffers created during one primitive call and releases them on drop.
pub struct MatScope<'p, P: InpaintPrimitive + ?Sized> {
    primitive: &'p P,
    mats: Vec<Mat>,
}

impl<'p, P: InpaintPrimitive + ?Sized> MatScope<'p, P> {
    /// Open a scope over `primitive`.
    pub fn new(primitive: &'p P) -> Self {
        Self {
            primitive,
            mats: Vec::new(),
        }
    }

    /// The primitive this scope releases into.
    pub fn primitive(&self) -> &'p P {
        self.primitive
    }

    /// Take ownership of `mat` until the scope ends.
    pub fn keep(&mut self, mat: Mat) -> MatId {
        self.mats.push(mat);
        MatId(self.mats.len() - 1)
    }

    /// Borrow a buffer previously kept in this scope.
    ///
    /// # Panics
    ///
    /// Panics if `id` came from a different scope.
    pub fn get(&self, id: MatId) -> &Mat {
        &self.mats[id.0]
    }

    /// Number of buffers currently held.
    pub fn len(&self) -> usize {
        self.mats.len()
    }

    /// Whether the scope holds no buffers.
    pub fn is_empty(&self) -> bool {
        self.mats.is_empty()
    }
}

impl<P: InpaintPrimitive + ?Sized> Drop for MatScope<'_, P> {
    fn drop(&mut self) {
        for mat in self.mats.drain(..) {
            self.primitive.release(mat);
        }
    }
}

/// Shared readiness cell for a primitive that is loaded in the background.
///
/// Clones share the same cell: one side calls [`provide`](Self::provide)
/// once loading finishes, the others check [`get`](Self::get) or await
/// [`wait_ready`](Self::wait_ready).
#[derive(Debug)]
pub struct PrimitiveSlot<P> {
    cell: Arc<OnceLock<P>>,
}

impl<P> Clone for PrimitiveSlot<P> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<P> Default for PrimitiveSlot<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PrimitiveSlot<P> {
    /// An empty, not-ready slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// A slot that is ready immediately.
    #[must_use]
    pub fn ready(primitive: P) -> Self {
        Self {
            cell: Arc::new(OnceLock::from(primitive)),
        }
    }

    /// Mark the slot ready with `primitive`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PrimitiveAlreadyProvided`] if the slot is already ready.
    pub fn provide(&self, primitive: P) -> Result<()> {
        self.cell
            .set(primitive)
            .map_err(|_| Error::PrimitiveAlreadyProvided)?;
        tracing::debug!("inpainting primitive ready");
        Ok(())
    }

    /// The primitive, if it has been provided.
    #[must_use]
    pub fn get(&self) -> Option<&P> {
        self.cell.get()
    }

    /// Whether the primitive has been provided.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Wait up to `timeout` for the primitive, checking every
    /// [`READY_POLL_INTERVAL`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] if the deadline passes first.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<&P> {
        let poll = async {
            let mut ticker = tokio::time::interval(READY_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                if let Some(primitive) = self.cell.get() {
                    return primitive;
                }
            }
        };

        tokio::time::timeout(timeout, poll).await.map_err(|_| {
            tracing::warn!(?timeout, "gave up waiting for inpainting primitive");
            Error::NotReady { waited: timeout }
        })
    }
}
