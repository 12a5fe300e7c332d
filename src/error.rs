//! Error types for the watermark-eraser crate.

use std::time::Duration;

/// Errors that can occur while filling or inpainting an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source file could not be decoded into a raster image.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The inpainting primitive has not finished loading.
    #[error("inpainting primitive not ready (waited {waited:?})")]
    NotReady {
        /// How long the caller waited before giving up.
        waited: Duration,
    },

    /// The transform failed while running.
    #[error("processing failed: {0}")]
    Processing(String),

    /// The image and mask buffers have different dimensions.
    #[error("mask is {mask_width}x{mask_height} but image is {width}x{height}")]
    DimensionMismatch {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Mask width in pixels.
        mask_width: u32,
        /// Mask height in pixels.
        mask_height: u32,
    },

    /// An operation needed a loaded image but none was present.
    #[error("no image loaded")]
    NoImage,

    /// A primitive was provided to a slot that already holds one.
    #[error("inpainting primitive already provided")]
    PrimitiveAlreadyProvided,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while encoding or saving an image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
