//! Remove corner watermarks and brush-masked blemishes from images.
//!
//! Two independent transforms are provided:
//!
//! - [`region`]: overwrites a fixed bottom-right rectangle with the mean of
//!   the pixels mirrored above it. Crude, but needs no mask.
//! - [`adapter`]: converts an image and a painted mask into the layout an
//!   [`InpaintPrimitive`] expects, runs it, and returns an opaque RGBA result.
//!
//! # Quick Start
//!
//! ```no_run
//! use watermark_eraser::region;
//!
//! let img = image::open("photo.jpg").unwrap().to_rgba8();
//! let cleaned = region::fill_region(&img);
//! cleaned.save("photo_cleaned.png").unwrap();
//! ```
//!
//! # Inpainting
//!
//! Masks are painted with a [`MaskCanvas`] (or an [`EraserSession`], which
//! tracks brush state between pointer events) and handed to the primitive.
//!
//! ```no_run
//! use watermark_eraser::{adapter, InpaintMethod, MaskCanvas, NativePrimitive, Point};
//!
//! let img = image::open("photo.png").unwrap().to_rgba8();
//! let mut mask = MaskCanvas::new(img.width(), img.height());
//! mask.stamp(Point::new(40.0, 40.0), 20);
//!
//! let primitive = NativePrimitive::new();
//! let out = adapter::inpaint(&primitive, &img, mask.as_rgba(), 5, InpaintMethod::Telea).unwrap();
//! out.save("inpainted.png").unwrap();
//! ```

#![deny(missing_docs)]

pub mod adapter;
mod engine;
pub mod error;
pub mod mask;
pub mod native;
pub mod primitive;
pub mod region;
pub mod session;

pub use engine::{
    default_output_path, inpaint_file, is_supported_image, load_rgba, process_directory,
    process_file, save_png, ProcessOptions, ProcessResult,
};
pub use error::{Error, Result};
pub use mask::{MaskCanvas, Point};
pub use native::NativePrimitive;
pub use primitive::{
    ColorConversion, InpaintMethod, InpaintPrimitive, Mat, MatScope, PrimitiveSlot,
    DEFAULT_READY_TIMEOUT,
};
pub use region::{fill_region, region_for, RegionRect};
pub use session::{EraserSession, Status};
