//! File-level processing: decode, transform, export.

use std::collections::hash_map::{Entry, HashMap};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};

use crate::adapter;
use crate::error::{Error, Result};
use crate::primitive::{InpaintMethod, InpaintPrimitive};
use crate::region;

/// Options controlling how results are reported.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Enable verbose logging.
    pub verbose: bool,
    /// Suppress non-error output.
    pub quiet: bool,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Where the result was written, if it was.
    pub output: Option<PathBuf>,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
}

impl ProcessResult {
    fn failed(path: &Path, message: String) -> Self {
        tracing::warn!(path = %path.display(), %message, "processing failed");
        Self {
            path: path.to_path_buf(),
            output: None,
            success: false,
            message,
        }
    }

    fn done(path: &Path, output: &Path, message: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            output: Some(output.to_path_buf()),
            success: true,
            message: message.to_string(),
        }
    }
}

/// Decode an image file into RGBA.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the file cannot be read as an image.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(Error::Decode)?;
    Ok(img.to_rgba8())
}

/// Fill the corner region of one image file and save it as PNG.
#[must_use]
pub fn process_file(input: &Path, output: &Path) -> ProcessResult {
    let mut img = match load_rgba(input) {
        Ok(img) => img,
        Err(e) => return ProcessResult::failed(input, format!("Failed to load: {e}")),
    };

    tracing::debug!(
        path = %input.display(),
        width = img.width(),
        height = img.height(),
        "loaded image"
    );

    region::fill_region_in_place(&mut img);

    match save_png(&img, output) {
        Ok(()) => ProcessResult::done(input, output, "Region filled"),
        Err(e) => ProcessResult::failed(input, format!("Failed to save: {e}")),
    }
}

/// Fill the corner region of every supported image in a directory.
///
/// Output files are named with [`default_output_path`] inside `output_dir`.
/// When two inputs map to the same output name (`a.png` and `a.bmp`), the
/// first in path order is processed and the rest fail without writing.
/// Uses parallel iteration when the `cli` feature is enabled (via rayon).
/// A failure on one file does not stop the others.
#[must_use]
pub fn process_directory(input_dir: &Path, output_dir: &Path) -> Vec<ProcessResult> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(input_dir) {
        Ok(rd) => rd
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .filter(|p| is_supported_image(p))
            .collect(),
        Err(e) => {
            return vec![ProcessResult::failed(
                input_dir,
                format!("Failed to read directory: {e}"),
            )];
        }
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        return vec![ProcessResult::failed(
            output_dir,
            format!("Failed to create output directory: {e}"),
        )];
    }

    entries.sort();
    let jobs = plan_outputs(entries, output_dir);

    let process = |job: &Job| match &job.taken_by {
        Some(first) => ProcessResult::failed(
            &job.input,
            format!(
                "Output name {} already used by {}",
                job.output.display(),
                first.display()
            ),
        ),
        None => process_file(&job.input, &job.output),
    };

    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(process).collect()
    }

    #[cfg(not(feature = "cli"))]
    {
        jobs.iter().map(process).collect()
    }
}

struct Job {
    input: PathBuf,
    output: PathBuf,
    /// Earlier input that already claimed `output`.
    taken_by: Option<PathBuf>,
}

fn plan_outputs(entries: Vec<PathBuf>, output_dir: &Path) -> Vec<Job> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    entries
        .into_iter()
        .map(|input| {
            let name = default_output_path(&input);
            let output = output_dir.join(name.file_name().unwrap_or_default());
            let taken_by = match claimed.entry(output.clone()) {
                Entry::Occupied(first) => Some(first.get().clone()),
                Entry::Vacant(slot) => {
                    slot.insert(input.clone());
                    None
                }
            };
            Job {
                input,
                output,
                taken_by,
            }
        })
        .collect()
}

/// Inpaint `image_path` where `mask_path` is painted and save the PNG result.
#[must_use]
pub fn inpaint_file<P: InpaintPrimitive + ?Sized>(
    primitive: &P,
    image_path: &Path,
    mask_path: &Path,
    output: &Path,
    radius: i32,
    method: InpaintMethod,
) -> ProcessResult {
    let image = match load_rgba(image_path) {
        Ok(img) => img,
        Err(e) => return ProcessResult::failed(image_path, format!("Failed to load: {e}")),
    };
    let mask = match load_rgba(mask_path) {
        Ok(img) => img,
        Err(e) => return ProcessResult::failed(image_path, format!("Failed to load mask: {e}")),
    };

    let result = match adapter::inpaint(primitive, &image, &mask, radius, method) {
        Ok(img) => img,
        Err(e) => return ProcessResult::failed(image_path, e.to_string()),
    };

    match save_png(&result, output) {
        Ok(()) => ProcessResult::done(image_path, output, "Inpainted"),
        Err(e) => ProcessResult::failed(image_path, format!("Failed to save: {e}")),
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Save an RGBA image as PNG, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if `path` does not end in `.png` or writing fails.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    if format != ImageFormat::Png {
        return Err(Error::UnsupportedFormat(format!("{format:?}")));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    img.save_with_format(path, ImageFormat::Png)?;
    tracing::debug!(path = %path.display(), "saved png");
    Ok(())
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_cleaned.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_cleaned.png"))
}
