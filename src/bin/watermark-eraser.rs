use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use watermark_eraser::{
    default_output_path, inpaint_file, process_directory, process_file, InpaintMethod,
    NativePrimitive, PrimitiveSlot, ProcessOptions, ProcessResult, DEFAULT_READY_TIMEOUT,
};

#[derive(Parser)]
#[command(
    name = "watermark-eraser",
    about = "Fill corner watermarks or inpaint masked areas of images",
    version,
    after_help = "fill:    overwrite the bottom-right corner with content mirrored from above\n\
                  inpaint: synthesize the pixels painted white in a mask image"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fill the bottom-right corner region of an image or directory of images
    Fill {
        /// Input image file or directory
        input: String,

        /// Output file or directory (default: {name}_cleaned.png)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Inpaint the areas selected by a mask image
    Inpaint {
        /// Input image file
        image: String,

        /// Mask image; any non-black pixel is filled
        #[arg(short, long)]
        mask: String,

        /// Inpaint radius, clamped to 1-30
        #[arg(short, long, default_value = "5", allow_hyphen_values = true)]
        radius: i32,

        /// Inpainting method
        #[arg(long, value_enum, default_value = "telea")]
        method: Method,

        /// Output file (default: inpainted.png next to the image)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Telea,
    Mean,
}

impl From<Method> for InpaintMethod {
    fn from(m: Method) -> Self {
        match m {
            Method::Telea => InpaintMethod::Telea,
            Method::Mean => InpaintMethod::Mean,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let opts = ProcessOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let results = match cli.command {
        Command::Fill { input, output } => run_fill(&input, output.as_deref()),
        Command::Inpaint {
            image,
            mask,
            radius,
            method,
            output,
        } => run_inpaint(&image, &mask, radius, method.into(), output.as_deref()).await,
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn run_fill(input: &str, output: Option<&str>) -> Vec<ProcessResult> {
    let input_path = Path::new(input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {input}");
        process::exit(1);
    }

    if input_path.is_dir() {
        let Some(output_dir) = output.map(PathBuf::from) else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: watermark-eraser fill <input_dir> -o <output_dir>");
            process::exit(1);
        };
        process_directory(input_path, &output_dir)
    } else {
        let output_path = output.map_or_else(|| default_output_path(input_path), PathBuf::from);
        vec![process_file(input_path, &output_path)]
    }
}

async fn run_inpaint(
    image: &str,
    mask: &str,
    radius: i32,
    method: InpaintMethod,
    output: Option<&str>,
) -> Vec<ProcessResult> {
    let image_path = Path::new(image);
    let output_path = output.map_or_else(
        || {
            image_path
                .parent()
                .unwrap_or(Path::new("."))
                .join(watermark_eraser::session::INPAINT_EXPORT_NAME)
        },
        PathBuf::from,
    );

    let slot: PrimitiveSlot<NativePrimitive> = PrimitiveSlot::new();
    let loader = slot.clone();
    tokio::spawn(async move {
        if let Err(e) = loader.provide(NativePrimitive::new()) {
            tracing::warn!(error = %e, "failed to provide inpainting primitive");
        }
    });

    let primitive = match slot.wait_ready(DEFAULT_READY_TIMEOUT).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Fatal: {e}");
            process::exit(1);
        }
    };

    vec![inpaint_file(
        primitive,
        image_path,
        Path::new(mask),
        &output_path,
        radius,
        method,
    )]
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("watermark_eraser={default_level}")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    if opts.quiet && result.success {
        return;
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if result.success {
        if !opts.quiet {
            match &result.output {
                Some(out) => eprintln!("[OK] {filename} -> {}", out.display()),
                None => eprintln!("[OK] {filename}"),
            }
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if opts.verbose && !result.message.is_empty() {
        eprintln!("  -> {}", result.message);
    }
}
