//! armortrack CLI: run the armor detection and tracking pipeline on image files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use armortrack::{FrameReport, GyroData, Pipeline, PipelineConfig, TeamColor, TrackSet};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "armortrack")]
#[command(about = "Detect light-bar armor plates and track them across frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect armors in a single image.
    Detect(CliDetectArgs),

    /// Track armors over an image sequence.
    Track(CliTrackArgs),

    /// Print the default pipeline configuration as JSON.
    PrintConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorArg {
    Red,
    Blue,
}

impl ColorArg {
    fn to_core(self) -> TeamColor {
        match self {
            Self::Red => TeamColor::Red,
            Self::Blue => TeamColor::Blue,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write detection results (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Pipeline configuration (JSON); defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Light-bar color to detect (overrides the config).
    #[arg(long, value_enum)]
    color: Option<ColorArg>,
}

#[derive(Debug, Clone, Args)]
struct CliTrackArgs {
    /// Input images in capture order.
    #[arg(long, num_args = 1.., required = true)]
    images: Vec<PathBuf>,

    /// Path to write per-frame results (JSON array).
    #[arg(long)]
    out: PathBuf,

    /// Pipeline configuration (JSON); defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Light-bar color to detect (overrides the config).
    #[arg(long, value_enum)]
    color: Option<ColorArg>,

    /// Frame rate used to timestamp the sequence.
    #[arg(long, default_value = "100.0")]
    fps: f64,

    /// Gyro readings (JSON array, one per frame). Missing readings are zero.
    #[arg(long)]
    gyro: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Track(args) => run_track(&args),
        Commands::PrintConfig => run_print_config(),
    }
}

fn load_config(path: Option<&Path>, color: Option<ColorArg>) -> CliResult<PipelineConfig> {
    let mut config = match path {
        Some(p) => {
            tracing::info!("Loading config: {}", p.display());
            PipelineConfig::from_json_file(p)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(color) = color {
        config.color = color.to_core();
    }
    Ok(config)
}

fn load_image(path: &Path) -> CliResult<image::RgbImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_rgb8())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, &json)?;
    tracing::info!("Results written to {}", path.display());
    Ok(())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref(), args.color)?;
    tracing::info!("Loading image: {}", args.image.display());
    let image = load_image(&args.image)?;
    let (w, h) = image.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let frame = config.frame(image);
    let pipeline = Pipeline::new(config);
    let out = pipeline.process_frame(&frame, TrackSet::new(), &GyroData::default(), 0.0);

    tracing::info!(
        "Detected {} armors from {} light blobs",
        out.combos.len(),
        out.features.len()
    );
    write_json(&args.out, &out.report())
}

// ── track ──────────────────────────────────────────────────────────────

fn run_track(args: &CliTrackArgs) -> CliResult<()> {
    if args.fps.is_nan() || args.fps <= 0.0 {
        return Err(format!("--fps must be positive, got {}", args.fps).into());
    }
    let config = load_config(args.config.as_deref(), args.color)?;
    let gyro: Vec<GyroData> = match &args.gyro {
        Some(p) => serde_json::from_str(&std::fs::read_to_string(p)?)?,
        None => Vec::new(),
    };
    if !gyro.is_empty() && gyro.len() < args.images.len() {
        tracing::warn!(
            "{} gyro readings for {} frames; the rest are zero",
            gyro.len(),
            args.images.len()
        );
    }

    let pipeline = Pipeline::new(config);
    let mut tracks = TrackSet::new();
    let mut reports: Vec<FrameReport> = Vec::with_capacity(args.images.len());

    for (i, path) in args.images.iter().enumerate() {
        let tick = i as f64 / args.fps;
        let reading = gyro.get(i).copied().unwrap_or(GyroData {
            tick,
            ..GyroData::default()
        });
        let frame = pipeline.config().frame(load_image(path)?);
        let out = pipeline.process_frame(&frame, tracks, &reading, tick);
        for id in &out.update.spawned {
            tracing::info!("frame {}: new track {}", i, id.0);
        }
        for id in &out.update.removed {
            tracing::info!("frame {}: track {} lost", i, id.0);
        }
        reports.push(out.report());
        tracks = out.tracks;
    }

    tracing::info!("{} frames processed, {} live tracks", reports.len(), tracks.len());
    write_json(&args.out, &reports)
}

// ── print-config ───────────────────────────────────────────────────────

fn run_print_config() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&PipelineConfig::default())?;
    println!("{}", json);
    Ok(())
}
