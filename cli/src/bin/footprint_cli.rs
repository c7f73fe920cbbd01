use clap::{Parser, Subcommand};
use cli::scan_mask_dir;
use color_eyre::eyre::{Result, WrapErr};
use footprint::{
    io, render, Detection, EdgePolicy, Pipeline, PipelineConfig, RingPolicy, ThresholdDetector,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run configuration (.toml or .json); reference defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (overrides the configuration)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vectorize a directory of tile mask PNGs into a detections CSV
    Vectorize {
        /// Directory of `<zoom>_<column>_<row>.png` or `<column>_<row>.png` masks
        #[arg(short, long)]
        masks: PathBuf,
        /// Output detections CSV (`tile,polygon`)
        #[arg(short, long)]
        output: PathBuf,
        /// Pixels brighter than this are foreground
        #[arg(long, default_value_t = 127)]
        threshold: u8,
        /// Keep every ring or only the first one per mask
        #[arg(long)]
        ring_policy: Option<RingPolicy>,
        /// Clip out-of-bounds vertices or reject the polygon
        #[arg(long)]
        edge_policy: Option<EdgePolicy>,
        /// Treat each mask image as one object instead of splitting regions
        #[arg(long)]
        no_split: bool,
    },
    /// Measure detections: dimensions and projected centroid per polygon
    Measure {
        /// Detections CSV (`tile,polygon`)
        #[arg(short, long)]
        input: PathBuf,
        /// Output records CSV (`tile,polygon,centroid,width,length`)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Measure detections and export them as a GeoJSON FeatureCollection
    Geojson {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Draw detections back into per-tile binary mask PNGs
    Render {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Print the JSON schema of the configuration file
    Schema,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if cli.threads.is_some() {
        config.threads = cli.threads;
    }

    match cli.command {
        Commands::Vectorize {
            masks,
            output,
            threshold,
            ring_policy,
            edge_policy,
            no_split,
        } => {
            if let Some(policy) = ring_policy {
                config.ring_policy = policy;
            }
            if let Some(policy) = edge_policy {
                config.edge_policy = policy;
            }
            let detector = ThresholdDetector {
                threshold,
                split_components: !no_split,
            };
            vectorize_masks(config, &detector, &masks, &output)?;
        }
        Commands::Measure { input, output } => {
            let pipeline = Pipeline::new(config)?;
            let records = pipeline.measure_all(&read_input(&input)?)?;
            io::write_records_file(&output, &records)
                .wrap_err_with(|| format!("writing {}", output.display()))?;
            info!(records = records.len(), output = %output.display(), "wrote records");
        }
        Commands::Geojson { input, output } => {
            let pipeline = Pipeline::new(config)?;
            let records = pipeline.measure_all(&read_input(&input)?)?;
            io::save_geojson(&output, &records, pipeline.config())
                .wrap_err_with(|| format!("writing {}", output.display()))?;
            info!(features = records.len(), output = %output.display(), "wrote GeoJSON");
        }
        Commands::Render { input, output_dir } => {
            config.validate()?;
            let detections = read_input(&input)?;
            render::render_tiles(&detections, config.tile_size_px, &output_dir)?;
        }
        Commands::Schema => {
            let schema = PipelineConfig::schema();
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::from_file(path)
                .wrap_err_with(|| format!("loading configuration {}", path.display()))?;
            info!(path = %path.display(), zoom = config.zoom, "loaded configuration");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<Vec<Detection>> {
    let detections = io::read_detections_file(path)
        .wrap_err_with(|| format!("reading detections {}", path.display()))?;
    info!(detections = detections.len(), input = %path.display(), "read detections");
    Ok(detections)
}

fn vectorize_masks(
    config: PipelineConfig,
    detector: &ThresholdDetector,
    masks_dir: &Path,
    output: &Path,
) -> Result<()> {
    let pipeline = Pipeline::new(config)?;

    let mut images = Vec::new();
    for mask_file in scan_mask_dir(masks_dir)? {
        match mask_file.load() {
            Ok(image) => images.push((mask_file.tile, image)),
            Err(err) => {
                warn!(path = %mask_file.path.display(), error = %err, "skipping unreadable mask");
            }
        }
    }

    let detections = pipeline.detect_all(detector, &images)?;

    io::write_detections_file(output, &detections)
        .wrap_err_with(|| format!("writing {}", output.display()))?;
    info!(detections = detections.len(), output = %output.display(), "wrote detections");
    Ok(())
}
