use clap::{Parser, Subcommand};
use cli::JobConfig;
use color_eyre::eyre::{Result, eyre};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};
use wiretrace::{
    BuildOptions, EngineCommand, EngineResponse, ExtractionConfig, Point, Preprocess,
    RasterImage, TraceOptions, VectorOptions, WireEngine,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct PageArgs {
    /// Path to the page image
    #[arg(short, long)]
    image: PathBuf,
    /// Extraction parameters (.toml or .json job file; only its `config` is used)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Closing radius that bridges broken strokes
    #[arg(long)]
    bridge_radius: Option<u8>,
    /// Suppress text-like blobs before tracing
    #[arg(long)]
    ignore_text: bool,
    /// Cleanup steps in order, e.g. `denoise,deskew` (denoise, adaptive_clean, deskew)
    #[arg(long, value_delimiter = ',')]
    preprocess: Vec<Preprocess>,
    /// Shorthand for `--preprocess denoise,adaptive_clean`
    #[arg(long, conflicts_with = "preprocess")]
    auto_clean: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every step of a job file: build, trace, export
    Process {
        /// Path to the .toml or .json job file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Build the wire graph and print its summary
    Build {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Trace the wire (or net) under a click
    Trace {
        #[command(flatten)]
        page: PageArgs,
        #[arg(short)]
        x: i32,
        #[arg(short)]
        y: i32,
        /// Stop at the first node
        #[arg(long)]
        stop_at: bool,
        /// Return the whole net instead of one wire
        #[arg(long)]
        component: bool,
    },
    /// Export the wire graph as SVG or GeoJSON
    Export {
        #[command(flatten)]
        page: PageArgs,
        /// Output file; `.geojson` or `.json` selects GeoJSON, anything else SVG
        #[arg(short, long)]
        output: PathBuf,
        /// Douglas-Peucker tolerance in pixels
        #[arg(long, default_value = "1.0")]
        simplify: f64,
        /// Keep wobbly strokes instead of flattening them onto an axis
        #[arg(long)]
        no_snap: bool,
        #[arg(long, default_value = "#000000")]
        stroke: String,
        #[arg(long, default_value = "2.0")]
        stroke_width: f64,
    },
    /// Print the JSON schema of the job file or of engine commands
    Schema {
        /// Print the EngineCommand schema instead of the job file schema
        #[arg(long)]
        commands: bool,
    },
    /// Write a job file with default parameters
    InitConfig {
        /// Destination (.toml or .json)
        #[arg(short, long)]
        output: PathBuf,
        /// Image the job should process
        #[arg(short, long)]
        image: String,
        #[arg(long, default_value = "out")]
        output_dir: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Process { config } => process_job(config)?,
        Commands::Build { page } => {
            let (_, response) = build_page(page)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Trace { page, x, y, stop_at, component } => {
            let (mut engine, _) = build_page(page)?;
            let id = page_id(page);
            let click = Point::new(*x, *y);
            let command = if *component {
                EngineCommand::TraceComponent { id, click }
            } else {
                EngineCommand::TracePath { id, click, options: TraceOptions { stop_at: *stop_at } }
            };
            println!("{}", serde_json::to_string_pretty(&engine.execute(command))?);
        }
        Commands::Export { page, output, simplify, no_snap, stroke, stroke_width } => {
            let (engine, _) = build_page(page)?;
            let id = page_id(page);
            let document = match output.extension().and_then(|e| e.to_str()) {
                Some("geojson") | Some("json") => engine.export_geojson(&id)?,
                _ => engine.export_svg(&id, &VectorOptions {
                    simplify: *simplify,
                    snap: !no_snap,
                    stroke: stroke.clone(),
                    stroke_width: *stroke_width,
                })?,
            };
            std::fs::write(output, document)?;
            info!("✅ Wrote {:?}", output);
        }
        Commands::Schema { commands } => {
            let schema = if *commands { EngineCommand::schema() } else { JobConfig::schema() };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::InitConfig { output, image, output_dir } => {
            JobConfig::new(image.clone(), output_dir.clone()).to_file(output)?;
            info!("📄 Job file saved to: {:?}", output);
        }
    }

    Ok(())
}

fn page_id(page: &PageArgs) -> String {
    page.image.to_string_lossy().to_string()
}

fn build_page(page: &PageArgs) -> Result<(WireEngine, EngineResponse)> {
    let config = match &page.config {
        Some(path) => JobConfig::from_file(path)?.config,
        None => ExtractionConfig::default(),
    };
    let mut engine = WireEngine::new(config);
    let image = RasterImage::open(&page.image)?;
    let preprocess = if page.auto_clean {
        Some(Preprocess::AUTO_CLEAN.to_vec())
    } else {
        (!page.preprocess.is_empty()).then(|| page.preprocess.clone())
    };
    let options = BuildOptions {
        bridge_radius: page.bridge_radius,
        ignore_text: page.ignore_text.then_some(true),
        preprocess,
        canvas: None,
    };
    let summary = engine.build_graph(&page_id(page), &image, &options)?;
    info!(
        "Graph: {} nodes ({} terminals, {} junctions, {} dots), {} edges",
        summary.nodes, summary.terminals, summary.junctions, summary.dots, summary.edges
    );
    Ok((engine, EngineResponse::GraphBuilt(summary)))
}

fn process_job(config_path: &Path) -> Result<()> {
    let job = JobConfig::from_file(config_path)?;
    info!("Job: {} -> {}", job.image, job.output_dir);
    std::fs::create_dir_all(&job.output_dir)?;
    let out = Path::new(&job.output_dir);

    let mut engine = WireEngine::new(job.config.clone());
    let image = RasterImage::open(&job.image)?;
    let built = engine.execute(EngineCommand::BuildGraph {
        id: job.page_id.clone(),
        image,
        options: BuildOptions::default(),
    });
    if let EngineResponse::Error { message, .. } = &built {
        return Err(eyre!("Failed to build {}: {}", job.image, message));
    }

    for trace in &job.traces {
        let response = engine.execute(trace.to_command(&job.page_id));
        let empty = matches!(
            response,
            EngineResponse::Path { path: None, .. }
                | EngineResponse::Component { paths: None, .. }
                | EngineResponse::Highlight { highlight: None, .. }
        );
        if empty {
            warn!("Trace '{}' at ({}, {}) found nothing", trace.name, trace.x, trace.y);
        }
        let filename = out.join(format!("{}.json", trace.name));
        std::fs::write(&filename, serde_json::to_string_pretty(&response)?)?;
        info!("Trace '{}' -> {:?}", trace.name, filename);
    }

    std::fs::write(out.join("wires.svg"), engine.export_svg(&job.page_id, &job.export)?)?;
    std::fs::write(out.join("wires.geojson"), engine.export_geojson(&job.page_id)?)?;
    std::fs::write(out.join("summary.json"), serde_json::to_string_pretty(&built)?)?;

    info!("✅ Job completed: {:?}", engine.stats());
    Ok(())
}
