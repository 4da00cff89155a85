//! Voronoi fracture CLI
//!
//! Computes a deterministic fracture pattern and writes it as YAML polygons
//! or a PNG preview.
//!
//! ## YAML config file
//!
//! ```yaml
//! seed: 7
//! site_count: 64
//! bounds: { min_x: -10, min_y: -10, max_x: 10, max_y: 10 }
//! engine: fortune        # or jump-flood
//! relax_iterations: 2
//! impact: { x: 3.0, y: -1.5 }
//! impact_closeness: 0.3
//! ```
//!
//! Missing keys take their defaults; command-line flags override the file.
//!
//! Run with: `fracture --config glass.yaml -o pieces.yaml`
//! or:       `fracture --sites 200 --engine jump-flood --grid 512x512 -o preview.png`

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use fracture_core::{
    fracture_with, EngineKind, FractureConfig, FracturePattern, JumpFloodEngine, PixelSeed, Point,
    Rect, SiteGenerator,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EngineArg {
    Fortune,
    JumpFlood,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Fortune => EngineKind::Fortune,
            EngineArg::JumpFlood => EngineKind::JumpFlood,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Png,
}

#[derive(Parser, Debug)]
#[command(name = "fracture")]
#[command(about = "Generate Voronoi fracture patterns", long_about = None)]
struct Args {
    /// YAML config file (flags below override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path (YAML goes to stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (inferred from the output extension by default)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Fracture engine
    #[arg(short, long, value_enum)]
    engine: Option<EngineArg>,

    /// Number of sites
    #[arg(short = 'n', long)]
    sites: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Bounding rectangle: min_x,min_y,max_x,max_y
    #[arg(long, value_parser = parse_rect, allow_hyphen_values = true)]
    bounds: Option<Rect>,

    /// Impact point x,y; sites cluster around it
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    impact: Option<Point>,

    /// How tightly sites cluster around the impact (0 to 0.5)
    #[arg(long)]
    closeness: Option<f64>,

    /// Relaxation iterations (Fortune engine only)
    #[arg(short, long)]
    relax: Option<usize>,

    /// Jump Flood grid resolution, WIDTHxHEIGHT
    #[arg(long, value_parser = parse_size)]
    grid: Option<(u32, u32)>,

    /// Fortune comparison tolerance
    #[arg(long)]
    epsilon: Option<f64>,

    /// PNG preview size for Fortune output, WIDTHxHEIGHT (default 512 on the
    /// long side, preserving the bounds' aspect ratio)
    #[arg(long, value_parser = parse_size)]
    image_size: Option<(u32, u32)>,

    /// Worker threads for the Jump Flood engine (0 = all cores)
    #[arg(long, default_value = "0")]
    threads: usize,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_floats<const N: usize>(s: &str) -> Result<[f64; N], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {} comma-separated numbers, got '{}'", N, s));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|e| format!("invalid number '{}': {}", part, e))?;
    }
    Ok(out)
}

fn parse_point(s: &str) -> Result<Point, String> {
    let [x, y] = parse_floats::<2>(s)?;
    Ok(Point::new(x, y))
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let [min_x, min_y, max_x, max_y] = parse_floats::<4>(s)?;
    Ok(Rect::new(min_x, min_y, max_x, max_y))
}

/// Parse "512x256" (or a single "512" for a square)
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("invalid size '{}': {}", s, e));
    match s.split_once(['x', 'X']) {
        Some((w, h)) => Ok((parse(w)?, parse(h)?)),
        None => {
            let side = parse(s)?;
            Ok((side, side))
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<FractureConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))
}

/// Merge the config file (if any) with command-line overrides and validate.
fn resolve_config(args: &Args) -> anyhow::Result<FractureConfig> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => FractureConfig::default(),
    };

    let mut builder = base.to_builder();
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(engine) = args.engine {
        builder = builder.engine(engine.into());
    }
    if let Some(n) = args.sites {
        builder = builder.site_count(n)?;
    }
    if let Some(bounds) = args.bounds {
        builder = builder.bounds(bounds)?;
    }
    if let Some(iterations) = args.relax {
        builder = builder.relax_iterations(iterations)?;
    }
    if let Some((w, h)) = args.grid {
        builder = builder.grid(w, h)?;
    }
    if let Some(epsilon) = args.epsilon {
        builder = builder.epsilon(epsilon)?;
    }
    match (args.impact, base.impact) {
        (Some(impact), _) | (None, Some(impact)) => {
            let closeness = args.closeness.unwrap_or(base.impact_closeness);
            builder = builder.impact(impact, closeness)?;
        }
        (None, None) if args.closeness.is_some() => {
            tracing::warn!("--closeness has no effect without an impact point");
        }
        (None, None) => {}
    }

    builder.build().context("invalid fracture configuration")
}

fn output_format(args: &Args) -> OutputFormat {
    if let Some(format) = args.format {
        return format;
    }
    let is_png = args
        .output
        .as_ref()
        .and_then(|p| p.extension())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        OutputFormat::Png
    } else {
        OutputFormat::Yaml
    }
}

/// Preview size matching the bounds' aspect ratio, 512 on the long side
fn preview_size(bounds: &Rect, requested: Option<(u32, u32)>) -> (u32, u32) {
    if let Some(size) = requested {
        return size;
    }
    let long = 512.0;
    let (w, h) = if bounds.width() >= bounds.height() {
        (long, long * bounds.height() / bounds.width())
    } else {
        (long * bounds.width() / bounds.height(), long)
    };
    ((w.round() as u32).max(1), (h.round() as u32).max(1))
}

/// Computed pattern plus an engine-specific preview
struct Outcome {
    pattern: FracturePattern,
    preview: Option<image::RgbImage>,
}

fn run_fortune(config: &FractureConfig) -> anyhow::Result<Outcome> {
    let progress = if config.relax_iterations > 0 {
        let bar = ProgressBar::new(config.relax_iterations as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} relaxing [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    } else {
        ProgressBar::hidden()
    };
    let pattern = fracture_with(config, |_| progress.inc(1))?;
    progress.finish_and_clear();

    if pattern.has_closing_errors {
        tracing::warn!("Some cells could not be closed against the bounds");
    }
    Ok(Outcome { pattern, preview: None })
}

fn run_jump_flood(config: &FractureConfig, threads: usize) -> anyhow::Result<Outcome> {
    let sites = SiteGenerator::new(config.seed).sites_for(config);
    let engine = JumpFloodEngine::with_threads(config.grid_width, config.grid_height, threads)?;
    if config.relax_iterations > 0 {
        tracing::warn!("Relaxation is only supported by the Fortune engine; ignoring");
    }
    let seeds: Vec<PixelSeed> =
        sites.iter().map(|p| engine.world_to_pixel(*p, &config.bounds)).collect();
    let raster = engine.compute(&seeds, &config.bounds);
    tracing::info!("Found {} junction pixels", raster.vertices.interior_count);

    // Grid row 0 is min_y; previews put max_y at the top
    let preview = image::imageops::flip_vertical(&raster.grid.to_image()?);
    Ok(Outcome { pattern: raster.to_pattern(), preview: Some(preview) })
}

fn write_output(args: &Args, config: &FractureConfig, outcome: &Outcome) -> anyhow::Result<()> {
    match output_format(args) {
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&outcome.pattern)
                .context("failed to serialize fracture pattern")?;
            match &args.output {
                Some(path) => std::fs::write(path, yaml)
                    .with_context(|| format!("failed to write {:?}", path))?,
                None => std::io::stdout()
                    .lock()
                    .write_all(yaml.as_bytes())
                    .context("failed to write to stdout")?,
            }
        }
        OutputFormat::Png => {
            let path = args
                .output
                .as_ref()
                .context("PNG output needs an output path (-o)")?;
            let image = match &outcome.preview {
                Some(preview) if args.image_size.is_none() => preview.clone(),
                _ => {
                    let (w, h) = preview_size(&config.bounds, args.image_size);
                    outcome.pattern.to_image(w, h)?
                }
            };
            image
                .save(path)
                .with_context(|| format!("failed to save image: {:?}", path))?;
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = resolve_config(&args)?;
    tracing::info!(
        "Fracturing {:?} with {} sites ({:?} engine, seed {})",
        config.bounds,
        config.site_count,
        config.engine,
        config.seed
    );

    let start = Instant::now();
    let outcome = match config.engine {
        EngineKind::Fortune => run_fortune(&config)?,
        EngineKind::JumpFlood => run_jump_flood(&config, args.threads)?,
    };
    tracing::info!(
        "{} pieces in {:.1} ms",
        outcome.pattern.polygons.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    write_output(&args, &config, &outcome)
}
