use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use formats::observations::{center, extent, parse_observations};
use foundation::bounds::BoundingBox;
use foundation::polygon::BoundaryPolygon;
use layers::boundary::{BoundarySource, GeometryBuilder};
use layers::composer::{AnimatedParameter, LayerComposer, Z_ANCHORS};
use layers::surface::{InMemorySurface, SharedSurface};
use overlay::{BoundarySession, OverlayConfig, SessionState};
use runtime::scheduler::ManualScheduler;
use serde_json::{Map, Value, json};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and preview realm boundary overlays")]
struct Args {
    /// JSON overlay configuration; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct BoundaryInput {
    /// Bounding box: minLon,minLat,maxLon,maxLat
    #[arg(long, allow_hyphen_values = true)]
    bbox: Option<String>,

    /// JSON file holding a ring of [lon, lat] pairs
    #[arg(long)]
    polygon: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the boundary geometry as a GeoJSON FeatureCollection
    Geometry {
        #[command(flatten)]
        input: BoundaryInput,
    },

    /// Print the boundary sources and layers as map style JSON
    Layers {
        #[command(flatten)]
        input: BoundaryInput,
    },

    /// Print the bounding box and center of an observations response
    Extent {
        /// Realm API response or bare array of observations
        file: PathBuf,
    },

    /// Drive the boundary animation against an in-memory map and print the
    /// paint values written on each frame
    Simulate {
        #[command(flatten)]
        input: BoundaryInput,

        #[arg(long, default_value_t = 10)]
        frames: u32,

        #[arg(long, default_value_t = 60.0)]
        fps: f64,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Geometry { input } => cmd_geometry(&config, &input),
        Command::Layers { input } => cmd_layers(&config, &input),
        Command::Extent { file } => cmd_extent(&file),
        Command::Simulate { input, frames, fps } => cmd_simulate(&config, &input, frames, fps),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<OverlayConfig> {
    let Some(path) = path else {
        return Ok(OverlayConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let config = OverlayConfig::from_json_str(&text)?;
    info!(?path, "loaded configuration");
    Ok(config)
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid bbox {s:?}: {e}"))?;
    let &[w, south, e, n] = parts.as_slice() else {
        return Err(format!("bbox needs 4 comma separated numbers, got {s:?}"));
    };
    BoundingBox::from_corners([[w, south], [e, n]])
        .ok_or_else(|| format!("bbox {s:?} has non-finite coordinates"))
}

fn read_polygon(path: &Path) -> CliResult<BoundaryPolygon> {
    let text = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let polygon: BoundaryPolygon = serde_json::from_str(&text)?;
    Ok(polygon)
}

fn boundary_source(input: &BoundaryInput) -> CliResult<BoundarySource> {
    match (&input.bbox, &input.polygon) {
        (Some(bbox), _) => Ok(BoundarySource::Bounds(parse_bbox(bbox)?)),
        (None, Some(path)) => Ok(BoundarySource::Polygon(read_polygon(path)?)),
        (None, None) => Err("either --bbox or --polygon is required".into()),
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_geometry(config: &OverlayConfig, input: &BoundaryInput) -> CliResult<()> {
    let source = boundary_source(input)?;
    let geometry = GeometryBuilder::new(config.geometry).build(&source);
    if geometry.is_empty() {
        warn!("boundary input is degenerate; geometry is empty");
    }
    print_json(&geometry.to_geojson().to_value())
}

fn cmd_layers(config: &OverlayConfig, input: &BoundaryInput) -> CliResult<()> {
    let source = boundary_source(input)?;
    let geometry = GeometryBuilder::new(config.geometry).build(&source);
    let set = LayerComposer::new(config.boundary.clone()).compose(&geometry);

    let mut sources = Map::new();
    for s in &set.sources {
        sources.insert(s.id.clone(), s.to_style_json());
    }
    let layers: Vec<Value> = set.layers.iter().map(|l| l.to_style_json()).collect();
    print_json(&json!({
        "sources": sources,
        "layers": layers,
        "before": Z_ANCHORS,
    }))
}

fn cmd_extent(file: &Path) -> CliResult<()> {
    let text = fs::read_to_string(file).map_err(|e| format!("read {file:?}: {e}"))?;
    let observations = parse_observations(&text)?;
    let bounds = extent(&observations);
    let mid = center(&observations);
    info!(count = observations.len(), "parsed observations");
    print_json(&json!({
        "count": observations.len(),
        "bounds": bounds,
        "center": mid.map(|c| c.to_array()),
    }))
}

fn cmd_simulate(config: &OverlayConfig, input: &BoundaryInput, frames: u32, fps: f64) -> CliResult<()> {
    if !(fps.is_finite() && fps > 0.0) {
        return Err(format!("fps must be positive, got {fps}").into());
    }
    let source = boundary_source(input)?;
    let surface = Rc::new(RefCell::new(InMemorySurface::new()));
    let scheduler = Rc::new(ManualScheduler::new());
    let shared: SharedSurface = surface.clone();
    let mut session = BoundarySession::new(shared, scheduler.clone(), config);

    if session.show(source)? == SessionState::Absent {
        warn!("boundary input is degenerate; nothing to animate");
        return Ok(());
    }

    let dt = 1000.0 / fps;
    for i in 0..frames {
        if i == 0 {
            scheduler.run_frame();
        } else {
            scheduler.step(dt);
        }
        let s = surface.borrow();
        let mut values = Map::new();
        for p in AnimatedParameter::ALL {
            let (layer, property) = p.target();
            if let Some(v) = s.paint_value(layer, property) {
                values.insert(p.name().to_string(), json!(v));
            }
        }
        println!(
            "{}",
            json!({ "frame": i, "t_ms": f64::from(i) * dt, "values": values })
        );
    }

    let metrics = session.driver().metrics();
    info!(counters = ?metrics.counters, "simulation finished");
    session.hide();
    Ok(())
}
