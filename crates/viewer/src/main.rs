mod outline;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use arbor_layout::kurbo::{CubicBez, Point, Rect, Size};
use arbor_layout::{SvgNode, SvgScene, generate_svg};
use clap::Parser;
use graphview::{Camera, Canvas, CanvasConfig, FlowOptions, NodeId};
use tracing_subscriber::EnvFilter;

use crate::outline::{load_outline, parse_outline};

/// Simulated frame interval
const FRAME: Duration = Duration::from_millis(16);

#[derive(Debug, Parser)]
#[command(
    name = "arbor-viewer",
    about = "Lay out a tree diagram and render it to SVG",
    version
)]
struct Cli {
    /// Tree to render: a `.json` snapshot or a `.kdl` outline
    input: PathBuf,

    /// SVG file to write, defaults to the input path with an `.svg` extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1200.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 800.0)]
    height: f64,

    /// Canvas options as a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Send flow markers between two nodes, given by name
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"])]
    flow: Option<Vec<String>>,

    /// Number of markers for `--flow`
    #[arg(long, default_value_t = 1)]
    markers: usize,

    /// Frames to simulate before drawing
    #[arg(long, default_value_t = 60)]
    frames: usize,

    /// Also write the tree as a JSON snapshot
    #[arg(long)]
    export: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    run(&cli)
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => serde_json::from_str::<CanvasConfig>(&read(path)?)
            .with_context(|| format!("invalid canvas config {}", path.display()))?,
        None => CanvasConfig::default(),
    };
    config.debug_logging |= cli.debug;

    let mut canvas = Canvas::headless(config, Size::new(cli.width, cli.height));
    load(&mut canvas, &cli.input)?;
    canvas.zoom_to_fit()?;
    tracing::info!(
        nodes = canvas.tree().len(),
        zoom = canvas.viewport().target().zoom,
        "tree laid out"
    );

    let start = Instant::now();
    let mut highlighted = Vec::new();
    if let Some([from, to]) = cli.flow.as_deref() {
        let from = find_by_name(&canvas, from)?;
        let to = find_by_name(&canvas, to)?;
        let options = FlowOptions {
            count: cli.markers,
            ..Default::default()
        };
        canvas.animate_flow(from, to, options, start)?;
        highlighted = vec![from, to];
    }

    let markers = simulate(&mut canvas, start, cli.frames);
    let svg = render(&canvas, &markers, &highlighted);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("svg"));
    fs::write(&output, svg).with_context(|| format!("failed to write {}", output.display()))?;
    tracing::info!(path = %output.display(), "wrote svg");

    if let Some(path) = &cli.export {
        fs::write(path, canvas.export_json()?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote snapshot");
    }
    Ok(())
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load(canvas: &mut Canvas, path: &Path) -> Result<()> {
    let content = read(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => canvas
            .import_json(&content)
            .with_context(|| format!("invalid snapshot {}", path.display()))?,
        Some("kdl") => {
            let outline = parse_outline(&content)?;
            load_outline(canvas, &outline)?;
        }
        _ => bail!("unsupported input {}, expected .json or .kdl", path.display()),
    }
    Ok(())
}

fn find_by_name(canvas: &Canvas, name: &str) -> Result<NodeId> {
    canvas
        .tree()
        .iter()
        .find(|n| n.name() == name)
        .map(|n| n.id())
        .with_context(|| format!("no node named {name:?}"))
}

/// Run frames until nothing is animating or the budget is used up.
/// Returns the last visible marker positions, in canvas space.
fn simulate(canvas: &mut Canvas, start: Instant, frames: usize) -> Vec<Point> {
    let mut now = start;
    let mut markers = Vec::new();
    for _ in 0..frames {
        now += FRAME;
        let frame = canvas.tick(now);
        markers = frame.markers.iter().filter_map(|m| m.position).collect();
        if !frame.needs_frame {
            break;
        }
    }
    markers
}

fn render(canvas: &Canvas, markers: &[Point], highlighted: &[NodeId]) -> String {
    let camera = canvas.camera();
    let tree = canvas.tree();
    let nodes = tree
        .pre_order()
        .into_iter()
        .filter_map(|id| tree.get(id))
        .map(|n| SvgNode {
            rect: view_rect(&camera, n.rect()),
            label: n.name().to_string(),
            color: n.color().to_string(),
            highlighted: highlighted.contains(&n.id()) || canvas.selected() == Some(n.id()),
        })
        .collect();
    let connections = canvas
        .connections()
        .iter()
        .map(|c| view_curve(&camera, c.curve))
        .collect();
    let scene = SvgScene {
        nodes,
        connections,
        markers: markers.iter().map(|p| camera.to_viewport(*p)).collect(),
    };
    generate_svg(&scene, 20.0)
}

fn view_rect(camera: &Camera, rect: Rect) -> Rect {
    Rect::from_points(
        camera.to_viewport(rect.origin()),
        camera.to_viewport(Point::new(rect.x1, rect.y1)),
    )
}

// The camera is affine, so mapping the control points maps the curve
fn view_curve(camera: &Camera, curve: CubicBez) -> CubicBez {
    CubicBez::new(
        camera.to_viewport(curve.p0),
        camera.to_viewport(curve.p1),
        camera.to_viewport(curve.p2),
        camera.to_viewport(curve.p3),
    )
}
