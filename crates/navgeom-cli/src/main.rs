//! CLI utility for baking navigation meshes and inspecting polygons

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glam::Vec3;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use navgeom_common::{TriMesh, Vec2};
use navgeom_navmesh::{NavMesh, NavMeshConfig, TimerCategory};
use navgeom_polygon::Polygon;

/// Bake navigation meshes from OBJ files, query paths and inspect polygons
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bake a navigation mesh from an input mesh and report build statistics
    Bake {
        /// Input mesh file (OBJ format)
        #[clap(long, value_parser)]
        input: PathBuf,

        #[clap(flatten)]
        agent: AgentArgs,
    },

    /// Bake a navigation mesh and find a path on it
    Path {
        /// Input mesh file (OBJ format)
        #[clap(long, value_parser)]
        input: PathBuf,

        #[clap(flatten)]
        agent: AgentArgs,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        end: Vec3,

        /// Traversal cost override for an area (area=cost), repeatable
        #[clap(long = "cost", value_parser = parse_area_cost)]
        costs: Vec<(u8, f32)>,

        /// Output path file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Print measurements of a polygon given as "x,y x,y ..."
    Polygon {
        /// Outer ring
        #[clap(long, value_parser = parse_ring)]
        outer: Ring,

        /// Hole ring, repeatable
        #[clap(long = "hole", value_parser = parse_ring)]
        holes: Vec<Ring>,

        /// Offset the polygon by this distance before measuring
        #[clap(long)]
        buffer: Option<f64>,

        /// Use round joins for the offset
        #[clap(long)]
        round: bool,

        /// Simplify with this maximum deviation before measuring
        #[clap(long)]
        simplify: Option<f64>,
    },
}

/// Agent and voxel parameters
#[derive(Args, Debug, Clone, Copy)]
struct AgentArgs {
    /// Cell size (horizontal resolution)
    #[clap(long, default_value = "0.3")]
    cell_size: f32,

    /// Cell height (vertical resolution)
    #[clap(long, default_value = "0.2")]
    cell_height: f32,

    /// Clearance the agent needs above the floor
    #[clap(long, default_value = "2.0")]
    agent_height: f32,

    /// Distance kept from walls and ledges
    #[clap(long, default_value = "0.6")]
    agent_radius: f32,

    /// Highest step the agent can climb
    #[clap(long, default_value = "0.9")]
    agent_max_climb: f32,

    /// Maximum slope in degrees that is considered walkable
    #[clap(long, default_value = "45.0")]
    agent_max_slope: f32,
}

impl From<AgentArgs> for NavMeshConfig {
    fn from(args: AgentArgs) -> Self {
        NavMeshConfig {
            cell_size: args.cell_size,
            cell_height: args.cell_height,
            agent_height: args.agent_height,
            agent_radius: args.agent_radius,
            agent_max_climb: args.agent_max_climb,
            agent_max_slope: args.agent_max_slope,
        }
    }
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts = parse_floats(s)?;
    if parts.len() != 3 {
        return Err(format!(
            "Vector must have 3 components, got {}",
            parts.len()
        ));
    }
    Ok(Vec3::new(parts[0] as f32, parts[1] as f32, parts[2] as f32))
}

fn parse_point(s: &str) -> Result<Vec2, String> {
    let parts = parse_floats(s)?;
    if parts.len() != 2 {
        return Err(format!("Point must have 2 components, got {}", parts.len()));
    }
    Ok(Vec2::new(parts[0], parts[1]))
}

fn parse_floats(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{:?}: {}", p, e)))
        .collect()
}

/// Points of one polygon ring
#[derive(Debug, Clone, PartialEq)]
struct Ring(Vec<Vec2>);

/// Parse whitespace-separated points
fn parse_ring(s: &str) -> Result<Ring, String> {
    let ring = s
        .split_whitespace()
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;
    if ring.len() < 3 {
        return Err(format!("Ring needs at least 3 points, got {}", ring.len()));
    }
    Ok(Ring(ring))
}

fn parse_area_cost(s: &str) -> Result<(u8, f32), String> {
    let (area, cost) = s
        .split_once('=')
        .ok_or_else(|| format!("expected area=cost, got {:?}", s))?;
    let area = area.trim().parse::<u8>().map_err(|e| e.to_string())?;
    let cost = cost.trim().parse::<f32>().map_err(|e| e.to_string())?;
    Ok((area, cost))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bake { input, agent } => {
            bake(&input, &agent.into())?;
            Ok(())
        }
        Commands::Path {
            input,
            agent,
            start,
            end,
            costs,
            output,
        } => find_path(&input, &agent.into(), start, end, &costs, output.as_deref()),
        Commands::Polygon {
            outer,
            holes,
            buffer,
            round,
            simplify,
        } => describe_polygon(
            &outer.0,
            holes.into_iter().map(|ring| ring.0).collect(),
            buffer,
            round,
            simplify,
        ),
    }
}

fn bake(input: &Path, config: &NavMeshConfig) -> Result<NavMesh> {
    let mesh = TriMesh::from_obj(input)
        .with_context(|| format!("Failed to load mesh {}", input.display()))?;

    println!(
        "Mesh loaded: {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.triangles.len()
    );
    if let Some((bmin, bmax)) = mesh.calculate_bounds() {
        println!("Mesh bounds: min={}, max={}", bmin, bmax);
    }

    let mut nav_mesh = NavMesh::new();
    nav_mesh
        .build(&mesh.vertices, &mesh.triangles, &mesh.areas, config)
        .context("Failed to build navigation mesh")?;

    if let Some(stats) = nav_mesh.last_build_stats() {
        println!(
            "Navigation mesh built: {} polygons, {} vertices, {} detail triangles",
            stats.polygons, stats.vertices, stats.detail_triangles
        );
        for (category, duration) in &stats.timings {
            println!("  {:<20} {:>10.3} ms", format!("{:?}", category), duration.as_secs_f64() * 1000.0);
        }
        if let Some(total) = stats.timing(TimerCategory::Total) {
            println!("Total build time: {:.3} ms", total.as_secs_f64() * 1000.0);
        }
    }

    Ok(nav_mesh)
}

fn find_path(
    input: &Path,
    config: &NavMeshConfig,
    start: Vec3,
    end: Vec3,
    costs: &[(u8, f32)],
    output: Option<&Path>,
) -> Result<()> {
    let nav_mesh = bake(input, config)?;

    println!("Finding path from {} to {}...", start, end);
    let waypoints = nav_mesh.query(start, end, costs);
    if waypoints.is_empty() {
        bail!("No path from {} to {}", start, end);
    }

    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        writeln!(file, "# Path from {} to {}", start, end)?;
        writeln!(file, "# {} waypoints", waypoints.len())?;
        for waypoint in &waypoints {
            writeln!(file, "{},{},{}", waypoint.x, waypoint.y, waypoint.z)?;
        }
    } else {
        println!("Path:");
        for (i, waypoint) in waypoints.iter().enumerate() {
            println!("{}: {},{},{}", i, waypoint.x, waypoint.y, waypoint.z);
        }
    }

    Ok(())
}

fn describe_polygon(
    outer: &[Vec2],
    holes: Vec<Vec<Vec2>>,
    buffer: Option<f64>,
    round: bool,
    simplify: Option<f64>,
) -> Result<()> {
    let mut polygon = Polygon::with_holes(outer, holes);
    if polygon.is_empty() {
        bail!("Polygon is invalid: rings must be simple and holes must lie inside the outer ring");
    }

    if let Some(max_distance) = simplify {
        polygon = polygon.simplified(max_distance);
    }
    if let Some(distance) = buffer {
        polygon = if round {
            polygon.calculate_round_buffer(distance)
        } else {
            polygon.calculate_buffer(distance)
        };
        if polygon.is_empty() {
            bail!("Offset by {} produced no polygon", distance);
        }
    }

    let hull = polygon.calculate_convex_hull();
    let rect = polygon.bounding_rect();

    println!("Vertices:   {}", polygon.outer().len());
    println!("Holes:      {}", polygon.holes().len());
    println!("Triangles:  {}", polygon.num_triangles());
    println!("Area:       {:.6}", polygon.area());
    println!("Perimeter:  {:.6}", polygon.perimeter());
    println!("Centroid:   {}", polygon.centroid());
    println!("Bounds:     pos={} size={}", rect.pos, rect.size);
    println!("Hull area:  {:.6}", hull.area());

    Ok(())
}
