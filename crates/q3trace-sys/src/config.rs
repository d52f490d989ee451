// config.rs — Command line of the q3trace tool

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use q3trace_common::q_shared::Vec3;
use q3trace_common::Bounds;

#[derive(Debug, Parser)]
#[command(name = "q3trace")]
#[command(about = "Collision traces against Quake 3 BSP maps", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a map and print its record counts
    Info {
        /// Path to the .bsp file
        map: PathBuf,
    },
    /// Run one trace and print the result
    Trace(TraceArgs),
    /// Time a batch of random traces
    Bench(BenchArgs),
}

#[derive(Debug, Args)]
pub struct TraceArgs {
    /// Path to the .bsp file
    pub map: PathBuf,
    /// Start point as X,Y,Z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub start: Vec3,
    /// End point as X,Y,Z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    pub end: Vec3,
    /// Sweep a sphere of this radius
    #[arg(long, conflicts_with_all = ["box_min", "box_max"])]
    pub radius: Option<f32>,
    /// Box mins relative to the moving origin
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, requires = "box_max")]
    pub box_min: Option<Vec3>,
    /// Box maxs relative to the moving origin
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true, requires = "box_min")]
    pub box_max: Option<Vec3>,
}

impl TraceArgs {
    pub fn bounds(&self) -> Bounds {
        match (self.radius, self.box_min, self.box_max) {
            (Some(radius), _, _) => Bounds::sphere(self.start, self.end, radius),
            (None, Some(mins), Some(maxs)) => Bounds::aabb(self.start, self.end, mins, maxs),
            _ => Bounds::ray(self.start, self.end),
        }
    }
}

#[derive(Debug, Args)]
pub struct BenchArgs {
    /// Path to the .bsp file
    pub map: PathBuf,
    /// Number of traces
    #[arg(long, default_value_t = 1_000_000)]
    pub count: usize,
    /// Random seed for the generated queries
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    /// Start and end coordinates are drawn from [-range, range)
    #[arg(long, default_value_t = 1000.0)]
    pub range: f32,
    /// Spread the traces over all cores
    #[arg(long)]
    pub parallel: bool,
}

/// Parse a point written as `x,y,z`.
pub fn parse_vec3(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected X,Y,Z, got '{}'", s));
    }
    let mut v = [0.0f32; 3];
    for (c, part) in v.iter_mut().zip(&parts) {
        *c = part
            .parse()
            .map_err(|e| format!("bad coordinate '{}': {}", part, e))?;
    }
    Ok(v)
}
