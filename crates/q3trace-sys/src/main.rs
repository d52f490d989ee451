// Entry point for the q3trace tool

use std::path::Path;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use log::info;

use q3trace_common::{load_map, try_trace, CollisionModel};
use q3trace_sys::bench::{generate_bounds, run_bench};
use q3trace_sys::config::{BenchArgs, Cli, Command, TraceArgs};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Info { map } => show_info(&map),
        Command::Trace(args) => run_trace(&args),
        Command::Bench(args) => run_benchmark(&args),
    }
}

fn open_map(path: &Path) -> Result<CollisionModel> {
    load_map(path).with_context(|| format!("failed to load map {}", path.display()))
}

fn show_info(path: &Path) -> Result<()> {
    let model = open_map(path)?;
    println!("{}", path.display());
    println!("{}", model.summary());
    Ok(())
}

fn run_trace(args: &TraceArgs) -> Result<()> {
    let model = open_map(&args.map)?;
    let bounds = args.bounds();
    let result = try_trace(&model, &bounds).context("bad trace arguments")?;

    let end = result.end_position(&bounds);
    println!("fraction: {}", result.path_fraction);
    println!("info:     {:?}", result.info);
    match result.collision_plane {
        Some(id) => {
            let plane = model.plane(id);
            println!(
                "plane:    {} normal ({} {} {}) dist {}",
                id.0, plane.normal[0], plane.normal[1], plane.normal[2], plane.dist
            );
        }
        None => println!("plane:    none"),
    }
    println!("end:      ({} {} {})", end[0], end[1], end[2]);
    Ok(())
}

fn run_benchmark(args: &BenchArgs) -> Result<()> {
    ensure!(
        args.range.is_finite() && args.range > 0.0,
        "--range must be a positive number, got {}",
        args.range
    );

    let model = open_map(&args.map)?;
    info!("generating {} queries (seed {}, range {})", args.count, args.seed, args.range);
    let queries = generate_bounds(args.count, args.seed, args.range);

    let report = run_bench(&model, &queries, args.parallel);
    println!("{}", report);
    Ok(())
}
