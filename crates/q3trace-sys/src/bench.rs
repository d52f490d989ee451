// bench.rs — Random trace workload and timer

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use q3trace_common::q_shared::Vec3;
use q3trace_common::{trace, Bounds, CollisionModel};

/// Roughly a standing player.
pub const PLAYER_BOX_MIN: Vec3 = [-20.0, -90.0, -20.0];
pub const PLAYER_BOX_MAX: Vec3 = [20.0, 90.0, 20.0];
pub const BENCH_SPHERE_RADIUS: f32 = 5.0;

/// Build `count` queries with start and end drawn uniformly from
/// `[-range, range)`. A third draw picks the shape: the top third of the
/// range is a player box, the bottom third a small sphere, the rest rays.
///
/// `range` must be positive.
pub fn generate_bounds(count: usize, seed: u64, range: f32) -> Vec<Bounds> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut draw = move || rng.gen_range(-range..range);
    let third = range / 3.0;

    (0..count)
        .map(|_| {
            let start = [draw(), draw(), draw()];
            let end = [draw(), draw(), draw()];
            let kind = draw();
            if kind > third {
                Bounds::aabb(start, end, PLAYER_BOX_MIN, PLAYER_BOX_MAX)
            } else if kind < -third {
                Bounds::sphere(start, end, BENCH_SPHERE_RADIUS)
            } else {
                Bounds::ray(start, end)
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchReport {
    pub traces: usize,
    pub hits: usize,
    pub elapsed: Duration,
    pub parallel: bool,
}

impl BenchReport {
    pub fn traces_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.traces as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} traces ({}) in {} us, {} hits, {:.0} traces/s",
            self.traces,
            if self.parallel { "parallel" } else { "serial" },
            self.elapsed.as_micros(),
            self.hits,
            self.traces_per_second()
        )
    }
}

/// Trace every query against `model`. Only the traces are timed.
pub fn run_bench(model: &CollisionModel, queries: &[Bounds], parallel: bool) -> BenchReport {
    debug!("tracing {} queries ({})", queries.len(), if parallel { "parallel" } else { "serial" });

    let start = Instant::now();
    let hits = if parallel {
        queries.par_iter().filter(|b| trace(model, b).is_hit()).count()
    } else {
        queries.iter().filter(|b| trace(model, b).is_hit()).count()
    };
    let elapsed = start.elapsed();

    BenchReport {
        traces: queries.len(),
        hits,
        elapsed,
        parallel,
    }
}
