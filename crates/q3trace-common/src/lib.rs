#![allow(clippy::float_cmp, clippy::needless_range_loop, clippy::too_many_arguments,
         clippy::manual_range_contains)]

pub mod q_shared;
pub mod qfiles;
pub mod error;
pub mod cmodel;
pub mod bounds;
pub mod trace;

#[cfg(test)]
mod testutil;

pub use bounds::{Bounds, TraceShape};
pub use cmodel::{load_map, CollisionModel, MapSummary};
pub use error::{LoadError, TraceError};
pub use trace::{trace, trace_batch, try_trace, PathInfo, TraceResult, SURFACE_CLIP_EPSILON};
