// trace.rs — Swept ray/sphere/box traces against the collision model
//
// The query walks the BSP tree from node 0, splitting the path at every node
// plane it straddles, and clips it against the solid brushes of each leaf it
// reaches. The result is threaded through the recursion by value: every
// call takes the best result so far and returns the (possibly improved) one.

use rayon::prelude::*;

use crate::bounds::{aabb_disjoint, Bounds};
use crate::cmodel::{CBrush, CollisionModel, LeafId, NodeChild, NodeId, PlaneId};
use crate::error::TraceError;
use crate::q_shared::{clamp01, dot_product, vector_add, vector_lerp, Vec3};

/// Distance kept between a trace and the surface it stops at, so the end
/// position never lands exactly on a plane.
pub const SURFACE_CLIP_EPSILON: f32 = 0.125;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathInfo {
    OutsideSolid,
    StartsInsideEndsOutsideSolid,
    InsideSolid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceResult {
    /// Plane of the brush side that stopped the trace.
    pub collision_plane: Option<PlaneId>,
    /// 0.0 = blocked at `start`, 1.0 = nothing hit.
    pub path_fraction: f32,
    pub info: PathInfo,
}

impl TraceResult {
    pub const MISS: TraceResult = TraceResult {
        collision_plane: None,
        path_fraction: 1.0,
        info: PathInfo::OutsideSolid,
    };

    pub fn is_hit(&self) -> bool {
        self.collision_plane.is_some()
    }

    pub fn starts_solid(&self) -> bool {
        self.info != PathInfo::OutsideSolid
    }

    /// Where the moving origin stops along the path of `bounds`.
    pub fn end_position(&self, bounds: &Bounds) -> Vec3 {
        if self.path_fraction == 1.0 {
            bounds.end
        } else {
            vector_lerp(&bounds.start, &bounds.end, self.path_fraction)
        }
    }
}

impl Default for TraceResult {
    fn default() -> Self {
        Self::MISS
    }
}

// ============================================================
// Public entry points
// ============================================================

/// Trace `bounds` through `model`.
///
/// Panics if `bounds` mixes shapes or is otherwise invalid; use `try_trace`
/// to get the error instead.
pub fn trace(model: &CollisionModel, bounds: &Bounds) -> TraceResult {
    if let Err(e) = bounds.shape() {
        panic!("trace: {}", e);
    }
    run_trace(model, bounds)
}

pub fn try_trace(model: &CollisionModel, bounds: &Bounds) -> Result<TraceResult, TraceError> {
    bounds.shape()?;
    Ok(run_trace(model, bounds))
}

/// Trace many independent queries in parallel. Results are in input order.
pub fn trace_batch(model: &CollisionModel, bounds: &[Bounds]) -> Vec<TraceResult> {
    bounds.par_iter().map(|b| trace(model, b)).collect()
}

fn run_trace(model: &CollisionModel, bounds: &Bounds) -> TraceResult {
    if model.is_empty() {
        return TraceResult::MISS;
    }
    TraceWork::new(model, bounds).check_node(
        NodeChild::Node(NodeId(0)),
        0.0,
        1.0,
        &bounds.start,
        &bounds.end,
        TraceResult::MISS,
    )
}

// ============================================================
// Recursive tree walk
// ============================================================

/// Per-query constants shared by every step of one trace.
struct TraceWork<'a> {
    model: &'a CollisionModel,
    bounds: &'a Bounds,
    extents: Vec3,
    swept_mins: Vec3,
    swept_maxs: Vec3,
}

impl<'a> TraceWork<'a> {
    fn new(model: &'a CollisionModel, bounds: &'a Bounds) -> Self {
        let (swept_mins, swept_maxs) = bounds.swept_bounds();
        Self {
            model,
            bounds,
            extents: bounds.extents(),
            swept_mins,
            swept_maxs,
        }
    }

    /// Walk the part of the path between `start_frac` and `end_frac`
    /// (`start`..`end` in world space) through the subtree at `node`.
    fn check_node(
        &self,
        node: NodeChild,
        start_frac: f32,
        end_frac: f32,
        start: &Vec3,
        end: &Vec3,
        result: TraceResult,
    ) -> TraceResult {
        // already hit something nearer than this span
        if result.path_fraction <= start_frac {
            return result;
        }

        let node = match node {
            NodeChild::Leaf(leaf) => return self.check_leaf(leaf, result),
            NodeChild::Node(id) => self.model.node(id),
        };
        let plane = self.model.plane(node.plane);

        let start_distance = plane.distance_to(start);
        let end_distance = plane.distance_to(end);
        let offset = self.bounds.sphere_radius
            + (self.extents[0] * plane.normal[0]).abs()
            + (self.extents[1] * plane.normal[1]).abs()
            + (self.extents[2] * plane.normal[2]).abs();

        if start_distance >= offset && end_distance >= offset {
            return self.check_node(node.children[0], start_frac, end_frac, start, end, result);
        }
        if start_distance < -offset && end_distance < -offset {
            return self.check_node(node.children[1], start_frac, end_frac, start, end, result);
        }

        // the path spans the plane; the near side goes first
        let (side, frac1, frac2) = if start_distance < end_distance {
            let inv = 1.0 / (start_distance - end_distance);
            (
                1,
                (start_distance - offset + SURFACE_CLIP_EPSILON) * inv,
                (start_distance + offset + SURFACE_CLIP_EPSILON) * inv,
            )
        } else if end_distance < start_distance {
            let inv = 1.0 / (start_distance - end_distance);
            (
                0,
                (start_distance + offset + SURFACE_CLIP_EPSILON) * inv,
                (start_distance - offset - SURFACE_CLIP_EPSILON) * inv,
            )
        } else {
            (0, 1.0, 0.0)
        };
        let frac1 = clamp01(frac1);
        let frac2 = clamp01(frac2);

        let mid_frac = start_frac + (end_frac - start_frac) * frac1;
        let mid = vector_lerp(start, end, frac1);
        let result = self.check_node(node.children[side], start_frac, mid_frac, start, &mid, result);

        let mid_frac = start_frac + (end_frac - start_frac) * frac2;
        let mid = vector_lerp(start, end, frac2);
        self.check_node(node.children[side ^ 1], mid_frac, end_frac, &mid, end, result)
    }

    /// Clip against every solid brush in the leaf whose bounds the swept
    /// shape can reach.
    fn check_leaf(&self, leaf: LeafId, result: TraceResult) -> TraceResult {
        let leaf = self.model.leaf(leaf);
        self.model
            .leaf_brushes(leaf)
            .iter()
            .fold(result, |result, &brush_id| {
                let brush = self.model.brush(brush_id);
                if brush.num_sides <= 0 || !self.model.is_solid(brush) {
                    return result;
                }
                if aabb_disjoint(
                    &brush.mins,
                    &brush.maxs,
                    &self.swept_mins,
                    &self.swept_maxs,
                    SURFACE_CLIP_EPSILON,
                ) {
                    return result;
                }
                self.check_brush(brush, result)
            })
    }

    /// Clip the whole query path against one convex brush.
    fn check_brush(&self, brush: &CBrush, current: TraceResult) -> TraceResult {
        let bounds = self.bounds;
        let mut start_fraction = -1.0f32;
        let mut end_fraction = 1.0f32;
        let mut clip_plane = None;
        let mut starts_out = false;
        let mut ends_out = false;

        for side in self.model.brush_sides(brush) {
            let plane = self.model.plane(side.plane);

            // Push the box corner nearest the plane onto the path. Rays and
            // spheres have an all-zero box, so this is a no-op for them.
            let mut offset = [0.0f32; 3];
            for j in 0..3 {
                offset[j] = if plane.normal[j] < 0.0 {
                    bounds.box_max[j]
                } else {
                    bounds.box_min[j]
                };
            }

            let dist = plane.dist + bounds.sphere_radius;
            let start_distance = dot_product(&vector_add(&bounds.start, &offset), &plane.normal) - dist;
            let end_distance = dot_product(&vector_add(&bounds.end, &offset), &plane.normal) - dist;

            if start_distance > 0.0 {
                starts_out = true;
            }
            if end_distance > 0.0 {
                ends_out = true;
            }

            // entirely in front of one face: never enters this brush
            if start_distance > 0.0 && end_distance > 0.0 {
                return current;
            }
            // entirely behind: clipped by the other faces
            if start_distance <= 0.0 && end_distance <= 0.0 {
                continue;
            }

            if start_distance > end_distance {
                // entering
                let f = (start_distance - SURFACE_CLIP_EPSILON) / (start_distance - end_distance);
                if f > start_fraction {
                    start_fraction = f;
                    clip_plane = Some(side.plane);
                }
            } else {
                // leaving
                let f = (start_distance + SURFACE_CLIP_EPSILON) / (start_distance - end_distance);
                if f < end_fraction {
                    end_fraction = f;
                }
            }
        }

        if !starts_out {
            return TraceResult {
                info: if ends_out {
                    PathInfo::StartsInsideEndsOutsideSolid
                } else {
                    PathInfo::InsideSolid
                },
                ..current
            };
        }

        if start_fraction < end_fraction
            && start_fraction > -1.0
            && start_fraction < current.path_fraction
        {
            return TraceResult {
                collision_plane: clip_plane,
                path_fraction: clamp01(start_fraction),
                info: PathInfo::OutsideSolid,
            };
        }

        current
    }
}

// ============================================================
// Tests
// ============================================================
