//! Split selection: midpoint ("primitive") and surface-area heuristics.
//!
//! Every function answers "where should this node be cut?" with
//! `Option<Split>`; `None` means the node stays a leaf. Candidates are
//! visited axis 0, 1, 2 and then in ascending position, and only a strictly
//! cheaper candidate replaces the current best, so the first minimum wins.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Aabb;

/// Split-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heuristic {
    /// Midpoint of the longest axis.
    Primitive,
    /// Surface area heuristic.
    #[default]
    Sah,
}

impl Heuristic {
    pub fn label(self) -> &'static str {
        match self {
            Self::Primitive => "Primitive",
            Self::Sah => "SAH",
        }
    }
}

/// Leaf floor for the midpoint heuristic on a BVH (triangles).
pub const BVH_PRIMITIVE_LEAF_SIZE: usize = 10;

/// Leaf floor for the midpoint heuristic on a Kd-tree (primitives).
pub const KD_PRIMITIVE_LEAF_SIZE: usize = 32;

/// Leaf floor for both SAH variants.
pub const SAH_LEAF_SIZE: usize = 32;

/// Number of centroid buckets per axis for the binned BVH SAH.
pub const SAH_BINS: usize = 8;

/// Costs below this are treated as numerical noise and rejected.
pub const MIN_SPLIT_COST: f32 = 1.0;

/// Default Kd-tree traversal cost added to every candidate.
pub const DEFAULT_KD_TRAVERSAL_COST: f32 = 1.0;

/// A chosen split plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Split {
    /// 0=x, 1=y, 2=z.
    pub axis: usize,
    /// Plane coordinate on `axis`.
    pub position: f32,
    /// Heuristic cost of the split. Zero for midpoint splits, which have no
    /// cost model.
    pub cost: f32,
}

/// Per-triangle data cached for the BVH build.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveRef {
    pub centroid: Vec3,
    pub bounds: Aabb,
}

impl PrimitiveRef {
    pub fn from_triangle(v: [Vec3; 3]) -> Self {
        Self {
            centroid: (v[0] + v[1] + v[2]) / 3.0,
            bounds: Aabb::from_triangle(v[0], v[1], v[2]),
        }
    }
}

/// Midpoint of the longest axis of `bounds`.
///
/// Refuses at or below `leaf_size` primitives, and when the box has no
/// extent left to cut.
pub fn midpoint_split(bounds: &Aabb, count: usize, leaf_size: usize) -> Option<Split> {
    if count <= leaf_size || bounds.is_empty() {
        return None;
    }
    let axis = bounds.longest_axis();
    let extent = bounds.extent()[axis];
    if extent <= 0.0 {
        return None;
    }
    Some(Split {
        axis,
        position: bounds.min[axis] + extent * 0.5,
        cost: 0.0,
    })
}

/// SAH bucket for split evaluation.
#[derive(Clone, Copy)]
struct Bin {
    bounds: Aabb,
    count: usize,
}

impl Bin {
    const EMPTY: Self = Self {
        bounds: Aabb::EMPTY,
        count: 0,
    };
}

/// Binned SAH over triangle centroids (BVH).
///
/// Buckets span the centroid extent of `prims`, not the node box. A boundary
/// costs `leftArea * leftCount + rightArea * rightCount`; the best one must
/// reach [`MIN_SPLIT_COST`] and beat the leaf cost `count * nodeArea`.
pub fn binned_sah_split(prims: &[PrimitiveRef], node_bounds: &Aabb) -> Option<Split> {
    let count = prims.len();
    if count <= SAH_LEAF_SIZE {
        return None;
    }

    let mut centroid_bounds = Aabb::EMPTY;
    for p in prims {
        centroid_bounds.expand_point(p.centroid);
    }

    let mut best: Option<Split> = None;

    for axis in 0..3 {
        let extent = centroid_bounds.max[axis] - centroid_bounds.min[axis];
        if extent <= 0.0 {
            continue;
        }

        let mut bins = [Bin::EMPTY; SAH_BINS];
        let scale = SAH_BINS as f32 / extent;
        for p in prims {
            let bin = ((p.centroid[axis] - centroid_bounds.min[axis]) * scale) as usize;
            let bin = bin.min(SAH_BINS - 1);
            bins[bin].bounds.expand(&p.bounds);
            bins[bin].count += 1;
        }

        // Suffix sweep: right side of boundary i holds bins i+1..
        let mut right_area = [0.0f32; SAH_BINS - 1];
        let mut right_count = [0usize; SAH_BINS - 1];
        let mut sweep = Aabb::EMPTY;
        let mut sweep_count = 0;
        for i in (1..SAH_BINS).rev() {
            sweep.expand(&bins[i].bounds);
            sweep_count += bins[i].count;
            right_area[i - 1] = if sweep_count > 0 { sweep.surface_area() } else { 0.0 };
            right_count[i - 1] = sweep_count;
        }

        // Prefix sweep in ascending boundary order so ties keep the first.
        let mut sweep = Aabb::EMPTY;
        let mut sweep_count = 0;
        for i in 0..SAH_BINS - 1 {
            sweep.expand(&bins[i].bounds);
            sweep_count += bins[i].count;
            if sweep_count == 0 || right_count[i] == 0 {
                continue;
            }
            let cost = sweep.surface_area() * sweep_count as f32
                + right_area[i] * right_count[i] as f32;
            if best.map_or(true, |b| cost < b.cost) {
                best = Some(Split {
                    axis,
                    position: centroid_bounds.min[axis]
                        + extent * (i + 1) as f32 / SAH_BINS as f32,
                    cost,
                });
            }
        }
    }

    let parent_cost = count as f32 * node_bounds.surface_area();
    best.filter(|b| b.cost >= MIN_SPLIT_COST && b.cost < parent_cost)
}

/// One end of a primitive's extent along the sweep axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdEvent {
    pub primitive: u32,
    pub position: f32,
    pub is_max: bool,
}

/// Events for `ids` along `axis`, sorted by position; at equal positions
/// max events come first.
pub fn sorted_events(ids: &[u32], prim_bounds: &[Aabb], axis: usize, events: &mut Vec<KdEvent>) {
    events.clear();
    for &id in ids {
        let b = &prim_bounds[id as usize];
        events.push(KdEvent {
            primitive: id,
            position: b.min[axis],
            is_max: false,
        });
        events.push(KdEvent {
            primitive: id,
            position: b.max[axis],
            is_max: true,
        });
    }
    events.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then_with(|| b.is_max.cmp(&a.is_max))
    });
}

/// Exact event-sweep SAH (Kd-tree).
///
/// Candidate planes sit at primitive bound coordinates strictly inside
/// `node_bounds`; coordinates at or past the node faces are skipped, not
/// clamped. Counts match the builder's classification: primitives ending
/// below the plane go left, those starting above go right, and everything
/// touching the plane (planar ones included) counts on both sides. Child
/// areas are the node box clipped at the plane:
/// `cost = traversal_cost + leftArea * leftCount + rightArea * rightCount`.
/// The best cost must reach [`MIN_SPLIT_COST`] and beat `count * nodeArea`.
pub fn sweep_sah_split(
    ids: &[u32],
    prim_bounds: &[Aabb],
    node_bounds: &Aabb,
    traversal_cost: f32,
) -> Option<Split> {
    let count = ids.len();
    if count <= SAH_LEAF_SIZE {
        return None;
    }

    let mut best: Option<Split> = None;
    let mut events = Vec::with_capacity(2 * count);

    for axis in 0..3 {
        sorted_events(ids, prim_bounds, axis, &mut events);

        // left = #{min <= t}, right = #{max >= t}: a primitive touching the
        // plane counts on both sides, as the builder duplicates it.
        let mut left = 0usize;
        let mut right = count;
        for group in events.chunk_by(|a, b| a.position == b.position) {
            let t = group[0].position;
            let ending = group.iter().filter(|e| e.is_max).count();
            left += group.len() - ending;

            if t > node_bounds.min[axis] && t < node_bounds.max[axis] {
                let (below, above) = node_bounds.split(axis, t);
                let cost = traversal_cost
                    + below.surface_area() * left as f32
                    + above.surface_area() * right as f32;
                if best.map_or(true, |b| cost < b.cost) {
                    best = Some(Split {
                        axis,
                        position: t,
                        cost,
                    });
                }
            }

            right -= ending;
        }
    }

    let parent_cost = count as f32 * node_bounds.surface_area();
    best.filter(|b| b.cost >= MIN_SPLIT_COST && b.cost < parent_cost)
}
