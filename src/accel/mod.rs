//! Acceleration structures for GPU ray traversal.
//!
//! Two builders turn a [`SceneGeometry`](crate::geometry::SceneGeometry)
//! into a linear node array plus an index array:
//!
//! - [`Bvh`]: bounding volume hierarchy, partitions triangles in place.
//! - [`KdTree`]: axis-aligned plane splits, duplicates straddling triangles.
//!
//! Both keep tagged host nodes and flatten them to fixed-stride GPU records
//! only when packed (see [`gpu_data`]).

pub mod aabb;
pub mod bvh;
pub mod gpu_data;
pub mod heuristic;
pub mod kdtree;
#[cfg(feature = "gpu")]
pub mod upload;

pub use aabb::Aabb;
pub use bvh::{Bvh, BvhNode, NodeKind};
pub use gpu_data::{GpuBvhNode, GpuKdNode, GpuNodes, GpuSceneData, KD_LEAF_FLAG};
pub use heuristic::{Heuristic, Split};
pub use kdtree::{KdNode, KdNodeKind, KdTree};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::util::Result;

/// Hard upper bound on tree depth for every builder.
pub const MAX_DEPTH_LIMIT: u32 = 64;

/// Which acceleration structure a scene builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccelKind {
    #[default]
    Bvh,
    KdTree,
    /// Brute force: raw index buffer, no nodes.
    None,
}

impl AccelKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Bvh => "BVH",
            Self::KdTree => "Kd-tree",
            Self::None => "None",
        }
    }

    /// Depth cap used when the settings don't override it.
    pub fn default_max_depth(self, heuristic: Heuristic) -> u32 {
        match (self, heuristic) {
            (Self::Bvh, Heuristic::Sah) => 32,
            _ => MAX_DEPTH_LIMIT,
        }
    }
}

/// Counters collected while building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildStats {
    pub node_count: usize,
    pub leaf_count: usize,
    /// Deepest leaf (root = 0).
    pub max_depth: u32,
    /// Leaves that stopped only because the depth cap was reached.
    pub depth_capped_leaves: usize,
    /// Accepted splits that left one side empty (or, for the Kd-tree,
    /// shed nothing on either side) and were turned back into leaves.
    pub degenerate_splits: usize,
    /// Length of the final index array.
    pub index_count: usize,
    /// Extra triangle references created by straddler duplication.
    pub duplicated_triangles: usize,
    pub build_time: Duration,
}

impl BuildStats {
    pub(crate) fn record_leaf(&mut self, depth: u32) {
        self.leaf_count += 1;
        self.max_depth = self.max_depth.max(depth);
    }

    pub(crate) fn log(&self, kind: AccelKind, heuristic: Heuristic) {
        tracing::info!(
            structure = kind.label(),
            heuristic = heuristic.label(),
            nodes = self.node_count,
            leaves = self.leaf_count,
            depth = self.max_depth,
            capped = self.depth_capped_leaves,
            degenerate = self.degenerate_splits,
            indices = self.index_count,
            duplicates = self.duplicated_triangles,
            "built acceleration structure in {:.2?}",
            self.build_time
        );
    }
}

/// A built acceleration structure the scene can hand to the GPU.
pub trait AccelerationStructure {
    fn kind(&self) -> AccelKind;

    fn heuristic(&self) -> Heuristic;

    fn node_count(&self) -> usize;

    /// Final index array, in leaf order.
    fn indices(&self) -> &[u32];

    /// Number of entries in [`indices`](Self::indices).
    fn index_count(&self) -> u32 {
        self.indices().len() as u32
    }

    /// Bounds of the root node.
    fn bounds(&self) -> Aabb;

    fn stats(&self) -> &BuildStats;

    /// Flatten the host nodes into GPU records.
    fn pack_nodes(&self) -> Result<GpuNodes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_depths() {
        assert_eq!(AccelKind::Bvh.default_max_depth(Heuristic::Primitive), 64);
        assert_eq!(AccelKind::Bvh.default_max_depth(Heuristic::Sah), 32);
        assert_eq!(AccelKind::KdTree.default_max_depth(Heuristic::Sah), 64);
        assert_eq!(AccelKind::KdTree.default_max_depth(Heuristic::Primitive), 64);
    }

    #[test]
    fn test_record_leaf() {
        let mut stats = BuildStats::default();
        stats.record_leaf(3);
        stats.record_leaf(1);
        assert_eq!(stats.leaf_count, 2);
        assert_eq!(stats.max_depth, 3);
    }
}
