//! Kd-tree builder.
//!
//! Splits space with axis-aligned planes. A triangle whose bounds cross the
//! plane is referenced by both children, so leaves cover the input but may
//! overlap. Leaves emit the triangles' real vertex indices into a fresh
//! index array.

use std::time::Instant;

use super::gpu_data::pack_kd_nodes;
use super::heuristic::{self, Heuristic, KD_PRIMITIVE_LEAF_SIZE};
use super::{AccelKind, AccelerationStructure, Aabb, BuildStats, GpuNodes, MAX_DEPTH_LIMIT};
use crate::geometry::SceneGeometry;
use crate::util::{Error, Result};

/// What a Kd node holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdNodeKind {
    /// Index range `[first_index, first_index + index_count)`.
    Leaf { first_index: u32, index_count: u32 },
    /// Plane at `split` on `axis`; the child below is `first_child`, the
    /// child above is `first_child + 1`.
    Internal {
        axis: u8,
        split: f32,
        first_child: u32,
    },
}

/// Host-side Kd node. `bounds` is the parent box clipped by every plane on
/// the path from the root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdNode {
    pub bounds: Aabb,
    pub kind: KdNodeKind,
}

impl KdNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, KdNodeKind::Leaf { .. })
    }
}

/// Built Kd-tree.
#[derive(Debug, Clone)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    indices: Vec<u32>,
    heuristic: Heuristic,
    stats: BuildStats,
}

impl KdTree {
    /// Build a Kd-tree over every triangle of `geometry`.
    ///
    /// `traversal_cost` is the constant added to every SAH candidate; it is
    /// ignored by the primitive heuristic.
    #[tracing::instrument(skip_all, fields(tri_count = geometry.triangle_count(), heuristic = heuristic.label()))]
    pub fn build(
        geometry: &SceneGeometry,
        heuristic: Heuristic,
        max_depth: u32,
        traversal_cost: f32,
    ) -> Result<Self> {
        if geometry.is_empty() {
            return Err(Error::EmptyGeometry);
        }
        let start = Instant::now();

        let tri_count = geometry.triangle_count();
        let prim_bounds: Vec<Aabb> = (0..tri_count)
            .map(|t| {
                let [a, b, c] = geometry.triangle_at(3 * t);
                Aabb::from_triangle(a, b, c)
            })
            .collect();
        let mut scene_bounds = Aabb::EMPTY;
        for b in &prim_bounds {
            scene_bounds.expand(b);
        }

        let mut builder = KdBuilder {
            source: geometry.indices(),
            prim_bounds,
            nodes: vec![KdNode {
                bounds: scene_bounds,
                kind: KdNodeKind::Leaf {
                    first_index: 0,
                    index_count: 0,
                },
            }],
            indices: Vec::with_capacity(geometry.indices().len()),
            heuristic,
            max_depth: max_depth.min(MAX_DEPTH_LIMIT),
            traversal_cost,
            stats: BuildStats::default(),
        };

        let ids: Vec<u32> = (0..tri_count as u32).collect();
        builder.build_node(0, scene_bounds, ids, 0)?;

        let KdBuilder {
            nodes,
            indices,
            mut stats,
            ..
        } = builder;
        stats.node_count = nodes.len();
        stats.index_count = indices.len();
        stats.duplicated_triangles = indices.len() / 3 - tri_count;
        stats.build_time = start.elapsed();
        stats.log(AccelKind::KdTree, heuristic);

        Ok(Self {
            nodes,
            indices,
            heuristic,
            stats,
        })
    }

    #[inline]
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    #[inline]
    pub fn root(&self) -> &KdNode {
        &self.nodes[0]
    }
}

impl AccelerationStructure for KdTree {
    fn kind(&self) -> AccelKind {
        AccelKind::KdTree
    }

    fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn indices(&self) -> &[u32] {
        &self.indices
    }

    fn bounds(&self) -> Aabb {
        self.root().bounds
    }

    fn stats(&self) -> &BuildStats {
        &self.stats
    }

    fn pack_nodes(&self) -> Result<GpuNodes> {
        Ok(GpuNodes::KdTree(pack_kd_nodes(&self.nodes)?))
    }
}

struct KdBuilder<'a> {
    /// Scene index array; triangle `id` is `source[3 * id..3 * id + 3]`.
    source: &'a [u32],
    prim_bounds: Vec<Aabb>,
    nodes: Vec<KdNode>,
    indices: Vec<u32>,
    heuristic: Heuristic,
    max_depth: u32,
    traversal_cost: f32,
    stats: BuildStats,
}

impl KdBuilder<'_> {
    fn build_node(&mut self, node: usize, bounds: Aabb, ids: Vec<u32>, depth: u32) -> Result<()> {
        if depth >= self.max_depth {
            if ids.len() > 1 {
                self.stats.depth_capped_leaves += 1;
            }
            return self.finish_leaf(node, &ids, depth);
        }

        let split = match self.heuristic {
            Heuristic::Primitive => {
                heuristic::midpoint_split(&bounds, ids.len(), KD_PRIMITIVE_LEAF_SIZE)
            }
            Heuristic::Sah => heuristic::sweep_sah_split(
                &ids,
                &self.prim_bounds,
                &bounds,
                self.traversal_cost,
            ),
        };
        let Some(split) = split else {
            return self.finish_leaf(node, &ids, depth);
        };

        let axis = split.axis;
        let position = split.position;
        let mut below_ids = Vec::with_capacity(ids.len());
        let mut above_ids = Vec::with_capacity(ids.len());
        for &id in &ids {
            let b = &self.prim_bounds[id as usize];
            if b.max[axis] < position {
                below_ids.push(id);
            } else if b.min[axis] > position {
                above_ids.push(id);
            } else {
                below_ids.push(id);
                above_ids.push(id);
            }
        }

        let shed_nothing = below_ids.len() == ids.len() && above_ids.len() == ids.len();
        if below_ids.is_empty() || above_ids.is_empty() || shed_nothing {
            tracing::trace!(node, depth, axis, "degenerate split");
            self.stats.degenerate_splits += 1;
            return self.finish_leaf(node, &ids, depth);
        }
        drop(ids);

        let (below, above) = bounds.split(axis, position);
        let first_child = self.nodes.len();
        for child_bounds in [below, above] {
            self.nodes.push(KdNode {
                bounds: child_bounds,
                kind: KdNodeKind::Leaf {
                    first_index: 0,
                    index_count: 0,
                },
            });
        }
        self.nodes[node].kind = KdNodeKind::Internal {
            axis: axis as u8,
            split: position,
            first_child: first_child as u32,
        };

        self.build_node(first_child, below, below_ids, depth + 1)?;
        self.build_node(first_child + 1, above, above_ids, depth + 1)
    }

    /// Emit the vertex indices of `ids` and turn `node` into a leaf over them.
    fn finish_leaf(&mut self, node: usize, ids: &[u32], depth: u32) -> Result<()> {
        let first = self.indices.len();
        let end = first + 3 * ids.len();
        if end > u32::MAX as usize {
            return Err(Error::TooLarge {
                what: "kd-tree indices",
                count: end,
                max: u32::MAX as usize,
            });
        }

        for &id in ids {
            let t = 3 * id as usize;
            self.indices.extend_from_slice(&self.source[t..t + 3]);
        }
        self.nodes[node].kind = KdNodeKind::Leaf {
            first_index: first as u32,
            index_count: (end - first) as u32,
        };
        self.stats.record_leaf(depth);
        Ok(())
    }
}
