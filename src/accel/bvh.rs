//! Bounding volume hierarchy builder.
//!
//! Builds a flat node array over a copy of the scene's index array. Triangles
//! are reordered in place so that every leaf owns one contiguous run of
//! indices; no triangle is duplicated or dropped. Children of an internal
//! node are always stored as an adjacent pair, and node 0 is the root.

use std::time::Instant;

use super::gpu_data::pack_bvh_nodes;
use super::heuristic::{self, Heuristic, PrimitiveRef, BVH_PRIMITIVE_LEAF_SIZE};
use super::{AccelKind, AccelerationStructure, Aabb, BuildStats, GpuNodes, MAX_DEPTH_LIMIT};
use crate::geometry::SceneGeometry;
use crate::util::{Error, Result};

/// What a node holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Index range `[first_index, first_index + index_count)`; `index_count`
    /// counts indices, three per triangle.
    Leaf { first_index: u32, index_count: u32 },
    /// Children live at `first_child` and `first_child + 1`.
    Internal { first_child: u32 },
}

/// Host-side BVH node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub kind: NodeKind,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// Built BVH.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    /// Scene indices reordered so leaves reference contiguous runs.
    indices: Vec<u32>,
    heuristic: Heuristic,
    stats: BuildStats,
}

impl Bvh {
    /// Build a BVH over every triangle of `geometry`.
    ///
    /// `max_depth` is clamped to [`MAX_DEPTH_LIMIT`]; a node at that depth
    /// stays a leaf no matter how many triangles it holds.
    #[tracing::instrument(skip_all, fields(tri_count = geometry.triangle_count(), heuristic = heuristic.label()))]
    pub fn build(geometry: &SceneGeometry, heuristic: Heuristic, max_depth: u32) -> Result<Self> {
        if geometry.is_empty() {
            return Err(Error::EmptyGeometry);
        }
        let start = Instant::now();

        let tri_count = geometry.triangle_count();
        let cache: Vec<PrimitiveRef> = (0..tri_count)
            .map(|t| PrimitiveRef::from_triangle(geometry.triangle_at(3 * t)))
            .collect();

        let mut builder = BvhBuilder {
            indices: geometry.indices().to_vec(),
            cache,
            // A full binary tree over n leaves has 2n - 1 nodes.
            nodes: Vec::with_capacity(2 * tri_count),
            heuristic,
            max_depth: max_depth.min(MAX_DEPTH_LIMIT),
            stats: BuildStats::default(),
        };

        let root = builder.insert_node(0, tri_count);
        builder.subdivide(root, 0);

        let BvhBuilder {
            nodes,
            indices,
            mut stats,
            ..
        } = builder;
        stats.node_count = nodes.len();
        stats.index_count = indices.len();
        stats.build_time = start.elapsed();
        stats.log(AccelKind::Bvh, heuristic);

        Ok(Self {
            nodes,
            indices,
            heuristic,
            stats,
        })
    }

    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    #[inline]
    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }
}

impl AccelerationStructure for Bvh {
    fn kind(&self) -> AccelKind {
        AccelKind::Bvh
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
        Ok(GpuNodes::Bvh(pack_bvh_nodes(&self.nodes)?))
    }
}

struct BvhBuilder {
    indices: Vec<u32>,
    /// One entry per triangle, kept in the same order as `indices`.
    cache: Vec<PrimitiveRef>,
    nodes: Vec<BvhNode>,
    heuristic: Heuristic,
    max_depth: u32,
    stats: BuildStats,
}

impl BvhBuilder {
    /// Append a leaf covering `count` triangles starting at triangle `first`.
    fn insert_node(&mut self, first: usize, count: usize) -> usize {
        let mut bounds = Aabb::EMPTY;
        for p in &self.cache[first..first + count] {
            bounds.expand(&p.bounds);
        }
        self.nodes.push(BvhNode {
            bounds,
            kind: NodeKind::Leaf {
                first_index: (3 * first) as u32,
                index_count: (3 * count) as u32,
            },
        });
        self.nodes.len() - 1
    }

    /// Try to split a leaf; recurses into the children when it does.
    fn subdivide(&mut self, node: usize, depth: u32) {
        let NodeKind::Leaf {
            first_index,
            index_count,
        } = self.nodes[node].kind
        else {
            return;
        };
        let first = first_index as usize / 3;
        let count = index_count as usize / 3;

        if count <= 1 {
            self.stats.record_leaf(depth);
            return;
        }
        if depth >= self.max_depth {
            self.stats.depth_capped_leaves += 1;
            self.stats.record_leaf(depth);
            return;
        }

        let bounds = self.nodes[node].bounds;
        let split = match self.heuristic {
            Heuristic::Primitive => {
                heuristic::midpoint_split(&bounds, count, BVH_PRIMITIVE_LEAF_SIZE)
            }
            Heuristic::Sah => {
                heuristic::binned_sah_split(&self.cache[first..first + count], &bounds)
            }
        };
        let Some(split) = split else {
            self.stats.record_leaf(depth);
            return;
        };

        let left_count = self.partition(first, count, split.axis, split.position);
        if left_count == 0 || left_count == count {
            tracing::trace!(node, depth, axis = split.axis, "degenerate partition");
            self.stats.degenerate_splits += 1;
            self.stats.record_leaf(depth);
            return;
        }

        let left = self.insert_node(first, left_count);
        let right = self.insert_node(first + left_count, count - left_count);
        debug_assert_eq!(right, left + 1);
        self.nodes[node].kind = NodeKind::Internal {
            first_child: left as u32,
        };

        self.subdivide(left, depth + 1);
        self.subdivide(right, depth + 1);
    }

    /// Hoare-style partition of triangles `[first, first + count)`: centroids
    /// below `position` on `axis` move to the front. Returns the size of the
    /// front part.
    fn partition(&mut self, first: usize, count: usize, axis: usize, position: f32) -> usize {
        let mut i = first;
        let mut j = first + count;
        while i < j {
            if self.cache[i].centroid[axis] < position {
                i += 1;
            } else {
                j -= 1;
                self.swap_triangles(i, j);
            }
        }
        i - first
    }

    /// Swap two triangles along with their cache entries.
    #[inline]
    fn swap_triangles(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.cache.swap(a, b);
        for k in 0..3 {
            self.indices.swap(3 * a + k, 3 * b + k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{procedural, Mesh, Vertex};
    use glam::Vec3;

    fn geometry(meshes: &[Mesh]) -> SceneGeometry {
        SceneGeometry::from_meshes(meshes).unwrap()
    }

    fn leaves(bvh: &Bvh) -> Vec<(u32, u32)> {
        bvh.nodes()
            .iter()
            .filter_map(|n| match n.kind {
                NodeKind::Leaf {
                    first_index,
                    index_count,
                } => Some((first_index, index_count)),
                NodeKind::Internal { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_is_rejected() {
        let err = Bvh::build(&SceneGeometry::default(), Heuristic::Sah, 32).unwrap_err();
        assert!(matches!(err, Error::EmptyGeometry));
    }

    #[test]
    fn test_single_triangle() {
        let mesh = Mesh::new(
            vec![
                Vertex::at(Vec3::ZERO),
                Vertex::at(Vec3::X),
                Vertex::at(Vec3::Y),
            ],
            vec![0, 1, 2],
        );
        for heuristic in [Heuristic::Primitive, Heuristic::Sah] {
            let bvh = Bvh::build(&geometry(&[mesh.clone()]), heuristic, 64).unwrap();
            assert_eq!(bvh.node_count(), 1);
            assert_eq!(
                bvh.root().kind,
                NodeKind::Leaf {
                    first_index: 0,
                    index_count: 3
                }
            );
            assert_eq!(bvh.indices(), &[0, 1, 2]);
        }
    }

    #[test]
    fn test_small_input_stays_leaf() {
        let geo = geometry(&[procedural::sorted_row(BVH_PRIMITIVE_LEAF_SIZE, 2.0)]);
        let bvh = Bvh::build(&geo, Heuristic::Primitive, 64).unwrap();
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.stats().leaf_count, 1);
    }

    #[test]
    fn test_sorted_row_builds_tree() {
        let geo = geometry(&[procedural::sorted_row(100, 2.0)]);
        let bvh = Bvh::build(&geo, Heuristic::Primitive, 64).unwrap();
        assert!(bvh.node_count() > 1);

        // Leaves are contiguous and together cover the whole index array.
        let mut ranges = leaves(&bvh);
        ranges.sort();
        let mut next = 0;
        for (first, count) in ranges {
            assert_eq!(first, next);
            assert!(count > 0 && count % 3 == 0);
            next = first + count;
        }
        assert_eq!(next as usize, geo.indices().len());

        let mut sorted = bvh.indices().to_vec();
        sorted.sort();
        let mut expected = geo.indices().to_vec();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_children_are_adjacent_and_contained() {
        let geo = geometry(&[procedural::scatter(300, 100.0, 0.5, 3)]);
        let bvh = Bvh::build(&geo, Heuristic::Sah, 32).unwrap();
        for node in bvh.nodes() {
            if let NodeKind::Internal { first_child } = node.kind {
                let c = first_child as usize;
                assert!(c + 1 < bvh.node_count());
                assert!(node.bounds.contains(&bvh.nodes()[c].bounds));
                assert!(node.bounds.contains(&bvh.nodes()[c + 1].bounds));
            }
        }
        assert_eq!(bvh.bounds(), geo.bounds());
    }

    #[test]
    fn test_depth_cap() {
        let geo = geometry(&[procedural::sorted_row(200, 2.0)]);
        let bvh = Bvh::build(&geo, Heuristic::Primitive, 1).unwrap();
        // Root split once, both children stopped by the cap.
        assert_eq!(bvh.node_count(), 3);
        assert_eq!(bvh.stats().depth_capped_leaves, 2);
        assert_eq!(bvh.stats().max_depth, 1);
    }

    #[test]
    fn test_coincident_triangles_degenerate() {
        let geo = geometry(&[procedural::coincident(50)]);
        let bvh = Bvh::build(&geo, Heuristic::Primitive, 64).unwrap();
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.stats().degenerate_splits, 1);

        // SAH refuses outright: no centroid extent on any axis.
        let bvh = Bvh::build(&geo, Heuristic::Sah, 32).unwrap();
        assert_eq!(bvh.node_count(), 1);
        assert_eq!(bvh.stats().degenerate_splits, 0);
    }

    #[test]
    fn test_pack_nodes() {
        let geo = geometry(&[procedural::sorted_row(40, 2.0)]);
        let bvh = Bvh::build(&geo, Heuristic::Primitive, 64).unwrap();
        let packed = bvh.pack_nodes().unwrap();
        assert_eq!(packed.len(), bvh.node_count());
        assert_eq!(packed.as_bytes().len(), 48 * bvh.node_count());
    }
}
