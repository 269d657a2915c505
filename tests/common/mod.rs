//! Tree walkers and structural checks shared by the integration tests.

#![allow(dead_code)]

use tracer_accel::accel::{Aabb, Bvh, KdNodeKind, KdTree, NodeKind};
use tracer_accel::geometry::{procedural, Mesh, SceneGeometry};

/// A leaf reached from the root.
#[derive(Debug, Clone, Copy)]
pub struct Leaf {
    pub first_index: u32,
    pub index_count: u32,
    pub depth: u32,
    pub bounds: Aabb,
}

impl Leaf {
    pub fn triangle_count(&self) -> usize {
        self.index_count as usize / 3
    }

    pub fn triangles<'a>(&self, indices: &'a [u32]) -> impl Iterator<Item = [u32; 3]> + 'a {
        let start = self.first_index as usize;
        let end = start + self.index_count as usize;
        indices[start..end].chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

pub fn geometry(meshes: &[Mesh]) -> SceneGeometry {
    SceneGeometry::from_meshes(meshes).expect("valid meshes")
}

/// `count` scattered small triangles inside `[0, 100]^3`.
pub fn scattered(count: usize, seed: u64) -> SceneGeometry {
    geometry(&[procedural::scatter(count, 100.0, 0.05, seed)])
}

/// Two groups of 50 identical triangles, one near x = 0 and one near x = 100.
pub fn two_clusters() -> SceneGeometry {
    let near = procedural::coincident(50);
    let mut far = procedural::coincident(50);
    for v in &mut far.vertices {
        v.position[0] += 100.0;
    }
    geometry(&[near, far])
}

/// Triangles of `indices` as sorted index triples.
pub fn triangle_multiset(indices: &[u32]) -> Vec<[u32; 3]> {
    let mut tris: Vec<[u32; 3]> = indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
    tris.sort_unstable();
    tris
}

/// Walk a BVH from the root, checking every internal node on the way.
///
/// Panics if a child index is out of range, a node is reached twice, a node
/// is unreachable, or a child box escapes its parent.
pub fn bvh_leaves(bvh: &Bvh) -> Vec<Leaf> {
    let nodes = bvh.nodes();
    let mut visited = vec![false; nodes.len()];
    let mut leaves = Vec::new();
    let mut stack = vec![(0usize, 0u32)];

    while let Some((idx, depth)) = stack.pop() {
        assert!(idx < nodes.len(), "node {idx} out of range");
        assert!(!visited[idx], "node {idx} reached twice");
        visited[idx] = true;

        let node = &nodes[idx];
        match node.kind {
            NodeKind::Leaf {
                first_index,
                index_count,
            } => leaves.push(Leaf {
                first_index,
                index_count,
                depth,
                bounds: node.bounds,
            }),
            NodeKind::Internal { first_child } => {
                let c = first_child as usize;
                assert!(c + 1 < nodes.len(), "children of {idx} out of range");
                for child in [c, c + 1] {
                    assert!(
                        node.bounds.contains(&nodes[child].bounds),
                        "child {child} escapes parent {idx}"
                    );
                    stack.push((child, depth + 1));
                }
            }
        }
    }

    assert!(visited.iter().all(|&v| v), "unreachable nodes");
    leaves
}

/// Walk a Kd-tree from the root, checking split planes and child boxes.
pub fn kd_leaves(kd: &KdTree) -> Vec<Leaf> {
    let nodes = kd.nodes();
    let mut visited = vec![false; nodes.len()];
    let mut leaves = Vec::new();
    let mut stack = vec![(0usize, 0u32)];

    while let Some((idx, depth)) = stack.pop() {
        assert!(idx < nodes.len(), "node {idx} out of range");
        assert!(!visited[idx], "node {idx} reached twice");
        visited[idx] = true;

        let node = &nodes[idx];
        match node.kind {
            KdNodeKind::Leaf {
                first_index,
                index_count,
            } => leaves.push(Leaf {
                first_index,
                index_count,
                depth,
                bounds: node.bounds,
            }),
            KdNodeKind::Internal {
                axis,
                split,
                first_child,
            } => {
                assert!(axis < 3);
                assert!(split > node.bounds.min[axis as usize]);
                assert!(split < node.bounds.max[axis as usize]);
                let c = first_child as usize;
                assert!(c + 1 < nodes.len(), "children of {idx} out of range");
                for child in [c, c + 1] {
                    assert!(node.bounds.contains(&nodes[child].bounds));
                    stack.push((child, depth + 1));
                }
            }
        }
    }

    assert!(visited.iter().all(|&v| v), "unreachable nodes");
    leaves
}

/// Every leaf range lies inside `index_len` and holds whole triangles.
pub fn assert_leaf_ranges(leaves: &[Leaf], index_len: usize) {
    for leaf in leaves {
        assert_eq!(leaf.index_count % 3, 0, "partial triangle in {leaf:?}");
        assert!(
            leaf.first_index as usize + leaf.index_count as usize <= index_len,
            "leaf range past index array: {leaf:?}"
        );
    }
}
