//! Serialize acceleration structures into GPU storage-buffer records.
//!
//! Host nodes are tagged enums; the GPU wants a single fixed-stride record
//! whose `next_index` means "first index" for leaves and "first child" for
//! internal nodes. Flattening happens here and nowhere else.

use bytemuck::{Pod, Zeroable};

use super::bvh::{BvhNode, NodeKind};
use super::kdtree::{KdNode, KdNodeKind};
use super::{AccelKind, AccelerationStructure, Aabb};
use crate::geometry::SceneGeometry;
use crate::util::{Error, Result};

/// `flags` value marking a Kd leaf. Internal nodes store their axis (0..=2).
pub const KD_LEAF_FLAG: u32 = 3;

/// GPU BVH node (48 bytes, std430).
///
/// `triangle_count` counts indices; zero marks an internal node whose
/// children are `next_index` and `next_index + 1`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub aabb_min: [f32; 3],
    pub _pad0: u32,
    pub aabb_max: [f32; 3],
    pub next_index: u32,
    pub triangle_count: u32,
    pub _pad1: [u32; 3],
}

impl From<&BvhNode> for GpuBvhNode {
    fn from(node: &BvhNode) -> Self {
        let (next_index, triangle_count) = match node.kind {
            NodeKind::Leaf {
                first_index,
                index_count,
            } => (first_index, index_count),
            NodeKind::Internal { first_child } => (first_child, 0),
        };
        Self {
            aabb_min: node.bounds.min.to_array(),
            _pad0: 0,
            aabb_max: node.bounds.max.to_array(),
            next_index,
            triangle_count,
            _pad1: [0; 3],
        }
    }
}

/// GPU Kd node (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuKdNode {
    /// Split axis, or [`KD_LEAF_FLAG`].
    pub flags: u32,
    pub split_position: f32,
    pub next_index: u32,
    /// Leaf only.
    pub index_count: u32,
}

impl From<&KdNode> for GpuKdNode {
    fn from(node: &KdNode) -> Self {
        match node.kind {
            KdNodeKind::Leaf {
                first_index,
                index_count,
            } => Self {
                flags: KD_LEAF_FLAG,
                split_position: 0.0,
                next_index: first_index,
                index_count,
            },
            KdNodeKind::Internal {
                axis,
                split,
                first_child,
            } => Self {
                flags: axis as u32,
                split_position: split,
                next_index: first_child,
                index_count: 0,
            },
        }
    }
}

/// Packed node buffer of either structure.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuNodes {
    Bvh(Vec<GpuBvhNode>),
    KdTree(Vec<GpuKdNode>),
    /// No accelerator; the shader tests every triangle.
    None,
}

impl GpuNodes {
    pub fn len(&self) -> usize {
        match self {
            Self::Bvh(nodes) => nodes.len(),
            Self::KdTree(nodes) => nodes.len(),
            Self::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record size in bytes (0 when there are no nodes).
    pub fn stride(&self) -> usize {
        match self {
            Self::Bvh(_) => std::mem::size_of::<GpuBvhNode>(),
            Self::KdTree(_) => std::mem::size_of::<GpuKdNode>(),
            Self::None => 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Bvh(nodes) => bytemuck::cast_slice(nodes),
            Self::KdTree(nodes) => bytemuck::cast_slice(nodes),
            Self::None => &[],
        }
    }
}

/// Everything the traversal kernel needs besides the vertex buffer.
#[derive(Debug, Clone)]
pub struct GpuSceneData {
    pub kind: AccelKind,
    pub nodes: GpuNodes,
    /// Index buffer in leaf order (or scene order without an accelerator).
    pub indices: Vec<u32>,
    pub index_count: u32,
    pub aabb_min: [f32; 3],
    pub aabb_max: [f32; 3],
}

impl GpuSceneData {
    /// Pack a built structure.
    #[tracing::instrument(skip_all, fields(kind = accel.kind().label()))]
    pub fn from_structure(accel: &dyn AccelerationStructure) -> Result<Self> {
        let nodes = accel.pack_nodes()?;
        let indices = copy_to_staging(accel.indices(), "index buffer")?;
        let bounds = accel.bounds();
        tracing::debug!(
            nodes = nodes.len(),
            node_bytes = nodes.as_bytes().len(),
            indices = indices.len(),
            "packed scene buffers"
        );
        Ok(Self {
            kind: accel.kind(),
            nodes,
            index_count: accel.index_count(),
            indices,
            aabb_min: bounds.min.to_array(),
            aabb_max: bounds.max.to_array(),
        })
    }

    /// Raw scene indices, no nodes.
    pub fn unaccelerated(geometry: &SceneGeometry) -> Result<Self> {
        let indices = copy_to_staging(geometry.indices(), "index buffer")?;
        let bounds = geometry.bounds();
        Ok(Self {
            kind: AccelKind::None,
            nodes: GpuNodes::None,
            index_count: indices.len() as u32,
            indices,
            aabb_min: bounds.min.to_array(),
            aabb_max: bounds.max.to_array(),
        })
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.aabb_min.into(), self.aabb_max.into())
    }

    /// Node records as bytes.
    pub fn nodes_bytes(&self) -> &[u8] {
        self.nodes.as_bytes()
    }

    /// Index data as bytes.
    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn node_stride(&self) -> usize {
        self.nodes.stride()
    }
}

/// Reserve exactly `len` records, surfacing allocation failure as an error.
fn staging_vec<T>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len).map_err(|_| Error::HostAllocation {
        what,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    Ok(out)
}

fn copy_to_staging<T: Copy>(src: &[T], what: &'static str) -> Result<Vec<T>> {
    let mut out = staging_vec(src.len(), what)?;
    out.extend_from_slice(src);
    Ok(out)
}

pub(crate) fn pack_bvh_nodes(nodes: &[BvhNode]) -> Result<Vec<GpuBvhNode>> {
    let mut out = staging_vec(nodes.len(), "BVH node buffer")?;
    out.extend(nodes.iter().map(GpuBvhNode::from));
    Ok(out)
}

pub(crate) fn pack_kd_nodes(nodes: &[KdNode]) -> Result<Vec<GpuKdNode>> {
    let mut out = staging_vec(nodes.len(), "Kd node buffer")?;
    out.extend(nodes.iter().map(GpuKdNode::from));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_bvh_node_layout() {
        assert_eq!(size_of::<GpuBvhNode>(), 48);
        assert_eq!(offset_of!(GpuBvhNode, aabb_min), 0);
        assert_eq!(offset_of!(GpuBvhNode, aabb_max), 16);
        assert_eq!(offset_of!(GpuBvhNode, next_index), 28);
        assert_eq!(offset_of!(GpuBvhNode, triangle_count), 32);
    }

    #[test]
    fn test_kd_node_layout() {
        assert_eq!(size_of::<GpuKdNode>(), 16);
        assert_eq!(offset_of!(GpuKdNode, flags), 0);
        assert_eq!(offset_of!(GpuKdNode, split_position), 4);
        assert_eq!(offset_of!(GpuKdNode, next_index), 8);
        assert_eq!(offset_of!(GpuKdNode, index_count), 12);
    }

    #[test]
    fn test_flatten_bvh() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let leaf = GpuBvhNode::from(&BvhNode {
            bounds,
            kind: NodeKind::Leaf {
                first_index: 6,
                index_count: 9,
            },
        });
        assert_eq!((leaf.next_index, leaf.triangle_count), (6, 9));
        assert_eq!(leaf.aabb_max, [1.0; 3]);

        let inner = GpuBvhNode::from(&BvhNode {
            bounds,
            kind: NodeKind::Internal { first_child: 1 },
        });
        assert_eq!((inner.next_index, inner.triangle_count), (1, 0));
    }

    #[test]
    fn test_flatten_kd() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let leaf = GpuKdNode::from(&KdNode {
            bounds,
            kind: KdNodeKind::Leaf {
                first_index: 3,
                index_count: 12,
            },
        });
        assert_eq!(leaf.flags, KD_LEAF_FLAG);
        assert_eq!((leaf.next_index, leaf.index_count), (3, 12));

        let inner = GpuKdNode::from(&KdNode {
            bounds,
            kind: KdNodeKind::Internal {
                axis: 2,
                split: 0.25,
                first_child: 5,
            },
        });
        assert_eq!(inner.flags, 2);
        assert_eq!(inner.split_position, 0.25);
        assert_eq!((inner.next_index, inner.index_count), (5, 0));
    }

    #[test]
    fn test_gpu_nodes_bytes() {
        let nodes = GpuNodes::KdTree(vec![GpuKdNode::default(); 3]);
        assert_eq!(nodes.as_bytes().len(), 48);
        assert_eq!(nodes.stride(), 16);
        assert!(GpuNodes::None.is_empty());
        assert_eq!(GpuNodes::None.as_bytes().len(), 0);
    }

    #[test]
    fn test_staging_overflow_is_error() {
        let err = staging_vec::<GpuBvhNode>(usize::MAX / 2, "test buffer").unwrap_err();
        assert!(matches!(err, Error::HostAllocation { what: "test buffer", .. }));
    }
}
