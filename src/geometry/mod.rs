//! Geometry intake: flattens meshes into one vertex array and one index array.
//!
//! The builders only ever see a [`SceneGeometry`]: a flat [`Vertex`] slice and
//! a flat `u32` index slice grouped in runs of three, one run per triangle.

pub mod procedural;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::accel::Aabb;
use crate::util::{Error, Result};

/// GPU vertex record (48 bytes, std430 layout).
///
/// `position` and `normal` are 16-byte aligned vec3s; `uv` sits at 32 and
/// the material tag at 40.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub _pad0: u32,
    pub normal: [f32; 3],
    pub _pad1: u32,
    pub uv: [f32; 2],
    pub material: u32,
    pub _pad2: u32,
}

impl Vertex {
    /// Vertex with material tag 1 (the default mesh material).
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            _pad0: 0,
            normal: normal.to_array(),
            _pad1: 0,
            uv: uv.to_array(),
            material: 1,
            _pad2: 0,
        }
    }

    /// Vertex with only a position; normal points up +Z.
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::Z, Vec2::ZERO)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// A single mesh as produced by a model loader.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Overwrite the material tag of every vertex.
    pub fn with_material(mut self, material: u32) -> Self {
        for v in &mut self.vertices {
            v.material = material;
        }
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Flat scene geometry handed to the acceleration-structure builders.
///
/// Invariants (checked by [`SceneGeometry::new`]): the index count is a
/// multiple of 3 and every index addresses an existing vertex.
#[derive(Debug, Clone, Default)]
pub struct SceneGeometry {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl SceneGeometry {
    /// Validate and wrap flat arrays.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(Error::IndexCountNotTriangles(indices.len()));
        }
        if vertices.len() > u32::MAX as usize {
            return Err(Error::TooLarge {
                what: "vertices",
                count: vertices.len(),
                max: u32::MAX as usize,
            });
        }
        if indices.len() > u32::MAX as usize {
            return Err(Error::TooLarge {
                what: "indices",
                count: indices.len(),
                max: u32::MAX as usize,
            });
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(Error::IndexOutOfRange {
                index,
                vertex_count: vertices.len(),
            });
        }
        Ok(Self { vertices, indices })
    }

    /// Concatenate meshes, rebasing each mesh's indices onto the shared
    /// vertex array.
    #[tracing::instrument(skip_all, fields(mesh_count = meshes.len()))]
    pub fn from_meshes(meshes: &[Mesh]) -> Result<Self> {
        let vertex_total: usize = meshes.iter().map(|m| m.vertices.len()).sum();
        let index_total: usize = meshes.iter().map(|m| m.indices.len()).sum();

        let mut vertices = Vec::with_capacity(vertex_total);
        let mut indices = Vec::with_capacity(index_total);

        for mesh in meshes {
            if mesh.indices.len() % 3 != 0 {
                return Err(Error::IndexCountNotTriangles(mesh.indices.len()));
            }
            if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= mesh.vertices.len()) {
                return Err(Error::IndexOutOfRange {
                    index,
                    vertex_count: mesh.vertices.len(),
                });
            }
            let offset = vertices.len() as u32;
            vertices.extend_from_slice(&mesh.vertices);
            indices.extend(mesh.indices.iter().map(|&i| i + offset));
        }

        tracing::debug!(
            vertices = vertices.len(),
            triangles = indices.len() / 3,
            "flattened scene geometry"
        );
        Self::new(vertices, indices)
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions of the triangle whose run starts at index offset `first`.
    #[inline]
    pub fn triangle_at(&self, first: usize) -> [Vec3; 3] {
        [
            self.vertices[self.indices[first] as usize].position(),
            self.vertices[self.indices[first + 1] as usize].position(),
            self.vertices[self.indices[first + 2] as usize].position(),
        ]
    }

    /// Bounds of every vertex referenced by a triangle.
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for &i in &self.indices {
            bounds.expand_point(self.vertices[i as usize].position());
        }
        bounds
    }

    /// Vertex data as bytes for upload.
    pub fn vertices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
