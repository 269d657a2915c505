//! # tracer-accel
//!
//! CPU-side acceleration-structure builders for GPU ray tracing.
//!
//! A [`Scene`] flattens its meshes into one vertex array and one triangle
//! index array, builds a BVH or a Kd-tree over them, and packs the result
//! into fixed-stride node and index buffers a compute kernel can walk.
//!
//! ## Modules
//!
//! - [`util`] - Errors
//! - [`geometry`] - Vertex records, mesh intake, procedural meshes
//! - [`accel`] - AABB math, split heuristics, BVH and Kd-tree builders, GPU packing
//! - [`settings`] - Build configuration (JSON)
//! - [`scene`] - Scene ownership and atomic builds
//!
//! ## Example
//!
//! ```ignore
//! use tracer_accel::prelude::*;
//!
//! let mut scene = Scene::with_meshes(vec![procedural::scatter(1000, 100.0, 0.5, 7)]);
//! let loaded = scene.build(&AccelSettings::new(AccelKind::Bvh, Heuristic::Sah))?;
//! let packed = loaded.packed();
//! upload(packed.nodes_bytes(), packed.indices_bytes());
//! ```

pub mod util;
pub mod geometry;
pub mod accel;
pub mod settings;
pub mod scene;

// Re-export commonly used types
pub use util::{Error, Result};
pub use scene::{LoadedScene, Scene};
pub use settings::AccelSettings;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::geometry::{procedural, Mesh, SceneGeometry, Vertex};
    pub use crate::accel::{
        AccelKind, AccelerationStructure, Aabb, BuildStats, Bvh, GpuSceneData, Heuristic, KdTree,
    };
    pub use crate::settings::AccelSettings;
    pub use crate::scene::{LoadedScene, Scene};
}
