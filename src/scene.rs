//! Scene: owns the input meshes and the structure built over them.
//!
//! A build is all-or-nothing. [`Scene::build`] first drops the previous
//! result, then installs the new one only if every step succeeded, packing
//! included, so a failed build leaves the scene unloaded and ready for
//! another attempt.

use crate::accel::{AccelKind, AccelerationStructure, Aabb, Bvh, GpuSceneData, KdTree};
use crate::geometry::{Mesh, SceneGeometry};
use crate::settings::AccelSettings;
use crate::util::{Error, Result};

/// Geometry plus the structure built over it.
pub struct LoadedScene {
    geometry: SceneGeometry,
    accel: Option<Box<dyn AccelerationStructure>>,
    packed: GpuSceneData,
    settings: AccelSettings,
}

impl LoadedScene {
    #[inline]
    pub fn geometry(&self) -> &SceneGeometry {
        &self.geometry
    }

    /// `None` when built with [`AccelKind::None`].
    pub fn accel(&self) -> Option<&dyn AccelerationStructure> {
        self.accel.as_deref()
    }

    pub fn settings(&self) -> &AccelSettings {
        &self.settings
    }

    /// Scene bounds; the root bounds of the structure when there is one.
    pub fn bounds(&self) -> Aabb {
        match &self.accel {
            Some(accel) => accel.bounds(),
            None => self.geometry.bounds(),
        }
    }

    /// Index buffer the kernel walks: leaf order, or scene order without a
    /// structure.
    pub fn indices(&self) -> &[u32] {
        match &self.accel {
            Some(accel) => accel.indices(),
            None => self.geometry.indices(),
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices().len() as u32
    }

    pub fn node_count(&self) -> usize {
        self.accel.as_ref().map_or(0, |a| a.node_count())
    }

    /// Node and index buffers ready for upload, packed during the build.
    #[inline]
    pub fn packed(&self) -> &GpuSceneData {
        &self.packed
    }
}

/// Meshes waiting to be built, and the current build result.
#[derive(Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    loaded: Option<LoadedScene>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meshes(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            loaded: None,
        }
    }

    /// Add a mesh. Invalidates the current build.
    pub fn add_mesh(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
        self.loaded = None;
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Drop the current build, e.g. after the settings changed.
    pub fn invalidate(&mut self) {
        self.loaded = None;
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded(&self) -> Option<&LoadedScene> {
        self.loaded.as_ref()
    }

    /// Flatten the meshes and build the configured structure.
    #[tracing::instrument(skip_all, fields(structure = settings.structure.label(), heuristic = settings.heuristic.label()))]
    pub fn build(&mut self, settings: &AccelSettings) -> Result<&LoadedScene> {
        self.loaded = None;
        settings.validate()?;

        let geometry = SceneGeometry::from_meshes(&self.meshes)?;
        if geometry.is_empty() {
            return Err(Error::EmptyGeometry);
        }

        let max_depth = settings.max_depth();
        let accel: Option<Box<dyn AccelerationStructure>> = match settings.structure {
            AccelKind::Bvh => Some(Box::new(Bvh::build(
                &geometry,
                settings.heuristic,
                max_depth,
            )?)),
            AccelKind::KdTree => Some(Box::new(KdTree::build(
                &geometry,
                settings.heuristic,
                max_depth,
                settings.kd_traversal_cost,
            )?)),
            AccelKind::None => {
                tracing::info!(triangles = geometry.triangle_count(), "no acceleration structure");
                None
            }
        };

        let packed = match &accel {
            Some(accel) => GpuSceneData::from_structure(accel.as_ref())?,
            None => GpuSceneData::unaccelerated(&geometry)?,
        };

        Ok(&*self.loaded.insert(LoadedScene {
            geometry,
            accel,
            packed,
            settings: settings.clone(),
        }))
    }
}
