//! Device upload of packed scene buffers (feature `gpu`).
//!
//! ```ignore
//! let loaded = scene.build(&settings)?;
//! let packed = loaded.packed();
//! let buffers = DeviceBuffers::upload(&device, packed, loaded.geometry().vertices_bytes())?;
//! // bind buffers.nodes / buffers.indices / buffers.vertices as read-only storage
//! ```

use wgpu::util::DeviceExt;

use super::{AccelKind, GpuSceneData};
use crate::util::{Error, Result};

/// Read-only storage buffers for the traversal kernel.
pub struct DeviceBuffers {
    pub kind: AccelKind,
    pub nodes: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub vertices: wgpu::Buffer,
    pub node_count: u32,
    pub index_count: u32,
}

impl DeviceBuffers {
    /// Create the node, index and vertex buffers.
    ///
    /// Empty inputs get a small zeroed buffer (wgpu rejects zero-sized
    /// bindings); `node_count` and `index_count` still report zero.
    #[tracing::instrument(skip_all, fields(kind = data.kind.label()))]
    pub fn upload(device: &wgpu::Device, data: &GpuSceneData, vertices: &[u8]) -> Result<Self> {
        let nodes = create_storage(device, "accel_nodes", data.nodes_bytes())?;
        let indices = create_storage(device, "accel_indices", data.indices_bytes())?;
        let vertices = create_storage(device, "accel_vertices", vertices)?;

        tracing::debug!(
            node_bytes = data.nodes_bytes().len(),
            index_bytes = data.indices_bytes().len(),
            "uploaded scene buffers"
        );

        Ok(Self {
            kind: data.kind,
            nodes,
            indices,
            vertices,
            node_count: data.nodes.len() as u32,
            index_count: data.index_count,
        })
    }
}

/// STORAGE buffer initialised from `bytes`, with out-of-memory reported as
/// [`Error::DeviceAllocation`].
fn create_storage(device: &wgpu::Device, what: &'static str, bytes: &[u8]) -> Result<wgpu::Buffer> {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(what),
        contents: if bytes.is_empty() { &[0u8; 16] } else { bytes },
        usage: wgpu::BufferUsages::STORAGE,
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(Error::DeviceAllocation {
            what,
            message: err.to_string(),
        });
    }
    Ok(buffer)
}
