use bytemuck::Pod;
use log::debug;

use super::geometry::Vertex;
use crate::error::{AssetError, PoolKind};
use crate::gpu::{BufferDescriptor, BufferId, BufferUsage, GpuDevice};

/// Where one primitive lives inside the mega-buffers. Offsets and counts
/// are in elements (vertices, indices), not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PooledPrimitive {
    pub vertex_count: u32,
    pub vertex_offset: u32,
    pub index_count: u32,
    pub index_offset: u32,
}

/// One fixed-size GPU buffer filled front to back. The cursor only moves
/// forward; space is never reused.
pub struct MegaBuffer {
    kind: PoolKind,
    buffer: BufferId,
    element_size: u64,
    capacity: u64,
    cursor: u64,
}

impl MegaBuffer {
    pub fn new<D: GpuDevice>(
        device: &mut D,
        kind: PoolKind,
        usage: BufferUsage,
        element_size: u64,
        capacity_bytes: u64,
    ) -> Self {
        let capacity = (capacity_bytes / element_size).min(u32::MAX as u64);
        let buffer = device.create_buffer(&BufferDescriptor {
            label: match kind {
                PoolKind::Vertex => "mega vertex buffer",
                PoolKind::Index => "mega index buffer",
                PoolKind::Material => "material table",
                PoolKind::Object => "object table",
            },
            size: capacity * element_size,
            usage,
        });
        Self {
            kind,
            buffer,
            element_size,
            capacity,
            cursor: 0,
        }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Elements written so far.
    pub fn cursor(&self) -> u32 {
        self.cursor as u32
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn remaining(&self) -> u64 {
        self.capacity - self.cursor
    }

    pub fn check(&self, count: u64) -> Result<(), AssetError> {
        if count > self.remaining() {
            return Err(AssetError::PoolExhausted {
                pool: self.kind,
                requested: count,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Writes `data` at the cursor and returns the element offset it landed at.
    pub fn append<D: GpuDevice, T: Pod>(&mut self, device: &mut D, data: &[T]) -> Result<u32, AssetError> {
        debug_assert_eq!(std::mem::size_of::<T>() as u64, self.element_size);
        self.check(data.len() as u64)?;
        let offset = self.cursor;
        if !data.is_empty() {
            device.write_buffer(self.buffer, offset * self.element_size, bytemuck::cast_slice(data));
        }
        self.cursor += data.len() as u64;
        Ok(offset as u32)
    }
}

/// The shared vertex and index mega-buffers.
pub struct GeometryPool {
    vertices: MegaBuffer,
    indices: MegaBuffer,
}

impl GeometryPool {
    pub fn new<D: GpuDevice>(device: &mut D, vertex_bytes: u64, index_bytes: u64) -> Self {
        Self {
            vertices: MegaBuffer::new(
                device,
                PoolKind::Vertex,
                BufferUsage::Vertex,
                std::mem::size_of::<Vertex>() as u64,
                vertex_bytes,
            ),
            indices: MegaBuffer::new(
                device,
                PoolKind::Index,
                BufferUsage::Index,
                std::mem::size_of::<u32>() as u64,
                index_bytes,
            ),
        }
    }

    pub fn can_fit(&self, vertex_count: u64, index_count: u64) -> Result<(), AssetError> {
        self.vertices.check(vertex_count)?;
        self.indices.check(index_count)
    }

    pub fn allocate<D: GpuDevice>(
        &mut self,
        device: &mut D,
        vertices: &[Vertex],
        indices: &[u32],
    ) -> Result<PooledPrimitive, AssetError> {
        self.can_fit(vertices.len() as u64, indices.len() as u64)?;
        let vertex_offset = self.vertices.append(device, vertices)?;
        let index_offset = self.indices.append(device, indices)?;
        let pooled = PooledPrimitive {
            vertex_count: vertices.len() as u32,
            vertex_offset,
            index_count: indices.len() as u32,
            index_offset,
        };
        debug!("pooled primitive {:?}", pooled);
        Ok(pooled)
    }

    /// `(vertex cursor, index cursor)`.
    pub fn cursors(&self) -> (u32, u32) {
        (self.vertices.cursor(), self.indices.cursor())
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.vertices.buffer()
    }

    pub fn index_buffer(&self) -> BufferId {
        self.indices.buffer()
    }
}
