use bytemuck::{Pod, Zeroable};

use crate::assets::model::Model;
use crate::error::{AssetError, PoolKind};
use crate::gpu::{BufferDescriptor, BufferId, BufferUsage, GpuDevice};

/// Per-draw data the vertex stage looks up with the instance index.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectRecord {
    pub world_matrix: [[f32; 4]; 4],
    /// `x` is the material index, the rest is unused.
    pub instance_parameter: [i32; 4],
}

/// Matches the layout `draw_indexed_indirect` reads.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirect {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// One object record and one indirect command per pooled primitive.
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    pub objects: Vec<ObjectRecord>,
    pub commands: Vec<DrawIndexedIndirect>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_model(model: &Model) -> Self {
        let mut list = Self::new();
        list.push_model(model);
        list
    }

    /// Primitives without a material draw with material 0.
    pub fn push_model(&mut self, model: &Model) {
        for mesh in &model.meshes {
            let world_matrix = mesh.world_matrix.to_cols_array_2d();
            for primitive in &mesh.primitives {
                let draw_index = self.commands.len() as u32;
                self.objects.push(ObjectRecord {
                    world_matrix,
                    instance_parameter: [primitive.material_index.unwrap_or(0) as i32, 0, 0, 0],
                });
                self.commands.push(DrawIndexedIndirect {
                    index_count: primitive.geometry.index_count,
                    instance_count: 1,
                    first_index: primitive.geometry.index_offset,
                    base_vertex: primitive.geometry.vertex_offset as i32,
                    first_instance: draw_index,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Fixed-capacity object and indirect buffers, rewritten from the start on
/// every upload.
pub struct DrawBuffers {
    objects: BufferId,
    commands: BufferId,
    capacity: u32,
    count: u32,
}

impl DrawBuffers {
    pub fn new<D: GpuDevice>(device: &mut D, capacity: u32) -> Self {
        let objects = device.create_buffer(&BufferDescriptor {
            label: "object records",
            size: capacity as u64 * std::mem::size_of::<ObjectRecord>() as u64,
            usage: BufferUsage::Storage,
        });
        let commands = device.create_buffer(&BufferDescriptor {
            label: "indirect draw commands",
            size: capacity as u64 * std::mem::size_of::<DrawIndexedIndirect>() as u64,
            usage: BufferUsage::Indirect,
        });
        Self {
            objects,
            commands,
            capacity,
            count: 0,
        }
    }

    pub fn upload<D: GpuDevice>(&mut self, device: &mut D, list: &DrawList) -> Result<u32, AssetError> {
        if list.len() > self.capacity as usize {
            return Err(AssetError::PoolExhausted {
                pool: PoolKind::Object,
                requested: list.len() as u64,
                available: self.capacity as u64,
            });
        }
        if !list.is_empty() {
            device.write_buffer(self.objects, 0, bytemuck::cast_slice(&list.objects));
            device.write_buffer(self.commands, 0, bytemuck::cast_slice(&list.commands));
        }
        self.count = list.len() as u32;
        Ok(self.count)
    }

    /// Commands written by the last upload.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn object_buffer(&self) -> BufferId {
        self.objects
    }

    pub fn command_buffer(&self) -> BufferId {
        self.commands
    }

    pub fn destroy<D: GpuDevice>(&self, device: &mut D) {
        device.destroy_buffer(self.objects);
        device.destroy_buffer(self.commands);
    }
}
