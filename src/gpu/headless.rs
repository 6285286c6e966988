use std::collections::{HashMap, HashSet};

use log::error;

use super::{
    BufferDescriptor, BufferId, BufferUsage, GpuDevice, SamplerId, SamplerState, TextureDescriptor,
    TextureId,
};
use crate::error::GpuError;

/// Largest texture edge accepted, matching common desktop limits.
const MAX_TEXTURE_DIMENSION: u32 = 16384;

pub struct HeadlessBuffer {
    pub label: String,
    pub size: u64,
    pub usage: BufferUsage,
    /// Grows on write, never past `size`.
    pub data: Vec<u8>,
}

pub struct HeadlessTexture {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub base_level: Vec<u8>,
    pub mips_generated: bool,
}

/// A device that keeps everything in CPU memory.
///
/// Used for dry runs and tests. It performs the same bounds checks a real
/// driver would and counts every object it creates so callers can assert on
/// sharing and teardown.
#[derive(Default)]
pub struct HeadlessDevice {
    next_id: u32,
    pub buffers: HashMap<BufferId, HeadlessBuffer>,
    pub samplers: HashMap<SamplerId, SamplerState>,
    pub textures: HashMap<TextureId, HeadlessTexture>,
    handles: HashMap<u64, (TextureId, SamplerId)>,
    resident: HashSet<u64>,
    pub samplers_created: usize,
    pub textures_created: usize,
    pub rejected_writes: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn buffer(&self, id: BufferId) -> Option<&HeadlessBuffer> {
        self.buffers.get(&id)
    }

    pub fn resident_handle_count(&self) -> usize {
        self.resident.len()
    }

    pub fn handle_target(&self, handle: u64) -> Option<(TextureId, SamplerId)> {
        self.handles.get(&handle).copied()
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BufferId {
        let id = BufferId(self.next());
        self.buffers.insert(
            id,
            HeadlessBuffer {
                label: desc.label.to_string(),
                size: desc.size,
                usage: desc.usage,
                data: Vec::new(),
            },
        );
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(target) = self.buffers.get_mut(&buffer) else {
            error!("write to unknown buffer {:?}", buffer);
            self.rejected_writes += 1;
            return;
        };
        let end = offset + data.len() as u64;
        if end > target.size {
            error!(
                "write of {} bytes at {} overflows buffer '{}' ({} bytes)",
                data.len(),
                offset,
                target.label,
                target.size
            );
            self.rejected_writes += 1;
            return;
        }
        let (start, end) = (offset as usize, end as usize);
        if target.data.len() < end {
            target.data.resize(end, 0);
        }
        target.data[start..end].copy_from_slice(data);
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn create_sampler(&mut self, state: &SamplerState) -> SamplerId {
        let id = SamplerId(self.next());
        self.samplers.insert(id, state.clone());
        self.samplers_created += 1;
        id
    }

    fn destroy_sampler(&mut self, sampler: SamplerId) {
        self.samplers.remove(&sampler);
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId, GpuError> {
        if desc.width == 0
            || desc.height == 0
            || desc.width > MAX_TEXTURE_DIMENSION
            || desc.height > MAX_TEXTURE_DIMENSION
        {
            return Err(GpuError::InvalidTextureSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            HeadlessTexture {
                label: desc.label.to_string(),
                width: desc.width,
                height: desc.height,
                mip_level_count: desc.mip_level_count,
                base_level: Vec::new(),
                mips_generated: false,
            },
        );
        self.textures_created += 1;
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]) {
        let expected_len = width as usize * height as usize * 4;
        match self.textures.get_mut(&texture) {
            Some(t) if t.width == width && t.height == height && rgba.len() == expected_len => {
                t.base_level = rgba.to_vec();
            }
            Some(t) => {
                error!(
                    "texture '{}' upload does not match its {}x{} storage",
                    t.label, t.width, t.height
                );
                self.rejected_writes += 1;
            }
            None => {
                error!("write to unknown texture {:?}", texture);
                self.rejected_writes += 1;
            }
        }
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        if let Some(t) = self.textures.get_mut(&texture) {
            t.mips_generated = true;
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        let dangling = self
            .handles
            .iter()
            .any(|(handle, (t, _))| *t == texture && self.resident.contains(handle));
        if dangling {
            error!("texture {:?} destroyed while a handle to it is resident", texture);
        }
        self.textures.remove(&texture);
    }

    fn texture_sampler_handle(&mut self, texture: TextureId, sampler: SamplerId) -> u64 {
        if let Some((handle, _)) = self.handles.iter().find(|(_, pair)| **pair == (texture, sampler)) {
            return *handle;
        }
        // keep handles disjoint from small object ids, like real driver handles
        let handle = (1u64 << 32) | self.next() as u64;
        self.handles.insert(handle, (texture, sampler));
        handle
    }

    fn make_handle_resident(&mut self, handle: u64) {
        if self.handles.contains_key(&handle) {
            self.resident.insert(handle);
        } else {
            error!("cannot make unknown handle {:#x} resident", handle);
        }
    }

    fn make_handle_non_resident(&mut self, handle: u64) {
        self.resident.remove(&handle);
    }

    fn is_handle_resident(&self, handle: u64) -> bool {
        self.resident.contains(&handle)
    }
}
