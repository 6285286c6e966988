use std::collections::HashMap;

use log::{error, info, warn};

use super::mipmap::{MipmapGenerator, TEXTURE_FORMAT};
use super::{
    BufferDescriptor, BufferId, BufferUsage, GpuDevice, SamplerId, SamplerState, TextureDescriptor,
    TextureId,
};
use crate::assets::sampler_cache::{MagFilter, MinFilter, WrapMode};
use crate::error::GpuError;

struct PooledTexture {
    texture: wgpu::Texture,
    mip_level_count: u32,
}

struct HandleSlot {
    texture: TextureId,
    sampler: SamplerId,
    resident: bool,
}

/// `GpuDevice` backed by wgpu.
///
/// wgpu has no bindless handles, so they are emulated with a slot table:
/// the handle for a (texture, sampler) pair is its slot index plus one and
/// residency is a flag on the slot. A renderer builds its texture array
/// from the resident slots.
pub struct WgpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    mipmaps: MipmapGenerator,
    next_id: u32,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    samplers: HashMap<SamplerId, wgpu::Sampler>,
    textures: HashMap<TextureId, PooledTexture>,
    slots: Vec<HandleSlot>,
}

impl WgpuDevice {
    /// Opens the default adapter without a surface.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        info!("using adapter {:?}", adapter.get_info().name);

        let required_features = wanted_features(adapter.features());
        if required_features.is_empty() {
            warn!("adapter lacks INDIRECT_FIRST_INSTANCE, indirect draws will read object 0");
        }
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("scenepool device"),
                required_features,
                // pools are sized against the adapter's real max_buffer_size
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        device.on_uncaptured_error(Box::new(|e| {
            error!("wgpu uncaptured error: {e:?}");
        }));

        let mipmaps = MipmapGenerator::new(&device);
        Ok(Self {
            device,
            queue,
            mipmaps,
            next_id: 0,
            buffers: HashMap::new(),
            samplers: HashMap::new(),
            textures: HashMap::new(),
            slots: Vec::new(),
        })
    }

    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id)
    }

    pub fn sampler(&self, id: SamplerId) -> Option<&wgpu::Sampler> {
        self.samplers.get(&id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&wgpu::Texture> {
        self.textures.get(&id).map(|t| &t.texture)
    }

    /// (handle, texture, sampler) for every resident slot, in handle order.
    pub fn resident_slots(&self) -> impl Iterator<Item = (u64, TextureId, SamplerId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.resident)
            .map(|(i, slot)| (i as u64 + 1, slot.texture, slot.sampler))
    }

    fn slot_mut(&mut self, handle: u64) -> Option<&mut HandleSlot> {
        let index = usize::try_from(handle.checked_sub(1)?).ok()?;
        self.slots.get_mut(index)
    }
}

fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let kind = match usage {
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::STORAGE,
        BufferUsage::Index => wgpu::BufferUsages::INDEX,
        BufferUsage::Storage => wgpu::BufferUsages::STORAGE,
        BufferUsage::Indirect => wgpu::BufferUsages::INDIRECT,
    };
    kind | wgpu::BufferUsages::COPY_DST
}

fn min_filter_modes(filter: MinFilter) -> (wgpu::FilterMode, wgpu::FilterMode) {
    use wgpu::FilterMode::{Linear, Nearest};
    match filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest => (Nearest, Nearest),
        MinFilter::Linear | MinFilter::LinearMipmapNearest => (Linear, Nearest),
        MinFilter::NearestMipmapLinear => (Nearest, Linear),
        MinFilter::LinearMipmapLinear => (Linear, Linear),
    }
}

fn mag_filter_mode(filter: MagFilter) -> wgpu::FilterMode {
    match filter {
        MagFilter::Nearest => wgpu::FilterMode::Nearest,
        MagFilter::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BufferId {
        let id = BufferId(self.next());
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(desc.label),
            size: desc.size,
            usage: buffer_usages(desc.usage),
            mapped_at_creation: false,
        });
        self.buffers.insert(id, buffer);
        id
    }

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]) {
        let Some(target) = self.buffers.get(&buffer) else {
            error!("write to unknown buffer {:?}", buffer);
            return;
        };
        if offset + data.len() as u64 > target.size() {
            error!(
                "write of {} bytes at {} overflows buffer {:?} ({} bytes)",
                data.len(),
                offset,
                buffer,
                target.size()
            );
            return;
        }
        self.queue.write_buffer(target, offset, data);
    }

    fn destroy_buffer(&mut self, buffer: BufferId) {
        if let Some(b) = self.buffers.remove(&buffer) {
            b.destroy();
        }
    }

    fn create_sampler(&mut self, state: &SamplerState) -> SamplerId {
        let id = SamplerId(self.next());
        let desc = &state.descriptor;
        let (min_filter, mipmap_filter) = min_filter_modes(desc.min_filter);
        if state.lod_bias != 0.0 {
            warn!("wgpu samplers have no LOD bias, ignoring {}", state.lod_bias);
        }
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("pooled sampler"),
            address_mode_u: address_mode(desc.wrap_s),
            address_mode_v: address_mode(desc.wrap_t),
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: mag_filter_mode(desc.mag_filter),
            min_filter,
            mipmap_filter,
            lod_min_clamp: state.min_lod.max(0.0),
            lod_max_clamp: state.max_lod.max(0.0),
            ..Default::default()
        });
        self.samplers.insert(id, sampler);
        id
    }

    fn destroy_sampler(&mut self, sampler: SamplerId) {
        self.samplers.remove(&sampler);
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId, GpuError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(GpuError::InvalidTextureSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            PooledTexture {
                texture,
                mip_level_count: desc.mip_level_count,
            },
        );
        Ok(id)
    }

    fn write_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]) {
        let Some(target) = self.textures.get(&texture) else {
            error!("write to unknown texture {:?}", texture);
            return;
        };
        if rgba.len() != width as usize * height as usize * 4 {
            error!("texture {:?} upload has {} bytes for {}x{}", texture, rgba.len(), width, height);
            return;
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn generate_mipmaps(&mut self, texture: TextureId) {
        if let Some(target) = self.textures.get(&texture) {
            self.mipmaps
                .generate(&self.device, &self.queue, &target.texture, target.mip_level_count);
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.slots.iter().any(|s| s.texture == texture && s.resident) {
            error!("texture {:?} destroyed while a handle to it is resident", texture);
        }
        if let Some(t) = self.textures.remove(&texture) {
            t.texture.destroy();
        }
    }

    fn texture_sampler_handle(&mut self, texture: TextureId, sampler: SamplerId) -> u64 {
        if let Some(i) = self
            .slots
            .iter()
            .position(|s| s.texture == texture && s.sampler == sampler)
        {
            return i as u64 + 1;
        }
        self.slots.push(HandleSlot {
            texture,
            sampler,
            resident: false,
        });
        self.slots.len() as u64
    }

    fn make_handle_resident(&mut self, handle: u64) {
        match self.slot_mut(handle) {
            Some(slot) => slot.resident = true,
            None => error!("cannot make unknown handle {:#x} resident", handle),
        }
    }

    fn make_handle_non_resident(&mut self, handle: u64) {
        if let Some(slot) = self.slot_mut(handle) {
            slot.resident = false;
        }
    }

    fn is_handle_resident(&self, handle: u64) -> bool {
        handle
            .checked_sub(1)
            .and_then(|i| self.slots.get(i as usize))
            .is_some_and(|slot| slot.resident)
    }
}

/// Draw commands carry a non-zero `first_instance` into the object table,
/// which indirect draws only honor with `INDIRECT_FIRST_INSTANCE`.
fn wanted_features(available: wgpu::Features) -> wgpu::Features {
    available & wgpu::Features::INDIRECT_FIRST_INSTANCE
}
