use log::{debug, warn};

use super::decoder::ImageRecord;
use crate::config::TextureResidencyMode;
use crate::gpu::{GpuDevice, SamplerId, TextureDescriptor, TextureId};

/// `1 + floor(log2(max(width, height)))`, or 0 for an empty image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).leading_zeros()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResidencyState {
    /// Uploaded; in bound-unit mode textures stay here until destroyed.
    Created,
    NonResident,
    Resident,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureEntry {
    pub texture: TextureId,
    /// Bindless handle, or the raw texture id in bound-unit mode.
    pub handle: u64,
    pub state: ResidencyState,
}

/// Every texture the pool has uploaded, with the handle shaders use for it.
///
/// `textures()` and `handles()` are parallel lists indexed by the global
/// texture index stored in `CpuMaterial` slots.
pub struct TextureRegistry {
    mode: TextureResidencyMode,
    entries: Vec<TextureEntry>,
    textures: Vec<TextureId>,
    handles: Vec<u64>,
}

impl TextureRegistry {
    pub fn new(mode: TextureResidencyMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
            textures: Vec::new(),
            handles: Vec::new(),
        }
    }

    pub fn residency_mode(&self) -> TextureResidencyMode {
        self.mode
    }

    pub fn textures(&self) -> &[TextureId] {
        &self.textures
    }

    pub fn handles(&self) -> &[u64] {
        &self.handles
    }

    pub fn entries(&self) -> &[TextureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Uploads `image` with a full mip chain and registers it. Returns the
    /// global texture index, or `None` when the image is empty or the device
    /// refuses it. Pixels are released once the device has its copy.
    pub fn upload<D: GpuDevice>(
        &mut self,
        device: &mut D,
        image: ImageRecord,
        sampler: SamplerId,
    ) -> Option<usize> {
        if image.is_empty() {
            warn!("skipping upload of empty image {}", image.index);
            return None;
        }
        let label = image.name.as_deref().unwrap_or("gltf image");
        let texture = match device.create_texture(&TextureDescriptor {
            label,
            width: image.width,
            height: image.height,
            mip_level_count: mip_level_count(image.width, image.height),
        }) {
            Ok(texture) => texture,
            Err(e) => {
                warn!("image {} not uploaded: {}", image.index, e);
                return None;
            }
        };
        device.write_texture(texture, image.width, image.height, &image.pixels);
        drop(image);
        device.generate_mipmaps(texture);

        let entry = match self.mode {
            TextureResidencyMode::BoundUnits => TextureEntry {
                texture,
                handle: texture.0 as u64,
                state: ResidencyState::Created,
            },
            TextureResidencyMode::Bindless => {
                let handle = device.texture_sampler_handle(texture, sampler);
                device.make_handle_resident(handle);
                TextureEntry {
                    texture,
                    handle,
                    state: ResidencyState::Resident,
                }
            }
        };
        debug!("texture {:?} registered with handle {:#x}", texture, entry.handle);

        self.entries.push(entry);
        self.textures.push(entry.texture);
        self.handles.push(entry.handle);
        Some(self.entries.len() - 1)
    }

    /// Makes every handle non-resident, then destroys the textures.
    pub fn teardown<D: GpuDevice>(&mut self, device: &mut D) {
        for entry in &mut self.entries {
            if entry.state == ResidencyState::Resident {
                device.make_handle_non_resident(entry.handle);
                entry.state = ResidencyState::NonResident;
            }
        }
        for entry in &mut self.entries {
            if entry.state != ResidencyState::Destroyed {
                device.destroy_texture(entry.texture);
                entry.state = ResidencyState::Destroyed;
            }
        }
        self.entries.clear();
        self.textures.clear();
        self.handles.clear();
    }
}
