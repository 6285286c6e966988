use std::collections::HashMap;

use log::debug;

use crate::gpu::{GpuDevice, SamplerId, SamplerState};

pub const LOD_BIAS: f32 = 0.0;
pub const MIN_LOD: f32 = -1000.0;
pub const MAX_LOD: f32 = 1000.0;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapLinear,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    MirroredRepeat,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SamplerDescriptor {
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            min_filter: MinFilter::Nearest,
            mag_filter: MagFilter::Nearest,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
        }
    }
}

impl SamplerDescriptor {
    /// Missing filters fall back to `Nearest`.
    pub fn from_gltf(sampler: &gltf::texture::Sampler) -> Self {
        use gltf::texture::{MagFilter as GMag, MinFilter as GMin};
        let min_filter = match sampler.min_filter() {
            None | Some(GMin::Nearest) => MinFilter::Nearest,
            Some(GMin::Linear) => MinFilter::Linear,
            Some(GMin::NearestMipmapNearest) => MinFilter::NearestMipmapNearest,
            Some(GMin::LinearMipmapNearest) => MinFilter::LinearMipmapNearest,
            Some(GMin::NearestMipmapLinear) => MinFilter::NearestMipmapLinear,
            Some(GMin::LinearMipmapLinear) => MinFilter::LinearMipmapLinear,
        };
        let mag_filter = match sampler.mag_filter() {
            None | Some(GMag::Nearest) => MagFilter::Nearest,
            Some(GMag::Linear) => MagFilter::Linear,
        };
        Self {
            min_filter,
            mag_filter,
            wrap_s: WrapMode::from_gltf(sampler.wrap_s()),
            wrap_t: WrapMode::from_gltf(sampler.wrap_t()),
        }
    }

    pub fn state(&self) -> SamplerState {
        SamplerState {
            descriptor: *self,
            lod_bias: LOD_BIAS,
            min_lod: MIN_LOD,
            max_lod: MAX_LOD,
        }
    }
}

impl WrapMode {
    fn from_gltf(mode: gltf::texture::WrappingMode) -> Self {
        match mode {
            gltf::texture::WrappingMode::Repeat => WrapMode::Repeat,
            gltf::texture::WrappingMode::ClampToEdge => WrapMode::ClampToEdge,
            gltf::texture::WrappingMode::MirroredRepeat => WrapMode::MirroredRepeat,
        }
    }
}

/// Interns samplers by their full descriptor, so two descriptors share a
/// sampler object only when every field matches.
#[derive(Default)]
pub struct SamplerCache {
    cache: HashMap<SamplerDescriptor, SamplerId>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create<D: GpuDevice>(&mut self, device: &mut D, desc: &SamplerDescriptor) -> SamplerId {
        *self.cache.entry(*desc).or_insert_with(|| {
            debug!("creating sampler {:?}", desc);
            device.create_sampler(&desc.state())
        })
    }

    pub fn get(&self, desc: &SamplerDescriptor) -> Option<SamplerId> {
        self.cache.get(desc).copied()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn teardown<D: GpuDevice>(&mut self, device: &mut D) {
        for (_, sampler) in self.cache.drain() {
            device.destroy_sampler(sampler);
        }
    }
}
