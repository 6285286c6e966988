//! The narrow slice of a graphics API the asset pool needs.
//!
//! Ids are opaque `u32`s handed out by the device, in the spirit of GL object
//! names. Bindless handles are `u64` and never `0`, so `0` can mean "no
//! texture" inside material records.

pub mod headless;
pub mod mipmap;
pub mod wgpu_device;

pub use headless::HeadlessDevice;
pub use wgpu_device::WgpuDevice;

use crate::assets::sampler_cache::SamplerDescriptor;
use crate::error::GpuError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Storage,
    Indirect,
}

#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

/// Everything a backend needs to build a sampler object.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerState {
    pub descriptor: SamplerDescriptor,
    pub lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
}

pub trait GpuDevice {
    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BufferId;
    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8]);
    fn destroy_buffer(&mut self, buffer: BufferId);

    fn create_sampler(&mut self, state: &SamplerState) -> SamplerId;
    fn destroy_sampler(&mut self, sampler: SamplerId);

    /// Creates an sRGB RGBA8 2D texture with storage for every mip level.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId, GpuError>;
    /// Uploads tightly packed RGBA8 pixels into mip level 0.
    fn write_texture(&mut self, texture: TextureId, width: u32, height: u32, rgba: &[u8]);
    /// Fills mip levels 1.. from level 0.
    fn generate_mipmaps(&mut self, texture: TextureId);
    fn destroy_texture(&mut self, texture: TextureId);

    fn texture_sampler_handle(&mut self, texture: TextureId, sampler: SamplerId) -> u64;
    fn make_handle_resident(&mut self, handle: u64);
    fn make_handle_non_resident(&mut self, handle: u64);
    fn is_handle_resident(&self, handle: u64) -> bool;
}
