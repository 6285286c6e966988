use bytemuck::{Pod, Zeroable};

/// A material with texture slots as indices into a texture list.
///
/// Straight out of `import_scene` the indices point into the asset's own
/// texture array; after commit they point into the pool's global list.
#[derive(Debug, Clone, PartialEq)]
pub struct CpuMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub normal_texture: Option<usize>,
    pub occlusion_texture: Option<usize>,
    pub metallic_roughness_texture: Option<usize>,
    pub emissive_texture: Option<usize>,
}

impl CpuMaterial {
    pub fn from_gltf(material: &gltf::Material) -> Self {
        let pbr = material.pbr_metallic_roughness();
        Self {
            name: material.name().unwrap_or_default().to_string(),
            base_color: pbr.base_color_factor(),
            base_color_texture: pbr.base_color_texture().map(|t| t.texture().index()),
            normal_texture: material.normal_texture().map(|t| t.texture().index()),
            occlusion_texture: material.occlusion_texture().map(|t| t.texture().index()),
            metallic_roughness_texture: pbr
                .metallic_roughness_texture()
                .map(|t| t.texture().index()),
            emissive_texture: material.emissive_texture().map(|t| t.texture().index()),
        }
    }

    /// Rewrites every slot through `map`. Slots whose target is missing or
    /// unmapped become absent.
    pub fn remapped(&self, map: &[Option<usize>]) -> Self {
        let remap = |slot: Option<usize>| slot.and_then(|i| map.get(i).copied().flatten());
        Self {
            name: self.name.clone(),
            base_color: self.base_color,
            base_color_texture: remap(self.base_color_texture),
            normal_texture: remap(self.normal_texture),
            occlusion_texture: remap(self.occlusion_texture),
            metallic_roughness_texture: remap(self.metallic_roughness_texture),
            emissive_texture: remap(self.emissive_texture),
        }
    }

    pub fn slots(&self) -> [Option<usize>; 5] {
        [
            self.base_color_texture,
            self.normal_texture,
            self.occlusion_texture,
            self.metallic_roughness_texture,
            self.emissive_texture,
        ]
    }
}

/// Shader-visible material record. Must stay in sync with
///
/// ```wgsl
/// struct Material {
///     base_color: vec4<f32>,
///     base_color_texture: vec2<u32>,
///     normal_texture: vec2<u32>,
///     occlusion_texture: vec2<u32>,
///     metallic_roughness_texture: vec2<u32>,
///     emissive_texture: vec2<u32>,
///     _padding: vec2<u32>,
/// }
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    pub base_color: [f32; 4],
    pub base_color_texture: u64,
    pub normal_texture: u64,
    pub occlusion_texture: u64,
    pub metallic_roughness_texture: u64,
    pub emissive_texture: u64,
    pub _padding: u64,
}

impl GpuMaterial {
    pub const SIZE: u64 = std::mem::size_of::<GpuMaterial>() as u64;

    /// `handles` is indexed by the texture indices in `cpu`; an absent slot,
    /// or one outside `handles`, becomes 0.
    pub fn resolve(cpu: &CpuMaterial, handles: &[u64]) -> Self {
        let handle = |slot: Option<usize>| slot.and_then(|i| handles.get(i).copied()).unwrap_or(0);
        Self {
            base_color: cpu.base_color,
            base_color_texture: handle(cpu.base_color_texture),
            normal_texture: handle(cpu.normal_texture),
            occlusion_texture: handle(cpu.occlusion_texture),
            metallic_roughness_texture: handle(cpu.metallic_roughness_texture),
            emissive_texture: handle(cpu.emissive_texture),
            _padding: 0,
        }
    }
}

/// CPU and GPU material lists, always the same length and order.
#[derive(Default)]
pub struct MaterialTable {
    cpu: Vec<CpuMaterial>,
    gpu: Vec<GpuMaterial>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, material: CpuMaterial, handles: &[u64]) -> usize {
        self.gpu.push(GpuMaterial::resolve(&material, handles));
        self.cpu.push(material);
        self.cpu.len() - 1
    }

    pub fn cpu(&self) -> &[CpuMaterial] {
        &self.cpu
    }

    pub fn gpu(&self) -> &[GpuMaterial] {
        &self.gpu
    }

    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }

    pub fn clear(&mut self) {
        self.cpu.clear();
        self.gpu.clear();
    }
}
