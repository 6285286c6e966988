use std::path::Path;

use log::{debug, error, info};

use super::decoder::ImageRecord;
use super::import::{import_scene, ImportedScene};
use super::material::{GpuMaterial, MaterialTable};
use super::mega_buffer::{GeometryPool, MegaBuffer};
use super::model::{Model, ModelMesh, ModelRegistry, Primitive};
use super::sampler_cache::{SamplerCache, SamplerDescriptor};
use super::texture::TextureRegistry;
use crate::config::PoolConfig;
use crate::draw_list::{DrawBuffers, DrawList};
use crate::error::{AssetError, PoolKind};
use crate::gpu::{BufferUsage, GpuDevice, SamplerId};

/// Owns every pooled GPU resource and the registry of models built on them.
///
/// Loading is single-writer: all mutation goes through `&mut self`. To load
/// off the main thread, import on a [`LoaderThread`](super::loader::LoaderThread)
/// and [`commit`](Self::commit) the result here.
pub struct AssetPool<D: GpuDevice> {
    device: D,
    workers: usize,
    samplers: SamplerCache,
    default_sampler: SamplerId,
    textures: TextureRegistry,
    materials: MaterialTable,
    material_buffer: MegaBuffer,
    geometry: GeometryPool,
    draws: DrawBuffers,
    models: ModelRegistry,
    torn_down: bool,
}

impl<D: GpuDevice> AssetPool<D> {
    pub fn new(mut device: D, config: &PoolConfig) -> Self {
        let mode = config.residency_mode();
        info!("texture residency mode: {:?}", mode);

        let mut samplers = SamplerCache::new();
        let default_sampler = samplers.get_or_create(&mut device, &SamplerDescriptor::default());
        let geometry = GeometryPool::new(&mut device, config.vertex_pool_bytes, config.index_pool_bytes);
        let material_buffer = MegaBuffer::new(
            &mut device,
            PoolKind::Material,
            BufferUsage::Storage,
            GpuMaterial::SIZE,
            config.material_capacity as u64 * GpuMaterial::SIZE,
        );
        let draws = DrawBuffers::new(&mut device, config.object_capacity);

        Self {
            device,
            workers: config.worker_count(),
            samplers,
            default_sampler,
            textures: TextureRegistry::new(mode),
            materials: MaterialTable::new(),
            material_buffer,
            geometry,
            draws,
            models: ModelRegistry::new(),
            torn_down: false,
        }
    }

    /// Loads `path` under `name`. A name that is already loaded is left
    /// alone. Errors are logged before being returned, and a failed load
    /// leaves the pool as it was.
    pub fn add_model_from_file(&mut self, name: &str, path: &Path) -> Result<(), AssetError> {
        if self.models.contains(name) {
            debug!("model '{}' already loaded, skipping {}", name, path.display());
            return Ok(());
        }
        let result = import_scene(path, self.workers).and_then(|scene| self.commit(name, scene));
        if let Err(e) = &result {
            error!("failed to load model '{}' from {}: {}", name, path.display(), e);
        }
        result
    }

    /// Uploads an imported scene and registers it as `name`.
    ///
    /// Capacity for geometry and materials is checked up front, so either
    /// everything is written or nothing is.
    pub fn commit(&mut self, name: &str, scene: ImportedScene) -> Result<(), AssetError> {
        if self.models.contains(name) {
            debug!("model '{}' already loaded, dropping import of {}", name, scene.path.display());
            return Ok(());
        }
        self.geometry.can_fit(scene.vertex_count(), scene.index_count())?;
        self.material_buffer.check(scene.materials.len() as u64)?;

        let ImportedScene {
            path,
            images,
            samplers,
            textures,
            materials,
            meshes,
        } = scene;

        let sampler_ids: Vec<SamplerId> = samplers
            .iter()
            .map(|desc| self.samplers.get_or_create(&mut self.device, desc))
            .collect();

        // one GPU texture per glTF texture; pixels move into the last texture using them
        let mut remaining_uses = vec![0usize; images.len()];
        for texture in &textures {
            if let Some(uses) = remaining_uses.get_mut(texture.image) {
                *uses += 1;
            }
        }
        let mut images: Vec<Option<ImageRecord>> = images.into_iter().map(Some).collect();
        let mut texture_map = Vec::with_capacity(textures.len());
        for texture in &textures {
            let image = match images.get_mut(texture.image) {
                Some(slot) => {
                    remaining_uses[texture.image] -= 1;
                    if remaining_uses[texture.image] == 0 {
                        slot.take()
                    } else {
                        slot.clone()
                    }
                }
                None => None,
            };
            let sampler = texture
                .sampler
                .and_then(|s| sampler_ids.get(s).copied())
                .unwrap_or(self.default_sampler);
            texture_map.push(image.and_then(|image| self.textures.upload(&mut self.device, image, sampler)));
        }

        let mut material_map = Vec::with_capacity(materials.len());
        for material in &materials {
            let global = self
                .materials
                .push(material.remapped(&texture_map), self.textures.handles());
            self.material_buffer
                .append(&mut self.device, &[self.materials.gpu()[global]])?;
            material_map.push(global);
        }

        let mut model_meshes = Vec::with_capacity(meshes.len());
        for mesh in meshes {
            let mut primitives = Vec::with_capacity(mesh.primitives.len());
            for geometry in &mesh.primitives {
                let pooled = self
                    .geometry
                    .allocate(&mut self.device, &geometry.vertices, &geometry.indices)?;
                primitives.push(Primitive {
                    geometry: pooled,
                    material_index: geometry.material.and_then(|m| material_map.get(m).copied()),
                });
            }
            model_meshes.push(ModelMesh {
                name: mesh.name,
                world_matrix: mesh.world_matrix,
                primitives,
            });
        }

        let model = Model {
            name: name.to_string(),
            meshes: model_meshes,
        };
        let (vertices, indices) = self.geometry.cursors();
        info!(
            "committed model '{}' from {}: {} meshes, {} primitives, cursors at {} vertices / {} indices",
            name,
            path.display(),
            model.meshes.len(),
            model.primitive_count(),
            vertices,
            indices
        );
        self.models.insert(model);
        Ok(())
    }

    /// Writes the draw list for the named models, in the given order.
    /// Unknown names are skipped. Returns the number of draw commands.
    pub fn write_draw_list(&mut self, names: &[&str]) -> Result<u32, AssetError> {
        let mut list = DrawList::new();
        for name in names {
            match self.models.get(name) {
                Some(model) => list.push_model(model),
                None => debug!("no model '{}' to draw", name),
            }
        }
        self.draws.upload(&mut self.device, &list)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// `(vertex cursor, index cursor)` of the mega-buffers.
    pub fn cursors(&self) -> (u32, u32) {
        self.geometry.cursors()
    }

    pub fn geometry(&self) -> &GeometryPool {
        &self.geometry
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn material_buffer(&self) -> &MegaBuffer {
        &self.material_buffer
    }

    pub fn draw_buffers(&self) -> &DrawBuffers {
        &self.draws
    }

    pub fn sampler_count(&self) -> usize {
        self.samplers.len()
    }

    pub fn default_sampler(&self) -> SamplerId {
        self.default_sampler
    }

    /// Releases every GPU object: handles go non-resident first, then
    /// textures, samplers and buffers are destroyed. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.textures.teardown(&mut self.device);
        self.samplers.teardown(&mut self.device);
        self.device.destroy_buffer(self.geometry.vertex_buffer());
        self.device.destroy_buffer(self.geometry.index_buffer());
        self.device.destroy_buffer(self.material_buffer.buffer());
        self.draws.destroy(&mut self.device);
        self.materials.clear();
        self.models.clear();
        self.torn_down = true;
        info!("asset pool torn down");
    }
}

impl<D: GpuDevice> Drop for AssetPool<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
