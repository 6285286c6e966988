use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Mat4;
use log::{info, warn};

use super::decoder::{decode_image, ImageRecord, ImageSource};
use super::geometry::{read_primitive, PrimitiveGeometry};
use super::material::CpuMaterial;
use super::sampler_cache::SamplerDescriptor;
use super::scene_graph::{flatten, SceneNode};
use crate::error::AssetError;
use crate::job_system::par_map;

/// A glTF texture: which image it shows and how it is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportedTexture {
    pub image: usize,
    pub sampler: Option<usize>,
}

/// One visit of a mesh-bearing node, with that mesh's triangle primitives.
/// A mesh visited several times shares its primitive data between visits.
#[derive(Debug, Clone)]
pub struct ImportedMesh {
    pub name: String,
    pub node: usize,
    pub mesh: usize,
    pub world_matrix: Mat4,
    pub primitives: Vec<Arc<PrimitiveGeometry>>,
}

/// Everything read out of one glTF file, with no GPU state attached.
/// Every index in here is local to the asset.
#[derive(Debug, Clone)]
pub struct ImportedScene {
    pub path: PathBuf,
    /// Indexed like the asset's images. Failed decodes are zero-sized.
    pub images: Vec<ImageRecord>,
    pub samplers: Vec<SamplerDescriptor>,
    pub textures: Vec<ImportedTexture>,
    pub materials: Vec<CpuMaterial>,
    pub meshes: Vec<ImportedMesh>,
}

impl ImportedScene {
    pub fn vertex_count(&self) -> u64 {
        self.primitives().map(|p| p.vertices.len() as u64).sum()
    }

    pub fn index_count(&self) -> u64 {
        self.primitives().map(|p| p.indices.len() as u64).sum()
    }

    fn primitives(&self) -> impl Iterator<Item = &PrimitiveGeometry> {
        self.meshes.iter().flat_map(|m| m.primitives.iter().map(|p| p.as_ref()))
    }
}

fn image_source<'a>(
    image: &gltf::Image,
    base_dir: &Path,
    buffers: &'a [gltf::buffer::Data],
) -> Result<ImageSource<'a>, crate::error::ImageError> {
    match image.source() {
        gltf::image::Source::View { view, .. } => Ok(ImageSource::BufferView {
            buffer: buffers
                .get(view.buffer().index())
                .map(|data| data.0.as_slice())
                .unwrap_or_default(),
            offset: view.offset(),
            length: view.length(),
        }),
        gltf::image::Source::Uri { uri, .. } => ImageSource::from_uri(uri, base_dir),
    }
}

/// Parses `path`, decodes its images on `workers` threads and extracts the
/// flattened geometry. Touches no GPU state.
pub fn import_scene(path: &Path, workers: usize) -> Result<ImportedScene, AssetError> {
    let gltf_error = |source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    };
    let bytes = crate::io::read_binary(path)?;
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(&bytes).map_err(gltf_error)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let buffers = gltf::import_buffers(&document, Some(base_dir), blob).map_err(gltf_error)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetError::NoScene)?;

    let gltf_images: Vec<gltf::Image> = document.images().collect();
    let images = par_map(&gltf_images, workers, |index, image| {
        match image_source(image, base_dir, &buffers) {
            Ok(source) => decode_image(index, image.name(), &source),
            Err(e) => {
                warn!("image {} has an unusable source: {}", index, e);
                ImageRecord {
                    name: image.name().map(str::to_owned),
                    index,
                    ..Default::default()
                }
            }
        }
    });

    let gltf_samplers: Vec<gltf::texture::Sampler> = document.samplers().collect();
    let samplers = par_map(&gltf_samplers, workers, |_, sampler| SamplerDescriptor::from_gltf(sampler));

    let textures = document
        .textures()
        .map(|texture| ImportedTexture {
            image: texture.source().index(),
            sampler: texture.sampler().index(),
        })
        .collect();
    let materials = document.materials().map(|m| CpuMaterial::from_gltf(&m)).collect();

    let nodes: Vec<SceneNode> = document.nodes().map(|n| SceneNode::from_gltf(&n)).collect();
    let roots: Vec<usize> = scene.nodes().map(|n| n.index()).collect();
    let instances = flatten(&roots, &nodes)?;

    let gltf_meshes: Vec<gltf::Mesh> = document.meshes().collect();
    let mut primitive_cache: HashMap<usize, Vec<Arc<PrimitiveGeometry>>> = HashMap::new();
    let mut meshes = Vec::with_capacity(instances.len());
    for instance in instances {
        let Some(mesh) = gltf_meshes.get(instance.mesh) else {
            warn!("node {} references missing mesh {}", instance.node, instance.mesh);
            continue;
        };
        let primitives = match primitive_cache.get(&instance.mesh) {
            Some(cached) => cached.clone(),
            None => {
                let mut read = Vec::new();
                for primitive in mesh.primitives() {
                    if let Some(geometry) = read_primitive(instance.mesh, &primitive, &buffers)? {
                        read.push(Arc::new(geometry));
                    }
                }
                primitive_cache.insert(instance.mesh, read.clone());
                read
            }
        };
        meshes.push(ImportedMesh {
            name: mesh
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("mesh_{}", instance.mesh)),
            node: instance.node,
            mesh: instance.mesh,
            world_matrix: instance.world,
            primitives,
        });
    }

    let imported = ImportedScene {
        path: path.to_path_buf(),
        images,
        samplers,
        textures,
        materials,
        meshes,
    };
    info!(
        "imported {}: {} images, {} materials, {} mesh instances, {} vertices, {} indices",
        path.display(),
        imported.images.len(),
        imported.materials.len(),
        imported.meshes.len(),
        imported.vertex_count(),
        imported.index_count()
    );
    Ok(imported)
}
