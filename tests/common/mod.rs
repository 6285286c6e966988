//! Builds small glTF files on disk for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde_json::{json, Value};

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;
const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;

pub const NEAREST: u32 = 9728;
pub const LINEAR: u32 = 9729;
pub const LINEAR_MIPMAP_LINEAR: u32 = 9987;
pub const REPEAT: u32 = 10497;
pub const CLAMP_TO_EDGE: u32 = 33071;

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_fn(width, height, |x, y| image::Rgba([x as u8, y as u8, 200, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Accumulates one binary buffer plus the JSON arrays pointing into it.
/// The buffer is written out as a base64 data URI.
#[derive(Default)]
pub struct GltfBuilder {
    bin: Vec<u8>,
    buffer_views: Vec<Value>,
    accessors: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
    roots: Vec<usize>,
    images: Vec<Value>,
    samplers: Vec<Value>,
    textures: Vec<Value>,
    materials: Vec<Value>,
}

impl GltfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.bin.extend_from_slice(bytes);
        self.buffer_views.push(view);
        self.buffer_views.len() - 1
    }

    fn accessor(&mut self, value: Value) -> usize {
        self.accessors.push(value);
        self.accessors.len() - 1
    }

    /// A mesh with one triangle primitive per entry of `primitives`; each
    /// entry is `(positions, indices, material)`.
    pub fn mesh(&mut self, primitives: &[(Vec<[f32; 3]>, Option<Vec<u32>>, Option<usize>)]) -> usize {
        let mut out = Vec::new();
        for (positions, indices, material) in primitives {
            let flat: Vec<f32> = positions.iter().flatten().copied().collect();
            let view = self.view(bytemuck::cast_slice(&flat), Some(ARRAY_BUFFER));
            let mut min = [f32::MAX; 3];
            let mut max = [f32::MIN; 3];
            for p in positions {
                for i in 0..3 {
                    min[i] = min[i].min(p[i]);
                    max[i] = max[i].max(p[i]);
                }
            }
            let position = self.accessor(json!({
                "bufferView": view,
                "componentType": FLOAT,
                "count": positions.len(),
                "type": "VEC3",
                "min": min,
                "max": max,
            }));
            let mut primitive = json!({ "attributes": { "POSITION": position } });
            if let Some(indices) = indices {
                let view = self.view(bytemuck::cast_slice(indices), Some(ELEMENT_ARRAY_BUFFER));
                let accessor = self.accessor(json!({
                    "bufferView": view,
                    "componentType": UNSIGNED_INT,
                    "count": indices.len(),
                    "type": "SCALAR",
                }));
                primitive["indices"] = json!(accessor);
            }
            if let Some(material) = material {
                primitive["material"] = json!(material);
            }
            out.push(primitive);
        }
        self.meshes.push(json!({ "primitives": out }));
        self.meshes.len() - 1
    }

    pub fn triangle(&mut self, material: Option<usize>) -> usize {
        self.mesh(&[(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![0, 1, 2]),
            material,
        )])
    }

    pub fn node(&mut self, mesh: Option<usize>, translation: [f32; 3], children: Vec<usize>) -> usize {
        let mut node = json!({ "translation": translation });
        if let Some(mesh) = mesh {
            node["mesh"] = json!(mesh);
        }
        if !children.is_empty() {
            node["children"] = json!(children);
        }
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn root(&mut self, node: usize) {
        self.roots.push(node);
    }

    pub fn embedded_image(&mut self, bytes: &[u8]) -> usize {
        let view = self.view(bytes, None);
        self.images.push(json!({ "bufferView": view, "mimeType": "image/png" }));
        self.images.len() - 1
    }

    pub fn uri_image(&mut self, uri: &str) -> usize {
        self.images.push(json!({ "uri": uri }));
        self.images.len() - 1
    }

    pub fn sampler(&mut self, mag: u32, min: u32, wrap_s: u32, wrap_t: u32) -> usize {
        self.samplers.push(json!({
            "magFilter": mag,
            "minFilter": min,
            "wrapS": wrap_s,
            "wrapT": wrap_t,
        }));
        self.samplers.len() - 1
    }

    pub fn texture(&mut self, image: usize, sampler: Option<usize>) -> usize {
        let mut texture = json!({ "source": image });
        if let Some(sampler) = sampler {
            texture["sampler"] = json!(sampler);
        }
        self.textures.push(texture);
        self.textures.len() - 1
    }

    pub fn material(&mut self, name: &str, base_color_texture: Option<usize>, normal_texture: Option<usize>) -> usize {
        let mut pbr = json!({ "baseColorFactor": [0.8, 0.6, 0.4, 1.0] });
        if let Some(texture) = base_color_texture {
            pbr["baseColorTexture"] = json!({ "index": texture });
        }
        let mut material = json!({ "name": name, "pbrMetallicRoughness": pbr });
        if let Some(texture) = normal_texture {
            material["normalTexture"] = json!({ "index": texture });
        }
        self.materials.push(material);
        self.materials.len() - 1
    }

    fn document(&self, buffer: Option<Value>) -> Value {
        let mut root = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": self.roots }],
        });
        if let Some(buffer) = buffer {
            root["buffers"] = json!([buffer]);
        }
        for (key, values) in [
            ("bufferViews", &self.buffer_views),
            ("accessors", &self.accessors),
            ("meshes", &self.meshes),
            ("nodes", &self.nodes),
            ("images", &self.images),
            ("samplers", &self.samplers),
            ("textures", &self.textures),
            ("materials", &self.materials),
        ] {
            if !values.is_empty() {
                root[key] = json!(values);
            }
        }
        root
    }

    pub fn to_json(&self) -> Value {
        let buffer = (!self.bin.is_empty()).then(|| {
            let uri = format!(
                "data:application/octet-stream;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(&self.bin)
            );
            json!({ "byteLength": self.bin.len(), "uri": uri })
        });
        self.document(buffer)
    }

    /// The same document as a binary container: JSON chunk, then the
    /// buffer as the BIN chunk with no uri.
    pub fn to_glb(&self) -> Vec<u8> {
        let buffer = (!self.bin.is_empty()).then(|| json!({ "byteLength": self.bin.len() }));
        let mut json_chunk = serde_json::to_vec(&self.document(buffer)).unwrap();
        while json_chunk.len() % 4 != 0 {
            json_chunk.push(b' ');
        }
        let mut bin_chunk = self.bin.clone();
        while bin_chunk.len() % 4 != 0 {
            bin_chunk.push(0);
        }

        let mut total = 12 + 8 + json_chunk.len();
        if !bin_chunk.is_empty() {
            total += 8 + bin_chunk.len();
        }
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json_chunk);
        if !bin_chunk.is_empty() {
            glb.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
            glb.extend_from_slice(b"BIN\0");
            glb.extend_from_slice(&bin_chunk);
        }
        glb
    }

    pub fn write_glb(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.to_glb()).unwrap();
        path
    }

    pub fn write(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, serde_json::to_vec_pretty(&self.to_json()).unwrap()).unwrap();
        path
    }
}

/// One node, one mesh, one 3-vertex indexed primitive, nothing else.
pub fn triangle_asset(dir: &Path, file_name: &str) -> PathBuf {
    let mut gltf = GltfBuilder::new();
    let mesh = gltf.triangle(None);
    let node = gltf.node(Some(mesh), [0.0; 3], vec![]);
    gltf.root(node);
    gltf.write(dir, file_name)
}
