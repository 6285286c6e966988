use std::path::PathBuf;

use thiserror::Error;

/// Which fixed-capacity GPU allocation ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Vertex,
    Index,
    Material,
    Object,
}

impl std::fmt::Display for PoolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PoolKind::Vertex => "vertex",
            PoolKind::Index => "index",
            PoolKind::Material => "material",
            PoolKind::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse glTF {path}: {source}")]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF asset has no scene")]
    NoScene,
    #[error("primitive {primitive} of mesh {mesh} is missing {semantic}")]
    MissingAttribute {
        mesh: usize,
        primitive: usize,
        semantic: &'static str,
    },
    #[error("primitive {primitive} of mesh {mesh}: {attribute} has {actual} elements, POSITION has {expected}")]
    AttributeCountMismatch {
        mesh: usize,
        primitive: usize,
        attribute: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("primitive {primitive} of mesh {mesh} references vertex {index}, but only {vertex_count} exist")]
    InvalidIndex {
        mesh: usize,
        primitive: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("primitive {primitive} of mesh {mesh} has {index_count} indices, not a whole number of triangles")]
    PartialTriangle {
        mesh: usize,
        primitive: usize,
        index_count: usize,
    },
    #[error("node {node} is its own ancestor")]
    CyclicSceneGraph { node: usize },
    #[error("{pool} pool exhausted: requested {requested}, {available} available")]
    PoolExhausted {
        pool: PoolKind,
        requested: u64,
        available: u64,
    },
    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("texture size {width}x{height} is not supported")]
    InvalidTextureSize { width: u32, height: u32 },
    #[error("no suitable GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Why an image could not be turned into pixels. Never leaves the decoder,
/// a failure there becomes a zero-sized image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image uri '{0}' does not percent-decode to UTF-8")]
    InvalidUri(String),
    #[error("failed to decode data uri: {0}")]
    DataUri(#[from] base64::DecodeError),
    #[error("buffer view range {offset}..{end} is outside a {len} byte buffer")]
    ViewOutOfRange { offset: usize, end: usize, len: usize },
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}
