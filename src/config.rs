use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// Environment variables RenderDoc injects into a captured process.
const RENDERDOC_ENV_VARS: [&str; 5] = [
    "RENDERDOC_CAPFILE",
    "RENDERDOC_CAPOPTS",
    "RENDERDOC_DEBUG_LOG_FILE",
    "RENDERDOC_ORIGLIBPATH",
    "RENDERDOC_ORIGPRELOAD",
];

/// How texture handles are published to shaders.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureResidencyMode {
    /// Sampler-bound bindless handles, made resident after upload.
    Bindless,
    /// The raw texture id doubles as the handle, for capture tools that
    /// cannot follow bindless references.
    BoundUnits,
}

impl TextureResidencyMode {
    pub fn detect() -> Self {
        Self::from_env(|name| std::env::var_os(name).is_some())
    }

    pub fn from_env(is_set: impl Fn(&str) -> bool) -> Self {
        if RENDERDOC_ENV_VARS.iter().any(|name| is_set(name)) {
            TextureResidencyMode::BoundUnits
        } else {
            TextureResidencyMode::Bindless
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PoolConfig {
    pub vertex_pool_bytes: u64,
    pub index_pool_bytes: u64,
    pub material_capacity: u32,
    pub object_capacity: u32,
    pub decode_workers: Option<usize>,
    pub residency: Option<TextureResidencyMode>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            vertex_pool_bytes: 256 << 20,
            index_pool_bytes: 128 << 20,
            material_capacity: 512,
            object_capacity: 65536,
            decode_workers: None,
            residency: None,
        }
    }
}

impl PoolConfig {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        crate::io::load_json(path)
    }

    pub fn residency_mode(&self) -> TextureResidencyMode {
        self.residency.unwrap_or_else(TextureResidencyMode::detect)
    }

    pub fn worker_count(&self) -> usize {
        self.decode_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(4)
            })
            .max(1)
    }
}
