pub mod decoder;
pub mod geometry;
pub mod import;
pub mod loader;
pub mod material;
pub mod mega_buffer;
pub mod model;
pub mod pool;
pub mod sampler_cache;
pub mod scene_graph;
pub mod texture;

pub use import::{import_scene, ImportedScene};
pub use loader::LoaderThread;
pub use pool::AssetPool;
