pub mod assets;
pub mod config;
pub mod draw_list;
pub mod error;
pub mod gpu;
pub mod io;
pub mod job_system;

pub use assets::pool::AssetPool;
pub use config::{PoolConfig, TextureResidencyMode};
pub use error::AssetError;
