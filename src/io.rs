use std::path::Path;

use crate::error::AssetError;

pub fn read_binary(path: &Path) -> Result<Vec<u8>, AssetError> {
    std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_text(path: &Path) -> Result<String, AssetError> {
    std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_json<T>(path: &Path) -> Result<T, AssetError>
where
    T: serde::de::DeserializeOwned,
{
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| AssetError::Config {
        path: path.to_path_buf(),
        source,
    })
}
