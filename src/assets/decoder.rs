use std::borrow::Cow;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use log::warn;

use crate::error::ImageError;

/// Where an image's encoded bytes live.
pub enum ImageSource<'a> {
    /// External file, already resolved against the asset directory.
    File(PathBuf),
    /// Bytes the caller already holds as one encoded image. The importer
    /// never builds this, glTF images always arrive as a URI or a view.
    Array(&'a [u8]),
    /// Bytes owned by the source, e.g. a decoded data URI.
    Vector(Vec<u8>),
    /// A byte range inside one of the asset's buffers.
    BufferView {
        buffer: &'a [u8],
        offset: usize,
        length: usize,
    },
}

impl<'a> ImageSource<'a> {
    /// Resolves a glTF image URI relative to `base_dir`. File URIs are
    /// percent-decoded first, so `my%20tex.png` names `my tex.png`.
    pub fn from_uri(uri: &str, base_dir: &Path) -> Result<Self, ImageError> {
        match uri.strip_prefix("data:") {
            Some(data) => Ok(ImageSource::Vector(decode_data_uri(data)?)),
            None => {
                let path = urlencoding::decode(uri).map_err(|_| ImageError::InvalidUri(uri.to_owned()))?;
                Ok(ImageSource::File(base_dir.join(path.as_ref())))
            }
        }
    }

    /// Normalizes every variant into one contiguous byte span.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>, ImageError> {
        match self {
            ImageSource::File(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|source| ImageError::Io {
                    path: path.clone(),
                    source,
                }),
            ImageSource::Array(bytes) => Ok(Cow::Borrowed(*bytes)),
            ImageSource::Vector(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            ImageSource::BufferView {
                buffer,
                offset,
                length,
            } => {
                let end = offset.saturating_add(*length);
                buffer
                    .get(*offset..end)
                    .map(Cow::Borrowed)
                    .ok_or(ImageError::ViewOutOfRange {
                        offset: *offset,
                        end,
                        len: buffer.len(),
                    })
            }
        }
    }
}

/// `data` is everything after `data:`. Only base64 payloads are accepted.
fn decode_data_uri(data: &str) -> Result<Vec<u8>, ImageError> {
    let (header, payload) = data.split_once(',').unwrap_or(("", data));
    if !header.ends_with(";base64") {
        warn!("data uri without ;base64 marker, decoding as base64 anyway");
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

/// One decoded image. `pixels` is always tightly packed RGBA8; `components`
/// and `bits` describe the encoded source.
#[derive(Debug, Clone, Default)]
pub struct ImageRecord {
    pub name: Option<String>,
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub components: u8,
    pub bits: u8,
    pub pixels: Vec<u8>,
}

impl ImageRecord {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

fn try_decode(source: &ImageSource) -> Result<(image::ColorType, image::RgbaImage), ImageError> {
    let bytes = source.bytes()?;
    let img = image::load_from_memory(&bytes)?;
    Ok((img.color(), img.to_rgba8()))
}

/// Decodes to RGBA8. The format comes from the bytes themselves, never from
/// a mime type. A failure is logged and yields a zero-sized record.
pub fn decode_image(index: usize, name: Option<&str>, source: &ImageSource) -> ImageRecord {
    let name = name.map(str::to_owned);
    match try_decode(source) {
        Ok((color, rgba)) => {
            let components = color.channel_count();
            ImageRecord {
                name,
                index,
                width: rgba.width(),
                height: rgba.height(),
                components,
                bits: (color.bits_per_pixel() / components as u16) as u8,
                pixels: rgba.into_raw(),
            }
        }
        Err(e) => {
            warn!("image {} ({}) could not be decoded: {}", index, name.as_deref().unwrap_or("unnamed"), e);
            ImageRecord {
                name,
                index,
                ..Default::default()
            }
        }
    }
}
