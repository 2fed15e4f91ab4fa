//! Texture loading and the name-keyed texture cache

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use image::GenericImageView;
use thiserror::Error;

/// Texture loading failure
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("failed to load texture {name}: {source}")]
    Decode {
        name: String,
        source: image::ImageError,
    },
}

/// A loaded RGBA8 image asset. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl TextureData {
    /// Load a texture from a file, named after the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let img = image::open(path).map_err(|source| TextureError::Decode {
            name: name.clone(),
            source,
        })?;
        Ok(Self::from_image(img, &name))
    }

    /// Decode a texture from an in-memory encoded image
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, TextureError> {
        let img = image::load_from_memory(bytes).map_err(|source| TextureError::Decode {
            name: name.to_string(),
            source,
        })?;
        Ok(Self::from_image(img, name))
    }

    fn from_image(img: image::DynamicImage, name: &str) -> Self {
        let (width, height) = img.dimensions();
        Self {
            name: name.to_string(),
            width,
            height,
            data: img.to_rgba8().into_raw(),
        }
    }

    /// A 1x1 solid color texture
    pub fn solid_color(color: [u8; 4], name: &str) -> Self {
        Self {
            name: name.to_string(),
            width: 1,
            height: 1,
            data: color.to_vec(),
        }
    }

    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255], "white")
    }

    /// A `size` x `size` checkerboard with 8-pixel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4], name: &str) -> Self {
        let mut data = Vec::with_capacity(size as usize * size as usize * 4);
        for y in 0..size {
            for x in 0..size {
                let is_even = ((x / 8) + (y / 8)) % 2 == 0;
                data.extend_from_slice(if is_even { &color1 } else { &color2 });
            }
        }
        Self {
            name: name.to_string(),
            width: size,
            height: size,
            data,
        }
    }
}

/// Scene-owned texture assets, keyed by name.
///
/// Loading the same name twice returns the cached asset rather than
/// duplicating it; textures are immutable and safely shared by `Arc`.
#[derive(Default)]
pub struct TextureCache {
    textures: HashMap<String, Arc<TextureData>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a texture file, or return the already-cached asset of the
    /// same name
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<TextureData>, TextureError> {
        let name = path
            .as_ref()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        if let Some(existing) = self.textures.get(&name) {
            return Ok(existing.clone());
        }
        let texture = Arc::new(TextureData::from_file(path)?);
        self.textures.insert(name, texture.clone());
        Ok(texture)
    }

    /// Insert a procedural texture; an existing asset of the same name wins
    pub fn insert(&mut self, texture: TextureData) -> Arc<TextureData> {
        self.textures
            .entry(texture.name.clone())
            .or_insert_with(|| Arc::new(texture))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<TextureData>> {
        self.textures.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
