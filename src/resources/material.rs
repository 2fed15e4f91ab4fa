//! Material definitions and the scene-wide material registry

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::RwLock;
use thiserror::Error;

/// Shared handle to a registry-owned material. The registry is the
/// long-lived owner; geometry refers to materials by index, never by
/// pointer identity.
pub type MaterialHandle = Arc<RwLock<Material>>;

/// Algorithm used by `set_materials` to generate a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialType {
    /// Fixed rotating palette of saturated colors
    Default,
    /// Randomized color, opacity, reflection and emission
    Random,
    /// Greyscale ramp from dark to light
    ShadesOfGrey,
    /// Linear color gradient across the registry
    Gradient,
}

/// Visual properties of a scene material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Vec3,
    pub opacity: f32,
    pub reflection: f32,
    pub refraction_index: f32,
    pub emission: f32,
    /// Name of a texture in the scene texture cache
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Vec3::splat(0.8),
            opacity: 1.0,
            reflection: 0.0,
            refraction_index: 1.0,
            emission: 0.0,
            texture: None,
        }
    }
}

impl Material {
    pub fn new(color: Vec3) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_reflection(mut self, reflection: f32) -> Self {
        self.reflection = reflection;
        self
    }

    pub fn with_refraction_index(mut self, refraction_index: f32) -> Self {
        self.refraction_index = refraction_index;
        self
    }

    pub fn with_emission(mut self, emission: f32) -> Self {
        self.emission = emission;
        self
    }

    pub fn with_texture(mut self, name: &str) -> Self {
        self.texture = Some(name.to_string());
        self
    }
}

/// Out-of-range material lookup; a caller-contract violation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("material index {index} out of range, registry holds {count} materials")]
pub struct MaterialIndexOutOfRange {
    pub index: usize,
    pub count: usize,
}

const DEFAULT_PALETTE: [Vec3; 6] = [
    Vec3::new(0.9, 0.2, 0.2),
    Vec3::new(0.2, 0.9, 0.2),
    Vec3::new(0.2, 0.2, 0.9),
    Vec3::new(0.9, 0.9, 0.2),
    Vec3::new(0.9, 0.2, 0.9),
    Vec3::new(0.2, 0.9, 0.9),
];

/// Indexed collection of materials shared with geometry and backends.
///
/// `set_materials` replaces the whole registry, invalidating every prior
/// index; geometry referencing old indices is stale until the next
/// geometry build.
#[derive(Default)]
pub struct MaterialRegistry {
    materials: Vec<MaterialHandle>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the registry with `count` generated materials
    pub fn set_materials(&mut self, material_type: MaterialType, count: usize) {
        let seed = RandomState::new();
        self.materials = (0..count)
            .map(|i| Arc::new(RwLock::new(generate(material_type, i, count, &seed))))
            .collect();
    }

    /// Shared handle for material `index`
    pub fn get(&self, index: usize) -> Result<MaterialHandle, MaterialIndexOutOfRange> {
        self.materials
            .get(index)
            .cloned()
            .ok_or(MaterialIndexOutOfRange {
                index,
                count: self.materials.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn handles(&self) -> &[MaterialHandle] {
        &self.materials
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaterialHandle> {
        self.materials.iter()
    }
}

fn generate(
    material_type: MaterialType,
    index: usize,
    count: usize,
    seed: &RandomState,
) -> Material {
    match material_type {
        MaterialType::Default => Material::new(DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()]),
        MaterialType::ShadesOfGrey => {
            let v = (index + 1) as f32 / count.max(1) as f32;
            Material::new(Vec3::splat(v))
        }
        MaterialType::Gradient => {
            let t = if count > 1 {
                index as f32 / (count - 1) as f32
            } else {
                0.0
            };
            Material::new(Vec3::new(1.0, 0.0, 0.0).lerp(Vec3::new(0.0, 1.0, 0.0), t))
        }
        MaterialType::Random => {
            let mut hasher = seed.build_hasher();
            index.hash(&mut hasher);
            let hash = hasher.finish();
            let unit = |shift: u64| ((hash >> shift) % 100) as f32 / 100.0;
            let mut material = Material::new(Vec3::new(unit(0), unit(8), unit(16)));
            // a few transparent, reflective or emissive outliers
            match hash % 10 {
                0 => material.opacity = 0.2 + 0.6 * unit(24),
                1 => material.reflection = 0.5 + 0.5 * unit(24),
                2 => material.emission = unit(24),
                _ => {}
            }
            material
        }
    }
}
