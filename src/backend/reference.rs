//! In-memory reference backend
//!
//! Decodes committed scene state back into typed records instead of
//! tracing it, validating the packed wire contract on the way in. Serves
//! as the default backend for headless use and as the test double for
//! the commit protocol.

use std::any::Any;
use std::sync::Arc;

use crate::geometry::{
    decode_cones, decode_cylinders, decode_spheres, Cone, Cylinder, PrimitiveKind, PrimitiveSet,
    Sphere, TriangleMesh,
};
use crate::resources::{Material, MaterialHandle, TextureCache};
use crate::scene::{CameraState, CameraType, Light};

use super::traits::{BackendError, BackendResult, CameraBackend, RenderBackend};

/// Reference render backend holding the last committed scene snapshot
#[derive(Default)]
pub struct ReferenceBackend {
    spheres: Vec<Sphere>,
    cylinders: Vec<Cylinder>,
    cones: Vec<Cone>,
    meshes: Vec<TriangleMesh>,
    materials: Vec<Material>,
    /// Bumped every time materials are recreated rather than updated
    material_generation: u32,
    lights: Vec<Light>,
    commit_count: u32,
}

impl ReferenceBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn cylinders(&self) -> &[Cylinder] {
        &self.cylinders
    }

    pub fn cones(&self) -> &[Cone] {
        &self.cones
    }

    pub fn meshes(&self) -> &[TriangleMesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material_generation(&self) -> u32 {
        self.material_generation
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn commit_count(&self) -> u32 {
        self.commit_count
    }

    pub fn primitive_count(&self) -> usize {
        self.spheres.len() + self.cylinders.len() + self.cones.len()
    }
}

impl RenderBackend for ReferenceBackend {
    fn build_geometry(
        &mut self,
        primitives: &PrimitiveSet,
        meshes: &[TriangleMesh],
    ) -> BackendResult<()> {
        // wholesale replacement keeps rebuilds idempotent
        self.spheres = match primitives.get(PrimitiveKind::Sphere) {
            Some(buffer) => decode_spheres(buffer)?,
            None => Vec::new(),
        };
        self.cylinders = match primitives.get(PrimitiveKind::Cylinder) {
            Some(buffer) => decode_cylinders(buffer)?,
            None => Vec::new(),
        };
        self.cones = match primitives.get(PrimitiveKind::Cone) {
            Some(buffer) => decode_cones(buffer)?,
            None => Vec::new(),
        };
        self.meshes = meshes.to_vec();
        log::debug!(
            "reference backend built {} primitives, {} meshes",
            self.primitive_count(),
            self.meshes.len()
        );
        Ok(())
    }

    fn commit_materials(
        &mut self,
        materials: &[MaterialHandle],
        textures: &TextureCache,
        update_only: bool,
    ) -> BackendResult<()> {
        for handle in materials {
            if let Some(name) = &handle.read().texture {
                if textures.get(name).is_none() {
                    return Err(BackendError::MaterialCreationFailed(format!(
                        "material references unknown texture {name:?}"
                    )));
                }
            }
        }
        if update_only {
            if materials.len() != self.materials.len() {
                return Err(BackendError::MaterialCreationFailed(format!(
                    "update-only commit with {} materials, backend holds {}",
                    materials.len(),
                    self.materials.len()
                )));
            }
            for (slot, handle) in self.materials.iter_mut().zip(materials) {
                *slot = handle.read().clone();
            }
        } else {
            self.materials = materials.iter().map(|h| h.read().clone()).collect();
            self.material_generation += 1;
        }
        Ok(())
    }

    fn commit_lights(&mut self, lights: &[Arc<Light>]) -> BackendResult<()> {
        self.lights = lights.iter().map(|l| (**l).clone()).collect();
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.commit_count += 1;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Reference camera backend recording the last committed state
#[derive(Default)]
pub struct ReferenceCamera {
    committed: Option<(CameraType, CameraState)>,
    commit_count: u32,
    /// Bumped only when a commit changes the backend-visible state
    state_changes: u32,
}

impl ReferenceCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Option<&(CameraType, CameraState)> {
        self.committed.as_ref()
    }

    pub fn commit_count(&self) -> u32 {
        self.commit_count
    }

    pub fn state_changes(&self) -> u32 {
        self.state_changes
    }
}

impl CameraBackend for ReferenceCamera {
    fn commit(&mut self, kind: CameraType, state: &CameraState) -> BackendResult<()> {
        self.commit_count += 1;
        let next = (kind, *state);
        if self.committed.as_ref() != Some(&next) {
            self.state_changes += 1;
            self.committed = Some(next);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
