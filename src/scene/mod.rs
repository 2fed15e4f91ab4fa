//! Scene management
//!
//! The scene is the aggregate root for primitives, meshes, materials,
//! textures and lights, and the driver of the commit protocol that keeps
//! a render backend consistent with the in-memory state. Per frame the
//! supported order is: mutate, then `build_geometry`, `commit_materials`,
//! `commit_lights`, camera commit, and finally the umbrella `commit`.

mod camera;
mod light;

pub use camera::*;
pub use light::*;

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use thiserror::Error;

use crate::backend::{BackendError, RenderBackend};
use crate::geometry::{
    encode_cones, encode_cylinders, encode_spheres, Aabb, CodecError, Cone, Cylinder,
    PrimitiveKind, PrimitiveSet, Sphere, TriangleMesh,
};
use crate::params::{GeometryParameters, SceneEnvironment, SceneParameters};
use crate::resources::{
    MaterialHandle, MaterialIndexOutOfRange, MaterialRegistry, MaterialType, TextureCache,
    TextureData, TextureError,
};

/// Errors surfaced by scene operations.
///
/// Caller-contract violations are reported at the offending call;
/// backend failures are fatal for the frame and propagated unmodified.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error(transparent)]
    MaterialIndex(#[from] MaterialIndexOutOfRange),
    #[error("camera up vector is collinear with the view direction")]
    DegenerateCameraBasis,
    #[error("{0} requires a successful build_geometry first")]
    GeometryNotBuilt(&'static str),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The 3D scene: collections of geometry, materials and light sources,
/// synchronized into a render backend through explicit commits.
///
/// The backend is selected once at construction. Derived state (world
/// bounds, emptiness) is recomputed by [`Scene::build_geometry`] and is
/// only valid after the last successful build.
pub struct Scene {
    scene_parameters: Arc<SceneParameters>,
    geometry_parameters: Arc<GeometryParameters>,
    backend: Box<dyn RenderBackend>,

    spheres: Vec<Sphere>,
    cylinders: Vec<Cylinder>,
    cones: Vec<Cone>,
    meshes: Vec<TriangleMesh>,
    materials: MaterialRegistry,
    textures: TextureCache,
    lights: Vec<Arc<Light>>,

    primitive_set: PrimitiveSet,
    bounds: Aabb,
    is_empty: bool,
    geometry_built: bool,
}

impl Scene {
    pub fn new(
        backend: Box<dyn RenderBackend>,
        scene_parameters: Arc<SceneParameters>,
        geometry_parameters: Arc<GeometryParameters>,
    ) -> Self {
        Self {
            scene_parameters,
            geometry_parameters,
            backend,
            spheres: Vec::new(),
            cylinders: Vec::new(),
            cones: Vec::new(),
            meshes: Vec::new(),
            materials: MaterialRegistry::new(),
            textures: TextureCache::new(),
            lights: Vec::new(),
            primitive_set: PrimitiveSet::default(),
            bounds: Aabb::EMPTY,
            is_empty: true,
            geometry_built: false,
        }
    }

    pub fn scene_parameters(&self) -> &SceneParameters {
        &self.scene_parameters
    }

    pub fn geometry_parameters(&self) -> &GeometryParameters {
        &self.geometry_parameters
    }

    // --- geometry mutation ------------------------------------------------

    pub fn add_sphere(&mut self, sphere: Sphere) -> usize {
        self.spheres.push(sphere);
        self.spheres.len() - 1
    }

    pub fn add_cylinder(&mut self, cylinder: Cylinder) -> usize {
        self.cylinders.push(cylinder);
        self.cylinders.len() - 1
    }

    pub fn add_cone(&mut self, cone: Cone) -> usize {
        self.cones.push(cone);
        self.cones.len() - 1
    }

    pub fn add_mesh(&mut self, mesh: TriangleMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn clear_geometry(&mut self) {
        self.spheres.clear();
        self.cylinders.clear();
        self.cones.clear();
        self.meshes.clear();
    }

    pub fn primitive_count(&self) -> usize {
        self.spheres.len() + self.cylinders.len() + self.cones.len()
    }

    pub fn meshes(&self) -> &[TriangleMesh] {
        &self.meshes
    }

    // --- materials and textures -------------------------------------------

    /// Replace the material registry with `count` generated materials.
    /// Destructive: prior indices are invalidated and geometry referencing
    /// them is stale until the next [`Scene::build_geometry`].
    pub fn set_materials(&mut self, material_type: MaterialType, count: usize) {
        log::info!("creating {count} {material_type:?} materials");
        self.materials.set_materials(material_type, count);
    }

    pub fn get_material(&self, index: usize) -> Result<MaterialHandle, SceneError> {
        Ok(self.materials.get(index)?)
    }

    pub fn materials(&self) -> &MaterialRegistry {
        &self.materials
    }

    /// Load a texture file into the scene cache; idempotent by name
    pub fn load_texture<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<TextureData>, SceneError> {
        Ok(self.textures.load(path)?)
    }

    pub fn add_texture(&mut self, texture: TextureData) -> Arc<TextureData> {
        self.textures.insert(texture)
    }

    pub fn get_texture(&self, name: &str) -> Option<Arc<TextureData>> {
        self.textures.get(name)
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    // --- lights -----------------------------------------------------------

    /// Attach a light source; the returned handle identifies it for removal
    pub fn add_light(&mut self, light: Light) -> Arc<Light> {
        let handle = Arc::new(light);
        self.lights.push(handle.clone());
        handle
    }

    pub fn get_light(&self, index: usize) -> Option<&Arc<Light>> {
        self.lights.get(index)
    }

    /// Remove the first occurrence of `light` by handle identity; a no-op
    /// when the handle is not attached
    pub fn remove_light(&mut self, light: &Arc<Light>) {
        if let Some(position) = self.lights.iter().position(|l| Arc::ptr_eq(l, light)) {
            self.lights.remove(position);
        }
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    pub fn lights(&self) -> &[Arc<Light>] {
        &self.lights
    }

    // --- commit protocol --------------------------------------------------

    /// Encode the primitive collections into packed buffers, recompute the
    /// world bounds and emptiness flag, and hand the result to the backend.
    ///
    /// The primitive set is replaced wholesale, so rebuilding an unchanged
    /// scene is idempotent. On backend failure the derived state may be
    /// ahead of what the backend holds; it is only authoritative after the
    /// last successful build.
    pub fn build_geometry(&mut self) -> Result<(), SceneError> {
        // with `timestamped` set, primitives lacking a timestamp receive
        // the scene timestamp, forcing the field into the packed layout
        let fill = self
            .geometry_parameters
            .timestamped
            .then_some(self.scene_parameters.timestamp);
        let spheres = self.scaled_spheres(fill);
        let cylinders = self.scaled_cylinders(fill);
        let cones = self.scaled_cones(fill);

        let mut set = PrimitiveSet::default();
        if !spheres.is_empty() {
            set.insert(PrimitiveKind::Sphere, encode_spheres(&spheres)?);
        }
        if !cylinders.is_empty() {
            set.insert(PrimitiveKind::Cylinder, encode_cylinders(&cylinders)?);
        }
        if !cones.is_empty() {
            set.insert(PrimitiveKind::Cone, encode_cones(&cones)?);
        }

        let mut bounds = Aabb::EMPTY;
        for sphere in spheres.iter() {
            bounds = bounds.union(&sphere.bounds());
        }
        for cylinder in cylinders.iter() {
            bounds = bounds.union(&cylinder.bounds());
        }
        for cone in cones.iter() {
            bounds = bounds.union(&cone.bounds());
        }
        for mesh in &self.meshes {
            bounds = bounds.union(&mesh.bounds());
        }
        self.bounds = bounds;
        self.is_empty = set.is_empty() && self.meshes.is_empty();

        log::debug!(
            "building geometry: {} primitives, {} meshes",
            set.len(),
            self.meshes.len()
        );
        self.backend.build_geometry(&set, &self.meshes)?;
        self.primitive_set = set;
        self.geometry_built = true;
        Ok(())
    }

    /// Push the material registry to the backend. With `update_only` set,
    /// existing backend materials are refreshed in place instead of being
    /// recreated.
    pub fn commit_materials(&mut self, update_only: bool) -> Result<(), SceneError> {
        if !self.geometry_built {
            return Err(SceneError::GeometryNotBuilt("commit_materials"));
        }
        self.backend
            .commit_materials(self.materials.handles(), &self.textures, update_only)?;
        Ok(())
    }

    /// Push the light collection to the backend, in attachment order
    pub fn commit_lights(&mut self) -> Result<(), SceneError> {
        if !self.geometry_built {
            return Err(SceneError::GeometryNotBuilt("commit_lights"));
        }
        self.backend.commit_lights(&self.lights)?;
        Ok(())
    }

    /// Umbrella backend synchronization; reflects everything built and
    /// committed since the last call. Safe to call repeatedly.
    pub fn commit(&mut self) -> Result<(), SceneError> {
        self.backend.commit()?;
        Ok(())
    }

    /// World bounds of the last successful build
    pub fn world_bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// True when the last build produced no geometry. Implementation-
    /// defined before the first [`Scene::build_geometry`] call.
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Packed buffers of the last successful build
    pub fn primitive_set(&self) -> &PrimitiveSet {
        &self.primitive_set
    }

    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    // --- canned scenes ----------------------------------------------------

    /// Populate a default demo scene: a Cornell-box style room, a
    /// reflective cube, a transparent sphere, a cylinder and a cone.
    /// Writes through the ordinary mutation APIs only.
    pub fn build_default(&mut self) -> Result<(), SceneError> {
        const HALF: f32 = 5.0;
        const SIZE: f32 = HALF * 2.0;

        self.set_materials(MaterialType::Default, 10);
        let white = Vec3::splat(0.8);
        self.get_material(0)?.write().color = white;
        self.get_material(1)?.write().color = white;
        self.get_material(2)?.write().color = white;
        self.get_material(3)?.write().color = Vec3::new(0.8, 0.15, 0.15);
        self.get_material(4)?.write().color = Vec3::new(0.15, 0.8, 0.15);

        // room walls, normals facing inward
        let walls = [
            // floor
            (Vec3::new(-HALF, -HALF, HALF), Vec3::new(SIZE, 0.0, 0.0), Vec3::new(0.0, 0.0, -SIZE), 0),
            // ceiling
            (Vec3::new(-HALF, HALF, -HALF), Vec3::new(SIZE, 0.0, 0.0), Vec3::new(0.0, 0.0, SIZE), 1),
            // back
            (Vec3::new(-HALF, -HALF, -HALF), Vec3::new(SIZE, 0.0, 0.0), Vec3::new(0.0, SIZE, 0.0), 2),
            // left, red
            (Vec3::new(-HALF, -HALF, HALF), Vec3::new(0.0, 0.0, -SIZE), Vec3::new(0.0, SIZE, 0.0), 3),
            // right, green
            (Vec3::new(HALF, -HALF, -HALF), Vec3::new(0.0, 0.0, SIZE), Vec3::new(0.0, SIZE, 0.0), 4),
        ];
        for (origin, edge_u, edge_v, material_id) in walls {
            self.add_mesh(TriangleMesh::quad(origin, edge_u, edge_v, material_id));
        }

        {
            let reflective = self.get_material(5)?;
            let mut material = reflective.write();
            material.color = Vec3::splat(0.9);
            material.reflection = 0.8;
        }
        self.add_mesh(TriangleMesh::cube(Vec3::new(-2.0, -3.5, -2.0), 3.0, 5));

        {
            let transparent = self.get_material(6)?;
            let mut material = transparent.write();
            material.opacity = 0.3;
            material.refraction_index = 1.5;
        }
        self.add_sphere(Sphere::new(Vec3::new(2.0, -3.5, 1.0), 1.5, 6));

        self.add_cylinder(Cylinder::new(
            Vec3::new(-3.5, -5.0, 2.0),
            Vec3::new(-3.5, -2.0, 2.0),
            0.5,
            7,
        ));
        self.add_cone(Cone::new(
            Vec3::new(3.5, -5.0, -2.5),
            Vec3::new(3.5, -2.0, -2.5),
            1.0,
            0.0,
            8,
        ));

        self.add_light(Light::Point(PointLight::new(
            Vec3::new(0.0, HALF - 0.2, 0.0),
            Vec3::ONE,
            1.0,
            SIZE * 2.0,
        )));
        Ok(())
    }

    /// Add an environment around the current geometry, according to the
    /// geometry parameters
    pub fn build_environment(&mut self) {
        let environment = self.geometry_parameters.scene_environment;
        if environment == SceneEnvironment::None {
            return;
        }

        let mut bounds = self.compute_bounds();
        if bounds.is_degenerate() {
            bounds = Aabb::new(-Vec3::ONE, Vec3::ONE);
        }
        let center = bounds.center();
        let size = bounds.size().max(Vec3::ONE);

        match environment {
            SceneEnvironment::None => {}
            SceneEnvironment::Ground => {
                self.add_mesh(TriangleMesh::quad(
                    Vec3::new(
                        center.x - size.x * 1.5,
                        bounds.min.y,
                        center.z + size.z * 1.5,
                    ),
                    Vec3::new(size.x * 3.0, 0.0, 0.0),
                    Vec3::new(0.0, 0.0, -size.z * 3.0),
                    0,
                ));
            }
            SceneEnvironment::Wall => {
                self.add_mesh(TriangleMesh::quad(
                    Vec3::new(
                        center.x - size.x * 1.5,
                        center.y - size.y * 1.5,
                        bounds.min.z - size.z * 0.1,
                    ),
                    Vec3::new(size.x * 3.0, 0.0, 0.0),
                    Vec3::new(0.0, size.y * 3.0, 0.0),
                    0,
                ));
            }
            SceneEnvironment::Box => {
                self.add_mesh(TriangleMesh::cube(center, size.max_element() * 1.5, 0));
            }
        }
    }

    // --- helpers ----------------------------------------------------------

    fn compute_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for sphere in &self.spheres {
            bounds = bounds.union(&sphere.bounds());
        }
        for cylinder in &self.cylinders {
            bounds = bounds.union(&cylinder.bounds());
        }
        for cone in &self.cones {
            bounds = bounds.union(&cone.bounds());
        }
        for mesh in &self.meshes {
            bounds = bounds.union(&mesh.bounds());
        }
        bounds
    }

    fn scaled_spheres(&self, fill: Option<f32>) -> Cow<'_, [Sphere]> {
        let m = self.geometry_parameters.radius_multiplier;
        if m == 1.0 && fill.is_none() {
            Cow::Borrowed(&self.spheres)
        } else {
            Cow::Owned(
                self.spheres
                    .iter()
                    .map(|s| Sphere {
                        radius: s.radius * m,
                        timestamp: s.timestamp.or(fill),
                        ..s.clone()
                    })
                    .collect(),
            )
        }
    }

    fn scaled_cylinders(&self, fill: Option<f32>) -> Cow<'_, [Cylinder]> {
        let m = self.geometry_parameters.radius_multiplier;
        if m == 1.0 && fill.is_none() {
            Cow::Borrowed(&self.cylinders)
        } else {
            Cow::Owned(
                self.cylinders
                    .iter()
                    .map(|c| Cylinder {
                        radius: c.radius * m,
                        timestamp: c.timestamp.or(fill),
                        ..c.clone()
                    })
                    .collect(),
            )
        }
    }

    fn scaled_cones(&self, fill: Option<f32>) -> Cow<'_, [Cone]> {
        let m = self.geometry_parameters.radius_multiplier;
        if m == 1.0 && fill.is_none() {
            Cow::Borrowed(&self.cones)
        } else {
            Cow::Owned(
                self.cones
                    .iter()
                    .map(|c| Cone {
                        center_radius: c.center_radius * m,
                        up_radius: c.up_radius * m,
                        timestamp: c.timestamp.or(fill),
                        ..c.clone()
                    })
                    .collect(),
            )
        }
    }
}
