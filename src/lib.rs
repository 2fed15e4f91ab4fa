//! rayviz - scene management and commit synchronization for interactive
//! ray-tracing backends
//!
//! This crate owns the in-memory representation of a 3D scene -
//! primitives, triangle meshes, materials, textures, lights and camera -
//! and synchronizes it into a render backend through an explicit,
//! multi-phase commit protocol. The backend itself (intersection,
//! shading, display) is out of scope and enters only through the
//! capability traits in [`backend`].
//!
//! # Frame cycle
//! Single control thread, frame-cyclic: mutate the [`scene::Scene`],
//! then `build_geometry`, `commit_materials`, `commit_lights`, commit
//! the [`scene::Camera`], and finish with the umbrella `Scene::commit`.
//! Between commits, the [`extensions::ExtensionPluginFactory`] is polled
//! once to let optional modules inject further mutations.
//!
//! # Packed geometry
//! Primitive collections cross the backend boundary as flat byte buffers
//! with a per-field offset table and a single record stride; see
//! [`geometry::codec`].

pub mod backend;
pub mod extensions;
pub mod geometry;
pub mod params;
pub mod resources;
pub mod scene;

pub use backend::{
    BackendError, BackendResult, CameraBackend, ReferenceBackend, ReferenceCamera, RenderBackend,
};
pub use extensions::{ExtensionPlugin, ExtensionPluginFactory, PluginConstructor, PluginError};
pub use geometry::{
    Aabb, Cone, Cylinder, PackedBuffer, PackedLayout, PrimitiveKind, PrimitiveSet, Sphere,
    TriangleMesh, Vertex,
};
pub use params::{ExtensionParameters, GeometryParameters, SceneEnvironment, SceneParameters};
pub use resources::{
    Material, MaterialHandle, MaterialRegistry, MaterialType, TextureCache, TextureData,
};
pub use scene::{
    Camera, CameraSnapshot, CameraState, CameraType, DirectionalLight, Light, PointLight, Scene,
    SceneError,
};
