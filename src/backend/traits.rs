//! Backend capability traits
//!
//! A render backend is the engine-specific subsystem that consumes
//! committed scene state to trace frames. This crate never calls into a
//! backend except through these traits; an implementation is selected
//! once at scene/camera construction time.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

use crate::geometry::{CodecError, PrimitiveSet, TriangleMesh};
use crate::resources::{MaterialHandle, TextureCache};
use crate::scene::{CameraState, CameraType, Light};

/// Backend commit failure; fatal for the frame being committed
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to build backend geometry: {0}")]
    GeometryBuildFailed(String),
    #[error("failed to create backend materials: {0}")]
    MaterialCreationFailed(String),
    #[error("failed to commit lights: {0}")]
    LightCommitFailed(String),
    #[error("failed to commit camera: {0}")]
    CameraCommitFailed(String),
    #[error("backend commit failed: {0}")]
    CommitFailed(String),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Scene-side contract every render backend implements.
///
/// Calls arrive in a fixed per-frame order: `build_geometry`, then
/// `commit_materials`, then `commit_lights`, then the umbrella `commit`.
/// All calls are synchronous and may be long-running; a failure aborts
/// the frame and is propagated to the caller unmodified.
pub trait RenderBackend {
    /// Ingest the packed primitive collections and triangle meshes,
    /// replacing any previously built geometry. Must be idempotent for
    /// an unchanged scene.
    fn build_geometry(
        &mut self,
        primitives: &PrimitiveSet,
        meshes: &[TriangleMesh],
    ) -> BackendResult<()>;

    /// Push the material registry. With `update_only` set, only attribute
    /// values are refreshed on existing backend materials; otherwise
    /// materials are recreated from scratch.
    fn commit_materials(
        &mut self,
        materials: &[MaterialHandle],
        textures: &TextureCache,
        update_only: bool,
    ) -> BackendResult<()>;

    /// Push the light collection, preserving its order
    fn commit_lights(&mut self, lights: &[Arc<Light>]) -> BackendResult<()>;

    /// Umbrella synchronization step; safe to call repeatedly and must
    /// reflect everything built/committed since the last call
    fn commit(&mut self) -> BackendResult<()>;

    /// Concrete-type access for backend-specific callers
    fn as_any(&self) -> &dyn Any;
}

/// Camera-side contract every render backend implements.
///
/// Translates the accumulated camera state into the backend's native
/// camera exactly once per call; committing unchanged state repeatedly
/// must produce the same backend configuration.
pub trait CameraBackend {
    fn commit(&mut self, kind: CameraType, state: &CameraState) -> BackendResult<()>;

    /// Concrete-type access for backend-specific callers
    fn as_any(&self) -> &dyn Any;
}
