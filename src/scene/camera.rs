//! Camera state and its backend commit contract

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendResult, CameraBackend};

use super::SceneError;

/// Angle tolerance below which the up vector counts as collinear with
/// the view direction
const COLLINEAR_EPSILON: f32 = 1e-6;

/// Camera projection kind; fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraType {
    Perspective,
    Stereo,
    Panoramic,
}

/// The accumulated camera state a backend commit translates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect_ratio: f32,
    pub aperture: f32,
    pub focal_length: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 1.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect_ratio: 1.0,
            aperture: 0.0,
            focal_length: 0.0,
        }
    }
}

/// Serializable camera view for external synchronization, independent of
/// backend commit state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub kind: CameraType,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub up: [f32; 3],
    pub aspect_ratio: f32,
    pub aperture: f32,
    pub focal_length: f32,
}

/// Camera defined by a position, target and up vector.
///
/// Mutations accumulate locally; nothing reaches the backend until an
/// explicit [`Camera::commit`]. The up vector must never be collinear
/// with the view direction; setters enforcing the full basis fail with
/// [`SceneError::DegenerateCameraBasis`].
pub struct Camera {
    kind: CameraType,
    state: CameraState,
    backend: Box<dyn CameraBackend>,
}

impl Camera {
    pub fn new(kind: CameraType, backend: Box<dyn CameraBackend>) -> Self {
        Self {
            kind,
            state: CameraState::default(),
            backend,
        }
    }

    pub fn kind(&self) -> CameraType {
        self.kind
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Set position, target and up vector in one call
    pub fn set(&mut self, position: Vec3, target: Vec3, up: Vec3) -> Result<(), SceneError> {
        check_basis(position, target, up)?;
        self.state.position = position;
        self.state.target = target;
        self.state.up = up;
        Ok(())
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<(), SceneError> {
        check_basis(position, self.state.target, self.state.up)?;
        self.state.position = position;
        Ok(())
    }

    pub fn set_target(&mut self, target: Vec3) -> Result<(), SceneError> {
        check_basis(self.state.position, target, self.state.up)?;
        self.state.target = target;
        Ok(())
    }

    pub fn set_up_vector(&mut self, up: Vec3) -> Result<(), SceneError> {
        check_basis(self.state.position, self.state.target, up)?;
        self.state.up = up;
        Ok(())
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn target(&self) -> Vec3 {
        self.state.target
    }

    pub fn up_vector(&self) -> Vec3 {
        self.state.up
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.state.aspect_ratio = aspect_ratio;
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.state.aspect_ratio
    }

    /// A narrow aperture admits collimated rays only, a wide one blurs
    /// everything away from the focal plane
    pub fn set_aperture(&mut self, aperture: f32) {
        self.state.aperture = aperture;
    }

    pub fn aperture(&self) -> f32 {
        self.state.aperture
    }

    pub fn set_focal_length(&mut self, focal_length: f32) {
        self.state.focal_length = focal_length;
    }

    pub fn focal_length(&self) -> f32 {
        self.state.focal_length
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.state.position, self.state.target, self.state.up)
    }

    /// Translate the accumulated state into the backend's native camera.
    /// Idempotent for unchanged state.
    pub fn commit(&mut self) -> BackendResult<()> {
        self.backend.commit(self.kind, &self.state)
    }

    pub fn backend(&self) -> &dyn CameraBackend {
        self.backend.as_ref()
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            kind: self.kind,
            position: self.state.position.to_array(),
            target: self.state.target.to_array(),
            up: self.state.up.to_array(),
            aspect_ratio: self.state.aspect_ratio,
            aperture: self.state.aperture,
            focal_length: self.state.focal_length,
        }
    }

    /// Apply an externally received snapshot. The type tag is fixed at
    /// construction and not taken from the snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &CameraSnapshot) -> Result<(), SceneError> {
        self.set(
            Vec3::from_array(snapshot.position),
            Vec3::from_array(snapshot.target),
            Vec3::from_array(snapshot.up),
        )?;
        self.state.aspect_ratio = snapshot.aspect_ratio;
        self.state.aperture = snapshot.aperture;
        self.state.focal_length = snapshot.focal_length;
        Ok(())
    }
}

fn check_basis(position: Vec3, target: Vec3, up: Vec3) -> Result<(), SceneError> {
    if (target - position).cross(up).length_squared() <= COLLINEAR_EPSILON {
        return Err(SceneError::DegenerateCameraBasis);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReferenceCamera;

    fn reference_camera() -> Camera {
        Camera::new(CameraType::Perspective, Box::new(ReferenceCamera::new()))
    }

    #[test]
    fn set_rejects_collinear_up() {
        let mut camera = reference_camera();
        let result = camera.set(Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0), Vec3::Y);
        assert!(matches!(result, Err(SceneError::DegenerateCameraBasis)));
        // state untouched after the rejected call
        assert_eq!(camera.target(), Vec3::ZERO);
    }

    #[test]
    fn set_position_cannot_break_the_basis() {
        let mut camera = reference_camera();
        camera.set(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap();
        assert!(camera.set_position(Vec3::new(0.0, 3.0, 0.0)).is_err());
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn commit_is_idempotent_for_unchanged_state() {
        let mut camera = reference_camera();
        camera.set(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y).unwrap();
        camera.commit().unwrap();
        camera.commit().unwrap();
        let backend = camera
            .backend()
            .as_any()
            .downcast_ref::<ReferenceCamera>()
            .unwrap();
        assert_eq!(backend.commit_count(), 2);
        assert_eq!(backend.state_changes(), 1);
        assert_eq!(backend.committed().unwrap().1, *camera.state());
    }

    #[test]
    fn mutation_does_not_reach_backend_before_commit() {
        let mut camera = reference_camera();
        camera.set_aperture(0.5);
        let backend = camera
            .backend()
            .as_any()
            .downcast_ref::<ReferenceCamera>()
            .unwrap();
        assert!(backend.committed().is_none());
    }

    #[test]
    fn snapshot_round_trips_through_apply() {
        let mut camera = reference_camera();
        camera.set(Vec3::new(3.0, 1.0, 4.0), Vec3::X, Vec3::Y).unwrap();
        camera.set_aperture(0.25);
        camera.set_focal_length(35.0);
        let snapshot = camera.snapshot();

        let mut other = reference_camera();
        other.apply_snapshot(&snapshot).unwrap();
        assert_eq!(other.state(), camera.state());
        assert_eq!(other.snapshot(), snapshot);
    }
}
