//! Configuration parameter objects
//!
//! External collaborators construct these and hand them to the scene,
//! camera and plugin factory at construction time; this layer treats
//! them as read-only configuration, shared via `Arc`.

use glam::Vec3;

/// Parameters defining how the scene is constructed
#[derive(Debug, Clone)]
pub struct SceneParameters {
    pub background_color: Vec3,
    /// Simulation timestamp selecting which timestamped primitives render
    pub timestamp: f32,
    /// Texture name used for environment mapping, if any
    pub environment_map: Option<String>,
}

impl Default for SceneParameters {
    fn default() -> Self {
        Self {
            background_color: Vec3::ZERO,
            timestamp: 0.0,
            environment_map: None,
        }
    }
}

/// Canned environment added around the loaded geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneEnvironment {
    #[default]
    None,
    Ground,
    Wall,
    Box,
}

/// Parameters defining how geometry is constructed
#[derive(Debug, Clone)]
pub struct GeometryParameters {
    pub scene_environment: SceneEnvironment,
    /// Scales every primitive radius at build time
    pub radius_multiplier: f32,
    /// Stamp primitives without a timestamp with the scene timestamp at
    /// build time, so the packed buffers always carry the field
    pub timestamped: bool,
}

impl Default for GeometryParameters {
    fn default() -> Self {
        Self {
            scene_environment: SceneEnvironment::None,
            radius_multiplier: 1.0,
            timestamped: false,
        }
    }
}

/// Parameters for the optional extension plugins
#[derive(Debug, Clone)]
pub struct ExtensionParameters {
    /// Endpoint of the remote-control service, if enabled
    pub control_endpoint: Option<String>,
    /// Host of the image streaming service, if enabled
    pub stream_host: Option<String>,
    pub stream_port: u16,
}

impl Default for ExtensionParameters {
    fn default() -> Self {
        Self {
            control_endpoint: None,
            stream_host: None,
            stream_port: 1705,
        }
    }
}
