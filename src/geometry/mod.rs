//! Geometric primitives, triangle meshes and bounding volumes
//!
//! Primitives carry the optional per-primitive simulation fields
//! (timestamp, scalar value) in addition to their shape and material
//! reference. The packed wire format consumed by render backends lives
//! in [`codec`].

pub mod codec;

pub use codec::{
    decode_cones, decode_cylinders, decode_spheres, encode_cones, encode_cylinders,
    encode_spheres, CodecError, GeometryField, LayoutBuilder, PackedBuffer, PackedEncoder,
    PackedLayout, PrimitiveSet, ABSENT,
};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Kind tag for a packed primitive collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Sphere,
    Cylinder,
    Cone,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Canonical degenerate box; the union identity
    pub const EMPTY: Self = Self {
        min: Vec3::INFINITY,
        max: Vec3::NEG_INFINITY,
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box to contain `point`
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// True for boxes that contain no points, including [`Aabb::EMPTY`]
    pub fn is_degenerate(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Sphere primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
    pub material_id: u32,
    pub timestamp: Option<f32>,
    pub value: Option<f32>,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32, material_id: u32) -> Self {
        Self {
            center,
            radius,
            material_id,
            timestamp: None,
            value: None,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.center - Vec3::splat(self.radius),
            self.center + Vec3::splat(self.radius),
        )
    }
}

/// Cylinder primitive between two end points
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
    pub material_id: u32,
    pub timestamp: Option<f32>,
    pub value: Option<f32>,
}

impl Cylinder {
    pub fn new(start: Vec3, end: Vec3, radius: f32, material_id: u32) -> Self {
        Self {
            start,
            end,
            radius,
            material_id,
            timestamp: None,
            value: None,
        }
    }

    pub fn bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::new(self.start - r, self.start + r).union(&Aabb::new(self.end - r, self.end + r))
    }
}

/// Truncated cone between a base disc and a top disc
#[derive(Debug, Clone, PartialEq)]
pub struct Cone {
    pub center: Vec3,
    pub up: Vec3,
    pub center_radius: f32,
    pub up_radius: f32,
    pub material_id: u32,
    pub timestamp: Option<f32>,
    pub value: Option<f32>,
}

impl Cone {
    pub fn new(center: Vec3, up: Vec3, center_radius: f32, up_radius: f32, material_id: u32) -> Self {
        Self {
            center,
            up,
            center_radius,
            up_radius,
            material_id,
            timestamp: None,
            value: None,
        }
    }

    pub fn bounds(&self) -> Aabb {
        let rc = Vec3::splat(self.center_radius);
        let ru = Vec3::splat(self.up_radius);
        Aabb::new(self.center - rc, self.center + rc)
            .union(&Aabb::new(self.up - ru, self.up + ru))
    }
}

/// Standard vertex with position, normal and UV
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// An indexed triangle mesh bound to a single material
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material_id: u32,
}

impl TriangleMesh {
    pub fn new(material_id: u32) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            material_id,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex data as bytes, for bulk upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index data as bytes, for bulk upload
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for vertex in &self.vertices {
            bounds.extend(vertex.position);
        }
        bounds
    }

    /// A rectangle spanned by two edge vectors from `origin`, as two triangles
    pub fn quad(origin: Vec3, edge_u: Vec3, edge_v: Vec3, material_id: u32) -> Self {
        let normal = edge_u.cross(edge_v).normalize();
        let mut mesh = Self::new(material_id);
        let corners = [
            (origin, Vec2::new(0.0, 0.0)),
            (origin + edge_u, Vec2::new(1.0, 0.0)),
            (origin + edge_u + edge_v, Vec2::new(1.0, 1.0)),
            (origin + edge_v, Vec2::new(0.0, 1.0)),
        ];
        for (position, uv) in corners {
            mesh.vertices.push(Vertex {
                position,
                normal,
                uv,
            });
        }
        mesh.indices.extend_from_slice(&[0, 1, 2, 0, 2, 3]);
        mesh
    }

    /// An axis-aligned cube centered at `center`
    pub fn cube(center: Vec3, size: f32, material_id: u32) -> Self {
        let h = size * 0.5;
        let faces = [
            // origin offset, edge_u, edge_v per face
            (Vec3::new(-h, -h, h), Vec3::new(size, 0.0, 0.0), Vec3::new(0.0, size, 0.0)),
            (Vec3::new(h, -h, -h), Vec3::new(-size, 0.0, 0.0), Vec3::new(0.0, size, 0.0)),
            (Vec3::new(h, -h, h), Vec3::new(0.0, 0.0, -size), Vec3::new(0.0, size, 0.0)),
            (Vec3::new(-h, -h, -h), Vec3::new(0.0, 0.0, size), Vec3::new(0.0, size, 0.0)),
            (Vec3::new(-h, h, h), Vec3::new(size, 0.0, 0.0), Vec3::new(0.0, 0.0, -size)),
            (Vec3::new(-h, -h, -h), Vec3::new(size, 0.0, 0.0), Vec3::new(0.0, 0.0, size)),
        ];
        let mut mesh = Self::new(material_id);
        for (origin, edge_u, edge_v) in faces {
            let face = Self::quad(center + origin, edge_u, edge_v, material_id);
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&face.vertices);
            mesh.indices.extend(face.indices.iter().map(|i| base + i));
        }
        mesh
    }

    /// A UV sphere with `segments` slices around and `segments / 2 + 1`
    /// rings; `segments` is clamped to 4 so the tessellation stays valid
    pub fn uv_sphere(center: Vec3, radius: f32, segments: u32, material_id: u32) -> Self {
        let segments = segments.max(4);
        let rings = segments / 2;
        let mut mesh = Self::new(material_id);
        for ring in 0..=rings {
            let theta = std::f32::consts::PI * ring as f32 / rings as f32;
            let (sin_t, cos_t) = theta.sin_cos();
            for seg in 0..=segments {
                let phi = std::f32::consts::TAU * seg as f32 / segments as f32;
                let (sin_p, cos_p) = phi.sin_cos();
                let normal = Vec3::new(sin_t * cos_p, cos_t, sin_t * sin_p);
                mesh.vertices.push(Vertex {
                    position: center + normal * radius,
                    normal,
                    uv: Vec2::new(seg as f32 / segments as f32, ring as f32 / rings as f32),
                });
            }
        }
        let stride = segments + 1;
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * stride + seg;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
            }
        }
        mesh
    }
}
