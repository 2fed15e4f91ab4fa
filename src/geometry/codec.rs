//! Packed geometry buffer codec
//!
//! Render backends ingest primitive collections as one contiguous byte
//! buffer per kind: `count` fixed-size records of `stride` bytes, with a
//! per-field byte offset table describing where each field starts inside
//! a record. A field that is not present in a collection carries the
//! [`ABSENT`] sentinel in the raw offset table, never a shortened buffer.
//!
//! Reading field `f` of record `n` resolves to
//! `bytes[n * stride + offset(f) ..]`; all arithmetic here is checked.

use std::collections::HashMap;

use glam::Vec3;
use thiserror::Error;

use super::{Cone, Cylinder, PrimitiveKind, Sphere};

/// Sentinel offset marking a field as not present in a layout
pub const ABSENT: u32 = u32::MAX;

/// Fields a packed primitive record may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryField {
    Center,
    Start,
    End,
    Up,
    Radius,
    CenterRadius,
    UpRadius,
    MaterialId,
    Timestamp,
    Value,
}

/// Packed-buffer misuse errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("field {0:?} is not present in this layout")]
    FieldAbsent(GeometryField),
    #[error("record index {index} out of range, buffer holds {count} records")]
    RecordOutOfRange { index: u32, count: u32 },
    #[error("no open record, call begin_record before writing fields")]
    NoOpenRecord,
}

/// Builds a [`PackedLayout`] by registering fields in record order.
///
/// Offsets honor each field's natural alignment; the stride is the total
/// record size rounded up to the largest registered alignment.
pub struct LayoutBuilder {
    fields: Vec<(GeometryField, u32, u32)>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, field: GeometryField, size: u32, align: u32) -> Self {
        debug_assert!(align.is_power_of_two());
        debug_assert!(!self.fields.iter().any(|(f, _, _)| *f == field));
        self.fields.push((field, size, align));
        self
    }

    pub fn vec3(self, field: GeometryField) -> Self {
        self.field(field, 12, 4)
    }

    pub fn f32(self, field: GeometryField) -> Self {
        self.field(field, 4, 4)
    }

    pub fn u32(self, field: GeometryField) -> Self {
        self.field(field, 4, 4)
    }

    pub fn finish(self) -> PackedLayout {
        let mut offsets = HashMap::with_capacity(self.fields.len());
        let mut sizes = HashMap::with_capacity(self.fields.len());
        let mut cursor = 0u32;
        let mut max_align = 1u32;
        for (field, size, align) in self.fields {
            cursor = align_up(cursor, align);
            offsets.insert(field, cursor);
            sizes.insert(field, size);
            cursor += size;
            max_align = max_align.max(align);
        }
        PackedLayout {
            stride: align_up(cursor, max_align).max(1),
            offsets,
            sizes,
        }
    }
}

impl Default for LayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

/// Record layout of a packed primitive collection: a single stride plus a
/// byte offset per present field. Immutable once built.
#[derive(Debug, Clone)]
pub struct PackedLayout {
    stride: u32,
    offsets: HashMap<GeometryField, u32>,
    sizes: HashMap<GeometryField, u32>,
}

impl PackedLayout {
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Byte offset of `field` within a record, `None` when absent
    pub fn field_offset(&self, field: GeometryField) -> Option<u32> {
        self.offsets.get(&field).copied()
    }

    /// Raw offset table entry: a valid offset or [`ABSENT`]
    pub fn raw_offset(&self, field: GeometryField) -> u32 {
        self.field_offset(field).unwrap_or(ABSENT)
    }

    pub fn has_field(&self, field: GeometryField) -> bool {
        self.offsets.contains_key(&field)
    }

    fn field_range(&self, field: GeometryField) -> Result<std::ops::Range<usize>, CodecError> {
        let offset = self
            .field_offset(field)
            .ok_or(CodecError::FieldAbsent(field))?;
        let size = self.sizes[&field];
        Ok(offset as usize..(offset + size) as usize)
    }
}

/// One-shot encoder producing an immutable [`PackedBuffer`].
///
/// Changing field presence requires building a new layout and re-encoding
/// the whole collection; finished buffers are never patched in place.
pub struct PackedEncoder {
    layout: PackedLayout,
    bytes: Vec<u8>,
    count: u32,
}

impl PackedEncoder {
    pub fn new(layout: PackedLayout) -> Self {
        Self {
            layout,
            bytes: Vec::new(),
            count: 0,
        }
    }

    pub fn with_capacity(layout: PackedLayout, records: usize) -> Self {
        let capacity = layout.stride as usize * records;
        Self {
            layout,
            bytes: Vec::with_capacity(capacity),
            count: 0,
        }
    }

    /// Open the next record, zero-initialized
    pub fn begin_record(&mut self) {
        self.bytes.resize(self.bytes.len() + self.layout.stride as usize, 0);
        self.count += 1;
    }

    fn write(&mut self, field: GeometryField, data: &[u8]) -> Result<(), CodecError> {
        if self.count == 0 {
            return Err(CodecError::NoOpenRecord);
        }
        let range = self.layout.field_range(field)?;
        let base = (self.count - 1) as usize * self.layout.stride as usize;
        self.bytes[base + range.start..base + range.end].copy_from_slice(data);
        Ok(())
    }

    pub fn write_f32(&mut self, field: GeometryField, value: f32) -> Result<(), CodecError> {
        self.write(field, bytemuck::bytes_of(&value))
    }

    pub fn write_u32(&mut self, field: GeometryField, value: u32) -> Result<(), CodecError> {
        self.write(field, bytemuck::bytes_of(&value))
    }

    pub fn write_vec3(&mut self, field: GeometryField, value: Vec3) -> Result<(), CodecError> {
        self.write(field, bytemuck::bytes_of(&value.to_array()))
    }

    pub fn finish(self) -> PackedBuffer {
        debug_assert_eq!(
            self.bytes.len(),
            self.count as usize * self.layout.stride as usize
        );
        PackedBuffer {
            layout: self.layout,
            bytes: self.bytes,
            count: self.count,
        }
    }
}

/// A finalized packed primitive collection: layout metadata plus
/// `count * stride` bytes. Replaced wholesale on rebuild.
#[derive(Debug, Clone)]
pub struct PackedBuffer {
    layout: PackedLayout,
    bytes: Vec<u8>,
    count: u32,
}

impl PackedBuffer {
    pub fn layout(&self) -> &PackedLayout {
        &self.layout
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn stride(&self) -> u32 {
        self.layout.stride
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The raw byte range handed to the backend
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn field_slice(&self, field: GeometryField, index: u32) -> Result<&[u8], CodecError> {
        if index >= self.count {
            return Err(CodecError::RecordOutOfRange {
                index,
                count: self.count,
            });
        }
        let range = self.layout.field_range(field)?;
        let base = index as usize * self.layout.stride as usize;
        Ok(&self.bytes[base + range.start..base + range.end])
    }

    pub fn read_f32(&self, field: GeometryField, index: u32) -> Result<f32, CodecError> {
        Ok(bytemuck::pod_read_unaligned(self.field_slice(field, index)?))
    }

    pub fn read_u32(&self, field: GeometryField, index: u32) -> Result<u32, CodecError> {
        Ok(bytemuck::pod_read_unaligned(self.field_slice(field, index)?))
    }

    pub fn read_vec3(&self, field: GeometryField, index: u32) -> Result<Vec3, CodecError> {
        let array: [f32; 3] = bytemuck::pod_read_unaligned(self.field_slice(field, index)?);
        Ok(Vec3::from_array(array))
    }
}

/// The packed buffers of a built scene, one per populated primitive kind
#[derive(Debug, Clone, Default)]
pub struct PrimitiveSet {
    buffers: HashMap<PrimitiveKind, PackedBuffer>,
}

impl PrimitiveSet {
    pub fn insert(&mut self, kind: PrimitiveKind, buffer: PackedBuffer) {
        self.buffers.insert(kind, buffer);
    }

    pub fn get(&self, kind: PrimitiveKind) -> Option<&PackedBuffer> {
        self.buffers.get(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = PrimitiveKind> + '_ {
        self.buffers.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total primitive count across all kinds
    pub fn len(&self) -> usize {
        self.buffers.values().map(|b| b.count() as usize).sum()
    }
}

fn extended_layout(base: LayoutBuilder, timestamp: bool, value: bool) -> PackedLayout {
    let mut builder = base.u32(GeometryField::MaterialId);
    if timestamp {
        builder = builder.f32(GeometryField::Timestamp);
    }
    if value {
        builder = builder.f32(GeometryField::Value);
    }
    builder.finish()
}

/// Encode a sphere collection. Timestamp/value fields are packed iff any
/// sphere in the collection carries them.
pub fn encode_spheres(spheres: &[Sphere]) -> Result<PackedBuffer, CodecError> {
    let timestamp = spheres.iter().any(|s| s.timestamp.is_some());
    let value = spheres.iter().any(|s| s.value.is_some());
    let layout = extended_layout(
        LayoutBuilder::new()
            .vec3(GeometryField::Center)
            .f32(GeometryField::Radius),
        timestamp,
        value,
    );
    let mut encoder = PackedEncoder::with_capacity(layout, spheres.len());
    for sphere in spheres {
        encoder.begin_record();
        encoder.write_vec3(GeometryField::Center, sphere.center)?;
        encoder.write_f32(GeometryField::Radius, sphere.radius)?;
        encoder.write_u32(GeometryField::MaterialId, sphere.material_id)?;
        if timestamp {
            encoder.write_f32(GeometryField::Timestamp, sphere.timestamp.unwrap_or(0.0))?;
        }
        if value {
            encoder.write_f32(GeometryField::Value, sphere.value.unwrap_or(0.0))?;
        }
    }
    Ok(encoder.finish())
}

/// Decode a sphere collection; the inverse of [`encode_spheres`]
pub fn decode_spheres(buffer: &PackedBuffer) -> Result<Vec<Sphere>, CodecError> {
    let mut spheres = Vec::with_capacity(buffer.count() as usize);
    for i in 0..buffer.count() {
        spheres.push(Sphere {
            center: buffer.read_vec3(GeometryField::Center, i)?,
            radius: buffer.read_f32(GeometryField::Radius, i)?,
            material_id: buffer.read_u32(GeometryField::MaterialId, i)?,
            timestamp: read_optional(buffer, GeometryField::Timestamp, i)?,
            value: read_optional(buffer, GeometryField::Value, i)?,
        });
    }
    Ok(spheres)
}

pub fn encode_cylinders(cylinders: &[Cylinder]) -> Result<PackedBuffer, CodecError> {
    let timestamp = cylinders.iter().any(|c| c.timestamp.is_some());
    let value = cylinders.iter().any(|c| c.value.is_some());
    let layout = extended_layout(
        LayoutBuilder::new()
            .vec3(GeometryField::Start)
            .vec3(GeometryField::End)
            .f32(GeometryField::Radius),
        timestamp,
        value,
    );
    let mut encoder = PackedEncoder::with_capacity(layout, cylinders.len());
    for cylinder in cylinders {
        encoder.begin_record();
        encoder.write_vec3(GeometryField::Start, cylinder.start)?;
        encoder.write_vec3(GeometryField::End, cylinder.end)?;
        encoder.write_f32(GeometryField::Radius, cylinder.radius)?;
        encoder.write_u32(GeometryField::MaterialId, cylinder.material_id)?;
        if timestamp {
            encoder.write_f32(GeometryField::Timestamp, cylinder.timestamp.unwrap_or(0.0))?;
        }
        if value {
            encoder.write_f32(GeometryField::Value, cylinder.value.unwrap_or(0.0))?;
        }
    }
    Ok(encoder.finish())
}

pub fn decode_cylinders(buffer: &PackedBuffer) -> Result<Vec<Cylinder>, CodecError> {
    let mut cylinders = Vec::with_capacity(buffer.count() as usize);
    for i in 0..buffer.count() {
        cylinders.push(Cylinder {
            start: buffer.read_vec3(GeometryField::Start, i)?,
            end: buffer.read_vec3(GeometryField::End, i)?,
            radius: buffer.read_f32(GeometryField::Radius, i)?,
            material_id: buffer.read_u32(GeometryField::MaterialId, i)?,
            timestamp: read_optional(buffer, GeometryField::Timestamp, i)?,
            value: read_optional(buffer, GeometryField::Value, i)?,
        });
    }
    Ok(cylinders)
}

pub fn encode_cones(cones: &[Cone]) -> Result<PackedBuffer, CodecError> {
    let timestamp = cones.iter().any(|c| c.timestamp.is_some());
    let value = cones.iter().any(|c| c.value.is_some());
    let layout = extended_layout(
        LayoutBuilder::new()
            .vec3(GeometryField::Center)
            .vec3(GeometryField::Up)
            .f32(GeometryField::CenterRadius)
            .f32(GeometryField::UpRadius),
        timestamp,
        value,
    );
    let mut encoder = PackedEncoder::with_capacity(layout, cones.len());
    for cone in cones {
        encoder.begin_record();
        encoder.write_vec3(GeometryField::Center, cone.center)?;
        encoder.write_vec3(GeometryField::Up, cone.up)?;
        encoder.write_f32(GeometryField::CenterRadius, cone.center_radius)?;
        encoder.write_f32(GeometryField::UpRadius, cone.up_radius)?;
        encoder.write_u32(GeometryField::MaterialId, cone.material_id)?;
        if timestamp {
            encoder.write_f32(GeometryField::Timestamp, cone.timestamp.unwrap_or(0.0))?;
        }
        if value {
            encoder.write_f32(GeometryField::Value, cone.value.unwrap_or(0.0))?;
        }
    }
    Ok(encoder.finish())
}

pub fn decode_cones(buffer: &PackedBuffer) -> Result<Vec<Cone>, CodecError> {
    let mut cones = Vec::with_capacity(buffer.count() as usize);
    for i in 0..buffer.count() {
        cones.push(Cone {
            center: buffer.read_vec3(GeometryField::Center, i)?,
            up: buffer.read_vec3(GeometryField::Up, i)?,
            center_radius: buffer.read_f32(GeometryField::CenterRadius, i)?,
            up_radius: buffer.read_f32(GeometryField::UpRadius, i)?,
            material_id: buffer.read_u32(GeometryField::MaterialId, i)?,
            timestamp: read_optional(buffer, GeometryField::Timestamp, i)?,
            value: read_optional(buffer, GeometryField::Value, i)?,
        });
    }
    Ok(cones)
}

fn read_optional(
    buffer: &PackedBuffer,
    field: GeometryField,
    index: u32,
) -> Result<Option<f32>, CodecError> {
    if buffer.layout().has_field(field) {
        Ok(Some(buffer.read_f32(field, index)?))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_offsets_are_aligned_and_within_stride() {
        let layout = LayoutBuilder::new()
            .vec3(GeometryField::Center)
            .f32(GeometryField::Radius)
            .u32(GeometryField::MaterialId)
            .finish();
        assert_eq!(layout.field_offset(GeometryField::Center), Some(0));
        assert_eq!(layout.field_offset(GeometryField::Radius), Some(12));
        assert_eq!(layout.field_offset(GeometryField::MaterialId), Some(16));
        assert_eq!(layout.stride(), 20);
        for field in [
            GeometryField::Center,
            GeometryField::Radius,
            GeometryField::MaterialId,
        ] {
            let offset = layout.field_offset(field).unwrap();
            assert!(offset < layout.stride());
            assert_eq!(offset % 4, 0);
        }
    }

    #[test]
    fn absent_field_reports_sentinel() {
        let layout = LayoutBuilder::new().vec3(GeometryField::Center).finish();
        assert_eq!(layout.field_offset(GeometryField::Timestamp), None);
        assert_eq!(layout.raw_offset(GeometryField::Timestamp), ABSENT);
        assert!(!layout.has_field(GeometryField::Timestamp));
    }

    #[test]
    fn buffer_size_is_count_times_stride() {
        let spheres: Vec<Sphere> = (0..7)
            .map(|i| Sphere::new(Vec3::splat(i as f32), 1.0, i))
            .collect();
        let buffer = encode_spheres(&spheres).unwrap();
        assert_eq!(buffer.count(), 7);
        assert_eq!(
            buffer.bytes().len(),
            buffer.count() as usize * buffer.stride() as usize
        );
    }

    #[test]
    fn sphere_round_trip_without_extended_fields() {
        let spheres = vec![
            Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.25, 4),
            Sphere::new(Vec3::new(-1.0, 0.5, 9.0), 2.0, 0),
        ];
        let buffer = encode_spheres(&spheres).unwrap();
        assert!(!buffer.layout().has_field(GeometryField::Timestamp));
        assert!(!buffer.layout().has_field(GeometryField::Value));
        assert_eq!(decode_spheres(&buffer).unwrap(), spheres);
    }

    #[test]
    fn sphere_round_trip_with_extended_fields() {
        let mut spheres = vec![
            Sphere::new(Vec3::ZERO, 1.0, 1),
            Sphere::new(Vec3::ONE, 2.0, 2),
        ];
        spheres[0].timestamp = Some(3.5);
        spheres[1].value = Some(-0.25);
        let buffer = encode_spheres(&spheres).unwrap();
        // presence is collection-wide, unset members decode as the default
        let decoded = decode_spheres(&buffer).unwrap();
        assert_eq!(decoded[0].timestamp, Some(3.5));
        assert_eq!(decoded[1].timestamp, Some(0.0));
        assert_eq!(decoded[0].value, Some(0.0));
        assert_eq!(decoded[1].value, Some(-0.25));
    }

    #[test]
    fn cylinder_round_trip() {
        let mut cylinders = vec![
            Cylinder::new(Vec3::ZERO, Vec3::Y, 0.1, 3),
            Cylinder::new(Vec3::X, Vec3::new(4.0, 5.0, 6.0), 0.7, 8),
        ];
        cylinders[0].timestamp = Some(1.0);
        cylinders[1].timestamp = Some(2.0);
        let buffer = encode_cylinders(&cylinders).unwrap();
        assert_eq!(decode_cylinders(&buffer).unwrap(), cylinders);
    }

    #[test]
    fn cone_round_trip() {
        let cones = vec![
            Cone::new(Vec3::ZERO, Vec3::Y, 1.0, 0.0, 2),
            Cone::new(Vec3::X, Vec3::new(1.0, 3.0, 0.0), 0.5, 0.25, 5),
        ];
        let buffer = encode_cones(&cones).unwrap();
        assert_eq!(decode_cones(&buffer).unwrap(), cones);
    }

    #[test]
    fn reads_are_bounds_checked() {
        let buffer = encode_spheres(&[Sphere::new(Vec3::ZERO, 1.0, 0)]).unwrap();
        assert!(matches!(
            buffer.read_f32(GeometryField::Radius, 1),
            Err(CodecError::RecordOutOfRange { index: 1, count: 1 })
        ));
        assert!(matches!(
            buffer.read_f32(GeometryField::Timestamp, 0),
            Err(CodecError::FieldAbsent(GeometryField::Timestamp))
        ));
    }

    #[test]
    fn write_before_begin_record_is_rejected() {
        let layout = LayoutBuilder::new().f32(GeometryField::Radius).finish();
        let mut encoder = PackedEncoder::new(layout);
        assert!(matches!(
            encoder.write_f32(GeometryField::Radius, 1.0),
            Err(CodecError::NoOpenRecord)
        ));
    }

    #[test]
    fn empty_collection_encodes_to_empty_buffer() {
        let buffer = encode_spheres(&[]).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.bytes().is_empty());
    }
}
