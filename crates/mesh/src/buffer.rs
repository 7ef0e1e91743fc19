//! Channel-based mesh buffer.
//!
//! A [`MeshBuffer`] is the exchange format between the chunking engine and
//! the algorithms around it. Geometry and attributes are stored as named,
//! typed channels. Only two channels are mandatory: vertex `positions`
//! (float, width 3) and `face_indices` (uint, width 3). Everything else
//! (normals, colors, texture coordinates, materials) is carried generically.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;

/// Vertex positions, float × 3
pub const POSITIONS: &str = "positions";
/// Triangle vertex indices, uint × 3
pub const FACE_INDICES: &str = "face_indices";
/// Per-vertex normals, float × 3
pub const NORMALS: &str = "normals";
/// Per-vertex colors, uchar × 3 or × 4
pub const COLORS: &str = "colors";
/// Per-vertex texture coordinates, float × 2
pub const TEXCOORDS: &str = "texcoords";
/// Per-face normals, float × 3
pub const FACE_NORMALS: &str = "face_normals";
/// Per-face colors, uchar × 3 or × 4
pub const FACE_COLORS: &str = "face_colors";
/// Per-face material indices, uint × 1
pub const FACE_MATERIALS: &str = "face_materials";

/// Element type of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Float,
    UChar,
    UInt,
}

/// Flat storage of a channel's values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelData {
    Float(Vec<f32>),
    UChar(Vec<u8>),
    UInt(Vec<u32>),
}

impl ChannelData {
    fn value_count(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::UChar(v) => v.len(),
            Self::UInt(v) => v.len(),
        }
    }

    fn element_type(&self) -> ChannelType {
        match self {
            Self::Float(_) => ChannelType::Float,
            Self::UChar(_) => ChannelType::UChar,
            Self::UInt(_) => ChannelType::UInt,
        }
    }
}

/// Errors that can occur while building or reading mesh buffers
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshBufferError {
    #[error("Mesh buffer has no '{0}' channel")]
    MissingChannel(String),
    #[error("Channel '{name}' must be {expected_type:?} x {expected_width}, got {actual_type:?} x {actual_width}")]
    WrongLayout {
        name: String,
        expected_type: ChannelType,
        expected_width: usize,
        actual_type: ChannelType,
        actual_width: usize,
    },
    #[error("Channel '{name}' has {actual} elements, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Channel width {width} must be positive and divide the value count {values}")]
    InvalidWidth { width: usize, values: usize },
    #[error("Cannot copy between channels of {src:?} x {src_width} and {dst:?} x {dst_width}")]
    Incompatible {
        src: ChannelType,
        src_width: usize,
        dst: ChannelType,
        dst_width: usize,
    },
    #[error("Element {index} out of range for channel of {len} elements")]
    ElementOutOfRange { index: usize, len: usize },
    #[error("Face {face} references vertex {index}, but only {num_vertices} vertices exist")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        num_vertices: usize,
    },
    #[error("Channel name '{0}' is reserved")]
    ReservedName(String),
}

/// A typed attribute channel with a fixed number of values per element.
///
/// Deserialization goes through [`Channel::new`], so a stored channel with a
/// zero width or a ragged value count is rejected on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChannel")]
pub struct Channel {
    width: usize,
    data: ChannelData,
}

/// Unchecked serialized form of a [`Channel`]
#[derive(Deserialize)]
struct RawChannel {
    width: usize,
    data: ChannelData,
}

impl TryFrom<RawChannel> for Channel {
    type Error = MeshBufferError;

    fn try_from(raw: RawChannel) -> Result<Self, Self::Error> {
        Channel::new(raw.width, raw.data)
    }
}

impl Channel {
    /// Wrap flat data, checking that `width` divides it.
    pub fn new(width: usize, data: ChannelData) -> Result<Self, MeshBufferError> {
        let values = data.value_count();
        if width == 0 || values % width != 0 {
            return Err(MeshBufferError::InvalidWidth { width, values });
        }
        Ok(Self { width, data })
    }

    pub fn floats(width: usize, data: Vec<f32>) -> Result<Self, MeshBufferError> {
        Self::new(width, ChannelData::Float(data))
    }

    pub fn uchars(width: usize, data: Vec<u8>) -> Result<Self, MeshBufferError> {
        Self::new(width, ChannelData::UChar(data))
    }

    pub fn uints(width: usize, data: Vec<u32>) -> Result<Self, MeshBufferError> {
        Self::new(width, ChannelData::UInt(data))
    }

    /// Float × 3 channel from packed vectors.
    pub fn from_vec3(values: &[[f32; 3]]) -> Self {
        Self {
            width: 3,
            data: ChannelData::Float(bytemuck::cast_slice::<[f32; 3], f32>(values).to_vec()),
        }
    }

    /// UInt × 3 channel from packed triangles.
    pub fn from_triangles(values: &[[u32; 3]]) -> Self {
        Self {
            width: 3,
            data: ChannelData::UInt(bytemuck::cast_slice::<[u32; 3], u32>(values).to_vec()),
        }
    }

    /// An empty channel with the same type and width as `self`.
    pub fn empty_like(&self) -> Self {
        let data = match &self.data {
            ChannelData::Float(_) => ChannelData::Float(Vec::new()),
            ChannelData::UChar(_) => ChannelData::UChar(Vec::new()),
            ChannelData::UInt(_) => ChannelData::UInt(Vec::new()),
        };
        Self {
            width: self.width,
            data,
        }
    }

    /// Values per element
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn element_type(&self) -> ChannelType {
        self.data.element_type()
    }

    /// Number of elements (not values)
    #[inline]
    pub fn len(&self) -> usize {
        self.data
            .value_count()
            .checked_div(self.width)
            .unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data(&self) -> &ChannelData {
        &self.data
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match &self.data {
            ChannelData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uchars(&self) -> Option<&[u8]> {
        match &self.data {
            ChannelData::UChar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uints(&self) -> Option<&[u32]> {
        match &self.data {
            ChannelData::UInt(v) => Some(v),
            _ => None,
        }
    }

    /// Whether elements can be copied between the two channels.
    pub fn is_compatible(&self, other: &Channel) -> bool {
        self.width == other.width && self.element_type() == other.element_type()
    }

    fn check_compatible(&self, src: &Channel) -> Result<(), MeshBufferError> {
        if self.is_compatible(src) {
            Ok(())
        } else {
            Err(MeshBufferError::Incompatible {
                src: src.element_type(),
                src_width: src.width,
                dst: self.element_type(),
                dst_width: self.width,
            })
        }
    }

    fn check_index(&self, index: usize) -> Result<(), MeshBufferError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(MeshBufferError::ElementOutOfRange {
                index,
                len: self.len(),
            })
        }
    }

    /// Append element `index` of `src` to this channel.
    pub fn push_from(&mut self, src: &Channel, index: usize) -> Result<(), MeshBufferError> {
        self.check_compatible(src)?;
        src.check_index(index)?;
        let range = index * self.width..(index + 1) * self.width;
        match (&mut self.data, &src.data) {
            (ChannelData::Float(dst), ChannelData::Float(s)) => dst.extend_from_slice(&s[range]),
            (ChannelData::UChar(dst), ChannelData::UChar(s)) => dst.extend_from_slice(&s[range]),
            (ChannelData::UInt(dst), ChannelData::UInt(s)) => dst.extend_from_slice(&s[range]),
            _ => unreachable!("layout checked above"),
        }
        Ok(())
    }

    /// Append the blend of several elements of `src`.
    ///
    /// Float and uchar values are averaged component-wise (uchar rounds to
    /// nearest). UInt values are indices or labels and cannot be averaged, so
    /// the first element is copied.
    pub fn push_blend_from(
        &mut self,
        src: &Channel,
        indices: &[usize],
    ) -> Result<(), MeshBufferError> {
        self.check_compatible(src)?;
        let Some(&first) = indices.first() else {
            return Err(MeshBufferError::ElementOutOfRange {
                index: 0,
                len: 0,
            });
        };
        for &index in indices {
            src.check_index(index)?;
        }

        let width = self.width;
        let count = indices.len() as f32;
        match (&mut self.data, &src.data) {
            (ChannelData::Float(dst), ChannelData::Float(s)) => {
                for c in 0..width {
                    let sum: f32 = indices.iter().map(|&i| s[i * width + c]).sum();
                    dst.push(sum / count);
                }
            }
            (ChannelData::UChar(dst), ChannelData::UChar(s)) => {
                for c in 0..width {
                    let sum: f32 = indices.iter().map(|&i| s[i * width + c] as f32).sum();
                    dst.push((sum / count).round().clamp(0.0, 255.0) as u8);
                }
            }
            (ChannelData::UInt(dst), ChannelData::UInt(s)) => {
                dst.extend_from_slice(&s[first * width..(first + 1) * width]);
            }
            _ => unreachable!("layout checked above"),
        }
        Ok(())
    }

    /// Append a single uint element. Only valid on uint channels.
    pub(crate) fn push_uints(&mut self, values: &[u32]) -> Result<(), MeshBufferError> {
        match &mut self.data {
            ChannelData::UInt(dst) if values.len() == self.width => {
                dst.extend_from_slice(values);
                Ok(())
            }
            _ => Err(MeshBufferError::Incompatible {
                src: ChannelType::UInt,
                src_width: values.len(),
                dst: self.element_type(),
                dst_width: self.width,
            }),
        }
    }

    fn check_layout(
        &self,
        name: &str,
        expected_type: ChannelType,
        expected_width: usize,
    ) -> Result<(), MeshBufferError> {
        if self.element_type() == expected_type && self.width == expected_width {
            Ok(())
        } else {
            Err(MeshBufferError::WrongLayout {
                name: name.to_string(),
                expected_type,
                expected_width,
                actual_type: self.element_type(),
                actual_width: self.width,
            })
        }
    }
}

/// Mesh geometry and attributes as named channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    vertex_channels: BTreeMap<String, Channel>,
    face_channels: BTreeMap<String, Channel>,
}

impl Default for MeshBuffer {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl MeshBuffer {
    /// Create a buffer from positions and triangles.
    ///
    /// Indices are not checked here; call [`MeshBuffer::validate`] before
    /// handing the buffer to code that indexes with them.
    pub fn new(positions: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> Self {
        let mut vertex_channels = BTreeMap::new();
        vertex_channels.insert(POSITIONS.to_string(), Channel::from_vec3(&positions));
        let mut face_channels = BTreeMap::new();
        face_channels.insert(FACE_INDICES.to_string(), Channel::from_triangles(&faces));
        Self {
            vertex_channels,
            face_channels,
        }
    }

    /// Assemble a buffer from complete channel maps and validate it.
    pub fn from_channels(
        vertex_channels: BTreeMap<String, Channel>,
        face_channels: BTreeMap<String, Channel>,
    ) -> Result<Self, MeshBufferError> {
        let buffer = Self {
            vertex_channels,
            face_channels,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Vertex positions as packed vectors.
    pub fn positions(&self) -> &[[f32; 3]] {
        self.vertex_channels
            .get(POSITIONS)
            .and_then(Channel::as_floats)
            .and_then(|v| bytemuck::try_cast_slice(v).ok())
            .unwrap_or(&[])
    }

    /// Triangle vertex indices.
    pub fn face_indices(&self) -> &[[u32; 3]] {
        self.face_channels
            .get(FACE_INDICES)
            .and_then(Channel::as_uints)
            .and_then(|v| bytemuck::try_cast_slice(v).ok())
            .unwrap_or(&[])
    }

    pub fn num_vertices(&self) -> usize {
        self.positions().len()
    }

    pub fn num_faces(&self) -> usize {
        self.face_indices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_faces() == 0 && self.num_vertices() == 0
    }

    pub fn vertex_channel(&self, name: &str) -> Option<&Channel> {
        self.vertex_channels.get(name)
    }

    pub fn face_channel(&self, name: &str) -> Option<&Channel> {
        self.face_channels.get(name)
    }

    /// All vertex channels (including positions), sorted by name.
    pub fn vertex_channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.vertex_channels.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All face channels (including face indices), sorted by name.
    pub fn face_channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.face_channels.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Attach a per-vertex attribute channel.
    pub fn add_vertex_channel(
        &mut self,
        name: impl Into<String>,
        channel: Channel,
    ) -> Result<(), MeshBufferError> {
        let name = name.into();
        if name == POSITIONS {
            return Err(MeshBufferError::ReservedName(name));
        }
        check_length(&name, &channel, self.num_vertices())?;
        self.vertex_channels.insert(name, channel);
        Ok(())
    }

    /// Attach a per-face attribute channel.
    pub fn add_face_channel(
        &mut self,
        name: impl Into<String>,
        channel: Channel,
    ) -> Result<(), MeshBufferError> {
        let name = name.into();
        if name == FACE_INDICES {
            return Err(MeshBufferError::ReservedName(name));
        }
        check_length(&name, &channel, self.num_faces())?;
        self.face_channels.insert(name, channel);
        Ok(())
    }

    /// Check mandatory channels, channel lengths and index ranges.
    pub fn validate(&self) -> Result<(), MeshBufferError> {
        let positions = self
            .vertex_channels
            .get(POSITIONS)
            .ok_or_else(|| MeshBufferError::MissingChannel(POSITIONS.to_string()))?;
        positions.check_layout(POSITIONS, ChannelType::Float, 3)?;

        let faces = self
            .face_channels
            .get(FACE_INDICES)
            .ok_or_else(|| MeshBufferError::MissingChannel(FACE_INDICES.to_string()))?;
        faces.check_layout(FACE_INDICES, ChannelType::UInt, 3)?;

        let num_vertices = positions.len();
        let num_faces = faces.len();
        for (name, channel) in &self.vertex_channels {
            check_length(name, channel, num_vertices)?;
        }
        for (name, channel) in &self.face_channels {
            check_length(name, channel, num_faces)?;
        }

        for (face, triangle) in self.face_indices().iter().enumerate() {
            for &index in triangle {
                if index as usize >= num_vertices {
                    return Err(MeshBufferError::IndexOutOfRange {
                        face,
                        index,
                        num_vertices,
                    });
                }
            }
        }
        Ok(())
    }

    /// Bounds of all vertex positions, referenced or not.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.positions().iter().map(|p| glam::Vec3::from_array(*p)))
    }
}

fn check_length(name: &str, channel: &Channel, expected: usize) -> Result<(), MeshBufferError> {
    if channel.len() == expected {
        Ok(())
    } else {
        Err(MeshBufferError::LengthMismatch {
            name: name.to_string(),
            expected,
            actual: channel.len(),
        })
    }
}

/// Empty channel maps shaped like an existing buffer's channels.
///
/// Used by code that rebuilds a buffer element by element and must carry
/// every channel of the source.
pub fn empty_channels_like(
    buffer: &MeshBuffer,
) -> (BTreeMap<String, Channel>, BTreeMap<String, Channel>) {
    let vertex = buffer
        .vertex_channels()
        .map(|(name, c)| (name.to_string(), c.empty_like()))
        .collect();
    let face = buffer
        .face_channels()
        .map(|(name, c)| (name.to_string(), c.empty_like()))
        .collect();
    (vertex, face)
}

/// Append a triangle to a face-index channel.
pub fn push_triangle(channel: &mut Channel, triangle: [u32; 3]) -> Result<(), MeshBufferError> {
    channel.push_uints(&triangle)
}
