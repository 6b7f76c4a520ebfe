//! This module defines the `NrrdHeader` struct, which holds everything that
//! a NRRD header can declare about an image, along with the axis roles and
//! space indices derived from it.
//!
//! Headers are obtained by parsing text (see [`NrrdHeader::from_reader`]),
//! or from image calibration (see [`NrrdHeader::from_calibration`]), and
//! turned back into text with [`NrrdHeader::to_text`].
//!
//! [`NrrdHeader::from_reader`]: ./struct.NrrdHeader.html#method.from_reader
//! [`NrrdHeader::from_calibration`]: ./struct.NrrdHeader.html#method.from_calibration
//! [`NrrdHeader::to_text`]: ./struct.NrrdHeader.html#method.to_text

mod parse;
mod write;

use std::convert::TryFrom;

pub use self::parse::HeaderParser;
pub(crate) use self::parse::read_header;
pub use self::write::data_file_name;

use crate::axis::{AxisRole, NrrdAxis};
use crate::error::{NrrdError, Result};
use crate::shape::{resolve_shape, solve_space_indices};
use crate::typedef::{Encoding, SampleType};
use crate::volume::ImageShape;
use byteordered::Endianness;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// The highest header version this crate knows how to read.
pub const SUPPORTED_VERSION: u32 = 5;

/// Indices into the axis list for each axis role.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AxisIndices {
    /// Channel axis.
    pub channel: Option<usize>,
    /// Column axis.
    pub x: Option<usize>,
    /// Row axis.
    pub y: Option<usize>,
    /// Slice axis.
    pub z: Option<usize>,
    /// Frame axis.
    pub time: Option<usize>,
}

impl AxisIndices {
    /// The axis index holding the given role.
    pub fn get(&self, role: AxisRole) -> Option<usize> {
        match role {
            AxisRole::Channel => self.channel,
            AxisRole::X => self.x,
            AxisRole::Y => self.y,
            AxisRole::Z => self.z,
            AxisRole::Time => self.time,
        }
    }
}

/// Indices into the space vectors for each spatial role.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpaceIndices {
    /// Space index of the x axis.
    pub x: Option<usize>,
    /// Space index of the y axis.
    pub y: Option<usize>,
    /// Space index of the z axis.
    pub z: Option<usize>,
    /// Space index of the time axis.
    pub time: Option<usize>,
}

impl SpaceIndices {
    /// The space index of the given role. Channels have none.
    pub fn get(&self, role: AxisRole) -> Option<usize> {
        match role {
            AxisRole::Channel => None,
            AxisRole::X => self.x,
            AxisRole::Y => self.y,
            AxisRole::Z => self.z,
            AxisRole::Time => self.time,
        }
    }
}

/// User-defined `key:=value` fields, in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CustomFields {
    entries: Vec<(String, String)>,
}

impl CustomFields {
    /// Retrieve the value of a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a field with this key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Add a field, failing if the key is already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        if self.contains_key(&key) {
            return Err(NrrdError::DuplicateField(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Add or replace a field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let i = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(i).1)
    }

    /// Iterate over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no custom fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace all fields with those declared in a block of text, one
    /// `key:=value` per line. Comments and blank lines are skipped.
    pub fn parse_block(text: &str) -> Result<CustomFields> {
        let mut fields = CustomFields::default();
        for (i, line) in text.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let (key, value) = crate::grammar::split_line(line);
            if !crate::grammar::is_custom_line(line) || key.is_empty() {
                return Err(NrrdError::InvalidField(
                    "custom field",
                    "custom fields must be written as `key:=value`".to_string(),
                )
                .at_line(i + 1));
            }
            fields.insert(key, value).map_err(|e| e.at_line(i + 1))?;
        }
        Ok(fields)
    }

    /// Write all fields as a block of `key:=value` lines.
    pub fn to_block(&self) -> String {
        let mut out = String::new();
        for (k, v) in self.iter() {
            out.push_str(&crate::grammar::clean_field(k));
            out.push_str(":=");
            out.push_str(&crate::grammar::clean_field(v));
            out.push('\n');
        }
        out
    }
}

/// The NRRD header, as declared in text and resolved into image roles.
///
/// Unset real-valued fields are NaN. The axis roles and space indices are
/// derived from the axes and are recomputed by [`resolve`].
///
/// [`resolve`]: #method.resolve
#[derive(Debug, Clone)]
pub struct NrrdHeader {
    /// Header version, from the magic line.
    pub version: u32,
    /// The axes, in on-disk order. The first axis varies fastest.
    pub axes: Vec<NrrdAxis>,
    /// Sample type.
    pub sample_type: Option<SampleType>,
    /// Payload encoding.
    pub encoding: Option<Encoding>,
    /// Byte order of multi-byte samples.
    pub endianness: Option<Endianness>,
    /// Smallest sample value.
    pub min: f64,
    /// Largest sample value.
    pub max: f64,
    /// Smallest sample value before quantization.
    pub old_min: f64,
    /// Largest sample value before quantization.
    pub old_max: f64,
    /// Free-form description of the content.
    pub content: Option<String>,
    /// Unit of the sample values.
    pub sample_units: Option<String>,
    /// Named world space.
    pub space: Option<String>,
    /// Dimension of the world space, 0 when absent.
    pub space_dim: usize,
    /// Unit per space dimension.
    pub space_units: Option<Vec<Option<String>>>,
    /// World position of the first sample.
    pub space_origin: Option<Vec<f64>>,
    /// World step vector per space axis.
    pub space_directions: Option<Vec<Option<Vec<f64>>>>,
    /// Measurement frame rows.
    pub measurement_frame: Option<Vec<Vec<f64>>>,
    /// User-defined fields.
    pub custom_fields: CustomFields,
    /// Whether the samples live in a separate data file.
    pub detached: bool,
    /// Name of the detached data file.
    pub data_file: Option<String>,
    /// Bytes to skip before the samples, after decompression. `-1` means
    /// that the samples sit at the end of the data file.
    pub byte_skip: i64,
    /// Lines to skip before the samples, before decompression.
    pub line_skip: u64,
    indices: AxisIndices,
    space_indices: SpaceIndices,
}

impl Default for NrrdHeader {
    fn default() -> Self {
        NrrdHeader {
            version: SUPPORTED_VERSION,
            axes: Vec::new(),
            sample_type: None,
            encoding: None,
            endianness: None,
            min: std::f64::NAN,
            max: std::f64::NAN,
            old_min: std::f64::NAN,
            old_max: std::f64::NAN,
            content: None,
            sample_units: None,
            space: None,
            space_dim: 0,
            space_units: None,
            space_origin: None,
            space_directions: None,
            measurement_frame: None,
            custom_fields: CustomFields::default(),
            detached: false,
            data_file: None,
            byte_skip: 0,
            line_skip: 0,
            indices: AxisIndices::default(),
            space_indices: SpaceIndices::default(),
        }
    }
}

fn same_real(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn same_reals(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_real(*x, *y))
}

fn same_rows(a: &Option<Vec<Option<Vec<f64>>>>, b: &Option<Vec<Option<Vec<f64>>>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| match (x, y) {
                    (None, None) => true,
                    (Some(x), Some(y)) => same_reals(x, y),
                    _ => false,
                })
        }
        _ => false,
    }
}

/// Headers compare equal when their fields match, where NaN equals NaN.
impl PartialEq for NrrdHeader {
    fn eq(&self, other: &Self) -> bool {
        let origin = match (&self.space_origin, &other.space_origin) {
            (None, None) => true,
            (Some(a), Some(b)) => same_reals(a, b),
            _ => false,
        };
        let frame = match (&self.measurement_frame, &other.measurement_frame) {
            (None, None) => true,
            (Some(a), Some(b)) => a.len() == b.len() && a.iter().zip(b).all(|(x, y)| same_reals(x, y)),
            _ => false,
        };
        self.version == other.version
            && self.axes == other.axes
            && self.sample_type == other.sample_type
            && self.encoding == other.encoding
            && self.endianness == other.endianness
            && same_real(self.min, other.min)
            && same_real(self.max, other.max)
            && same_real(self.old_min, other.old_min)
            && same_real(self.old_max, other.old_max)
            && self.content == other.content
            && self.sample_units == other.sample_units
            && self.space == other.space
            && self.space_dim == other.space_dim
            && self.space_units == other.space_units
            && origin
            && same_rows(&self.space_directions, &other.space_directions)
            && frame
            && self.custom_fields == other.custom_fields
            && self.detached == other.detached
            && self.data_file == other.data_file
            && self.byte_skip == other.byte_skip
            && self.line_skip == other.line_skip
    }
}

impl NrrdHeader {
    /// Create a header for the given axis sizes and sample type, with raw
    /// encoding and the system's byte order. Axis roles are resolved.
    pub fn new(sizes: &[usize], sample_type: SampleType) -> Result<NrrdHeader> {
        if sizes.is_empty() || sizes.len() > 5 {
            return Err(NrrdError::InvalidField(
                "dimension",
                format!("{} axes, expected 1 to 5", sizes.len()),
            ));
        }
        if sizes.contains(&0) {
            return Err(NrrdError::MissingMandatoryField("sizes"));
        }
        let mut header = NrrdHeader {
            axes: sizes.iter().map(|s| NrrdAxis::new(*s)).collect(),
            sample_type: Some(sample_type),
            encoding: Some(Encoding::Raw),
            endianness: Some(Endianness::native()),
            ..Default::default()
        };
        header.resolve();
        Ok(header)
    }

    /// Read a NRRD header from the given byte source, up to and including
    /// the blank line that ends it. The source is left at the first byte of
    /// an attached payload.
    pub fn from_reader<R: BufRead>(input: R) -> Result<NrrdHeader> {
        parse::read_header(input).map(|(header, _)| header)
    }

    /// Parse a NRRD header held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<NrrdHeader> {
        Self::from_reader(bytes)
    }

    /// Read a NRRD header from the given file. The data file of a detached
    /// header is not checked here.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NrrdHeader> {
        let file = BufReader::new(File::open(path)?);
        Self::from_reader(file)
    }

    /// Recompute the axis roles and space indices from the axes.
    pub fn resolve(&mut self) {
        self.indices = resolve_shape(&mut self.axes, self.space_dim);
        self.space_indices = solve_space_indices(&self.indices);
        log::debug!(
            "Resolved {} NRRD axes as {}",
            self.axes.len(),
            self.axes
                .iter()
                .map(|a| a.role.map(|r| r.letter()).unwrap_or('?'))
                .collect::<String>()
        );
    }

    /// Assign the axis roles explicitly, one per axis, in place of the
    /// layout that [`resolve`] would infer.
    ///
    /// [`resolve`]: #method.resolve
    pub fn set_layout(&mut self, roles: &[AxisRole]) -> Result<()> {
        if roles.len() != self.axes.len() {
            return Err(NrrdError::FieldCountMismatch {
                field: "dimension",
                expected: self.axes.len(),
                found: roles.len(),
            });
        }
        let mut indices = AxisIndices::default();
        for (i, (axis, role)) in self.axes.iter_mut().zip(roles).enumerate() {
            let x_missing = indices.x.is_none();
            let slot = match role {
                AxisRole::Channel => &mut indices.channel,
                AxisRole::X => &mut indices.x,
                AxisRole::Y => &mut indices.y,
                AxisRole::Z => &mut indices.z,
                AxisRole::Time => &mut indices.time,
            };
            if slot.is_some() || (x_missing && *role != AxisRole::X && *role != AxisRole::Channel) {
                return Err(NrrdError::InvalidField(
                    "dimension",
                    format!("axis role {:?} out of place", role),
                ));
            }
            *slot = Some(i);
            axis.role = Some(*role);
        }
        if indices.x.is_none() {
            return Err(NrrdError::InvalidField("dimension", "no x axis".to_string()));
        }
        self.indices = indices;
        self.space_indices = solve_space_indices(&indices);
        Ok(())
    }

    /// Axis index of each role.
    pub fn axis_indices(&self) -> &AxisIndices {
        &self.indices
    }

    /// Space index of each spatial role.
    pub fn space_indices(&self) -> &SpaceIndices {
        &self.space_indices
    }

    /// The axis holding the given role, if any.
    pub fn axis(&self, role: AxisRole) -> Option<&NrrdAxis> {
        self.indices.get(role).and_then(|i| self.axes.get(i))
    }

    /// Mutable access to the axis holding the given role, if any.
    pub fn axis_mut(&mut self, role: AxisRole) -> Option<&mut NrrdAxis> {
        match self.indices.get(role) {
            Some(i) => self.axes.get_mut(i),
            None => None,
        }
    }

    fn role_size(&self, role: AxisRole) -> usize {
        self.axis(role).map(|a| a.size).unwrap_or(1)
    }

    /// Number of interleaved channels.
    pub fn n_channels(&self) -> usize {
        self.role_size(AxisRole::Channel)
    }

    /// Image width.
    pub fn width(&self) -> usize {
        self.role_size(AxisRole::X)
    }

    /// Image height.
    pub fn height(&self) -> usize {
        self.role_size(AxisRole::Y)
    }

    /// Number of slices.
    pub fn n_slices(&self) -> usize {
        self.role_size(AxisRole::Z)
    }

    /// Number of frames.
    pub fn n_frames(&self) -> usize {
        self.role_size(AxisRole::Time)
    }

    /// Number of planes: channels times slices times frames. Saturates on
    /// overflow, which `validate` rejects.
    pub fn n_images(&self) -> usize {
        self.n_channels()
            .saturating_mul(self.n_slices())
            .saturating_mul(self.n_frames())
    }

    /// The planar shape of the image described by this header.
    pub fn image_shape(&self) -> ImageShape {
        ImageShape {
            channels: self.n_channels(),
            width: self.width(),
            height: self.height(),
            slices: self.n_slices(),
            frames: self.n_frames(),
        }
    }

    /// The sample type, which must be declared.
    pub fn data_type(&self) -> Result<SampleType> {
        self.sample_type
            .ok_or(NrrdError::MissingMandatoryField("type"))
    }

    /// The byte order of samples, little endian unless declared.
    pub fn byte_order(&self) -> Endianness {
        self.endianness.unwrap_or(Endianness::Little)
    }

    /// Number of payload bytes of the full image.
    ///
    /// # Errors
    ///
    /// `NrrdError::InvalidField("sizes", _)` if the size overflows.
    pub fn byte_size(&self) -> Result<u64> {
        let factors = [
            self.n_channels(),
            self.width(),
            self.height(),
            self.n_slices(),
            self.n_frames(),
            self.data_type()?.size_of(),
        ];
        factors
            .iter()
            .try_fold(1u64, |acc, &f| acc.checked_mul(f as u64))
            .filter(|&bytes| usize::try_from(bytes).is_ok())
            .ok_or_else(|| NrrdError::InvalidField("sizes", "image byte size overflows".to_string()))
    }

    /// Number of files written when saving this header with its image.
    pub fn output_file_count(&self) -> usize {
        let slices: usize = self
            .axes
            .iter()
            .filter(|a| a.slice)
            .map(|a| a.size)
            .product();
        if self.detached {
            slices.saturating_mul(2)
        } else {
            slices
        }
    }

    /// Check the mandatory fields and their consistency.
    pub fn validate(&self) -> Result<()> {
        let sample_type = self.data_type()?;
        if self.axes.is_empty() {
            return Err(NrrdError::MissingMandatoryField("dimension"));
        }
        if self.axes.iter().any(|a| a.size == 0) {
            return Err(NrrdError::MissingMandatoryField("sizes"));
        }
        self.byte_size()?;
        let encoding = self
            .encoding
            .ok_or(NrrdError::MissingMandatoryField("encoding"))?;
        if sample_type.is_multi_byte() && self.endianness.is_none() {
            return Err(NrrdError::MissingMandatoryField("endian"));
        }
        if self.byte_skip == -1 && encoding != Encoding::Raw {
            return Err(NrrdError::InvalidField(
                "byte skip",
                "-1 is only valid with raw encoding".to_string(),
            ));
        }
        for axis in &self.axes {
            if let Some(kind) = &axis.kind {
                crate::typedef::check_kind_size(kind, axis.size)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_field_block() {
        let fields = CustomFields::parse_block("# c\nfoo:=1\n\nbar baz:=two words\n").unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("bar baz"), Some("two words"));
        assert_eq!(fields.to_block(), "foo:=1\nbar baz:=two words\n");

        let err = CustomFields::parse_block("foo:=1\nfoo:=2\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(err.root(), NrrdError::DuplicateField(_)));
        assert!(CustomFields::parse_block("foo: 1").is_err());
    }

    #[test]
    fn new_header_shape() {
        let header = NrrdHeader::new(&[3, 64, 32], SampleType::Uint16).unwrap();
        assert_eq!(header.n_channels(), 3);
        assert_eq!(header.width(), 64);
        assert_eq!(header.height(), 32);
        assert_eq!(header.n_images(), 3);
        assert_eq!(header.byte_size().unwrap(), 3 * 64 * 32 * 2);
        assert!(header.validate().is_ok());
        assert!(NrrdHeader::new(&[2, 2, 2, 2, 2, 2], SampleType::Uint8).is_err());
    }

    #[test]
    fn validation() {
        let mut header = NrrdHeader::new(&[4, 4], SampleType::Float32).unwrap();
        header.endianness = None;
        assert!(matches!(
            header.validate(),
            Err(NrrdError::MissingMandatoryField("endian"))
        ));
        header.endianness = Some(Endianness::Big);
        header.encoding = Some(Encoding::Gzip);
        header.byte_skip = -1;
        assert!(matches!(
            header.validate(),
            Err(NrrdError::InvalidField("byte skip", _))
        ));
    }

    #[test]
    fn oversized_shape_is_invalid() {
        let mut header = NrrdHeader::new(&[4, 4], SampleType::Uint16).unwrap();
        header.axes[0].size = usize::MAX;
        header.axes[1].size = 3;
        assert!(matches!(header.byte_size(), Err(NrrdError::InvalidField("sizes", _))));
        assert!(matches!(header.validate(), Err(NrrdError::InvalidField("sizes", _))));
        assert_eq!(header.n_images(), 1);

        header.axes[0].size = 1 << 20;
        header.axes[1].size = 1 << 10;
        assert_eq!(header.byte_size().unwrap(), 1 << 31);
        assert!(header.validate().is_ok());
    }
}
