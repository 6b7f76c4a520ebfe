//! This module contains definitions for the enumerated NRRD header fields:
//! sample types, encodings, axis centers, anatomical spaces and axis kinds.
//!
//! Parsing is case insensitive for every enumeration. Writing always
//! produces the canonical name.

use crate::error::{NrrdError, Result};
use byteordered::Endianness;

/// Data type for representing a NRRD sample type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// unsigned char.
    Uint8,
    /// signed char.
    Int8,
    /// unsigned short.
    Uint16,
    /// signed short.
    Int16,
    /// unsigned int.
    Uint32,
    /// signed int.
    Int32,
    /// float.
    Float32,
    /// double.
    Float64,
}

const TYPE_ALIASES: [(SampleType, &[&str]); 8] = [
    (SampleType::Uint8, &["uint8", "uint8_t", "uchar", "unsigned char"]),
    (SampleType::Int8, &["int8", "int8_t", "signed char"]),
    (
        SampleType::Uint16,
        &["uint16", "uint16_t", "ushort", "unsigned short", "unsigned short int"],
    ),
    (
        SampleType::Int16,
        &["int16", "int16_t", "short", "short int", "signed short", "signed short int"],
    ),
    (SampleType::Uint32, &["uint32", "uint32_t", "uint", "unsigned int"]),
    (SampleType::Int32, &["int32", "int32_t", "int", "signed int"]),
    (SampleType::Float32, &["float"]),
    (SampleType::Float64, &["double"]),
];

impl SampleType {
    /// Parse a sample type from any of its accepted aliases.
    pub fn from_name(name: &str) -> Result<SampleType> {
        let name = name.trim().to_lowercase();
        if let Some((t, _)) = TYPE_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&name.as_str()))
        {
            return Ok(*t);
        }
        if name == "block" {
            return Err(NrrdError::UnsupportedFeature("block sample type".to_string()));
        }
        Err(NrrdError::UnrecognizedEnumValue("type", name))
    }

    /// The canonical name written to the `type` field.
    pub fn name(self) -> &'static str {
        TYPE_ALIASES
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, aliases)| aliases[0])
            .unwrap_or("uint8")
    }

    /// Retrieve the size of a sample of this type in bytes.
    pub fn size_of(self) -> usize {
        match self {
            SampleType::Uint8 | SampleType::Int8 => 1,
            SampleType::Uint16 | SampleType::Int16 => 2,
            SampleType::Uint32 | SampleType::Int32 | SampleType::Float32 => 4,
            SampleType::Float64 => 8,
        }
    }

    /// Whether the byte order of the data matters for this type.
    pub fn is_multi_byte(self) -> bool {
        self.size_of() > 1
    }

    /// The offset that was added to signed integer samples to store them
    /// in an unsigned cell, as a signed value.
    pub fn signed_offset(self) -> f64 {
        match self {
            SampleType::Int8 => -128.,
            SampleType::Int16 => -32768.,
            _ => 0.,
        }
    }
}

/// Payload encoding of a NRRD file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Uncompressed samples.
    Raw,
    /// Samples compressed with gzip.
    Gzip,
}

impl Encoding {
    /// Parse an encoding name.
    pub fn from_name(name: &str) -> Result<Encoding> {
        match name.trim().to_lowercase().as_str() {
            "raw" => Ok(Encoding::Raw),
            "gz" | "gzip" => Ok(Encoding::Gzip),
            e @ "bz2" | e @ "bzip2" | e @ "hex" | e @ "txt" | e @ "text" | e @ "ascii" => {
                Err(NrrdError::UnsupportedFeature(format!("{} encoding", e)))
            }
            e => Err(NrrdError::UnrecognizedEnumValue("encoding", e.to_string())),
        }
    }

    /// The canonical name written to the `encoding` field.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Gzip => "gzip",
        }
    }

    /// The file extension used for detached data files.
    pub fn data_file_extension(self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Gzip => "raw.gz",
        }
    }
}

/// Parse the value of the `endian` field.
pub fn parse_endianness(name: &str) -> Result<Endianness> {
    match name.trim().to_lowercase().as_str() {
        "little" => Ok(Endianness::Little),
        "big" => Ok(Endianness::Big),
        e => Err(NrrdError::UnrecognizedEnumValue("endian", e.to_string())),
    }
}

/// The name written to the `endian` field.
pub fn endianness_name(e: Endianness) -> &'static str {
    match e {
        Endianness::Little => "little",
        Endianness::Big => "big",
    }
}

/// Sample centering along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Center {
    /// Not known.
    Unknown,
    /// Samples sit at the grid nodes.
    Node,
    /// Samples sit at the middle of grid cells.
    Cell,
}

impl Default for Center {
    fn default() -> Self {
        Center::Unknown
    }
}

impl Center {
    /// Parse a `centers` subfield. A missing subfield means an unknown center.
    pub fn from_subfield(value: Option<&str>) -> Result<Center> {
        match value.map(|v| v.to_lowercase()) {
            None => Ok(Center::Unknown),
            Some(v) => match v.as_str() {
                "cell" => Ok(Center::Cell),
                "node" => Ok(Center::Node),
                _ => Err(NrrdError::UnrecognizedEnumValue("centers", v)),
            },
        }
    }

    /// The name of this center, or `None` when unknown.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Center::Unknown => None,
            Center::Node => Some("node"),
            Center::Cell => Some("cell"),
        }
    }

    /// Offset between the axis minimum and the first sample position,
    /// in units of spacing.
    pub fn adjustment(self) -> f64 {
        if self == Center::Cell {
            0.5
        } else {
            0.
        }
    }
}

const SPACES_3D: [&str; 9] = [
    "right-anterior-superior",
    "ras",
    "left-anterior-superior",
    "las",
    "left-posterior-superior",
    "lps",
    "scanner-xyz",
    "3d-right-handed",
    "3d-left-handed",
];

const SPACES_4D: [&str; 9] = [
    "right-anterior-superior-time",
    "rast",
    "left-anterior-superior-time",
    "last",
    "left-posterior-superior-time",
    "lpst",
    "scanner-xyz-time",
    "3d-right-handed-time",
    "3d-left-handed-time",
];

/// The dimension of a named space, or `None` if the name is not known.
pub fn space_dimension(name: &str) -> Option<usize> {
    let name = name.trim().to_lowercase();
    if SPACES_3D.contains(&name.as_str()) {
        Some(3)
    } else if SPACES_4D.contains(&name.as_str()) {
        Some(4)
    } else {
        None
    }
}

const KIND_SIZES: [(&str, usize); 31] = [
    ("domain", 0),
    ("space", 0),
    ("time", 0),
    ("list", 0),
    ("point", 0),
    ("vector", 0),
    ("covariant-vector", 0),
    ("normal", 0),
    ("stub", 1),
    ("scalar", 1),
    ("complex", 2),
    ("2-vector", 2),
    ("3-color", 3),
    ("rgb-color", 3),
    ("hsv-color", 3),
    ("xyz-color", 3),
    ("3-vector", 3),
    ("3-gradient", 3),
    ("3-normal", 3),
    ("2d-symmetric-matrix", 3),
    ("4-color", 4),
    ("rgba-color", 4),
    ("4-vector", 4),
    ("quaternion", 4),
    ("2d-masked-symmetric-matrix", 4),
    ("2d-matrix", 4),
    ("2d-masked-matrix", 5),
    ("3d-symmetric-matrix", 6),
    ("3d-masked-symmetric-matrix", 7),
    ("3d-matrix", 9),
    ("3d-masked-matrix", 10),
];

/// The axis size required by an axis kind, where `0` means any size.
pub fn kind_axis_size(kind: &str) -> Result<usize> {
    let kind = kind.trim().to_lowercase();
    KIND_SIZES
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, s)| *s)
        .ok_or(NrrdError::UnrecognizedEnumValue("kinds", kind))
}

/// Check an axis kind against the size of its axis.
pub fn check_kind_size(kind: &str, size: usize) -> Result<()> {
    let expected = kind_axis_size(kind)?;
    if expected != 0 && expected != size {
        return Err(NrrdError::KindSizeMismatch {
            kind: kind.to_string(),
            expected,
            found: size,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_aliases() {
        assert_eq!(SampleType::from_name("unsigned short int").unwrap(), SampleType::Uint16);
        assert_eq!(SampleType::from_name("UCHAR").unwrap(), SampleType::Uint8);
        assert_eq!(SampleType::from_name("signed char").unwrap(), SampleType::Int8);
        assert_eq!(SampleType::from_name("double").unwrap(), SampleType::Float64);
        assert_eq!(SampleType::Int16.name(), "int16");
        assert_eq!(SampleType::Float32.name(), "float");
        assert!(matches!(
            SampleType::from_name("block"),
            Err(NrrdError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            SampleType::from_name("int64"),
            Err(NrrdError::UnrecognizedEnumValue("type", _))
        ));
    }

    #[test]
    fn encodings() {
        assert_eq!(Encoding::from_name("gz").unwrap(), Encoding::Gzip);
        assert_eq!(Encoding::from_name("RAW").unwrap(), Encoding::Raw);
        for e in &["bz2", "bzip2", "hex", "txt", "text", "ascii"] {
            assert!(matches!(
                Encoding::from_name(e),
                Err(NrrdError::UnsupportedFeature(_))
            ));
        }
        assert!(matches!(
            Encoding::from_name("zstd"),
            Err(NrrdError::UnrecognizedEnumValue("encoding", _))
        ));
    }

    #[test]
    fn kinds() {
        assert_eq!(kind_axis_size("RGB-color").unwrap(), 3);
        assert_eq!(kind_axis_size("3d-masked-matrix").unwrap(), 10);
        assert_eq!(kind_axis_size("domain").unwrap(), 0);
        assert!(kind_axis_size("hypercube").is_err());
        assert!(check_kind_size("rgb-color", 3).is_ok());
        assert!(check_kind_size("space", 512).is_ok());
        assert!(matches!(
            check_kind_size("rgb-color", 4),
            Err(NrrdError::KindSizeMismatch { expected: 3, found: 4, .. })
        ));
    }

    #[test]
    fn spaces() {
        assert_eq!(space_dimension("RAS"), Some(3));
        assert_eq!(space_dimension("scanner-xyz-time"), Some(4));
        assert_eq!(space_dimension("3d-left-handed"), Some(3));
        assert_eq!(space_dimension("somewhere"), None);
    }

    #[test]
    fn centers() {
        assert_eq!(Center::from_subfield(None).unwrap(), Center::Unknown);
        assert_eq!(Center::from_subfield(Some("Cell")).unwrap(), Center::Cell);
        assert_eq!(Center::Cell.adjustment(), 0.5);
        assert_eq!(Center::Node.adjustment(), 0.);
        assert!(Center::from_subfield(Some("edge")).is_err());
    }
}
