//! Line-driven parsing of NRRD header text.
//!
//! Standard fields are dispatched through a table that maps each normalized
//! key to its arity (global, per-axis or per-space-dimension) and its setter.
//! Every field may appear at most once.

use super::{NrrdHeader, SUPPORTED_VERSION};
use crate::axis::NrrdAxis;
use crate::error::{NrrdError, Result};
use crate::grammar::{
    has_digit_format, is_custom_line, normalize_key, parse_integer, parse_real, split_line,
    split_subfields, split_vectors,
};
use crate::typedef::{check_kind_size, parse_endianness, space_dimension, Center, Encoding, SampleType};
use std::io::BufRead;

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    /// A single value.
    Global,
    /// One subfield per axis. Requires `dimension`.
    PerAxis,
    /// One entry per space dimension. Requires `space` or `space dimension`.
    PerSpace,
    /// Accepted and discarded.
    Ignored,
}

/// The value of a standard field, tokenized as needed by the setters.
struct FieldValue<'a> {
    raw: &'a str,
    subfields: Vec<Option<String>>,
}

type Setter = fn(&mut NrrdHeader, &FieldValue) -> Result<()>;

struct FieldSpec {
    /// Canonical name, used in error messages and for duplicate detection.
    name: &'static str,
    /// Normalized keys which select this field.
    keys: &'static [&'static str],
    arity: Arity,
    set: Setter,
}

const FIELDS: &[FieldSpec] = &[
    FieldSpec { name: "dimension", keys: &["dimension"], arity: Arity::Global, set: set_dimension },
    FieldSpec { name: "type", keys: &["type"], arity: Arity::Global, set: set_type },
    FieldSpec { name: "endian", keys: &["endian"], arity: Arity::Global, set: set_endian },
    FieldSpec { name: "encoding", keys: &["encoding"], arity: Arity::Global, set: set_encoding },
    FieldSpec { name: "min", keys: &["min"], arity: Arity::Global, set: |h, v| set_real(&mut h.min, v) },
    FieldSpec { name: "max", keys: &["max"], arity: Arity::Global, set: |h, v| set_real(&mut h.max, v) },
    FieldSpec { name: "old min", keys: &["oldmin"], arity: Arity::Global, set: |h, v| set_real(&mut h.old_min, v) },
    FieldSpec { name: "old max", keys: &["oldmax"], arity: Arity::Global, set: |h, v| set_real(&mut h.old_max, v) },
    FieldSpec { name: "sample units", keys: &["sampleunits"], arity: Arity::Global, set: |h, v| set_text(&mut h.sample_units, v) },
    FieldSpec { name: "content", keys: &["content"], arity: Arity::Global, set: |h, v| set_text(&mut h.content, v) },
    FieldSpec { name: "data file", keys: &["datafile"], arity: Arity::Global, set: set_data_file },
    FieldSpec { name: "line skip", keys: &["lineskip"], arity: Arity::Global, set: set_line_skip },
    FieldSpec { name: "byte skip", keys: &["byteskip"], arity: Arity::Global, set: set_byte_skip },
    FieldSpec { name: "space", keys: &["space"], arity: Arity::Global, set: set_space },
    FieldSpec { name: "space dimension", keys: &["spacedimension"], arity: Arity::Global, set: set_space_dimension },
    FieldSpec { name: "space units", keys: &["spaceunits"], arity: Arity::PerSpace, set: set_space_units },
    FieldSpec { name: "space origin", keys: &["spaceorigin"], arity: Arity::PerSpace, set: set_space_origin },
    FieldSpec { name: "space directions", keys: &["spacedirections"], arity: Arity::PerSpace, set: set_space_directions },
    FieldSpec { name: "measurement frame", keys: &["measurementframe"], arity: Arity::PerSpace, set: set_measurement_frame },
    FieldSpec { name: "sizes", keys: &["sizes"], arity: Arity::PerAxis, set: set_sizes },
    FieldSpec { name: "spacings", keys: &["spacings"], arity: Arity::PerAxis, set: set_spacings },
    FieldSpec { name: "thicknesses", keys: &["thicknesses"], arity: Arity::PerAxis, set: set_thicknesses },
    FieldSpec { name: "centers", keys: &["centers", "centerings"], arity: Arity::PerAxis, set: set_centers },
    FieldSpec { name: "axis mins", keys: &["axismins"], arity: Arity::PerAxis, set: |h, v| set_axis_bound(h, v, "axis mins", |a| &mut a.min) },
    FieldSpec { name: "axis maxs", keys: &["axismaxs"], arity: Arity::PerAxis, set: |h, v| set_axis_bound(h, v, "axis maxs", |a| &mut a.max) },
    FieldSpec { name: "units", keys: &["units"], arity: Arity::PerAxis, set: |h, v| set_axis_text(h, v, |a| &mut a.unit) },
    FieldSpec { name: "labels", keys: &["labels"], arity: Arity::PerAxis, set: |h, v| set_axis_text(h, v, |a| &mut a.label) },
    FieldSpec { name: "kinds", keys: &["kinds"], arity: Arity::PerAxis, set: set_kinds },
    FieldSpec { name: "block size", keys: &["blocksize"], arity: Arity::Ignored, set: |_, _| Ok(()) },
    FieldSpec { name: "number", keys: &["number"], arity: Arity::Ignored, set: |_, _| Ok(()) },
];

fn find_field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.keys.contains(&key))
}

/// Incremental NRRD header parser.
///
/// Feed it the magic line, then every following line up to (excluding) the
/// blank line that ends the header, then call [`finish`].
///
/// [`finish`]: #method.finish
#[derive(Debug)]
pub struct HeaderParser {
    header: NrrdHeader,
    seen: Vec<&'static str>,
    line: usize,
}

impl Default for HeaderParser {
    fn default() -> Self {
        HeaderParser::new()
    }
}

impl HeaderParser {
    /// Create a parser for a new header.
    pub fn new() -> Self {
        HeaderParser {
            header: NrrdHeader {
                version: 0,
                ..Default::default()
            },
            seen: Vec::new(),
            line: 0,
        }
    }

    /// Check the magic line and record the header version.
    pub fn feed_magic(&mut self, line: &str) -> Result<()> {
        self.line = 1;
        let line = line.trim_end();
        let digits = line.strip_prefix("NRRD").unwrap_or("");
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NrrdError::BadMagic(line.to_string()).at_line(1));
        }
        let version = digits
            .parse::<u32>()
            .map_err(|_| NrrdError::BadMagic(line.to_string()).at_line(1))?;
        if version > SUPPORTED_VERSION {
            log::warn!(
                "NRRD header version {} is newer than the supported version {}",
                version,
                SUPPORTED_VERSION
            );
        }
        self.header.version = version;
        Ok(())
    }

    /// Parse one header line, which may be a comment.
    pub fn feed_line(&mut self, line: &str) -> Result<()> {
        self.line += 1;
        let n = self.line;
        self.parse_line(line).map_err(|e| e.at_line(n))
    }

    fn parse_line(&mut self, line: &str) -> Result<()> {
        if line.starts_with('#') {
            return Ok(());
        }
        let (key, value) = split_line(line);
        if key.is_empty() {
            return Err(NrrdError::InvalidField(
                "header line",
                "each line must contain `: ` or `:=` to define a field".to_string(),
            ));
        }
        if is_custom_line(line) {
            return self.header.custom_fields.insert(key, value);
        }

        let key = normalize_key(key);
        let value = value.trim();
        let spec = find_field(&key).ok_or_else(|| NrrdError::UnknownField(key.clone()))?;
        let subfields = split_subfields(value);
        if subfields.is_empty() {
            return Err(NrrdError::InvalidField(spec.name, "missing field value".to_string()));
        }
        if spec.arity == Arity::Ignored {
            log::debug!("Ignoring NRRD field `{}`", spec.name);
            return Ok(());
        }
        if self.seen.contains(&spec.name) {
            return Err(NrrdError::DuplicateField(spec.name.to_string()));
        }
        match spec.arity {
            Arity::PerAxis => {
                if self.header.axes.is_empty() {
                    return Err(NrrdError::MissingPrerequisite(spec.name, "dimension"));
                }
                if subfields.len() != self.header.axes.len() {
                    return Err(NrrdError::FieldCountMismatch {
                        field: spec.name,
                        expected: self.header.axes.len(),
                        found: subfields.len(),
                    });
                }
            }
            Arity::PerSpace => {
                if self.header.space_dim == 0 {
                    return Err(NrrdError::MissingPrerequisite(spec.name, "space dimension"));
                }
            }
            _ => {}
        }
        log::debug!("NRRD field `{}` = `{}`", spec.name, value);
        (spec.set)(&mut self.header, &FieldValue { raw: value, subfields })?;
        self.seen.push(spec.name);
        Ok(())
    }

    /// Check the mandatory fields, resolve the axis roles, and produce the
    /// header.
    pub fn finish(self) -> Result<NrrdHeader> {
        let mut header = self.header;
        if header.axes.is_empty() {
            return Err(NrrdError::MissingMandatoryField("dimension"));
        }
        if !self.seen.contains(&"sizes") {
            return Err(NrrdError::MissingMandatoryField("sizes"));
        }
        header.resolve();
        header.validate()?;
        Ok(header)
    }
}

/// Read a header from a byte source, returning it along with the number of
/// bytes it took, including the terminating blank line.
pub(crate) fn read_header<R: BufRead>(mut input: R) -> Result<(NrrdHeader, u64)> {
    let mut parser = HeaderParser::new();
    let mut consumed = 0u64;
    let mut buf = Vec::new();

    let n = input.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(NrrdError::BadMagic(String::new()).at_line(1));
    }
    consumed += n as u64;
    parser.feed_magic(&String::from_utf8_lossy(&buf))?;

    loop {
        buf.clear();
        let n = input.read_until(b'\n', &mut buf)?;
        if n == 0 {
            // a detached header may end without a blank line
            break;
        }
        consumed += n as u64;
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(|c| c == '\n' || c == '\r');
        if line.trim().is_empty() {
            break;
        }
        parser.feed_line(line)?;
    }
    Ok((parser.finish()?, consumed))
}

fn set_dimension(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let n = parse_integer(v.raw)?;
    if n < 1 {
        return Err(NrrdError::InvalidField("dimension", "must be positive".to_string()));
    }
    if n > 5 {
        return Err(NrrdError::UnsupportedFeature(format!("dimension {} > 5", n)));
    }
    h.axes = (0..n).map(|_| NrrdAxis::default()).collect();
    Ok(())
}

fn set_type(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    h.sample_type = Some(SampleType::from_name(v.raw)?);
    Ok(())
}

fn set_endian(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    h.endianness = Some(parse_endianness(v.raw)?);
    Ok(())
}

fn set_encoding(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    h.encoding = Some(Encoding::from_name(v.raw)?);
    Ok(())
}

fn set_real(target: &mut f64, v: &FieldValue) -> Result<()> {
    *target = parse_real(v.raw)?;
    Ok(())
}

fn set_text(target: &mut Option<String>, v: &FieldValue) -> Result<()> {
    *target = match v.raw {
        t if t.eq_ignore_ascii_case("none") || t == "???" => None,
        t => Some(t.to_string()),
    };
    Ok(())
}

fn set_data_file(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    if v.subfields[0].as_deref() == Some("LIST") {
        return Err(NrrdError::UnsupportedFeature("`data file: LIST` specification".to_string()));
    }
    let n = v.subfields.len();
    if (4..=5).contains(&n) && v.subfields[0].as_deref().map(has_digit_format).unwrap_or(false) {
        return Err(NrrdError::UnsupportedFeature("`data file` sprintf specification".to_string()));
    }
    h.detached = true;
    h.data_file = Some(v.raw.to_string());
    Ok(())
}

fn set_line_skip(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let n = parse_integer(v.raw)?;
    if n < 0 {
        return Err(NrrdError::InvalidField("line skip", "must not be negative".to_string()));
    }
    h.line_skip = n as u64;
    Ok(())
}

fn set_byte_skip(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let n = parse_integer(v.raw)?;
    if n < -1 {
        return Err(NrrdError::InvalidField(
            "byte skip",
            "must be non-negative or -1".to_string(),
        ));
    }
    h.byte_skip = n;
    Ok(())
}

fn check_space_dim(h: &NrrdHeader, field: &'static str, dim: usize) -> Result<()> {
    if h.axes.is_empty() {
        return Err(NrrdError::MissingPrerequisite(field, "dimension"));
    }
    if h.space_dim != 0 {
        return Err(NrrdError::ExclusiveFields("space", "space dimension"));
    }
    if dim > h.axes.len() {
        return Err(NrrdError::InvalidField(
            field,
            format!("space dimension {} exceeds dimension {}", dim, h.axes.len()),
        ));
    }
    Ok(())
}

fn set_space(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let dim = space_dimension(v.raw)
        .ok_or_else(|| NrrdError::UnrecognizedEnumValue("space", v.raw.to_string()))?;
    check_space_dim(h, "space", dim)?;
    h.space = Some(v.raw.to_string());
    h.space_dim = dim;
    Ok(())
}

fn set_space_dimension(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let n = parse_integer(v.raw)?;
    if n < 1 {
        return Err(NrrdError::InvalidField("space dimension", "must be positive".to_string()));
    }
    if n > 4 {
        return Err(NrrdError::UnsupportedFeature(format!("space dimension {} > 4", n)));
    }
    check_space_dim(h, "space dimension", n as usize)?;
    h.space_dim = n as usize;
    Ok(())
}

fn check_count(field: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(NrrdError::FieldCountMismatch {
            field,
            expected,
            found,
        });
    }
    Ok(())
}

fn set_space_units(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    check_count("space units", h.space_dim, v.subfields.len())?;
    h.space_units = Some(v.subfields.clone());
    Ok(())
}

fn set_space_origin(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let mut vectors = split_vectors(v.raw)?;
    check_count("space origin", 1, vectors.len())?;
    let origin = vectors
        .pop()
        .and_then(|o| o)
        .ok_or_else(|| NrrdError::InvalidField("space origin", "missing vector".to_string()))?;
    check_count("space origin", h.space_dim, origin.len())?;
    h.space_origin = Some(origin);
    Ok(())
}

fn set_space_directions(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let rows = split_vectors(v.raw)?;
    check_count("space directions", h.space_dim, rows.len())?;
    for row in rows.iter().flatten() {
        check_count("space directions", h.space_dim, row.len())?;
        if row.iter().any(|x| x.is_infinite()) {
            return Err(NrrdError::InvalidField(
                "space directions",
                "must contain finite values".to_string(),
            ));
        }
    }
    h.space_directions = Some(rows);
    Ok(())
}

fn set_measurement_frame(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    let rows = split_vectors(v.raw)?;
    check_count("measurement frame", h.space_dim, rows.len())?;
    let mut frame = Vec::with_capacity(rows.len());
    for row in rows {
        let row = row.ok_or_else(|| {
            NrrdError::InvalidField("measurement frame", "every row must be given".to_string())
        })?;
        check_count("measurement frame", h.space_dim, row.len())?;
        frame.push(row);
    }
    h.measurement_frame = Some(frame);
    Ok(())
}

fn real_subfield(field: &'static str, s: &Option<String>) -> Result<f64> {
    match s {
        None => Ok(std::f64::NAN),
        Some(t) => {
            let x = parse_real(t)?;
            if x.is_infinite() {
                return Err(NrrdError::InvalidField(field, "must contain finite values".to_string()));
            }
            Ok(x)
        }
    }
}

fn set_sizes(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        let t = s.as_deref().ok_or(NrrdError::MissingMandatoryField("sizes"))?;
        let size = parse_integer(t)?;
        if size <= 0 {
            return Err(NrrdError::InvalidField("sizes", "must contain positive values".to_string()));
        }
        axis.size = size as usize;
    }
    check_kinds(h)
}

fn set_spacings(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        axis.spacing = real_subfield("spacings", s)?;
        if axis.spacing == 0. {
            return Err(NrrdError::InvalidField("spacings", "must contain non-zero values".to_string()));
        }
    }
    Ok(())
}

fn set_thicknesses(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        axis.thickness = real_subfield("thicknesses", s)?;
        if axis.thickness <= 0. {
            return Err(NrrdError::InvalidField("thicknesses", "must contain positive values".to_string()));
        }
    }
    Ok(())
}

fn set_centers(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        axis.center = Center::from_subfield(s.as_deref())?;
    }
    Ok(())
}

fn set_axis_bound(
    h: &mut NrrdHeader,
    v: &FieldValue,
    field: &'static str,
    target: fn(&mut NrrdAxis) -> &mut f64,
) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        *target(axis) = real_subfield(field, s)?;
    }
    Ok(())
}

fn set_axis_text(
    h: &mut NrrdHeader,
    v: &FieldValue,
    target: fn(&mut NrrdAxis) -> &mut Option<String>,
) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        *target(axis) = s.clone();
    }
    Ok(())
}

fn set_kinds(h: &mut NrrdHeader, v: &FieldValue) -> Result<()> {
    for (axis, s) in h.axes.iter_mut().zip(&v.subfields) {
        if let Some(kind) = s {
            let _ = crate::typedef::kind_axis_size(kind)?;
        }
        axis.kind = s.clone();
    }
    check_kinds(h)
}

/// Kinds are checked against sizes once both are known, whichever comes first.
fn check_kinds(h: &NrrdHeader) -> Result<()> {
    for axis in &h.axes {
        if let (Some(kind), true) = (&axis.kind, axis.size > 0) {
            check_kind_size(kind, axis.size)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<NrrdHeader> {
        NrrdHeader::from_bytes(text.as_bytes())
    }

    #[test]
    fn minimal() {
        let h = parse("NRRD0004\ntype: uint8\ndimension: 2\nsizes: 3 4\nencoding: raw\n\n").unwrap();
        assert_eq!(h.version, 4);
        assert_eq!(h.width(), 3);
        assert_eq!(h.height(), 4);
        assert_eq!(h.n_images(), 1);
        assert_eq!(h.endianness, None);
    }

    #[test]
    fn field_order_matters() {
        let err = parse("NRRD0004\nsizes: 3 4\ndimension: 2\n\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(matches!(
            err.root(),
            NrrdError::MissingPrerequisite("sizes", "dimension")
        ));
    }

    #[test]
    fn aliased_keys_are_one_field() {
        let err = parse(
            "NRRD0004\ndimension: 1\ncenters: cell\ncenterings: node\n\n",
        )
        .unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(matches!(err.root(), NrrdError::DuplicateField(f) if f == "centers"));
    }

    #[test]
    fn ignored_fields() {
        let h = parse(
            "NRRD0004\ntype: float\nendian: big\ndimension: 1\nsizes: 5\nencoding: raw\nnumber: 5\nblock size: 4\n\n",
        )
        .unwrap();
        assert_eq!(h.sample_type, Some(SampleType::Float32));
    }

    #[test]
    fn kinds_checked_after_sizes() {
        let err = parse("NRRD0004\ndimension: 2\nkinds: rgb-color domain\nsizes: 4 8\n\n").unwrap_err();
        assert_eq!(err.line(), Some(4));
        assert!(matches!(err.root(), NrrdError::KindSizeMismatch { .. }));
    }

    #[test]
    fn space_fields() {
        let err = parse("NRRD0004\ndimension: 3\nspace: RAS\nspace dimension: 3\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::ExclusiveFields(..)));
        let err = parse("NRRD0004\ndimension: 2\nspace: RAS\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::InvalidField("space", _)));
        let err = parse("NRRD0004\ndimension: 3\nspace origin: (0,0,0)\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::MissingPrerequisite("space origin", _)));
        let err = parse("NRRD0004\ndimension: 3\nspace dimension: 3\nspace directions: (1,0,0) (0,inf,0) none\n\n")
            .unwrap_err();
        assert!(matches!(err.root(), NrrdError::InvalidField("space directions", _)));
    }

    #[test]
    fn data_file_forms() {
        let err = parse("NRRD0004\ndata file: LIST 1\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::UnsupportedFeature(_)));
        let err = parse("NRRD0004\ndata file: I.%03d 1 200 2\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::UnsupportedFeature(_)));
        let h = parse(
            "NRRD0004\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: raw\ndata file: my data.raw\n",
        )
        .unwrap();
        assert!(h.detached);
        assert_eq!(h.data_file.as_deref(), Some("my data.raw"));
    }

    #[test]
    fn skips() {
        let err = parse("NRRD0004\nbyte skip: -2\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::InvalidField("byte skip", _)));
        let err = parse("NRRD0004\nline skip: -1\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::InvalidField("line skip", _)));
        let err = parse(
            "NRRD0004\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: gzip\nbyte skip: -1\n\n",
        )
        .unwrap_err();
        assert!(matches!(err, NrrdError::InvalidField("byte skip", _)));
    }

    #[test]
    fn bad_lines() {
        let err = parse("NRRD0004\njust words\n\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
        let err = parse("NRRD0004\nfrobnicate: 1\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::UnknownField(f) if f == "frobnicate"));
        let err = parse("NRRD0004\ndimension: 6\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::UnsupportedFeature(_)));
        let err = parse("NRRD0004\ndimension: 2\nspacings: 1 0\n\n").unwrap_err();
        assert!(matches!(err.root(), NrrdError::InvalidField("spacings", _)));
    }

    #[test]
    fn newer_version_is_accepted() {
        let h = parse("NRRD0009\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: raw\n\n").unwrap();
        assert_eq!(h.version, 9);
    }
}
