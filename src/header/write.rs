//! Serialization of a header into NRRD text.
//!
//! Axes flagged for slicing are masked out of every per-axis and per-space
//! field, so that the text describes one slice of the image. Each sliced
//! axis leaves behind a pair of custom fields recording its index and size.
use super::{NrrdHeader, SUPPORTED_VERSION};
use crate::axis::{AxisRole, NrrdAxis};
use crate::error::{NrrdError, Result};
use crate::grammar::{clean_field, format_real, format_vector, quote_subfield};
use crate::typedef::{endianness_name, space_dimension, Encoding, SampleType};
use std::fmt::Write as _;
use std::io::Write;

/// The name of the data file that goes along with a detached header file.
///
/// The extension of the header name is replaced with `.raw` (or `.raw.gz`
/// for gzip). The result never equals the header name.
pub fn data_file_name(header_name: &str, encoding: Encoding) -> String {
    let stem = match header_name.rfind('.') {
        Some(i) => &header_name[..i],
        None => header_name,
    };
    let mut name = clean_field(stem);
    name.push('.');
    name.push_str(encoding.data_file_extension());
    if name == header_name {
        name.push_str(".dat");
    }
    name
}

fn push_line(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(value);
    out.push('\n');
}

/// Write a per-axis field if any axis has a value for it.
fn push_axes<F>(out: &mut String, key: &str, axes: &[&NrrdAxis], has: fn(&NrrdAxis) -> bool, fmt: F)
where
    F: Fn(&NrrdAxis) -> String,
{
    if !axes.iter().any(|a| has(*a)) {
        return;
    }
    let values: Vec<String> = axes.iter().map(|a| fmt(*a)).collect();
    push_line(out, key, &values.join(" "));
}

fn sample<T: Clone>(values: &[T], indices: &[usize], missing: T) -> Vec<T> {
    indices
        .iter()
        .map(|i| values.get(*i).cloned().unwrap_or_else(|| missing.clone()))
        .collect()
}

impl NrrdHeader {
    /// The axes that remain once sliced axes are taken out, in order.
    fn masked_axes(&self) -> Vec<&NrrdAxis> {
        self.axes.iter().filter(|a| !a.slice).collect()
    }

    /// The space indices of the spatial axes that are not sliced, in
    /// X, Y, Z, T order.
    fn masked_space_indices(&self) -> Vec<usize> {
        [AxisRole::X, AxisRole::Y, AxisRole::Z, AxisRole::Time]
            .iter()
            .filter(|role| self.axis(**role).map(|a| !a.slice).unwrap_or(false))
            .filter_map(|role| self.space_indices().get(*role))
            .collect()
    }

    /// Produce the header text, up to and including the blank line that
    /// terminates it.
    ///
    /// # Errors
    ///
    /// - `NrrdError::MissingMandatoryField` if the sample type or encoding
    ///   are not set, or if the header is detached without a data file name.
    pub fn to_text(&self) -> Result<String> {
        let sample_type = self.data_type()?;
        let encoding = self
            .encoding
            .ok_or(NrrdError::MissingMandatoryField("encoding"))?;

        let mut out = String::new();
        let _ = writeln!(out, "NRRD{:04}", SUPPORTED_VERSION);
        out.push_str("# Created by nrrd-rs\n");
        push_line(&mut out, "type", sample_type.name());
        if sample_type != SampleType::Uint8 {
            push_line(&mut out, "endian", endianness_name(self.byte_order()));
        }
        push_line(&mut out, "encoding", encoding.name());

        let axes = self.masked_axes();
        push_line(&mut out, "dimension", &axes.len().to_string());
        let sizes: Vec<String> = axes.iter().map(|a| a.size.to_string()).collect();
        push_line(&mut out, "sizes", &sizes.join(" "));

        push_axes(&mut out, "kinds", &axes, |a| a.kind.is_some(), |a| {
            quote_subfield(a.kind.as_deref())
        });
        push_axes(&mut out, "labels", &axes, |a| a.label.is_some(), |a| {
            quote_subfield(a.label.as_deref())
        });
        push_axes(&mut out, "units", &axes, |a| a.unit.is_some(), |a| {
            quote_subfield(a.unit.as_deref())
        });
        push_axes(&mut out, "spacings", &axes, |a| !a.spacing.is_nan(), |a| format_real(a.spacing));
        push_axes(&mut out, "thicknesses", &axes, |a| !a.thickness.is_nan(), |a| {
            format_real(a.thickness)
        });
        push_axes(&mut out, "centers", &axes, |a| a.center.name().is_some(), |a| {
            a.center.name().unwrap_or("none").to_string()
        });
        push_axes(&mut out, "axis mins", &axes, |a| !a.min.is_nan(), |a| format_real(a.min));
        push_axes(&mut out, "axis maxs", &axes, |a| !a.max.is_nan(), |a| format_real(a.max));

        let si = self.masked_space_indices();
        if self.space_dim > 0 && !si.is_empty() {
            self.push_space(&mut out, &si);
        }

        for (key, value) in &[
            ("min", self.min),
            ("max", self.max),
            ("old min", self.old_min),
            ("old max", self.old_max),
        ] {
            if !value.is_nan() {
                push_line(&mut out, key, &format_real(*value));
            }
        }
        if let Some(units) = &self.sample_units {
            push_line(&mut out, "sample units", &clean_field(units));
        }
        if let Some(content) = &self.content {
            push_line(&mut out, "content", &clean_field(content));
        }

        out.push_str(&self.custom_fields.to_block());
        for axis in self.axes.iter().filter(|a| a.slice) {
            let name = axis.role.map(AxisRole::name).unwrap_or("axis");
            let key_index = format!("{} index", name);
            let key_count = format!("n {}s", name);
            if self.custom_fields.contains_key(&key_index) || self.custom_fields.contains_key(&key_count) {
                log::warn!(
                    "Custom fields already hold `{}` or `{}`, slice position not recorded",
                    key_index,
                    key_count
                );
                continue;
            }
            let _ = writeln!(out, "{}:={}", key_index, axis.slice_index);
            let _ = writeln!(out, "{}:={}", key_count, axis.size);
        }

        if self.byte_skip != 0 {
            push_line(&mut out, "byte skip", &self.byte_skip.to_string());
        }
        if self.line_skip != 0 {
            push_line(&mut out, "line skip", &self.line_skip.to_string());
        }
        if self.detached {
            let data_file = self
                .data_file
                .as_ref()
                .ok_or(NrrdError::MissingMandatoryField("data file"))?;
            push_line(&mut out, "data file", data_file);
        }

        out.push('\n');
        Ok(out)
    }

    fn push_space(&self, out: &mut String, si: &[usize]) {
        let named = self
            .space
            .as_deref()
            .filter(|s| si.len() == self.space_dim && space_dimension(s) == Some(self.space_dim));
        match named {
            Some(space) => push_line(out, "space", space),
            None => push_line(out, "space dimension", &si.len().to_string()),
        }

        if let Some(units) = &self.space_units {
            let units = sample(units, si, None);
            if units.iter().any(Option::is_some) {
                let values: Vec<String> = units.iter().map(|u| quote_subfield(u.as_deref())).collect();
                push_line(out, "space units", &values.join(" "));
            }
        }
        if let Some(origin) = &self.space_origin {
            let origin = sample(origin, si, std::f64::NAN);
            if origin.iter().any(|x| !x.is_nan()) {
                push_line(out, "space origin", &format_vector(&origin));
            }
        }
        if let Some(directions) = &self.space_directions {
            let rows = sample(directions, si, None);
            if rows.iter().any(Option::is_some) {
                // a row of NaN is written as `none`, just like a missing row
                let values: Vec<String> = rows
                    .iter()
                    .map(|row| match row {
                        Some(row) => format_vector(&sample(row, si, std::f64::NAN)),
                        None => "none".to_string(),
                    })
                    .collect();
                push_line(out, "space directions", &values.join(" "));
            }
        }
        if let Some(frame) = &self.measurement_frame {
            let rows = sample(frame, si, Vec::new());
            if !rows.is_empty() {
                let values: Vec<String> = rows
                    .iter()
                    .map(|row| format_vector(&sample(row, si, std::f64::NAN)))
                    .collect();
                push_line(out, "measurement frame", &values.join(" "));
            }
        }
    }

    /// Write the header text to the given sink.
    pub fn write_header<W: Write>(&self, mut sink: W) -> Result<()> {
        sink.write_all(self.to_text()?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::Center;
    use byteordered::Endianness;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_text() {
        let header = NrrdHeader::new(&[4, 3], SampleType::Uint8).unwrap();
        assert_eq!(
            header.to_text().unwrap(),
            "NRRD0005\n# Created by nrrd-rs\ntype: uint8\nencoding: raw\ndimension: 2\nsizes: 4 3\n\n"
        );
    }

    #[test]
    fn per_axis_fields_fill_sentinels() {
        let mut header = NrrdHeader::new(&[2, 4, 3], SampleType::Int16).unwrap();
        header.endianness = Some(Endianness::Big);
        header.axes[1].spacing = 0.5;
        header.axes[2].kind = Some("space".to_string());
        header.axes[0].center = Center::Cell;
        header.min = -3.;
        header.content = Some("two\nlines".to_string());
        let text = header.to_text().unwrap();
        assert!(text.contains("type: int16\nendian: big\n"));
        assert!(text.contains("kinds: none none \"space\"\n"));
        assert!(text.contains("spacings: nan 0.5 nan\n"));
        assert!(text.contains("centers: cell none none\n"));
        assert!(text.contains("min: -3\n"));
        assert!(text.contains("content: two lines\n"));
        assert!(!text.contains("labels"));
        assert!(!text.contains("max:"));
    }

    #[test]
    fn space_block() {
        let mut header = NrrdHeader::new(&[4, 3, 2], SampleType::Float32).unwrap();
        header.space = Some("left-posterior-superior".to_string());
        header.space_dim = 3;
        header.resolve();
        header.space_origin = Some(vec![1., 2., std::f64::NAN]);
        header.space_directions = Some(vec![
            Some(vec![1., 0., 0.]),
            None,
            Some(vec![std::f64::NAN; 3]),
        ]);
        let text = header.to_text().unwrap();
        assert!(text.contains("space: left-posterior-superior\n"));
        assert!(text.contains("space origin: (1,2,nan)\n"));
        assert!(text.contains("space directions: (1,0,0) none none\n"));
        assert!(!text.contains("space units"));

        // slicing z leaves a 2D space without a name
        header.axes[2].slice = true;
        header.axes[2].slice_index = 1;
        let text = header.to_text().unwrap();
        assert!(text.contains("dimension: 2\nsizes: 4 3\n"));
        assert!(text.contains("space dimension: 2\n"));
        assert!(text.contains("space origin: (1,2)\n"));
        assert!(text.contains("space directions: (1,0) none\n"));
        assert!(text.contains("z index:=1\nn zs:=2\n"));
    }

    #[test]
    fn slice_fields_are_not_duplicated() {
        let mut header = NrrdHeader::new(&[4, 3, 5], SampleType::Uint8).unwrap();
        header.axes[2].slice = true;
        header.custom_fields.set("n zs", "9");
        let text = header.to_text().unwrap();
        assert!(text.contains("n zs:=9\n"));
        assert!(!text.contains("z index"));
    }

    #[test]
    fn trailing_fields() {
        let mut header = NrrdHeader::new(&[4], SampleType::Uint8).unwrap();
        header.byte_skip = -1;
        header.line_skip = 2;
        header.detached = true;
        assert!(header.to_text().is_err());
        header.data_file = Some("a.raw".to_string());
        let text = header.to_text().unwrap();
        assert!(text.ends_with("byte skip: -1\nline skip: 2\ndata file: a.raw\n\n"));
    }

    #[test]
    fn data_file_names() {
        assert_eq!(data_file_name("scan.nhdr", Encoding::Raw), "scan.raw");
        assert_eq!(data_file_name("scan.nhdr", Encoding::Gzip), "scan.raw.gz");
        assert_eq!(data_file_name("scan", Encoding::Raw), "scan.raw");
        assert_eq!(data_file_name("scan.raw", Encoding::Raw), "scan.raw.dat");
    }
}
