//! Conversion between NRRD geometry and planar image calibration.
//!
//! A [`Calibration`] describes the pixel size, origin and units of a planar
//! image. The origin is expressed in pixels, measured from the corner of the
//! first pixel, while NRRD positions are expressed in world units and point
//! at sample centers.
//!
//! [`Calibration`]: ./struct.Calibration.html

use crate::axis::{AxisRole, NrrdAxis};
use crate::error::{NrrdError, Result};
use crate::header::NrrdHeader;
use crate::typedef::{space_dimension, Center, Encoding, SampleType};
use crate::volume::ImageShape;
use byteordered::Endianness;

/// Spatial and value calibration of a planar image.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Column spacing.
    pub pixel_width: f64,
    /// Row spacing.
    pub pixel_height: f64,
    /// Slice spacing.
    pub pixel_depth: f64,
    /// Time between frames.
    pub frame_interval: f64,
    /// Column origin, in pixels.
    pub x_origin: f64,
    /// Row origin, in pixels.
    pub y_origin: f64,
    /// Slice origin, in pixels.
    pub z_origin: f64,
    /// Unit of `pixel_width`.
    pub x_unit: Option<String>,
    /// Unit of `pixel_height`.
    pub y_unit: Option<String>,
    /// Unit of `pixel_depth`.
    pub z_unit: Option<String>,
    /// Unit of `frame_interval`.
    pub time_unit: Option<String>,
    /// Unit of the sample values.
    pub value_unit: Option<String>,
    /// Free-form image description.
    pub info: Option<String>,
    /// Range of sample values to display.
    pub display_range: Option<(f64, f64)>,
    /// Offset to add to stored samples to recover signed values.
    pub value_offset: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            pixel_width: 1.,
            pixel_height: 1.,
            pixel_depth: 1.,
            frame_interval: 1.,
            x_origin: 0.,
            y_origin: 0.,
            z_origin: 0.,
            x_unit: None,
            y_unit: None,
            z_unit: None,
            time_unit: None,
            value_unit: None,
            info: None,
            display_range: None,
            value_offset: 0.,
        }
    }
}

impl Calibration {
    /// Whether the image has spatial scaling or spatial units.
    pub fn scaled(&self) -> bool {
        self.pixel_width != 1.
            || self.pixel_height != 1.
            || self.pixel_depth != 1.
            || self.x_unit.is_some()
            || self.y_unit.is_some()
            || self.z_unit.is_some()
    }

    /// Whether the image origin is not at the first pixel.
    pub fn has_origin(&self) -> bool {
        self.x_origin != 0. || self.y_origin != 0. || self.z_origin != 0.
    }
}

/// Convert a NRRD space origin coordinate into a pixel origin.
pub fn origin_from_nrrd(space_origin: f64, spacing: f64) -> f64 {
    -(space_origin / spacing - 0.5)
}

/// Convert a pixel origin into a NRRD space origin coordinate.
pub fn origin_to_nrrd(pixel_origin: f64, spacing: f64) -> f64 {
    spacing * (0.5 - pixel_origin)
}

/// Determine the sample spacing of an axis.
///
/// The row norm of the space direction is preferred, then the axis spacing,
/// then the axis extent. Falls back to 1.
pub fn axis_spacing(header: &NrrdHeader, axis: Option<usize>, space: Option<usize>) -> f64 {
    let a = match axis.and_then(|i| header.axes.get(i)) {
        Some(a) => a,
        None => return 1.,
    };
    let row = space
        .filter(|s| *s < header.space_dim)
        .and_then(|s| header.space_directions.as_ref()?.get(s)?.as_ref());
    if let Some(row) = row {
        let sum_sq: f64 = row.iter().filter(|x| !x.is_nan()).map(|x| x * x).sum();
        if sum_sq <= 0. {
            return 1.;
        }
        return sum_sq.sqrt();
    }
    if !a.spacing.is_nan() {
        return a.spacing;
    }
    if !a.min.is_nan() && !a.max.is_nan() {
        let adjust = if a.center != Center::Cell && a.size > 1 { 1 } else { 0 };
        return (a.max - a.min) / (a.size - adjust) as f64;
    }
    1.
}

/// Determine the pixel origin of an axis, from the space origin or else
/// from the axis minimum. Gives 0 when neither is known.
pub fn axis_origin(header: &NrrdHeader, axis: Option<usize>, space: Option<usize>, spacing: f64) -> f64 {
    let a = match axis.and_then(|i| header.axes.get(i)) {
        Some(a) => a,
        None => return 0.,
    };
    if spacing <= 0. {
        return 0.;
    }
    let origin = space
        .filter(|s| *s < header.space_dim)
        .and_then(|s| header.space_origin.as_ref()?.get(s).copied());
    if let Some(o) = origin {
        return origin_from_nrrd(o, spacing);
    }
    if !a.min.is_nan() {
        return -(a.min / spacing - a.center.adjustment());
    }
    0.
}

impl NrrdHeader {
    /// Derive the calibration of the image described by this header.
    pub fn calibration(&self) -> Calibration {
        let idx = *self.axis_indices();
        let si = *self.space_indices();
        let mut cal = Calibration {
            info: self.content.clone(),
            value_unit: self.sample_units.clone(),
            value_offset: self.sample_type.map(SampleType::signed_offset).unwrap_or(0.),
            ..Default::default()
        };
        if !self.min.is_nan() && !self.max.is_nan() {
            cal.display_range = Some((self.min, self.max));
        }

        let unit_of = |role: AxisRole| -> Option<String> {
            let axis = self.axis(role)?;
            match &self.space_units {
                Some(units) if role != AxisRole::Time => {
                    si.get(role).and_then(|s| units.get(s).cloned().flatten())
                }
                _ => axis.unit.clone(),
            }
        };
        cal.x_unit = unit_of(AxisRole::X);
        cal.y_unit = unit_of(AxisRole::Y);
        cal.z_unit = unit_of(AxisRole::Z);
        cal.time_unit = self.axis(AxisRole::Time).and_then(|a| a.unit.clone());

        cal.pixel_width = axis_spacing(self, idx.x, si.x);
        cal.pixel_height = axis_spacing(self, idx.y, si.y);
        cal.pixel_depth = axis_spacing(self, idx.z, si.z);
        cal.frame_interval = axis_spacing(self, idx.time, si.time);

        cal.x_origin = axis_origin(self, idx.x, si.x, cal.pixel_width);
        cal.y_origin = axis_origin(self, idx.y, si.y, cal.pixel_height);
        cal.z_origin = axis_origin(self, idx.z, si.z, cal.pixel_depth);
        cal
    }

    /// Build the header for writing a planar image with the given shape,
    /// sample type and calibration.
    ///
    /// When a `previous` header is given, such as the one the image was read
    /// with, the metadata of its axes and its custom fields are kept. The
    /// spatial fields are always rewritten from the calibration, except for
    /// the time origin which a calibration cannot hold.
    pub fn from_calibration(
        shape: &ImageShape,
        sample_type: SampleType,
        cal: &Calibration,
        previous: Option<&NrrdHeader>,
    ) -> Result<NrrdHeader> {
        if shape.width == 0 || shape.height == 0 || shape.n_images() == 0 {
            return Err(NrrdError::MissingMandatoryField("sizes"));
        }
        let prev = previous.cloned().unwrap_or_default();
        let old_indices = *prev.axis_indices();
        let old_space = *prev.space_indices();

        let mut roles = Vec::with_capacity(5);
        if shape.channels > 1 {
            roles.push((AxisRole::Channel, shape.channels));
        }
        roles.push((AxisRole::X, shape.width));
        if shape.height > 1 {
            roles.push((AxisRole::Y, shape.height));
        }
        if shape.slices > 1 {
            roles.push((AxisRole::Z, shape.slices));
        }
        if shape.frames > 1 {
            roles.push((AxisRole::Time, shape.frames));
        }

        let axes: Vec<NrrdAxis> = roles
            .iter()
            .map(|(role, size)| {
                let mut axis = old_indices
                    .get(*role)
                    .and_then(|i| prev.axes.get(i).cloned())
                    .unwrap_or_else(|| NrrdAxis::with_role(*role));
                axis.size = *size;
                if let Some(kind) = role.default_kind() {
                    axis.kind = Some(kind.to_string());
                }
                axis
            })
            .collect();

        let space_dim = roles.iter().filter(|(r, _)| *r != AxisRole::Channel).count();
        let space = prev
            .space
            .clone()
            .filter(|s| space_dimension(s) == Some(space_dim));

        let mut header = NrrdHeader::default();
        header.axes = axes;
        header.sample_type = Some(sample_type);
        header.encoding = Some(prev.encoding.unwrap_or(Encoding::Raw));
        header.endianness = Some(prev.endianness.unwrap_or_else(Endianness::native));
        header.content = cal.info.clone().or_else(|| prev.content.clone());
        header.sample_units = cal.value_unit.clone();
        header.space = space;
        header.space_dim = space_dim;
        header.space_origin = prev.space_origin.clone().filter(|o| o.len() == space_dim);
        header.measurement_frame = prev.measurement_frame.clone();
        header.custom_fields = prev.custom_fields.clone();
        header.detached = prev.detached;
        header.min = prev.min;
        header.max = prev.max;
        header.old_min = prev.old_min;
        header.old_max = prev.old_max;
        for axis in header.axes.iter_mut() {
            axis.slice = false;
            axis.slice_index = 0;
        }
        let layout: Vec<AxisRole> = roles.iter().map(|(r, _)| *r).collect();
        header.set_layout(&layout)?;
        let si = *header.space_indices();

        if si != old_space || header.space_origin.is_none() {
            let mut origin = vec![std::f64::NAN; space_dim];
            if let (Some(old), Some(t), Some(old_t)) = (&prev.space_origin, si.time, old_space.time) {
                if let (Some(slot), Some(v)) = (origin.get_mut(t), old.get(old_t)) {
                    *slot = *v;
                }
            }
            header.space_origin = Some(origin);
            if si != old_space {
                header.measurement_frame = None;
            }
        }

        let mut units: Vec<Option<String>> = vec![None; space_dim];
        let mut directions: Vec<Option<Vec<f64>>> = vec![Some(vec![0.; space_dim]); space_dim];
        let mut found_spacing = false;
        let set_diag = |d: &mut Vec<Option<Vec<f64>>>, s: usize, v: f64| {
            if let Some(Some(row)) = d.get_mut(s) {
                row[s] = v;
            }
        };
        if cal.frame_interval != 1. {
            if let Some(t) = si.time {
                set_diag(&mut directions, t, cal.frame_interval);
                units[t] = cal.time_unit.clone();
            }
            found_spacing = true;
        }
        let (pw, ph, pd) = if cal.scaled() {
            let spatial = [
                (si.x, cal.pixel_width, &cal.x_unit),
                (si.y, cal.pixel_height, &cal.y_unit),
                (si.z, cal.pixel_depth, &cal.z_unit),
            ];
            for &(s, spacing, unit) in spatial.iter() {
                if let Some(s) = s {
                    set_diag(&mut directions, s, spacing);
                    units[s] = unit.clone();
                }
            }
            found_spacing = true;
            (cal.pixel_width, cal.pixel_height, cal.pixel_depth)
        } else {
            (1., 1., 1.)
        };
        if found_spacing {
            header.space_units = Some(units);
            header.space_directions = Some(directions);
        }

        if cal.has_origin() {
            if let Some(origin) = header.space_origin.as_mut() {
                let spatial = [(si.x, cal.x_origin, pw), (si.y, cal.y_origin, ph), (si.z, cal.z_origin, pd)];
                for &(s, o, spacing) in spatial.iter() {
                    if let Some(s) = s.filter(|s| *s < origin.len()) {
                        origin[s] = origin_to_nrrd(o, spacing);
                    }
                }
            }
        } else {
            let keep_time = match (si.time, &header.space_origin) {
                (Some(t), Some(origin)) => origin.get(t).map(|v| !v.is_nan()).unwrap_or(false),
                _ => false,
            };
            if !keep_time {
                header.space_origin = None;
            }
        }

        if let Some((min, max)) = cal.display_range {
            header.min = min;
            header.max = max;
        }
        Ok(header)
    }
}
