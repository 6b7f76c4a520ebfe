//! This module defines the planar image representation, as well as the
//! codec that moves samples between a NRRD payload and planar buffers.
//!
//! On disk, samples are channel-interleaved with the first axis varying
//! fastest. In memory, an image is a list of planes, one per channel per
//! (slice, frame) position, ordered by `(t * slices + z) * channels + c`.
//! An integration with `ndarray` is available with the `ndarray_volumes`
//! feature.

pub mod element;
mod encode;
mod inmem;
#[cfg(feature = "ndarray_volumes")]
pub mod ndarray;
pub mod streamed;

pub use self::element::PlanarElement;
pub use self::encode::{encode_image, ImageEncoder};
pub use self::inmem::{decode_image, DecodeReport};
pub(crate) use self::inmem::decode_image_chunked;
pub use self::streamed::StreamedNrrdVolume;

use crate::error::{NrrdError, Result};
use crate::header::NrrdHeader;
use crate::typedef::SampleType;
use num_traits::AsPrimitive;

/// The planar extents of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageShape {
    /// Number of channels.
    pub channels: usize,
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    /// Number of slices.
    pub slices: usize,
    /// Number of frames.
    pub frames: usize,
}

impl ImageShape {
    /// Create a single channel shape of one plane.
    pub fn new(width: usize, height: usize) -> Self {
        ImageShape {
            channels: 1,
            width,
            height,
            slices: 1,
            frames: 1,
        }
    }

    /// Number of planes. Saturates on overflow.
    pub fn n_images(&self) -> usize {
        self.channels.saturating_mul(self.slices).saturating_mul(self.frames)
    }

    /// Number of pixels in one plane. Saturates on overflow.
    pub fn plane_len(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Number of pixels in the image, or `None` if it overflows.
    pub fn sample_count(&self) -> Option<usize> {
        [self.width, self.height, self.slices, self.frames]
            .iter()
            .try_fold(self.channels, |acc, &n| acc.checked_mul(n))
    }

    /// Position of the plane for the given channel, slice and frame.
    pub fn plane_index(&self, c: usize, z: usize, t: usize) -> usize {
        (t * self.slices + z) * self.channels + c
    }
}

/// Planar pixel buffers, one variant per cell type.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// 8 bit cells, holding `uint8` and shifted `int8` samples.
    U8(Vec<Vec<u8>>),
    /// 16 bit cells, holding `uint16` and shifted `int16` samples.
    U16(Vec<Vec<u16>>),
    /// 32 bit float cells, holding every wider sample type.
    F32(Vec<Vec<f32>>),
    /// Packed RGB cells. These can be held, but not encoded.
    Rgb(Vec<Vec<u32>>),
}

impl Pixels {
    /// Create zeroed planes of the cell type that holds the given sample type.
    pub fn zeroed(sample_type: SampleType, n_planes: usize, plane_len: usize) -> Pixels {
        match sample_type {
            SampleType::Uint8 | SampleType::Int8 => Pixels::U8(vec![vec![0; plane_len]; n_planes]),
            SampleType::Uint16 | SampleType::Int16 => Pixels::U16(vec![vec![0; plane_len]; n_planes]),
            _ => Pixels::F32(vec![vec![0.; plane_len]; n_planes]),
        }
    }

    /// A short name of the cell type.
    pub fn kind(&self) -> &'static str {
        match self {
            Pixels::U8(_) => "u8",
            Pixels::U16(_) => "u16",
            Pixels::F32(_) => "f32",
            Pixels::Rgb(_) => "rgb",
        }
    }

    /// Number of planes.
    pub fn n_planes(&self) -> usize {
        match self {
            Pixels::U8(p) => p.len(),
            Pixels::U16(p) => p.len(),
            Pixels::F32(p) => p.len(),
            Pixels::Rgb(p) => p.len(),
        }
    }

    fn plane_lens(&self) -> Vec<usize> {
        match self {
            Pixels::U8(p) => p.iter().map(Vec::len).collect(),
            Pixels::U16(p) => p.iter().map(Vec::len).collect(),
            Pixels::F32(p) => p.iter().map(Vec::len).collect(),
            Pixels::Rgb(p) => p.iter().map(Vec::len).collect(),
        }
    }

    /// The sample type written for these cells when none is requested.
    ///
    /// # Errors
    ///
    /// - `NrrdError::UnsupportedSampleKind` for RGB cells.
    pub fn sample_type(&self) -> Result<SampleType> {
        match self {
            Pixels::U8(_) => Ok(SampleType::Uint8),
            Pixels::U16(_) => Ok(SampleType::Uint16),
            Pixels::F32(_) => Ok(SampleType::Float32),
            Pixels::Rgb(_) => Err(NrrdError::UnsupportedSampleKind("rgb")),
        }
    }

    /// Move the planes of `other` to the end of these planes.
    ///
    /// # Errors
    ///
    /// - `NrrdError::IncompatiblePixels` if the cell types differ.
    pub fn append(&mut self, other: Pixels) -> Result<()> {
        match (self, other) {
            (Pixels::U8(a), Pixels::U8(mut b)) => a.append(&mut b),
            (Pixels::U16(a), Pixels::U16(mut b)) => a.append(&mut b),
            (Pixels::F32(a), Pixels::F32(mut b)) => a.append(&mut b),
            (Pixels::Rgb(a), Pixels::Rgb(mut b)) => a.append(&mut b),
            (a, _) => {
                let sample_type = a.sample_type()?;
                return Err(NrrdError::IncompatiblePixels(sample_type, "other cell type"));
            }
        }
        Ok(())
    }
}

fn range_of<T: AsPrimitive<f64>>(planes: &[Vec<T>]) -> Option<(f64, f64)> {
    planes.iter().flatten().fold(None, |range, v| {
        let v: f64 = (*v).as_();
        match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        }
    })
}

/// An image held as planar buffers along with its shape.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarImage {
    shape: ImageShape,
    pixels: Pixels,
}

impl PlanarImage {
    /// Pair the given planes with a shape.
    ///
    /// # Errors
    ///
    /// - `NrrdError::PixelCountMismatch` if there is not one plane per
    ///   channel, slice and frame, or a plane is not `width * height` long.
    pub fn new(shape: ImageShape, pixels: Pixels) -> Result<Self> {
        if pixels.n_planes() != shape.n_images() {
            return Err(NrrdError::PixelCountMismatch {
                expected: shape.n_images(),
                found: pixels.n_planes(),
            });
        }
        if let Some(len) = pixels.plane_lens().into_iter().find(|l| *l != shape.plane_len()) {
            return Err(NrrdError::PixelCountMismatch {
                expected: shape.plane_len(),
                found: len,
            });
        }
        Ok(PlanarImage { shape, pixels })
    }

    /// The image extents.
    pub fn shape(&self) -> &ImageShape {
        &self.shape
    }

    /// The planar buffers.
    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }

    /// Consume the image, retrieving its planar buffers.
    pub fn into_pixels(self) -> Pixels {
        self.pixels
    }

    /// The sample type written for this image when none is requested.
    pub fn sample_type(&self) -> Result<SampleType> {
        self.pixels.sample_type()
    }

    /// The smallest and largest cell values, or `None` for an empty or RGB
    /// image.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        match &self.pixels {
            Pixels::U8(p) => range_of(p),
            Pixels::U16(p) => range_of(p),
            Pixels::F32(p) => range_of(p),
            Pixels::Rgb(_) => None,
        }
    }
}

/// The part of an image covered by one output file.
///
/// Channels, columns and rows are written as `nc`, `nx` and `ny` long runs
/// starting at `c0`, `x0` and `y0`. Slices and frames cover the half-open
/// ranges `z0..z1` and `t0..t1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRegion {
    /// First channel.
    pub c0: usize,
    /// Number of channels.
    pub nc: usize,
    /// First column.
    pub x0: usize,
    /// Number of columns.
    pub nx: usize,
    /// First row.
    pub y0: usize,
    /// Number of rows.
    pub ny: usize,
    /// First slice.
    pub z0: usize,
    /// One past the last slice.
    pub z1: usize,
    /// First frame.
    pub t0: usize,
    /// One past the last frame.
    pub t1: usize,
}

impl SliceRegion {
    /// The region covering the whole image.
    pub fn full(shape: &ImageShape) -> Self {
        SliceRegion {
            c0: 0,
            nc: shape.channels,
            x0: 0,
            nx: shape.width,
            y0: 0,
            ny: shape.height,
            z0: 0,
            z1: shape.slices,
            t0: 0,
            t1: shape.frames,
        }
    }

    /// The region selected by the slice flags and indices of the header
    /// axes. A sliced axis contributes only its current index.
    pub fn from_header(header: &NrrdHeader) -> Self {
        use crate::axis::AxisRole;
        let pick = |role: AxisRole, size: usize| match header.axis(role) {
            Some(axis) if axis.slice => (axis.slice_index, 1),
            _ => (0, size),
        };
        let shape = header.image_shape();
        let (c0, nc) = pick(AxisRole::Channel, shape.channels);
        let (x0, nx) = pick(AxisRole::X, shape.width);
        let (y0, ny) = pick(AxisRole::Y, shape.height);
        let (z0, nz) = pick(AxisRole::Z, shape.slices);
        let (t0, nt) = pick(AxisRole::Time, shape.frames);
        SliceRegion {
            c0,
            nc,
            x0,
            nx,
            y0,
            ny,
            z0,
            z1: z0 + nz,
            t0,
            t1: t0 + nt,
        }
    }

    /// Number of samples written per (slice, frame) position.
    pub fn samples_per_plane(&self) -> usize {
        self.nc * self.nx * self.ny
    }

    /// Number of (slice, frame) positions covered.
    pub fn n_positions(&self) -> usize {
        (self.z1 - self.z0) * (self.t1 - self.t0)
    }
}
