//! Interfaces and implementations specific to integration with `ndarray`.
//!
//! This module introduces the trait [`IntoNdArray`], which is implemented
//! for planar images and maps them into an [`Array`] of `f32` with a
//! dynamic number of dimensions.
//!
//! #### Note on memory order
//!
//! The axes of the array follow the on-disk axis order: channel, x, y,
//! slice and frame, with axes of size 1 left out (except for x). Since the
//! first axis varies fastest on disk, the resulting array is in column
//! major order (also called Fortran order).
//!
//! [`IntoNdArray`]: ./trait.IntoNdArray.html
//! [`Array`]: ../../../ndarray/type.Array.html
use super::{Pixels, PlanarImage};
use crate::error::{NrrdError, Result};
use ndarray::{Array, IxDyn, ShapeBuilder};
use num_traits::AsPrimitive;

/// Trait for images which can be converted to an ndarray.
///
/// Please see the [module-level documentation](index.html) for more details.
pub trait IntoNdArray {
    /// Consume the image into an ndarray of `f32` cells.
    fn into_ndarray(self) -> Result<Array<f32, IxDyn>>;
}

fn interleave<T: AsPrimitive<f32>>(image: &PlanarImage, planes: &[Vec<T>]) -> Vec<f32> {
    let shape = image.shape();
    let mut data = Vec::with_capacity(shape.n_images() * shape.plane_len());
    for t in 0..shape.frames {
        for z in 0..shape.slices {
            let base = shape.plane_index(0, z, t);
            for p in 0..shape.plane_len() {
                for c in 0..shape.channels {
                    data.push(planes[base + c][p].as_());
                }
            }
        }
    }
    data
}

impl IntoNdArray for PlanarImage {
    fn into_ndarray(self) -> Result<Array<f32, IxDyn>> {
        let shape = *self.shape();
        let data = match self.pixels() {
            Pixels::U8(p) => interleave(&self, p),
            Pixels::U16(p) => interleave(&self, p),
            Pixels::F32(p) => interleave(&self, p),
            Pixels::Rgb(_) => return Err(NrrdError::UnsupportedSampleKind("rgb")),
        };

        let mut dim = Vec::with_capacity(5);
        if shape.channels > 1 {
            dim.push(shape.channels);
        }
        dim.push(shape.width);
        for &extent in &[shape.height, shape.slices, shape.frames] {
            if extent > 1 {
                dim.push(extent);
            }
        }
        Array::from_shape_vec(IxDyn(&dim).f(), data).map_err(|e| {
            NrrdError::InvalidField("sizes", e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::ImageShape;

    #[test]
    fn column_major_channels_first() {
        let shape = ImageShape {
            channels: 2,
            width: 3,
            height: 2,
            slices: 1,
            frames: 1,
        };
        let image = PlanarImage::new(
            shape,
            Pixels::U8(vec![vec![0, 1, 2, 3, 4, 5], vec![10, 11, 12, 13, 14, 15]]),
        )
        .unwrap();
        let array = image.into_ndarray().unwrap();
        assert_eq!(array.shape(), &[2, 3, 2]);
        assert_eq!(array[[0, 1, 0]], 1.);
        assert_eq!(array[[1, 2, 1]], 15.);
        assert_eq!(array[[1, 0, 1]], 13.);
    }

    #[test]
    fn frames_without_slices() {
        let shape = ImageShape {
            frames: 2,
            ..ImageShape::new(2, 1)
        };
        let image = PlanarImage::new(shape, Pixels::F32(vec![vec![0.5, 1.], vec![2., 3.]])).unwrap();
        let array = image.into_ndarray().unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 1]], 3.);
    }
}
