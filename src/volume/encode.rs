//! Encoding of planar images into a NRRD payload.
use super::element::PlanarElement;
use super::{Pixels, PlanarImage, SliceRegion};
use crate::error::{NrrdError, Result};
use crate::header::NrrdHeader;
use crate::typedef::SampleType;
use byteordered::Endianness;
use std::io::Write;

const CHUNK_MIN: usize = 65536;

/// Options for writing samples to a byte sink.
///
/// The sink receives the raw samples of the region selected by the header
/// slice flags. Compression, if any, is up to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageEncoder {
    whole_image_buffer: bool,
}

impl ImageEncoder {
    /// Create an encoder which writes in bounded chunks.
    pub fn new() -> Self {
        ImageEncoder::default()
    }

    /// Whether to buffer a whole position before writing it, instead of
    /// writing in bounded chunks.
    pub fn whole_image_buffer(mut self, whole: bool) -> Self {
        self.whole_image_buffer = whole;
        self
    }

    /// The number of bytes written at once, for a position of `size` bytes.
    fn chunk_size(&self, size: usize) -> usize {
        if self.whole_image_buffer || size < 4 {
            return size.max(1);
        }
        let chunk = (size / 50).max(CHUNK_MIN).min(size);
        (chunk - chunk % 4).max(4)
    }

    /// Write the samples of the image region selected by the header.
    ///
    /// # Errors
    ///
    /// - `NrrdError::PixelCountMismatch` if the image shape differs from
    ///   the shape the header describes.
    /// - `NrrdError::UnsupportedSampleKind` for RGB images.
    /// - `NrrdError::IncompatiblePixels` if the header sample type cannot
    ///   be produced from the image cells.
    pub fn encode<W: Write>(&self, header: &NrrdHeader, image: &PlanarImage, sink: W) -> Result<()> {
        let expected = header.image_shape();
        if *image.shape() != expected {
            return Err(NrrdError::PixelCountMismatch {
                expected: expected.sample_count().unwrap_or(usize::MAX),
                found: image.shape().sample_count().unwrap_or(usize::MAX),
            });
        }
        let sample_type = header.data_type()?;
        let region = SliceRegion::from_header(header);
        match image.pixels() {
            Pixels::U8(planes) => self.write_planes(planes, image, &region, sample_type, header.byte_order(), sink),
            Pixels::U16(planes) => self.write_planes(planes, image, &region, sample_type, header.byte_order(), sink),
            Pixels::F32(planes) => self.write_planes(planes, image, &region, sample_type, header.byte_order(), sink),
            Pixels::Rgb(_) => Err(NrrdError::UnsupportedSampleKind("rgb")),
        }
    }

    fn write_planes<T, W>(
        &self,
        planes: &[Vec<T>],
        image: &PlanarImage,
        region: &SliceRegion,
        sample_type: SampleType,
        endianness: Endianness,
        mut sink: W,
    ) -> Result<()>
    where
        T: PlanarElement,
        W: Write,
    {
        if !T::holds(sample_type) {
            return Err(NrrdError::IncompatiblePixels(sample_type, image.pixels().kind()));
        }
        let shape = image.shape();
        let size = region.samples_per_plane() * sample_type.size_of();
        let chunk = self.chunk_size(size);
        let mut buffer = Vec::with_capacity(chunk + sample_type.size_of());

        for t in region.t0..region.t1 {
            for z in region.z0..region.z1 {
                let base = shape.plane_index(region.c0, z, t);
                for y in region.y0..region.y0 + region.ny {
                    for x in region.x0..region.x0 + region.nx {
                        let p = x + y * shape.width;
                        for c in 0..region.nc {
                            planes[base + c][p].write_sample(&mut buffer, sample_type, endianness)?;
                        }
                        if buffer.len() >= chunk {
                            sink.write_all(&buffer)?;
                            buffer.clear();
                        }
                    }
                }
                if !buffer.is_empty() {
                    sink.write_all(&buffer)?;
                    buffer.clear();
                }
            }
        }
        Ok(())
    }
}

/// Write the samples of the image region selected by the header, in
/// bounded chunks.
pub fn encode_image<W: Write>(header: &NrrdHeader, image: &PlanarImage, sink: W) -> Result<()> {
    ImageEncoder::new().encode(header, image, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisRole;
    use crate::volume::{decode_image, ImageShape};
    use pretty_assertions::assert_eq;

    #[test]
    fn encode_interleaves_channels() {
        let header = NrrdHeader::new(&[2, 2, 1], SampleType::Uint8).unwrap();
        let image = PlanarImage::new(
            ImageShape {
                channels: 2,
                ..ImageShape::new(2, 1)
            },
            Pixels::U8(vec![vec![1, 3], vec![2, 4]]),
        )
        .unwrap();
        let mut out = Vec::new();
        encode_image(&header, &image, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn encode_sliced_region() {
        let mut header = NrrdHeader::new(&[2, 2, 3], SampleType::Uint16).unwrap();
        header.space_dim = 3;
        header.resolve();
        header.endianness = Some(Endianness::Big);
        let z = header.axis_indices().get(AxisRole::Z).unwrap();
        header.axes[z].slice = true;
        header.axes[z].slice_index = 1;
        let image = PlanarImage::new(
            header.image_shape(),
            Pixels::U16(vec![vec![0; 4], vec![1, 2, 3, 256], vec![9; 4]]),
        )
        .unwrap();
        let mut out = Vec::new();
        ImageEncoder::new()
            .whole_image_buffer(true)
            .encode(&header, &image, &mut out)
            .unwrap();
        assert_eq!(out, [0, 1, 0, 2, 0, 3, 1, 0]);
    }

    #[test]
    fn encode_then_decode_int16() {
        let mut header = NrrdHeader::new(&[3, 1], SampleType::Int16).unwrap();
        header.endianness = Some(Endianness::Little);
        let image = PlanarImage::new(ImageShape::new(3, 1), Pixels::U16(vec![vec![0, 0x8000, 0xFFFF]])).unwrap();
        let mut out = Vec::new();
        encode_image(&header, &image, &mut out).unwrap();
        assert_eq!(out, [0x00, 0x80, 0x00, 0x00, 0xFF, 0x7F]);
        let (back, _) = decode_image(&header, &out[..]).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn rejected_pixels() {
        let header = NrrdHeader::new(&[2, 1], SampleType::Float32).unwrap();
        let mut out = Vec::new();
        let image = PlanarImage::new(ImageShape::new(2, 1), Pixels::U8(vec![vec![1, 2]])).unwrap();
        assert!(matches!(
            encode_image(&header, &image, &mut out),
            Err(NrrdError::IncompatiblePixels(SampleType::Float32, "u8"))
        ));
        let image = PlanarImage::new(ImageShape::new(2, 1), Pixels::Rgb(vec![vec![1, 2]])).unwrap();
        assert!(matches!(
            encode_image(&header, &image, &mut out),
            Err(NrrdError::UnsupportedSampleKind("rgb"))
        ));
        let image = PlanarImage::new(ImageShape::new(1, 2), Pixels::F32(vec![vec![1., 2.]])).unwrap();
        assert!(matches!(
            encode_image(&header, &image, &mut out),
            Err(NrrdError::PixelCountMismatch { .. })
        ));
        assert!(out.is_empty());
    }
}
