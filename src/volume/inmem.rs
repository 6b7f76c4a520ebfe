//! Decoding of a whole NRRD payload into an in-memory planar image.
use super::streamed::{StreamedNrrdVolume, DEFAULT_CHUNK_MIN};
use super::{Pixels, PlanarImage};
use crate::error::Result;
use crate::header::NrrdHeader;
use std::io::Read;

/// What happened while decoding an image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeReport {
    /// Whether the source ended early. The missing samples were read as zero.
    pub truncated: bool,
}

/// Decode a whole image from a stream of sample data, as described by the
/// header. The stream must start at the first sample.
///
/// A source that ends early is not an error: the rest of the image is
/// zero-filled and the report says so.
pub fn decode_image<R: Read>(header: &NrrdHeader, source: R) -> Result<(PlanarImage, DecodeReport)> {
    decode_image_chunked(header, source, DEFAULT_CHUNK_MIN)
}

pub(crate) fn decode_image_chunked<R: Read>(
    header: &NrrdHeader,
    source: R,
    chunk_min: usize,
) -> Result<(PlanarImage, DecodeReport)> {
    let mut volume = StreamedNrrdVolume::from_reader(source, header)?.with_chunk_min(chunk_min);
    let shape = *volume.shape();
    let mut pixels = Pixels::zeroed(volume.sample_type(), 0, shape.plane_len());
    for planes in &mut volume {
        pixels.append(planes?)?;
    }
    let report = DecodeReport {
        truncated: volume.truncated(),
    };
    Ok((PlanarImage::new(shape, pixels)?, report))
}
