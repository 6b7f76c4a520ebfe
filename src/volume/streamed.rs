//! Streamed decoding of a NRRD payload.
//!
//! This API reads an image one (slice, frame) position at a time, producing
//! the planes of every channel at that position. Between two reads, the
//! caller is free to stop, which lowers memory requirements and allows
//! cancelling long reads.
//!
//! Bytes are pulled from the source in chunks of a fraction of the position
//! size, never smaller than a minimum chunk size. When the source ends
//! early, the missing samples are read as zero, a warning is logged once,
//! and [`truncated`] reports it.
//!
//! # Examples
//!
//! ```no_run
//! # use nrrd::{NrrdHeader, Pixels, StreamedNrrdVolume};
//! # fn get_source() -> (NrrdHeader, Box<dyn std::io::Read>) { unimplemented!() }
//! let (header, source) = get_source();
//! let volume = StreamedNrrdVolume::from_reader(source, &header)?;
//! for planes in volume {
//!     let planes: Pixels = planes?;
//!     // use the channel planes of this position
//! }
//! # Ok::<(), nrrd::NrrdError>(())
//! ```
//!
//! [`truncated`]: ./struct.StreamedNrrdVolume.html#method.truncated

use super::element::PlanarElement;
use super::{ImageShape, Pixels};
use crate::error::Result;
use crate::header::NrrdHeader;
use crate::typedef::SampleType;
use byteordered::Endianness;
use std::fmt;
use std::io::{ErrorKind, Read};

/// The smallest number of bytes read from the source at once.
pub const DEFAULT_CHUNK_MIN: usize = 8192;

/// The number of bytes read at once for a position of `byte_count` bytes.
/// Chunks are a 25th of the position, at least `chunk_min` long and
/// otherwise rounded down to a multiple of it. A chunk always holds a whole
/// number of samples.
pub(crate) fn chunk_size(byte_count: usize, sample_size: usize, chunk_min: usize) -> usize {
    let chunk = byte_count / 25;
    let chunk = if chunk <= chunk_min {
        chunk_min
    } else {
        chunk - chunk % chunk_min
    };
    (chunk - chunk % sample_size).max(sample_size)
}

/// A NRRD image that is read position by position from a byte stream.
///
/// See the [module-level documentation] for more details.
///
/// [module-level documentation]: ./index.html
pub struct StreamedNrrdVolume<R> {
    source: R,
    shape: ImageShape,
    sample_type: SampleType,
    endianness: Endianness,
    chunk_min: usize,
    buffer: Vec<u8>,
    planes_read: usize,
    planes_left: usize,
    truncated: bool,
}

impl<R> fmt::Debug for StreamedNrrdVolume<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedNrrdVolume")
            .field("shape", &self.shape)
            .field("sample_type", &self.sample_type)
            .field("endianness", &self.endianness)
            .field("chunk_min", &self.chunk_min)
            .field("planes_read", &self.planes_read)
            .field("planes_left", &self.planes_left)
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl<R> StreamedNrrdVolume<R>
where
    R: Read,
{
    /// Prepare to read an image from a stream of sample data. The header
    /// must be known in advance, and the stream must start at the first
    /// sample, past any skipped lines and bytes and after decompression.
    pub fn from_reader(source: R, header: &NrrdHeader) -> Result<Self> {
        let sample_type = header.data_type()?;
        let shape = header.image_shape();
        Ok(StreamedNrrdVolume {
            source,
            shape,
            sample_type,
            endianness: header.byte_order(),
            chunk_min: DEFAULT_CHUNK_MIN,
            buffer: Vec::new(),
            planes_read: 0,
            planes_left: shape.slices * shape.frames,
            truncated: false,
        })
    }

    /// Change the smallest number of bytes read from the source at once.
    pub fn with_chunk_min(mut self, chunk_min: usize) -> Self {
        self.chunk_min = chunk_min.max(1);
        self
    }

    /// Retrieve the full image shape.
    pub fn shape(&self) -> &ImageShape {
        &self.shape
    }

    /// Retrieve the sample type of the stream.
    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// Retrieve the number of positions already read.
    pub fn planes_read(&self) -> usize {
        self.planes_read
    }

    /// Retrieve the number of positions left.
    pub fn planes_left(&self) -> usize {
        self.planes_left
    }

    /// Whether the source ended before all samples were read.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Read the planes of all channels at the next (slice, frame) position.
    /// Positions are read slice by slice, then frame by frame.
    pub fn read_plane(&mut self) -> Result<Pixels> {
        match self.sample_type {
            SampleType::Uint8 | SampleType::Int8 => self.read_planes::<u8>(),
            SampleType::Uint16 | SampleType::Int16 => self.read_planes::<u16>(),
            _ => self.read_planes::<f32>(),
        }
    }

    fn read_planes<T: PlanarElement>(&mut self) -> Result<Pixels> {
        let nc = self.shape.channels;
        let plane_len = self.shape.plane_len();
        let sample_size = self.sample_type.size_of();
        let byte_count = sample_size * nc * plane_len;
        let chunk = chunk_size(byte_count, sample_size, self.chunk_min);
        if self.planes_read == 0 {
            log::debug!("Reading {} bytes per position in chunks of {}", byte_count, chunk);
        }

        let mut planes = vec![vec![T::default(); plane_len]; nc];
        let mut iv = 0;
        let mut remaining = byte_count;
        while remaining > 0 {
            let len = chunk.min(remaining);
            self.fill(len)?;
            let mut cursor: &[u8] = &self.buffer;
            for _ in 0..len / sample_size {
                planes[iv % nc][iv / nc] = T::read_sample(&mut cursor, self.sample_type, self.endianness)?;
                iv += 1;
            }
            remaining -= len;
        }

        self.planes_read += 1;
        self.planes_left = self.planes_left.saturating_sub(1);
        Ok(T::into_pixels(planes))
    }

    /// Fill the buffer with the next `len` bytes, zero-filling whatever the
    /// source cannot provide.
    fn fill(&mut self, len: usize) -> Result<()> {
        self.buffer.clear();
        self.buffer.resize(len, 0);
        if self.truncated {
            return Ok(());
        }
        let mut filled = 0;
        while filled < len {
            match self.source.read(&mut self.buffer[filled..]) {
                Ok(0) => {
                    log::warn!(
                        "Unexpected end of NRRD data after {} positions, the rest is read as zero",
                        self.planes_read
                    );
                    self.truncated = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/**
 * The iterator pattern in a streamed NRRD volume calls the method
 * [`read_plane`] on `next` unless all positions have already been read.
 *
 * [`read_plane`](./struct.StreamedNrrdVolume.html#method.read_plane)
 */
impl<R> Iterator for StreamedNrrdVolume<R>
where
    R: Read,
{
    type Item = Result<Pixels>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.planes_left == 0 {
            return None;
        }
        Some(self.read_plane())
    }
}
