//! Module for handling and retrieving complete NRRD objects.
//!
//! An object is a header along with the image it describes. The samples
//! either follow the header in the same file (attached) or live in the file
//! named by the `data file` field (detached). Before decoding, `line skip`
//! lines are skipped, then the payload is decompressed if gzip encoded, and
//! finally `byte skip` bytes are skipped.

use crate::calibration::Calibration;
use crate::error::{NrrdError, Result};
use crate::header::{read_header, NrrdHeader};
use crate::typedef::Encoding;
use crate::util::{skip_bytes, skip_lines};
use crate::volume::streamed::DEFAULT_CHUNK_MIN;
use crate::volume::{decode_image_chunked, PlanarImage, StreamedNrrdVolume};
use flate2::bufread::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// Options and flags which can be used to configure how a NRRD image is
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    chunk_min: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            chunk_min: DEFAULT_CHUNK_MIN,
        }
    }
}

impl ReaderOptions {
    /// Creates a blank new set of options ready for configuration.
    pub fn new() -> Self {
        ReaderOptions::default()
    }

    /// Sets the smallest number of bytes read from the data source at once.
    pub fn chunk_min(&mut self, chunk_min: usize) -> &mut Self {
        self.chunk_min = chunk_min.max(1);
        self
    }

    /// Read a header from the given file, without touching the samples.
    pub fn read_header_file<P>(&self, path: P) -> Result<NrrdHeader>
    where
        P: AsRef<Path>,
    {
        NrrdHeader::from_file(path)
    }

    /// Retrieve the full contents of a NRRD file. For a detached header,
    /// the data file is looked up next to the header file first, then as
    /// given.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nrrd::ReaderOptions;
    ///
    /// let obj = ReaderOptions::new().read_file("scan.nrrd")?;
    /// if obj.truncated() {
    ///     eprintln!("image data ended early");
    /// }
    /// # Ok::<(), nrrd::NrrdError>(())
    /// ```
    pub fn read_file<P>(&self, path: P) -> Result<NrrdObject>
    where
        P: AsRef<Path>,
    {
        let (header, source) = open_file(path.as_ref())?;
        let (image, report) = decode_image_chunked(&header, source, self.chunk_min)?;
        Ok(NrrdObject {
            header,
            image,
            truncated: report.truncated,
        })
    }

    /// Open a NRRD file for reading its image position by position.
    pub fn read_file_streamed<P>(&self, path: P) -> Result<StreamedNrrdObject>
    where
        P: AsRef<Path>,
    {
        let (header, source) = open_file(path.as_ref())?;
        let volume = StreamedNrrdVolume::from_reader(source, &header)?.with_chunk_min(self.chunk_min);
        Ok(StreamedNrrdObject { header, volume })
    }

    /// Retrieve a NRRD object from a stream holding the header followed by
    /// the samples. A `byte skip` of -1 is not supported here, as the
    /// stream length is not known.
    ///
    /// # Errors
    ///
    /// - `NrrdError::UnsupportedFeature` if the header is detached.
    pub fn read_stream<R>(&self, mut source: R) -> Result<NrrdObject>
    where
        R: BufRead,
    {
        let (header, _) = read_header(&mut source)?;
        if header.detached {
            return Err(NrrdError::UnsupportedFeature(
                "detached header read from a stream".to_string(),
            ));
        }
        let payload = open_payload(&header, source, None)?;
        let (image, report) = decode_image_chunked(&header, payload, self.chunk_min)?;
        Ok(NrrdObject {
            header,
            image,
            truncated: report.truncated,
        })
    }
}

/// Locate the data file named by a detached header.
fn data_file_path(header_path: &Path, name: &str) -> Result<PathBuf> {
    let beside = header_path
        .parent()
        .map(|dir| dir.join(name))
        .unwrap_or_else(|| PathBuf::from(name));
    if beside.is_file() {
        return Ok(beside);
    }
    let given = PathBuf::from(name);
    if given.is_file() {
        return Ok(given);
    }
    Err(NrrdError::MissingDataFile(beside))
}

/// Read the header of a file and position a source at its first sample.
fn open_file(path: &Path) -> Result<(NrrdHeader, Box<dyn Read>)> {
    let file_len = std::fs::metadata(path)?.len();
    let mut file = BufReader::new(File::open(path)?);
    let (header, header_len) = read_header(&mut file)?;
    let source = match (&header.data_file, header.detached) {
        (Some(name), true) => {
            let data_path = data_file_path(path, name)?;
            log::debug!("Reading NRRD data from {}", data_path.display());
            let data_len = std::fs::metadata(&data_path)?.len();
            let data = BufReader::new(File::open(&data_path)?);
            open_payload(&header, data, Some(data_len))?
        }
        _ => open_payload(&header, file, Some(file_len.saturating_sub(header_len)))?,
    };
    Ok((header, source))
}

/// Skip lines, decompress, then skip bytes. `available` is the number of
/// bytes left in the source, when known.
fn open_payload<'a, R>(header: &NrrdHeader, mut source: R, available: Option<u64>) -> Result<Box<dyn Read + 'a>>
where
    R: BufRead + 'a,
{
    let skipped_lines = skip_lines(&mut source, header.line_skip)?;
    let mut source: Box<dyn Read + 'a> = match header.encoding {
        Some(Encoding::Gzip) => Box::new(GzDecoder::new(source)),
        _ => Box::new(source),
    };
    let byte_skip = if header.byte_skip == -1 {
        let available = available.ok_or_else(|| {
            NrrdError::UnsupportedFeature("`byte skip: -1` without a known data length".to_string())
        })?;
        available
            .checked_sub(skipped_lines)
            .and_then(|n| n.checked_sub(header.byte_size().unwrap_or(0)))
            .ok_or(NrrdError::UnexpectedEndOfStream)?
    } else {
        header.byte_skip as u64
    };
    skip_bytes(&mut source, byte_skip)?;
    Ok(source)
}

/// Data type for a NRRD object that is fully contained in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct NrrdObject {
    header: NrrdHeader,
    image: PlanarImage,
    truncated: bool,
}

impl NrrdObject {
    /// Retrieve the full contents of a NRRD file with the default options.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NrrdObject> {
        ReaderOptions::new().read_file(path)
    }

    /// Obtain a reference to the header.
    pub fn header(&self) -> &NrrdHeader {
        &self.header
    }

    /// Obtain a mutable reference to the header.
    pub fn header_mut(&mut self) -> &mut NrrdHeader {
        &mut self.header
    }

    /// Obtain a reference to the image.
    pub fn image(&self) -> &PlanarImage {
        &self.image
    }

    /// Move the image out of the object, discarding the header.
    pub fn into_image(self) -> PlanarImage {
        self.image
    }

    /// Split the object into its header and image.
    pub fn into_parts(self) -> (NrrdHeader, PlanarImage) {
        (self.header, self.image)
    }

    /// Whether the data ended early, leaving part of the image zero.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// The calibration of the image. When the header declares no value
    /// range, the range of the image cells is used.
    pub fn calibration(&self) -> Calibration {
        let mut cal = self.header.calibration();
        if cal.display_range.is_none() {
            cal.display_range = self.image.value_range();
        }
        cal
    }
}

/// A NRRD object whose image is read position by position.
#[derive(Debug)]
pub struct StreamedNrrdObject {
    header: NrrdHeader,
    volume: StreamedNrrdVolume<Box<dyn Read>>,
}

impl StreamedNrrdObject {
    /// Obtain a reference to the header.
    pub fn header(&self) -> &NrrdHeader {
        &self.header
    }

    /// Obtain a mutable reference to the streamed image.
    pub fn volume_mut(&mut self) -> &mut StreamedNrrdVolume<Box<dyn Read>> {
        &mut self.volume
    }

    /// Move the streamed image out of the object, discarding the header.
    pub fn into_volume(self) -> StreamedNrrdVolume<Box<dyn Read>> {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Pixels;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut e = GzEncoder::new(Vec::new(), Compression::default());
        e.write_all(bytes).unwrap();
        e.finish().unwrap()
    }

    #[test]
    fn attached_stream() {
        let mut data = b"NRRD0005\ntype: uint8\ndimension: 2\nsizes: 3 2\nencoding: raw\n\n".to_vec();
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        let obj = ReaderOptions::new().read_stream(&data[..]).unwrap();
        assert!(!obj.truncated());
        assert_eq!(obj.image().pixels(), &Pixels::U8(vec![vec![1, 2, 3, 4, 5, 6]]));
        assert_eq!(obj.calibration().display_range, Some((1., 6.)));
    }

    #[test]
    fn skips_lines_then_bytes_after_gzip() {
        let mut data = b"NRRD0005\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: gzip\n\
                         line skip: 1\nbyte skip: 3\n\n"
            .to_vec();
        data.extend_from_slice(b"junk line\r\n");
        data.extend(gzip(&[0, 0, 0, 7, 8]));
        let obj = ReaderOptions::new().read_stream(&data[..]).unwrap();
        assert_eq!(obj.into_image().into_pixels(), Pixels::U8(vec![vec![7, 8]]));
    }

    #[test]
    fn stream_refuses_detached_and_trailing_data() {
        let data = b"NRRD0005\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: raw\ndata file: x.raw\n\n";
        assert!(matches!(
            ReaderOptions::new().read_stream(&data[..]),
            Err(NrrdError::UnsupportedFeature(_))
        ));
        let data = b"NRRD0005\ntype: uint8\ndimension: 1\nsizes: 2\nencoding: raw\nbyte skip: -1\n\n\x01\x02";
        assert!(ReaderOptions::new().read_stream(&data[..]).is_err());
    }
}
