//! Utility functions to write NRRD images.
//!
//! A planar image is written along with a header built from its shape, its
//! calibration and, optionally, a reference header such as the one it was
//! read with. Axes may be flagged for slicing, in which case one file (or
//! one header and data file pair) is written per slice.

use crate::axis::AxisRole;
use crate::calibration::Calibration;
use crate::error::Result;
use crate::header::{data_file_name, NrrdHeader};
use crate::slice::SliceTask;
use crate::typedef::Encoding;
use crate::util::is_detached_file;
use crate::volume::{ImageEncoder, PlanarElement, PlanarImage, Pixels};
use byteordered::Endianness;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Decides whether an existing file may be overwritten.
pub trait OverwritePolicy {
    /// Called for each output file that already exists. Returning `false`
    /// cancels the write.
    fn allow(&mut self, path: &Path) -> bool;
}

/// Fixed overwrite policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overwrite {
    /// Replace existing files.
    Always,
    /// Never replace an existing file.
    Never,
}

impl OverwritePolicy for Overwrite {
    fn allow(&mut self, _: &Path) -> bool {
        *self == Overwrite::Always
    }
}

/// The result of writing a possibly sliced image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceOutcome {
    /// Every file was written, in the listed order.
    Written(Vec<PathBuf>),
    /// The overwrite policy declined a file. The files written before it
    /// are left in place.
    Cancelled(Vec<PathBuf>),
}

/// Options and flags which can be used to configure how a NRRD image is
/// written.
#[derive(Debug, Clone)]
pub struct WriterOptions<'a> {
    path: PathBuf,
    reference: Option<&'a NrrdHeader>,
    calibration: Option<&'a Calibration>,
    encoding: Encoding,
    endianness: Endianness,
    detached: bool,
    compression: Compression,
    whole_image_buffer: bool,
    sliced: Vec<AxisRole>,
}

impl<'a> WriterOptions<'a> {
    /// Creates a new set of options for writing to the given path. A path
    /// ending in `.nhdr` writes a detached header by default.
    pub fn new<P>(path: P) -> WriterOptions<'a>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_owned();
        WriterOptions {
            detached: is_detached_file(&path),
            path,
            reference: None,
            calibration: None,
            encoding: Encoding::Raw,
            endianness: Endianness::native(),
            compression: Compression::default(),
            whole_image_buffer: false,
            sliced: Vec::new(),
        }
    }

    /// Sets a reference header. Its axis metadata and custom fields are
    /// kept. Its sample type is kept for integer images whose cells map
    /// onto it without loss; float images are always written as `float`.
    pub fn reference_header(mut self, reference: &'a NrrdHeader) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Sets the calibration of the image. Without it, the calibration of
    /// the reference header is used, if any.
    pub fn calibration(mut self, calibration: &'a Calibration) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Sets the payload encoding. Raw by default.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Sets the byte order of multi-byte samples. The system's by default.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Sets whether the samples go to a separate data file.
    pub fn detached(mut self, detached: bool) -> Self {
        self.detached = detached;
        self
    }

    /// Sets the gzip compression level.
    pub fn compression_level(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Sets whether to buffer whole positions instead of writing in
    /// bounded chunks.
    pub fn whole_image_buffer(mut self, whole: bool) -> Self {
        self.whole_image_buffer = whole;
        self
    }

    /// Write one file per index along the axis with the given role. Roles
    /// the image does not have are ignored.
    pub fn slice_along(mut self, role: AxisRole) -> Self {
        if !self.sliced.contains(&role) {
            self.sliced.push(role);
        }
        self
    }

    /// Build the header written along with the image.
    pub fn build_header(&self, image: &PlanarImage) -> Result<NrrdHeader> {
        let default_type = image.sample_type()?;
        let sample_type = match self.reference.and_then(|r| r.sample_type) {
            Some(t) if keeps_reference_type(image.pixels(), t) => t,
            _ => default_type,
        };
        let calibration = match (self.calibration, self.reference) {
            (Some(cal), _) => cal.clone(),
            (None, Some(reference)) => reference.calibration(),
            (None, None) => Calibration::default(),
        };
        let mut header = NrrdHeader::from_calibration(image.shape(), sample_type, &calibration, self.reference)?;
        header.encoding = Some(self.encoding);
        header.endianness = Some(self.endianness);
        header.detached = self.detached;
        header.data_file = None;
        header.byte_skip = 0;
        header.line_skip = 0;
        for role in &self.sliced {
            if let Some(axis) = header.axis_mut(*role) {
                axis.slice = true;
            }
        }
        Ok(header)
    }

    /// Write the image, overwriting existing files.
    pub fn write(&self, image: &PlanarImage) -> Result<()> {
        let _ = self.write_slices(image, &mut Overwrite::Always)?;
        Ok(())
    }

    /// Write the image, one file per slice, consulting the policy before
    /// overwriting any file.
    pub fn write_slices(&self, image: &PlanarImage, policy: &mut dyn OverwritePolicy) -> Result<SliceOutcome> {
        let header = self.build_header(image)?;
        self.write_with_header(&header, image, policy)
    }

    /// Write the image with a header prepared by the caller, one file per
    /// slice. The header must describe the image shape.
    pub fn write_with_header(
        &self,
        header: &NrrdHeader,
        image: &PlanarImage,
        policy: &mut dyn OverwritePolicy,
    ) -> Result<SliceOutcome> {
        let dir = self.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let base = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let encoder = ImageEncoder::new().whole_image_buffer(self.whole_image_buffer);
        log::debug!(
            "Writing {} NRRD file(s) for {}",
            header.output_file_count(),
            self.path.display()
        );

        let mut written = Vec::new();
        for task in header.slices(&base) {
            let header_path = dir.join(&task.file_name);
            let data_path = task.header.data_file.as_ref().map(|name| dir.join(name));
            let declined = [Some(&header_path), data_path.as_ref()]
                .iter()
                .flatten()
                .any(|p| p.exists() && !policy.allow(p));
            if declined {
                log::debug!("Overwrite of {} declined", header_path.display());
                return Ok(SliceOutcome::Cancelled(written));
            }
            self.write_task(&task, &header_path, data_path.as_deref(), image, &encoder)?;
            written.push(header_path);
            written.extend(data_path);
        }
        Ok(SliceOutcome::Written(written))
    }

    fn write_task(
        &self,
        task: &SliceTask,
        header_path: &Path,
        data_path: Option<&Path>,
        image: &PlanarImage,
        encoder: &ImageEncoder,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(header_path)?);
        task.header.write_header(&mut writer)?;
        match data_path {
            Some(data_path) => {
                writer.flush()?;
                let data = BufWriter::new(File::create(data_path)?);
                self.write_data(&task.header, image, data, encoder)
            }
            None => self.write_data(&task.header, image, writer, encoder),
        }
    }

    fn write_data<W: Write>(
        &self,
        header: &NrrdHeader,
        image: &PlanarImage,
        mut sink: W,
        encoder: &ImageEncoder,
    ) -> Result<()> {
        if header.encoding == Some(Encoding::Gzip) {
            let mut e = GzEncoder::new(sink, self.compression);
            encoder.encode(header, image, &mut e)?;
            e.finish()?.flush()?;
        } else {
            encoder.encode(header, image, &mut sink)?;
            sink.flush()?;
        }
        Ok(())
    }
}

/// Whether the cells can be encoded as the reference sample type without
/// loss. `f32` cells only encode losslessly as `float`, which is already
/// their own type.
fn keeps_reference_type(pixels: &Pixels, sample_type: crate::typedef::SampleType) -> bool {
    match pixels {
        Pixels::U8(_) => u8::holds(sample_type),
        Pixels::U16(_) => u16::holds(sample_type),
        Pixels::F32(_) | Pixels::Rgb(_) => false,
    }
}

/// The name of the data file written next to a detached header file.
pub fn detached_data_file(header_path: &Path, encoding: Encoding) -> PathBuf {
    let name = header_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    header_path.with_file_name(data_file_name(&name, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typedef::SampleType;
    use crate::volume::ImageShape;

    fn image_u16() -> PlanarImage {
        PlanarImage::new(ImageShape::new(2, 2), Pixels::U16(vec![vec![1, 2, 3, 40000]])).unwrap()
    }

    #[test]
    fn header_from_reference() {
        let mut reference = NrrdHeader::new(&[2, 2], SampleType::Int16).unwrap();
        reference.custom_fields.set("site", "a");
        let header = WriterOptions::new("out.nhdr")
            .reference_header(&reference)
            .endianness(Endianness::Big)
            .build_header(&image_u16())
            .unwrap();
        assert_eq!(header.sample_type, Some(SampleType::Int16));
        assert_eq!(header.endianness, Some(Endianness::Big));
        assert!(header.detached);
        assert_eq!(header.custom_fields.get("site"), Some("a"));

        let reference = NrrdHeader::new(&[2, 2], SampleType::Float64).unwrap();
        let header = WriterOptions::new("out.nrrd")
            .reference_header(&reference)
            .build_header(&image_u16())
            .unwrap();
        assert_eq!(header.sample_type, Some(SampleType::Uint16));
        assert!(!header.detached);
    }

    #[test]
    fn float_cells_ignore_wide_reference_types() {
        let image = PlanarImage::new(ImageShape::new(3, 1), Pixels::F32(vec![vec![-1.5, 2.7, 0.25]])).unwrap();
        for wide in &[SampleType::Int32, SampleType::Uint32, SampleType::Float64] {
            let reference = NrrdHeader::new(&[3, 1], *wide).unwrap();
            let header = WriterOptions::new("out.nrrd")
                .reference_header(&reference)
                .build_header(&image)
                .unwrap();
            assert_eq!(header.sample_type, Some(SampleType::Float32));
        }
    }

    #[test]
    fn sliced_axes_are_flagged() {
        let image = PlanarImage::new(
            ImageShape {
                slices: 3,
                ..ImageShape::new(2, 2)
            },
            Pixels::U8(vec![vec![0; 4]; 3]),
        )
        .unwrap();
        let header = WriterOptions::new("out.nrrd")
            .slice_along(AxisRole::Z)
            .slice_along(AxisRole::Time)
            .build_header(&image)
            .unwrap();
        assert!(header.axis(AxisRole::Z).unwrap().slice);
        assert_eq!(header.output_file_count(), 3);
    }

    #[test]
    fn data_file_beside_header() {
        assert_eq!(
            detached_data_file(Path::new("dir/scan.nhdr"), Encoding::Gzip),
            PathBuf::from("dir/scan.raw.gz")
        );
    }
}
