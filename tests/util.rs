use flate2::write::GzEncoder;
use flate2::Compression;
use nrrd::{ImageShape, Pixels, PlanarImage};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Header text of a 4x3 uint8 image with two slices, without the
/// terminating blank line.
#[allow(dead_code)]
pub const MINIMAL_HEADER: &str = "NRRD0004\n\
    # a comment\n\
    type: uchar\n\
    dimension: 3\n\
    sizes: 4 3 2\n\
    encoding: raw\n\
    kinds: space space space\n";

/// The samples of the minimal image, counting up from 0.
#[allow(dead_code)]
pub fn minimal_samples() -> Vec<u8> {
    (0..24).collect()
}

/// Planar image matching the minimal header and samples.
#[allow(dead_code)]
pub fn minimal_image() -> PlanarImage {
    let shape = ImageShape {
        slices: 2,
        ..ImageShape::new(4, 3)
    };
    let samples = minimal_samples();
    let planes = samples.chunks(12).map(|p| p.to_vec()).collect();
    PlanarImage::new(shape, Pixels::U8(planes)).unwrap()
}

/// Write a file in the given directory, returning its path.
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[allow(dead_code)]
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut e = GzEncoder::new(Vec::new(), Compression::default());
    e.write_all(bytes).unwrap();
    e.finish().unwrap()
}
