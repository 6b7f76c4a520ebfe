mod util;

use nrrd::{decode_image, encode_image, NrrdHeader, Pixels, SampleType, StreamedNrrdVolume};
use pretty_assertions::assert_eq;
use util::{minimal_image, minimal_samples, MINIMAL_HEADER};

fn minimal_header() -> NrrdHeader {
    NrrdHeader::from_bytes(format!("{}\n", MINIMAL_HEADER).as_bytes()).unwrap()
}

#[test]
fn decode_minimal() {
    let samples = minimal_samples();
    let (image, report) = decode_image(&minimal_header(), &samples[..]).unwrap();
    assert!(!report.truncated);
    assert_eq!(image, minimal_image());
    assert_eq!(image.value_range(), Some((0., 23.)));
}

#[test]
fn encode_minimal() {
    let mut out = Vec::new();
    encode_image(&minimal_header(), &minimal_image(), &mut out).unwrap();
    assert_eq!(out, minimal_samples());
}

#[test]
fn wide_types_read_as_float() {
    let header = NrrdHeader::from_bytes(
        b"NRRD0005\ntype: int32\nendian: big\ndimension: 1\nsizes: 2\nencoding: raw\n\n",
    )
    .unwrap();
    assert_eq!(header.sample_type, Some(SampleType::Int32));
    let data = [0xff, 0xff, 0xff, 0xfe, 0, 0, 1, 0];
    let (image, _) = decode_image(&header, &data[..]).unwrap();
    assert_eq!(image.pixels(), &Pixels::F32(vec![vec![-2., 256.]]));
}

#[test]
fn streamed_volume_counts_positions() {
    let samples = minimal_samples();
    let mut volume = StreamedNrrdVolume::from_reader(&samples[..], &minimal_header())
        .unwrap()
        .with_chunk_min(3);
    assert_eq!(volume.planes_left(), 2);
    let _ = volume.read_plane().unwrap();
    assert_eq!((volume.planes_read(), volume.planes_left()), (1, 1));
    assert_eq!(volume.count(), 1);
}

#[cfg(feature = "ndarray_volumes")]
mod ndarray_volumes {
    use super::util::minimal_image;
    use nrrd::volume::ndarray::IntoNdArray;

    #[test]
    fn minimal_as_ndarray() {
        let array = minimal_image().into_ndarray().unwrap();
        assert_eq!(array.shape(), &[4, 3, 2]);
        assert_eq!(array[[1, 0, 0]], 1.);
        assert_eq!(array[[0, 1, 0]], 4.);
        assert_eq!(array[[3, 2, 1]], 23.);
    }
}
