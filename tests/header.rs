mod util;

use nrrd::{AxisRole, Center, Encoding, NrrdError, NrrdHeader, SampleType};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use util::MINIMAL_HEADER;

#[test]
fn minimal_header() {
    let text = format!("{}\n", MINIMAL_HEADER);
    let header = NrrdHeader::from_bytes(text.as_bytes()).unwrap();
    assert_eq!(header.version, 4);
    assert_eq!(header.sample_type, Some(SampleType::Uint8));
    assert_eq!(header.encoding, Some(Encoding::Raw));
    assert_eq!(header.endianness, None);
    assert_eq!(header.axes.len(), 3);
    assert_eq!(header.n_channels(), 1);
    assert_eq!((header.width(), header.height(), header.n_slices()), (4, 3, 2));
    assert_eq!(header.axis(AxisRole::Z).map(|a| a.size), Some(2));
    assert_eq!(header.byte_size().unwrap(), 24);
    assert!(!header.detached);
}

#[test]
fn header_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.nhdr");
    fs::write(&path, format!("{}data file: scan.raw\n", MINIMAL_HEADER)).unwrap();
    let header = NrrdHeader::from_file(&path).unwrap();
    assert!(header.detached);
    assert_eq!(header.data_file.as_deref(), Some("scan.raw"));
}

#[test]
fn per_axis_fields() {
    let header = NrrdHeader::from_bytes(
        b"NRRD0005\ntype: float\nendian: big\ndimension: 4\nsizes: 3 8 8 5\nencoding: raw\n\
          kinds: RGB-color domain domain time\nlabels: \"c\" \"x\" \"y\" \"t\"\n\
          units: \"\" \"mm\" \"mm\" \"s\"\ncenters: ??? cell cell node\n\
          spacings: nan 0.5 0.5 2\n\n",
    )
    .unwrap();
    let idx = header.axis_indices();
    assert_eq!(idx.channel, Some(0));
    assert_eq!(idx.time, Some(3));
    assert_eq!(header.n_frames(), 5);
    let x = header.axis(AxisRole::X).unwrap();
    assert_eq!(x.label.as_deref(), Some("x"));
    assert_eq!(x.unit.as_deref(), Some("mm"));
    assert_eq!(x.center, Center::Cell);
    assert_eq!(x.spacing, 0.5);
    let channel = header.axis(AxisRole::Channel).unwrap();
    assert!(channel.spacing.is_nan());
    assert_eq!(channel.unit, None);
}

#[test]
fn custom_fields_survive_writing() {
    let text = format!("{}patient:=anonymous\nprotocol id:=T1 weighted\n\n", MINIMAL_HEADER);
    let header = NrrdHeader::from_bytes(text.as_bytes()).unwrap();
    assert_eq!(header.custom_fields.get("protocol id"), Some("T1 weighted"));
    let written = header.to_text().unwrap();
    assert!(written.starts_with("NRRD0005\n"));
    assert!(written.contains("patient:=anonymous\nprotocol id:=T1 weighted\n"));

    let again = NrrdHeader::from_bytes(written.as_bytes()).unwrap();
    assert_eq!(again.custom_fields, header.custom_fields);
    assert_eq!(again.axes, header.axes);
}

#[test]
fn errors_carry_line_numbers() {
    let err = NrrdHeader::from_bytes(b"NRRD0005\ntype: uint8\ndimension: 2\nsizes: 3\n\n").unwrap_err();
    assert_eq!(err.line(), Some(4));
    assert!(matches!(err.root(), NrrdError::FieldCountMismatch { field: "sizes", .. }));

    let err = NrrdHeader::from_bytes(b"P6\n").unwrap_err();
    assert!(matches!(err.root(), NrrdError::BadMagic(_)));

    let err = NrrdHeader::from_bytes(b"NRRD0005\ntype: uint8\nsizes: 3\n\n").unwrap_err();
    assert!(matches!(err.root(), NrrdError::MissingPrerequisite(..)));

    let err = NrrdHeader::from_bytes(b"NRRD0005\ntype: uint8\ndimension: 1\nsizes: 3\nencoding: raw\n\
                                       data file: LIST\n\n")
        .unwrap_err();
    assert!(matches!(err.root(), NrrdError::UnsupportedFeature(_)));
}

#[test]
fn oversized_sizes_are_rejected() {
    let err = NrrdHeader::from_bytes(
        b"NRRD0005\ntype: uint8\ndimension: 3\nsizes: 4294967296 4294967296 4294967296\nencoding: raw\n\n",
    )
    .unwrap_err();
    assert!(matches!(err.root(), NrrdError::InvalidField("sizes", _)));

    let err = NrrdHeader::from_bytes(
        b"NRRD0005\ntype: double\ndimension: 2\nsizes: 4294967296 536870912\nencoding: raw\nendian: little\n\n",
    )
    .unwrap_err();
    assert!(matches!(err.root(), NrrdError::InvalidField("sizes", _)));
}

#[test]
fn duplicate_sizes_cite_the_second_line() {
    let err = NrrdHeader::from_bytes(b"NRRD0005\ntype: uint8\ndimension: 1\nsizes: 3\nsizes: 3\n\n").unwrap_err();
    assert_eq!(err.line(), Some(5));
    assert!(matches!(err.root(), NrrdError::DuplicateField(f) if f == "sizes"));
}

#[test]
fn space_fields_round_trip() {
    let header = NrrdHeader::from_file("resources/lps_short.nrrd").unwrap();
    let text = header.to_text().unwrap();
    assert!(text.contains("space: left-posterior-superior\n"), "{}", text);
    let again = NrrdHeader::from_bytes(text.as_bytes()).unwrap();
    assert_eq!(again.space, header.space);
    assert_eq!(again.space_dim, 3);
    assert_eq!(again.space_origin, Some(vec![-1., -2., -3.]));
    assert_eq!(again.space_directions, header.space_directions);
    assert_eq!(again.space_units, header.space_units);
    assert_eq!(again.measurement_frame, header.measurement_frame);
    assert_eq!(again.sample_type, Some(SampleType::Int16));
    assert_eq!(again.endianness, header.endianness);
}
