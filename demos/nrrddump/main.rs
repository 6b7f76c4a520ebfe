//! An application for reading NRRD file meta-data.

use nrrd::NrrdHeader;
use std::env;

fn main() {
    let mut args = env::args().skip(1);
    let filename = args.next().expect("Path to NRRD file is required");
    let header = NrrdHeader::from_file(filename).expect("Failed to read NRRD file");
    println!("{:#?}", &header);
    println!("{:?}", header.image_shape());
    println!("{:#?}", header.calibration());
}
