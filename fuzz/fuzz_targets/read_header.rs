#![no_main]
use libfuzzer_sys::fuzz_target;
use nrrd::NrrdHeader;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = NrrdHeader::from_bytes(data) {
        let _ = header.image_shape();
        let _ = header.byte_size();
        let _ = header.calibration();
        let _ = header.to_text();
        let _ = header.slices("fuzz.nrrd").count();
    }
});
