#![no_main]
use libfuzzer_sys::fuzz_target;
use nrrd::{NrrdHeader, StreamedNrrdVolume};

fuzz_target!(|data: &[u8]| {
    let mut source = data;
    if let Ok(header) = NrrdHeader::from_reader(&mut source) {
        if header.detached || header.n_images() > 4096 {
            return;
        }
        if let Ok(volume) = StreamedNrrdVolume::from_reader(source, &header) {
            for _planes in volume {}
        }
    }
});
