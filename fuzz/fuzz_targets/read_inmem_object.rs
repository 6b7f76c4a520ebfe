#![no_main]
use libfuzzer_sys::fuzz_target;
use nrrd::ReaderOptions;

fuzz_target!(|data: &[u8]| {
    let _ = ReaderOptions::new().read_stream(data);
});
