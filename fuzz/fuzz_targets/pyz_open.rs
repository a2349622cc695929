//! Fuzz target for PyzArchive::open and the marshal decoder.
//!
//! Run with: cargo +nightly fuzz run pyz_open

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use pyiarchive::read::PyzArchive;

fuzz_target!(|data: &[u8]| {
    let _ = pyiarchive::format::marshal::MarshalReader::new(data).read_value();

    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    if let Ok(pyz) = PyzArchive::open_at(file.path(), 0) {
        for name in pyz.names() {
            let _ = pyz.extract_raw(name);
        }
    }
});
