//! Fuzz target for CArchive::open with arbitrary file contents.
//!
//! This target exercises the cookie scanner, cookie parser and directory
//! parser with malformed or adversarial input, then extracts every entry
//! it finds. The goal is to find panics, hangs, or unbounded allocations.
//!
//! Run with: cargo +nightly fuzz run archive_open

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use pyiarchive::read::{CArchive, CEntryKind};

fuzz_target!(|data: &[u8]| {
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }

    // We don't care about the result - we're looking for panics or hangs
    let Ok(archive) = CArchive::open(file.path()) else {
        return;
    };

    for entry in archive.entries() {
        let _ = archive.extract(&entry.name);
        if entry.kind == CEntryKind::EmbeddedArchive {
            if let Ok(pyz) = archive.open_embedded_archive(&entry.name) {
                for name in pyz.names() {
                    let _ = pyz.extract_raw(name);
                }
            }
        }
    }
});
