//! Property-based tests using proptest.
//!
//! These tests check invariants of the low-level parsers and the cookie
//! scanner over randomly generated inputs.

use std::io::Cursor;

use proptest::prelude::*;
use pyiarchive::crypto::{BLOCK_SIZE, normalize_key};
use pyiarchive::format::cookie::Cookie;
use pyiarchive::format::marshal::MarshalReader;
use pyiarchive::format::toc::parse_toc;
use pyiarchive::scan::MagicScanner;

const MAGIC: &[u8] = b"MEI\x0c\x0b\x0a\x0b\x0e";

fn loads(data: &[u8]) -> pyiarchive::Result<pyiarchive::format::marshal::Value> {
    MarshalReader::new(data).read_value()
}

/// A flagged leaf followed by flagged tuples that each reference earlier
/// objects `width` times.
fn nested_refs(targets: &[(u32, u8)]) -> Vec<u8> {
    let mut data = vec![b'['];
    data.extend_from_slice(&(targets.len() as u32 + 1).to_le_bytes());
    data.extend_from_slice(&[b'z' | 0x80, 1, b'a']);
    for (k, &(back, width)) in targets.iter().enumerate() {
        let target = (k as u32).saturating_sub(back % (k as u32 + 1));
        data.extend_from_slice(&[b')' | 0x80, width]);
        for _ in 0..width {
            data.push(b'r');
            data.extend_from_slice(&target.to_le_bytes());
        }
    }
    data
}

/// Filler that never contains the first magic byte, so the only matches are
/// the ones a test plants.
fn filler(len: impl Into<prop::collection::SizeRange>) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>().prop_filter("no 'M'", |b| *b != b'M'), len)
}

proptest! {
    /// The scanner reports the last planted magic for any chunk size.
    #[test]
    fn scanner_finds_last_magic(
        data in filler(0..4096),
        positions in proptest::collection::vec(any::<prop::sample::Index>(), 1..4),
        chunk_size in 8usize..512,
    ) {
        let mut data = data;
        data.extend_from_slice(&[0u8; 8]);
        for index in &positions {
            let pos = index.index(data.len() - MAGIC.len() + 1);
            data[pos..pos + MAGIC.len()].copy_from_slice(MAGIC);
        }

        // A later plant can overlap an earlier one, so compute the answer
        // from the final bytes.
        let truth = data
            .windows(MAGIC.len())
            .rposition(|w| w == MAGIC)
            .map(|p| p as u64);
        prop_assert!(truth.is_some());

        let scanner = MagicScanner::with_chunk_size(MAGIC, chunk_size).unwrap();
        let found = scanner.find_last(&mut Cursor::new(&data)).unwrap();
        prop_assert_eq!(found, truth);
    }

    /// Data without the magic yields no match.
    #[test]
    fn scanner_reports_absence(data in filler(0..2048), chunk_size in 8usize..256) {
        let scanner = MagicScanner::with_chunk_size(MAGIC, chunk_size).unwrap();
        prop_assert_eq!(scanner.find_last(&mut Cursor::new(&data)).unwrap(), None);
    }

    /// ASCII keys always normalize to exactly one AES key.
    #[test]
    fn normalized_ascii_key_is_block_sized(key in "[ -~]{0,40}") {
        let normalized = normalize_key(&key);
        prop_assert_eq!(normalized.len(), BLOCK_SIZE);
        if key.len() >= BLOCK_SIZE {
            prop_assert_eq!(&normalized[..], &key[..BLOCK_SIZE]);
        }
    }

    /// Unsigned short keys keep their characters at the end.
    #[test]
    fn short_key_is_suffix(key in "[a-z0-9]{1,15}") {
        let normalized = normalize_key(&key);
        prop_assert!(normalized.ends_with(&key));
        prop_assert!(normalized[..BLOCK_SIZE - key.len()].bytes().all(|b| b == b'0'));
    }

    /// Cookie parsing never panics on arbitrary input.
    #[test]
    fn cookie_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..200)) {
        let _ = Cookie::parse(&data);
    }

    /// Cookie parsing with a valid magic never panics either.
    #[test]
    fn cookie_parse_with_magic_never_panics(rest in proptest::collection::vec(any::<u8>(), 0..120)) {
        let mut data = MAGIC.to_vec();
        data.extend(rest);
        let _ = Cookie::parse(&data);
    }

    /// Directory parsing never panics, and every record it accepts has a
    /// name that fits inside the input.
    #[test]
    fn toc_parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        if let Ok(records) = parse_toc(&data) {
            for record in records {
                prop_assert!(record.name.len() <= data.len());
            }
        }
    }

    /// Marshal decoding never panics on arbitrary input.
    #[test]
    fn marshal_loads_never_panics(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = loads(&data);
    }
}

proptest! {
    // Cases near the budget decode tens of megabytes.
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Chains of back-references either decode or hit the size budget;
    /// they never expand without bound.
    #[test]
    fn marshal_nested_refs_stay_bounded(
        targets in proptest::collection::vec((any::<u32>(), 1u8..4), 0..48),
    ) {
        let data = nested_refs(&targets);
        if let Err(err) = loads(&data) {
            prop_assert!(err.to_string().contains("decoded value exceeds"), "{}", err);
        }
    }
}

#[cfg(feature = "aes")]
proptest! {
    /// CTR decryption of IV || plaintext, re-applied, restores the plaintext.
    #[test]
    fn cipher_is_an_involution(
        key in "[a-zA-Z0-9]{16}",
        iv in any::<[u8; 16]>(),
        plain in proptest::collection::vec(any::<u8>(), 0..300),
    ) {
        let cipher = pyiarchive::Cipher::new(&key).unwrap();
        let mut blob = iv.to_vec();
        blob.extend(&plain);
        let encrypted = cipher.decrypt(&blob).unwrap();
        prop_assert_eq!(encrypted.len(), plain.len());

        let mut blob = iv.to_vec();
        blob.extend(&encrypted);
        prop_assert_eq!(cipher.decrypt(&blob).unwrap(), plain);
    }
}
