// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stable hashing and short class-name generation.
//!
//! Names must be identical across processes (server render and client
//! rehydration compute them independently), so nothing here is seeded
//! randomly.

use alloc::string::String;
use alloc::vec::Vec;

/// Seed for [`hash`].
pub const SEED: u32 = 5381;

const ALPHABET_LEN: u32 = 52;

/// Continues a hash over `text`.
///
/// UTF-16 code units are consumed from the end towards the start, so
/// `phash(phash(SEED, b), a) == hash(a + b)`.
#[must_use]
pub fn phash(seed: u32, text: &str) -> u32 {
    let units: Vec<u16> = text.encode_utf16().collect();
    units
        .iter()
        .rev()
        .fold(seed, |h, &unit| h.wrapping_mul(33) ^ u32::from(unit))
}

/// Hashes `text` to a stable 32-bit integer.
///
/// ```rust
/// use understory_sheet::hash::hash;
///
/// assert_eq!(hash(""), 5381);
/// assert_eq!(hash("color: red;"), hash("color: red;"));
/// ```
#[must_use]
pub fn hash(text: &str) -> u32 {
    phash(SEED, text)
}

/// Hashes the concatenation of `parts` without allocating it.
#[must_use]
pub fn hash_parts(parts: &[&str]) -> u32 {
    parts.iter().rev().fold(SEED, |h, part| phash(h, part))
}

fn alphabetic_char(code: u32) -> char {
    // 0..=25 map to `a..=z`, 26..=51 to `A..=Z`.
    let base = if code > 25 { 39 } else { 97 };
    char::from_u32(code + base).unwrap_or('a')
}

/// Maps a hash to a short alphabetic identifier usable as a class name.
///
/// Any `ad` pair is split as `a-d` so generated names never look like the
/// class names content blockers hide.
///
/// ```rust
/// use understory_sheet::hash::name_from_hash;
///
/// assert_eq!(name_from_hash(0), "a");
/// assert_eq!(name_from_hash(5381), "bZz");
/// ```
#[must_use]
pub fn name_from_hash(code: u32) -> String {
    let mut reversed = Vec::new();
    let mut x = code;
    while x > ALPHABET_LEN {
        reversed.push(alphabetic_char(x % ALPHABET_LEN));
        x /= ALPHABET_LEN;
    }
    reversed.push(alphabetic_char(x % ALPHABET_LEN));

    let mut name = String::with_capacity(reversed.len() + 1);
    let mut prev = None;
    for c in reversed.into_iter().rev() {
        if prev.is_some_and(|p: char| p.eq_ignore_ascii_case(&'a')) && c.eq_ignore_ascii_case(&'d')
        {
            name.push('-');
        }
        name.push(c);
        prev = Some(c);
    }
    name
}

/// Replaces every run of characters that cannot appear in a class name with a
/// single `-`, trimming leading and trailing dashes.
///
/// ```rust
/// use understory_sheet::hash::escape_identifier;
///
/// assert_eq!(escape_identifier("Button (primary)"), "Button-primary");
/// ```
#[must_use]
pub fn escape_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c);
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_hash_like_concatenation() {
        assert_eq!(hash_parts(&["sc-a", "color:red;"]), hash("sc-acolor:red;"));
        assert_eq!(hash_parts(&[]), SEED);
    }

    #[test]
    fn hash_is_deterministic_and_sensitive() {
        assert_eq!(hash("a"), hash("a"));
        assert_ne!(hash("a"), hash("b"));
        // Known value: (5381 * 33) ^ 'a'.
        assert_eq!(hash("a"), (5381_u32 * 33) ^ 97);
    }

    #[test]
    fn non_bmp_text_hashes_code_units() {
        // One astral char is two UTF-16 units.
        assert_ne!(hash("\u{1F600}"), hash("\u{FFFD}"));
    }

    #[test]
    fn names_split_ad_pairs() {
        // 2707 = 52 * 52 + 3; the loop stops at 52 which maps to `a`.
        assert_eq!(name_from_hash(2707), "a-d");
        assert!(!name_from_hash(hash("anything")).to_lowercase().contains("ad"));
    }

    #[test]
    fn names_are_alphabetic() {
        for code in [1_u32, 25, 26, 51, 52, 53, u32::MAX] {
            let name = name_from_hash(code);
            assert!(name.chars().all(|c| c.is_ascii_alphabetic() || c == '-'), "{name}");
        }
        assert_eq!(name_from_hash(25), "z");
        assert_eq!(name_from_hash(26), "A");
    }

    #[test]
    fn escape_collapses_runs() {
        assert_eq!(escape_identifier("--a  b--"), "a-b");
        assert_eq!(escape_identifier("!!!"), "");
    }
}
