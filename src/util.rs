//! Utility functions for the tutor engine.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, TutorError};

/// Maximum step file size that can be read into memory (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Read a file into a string, refusing files larger than `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns an error if the file exceeds `max_size` or cannot be read.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| TutorError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(TutorError::storage(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file is too large ({} bytes, max {} bytes)", size, max_size),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| TutorError::storage(path, e))
}

/// Split a leading ordering prefix such as `01_` or `2-` off a name.
///
/// Returns the numeric prefix (if any) and the remaining name. A name that
/// is nothing but a prefix is returned unchanged.
pub fn split_order_prefix(name: &str) -> (Option<u64>, &str) {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return (None, name);
    }

    let rest = &name[digits..];
    match rest.as_bytes().first() {
        Some(b'_') | Some(b'-') if rest.len() > 1 => (name[..digits].parse().ok(), &rest[1..]),
        _ => (None, name),
    }
}

/// Strip a leading ordering prefix from a name.
pub fn strip_order_prefix(name: &str) -> &str {
    split_order_prefix(name).1
}

/// Order names by numeric prefix first, then lexically.
///
/// `2_basics` sorts before `10_advanced`; unprefixed names sort after
/// prefixed ones.
pub fn natural_order(a: &str, b: &str) -> Ordering {
    match (split_order_prefix(a).0, split_order_prefix(b).0) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
