// ABOUTME: Opaque `_key` generation for array items written back to the content store.
// ABOUTME: Keys are random alphanumeric strings, unique per array in practice.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Length of generated keys.
pub const KEY_LEN: usize = 12;

/// A fresh random key for a block, span, mark definition or reference.
pub fn new_key() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
