// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Presenter token generation and comparison.

use rand::Rng;

/// Length of a generated presenter token.
pub const TOKEN_LEN: usize = 6;

/// Generate a short random token of lowercase ASCII letters.
///
/// Meant to be read off the console and typed into the presenter page, not
/// to resist offline guessing.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN).map(|_| char::from(rng.random_range(b'a'..=b'z'))).collect()
}

/// Constant-time string comparison to prevent timing side-channel attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
