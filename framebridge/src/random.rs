// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Random token generator
//
// Produces fixed-length strings drawn uniformly, with replacement, from a
// selectable alphabet. Used to synthesize opaque client tokens (checksums)
// when the caller does not supply one. Not a source of secrets.

use rand::Rng;

/// Digits only.
pub const NUMERIC: &str = "0123456789";

/// Upper and lower case ASCII letters.
pub const ALPHABETIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Digits, letters, underscore and dash.
pub const MAX: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// The alphabet a token is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alphabet {
    Numeric,
    Alphabetic,
    /// Alphanumeric plus `_` and `-`.
    Max,
    Custom(CustomAlphabet),
}

impl Alphabet {
    /// A caller-supplied alphabet. Fails when `dict` has no characters.
    pub fn custom(dict: &str) -> Result<Self, TokenError> {
        CustomAlphabet::new(dict).map(Alphabet::Custom)
    }

    pub fn chars(&self) -> Vec<char> {
        match self {
            Alphabet::Numeric => NUMERIC.chars().collect(),
            Alphabet::Alphabetic => ALPHABETIC.chars().collect(),
            Alphabet::Max => MAX.chars().collect(),
            Alphabet::Custom(custom) => custom.chars.clone(),
        }
    }
}

/// A non-empty set of characters supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAlphabet {
    chars: Vec<char>,
}

impl CustomAlphabet {
    pub fn new(dict: &str) -> Result<Self, TokenError> {
        let chars: Vec<char> = dict.chars().collect();
        if chars.is_empty() {
            return Err(TokenError::EmptyAlphabet);
        }
        Ok(Self { chars })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("alphabet is empty")]
    EmptyAlphabet,
}

/// Generate a string of exactly `size` characters from `alphabet`.
pub fn generate(size: usize, alphabet: &Alphabet) -> String {
    let dict = alphabet.chars();
    let mut rng = rand::thread_rng();
    (0..size).map(|_| dict[rng.gen_range(0..dict.len())]).collect()
}
