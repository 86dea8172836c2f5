//! Composite macro key encoding and decoding.
//!
//! A macro is identified by four crafting parameters joined with `-`:
//! `"<progress>-<max_quality>-<initial_quality>-<durability>"`. Older data
//! also uses a 3-field form without the initial quality, and either form may
//! carry a decorative grade token such as `-B급` that never affects identity.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Separator between key fields.
pub const KEY_SEPARATOR: char = '-';
/// Trailing marker that identifies a decorative grade token.
pub const GRADE_MARKER: char = '급';

/// Returned when a key does not have 3 or 4 fields after grade stripping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid key format: {key}")]
pub struct KeyFormatError {
    /// The rejected key, verbatim.
    pub key: String,
}

/// Decorative grade appended to historical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// A rank.
    A,
    /// B rank.
    B,
    /// C rank.
    C,
    /// D rank.
    D,
}

impl Grade {
    /// Every grade in lookup order.
    pub const ALL: [Grade; 4] = [Grade::A, Grade::B, Grade::C, Grade::D];

    /// Key suffix for this grade, including the leading separator.
    pub fn suffix(self) -> &'static str {
        match self {
            Grade::A => "-A급",
            Grade::B => "-B급",
            Grade::C => "-C급",
            Grade::D => "-D급",
        }
    }
}

/// Validated crafting parameters that identify one macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MacroKey {
    /// Required progress.
    pub progress: u32,
    /// Maximum quality.
    pub max_quality: u32,
    /// Starting quality.
    pub initial_quality: u32,
    /// Item durability.
    pub durability: u32,
}

impl MacroKey {
    /// Canonical 4-field encoding.
    pub fn encode(&self) -> String {
        encode(
            self.progress,
            self.max_quality,
            self.initial_quality,
            self.durability,
        )
    }

    /// Pre-initial-quality 3-field encoding.
    pub fn encode_legacy(&self) -> String {
        format!(
            "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
            self.progress, self.max_quality, self.durability
        )
    }
}

impl fmt::Display for MacroKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Decoded key fields. `None` marks a token that was not a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyFields {
    /// Required progress.
    pub progress: Option<u32>,
    /// Maximum quality.
    pub max_quality: Option<u32>,
    /// Starting quality; `Some(0)` for 3-field keys.
    pub initial_quality: Option<u32>,
    /// Item durability.
    pub durability: Option<u32>,
}

impl KeyFields {
    /// Returns the typed key when every field parsed as a number.
    pub fn to_key(&self) -> Option<MacroKey> {
        Some(MacroKey {
            progress: self.progress?,
            max_quality: self.max_quality?,
            initial_quality: self.initial_quality?,
            durability: self.durability?,
        })
    }

    /// True when every field parsed as a number.
    pub fn is_numeric(&self) -> bool {
        self.to_key().is_some()
    }
}

impl From<MacroKey> for KeyFields {
    fn from(key: MacroKey) -> Self {
        Self {
            progress: Some(key.progress),
            max_quality: Some(key.max_quality),
            initial_quality: Some(key.initial_quality),
            durability: Some(key.durability),
        }
    }
}

/// Builds the canonical key string. Never emits a grade suffix.
pub fn encode(progress: u32, max_quality: u32, initial_quality: u32, durability: u32) -> String {
    format!(
        "{progress}{KEY_SEPARATOR}{max_quality}{KEY_SEPARATOR}{initial_quality}{KEY_SEPARATOR}{durability}"
    )
}

/// Decodes a canonical, legacy, or grade-suffixed key.
///
/// Non-numeric tokens do not fail the decode; they come back as `None` and
/// callers that validate or display must treat them as invalid.
pub fn decode(key: &str) -> Result<KeyFields, KeyFormatError> {
    let mut parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if parts.last().is_some_and(|tok| tok.ends_with(GRADE_MARKER)) {
        parts.pop();
    }

    match parts.as_slice() {
        [p, mq, iq, d] => Ok(KeyFields {
            progress: parse_token(p),
            max_quality: parse_token(mq),
            initial_quality: parse_token(iq),
            durability: parse_token(d),
        }),
        [p, mq, d] => Ok(KeyFields {
            progress: parse_token(p),
            max_quality: parse_token(mq),
            initial_quality: Some(0),
            durability: parse_token(d),
        }),
        _ => Err(KeyFormatError {
            key: key.to_string(),
        }),
    }
}

/// Re-encodes `key` canonically, if it decodes to numeric fields.
pub fn canonical_form(key: &str) -> Option<String> {
    decode(key).ok()?.to_key().map(|k| k.encode())
}

/// Historical spellings of `key`, in the order a fuzzy lookup probes them.
pub fn lookup_variants(key: &MacroKey) -> [String; 10] {
    let canonical = key.encode();
    let legacy = key.encode_legacy();
    [
        canonical.clone(),
        format!("{canonical}{}", Grade::A.suffix()),
        format!("{canonical}{}", Grade::B.suffix()),
        format!("{canonical}{}", Grade::C.suffix()),
        format!("{canonical}{}", Grade::D.suffix()),
        legacy.clone(),
        format!("{legacy}{}", Grade::A.suffix()),
        format!("{legacy}{}", Grade::B.suffix()),
        format!("{legacy}{}", Grade::C.suffix()),
        format!("{legacy}{}", Grade::D.suffix()),
    ]
}

fn parse_token(tok: &str) -> Option<u32> {
    tok.trim().parse().ok()
}
