//! Human-readable cache size (`10G`, `512M`, `1T`).

use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::fmt;
use std::str::FromStr;

const UNITS: [(char, u64); 4] = [
    ('T', 1 << 40),
    ('G', 1 << 30),
    ('M', 1 << 20),
    ('K', 1 << 10),
];

/// Size in bytes, parsed from a number with an optional binary suffix.
///
/// Suffixes are case-insensitive; a bare number is bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CacheSize(u64);

impl CacheSize {
    pub fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

impl FromStr for CacheSize {
    type Err = BurnboxError;

    fn from_str(s: &str) -> BurnboxResult<Self> {
        let invalid = || BurnboxError::Config(format!("invalid cache size: {:?}", s));
        let trimmed = s.trim();
        let last = trimmed.chars().last().ok_or_else(invalid)?;

        let (digits, multiplier) = match UNITS
            .iter()
            .find(|(unit, _)| last.eq_ignore_ascii_case(unit))
        {
            Some((_, m)) => (&trimmed[..trimmed.len() - 1], *m),
            None => (trimmed, 1),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = digits.parse().map_err(|_| invalid())?;
        value
            .checked_mul(multiplier)
            .map(CacheSize)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for CacheSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (unit, m) in UNITS {
            if self.0 >= m && self.0 % m == 0 {
                return write!(f, "{}{}", self.0 / m, unit);
            }
        }
        write!(f, "{}", self.0)
    }
}
