//! VIN lexical validation
//!
//! A VIN is exactly 17 characters, each a digit or a letter other than
//! I, O, Q (which are excluded to avoid confusion with 1 and 0). No
//! check-digit or manufacturer decoding is performed here.

use crate::{Error, Result};
use std::fmt;

/// Returns true iff `candidate` is a well-formed VIN.
///
/// Accepts both cases; callers that need the canonical form should go
/// through [`Vin::parse`] instead.
pub fn is_valid_vin(candidate: &str) -> bool {
    candidate.len() == 17
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || is_allowed_letter(c.to_ascii_uppercase()))
}

fn is_allowed_letter(c: char) -> bool {
    c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')
}

/// A validated VIN, stored in canonical uppercase form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Vin(String);

impl Vin {
    /// Normalize to uppercase and validate.
    pub fn parse(candidate: &str) -> Result<Self> {
        let normalized = candidate.trim().to_ascii_uppercase();
        if !is_valid_vin(&normalized) {
            return Err(Error::InvalidFormat(
                "VIN must be 17 characters long and contain only letters (except I, O, Q) and numbers".to_string(),
            ));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final character, used by the mock resolver's fault rules.
    pub fn last_char(&self) -> char {
        self.0.chars().next_back().expect("VIN is non-empty")
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
