//! Product key validation.

use std::fmt;

use crate::error::{Error, Result};

/// Offsets at which a well-formed key carries a dash separator.
const DASH_OFFSETS: [usize; 4] = [5, 11, 17, 23];

/// A validated product key.
///
/// Keys come in two lengths: 17 characters (three groups of five) and
/// 29 characters (five groups of five), with dashes every six characters
/// starting at offset 5.
///
/// # Examples
///
/// ```
/// use droplord::domain::CdKey;
///
/// let key = CdKey::parse("ABCDE-FGHIJ-KLMNO").unwrap();
/// assert_eq!(key.as_str(), "ABCDE-FGHIJ-KLMNO");
/// assert!(CdKey::parse("not a key").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CdKey(String);

impl CdKey {
    /// Validates and wraps a key string.
    pub fn parse(value: &str) -> Result<Self> {
        if is_valid_cd_key(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(Error::InvalidKey(value.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether `value` has the shape of a redeemable product key:
/// length 17 or 29, with a dash at every in-range offset of 5, 11, 17, 23.
#[must_use]
pub fn is_valid_cd_key(value: &str) -> bool {
    let len = value.len();
    if len != 17 && len != 29 {
        return false;
    }
    DASH_OFFSETS
        .iter()
        .filter(|&&offset| offset < len)
        .all(|&offset| value.as_bytes()[offset] == b'-')
}
