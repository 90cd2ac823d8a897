//! RPF frame identifier decoding.
//!
//! RPF frame files (CADRG, CIB) encode their frame number and version in
//! base 34: the digits `0-9` followed by the letters `A-Z` without `I` and
//! `O`, which are too easily confused with `1` and `0`.
//!
//! # File Name Format
//!
//! `FFFFFVVP.SSZ`: five frame-number characters (six for CIB), version
//! characters up to the producer character at position 7, then a two-letter
//! series code and a zone character after the dot.

use crate::error::{MosaicError, Result};

/// Number of symbols in the alphabet.
pub const RADIX: i64 = 34;

/// Value returned when the input contains a character outside the alphabet.
pub const INVALID: i64 = -1;

/// Value of a single base-34 digit, or `None` for characters outside the
/// alphabet. Lowercase letters are folded to uppercase.
pub fn digit_value(c: char) -> Option<i64> {
    match c.to_ascii_uppercase() {
        d @ '0'..='9' => Some(d as i64 - '0' as i64),
        l @ 'A'..='H' => Some(l as i64 - 'A' as i64 + 10),
        l @ 'J'..='N' => Some(l as i64 - 'A' as i64 + 9),
        l @ 'P'..='Z' => Some(l as i64 - 'A' as i64 + 8),
        _ => None,
    }
}

/// Decode a base-34 string.
///
/// Returns [`INVALID`] when a character is outside the alphabet or the value
/// overflows; garbage input is routine, so this is not an error. An absent
/// input is a caller bug and fails with [`MosaicError::Precondition`].
///
/// # Examples
///
/// ```
/// use mosaic::rpf::decode;
///
/// assert_eq!(decode(Some("X340S")).unwrap(), 41548978);
/// assert!(decode(Some("12345o")).unwrap() < 0);
/// assert!(decode(None).is_err());
/// ```
pub fn decode(input: Option<&str>) -> Result<i64> {
    let input = input.ok_or(MosaicError::Precondition("base-34 input must not be null"))?;
    Ok(decode_str(input))
}

fn decode_str(input: &str) -> i64 {
    let mut value: i64 = 0;
    for c in input.chars() {
        let digit = match digit_value(c) {
            Some(d) => d,
            None => return INVALID,
        };
        value = match value
            .checked_mul(RADIX)
            .and_then(|v| v.checked_add(digit))
        {
            Some(v) => v,
            None => return INVALID,
        };
    }
    value
}

/// Components of an RPF frame file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpfFrameName {
    /// Cumulative frame number within the zone.
    pub frame_number: i64,
    /// Successive version of the frame. Decoded from the version characters
    /// only; the producer character is kept apart in [`producer`](Self::producer).
    pub version: i64,
    /// Producer code character.
    pub producer: char,
    /// Two-letter map series code (e.g. `"ON"`, `"I4"`).
    pub series: String,
    /// Zone character.
    pub zone: char,
}

impl RpfFrameName {
    /// Parse a frame file name such as `X340S0A1.ON2`.
    ///
    /// `cib` selects the six-character frame number used by CIB series.
    /// Returns `None` if the name is malformed. The name may carry a path.
    ///
    /// # Examples
    ///
    /// ```
    /// use mosaic::rpf::RpfFrameName;
    ///
    /// let name = RpfFrameName::parse("X340S0A1.ON2", false).unwrap();
    /// assert_eq!(name.frame_number, 41548978);
    /// assert_eq!(name.series, "ON");
    /// assert_eq!(name.zone, '2');
    /// ```
    pub fn parse(filename: &str, cib: bool) -> Option<Self> {
        // Extract just the filename if a path is given
        let name = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(filename);

        if name.len() != 12 || !name.is_ascii() || name.as_bytes()[8] != b'.' {
            return None;
        }

        let frame_chars = if cib { 6 } else { 5 };
        let frame_number = decode_str(&name[..frame_chars]);
        let version = decode_str(&name[frame_chars..7]);
        if frame_number < 0 || version < 0 {
            return None;
        }

        let bytes = name.as_bytes();
        Some(Self {
            frame_number,
            version,
            producer: bytes[7] as char,
            series: name[9..11].to_string(),
            zone: bytes[11] as char,
        })
    }
}
