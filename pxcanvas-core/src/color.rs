//! Pixel colors as they appear on the wire.
//!
//! A color token is 6 (`RRGGBB`) or 8 (`RRGGBBAA`) hex digits. Parsing
//! accepts either case; rendering is always uppercase and fixed width.

use std::fmt;
use std::str::FromStr;

use crate::error::PixelflutError;

// ── Color ────────────────────────────────────────────────────────

/// An RGB color with an optional alpha channel.
///
/// `alpha == None` is the 6-digit form, which the server treats as
/// fully opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: Option<u8>,
}

impl Color {
    /// A 3-channel color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: None }
    }

    /// A 4-channel color.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r,
            g,
            b,
            alpha: Some(a),
        }
    }

    /// Same channels with an explicit alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self {
            alpha: Some(a),
            ..self
        }
    }

    /// Same channels with alpha forced to `FF`.
    pub const fn opaque(self) -> Self {
        self.with_alpha(0xFF)
    }

    /// The three color channels.
    pub const fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Compare color channels only, ignoring alpha.
    pub fn same_rgb(&self, other: &Color) -> bool {
        self.channels() == other.channels()
    }

    /// Number of hex digits this color renders to.
    pub const fn hex_len(&self) -> usize {
        match self.alpha {
            Some(_) => 8,
            None => 6,
        }
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if let Some(a) = self.alpha {
            write!(f, "{a:02X}")?;
        }
        Ok(())
    }
}

impl FromStr for Color {
    type Err = PixelflutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if !(bytes.len() == 6 || bytes.len() == 8) {
            return Err(PixelflutError::InvalidColor(s.to_string()));
        }

        let mut channels = [0u8; 4];
        for (slot, pair) in channels.iter_mut().zip(bytes.chunks_exact(2)) {
            let hi = hex_digit(pair[0]);
            let lo = hex_digit(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => *slot = (hi << 4) | lo,
                _ => return Err(PixelflutError::InvalidColor(s.to_string())),
            }
        }

        let [r, g, b, a] = channels;
        Ok(if bytes.len() == 8 {
            Color::rgba(r, g, b, a)
        } else {
            Color::rgb(r, g, b)
        })
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_six_digits() {
        let c: Color = "aabbcc".parse().unwrap();
        assert_eq!(c, Color::rgb(0xAA, 0xBB, 0xCC));
        assert_eq!(c.to_string(), "AABBCC");
        assert_eq!(c.hex_len(), 6);
    }

    #[test]
    fn parse_eight_digits() {
        let c: Color = "0A0B0C7f".parse().unwrap();
        assert_eq!(c, Color::rgba(0x0A, 0x0B, 0x0C, 0x7F));
        assert_eq!(c.to_string(), "0A0B0C7F");
    }

    #[test]
    fn rejects_bad_tokens() {
        for bad in ["", "ABC", "AABBC", "AABBCCD", "GGBBCC", "AABBCCDDEE", "+ABBCC"] {
            assert!(
                matches!(bad.parse::<Color>(), Err(PixelflutError::InvalidColor(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn opaque_and_same_rgb() {
        let c = Color::rgb(1, 2, 3);
        assert_eq!(c.opaque().to_string(), "010203FF");
        assert!(c.same_rgb(&c.opaque()));
        assert_ne!(c, c.opaque());
    }
}
