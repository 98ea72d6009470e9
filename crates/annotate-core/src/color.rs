//! Session colors as produced by an `<input type="color">` picker.

use crate::error::AnnotateError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB`, `RRGGBB` or the short `#RGB` form.
    pub fn parse_hex(input: &str) -> Result<Self, AnnotateError> {
        let trimmed = input.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || AnnotateError::InvalidColor(input.to_string());

        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match hex.len() {
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Ok(Self::rgb(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => Err(invalid()),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::YELLOW
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = AnnotateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::parse_hex(s)
    }
}

impl TryFrom<String> for Color {
    type Error = AnnotateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_hex() {
        assert_eq!(Color::parse_hex("#FF0000").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(Color::parse_hex("00ff80").unwrap(), Color::rgb(0, 255, 128));
    }

    #[test]
    fn test_parse_short_hex() {
        assert_eq!(Color::parse_hex("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse_hex("#f00").unwrap(), Color::rgb(255, 0, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Color::parse_hex("").is_err());
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#GGGGGG").is_err());
        assert!(Color::parse_hex("#ééé").is_err());
        assert!(Color::parse_hex("#+f+f+f").is_err());
        assert!(Color::parse_hex("+ff").is_err());
        assert!(Color::parse_hex("##ffffff").is_err());
    }

    #[test]
    fn test_display_is_lowercase_hex() {
        assert_eq!(Color::rgb(255, 255, 0).to_string(), "#ffff00");
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let json = serde_json::to_string(&Color::rgb(1, 2, 3)).unwrap();
        assert_eq!(json, "\"#010203\"");
        let back: Color = serde_json::from_str("\"#FF0000\"").unwrap();
        assert_eq!(back, Color::rgb(255, 0, 0));
        assert!(serde_json::from_str::<Color>("\"red\"").is_err());
    }
}
