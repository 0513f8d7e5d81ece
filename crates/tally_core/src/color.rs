//! Label foreground colors
//!
//! Colors are stored as normalized RGBA channels. Blending between two colors
//! is a straight per-channel linear interpolation, which is what the counting
//! animator uses for its color transition.

use crate::error::{Result, TallyError};

/// RGBA color with channels in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    /// Parse `#RRGGBB`, `RRGGBB`, or `#RRGGBBAA`
    pub fn parse_hex(literal: &str) -> Result<Self> {
        let digits = literal.trim().trim_start_matches('#');
        let invalid = || TallyError::InvalidColor(literal.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;

        match digits.len() {
            6 => Ok(Self::from_hex(value)),
            8 => Ok(Self::from_hex(value >> 8).with_alpha((value & 0xFF) as f32 / 255.0)),
            _ => Err(invalid()),
        }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    /// 8-bit RGB channels, rounded
    pub fn to_rgb8(&self) -> [u8; 3] {
        let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b)]
    }

    /// Linear interpolation between two colors
    pub fn lerp(a: &Color, b: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color {
            r: a.r + (b.r - a.r) * t,
            g: a.g + (b.g - a.g) * t,
            b: a.b + (b.b - a.b) * t,
            a: a.a + (b.a - a.a) * t,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_midpoint() {
        let mid = Color::lerp(&Color::BLACK, &Color::GREEN, 0.5);
        assert!((mid.r - 0.0).abs() < 1e-6);
        assert!((mid.g - 0.5).abs() < 1e-6);
        assert!((mid.b - 0.0).abs() < 1e-6);
        assert!((mid.a - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_clamps_factor() {
        assert_eq!(Color::lerp(&Color::BLACK, &Color::WHITE, 2.0), Color::WHITE);
        assert_eq!(Color::lerp(&Color::BLACK, &Color::WHITE, -1.0), Color::BLACK);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::parse_hex("#00FF00").unwrap(), Color::GREEN);
        assert_eq!(Color::parse_hex("ff0000").unwrap(), Color::RED);

        let translucent = Color::parse_hex("#FFFFFF80").unwrap();
        assert!((translucent.a - 128.0 / 255.0).abs() < 1e-6);

        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#GG0000").is_err());
        assert!(Color::parse_hex("+12345").is_err());
    }

    #[test]
    fn test_to_rgb8() {
        assert_eq!(Color::ORANGE.to_rgb8(), [255, 128, 0]);
    }
}
