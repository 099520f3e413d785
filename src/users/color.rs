//! Deterministic username colors.

use std::fmt;

/// Foreground palette, as 24-bit RGB.
pub const PALETTE: [UserColor; 10] = [
    UserColor::rgb(0x1A, 0x73, 0xE8), // blue
    UserColor::rgb(0x34, 0xA8, 0x53), // green
    UserColor::rgb(0xFB, 0xBC, 0x05), // yellow
    UserColor::rgb(0xEA, 0x43, 0x35), // red
    UserColor::rgb(0xA1, 0x42, 0xF4), // purple
    UserColor::rgb(0xF9, 0x5F, 0x62), // coral
    UserColor::rgb(0x01, 0xB9, 0xC1), // cyan
    UserColor::rgb(0xFF, 0x99, 0x00), // orange
    UserColor::rgb(0x2D, 0xD4, 0xBF), // aqua
    UserColor::rgb(0xF7, 0x25, 0x85), // magenta
];

/// A terminal foreground color.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl UserColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Wrap `text` in a truecolor ANSI foreground sequence.
    pub fn paint(&self, text: &str) -> String {
        format!("\x1b[38;2;{};{};{}m{}\x1b[0m", self.r, self.g, self.b, text)
    }
}

impl fmt::Debug for UserColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserColor({})", self.to_hex())
    }
}

impl fmt::Display for UserColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Pick a palette entry from the sum of the username's code points.
///
/// Case matters: "Alice" and "alice" may get different colors.
pub fn assign_color(username: &str) -> UserColor {
    let sum: u64 = username.chars().map(|c| u64::from(u32::from(c))).sum();
    PALETTE[(sum % PALETTE.len() as u64) as usize]
}
