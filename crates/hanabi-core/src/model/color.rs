use core::fmt;
use serde::{Deserialize, Serialize};

/// Firework colors in the canonical RYGWB order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Yellow = 1,
    Green = 2,
    White = 3,
    Blue = 4,
}

impl Color {
    pub const COUNT: usize = 5;

    pub const ALL: [Color; 5] = [
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::White,
        Color::Blue,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Color::Red),
            1 => Some(Color::Yellow),
            2 => Some(Color::Green),
            3 => Some(Color::White),
            4 => Some(Color::Blue),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_char(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'R' => Some(Color::Red),
            'Y' => Some(Color::Yellow),
            'G' => Some(Color::Green),
            'W' => Some(Color::White),
            'B' => Some(Color::Blue),
            _ => None,
        }
    }

    /// Colors in play for a game using the first `count` colors.
    pub fn in_play(count: usize) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().take(count.min(Color::COUNT))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Color::Red => "R",
            Color::Yellow => "Y",
            Color::Green => "G",
            Color::White => "W",
            Color::Blue => "B",
        };
        f.write_str(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn display_returns_ascii_symbols() {
        assert_eq!(Color::Red.to_string(), "R");
        assert_eq!(Color::Blue.to_string(), "B");
    }

    #[test]
    fn from_index_maps_valid_values() {
        assert_eq!(Color::from_index(2), Some(Color::Green));
        assert_eq!(Color::from_index(5), None);
    }

    #[test]
    fn char_roundtrip() {
        for color in Color::ALL {
            let symbol = color.to_string().chars().next().unwrap();
            assert_eq!(Color::from_char(symbol), Some(color));
        }
    }

    #[test]
    fn in_play_respects_count() {
        let small: Vec<_> = Color::in_play(2).collect();
        assert_eq!(small, vec![Color::Red, Color::Yellow]);
        assert_eq!(Color::in_play(9).count(), 5);
    }
}
