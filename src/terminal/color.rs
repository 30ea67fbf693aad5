/// Indexed terminal color. The palette is the classic 8 normal + 8 bright
/// ANSI set plus the terminal default; truecolor is out of scope for this
/// renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Default,
    /// 0-7 normal, 8-15 bright.
    Indexed(u8),
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

impl Color {
    /// Palette index for an SGR foreground parameter (30-37, 90-97).
    pub fn from_sgr_fg(param: u16) -> Option<Color> {
        match param {
            30..=37 => Some(Color::Indexed(param as u8 - 30)),
            90..=97 => Some(Color::Indexed(param as u8 - 90 + 8)),
            _ => None,
        }
    }

    /// Palette index for an SGR background parameter (40-47, 100-107).
    pub fn from_sgr_bg(param: u16) -> Option<Color> {
        match param {
            40..=47 => Some(Color::Indexed(param as u8 - 40)),
            100..=107 => Some(Color::Indexed(param as u8 - 100 + 8)),
            _ => None,
        }
    }
}

/// Convert a palette index to an RGB triple for backends that want concrete
/// colors. 0-7 are the standard ANSI colors, 8-15 the bright set.
#[allow(dead_code)]
pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0 => (0x00, 0x00, 0x00),  // black
        1 => (0xcd, 0x00, 0x00),  // red
        2 => (0x00, 0xcd, 0x00),  // green
        3 => (0xcd, 0xcd, 0x00),  // yellow
        4 => (0x00, 0x00, 0xee),  // blue
        5 => (0xcd, 0x00, 0xcd),  // magenta
        6 => (0x00, 0xcd, 0xcd),  // cyan
        7 => (0xe5, 0xe5, 0xe5),  // white
        8 => (0x7f, 0x7f, 0x7f),  // bright black
        9 => (0xff, 0x00, 0x00),  // bright red
        10 => (0x00, 0xff, 0x00), // bright green
        11 => (0xff, 0xff, 0x00), // bright yellow
        12 => (0x5c, 0x5c, 0xff), // bright blue
        13 => (0xff, 0x00, 0xff), // bright magenta
        14 => (0x00, 0xff, 0xff), // bright cyan
        15 => (0xff, 0xff, 0xff), // bright white
        _ => (0xe5, 0xe5, 0xe5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgr_foreground_mapping() {
        assert_eq!(Color::from_sgr_fg(31), Some(Color::Indexed(1)));
        assert_eq!(Color::from_sgr_fg(97), Some(Color::Indexed(15)));
        assert_eq!(Color::from_sgr_fg(38), None);
    }

    #[test]
    fn sgr_background_mapping() {
        assert_eq!(Color::from_sgr_bg(44), Some(Color::Indexed(4)));
        assert_eq!(Color::from_sgr_bg(100), Some(Color::Indexed(8)));
        assert_eq!(Color::from_sgr_bg(48), None);
    }
}
