use bitflags::bitflags;

use super::color::Color;

bitflags! {
    /// Cell text attributes as a compact bitflag set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct CellAttrs: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const BLINK     = 1 << 3;
        const REVERSE   = 1 << 4;
    }
}

/// Graphic rendition applied to printed cells: colors plus attribute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrs {
    pub fg: Color,
    pub bg: Color,
    pub flags: CellAttrs,
}

/// Cursor state: position plus the rendition new cells are written with,
/// and the DECSC/DECRC save slot.
#[derive(Debug, Clone)]
pub struct CursorState {
    pub x: usize,
    pub y: usize,
    pub attrs: Attrs,
    saved: Option<SavedCursor>,
}

#[derive(Debug, Clone)]
struct SavedCursor {
    x: usize,
    y: usize,
    attrs: Attrs,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            attrs: Attrs::default(),
            saved: None,
        }
    }
}

impl CursorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&mut self) {
        self.saved = Some(SavedCursor {
            x: self.x,
            y: self.y,
            attrs: self.attrs,
        });
    }

    /// Restore the saved position and rendition, clamped to the given
    /// dimensions in case the screen was resized since the save.
    pub fn restore(&mut self, width: usize, height: usize) {
        if let Some(saved) = self.saved.clone() {
            self.x = saved.x.min(width.saturating_sub(1));
            self.y = saved.y.min(height.saturating_sub(1));
            self.attrs = saved.attrs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_restore_round_trips() {
        let mut cursor = CursorState::new();
        cursor.x = 7;
        cursor.y = 3;
        cursor.attrs.flags = CellAttrs::BOLD | CellAttrs::REVERSE;
        cursor.save();

        cursor.x = 0;
        cursor.y = 0;
        cursor.attrs = Attrs::default();

        cursor.restore(80, 24);
        assert_eq!(cursor.x, 7, "column should be restored");
        assert_eq!(cursor.y, 3, "row should be restored");
        assert_eq!(cursor.attrs.flags, CellAttrs::BOLD | CellAttrs::REVERSE);
    }

    #[test]
    fn restore_clamps_after_shrink() {
        let mut cursor = CursorState::new();
        cursor.x = 70;
        cursor.y = 20;
        cursor.save();

        cursor.restore(40, 10);
        assert_eq!(cursor.x, 39, "column clamps into the new width");
        assert_eq!(cursor.y, 9, "row clamps into the new height");
    }

    #[test]
    fn restore_without_save_is_a_no_op() {
        let mut cursor = CursorState::new();
        cursor.x = 5;
        cursor.restore(80, 24);
        assert_eq!(cursor.x, 5);
    }
}
