use bitflags::bitflags;

use crate::terminal::cursor::Attrs;

bitflags! {
    /// Key modifier mask. The xterm modifier parameter is
    /// `1 + (shift?1) + (alt?2) + (ctrl?4)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

impl Modifiers {
    /// The xterm CSI modifier parameter for this mask.
    pub fn xterm_param(self) -> u8 {
        1 + (self.contains(Modifiers::SHIFT) as u8)
            + ((self.contains(Modifiers::ALT) as u8) << 1)
            + ((self.contains(Modifiers::CTRL) as u8) << 2)
    }
}

bitflags! {
    /// Mouse button state reported by the display backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ButtonMask: u8 {
        const BUTTON1    = 1 << 0;
        const BUTTON2    = 1 << 1;
        const BUTTON3    = 1 << 2;
        const WHEEL_UP   = 1 << 3;
        const WHEEL_DOWN = 1 << 4;
    }
}

/// Keys the display backend can report. Printable input arrives as `Rune`
/// with the scalar in the event's `ch` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Rune,
    Enter,
    Tab,
    Backspace,
    Delete,
    Insert,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function key 1-12.
    F(u8),
}

impl Key {
    pub fn is_rune(self) -> bool {
        self == Key::Rune
    }
}

/// A UI event polled from the display backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Key {
        key: Key,
        ch: char,
        mods: Modifiers,
    },
    Mouse {
        x: u16,
        y: u16,
        buttons: ButtonMask,
    },
    Resize {
        width: u16,
        height: u16,
    },
}

/// The display backend capability the pump consumes: a cell surface plus a
/// blocking event source. Methods take `&self` so one handle can serve the
/// renderer and the event poller concurrently; implementations provide
/// their own interior synchronisation.
pub trait Display: Send + Sync {
    /// Current surface size in cells (columns, rows).
    fn size(&self) -> (u16, u16);

    /// Place one styled cell. Out-of-range coordinates are ignored.
    fn set_content(&self, x: u16, y: u16, ch: char, style: Attrs);

    fn show_cursor(&self, x: u16, y: u16);
    fn hide_cursor(&self);

    /// Block until the next event. Returns `None` once the backend is
    /// finalised.
    fn poll_event(&self) -> Option<Event>;

    /// Inject a synthetic event, waking a blocked `poll_event`.
    fn post_event(&self, event: Event);

    fn enable_mouse(&self);
    fn disable_mouse(&self);

    fn clear(&self);

    /// Flush pending cell updates to the physical surface.
    fn show(&self);

    /// Finalise the backend; subsequent `poll_event` calls return `None`.
    fn fini(&self);
}
