use super::color::Color;

/// A single attribute change produced by one SGR parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrChange {
    Reset,
    Bold(bool),
    Italic(bool),
    Underline(bool),
    Blink(bool),
    Reverse(bool),
    Foreground(Color),
    Background(Color),
}

/// Modes the parser can name in a `SetMode` action. Mouse modes carry their
/// reporting class; the rest are plain flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedMode {
    CursorKeys,
    KeypadApplication,
    ReverseVideo,
    Origin,
    LineWrap,
    CursorVisible,
    MouseX10,
    MouseVt200Highlight,
    MouseBtnEvent,
    MouseAnyEvent,
    BracketedPaste,
    Insert,
    LinefeedNewline,
}

/// Parser output consumed by the terminal engine. Every byte fed to the
/// parser reduces to zero or more of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Print(char),
    Bell,
    Tab,
    Newline,
    CarriageReturn,
    Backspace,

    CursorUp(usize),
    CursorDown(usize),
    CursorForward(usize),
    CursorBack(usize),
    /// CNL: relative newlines plus carriage return.
    NextLine(usize),
    /// CPL: relative reverse newlines plus carriage return.
    PrevLine(usize),
    /// CHA: absolute column, 0-based.
    CursorColumn(usize),
    /// VPA: absolute row, 0-based.
    CursorRow(usize),
    /// CUP/HVP: absolute position, 0-based.
    CursorTo { row: usize, col: usize },

    /// ED with its raw mode (0 cursor..end, 1 begin..cursor, 2 all).
    ClearScreen(u16),
    /// EL with its raw mode.
    ClearLine(u16),

    SetAttribute(AttrChange),

    /// Scroll the region up/down by n (SU/SD, and ESC D / ESC M with n=1).
    ScrollUp(usize),
    ScrollDown(usize),

    SetMode(NamedMode, bool),

    InsertChars(usize),
    DeleteChars(usize),
    EraseChars(usize),
    InsertLines(usize),
    DeleteLines(usize),

    /// DECSTBM, 0-based inclusive.
    SetScrollRegion { top: usize, bottom: usize },

    SaveCursor,
    RestoreCursor,
    SwitchAltScreen(bool),

    /// Bytes to queue for the transport (static status reports).
    SendResponse(Vec<u8>),
    /// DSR 6: cursor position report, needs engine state.
    ReportCursorPosition,
    /// Window op 18: text-area size report.
    ReportTextAreaSize,
    /// Window op 19: screen size report.
    ReportScreenSize,

    SetTabStop,
    /// TBC with its raw mode (0 current, 3 all + defaults).
    ClearTabStop(u16),

    /// OSC 0/2 window title.
    SetTitle(String),

    Reset,
}
