/// Mouse reporting mode selected via the `?1000`-family private modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    Off,
    /// Press-only reporting, wheels suppressed (mode 1000).
    X10,
    /// Press and release reporting (VT200 class).
    Vt200,
    /// Highlight-tracking variant (mode 1001); reported like VT200.
    Vt200Highlight,
    /// Press, release and drag reporting (mode 1002).
    BtnEvent,
    /// BtnEvent plus plain motion (mode 1003).
    AnyEvent,
}

impl MouseMode {
    pub fn is_off(self) -> bool {
        self == MouseMode::Off
    }
}

/// Terminal mode flags tracking the DEC and ANSI modes the engine honors.
#[derive(Debug, Clone)]
pub struct TerminalModes {
    /// DECCKM: cursor key mode (application vs normal)
    pub cursor_keys_application: bool,
    /// DECKPAM/DECKPNM: keypad application mode
    pub keypad_application: bool,
    /// DECAWM: auto-wrap mode
    pub line_wrap: bool,
    /// DECOM: origin mode
    pub origin: bool,
    /// DECTCEM: text cursor visible
    pub cursor_visible: bool,
    /// DECSCNM: reverse video
    pub reverse_video: bool,
    /// Insert mode (IRM, ANSI mode 4)
    pub insert: bool,
    /// Line feed / new line mode (LNM, ANSI mode 20)
    pub linefeed_newline: bool,
    /// Bracketed paste mode (mode 2004); recorded, not acted on
    pub bracketed_paste: bool,
    /// Mouse reporting mode
    pub mouse: MouseMode,
}

impl Default for TerminalModes {
    fn default() -> Self {
        Self {
            cursor_keys_application: false,
            keypad_application: false,
            line_wrap: true,
            origin: false,
            cursor_visible: true,
            reverse_video: false,
            insert: false,
            linefeed_newline: false,
            bracketed_paste: false,
            mouse: MouseMode::Off,
        }
    }
}
