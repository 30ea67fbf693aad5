use super::action::{Action, AttrChange, NamedMode};
use super::color::Color;
use super::utf8::{Decoded, Utf8Decoder};

/// Parser state over the input byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi,
    Osc,
    Dcs,
}

/// Cap on accumulated CSI parameter and OSC/DCS string bytes so malformed
/// streams cannot grow buffers without bound.
const PARAM_CAP: usize = 64;
const STRING_CAP: usize = 4096;

/// Byte state machine over the VT/ANSI stream. Feeds printable data through
/// the UTF-8 decoder owned by the engine and reduces control sequences to
/// `Action`s. Unrecognised sequences abort back to Ground.
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    params: Vec<u8>,
    intermediates: Vec<u8>,
    /// Leading `?` or `>` marker of a private CSI sequence.
    private: Option<u8>,
    string_buf: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no sequence is in flight.
    pub fn in_ground(&self) -> bool {
        self.state == State::Ground
    }

    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_csi();
        self.string_buf.clear();
    }

    /// Advance the machine by one byte, appending any produced actions.
    pub fn advance(&mut self, decoder: &mut Utf8Decoder, byte: u8, out: &mut Vec<Action>) {
        match self.state {
            State::Ground => self.ground(decoder, byte, out),
            State::Escape => self.escape(byte, out),
            State::Csi => self.csi(byte, out),
            State::Osc => self.string_body(byte, true, out),
            State::Dcs => self.string_body(byte, false, out),
        }
    }

    fn ground(&mut self, decoder: &mut Utf8Decoder, byte: u8, out: &mut Vec<Action>) {
        // ESC bypasses the decoder so a partially assembled scalar survives
        // an interleaved escape sequence.
        if byte == 0x1B {
            self.state = State::Escape;
            return;
        }
        if byte >= 0x80 || decoder.is_pending() {
            match decoder.decode(byte) {
                Decoded::Pending => {}
                Decoded::One(ch) => out.push(Action::Print(ch)),
                Decoded::Two(replacement, ch) => {
                    out.push(Action::Print(replacement));
                    self.ground_scalar(ch, out);
                }
            }
            return;
        }
        self.ground_scalar(byte as char, out);
    }

    fn ground_scalar(&mut self, ch: char, out: &mut Vec<Action>) {
        match ch {
            '\x07' => out.push(Action::Bell),
            '\x08' => out.push(Action::Backspace),
            '\t' => out.push(Action::Tab),
            '\n' => out.push(Action::Newline),
            '\r' => out.push(Action::CarriageReturn),
            c if (c as u32) < 0x20 || c == '\x7F' => {}
            c => out.push(Action::Print(c)),
        }
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Action>) {
        self.state = State::Ground;
        match byte {
            b'[' => {
                self.clear_csi();
                self.state = State::Csi;
            }
            b']' => {
                self.string_buf.clear();
                self.state = State::Osc;
            }
            b'P' => {
                self.string_buf.clear();
                self.state = State::Dcs;
            }
            // IND: content scrolls up; the departing top row is captured.
            b'D' => out.push(Action::ScrollUp(1)),
            // RI: content scrolls down, no capture.
            b'M' => out.push(Action::ScrollDown(1)),
            b'E' => {
                out.push(Action::Newline);
                out.push(Action::CarriageReturn);
            }
            b'H' => out.push(Action::SetTabStop),
            b'7' => out.push(Action::SaveCursor),
            b'8' => out.push(Action::RestoreCursor),
            b'=' => out.push(Action::SetMode(NamedMode::KeypadApplication, true)),
            b'>' => out.push(Action::SetMode(NamedMode::KeypadApplication, false)),
            b'c' => out.push(Action::Reset),
            // Anything else aborts to Ground.
            _ => {}
        }
    }

    fn csi(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x1B => {
                self.state = State::Escape;
            }
            b'?' | b'>' if self.params.is_empty() && self.intermediates.is_empty() => {
                self.private = Some(byte);
            }
            0x30..=0x3F => {
                if self.params.len() < PARAM_CAP {
                    self.params.push(byte);
                }
            }
            0x20..=0x2F => {
                if self.intermediates.len() < PARAM_CAP {
                    self.intermediates.push(byte);
                }
            }
            0x40..=0x7E => {
                self.state = State::Ground;
                self.dispatch_csi(byte, out);
            }
            // Stray C0 or high bytes inside a sequence are ignored.
            _ => {}
        }
    }

    fn string_body(&mut self, byte: u8, is_osc: bool, out: &mut Vec<Action>) {
        match byte {
            0x07 => {
                self.state = State::Ground;
                if is_osc {
                    self.finish_osc(out);
                }
                self.string_buf.clear();
            }
            0x1B => {
                // ESC terminates the string; the following byte (usually the
                // `\` of ST) is handled by the Escape state.
                self.state = State::Escape;
                if is_osc {
                    self.finish_osc(out);
                }
                self.string_buf.clear();
            }
            b => {
                if self.string_buf.len() < STRING_CAP {
                    self.string_buf.push(b);
                }
            }
        }
    }

    fn finish_osc(&mut self, out: &mut Vec<Action>) {
        let body = String::from_utf8_lossy(&self.string_buf);
        if let Some(title) = body.strip_prefix("0;").or_else(|| body.strip_prefix("2;")) {
            out.push(Action::SetTitle(title.to_string()));
        }
    }

    fn clear_csi(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.private = None;
    }

    fn parsed_params(&self) -> Vec<u16> {
        let raw = std::str::from_utf8(&self.params).unwrap_or("");
        raw.split(';')
            .map(|field| field.parse::<u16>().unwrap_or(0))
            .collect()
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        let params = self.parsed_params();
        let private = self.private;

        match final_byte {
            b'A' => out.push(Action::CursorUp(param(&params, 0, 1))),
            b'B' => out.push(Action::CursorDown(param(&params, 0, 1))),
            b'C' => out.push(Action::CursorForward(param(&params, 0, 1))),
            b'D' => out.push(Action::CursorBack(param(&params, 0, 1))),
            b'E' => out.push(Action::NextLine(param(&params, 0, 1))),
            b'F' => out.push(Action::PrevLine(param(&params, 0, 1))),
            b'G' => out.push(Action::CursorColumn(param(&params, 0, 1) - 1)),
            b'H' | b'f' => out.push(Action::CursorTo {
                row: param(&params, 0, 1) - 1,
                col: param(&params, 1, 1) - 1,
            }),
            b'J' => out.push(Action::ClearScreen(raw_param(&params, 0))),
            b'K' => out.push(Action::ClearLine(raw_param(&params, 0))),
            b'L' => out.push(Action::InsertLines(param(&params, 0, 1))),
            b'M' => out.push(Action::DeleteLines(param(&params, 0, 1))),
            b'P' => out.push(Action::DeleteChars(param(&params, 0, 1))),
            b'@' => out.push(Action::InsertChars(param(&params, 0, 1))),
            b'X' => out.push(Action::EraseChars(param(&params, 0, 1))),
            b'S' => out.push(Action::ScrollUp(param(&params, 0, 1))),
            b'T' => out.push(Action::ScrollDown(param(&params, 0, 1))),
            b'd' => out.push(Action::CursorRow(param(&params, 0, 1) - 1)),
            b'm' if private.is_none() => sgr(&params, out),
            b'r' => {
                // Bottom defaults to the last row, which only the engine knows.
                let bottom = match raw_param(&params, 1) {
                    0 => usize::MAX,
                    b => b as usize - 1,
                };
                out.push(Action::SetScrollRegion {
                    top: param(&params, 0, 1) - 1,
                    bottom,
                });
            }
            b's' => out.push(Action::SaveCursor),
            b'u' => out.push(Action::RestoreCursor),
            b'h' => self.set_modes(&params, true, out),
            b'l' => self.set_modes(&params, false, out),
            b'g' => out.push(Action::ClearTabStop(raw_param(&params, 0))),
            b'n' => match raw_param(&params, 0) {
                5 => out.push(Action::SendResponse(b"\x1b[0n".to_vec())),
                6 => out.push(Action::ReportCursorPosition),
                15 => out.push(Action::SendResponse(b"\x1b[?13n".to_vec())),
                25 => out.push(Action::SendResponse(b"\x1b[?21n".to_vec())),
                26 => out.push(Action::SendResponse(b"\x1b[?27;1n".to_vec())),
                _ => {}
            },
            b't' => match raw_param(&params, 0) {
                // Resize request: accepted, ignored.
                8 => {}
                18 => out.push(Action::ReportTextAreaSize),
                19 => out.push(Action::ReportScreenSize),
                // Unknown window ops are swallowed so nothing echoes junk.
                _ => {}
            },
            b'c' => match private {
                Some(b'>') if raw_param(&params, 0) == 0 => {
                    out.push(Action::SendResponse(b"\x1b[>1;10;0c".to_vec()))
                }
                None if raw_param(&params, 0) == 0 => {
                    out.push(Action::SendResponse(b"\x1b[?62;1;2;6;7;8;9c".to_vec()))
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn set_modes(&self, params: &[u16], enable: bool, out: &mut Vec<Action>) {
        let private = self.private == Some(b'?');
        for &p in params {
            if private {
                self.set_private_mode(p, enable, out);
            } else {
                match p {
                    4 => out.push(Action::SetMode(NamedMode::Insert, enable)),
                    20 => out.push(Action::SetMode(NamedMode::LinefeedNewline, enable)),
                    _ => {}
                }
            }
        }
    }

    fn set_private_mode(&self, mode: u16, enable: bool, out: &mut Vec<Action>) {
        match mode {
            1 => out.push(Action::SetMode(NamedMode::CursorKeys, enable)),
            // 132-column and smooth scroll: accepted, ignored.
            3 | 4 => {}
            5 => out.push(Action::SetMode(NamedMode::ReverseVideo, enable)),
            6 => out.push(Action::SetMode(NamedMode::Origin, enable)),
            7 => out.push(Action::SetMode(NamedMode::LineWrap, enable)),
            25 => out.push(Action::SetMode(NamedMode::CursorVisible, enable)),
            47 | 1047 => out.push(Action::SwitchAltScreen(enable)),
            1000 => out.push(Action::SetMode(NamedMode::MouseX10, enable)),
            1001 => out.push(Action::SetMode(NamedMode::MouseVt200Highlight, enable)),
            1002 => out.push(Action::SetMode(NamedMode::MouseBtnEvent, enable)),
            1003 => out.push(Action::SetMode(NamedMode::MouseAnyEvent, enable)),
            1048 => out.push(if enable {
                Action::SaveCursor
            } else {
                Action::RestoreCursor
            }),
            1049 => {
                if enable {
                    out.push(Action::SaveCursor);
                    out.push(Action::SwitchAltScreen(true));
                    out.push(Action::ClearScreen(2));
                } else {
                    out.push(Action::SwitchAltScreen(false));
                    out.push(Action::RestoreCursor);
                }
            }
            2004 => out.push(Action::SetMode(NamedMode::BracketedPaste, enable)),
            _ => {}
        }
    }
}

/// Parameter with a default applied to missing or zero values.
fn param(params: &[u16], idx: usize, default: usize) -> usize {
    match params.get(idx).copied() {
        Some(0) | None => default,
        Some(v) => v as usize,
    }
}

/// Parameter where zero is meaningful (ED/EL/TBC modes, DSR codes).
fn raw_param(params: &[u16], idx: usize) -> u16 {
    params.get(idx).copied().unwrap_or(0)
}

fn sgr(params: &[u16], out: &mut Vec<Action>) {
    if params.is_empty() || params == [0] {
        out.push(Action::SetAttribute(AttrChange::Reset));
        return;
    }
    for &p in params {
        let change = match p {
            0 => Some(AttrChange::Reset),
            1 => Some(AttrChange::Bold(true)),
            3 => Some(AttrChange::Italic(true)),
            4 => Some(AttrChange::Underline(true)),
            5 => Some(AttrChange::Blink(true)),
            7 => Some(AttrChange::Reverse(true)),
            22 => Some(AttrChange::Bold(false)),
            23 => Some(AttrChange::Italic(false)),
            24 => Some(AttrChange::Underline(false)),
            25 => Some(AttrChange::Blink(false)),
            27 => Some(AttrChange::Reverse(false)),
            30..=37 | 90..=97 => Color::from_sgr_fg(p).map(AttrChange::Foreground),
            39 => Some(AttrChange::Foreground(Color::Default)),
            40..=47 | 100..=107 => Color::from_sgr_bg(p).map(AttrChange::Background),
            49 => Some(AttrChange::Background(Color::Default)),
            _ => None,
        };
        if let Some(change) = change {
            out.push(Action::SetAttribute(change));
        }
    }
}
