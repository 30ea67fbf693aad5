use std::panic::{self, AssertUnwindSafe};

use unicode_width::UnicodeWidthChar;

use super::action::{Action, AttrChange, NamedMode};
use super::cursor::{Attrs, CellAttrs, CursorState};
use super::modes::{MouseMode, TerminalModes};
use super::parser::Parser;
use super::screen::{Cell, Screen, WIDE_SPACER};
use super::scrollback::{Scrollback, ScrollView};
use super::tabs::TabStops;
use super::utf8::Utf8Decoder;
use crate::error::ConsoleError;

/// State-change notifications queued by the engine and drained by the pump
/// alongside each render snapshot. The pump reconfigures the display
/// backend from these (mouse enable/disable in particular).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    MouseModeChanged(MouseMode),
    TitleChanged(String),
    AltScreenEntered,
    AltScreenExited,
    Bell,
}

/// One run of cells the renderer must repaint.
#[derive(Debug, Clone)]
pub struct SnapRow {
    pub y: usize,
    pub start_x: usize,
    pub cells: Vec<Cell>,
}

/// Render data extracted under the engine lock; painted outside it.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    /// Repaint everything (full erase or scroll view active).
    pub full: bool,
    pub rows: Vec<SnapRow>,
    pub cursor: (usize, usize),
    pub cursor_visible: bool,
    pub scrolling: bool,
    pub scroll_position: usize,
    pub scrollback_len: usize,
    pub events: Vec<TerminalEvent>,
}

/// The terminal engine: applies parser actions to the dual screens and all
/// mode state, owns the scrollback, and queues wire responses for the
/// reader task to flush.
pub struct Terminal {
    width: usize,
    height: usize,
    primary: Screen,
    alt: Screen,
    use_alt: bool,
    cursor: CursorState,
    scroll_top: usize,
    scroll_bottom: usize,
    modes: TerminalModes,
    /// Wrap setting restored by RIS, from the session configuration.
    configured_line_wrap: bool,
    tabs: TabStops,
    parser: Parser,
    decoder: Utf8Decoder,
    scrollback: Scrollback,
    view: ScrollView,
    view_dirty: bool,
    title: String,
    running: bool,
    /// Deferred autowrap: set when a print fills the last column, cleared by
    /// any explicit column movement. Keeps the cursor inside the screen
    /// while preserving wrap-on-next-print semantics.
    wrap_pending: bool,
    pending_responses: Vec<Vec<u8>>,
    pending_events: Vec<TerminalEvent>,
}

impl Terminal {
    pub fn new(width: usize, height: usize, scrollback_size: usize, line_wrap: bool) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            primary: Screen::new(width, height),
            alt: Screen::new(width, height),
            use_alt: false,
            cursor: CursorState::new(),
            scroll_top: 0,
            scroll_bottom: height - 1,
            modes: TerminalModes {
                line_wrap,
                ..TerminalModes::default()
            },
            configured_line_wrap: line_wrap,
            tabs: TabStops::new(width),
            parser: Parser::new(),
            decoder: Utf8Decoder::new(),
            scrollback: Scrollback::new(scrollback_size),
            view: ScrollView::default(),
            view_dirty: false,
            title: String::new(),
            running: true,
            wrap_pending: false,
            pending_responses: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cursor_pos(&self) -> (usize, usize) {
        (self.cursor.x, self.cursor.y)
    }

    pub fn attrs(&self) -> Attrs {
        self.cursor.attrs
    }

    pub fn modes(&self) -> &TerminalModes {
        &self.modes
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.modes.mouse
    }

    pub fn scroll_region(&self) -> (usize, usize) {
        (self.scroll_top, self.scroll_bottom)
    }

    pub fn is_alt_screen(&self) -> bool {
        self.use_alt
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn screen(&self) -> &Screen {
        if self.use_alt {
            &self.alt
        } else {
            &self.primary
        }
    }

    fn screen_mut(&mut self) -> &mut Screen {
        if self.use_alt {
            &mut self.alt
        } else {
            &mut self.primary
        }
    }

    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    /// Feed transport bytes through the parser and apply the resulting
    /// actions. Adversarial input never propagates an error: a panic inside
    /// resets the parser and decoder and drops the offending chunk.
    pub fn process_output(&mut self, bytes: &[u8]) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process_inner(bytes)));
        if outcome.is_err() {
            tracing::error!(len = bytes.len(), "panic while processing output; parser reset");
            self.parser = Parser::new();
            self.decoder = Utf8Decoder::new();
        }
    }

    fn process_inner(&mut self, bytes: &[u8]) {
        let mut parser = std::mem::take(&mut self.parser);
        let mut decoder = std::mem::take(&mut self.decoder);
        let mut actions = Vec::new();
        for &byte in bytes {
            parser.advance(&mut decoder, byte, &mut actions);
        }
        self.parser = parser;
        self.decoder = decoder;
        for action in actions {
            self.apply(action);
        }
    }

    /// Wire responses queued by DSR/DA/window-op dispatch, drained by the
    /// reader task after each chunk and written back to the transport.
    pub fn take_pending_responses(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.pending_responses)
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Print(ch) => self.print(ch),
            Action::Bell => self.pending_events.push(TerminalEvent::Bell),
            Action::Tab => self.tab(),
            Action::Newline => self.newline(),
            Action::CarriageReturn => self.carriage_return(),
            Action::Backspace => self.backspace(),

            Action::CursorUp(n) => {
                self.cursor.y = self.cursor.y.saturating_sub(n);
            }
            Action::CursorDown(n) => {
                self.cursor.y = (self.cursor.y + n).min(self.height - 1);
            }
            Action::CursorForward(n) => {
                self.wrap_pending = false;
                self.cursor.x = (self.cursor.x + n).min(self.width - 1);
            }
            Action::CursorBack(n) => {
                self.wrap_pending = false;
                self.cursor.x = self.cursor.x.saturating_sub(n);
            }
            Action::NextLine(n) => {
                for _ in 0..n {
                    self.newline();
                }
                self.carriage_return();
            }
            Action::PrevLine(n) => {
                self.cursor.y = self.cursor.y.saturating_sub(n);
                self.carriage_return();
            }
            Action::CursorColumn(col) => {
                self.wrap_pending = false;
                self.cursor.x = col.min(self.width - 1);
            }
            Action::CursorRow(row) => self.move_to_row(row),
            Action::CursorTo { row, col } => {
                self.move_to_row(row);
                self.wrap_pending = false;
                self.cursor.x = col.min(self.width - 1);
            }

            Action::ClearScreen(mode) => self.clear_screen(mode),
            Action::ClearLine(mode) => self.clear_line(mode),

            Action::SetAttribute(change) => self.apply_attr(change),

            Action::ScrollUp(n) => self.scroll_up_region(n),
            Action::ScrollDown(n) => self.scroll_down_region(n),

            Action::SetMode(mode, enable) => self.set_named_mode(mode, enable),

            Action::InsertChars(n) => {
                let (x, y) = (self.cursor.x, self.cursor.y);
                self.screen_mut().insert_cells(x, y, n);
            }
            Action::DeleteChars(n) => {
                let (x, y) = (self.cursor.x, self.cursor.y);
                self.screen_mut().delete_cells(x, y, n);
            }
            Action::EraseChars(n) => {
                let (x, y) = (self.cursor.x, self.cursor.y);
                let end = (x + n).min(self.width);
                let attrs = self.cursor.attrs;
                self.screen_mut().erase_row_span(y, x, end, attrs);
            }
            Action::InsertLines(n) => self.insert_lines(n),
            Action::DeleteLines(n) => self.delete_lines(n),

            Action::SetScrollRegion { top, bottom } => self.set_scroll_region(top, bottom),

            Action::SaveCursor => self.cursor.save(),
            Action::RestoreCursor => {
                self.wrap_pending = false;
                self.cursor.restore(self.width, self.height);
            }
            Action::SwitchAltScreen(enter) => self.switch_alt_screen(enter),

            Action::SendResponse(bytes) => self.pending_responses.push(bytes),
            Action::ReportCursorPosition => {
                let report = format!("\x1b[{};{}R", self.cursor.y + 1, self.cursor.x + 1);
                self.pending_responses.push(report.into_bytes());
            }
            Action::ReportTextAreaSize => {
                let report = format!("\x1b[8;{};{}t", self.height, self.width);
                self.pending_responses.push(report.into_bytes());
            }
            Action::ReportScreenSize => {
                let report = format!("\x1b[9;{};{}t", self.height, self.width);
                self.pending_responses.push(report.into_bytes());
            }

            Action::SetTabStop => self.tabs.set(self.cursor.x),
            Action::ClearTabStop(mode) => match mode {
                0 => self.tabs.clear(self.cursor.x),
                3 => self.tabs.clear_all(),
                _ => {}
            },

            Action::SetTitle(title) => {
                self.pending_events
                    .push(TerminalEvent::TitleChanged(title.clone()));
                self.title = title;
            }

            Action::Reset => self.reset(),
        }
    }

    fn print(&mut self, ch: char) {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w == 0 {
            return;
        }

        let overflow =
            self.wrap_pending || self.cursor.x >= self.width || (w == 2 && self.cursor.x + 1 >= self.width);
        if overflow {
            if self.modes.line_wrap {
                self.carriage_return();
                self.newline();
            } else {
                // Clamp and drop everything past the last column.
                self.cursor.x = self.width - 1;
                self.wrap_pending = true;
                return;
            }
        }

        if self.cursor.y >= self.height {
            self.scroll_up_region(1);
            self.cursor.y = self.height - 1;
        }

        if self.modes.insert {
            let (x, y) = (self.cursor.x, self.cursor.y);
            self.screen_mut().insert_cells(x, y, w);
        }

        let (x, y) = (self.cursor.x, self.cursor.y);
        let attrs = self.cursor.attrs;
        self.put_char(x, y, ch, attrs);
        if w == 2 {
            self.put_char(x + 1, y, WIDE_SPACER, attrs);
        }

        self.cursor.x += w;
        if self.cursor.x >= self.width {
            self.cursor.x = self.width - 1;
            self.wrap_pending = true;
        }
    }

    /// Write one cell, blanking the other half of any wide pair the write
    /// splits so no continuation cell is ever orphaned.
    fn put_char(&mut self, x: usize, y: usize, ch: char, attrs: Attrs) {
        let hits_spacer = self.screen().cell(x, y).map_or(false, |c| c.ch == WIDE_SPACER);
        if hits_spacer && x > 0 {
            self.screen_mut().set_cell(x - 1, y, ' ', Attrs::default());
        } else if self
            .screen()
            .cell(x + 1, y)
            .map_or(false, |c| c.ch == WIDE_SPACER)
        {
            self.screen_mut().set_cell(x + 1, y, ' ', Attrs::default());
        }
        self.screen_mut().set_cell(x, y, ch, attrs);
    }

    fn newline(&mut self) {
        if self.cursor.y == self.scroll_bottom {
            self.scroll_up_region(1);
        } else if self.cursor.y + 1 < self.height {
            self.cursor.y += 1;
        }
        if self.modes.linefeed_newline {
            self.carriage_return();
        }
    }

    fn carriage_return(&mut self) {
        self.cursor.x = 0;
        self.wrap_pending = false;
    }

    fn backspace(&mut self) {
        self.wrap_pending = false;
        if self.cursor.x > 0 {
            self.cursor.x -= 1;
        }
    }

    fn tab(&mut self) {
        self.wrap_pending = false;
        self.cursor.x = self
            .tabs
            .next_after(self.cursor.x)
            .unwrap_or(self.width - 1);
    }

    fn move_to_row(&mut self, row: usize) {
        if self.modes.origin {
            self.cursor.y = (self.scroll_top + row).min(self.scroll_bottom);
        } else {
            self.cursor.y = row.min(self.height - 1);
        }
    }

    fn scroll_up_region(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        for _ in 0..n {
            let capture = top == 0 && !self.use_alt;
            let departed = self.screen_mut().scroll_up(top, bottom);
            if capture {
                self.scrollback.push(departed);
            }
        }
    }

    fn scroll_down_region(&mut self, n: usize) {
        let (top, bottom) = (self.scroll_top, self.scroll_bottom);
        for _ in 0..n {
            self.screen_mut().scroll_down(top, bottom);
        }
    }

    fn insert_lines(&mut self, n: usize) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let (top, bottom) = (self.cursor.y, self.scroll_bottom);
        for _ in 0..n {
            self.screen_mut().scroll_down(top, bottom);
        }
        self.carriage_return();
    }

    fn delete_lines(&mut self, n: usize) {
        if self.cursor.y < self.scroll_top || self.cursor.y > self.scroll_bottom {
            return;
        }
        let (top, bottom) = (self.cursor.y, self.scroll_bottom);
        for _ in 0..n {
            let capture = top == 0 && !self.use_alt;
            let departed = self.screen_mut().scroll_up(top, bottom);
            if capture {
                self.scrollback.push(departed);
            }
        }
        self.carriage_return();
    }

    fn clear_screen(&mut self, mode: u16) {
        let attrs = self.cursor.attrs;
        let (x, y) = (self.cursor.x, self.cursor.y);
        let (w, h) = (self.width, self.height);
        match mode {
            0 => {
                self.screen_mut().erase_row_span(y, x, w, attrs);
                for row in y + 1..h {
                    self.screen_mut().erase_row(row, attrs);
                }
            }
            1 => {
                for row in 0..y {
                    self.screen_mut().erase_row(row, attrs);
                }
                self.screen_mut().erase_row_span(y, 0, x + 1, attrs);
            }
            2 => {
                if !self.use_alt {
                    for row in 0..h {
                        if !self.primary.is_row_blank(row) {
                            self.scrollback.push(self.primary.row_snapshot(row));
                        }
                    }
                }
                self.screen_mut().clear_all();
                self.scroll_top = 0;
                self.scroll_bottom = h - 1;
                self.cursor.x = 0;
                self.cursor.y = 0;
                self.wrap_pending = false;
            }
            3 => {
                // xterm extension: erase the scrollback only; the visible
                // screen is untouched.
                if !self.use_alt {
                    self.scrollback.clear();
                    if self.view.is_scrolling() {
                        self.view.to_bottom(0);
                        self.view_dirty = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn clear_line(&mut self, mode: u16) {
        let attrs = self.cursor.attrs;
        let (x, y) = (self.cursor.x, self.cursor.y);
        let w = self.width;
        match mode {
            0 => self.screen_mut().erase_row_span(y, x, w, attrs),
            1 => self.screen_mut().erase_row_span(y, 0, x + 1, attrs),
            2 => self.screen_mut().erase_row(y, attrs),
            _ => {}
        }
    }

    fn apply_attr(&mut self, change: AttrChange) {
        let attrs = &mut self.cursor.attrs;
        match change {
            AttrChange::Reset => *attrs = Attrs::default(),
            AttrChange::Bold(on) => attrs.flags.set(CellAttrs::BOLD, on),
            AttrChange::Italic(on) => attrs.flags.set(CellAttrs::ITALIC, on),
            AttrChange::Underline(on) => attrs.flags.set(CellAttrs::UNDERLINE, on),
            AttrChange::Blink(on) => attrs.flags.set(CellAttrs::BLINK, on),
            AttrChange::Reverse(on) => attrs.flags.set(CellAttrs::REVERSE, on),
            AttrChange::Foreground(color) => attrs.fg = color,
            AttrChange::Background(color) => attrs.bg = color,
        }
    }

    fn set_named_mode(&mut self, mode: NamedMode, enable: bool) {
        match mode {
            NamedMode::CursorKeys => self.modes.cursor_keys_application = enable,
            NamedMode::KeypadApplication => self.modes.keypad_application = enable,
            NamedMode::ReverseVideo => self.modes.reverse_video = enable,
            NamedMode::Origin => {
                self.modes.origin = enable;
                // DECOM toggle homes the cursor.
                self.cursor.y = if enable { self.scroll_top } else { 0 };
                self.carriage_return();
            }
            NamedMode::LineWrap => self.modes.line_wrap = enable,
            NamedMode::CursorVisible => self.modes.cursor_visible = enable,
            NamedMode::MouseX10 => self.set_mouse_mode(MouseMode::X10, enable),
            NamedMode::MouseVt200Highlight => {
                self.set_mouse_mode(MouseMode::Vt200Highlight, enable)
            }
            NamedMode::MouseBtnEvent => self.set_mouse_mode(MouseMode::BtnEvent, enable),
            NamedMode::MouseAnyEvent => self.set_mouse_mode(MouseMode::AnyEvent, enable),
            NamedMode::BracketedPaste => self.modes.bracketed_paste = enable,
            NamedMode::Insert => self.modes.insert = enable,
            NamedMode::LinefeedNewline => self.modes.linefeed_newline = enable,
        }
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode, enable: bool) {
        let new = if enable {
            mode
        } else if self.modes.mouse == mode {
            MouseMode::Off
        } else {
            return;
        };
        if new != self.modes.mouse {
            self.modes.mouse = new;
            self.pending_events
                .push(TerminalEvent::MouseModeChanged(new));
        }
    }

    fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = if bottom == usize::MAX {
            self.height - 1
        } else {
            bottom.min(self.height - 1)
        };
        if top > bottom {
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        // DECSTBM homes the cursor.
        self.cursor.y = if self.modes.origin { self.scroll_top } else { 0 };
        self.carriage_return();
    }

    fn switch_alt_screen(&mut self, enter: bool) {
        if enter && !self.use_alt {
            self.alt.clear_all();
            self.use_alt = true;
            self.cursor.x = 0;
            self.cursor.y = 0;
            self.wrap_pending = false;
            self.pending_events.push(TerminalEvent::AltScreenEntered);
        } else if !enter && self.use_alt {
            self.use_alt = false;
            self.primary.mark_all_dirty();
            self.pending_events.push(TerminalEvent::AltScreenExited);
        }
    }

    fn reset(&mut self) {
        self.primary.clear_all();
        self.alt.clear_all();
        self.use_alt = false;
        self.cursor = CursorState::new();
        self.scroll_top = 0;
        self.scroll_bottom = self.height - 1;
        self.modes = TerminalModes {
            line_wrap: self.configured_line_wrap,
            ..TerminalModes::default()
        };
        self.tabs = TabStops::new(self.width);
        self.wrap_pending = false;
        // Scrollback outlives the screens and survives a terminal reset.
        self.pending_events
            .push(TerminalEvent::MouseModeChanged(MouseMode::Off));
    }

    /// Resize both screens, preserving the top-left overlap; scrollback
    /// rows keep their old width and are clipped at paint time.
    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        let height = height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        self.primary.resize(width, height);
        self.alt.resize(width, height);
        self.width = width;
        self.height = height;
        self.cursor.x = self.cursor.x.min(width - 1);
        self.cursor.y = self.cursor.y.min(height - 1);
        self.scroll_top = self.scroll_top.min(height - 1);
        self.scroll_bottom = self.scroll_bottom.min(height - 1);
        if self.scroll_top > self.scroll_bottom {
            self.scroll_top = 0;
            self.scroll_bottom = height - 1;
        }
        self.tabs.resize(width);
        self.wrap_pending = false;
    }

    /// Validate and apply an externally supplied cursor/scroll-region state.
    pub fn set_state(
        &mut self,
        x: usize,
        y: usize,
        scroll_top: usize,
        scroll_bottom: usize,
    ) -> Result<(), ConsoleError> {
        if x >= self.width || y >= self.height {
            return Err(ConsoleError::StateInvalid(format!(
                "cursor ({x},{y}) outside {}x{}",
                self.width, self.height
            )));
        }
        if scroll_top > scroll_bottom || scroll_bottom >= self.height {
            return Err(ConsoleError::StateInvalid(format!(
                "scroll region [{scroll_top},{scroll_bottom}] outside height {}",
                self.height
            )));
        }
        self.cursor.x = x;
        self.cursor.y = y;
        self.scroll_top = scroll_top;
        self.scroll_bottom = scroll_bottom;
        self.wrap_pending = false;
        Ok(())
    }

    // ----- scroll view ------------------------------------------------------

    pub fn is_scrolling(&self) -> bool {
        self.view.is_scrolling()
    }

    pub fn scroll_position(&self) -> usize {
        self.view.position()
    }

    pub fn view_enter(&mut self) {
        self.view.enter(self.scrollback.len());
        self.view_dirty = true;
    }

    pub fn view_exit(&mut self) {
        self.view.exit();
        self.screen_mut().mark_all_dirty();
        self.view_dirty = true;
    }

    pub fn view_up(&mut self, n: usize) {
        if !self.view.is_scrolling() {
            self.view_enter();
        }
        self.view.up(n);
        self.view_dirty = true;
    }

    pub fn view_down(&mut self, n: usize) {
        let len = self.scrollback.len();
        self.view.down(n, len);
        self.view_dirty = true;
    }

    pub fn view_to_top(&mut self) {
        if !self.view.is_scrolling() {
            self.view_enter();
        }
        self.view.to_top();
        self.view_dirty = true;
    }

    pub fn view_to_bottom(&mut self) {
        self.view.to_bottom(self.scrollback.len());
        self.view_dirty = true;
    }

    /// Compose the visible rows while scrolling: scrollback rows from the
    /// anchor, falling through to live primary rows past the end of history.
    pub fn view_rows(&self) -> Vec<Vec<Cell>> {
        let mut rows = Vec::with_capacity(self.height);
        let base = self.view.position();
        for i in 0..self.height {
            let idx = base + i;
            if let Some(row) = self.scrollback.row(idx) {
                rows.push(row.clone());
            } else {
                let live = idx - self.scrollback.len();
                if live < self.height {
                    rows.push(self.primary.row_snapshot(live));
                } else {
                    rows.push(Vec::new());
                }
            }
        }
        rows
    }

    // ----- render extraction ------------------------------------------------

    /// Extract everything the renderer needs and clear damage state. Returns
    /// `None` when nothing changed since the last call.
    pub fn take_render_snapshot(&mut self) -> Option<RenderSnapshot> {
        let scrolling = self.view.is_scrolling();
        let dirty = self.screen().is_dirty() || self.view_dirty;
        if !dirty && self.pending_events.is_empty() {
            return None;
        }

        let events = std::mem::take(&mut self.pending_events);
        let just_cleared = self.screen_mut().take_just_cleared();
        let full = just_cleared || scrolling || self.view_dirty;
        self.view_dirty = false;

        let rows = if scrolling {
            let width = self.width;
            self.view_rows()
                .into_iter()
                .enumerate()
                .map(|(y, mut cells)| {
                    // Scrollback rows may carry an older width; clip or pad.
                    cells.truncate(width);
                    cells.resize(width, Cell::default());
                    SnapRow {
                        y,
                        start_x: 0,
                        cells,
                    }
                })
                .collect()
        } else if full {
            (0..self.height)
                .map(|y| SnapRow {
                    y,
                    start_x: 0,
                    cells: self.screen().row(y).to_vec(),
                })
                .collect()
        } else {
            match self.screen().dirty_bounds() {
                None => Vec::new(),
                Some(b) => self
                    .screen()
                    .dirty_lines()
                    .iter()
                    .map(|&y| SnapRow {
                        y,
                        start_x: b.min_x,
                        cells: self.screen().row(y)[b.min_x..=b.max_x].to_vec(),
                    })
                    .collect(),
            }
        };

        self.screen_mut().clear_dirty();

        Some(RenderSnapshot {
            full,
            rows,
            cursor: (self.cursor.x, self.cursor.y),
            cursor_visible: self.modes.cursor_visible && !scrolling,
            scrolling,
            scroll_position: self.view.position(),
            scrollback_len: self.scrollback.len(),
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::color::Color;

    fn term(w: usize, h: usize) -> Terminal {
        Terminal::new(w, h, 1000, true)
    }

    fn feed(t: &mut Terminal, bytes: &[u8]) {
        t.process_output(bytes);
    }

    #[test]
    fn clear_screen_homes_and_captures_scrollback() {
        // Scenario: width 10, height 3, "hi" then ED 2 then CUP then "ok".
        let mut t = term(10, 3);
        feed(&mut t, b"hi\x1b[2J\x1b[Hok");

        assert_eq!(t.cursor_pos(), (2, 0));
        assert_eq!(t.screen().row_text(0), "ok        ");
        assert!(t.screen().is_row_blank(1));
        assert!(t.screen().is_row_blank(2));

        let last = t.scrollback.row(t.scrollback.len() - 1).unwrap();
        let text: String = last.iter().map(|c| c.ch).collect();
        assert_eq!(text, "hi        ", "cleared row lands in scrollback");
        assert_eq!(t.scroll_region(), (0, 2), "ED 2 resets the scroll region");
    }

    #[test]
    fn wrap_enabled_flows_to_next_row() {
        let mut t = term(5, 2);
        feed(&mut t, b"abcdefgh");
        assert_eq!(t.screen().row_text(0), "abcde");
        assert_eq!(t.screen().row_text(1), "fgh  ");
        assert_eq!(t.cursor_pos(), (3, 1));
    }

    #[test]
    fn wrap_disabled_drops_overflow() {
        let mut t = Terminal::new(5, 2, 1000, false);
        feed(&mut t, b"abcdefgh");
        assert_eq!(t.screen().row_text(0), "abcde");
        assert!(t.screen().is_row_blank(1));
        assert_eq!(t.cursor_pos(), (4, 0), "cursor clamps at the last column");
    }

    #[test]
    fn sgr_attributes_stick_to_cells() {
        let mut t = term(10, 2);
        feed(&mut t, b"\x1b[31mA\x1b[1;32mBC\x1b[0mD");

        let cell = |x: usize| *t.screen().cell(x, 0).unwrap();
        assert_eq!(cell(0).ch, 'A');
        assert_eq!(cell(0).attrs.fg, Color::Indexed(1), "A is red");

        assert_eq!(cell(1).ch, 'B');
        assert!(cell(1).attrs.flags.contains(CellAttrs::BOLD));
        assert_eq!(cell(1).attrs.fg, Color::Indexed(2));
        assert_eq!(cell(2).ch, 'C');
        assert!(cell(2).attrs.flags.contains(CellAttrs::BOLD));

        assert_eq!(cell(3).ch, 'D');
        assert_eq!(cell(3).attrs, Attrs::default(), "SGR 0 resets for D");
    }

    #[test]
    fn wide_char_takes_two_cells() {
        let mut t = term(4, 2);
        feed(&mut t, "中X".as_bytes());
        assert_eq!(t.screen().cell(0, 0).unwrap().ch, '中');
        assert_eq!(
            t.screen().cell(1, 0).unwrap().ch,
            WIDE_SPACER,
            "right half is the continuation marker"
        );
        assert_eq!(t.screen().cell(2, 0).unwrap().ch, 'X');
        assert_eq!(t.cursor_pos(), (3, 0));
    }

    #[test]
    fn wide_char_at_last_column_wraps_first() {
        let mut t = term(4, 2);
        feed(&mut t, b"abc");
        feed(&mut t, "中".as_bytes());
        assert_eq!(t.screen().row_text(0), "abc ", "no half-character at the edge");
        assert_eq!(t.screen().cell(0, 1).unwrap().ch, '中');
        assert_eq!(t.cursor_pos(), (2, 1));
    }

    #[test]
    fn newline_at_bottom_scrolls_into_scrollback() {
        let mut t = term(5, 2);
        feed(&mut t, b"one\r\ntwo\r\nthree");
        assert_eq!(t.screen().row_text(0), "two  ");
        assert_eq!(t.screen().row_text(1), "three");
        assert_eq!(t.scrollback_len(), 1);
        let captured: String = t.scrollback.row(0).unwrap().iter().map(|c| c.ch).collect();
        assert_eq!(captured, "one  ");
    }

    #[test]
    fn alt_screen_never_touches_scrollback() {
        let mut t = term(5, 2);
        feed(&mut t, b"\x1b[?1049h");
        assert!(t.is_alt_screen());
        feed(&mut t, b"a\r\nb\r\nc\r\nd");
        assert_eq!(t.scrollback_len(), 0, "alt screen scrolls are not captured");
        feed(&mut t, b"\x1b[?1049l");
        assert!(!t.is_alt_screen());
    }

    #[test]
    fn alt_screen_1049_round_trip_restores_primary() {
        let mut t = term(8, 3);
        feed(&mut t, b"main\x1b[2;3H");
        let before_cursor = t.cursor_pos();
        let before_row: String = t.screen().row_text(0);

        feed(&mut t, b"\x1b[?1049h");
        assert_eq!(t.cursor_pos(), (0, 0), "alt screen starts at home");
        feed(&mut t, b"ALTALT");
        feed(&mut t, b"\x1b[?1049l");

        assert_eq!(t.cursor_pos(), before_cursor, "cursor restored exactly");
        assert_eq!(t.screen().row_text(0), before_row, "primary content intact");
    }

    #[test]
    fn save_restore_is_identity_without_resize() {
        let mut t = term(20, 5);
        feed(&mut t, b"\x1b[3;7H\x1b[1;33m");
        let pos = t.cursor_pos();
        let attrs = t.attrs();

        feed(&mut t, b"\x1b7\x1b[H\x1b[0mmoved");
        feed(&mut t, b"\x1b8");

        assert_eq!(t.cursor_pos(), pos);
        assert_eq!(t.attrs(), attrs);
    }

    #[test]
    fn scroll_region_confines_scrolling() {
        let mut t = term(3, 5);
        for i in 0..5u8 {
            feed(&mut t, format!("\x1b[{};1H{}", i + 1, (b'A' + i) as char).as_bytes());
        }
        feed(&mut t, b"\x1b[2;4r");
        assert_eq!(t.scroll_region(), (1, 3));
        // Cursor homes after DECSTBM; move to region bottom and feed a newline.
        feed(&mut t, b"\x1b[4;1H\n");

        assert_eq!(t.screen().row_text(0), "A  ", "row above region unchanged");
        assert_eq!(t.screen().row_text(1), "C  ", "region content shifted up");
        assert_eq!(t.screen().row_text(4), "E  ", "row below region unchanged");
        assert_eq!(t.scrollback_len(), 0, "non-zero top never captures");
    }

    #[test]
    fn region_top_at_zero_captures() {
        let mut t = term(3, 4);
        feed(&mut t, b"X\x1b[1;2r\x1b[2;1H\n");
        assert_eq!(t.scrollback_len(), 1, "top=0 region scroll captures the row");
    }

    #[test]
    fn dsr_six_reports_one_based_position() {
        let mut t = term(20, 5);
        feed(&mut t, b"\x1b[3;7H\x1b[6n");
        let responses = t.take_pending_responses();
        assert_eq!(responses, vec![b"\x1b[3;7R".to_vec()]);
    }

    #[test]
    fn window_size_reports() {
        let mut t = term(80, 24);
        feed(&mut t, b"\x1b[18t\x1b[19t");
        let responses = t.take_pending_responses();
        assert_eq!(responses[0], b"\x1b[8;24;80t".to_vec());
        assert_eq!(responses[1], b"\x1b[9;24;80t".to_vec());
    }

    #[test]
    fn device_attributes_queue_responses() {
        let mut t = term(80, 24);
        feed(&mut t, b"\x1b[c\x1b[>c");
        let responses = t.take_pending_responses();
        assert_eq!(responses[0], b"\x1b[?62;1;2;6;7;8;9c".to_vec());
        assert_eq!(responses[1], b"\x1b[>1;10;0c".to_vec());
    }

    #[test]
    fn tab_advances_to_next_stop() {
        let mut t = term(20, 2);
        feed(&mut t, b"\tA");
        assert_eq!(t.cursor_pos(), (9, 0));
        assert_eq!(t.screen().cell(8, 0).unwrap().ch, 'A');
    }

    #[test]
    fn custom_tab_stops_via_hts_and_tbc() {
        let mut t = term(20, 2);
        feed(&mut t, b"\x1b[1;4H\x1bH\x1b[H\t");
        assert_eq!(t.cursor_pos(), (3, 0), "HTS stop at column 3 is honored");
        feed(&mut t, b"\x1b[0g\x1b[H\t");
        assert_eq!(t.cursor_pos(), (8, 0), "cleared stop falls through to default");
    }

    #[test]
    fn insert_and_delete_lines_respect_region() {
        let mut t = term(3, 4);
        for i in 0..4u8 {
            feed(&mut t, format!("\x1b[{};1H{}", i + 1, (b'a' + i) as char).as_bytes());
        }
        feed(&mut t, b"\x1b[2;1H\x1b[1L");
        assert!(t.screen().is_row_blank(1), "inserted line is blank");
        assert_eq!(t.screen().row_text(2), "b  ");

        feed(&mut t, b"\x1b[2;1H\x1b[1M");
        assert_eq!(t.screen().row_text(1), "b  ", "deleted line closes the gap");
    }

    #[test]
    fn mouse_mode_changes_emit_events() {
        let mut t = term(10, 4);
        feed(&mut t, b"\x1b[?1002h");
        assert_eq!(t.mouse_mode(), MouseMode::BtnEvent);
        let snap = t.take_render_snapshot().expect("events force a snapshot");
        assert!(snap
            .events
            .contains(&TerminalEvent::MouseModeChanged(MouseMode::BtnEvent)));

        feed(&mut t, b"\x1b[?1002l");
        assert_eq!(t.mouse_mode(), MouseMode::Off);
    }

    #[test]
    fn scroll_view_composes_history_and_live_rows() {
        let mut t = term(3, 2);
        feed(&mut t, b"a\r\nb\r\nc\r\nd");
        // Rows a, b scrolled into history; live shows c, d.
        assert_eq!(t.scrollback_len(), 2);

        t.view_up(10);
        assert!(t.is_scrolling());
        assert_eq!(t.scroll_position(), 0);
        let rows = t.view_rows();
        let text: Vec<String> = rows
            .iter()
            .map(|r| r.iter().map(|c| c.ch).collect())
            .collect();
        assert_eq!(text[0], "a  ");
        assert_eq!(text[1], "b  ");

        t.view_to_bottom();
        let rows = t.view_rows();
        let text: String = rows[0].iter().map(|c| c.ch).collect();
        assert_eq!(text, "c  ", "bottom anchor shows the live screen");

        t.view_exit();
        assert!(!t.is_scrolling());
    }

    #[test]
    fn resize_preserves_content_and_clamps() {
        let mut t = term(10, 4);
        feed(&mut t, b"hello\x1b[4;10H");
        t.resize(6, 2);
        assert_eq!(t.screen().row_text(0), "hello ");
        let (x, y) = t.cursor_pos();
        assert!(x < 6 && y < 2, "cursor clamped into new bounds");
        assert_eq!(t.scroll_region(), (0, 1));
    }

    #[test]
    fn set_state_rejects_out_of_bounds() {
        let mut t = term(10, 4);
        assert!(t.set_state(10, 0, 0, 3).is_err());
        assert!(t.set_state(0, 0, 3, 1).is_err());
        assert!(t.set_state(0, 0, 0, 4).is_err());
        let before = t.cursor_pos();
        let _ = t.set_state(20, 20, 5, 9);
        assert_eq!(t.cursor_pos(), before, "failed set_state must not mutate");
        assert!(t.set_state(3, 2, 1, 3).is_ok());
        assert_eq!(t.cursor_pos(), (3, 2));
    }

    #[test]
    fn reset_restores_defaults_but_keeps_scrollback() {
        let mut t = term(5, 2);
        feed(&mut t, b"a\r\nb\r\nc\x1b[?1002h\x1b[31m");
        let history = t.scrollback_len();
        assert!(history > 0);

        feed(&mut t, b"\x1bc");
        assert_eq!(t.cursor_pos(), (0, 0));
        assert_eq!(t.attrs(), Attrs::default());
        assert_eq!(t.mouse_mode(), MouseMode::Off);
        assert!(t.screen().is_row_blank(0));
        assert_eq!(t.scrollback_len(), history, "scrollback survives RIS");
    }

    #[test]
    fn render_snapshot_tracks_dirty_bounds() {
        let mut t = term(20, 5);
        feed(&mut t, b"\x1b[2;3Hxy");
        // Drain initial state.
        let snap = t.take_render_snapshot().expect("dirty after printing");
        assert!(!snap.full);
        assert_eq!(snap.rows.len(), 1);
        assert_eq!(snap.rows[0].y, 1);
        assert_eq!(snap.rows[0].start_x, 2);
        let text: String = snap.rows[0].cells.iter().map(|c| c.ch).collect();
        assert_eq!(text, "xy");

        assert!(
            t.take_render_snapshot().is_none(),
            "no damage after extraction"
        );
    }

    #[test]
    fn full_clear_forces_full_snapshot() {
        let mut t = term(10, 3);
        feed(&mut t, b"hi");
        let _ = t.take_render_snapshot();
        feed(&mut t, b"\x1b[2J");
        let snap = t.take_render_snapshot().expect("clear dirties the screen");
        assert!(snap.full, "just-cleared screens repaint fully once");
        assert_eq!(snap.rows.len(), 3);
    }

    #[test]
    fn cursor_stays_in_bounds_under_garbage() {
        let mut t = term(7, 3);
        let garbage: Vec<u8> = (0u16..2048).map(|i| (i * 31 % 251) as u8).collect();
        t.process_output(&garbage);
        let (x, y) = t.cursor_pos();
        assert!(x < 7, "cursor x within width after garbage");
        assert!(y < 3, "cursor y within height after garbage");
    }

    #[test]
    fn ed_three_erases_scrollback_only() {
        let mut t = term(5, 2);
        feed(&mut t, b"a\r\nb\r\nc");
        assert!(t.scrollback_len() > 0);
        let visible = t.screen().row_text(0);

        feed(&mut t, b"\x1b[3J");
        assert_eq!(t.scrollback_len(), 0, "history is gone");
        assert_eq!(t.screen().row_text(0), visible, "screen is untouched");
    }

    #[test]
    fn osc_title_is_stored() {
        let mut t = term(10, 3);
        feed(&mut t, b"\x1b]0;console\x07");
        assert_eq!(t.title(), "console");
    }
}
