use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::display::Display as _;
use crate::transport::Transport as _;
use crate::terminal::cursor::{Attrs, CellAttrs};
use crate::terminal::screen::WIDE_SPACER;
use crate::terminal::TerminalEvent;

use super::Shared;

/// Frame pacing: at most ~60 paints per second.
const FRAME_TICK: Duration = Duration::from_millis(16);
/// A pending update older than this forces a paint regardless of pacing.
const FORCE_AFTER: Duration = Duration::from_millis(20);
/// Drain the notification queue once it backs up past this.
const DRAIN_THRESHOLD: usize = 50;
/// Safety clamp on paints per second.
const MAX_PAINTS_PER_SECOND: u32 = 100;

/// Renderer task: coalesces update notifications into rate-limited paints
/// of the dirty region (or the whole screen after a full erase), overlays
/// the status bar, and repositions the cursor.
pub(crate) fn run(shared: Shared, notify_rx: Receiver<()>) {
    let mut pending = false;
    let mut pending_since: Option<Instant> = None;
    let mut last_paint = Instant::now() - FRAME_TICK;
    let mut paints_this_second = 0u32;
    let mut second_start = Instant::now();

    while shared.is_running() {
        match notify_rx.recv_timeout(FRAME_TICK) {
            Ok(()) => {
                pending = true;
                pending_since.get_or_insert_with(Instant::now);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if !shared.is_running() {
            break;
        }

        // Collapse bursts: everything queued becomes one repaint.
        if notify_rx.len() > DRAIN_THRESHOLD {
            while notify_rx.try_recv().is_ok() {}
        }

        if second_start.elapsed() >= Duration::from_secs(1) {
            second_start = Instant::now();
            paints_this_second = 0;
        }

        let overdue = pending_since.map_or(false, |t| t.elapsed() > FORCE_AFTER);
        let due = last_paint.elapsed() >= FRAME_TICK;
        if pending && (due || overdue) {
            if paints_this_second >= MAX_PAINTS_PER_SECOND {
                continue;
            }
            paint(&shared);
            pending = false;
            pending_since = None;
            last_paint = Instant::now();
            paints_this_second += 1;
        }
    }

    // Final drain so damage accumulated during shutdown is not lost.
    paint(&shared);
}

fn paint(shared: &Shared) {
    let snapshot = shared.terminal.write().take_render_snapshot();

    if let Some(snap) = &snapshot {
        for event in &snap.events {
            apply_event(shared, event);
        }
        if snap.full {
            shared.display.clear();
        }
        for row in &snap.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                if cell.ch == WIDE_SPACER {
                    continue;
                }
                shared
                    .display
                    .set_content((row.start_x + i) as u16, row.y as u16, cell.ch, cell.attrs);
            }
        }
    }

    paint_status(shared);

    let (cursor, visible) = {
        let term = shared.terminal.read();
        (
            term.cursor_pos(),
            term.modes().cursor_visible && !term.is_scrolling(),
        )
    };
    if visible {
        shared.display.show_cursor(cursor.0 as u16, cursor.1 as u16);
    } else {
        shared.display.hide_cursor();
    }

    shared.display.show();
}

fn apply_event(shared: &Shared, event: &TerminalEvent) {
    match event {
        TerminalEvent::MouseModeChanged(mode) => {
            // The config gate wins over the engine's request.
            if shared.config.enable_mouse && !mode.is_off() {
                shared.display.enable_mouse();
            } else {
                shared.display.disable_mouse();
            }
        }
        TerminalEvent::TitleChanged(title) => {
            tracing::debug!(title = %title, "terminal title changed");
        }
        TerminalEvent::Bell => {
            tracing::debug!("bell");
        }
        TerminalEvent::AltScreenEntered | TerminalEvent::AltScreenExited => {}
    }
}

/// One status row at the bottom of the display: connection identity on the
/// left, mode/scroll/pause hints (or a transient message) in the center,
/// TX/RX counters on the right. Rendered in reverse video.
fn paint_status(shared: &Shared) {
    let (disp_w, disp_h) = shared.display.size();
    if disp_h == 0 {
        return;
    }
    let row = disp_h - 1;
    let width = disp_w as usize;

    let left = shared.transport.describe();
    let right = format!(
        "TX:{} RX:{}",
        shared.stats.tx_bytes(),
        shared.stats.rx_bytes()
    );
    let center = {
        let status = shared.status.lock();
        if let Some(message) = status.current() {
            message.to_string()
        } else {
            let term = shared.terminal.read();
            let mut parts: Vec<String> = Vec::new();
            if shared.paused.load(std::sync::atomic::Ordering::Acquire) {
                parts.push("PAUSED".into());
            }
            if term.is_scrolling() {
                parts.push(format!(
                    "SCROLL {}/{}",
                    term.scroll_position(),
                    term.scrollback_len()
                ));
            }
            if !term.mouse_mode().is_off() {
                parts.push("MOUSE".into());
            }
            if term.modes().cursor_keys_application {
                parts.push("APP".into());
            }
            parts.join(" ")
        }
    };

    let mut line = vec![' '; width];
    overlay(&mut line, 0, &left);
    let right_chars: Vec<char> = right.chars().collect();
    overlay(&mut line, width.saturating_sub(right_chars.len()), &right);
    let center_chars = center.chars().count();
    overlay(&mut line, width.saturating_sub(center_chars) / 2, &center);

    let style = Attrs {
        flags: CellAttrs::REVERSE,
        ..Attrs::default()
    };
    for (x, ch) in line.into_iter().enumerate() {
        shared.display.set_content(x as u16, row, ch, style);
    }
}

fn overlay(line: &mut [char], start: usize, text: &str) {
    for (i, ch) in text.chars().enumerate() {
        if let Some(slot) = line.get_mut(start + i) {
            *slot = ch;
        }
    }
}
