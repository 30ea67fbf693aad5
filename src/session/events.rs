use crate::display::{Display as _, Event};
use crate::input::{translate_key, MouseEncoder};

use super::Shared;

/// UI-event task: blocks on the display backend's event source and
/// dispatches keys through the shortcut dispatcher and translator, mouse
/// events through the stateful encoder (gated on the engine's mouse mode),
/// and resizes into the engine. Shutdown wakes the poll with a synthetic
/// resize posted by `Session::stop`.
pub(crate) fn run(shared: Shared) {
    let mut mouse = MouseEncoder::new();

    while shared.is_running() {
        let Some(event) = shared.display.poll_event() else {
            break;
        };
        if !shared.is_running() {
            break;
        }

        match event {
            Event::Key { key, ch, mods } => {
                let handled = shared.shortcuts.lock().process(key, ch, mods);
                match handled {
                    Some(Ok(())) => continue,
                    Some(Err(e)) => {
                        tracing::warn!("shortcut handler failed: {}", e);
                        shared.status.lock().set_message(format!("{e}"));
                        shared.notify_render();
                        continue;
                    }
                    None => {}
                }

                let cursor_app = shared.terminal.read().modes().cursor_keys_application;
                if let Some(bytes) = translate_key(key, ch, mods, cursor_app) {
                    shared.write_transport_logged(&bytes);
                }
            }
            Event::Mouse { x, y, buttons } => {
                let mode = shared.terminal.read().mouse_mode();
                if mode.is_off() {
                    continue;
                }
                let bytes = mouse.encode(mode, x, y, buttons);
                if !bytes.is_empty() {
                    shared.write_transport_logged(&bytes);
                }
            }
            Event::Resize { width, height } => {
                if width == 0 || height == 0 {
                    // Synthetic wake-up event.
                    continue;
                }
                // One display row is reserved for the status bar.
                let (w, h) = (width as usize, (height as usize).saturating_sub(1).max(1));
                shared.terminal.write().resize(w, h);
                if shared.config.send_window_size_on_resize {
                    shared.write_transport_logged(format!("\x1b[8;{h};{w}t").as_bytes());
                }
                shared.notify_render();
            }
        }
    }
}
