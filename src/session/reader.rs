use std::io::ErrorKind;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::history::Direction;
use crate::transport::Transport as _;

use super::Shared;

/// Reader buffer size.
const BUF_SIZE: usize = 64 * 1024;
/// Flush kick period: with the transport read deadline at 100 ms, a
/// timed-out read doubles as the flush timer for any partially painted
/// frame.
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Reader task: pulls transport bytes into the engine, flushes queued
/// terminal responses back out, and signals the renderer.
pub(crate) fn run(shared: Shared, pause_rx: Receiver<bool>) {
    let mut buf = vec![0u8; BUF_SIZE];
    let mut flush_armed = false;

    while shared.is_running() {
        if matches!(pause_rx.try_recv(), Ok(true)) {
            wait_for_resume(&shared, &pause_rx);
            continue;
        }

        match shared.transport.read(&mut buf) {
            // Deadline expired with no data; fire the armed flush so a
            // partial frame cannot sit unpainted.
            Ok(0) => {
                if flush_armed {
                    shared.notify_render();
                    flush_armed = false;
                }
            }
            Ok(n) => {
                shared.stats.add_rx(n as u64);
                shared.history.lock().record(Direction::Rx, &buf[..n]);

                let responses = {
                    let mut term = shared.terminal.write();
                    term.process_output(&buf[..n]);
                    term.take_pending_responses()
                };
                for response in responses {
                    shared.write_transport_logged(&response);
                }

                shared.notify_render();
                flush_armed = true;
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                if flush_armed {
                    shared.notify_render();
                    flush_armed = false;
                }
            }
            Err(e) => {
                if !shared.is_running() {
                    break;
                }
                // Read failures do not end the session; the user may fix
                // the line and reconnect.
                tracing::warn!("transport read failed: {}", e);
                shared.status.lock().set_message(format!("read failed: {e}"));
                shared.notify_render();
                std::thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

/// Park until resumed, still honoring cancellation within one deadline.
fn wait_for_resume(shared: &Shared, pause_rx: &Receiver<bool>) {
    loop {
        match pause_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(false) => return,
            Ok(true) => {}
            Err(RecvTimeoutError::Timeout) => {
                if !shared.is_running() {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
