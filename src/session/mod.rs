mod events;
mod reader;
mod renderer;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::ConsoleConfig;
use crate::display::Display;
use crate::error::ConsoleError;
use crate::history::{Direction, HistoryBuffer};
use crate::input::ShortcutDispatcher;
use crate::terminal::Terminal;
use crate::transport::Transport;

/// Transport read deadline; a zero-byte read inside it is expected.
const READ_TIMEOUT: Duration = Duration::from_millis(100);
/// Bounded render-notification channel: a full channel means a repaint is
/// already scheduled and the extra signal is dropped.
const NOTIFY_CAPACITY: usize = 100;
/// How long `stop()` waits for the worker tasks before giving up.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(2);
/// Transient status-bar messages expire after this long.
const MESSAGE_TTL: Duration = Duration::from_secs(3);

/// Byte counters and lifecycle timestamps for one session.
#[derive(Debug, Default)]
pub struct SessionStats {
    tx_bytes: AtomicU64,
    rx_bytes: AtomicU64,
    connected_at: Mutex<Option<DateTime<Local>>>,
    disconnected_at: Mutex<Option<DateTime<Local>>>,
}

impl SessionStats {
    pub fn add_tx(&self, n: u64) {
        self.tx_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_rx(&self, n: u64) {
        self.rx_bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn tx_bytes(&self) -> u64 {
        self.tx_bytes.load(Ordering::Relaxed)
    }

    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes.load(Ordering::Relaxed)
    }

    pub fn mark_connected(&self) {
        *self.connected_at.lock() = Some(Local::now());
    }

    pub fn mark_disconnected(&self) {
        *self.disconnected_at.lock() = Some(Local::now());
    }

    pub fn connected_at(&self) -> Option<DateTime<Local>> {
        *self.connected_at.lock()
    }

    pub fn disconnected_at(&self) -> Option<DateTime<Local>> {
        *self.disconnected_at.lock()
    }
}

/// Transient status-bar message with expiry.
#[derive(Debug, Default)]
pub struct StatusLine {
    message: Option<(String, Instant)>,
}

impl StatusLine {
    pub fn set_message(&mut self, text: impl Into<String>) {
        self.message = Some((text.into(), Instant::now()));
    }

    pub fn current(&self) -> Option<&str> {
        match &self.message {
            Some((text, since)) if since.elapsed() < MESSAGE_TTL => Some(text),
            _ => None,
        }
    }
}

/// Everything the three pump tasks share. The engine sits behind one
/// reader-writer lock: the reader and UI-event tasks take write locks to
/// mutate, the renderer takes the write lock only to extract-and-clear its
/// snapshot and read locks otherwise.
#[derive(Clone)]
pub(crate) struct Shared {
    pub terminal: Arc<RwLock<Terminal>>,
    pub transport: Arc<dyn Transport>,
    pub display: Arc<dyn Display>,
    pub history: Arc<Mutex<HistoryBuffer>>,
    pub shortcuts: Arc<Mutex<ShortcutDispatcher>>,
    pub stats: Arc<SessionStats>,
    pub status: Arc<Mutex<StatusLine>>,
    pub running: Arc<AtomicBool>,
    pub paused: Arc<AtomicBool>,
    pub config: ConsoleConfig,
    pub notify_tx: Sender<()>,
}

impl Shared {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn notify_render(&self) {
        let _ = self.notify_tx.try_send(());
    }

    /// Write bytes to the transport with TX accounting and history capture.
    pub fn write_transport(&self, bytes: &[u8]) -> Result<(), ConsoleError> {
        let mut written = 0;
        while written < bytes.len() {
            let n = self.transport.write(&bytes[written..])?;
            if n == 0 {
                return Err(ConsoleError::Transport(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "transport wrote zero bytes",
                )));
            }
            written += n;
        }
        self.stats.add_tx(bytes.len() as u64);
        self.history.lock().record(Direction::Tx, bytes);
        Ok(())
    }

    /// Write from a worker task: failures are logged and shown on the
    /// status bar instead of tearing the session down.
    pub fn write_transport_logged(&self, bytes: &[u8]) {
        if let Err(e) = self.write_transport(bytes) {
            tracing::warn!("transport write failed: {}", e);
            self.status.lock().set_message(format!("write failed: {e}"));
            self.notify_render();
        }
    }
}

/// An interactive console session: the terminal engine plus the three
/// cooperating pump tasks over one transport and one display backend.
pub struct Session {
    id: Uuid,
    config: ConsoleConfig,
    terminal: Arc<RwLock<Terminal>>,
    transport: Arc<dyn Transport>,
    display: Arc<dyn Display>,
    history: Arc<Mutex<HistoryBuffer>>,
    shortcuts: Arc<Mutex<ShortcutDispatcher>>,
    stats: Arc<SessionStats>,
    status: Arc<Mutex<StatusLine>>,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    notify_tx: Sender<()>,
    notify_rx: Option<Receiver<()>>,
    pause_tx: Sender<bool>,
    pause_rx: Option<Receiver<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl Session {
    /// Build a session over the given capabilities. Dimensions of 0 in the
    /// config are detected from the display, reserving one row for the
    /// status bar.
    pub fn new(
        config: ConsoleConfig,
        transport: Arc<dyn Transport>,
        display: Arc<dyn Display>,
    ) -> Result<Self, ConsoleError> {
        let config = config.clamped();
        config.validate()?;

        let (disp_w, disp_h) = display.size();
        let width = if config.terminal_width == 0 {
            disp_w as usize
        } else {
            config.terminal_width as usize
        };
        let height = if config.terminal_height == 0 {
            (disp_h as usize).saturating_sub(1)
        } else {
            config.terminal_height as usize
        };

        let terminal = Terminal::new(
            width.max(2),
            height.max(2),
            config.scrollback_size,
            config.line_wrap,
        );

        let (notify_tx, notify_rx) = bounded(NOTIFY_CAPACITY);
        let (pause_tx, pause_rx) = unbounded();

        Ok(Self {
            id: Uuid::new_v4(),
            history: Arc::new(Mutex::new(HistoryBuffer::new(config.history_limit))),
            config,
            terminal: Arc::new(RwLock::new(terminal)),
            transport,
            display,
            shortcuts: Arc::new(Mutex::new(ShortcutDispatcher::new())),
            stats: Arc::new(SessionStats::default()),
            status: Arc::new(Mutex::new(StatusLine::default())),
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            notify_tx,
            notify_rx: Some(notify_rx),
            pause_tx,
            pause_rx: Some(pause_rx),
            handles: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn terminal(&self) -> Arc<RwLock<Terminal>> {
        Arc::clone(&self.terminal)
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    pub fn history(&self) -> Arc<Mutex<HistoryBuffer>> {
        Arc::clone(&self.history)
    }

    pub fn shortcuts(&self) -> Arc<Mutex<ShortcutDispatcher>> {
        Arc::clone(&self.shortcuts)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn shared(&self) -> Shared {
        Shared {
            terminal: Arc::clone(&self.terminal),
            transport: Arc::clone(&self.transport),
            display: Arc::clone(&self.display),
            history: Arc::clone(&self.history),
            shortcuts: Arc::clone(&self.shortcuts),
            stats: Arc::clone(&self.stats),
            status: Arc::clone(&self.status),
            running: Arc::clone(&self.running),
            paused: Arc::clone(&self.paused),
            config: self.config.clone(),
            notify_tx: self.notify_tx.clone(),
        }
    }

    /// Open the transport if needed, send any configured announcements,
    /// and spawn the reader, UI-event and renderer tasks.
    pub fn start(&mut self) -> Result<(), ConsoleError> {
        if self.is_running() {
            return Ok(());
        }
        self.transport.set_read_timeout(READ_TIMEOUT)?;
        if !self.transport.is_open() {
            self.transport.open()?;
        }

        let notify_rx = self
            .notify_rx
            .take()
            .ok_or_else(|| ConsoleError::StateInvalid("session already consumed".into()))?;
        let pause_rx = self
            .pause_rx
            .take()
            .ok_or_else(|| ConsoleError::StateInvalid("session already consumed".into()))?;
        self.stats.mark_connected();
        self.running.store(true, Ordering::Release);
        {
            self.terminal.write().set_running(true);
        }

        let shared = self.shared();
        if self.config.send_window_size_on_connect {
            let (w, h) = {
                let term = self.terminal.read();
                (term.width(), term.height())
            };
            shared.write_transport_logged(self.config.terminal_type.announcement());
            shared.write_transport_logged(format!("\x1b[8;{h};{w}t").as_bytes());
            shared.write_transport_logged(format!("\x1b]0;LINES={h};COLUMNS={w}\x07").as_bytes());
        }

        let short_id = self.id.simple().to_string()[..8].to_string();

        let reader = std::thread::Builder::new()
            .name(format!("squall-reader-{short_id}"))
            .spawn({
                let shared = self.shared();
                move || reader::run(shared, pause_rx)
            })?;

        let events = std::thread::Builder::new()
            .name(format!("squall-events-{short_id}"))
            .spawn({
                let shared = self.shared();
                move || events::run(shared)
            })?;

        let render = std::thread::Builder::new()
            .name(format!("squall-render-{short_id}"))
            .spawn({
                let shared = self.shared();
                move || renderer::run(shared, notify_rx)
            })?;

        self.handles = vec![reader, events, render];
        self.notify_render();
        Ok(())
    }

    /// Write input bytes to the transport. Errors bubble up to the caller.
    pub fn write_input(&self, bytes: &[u8]) -> Result<(), ConsoleError> {
        self.shared().write_transport(bytes)
    }

    /// Close and reopen the transport after a line failure. Read errors do
    /// not end the session, so this can be wired to a shortcut.
    pub fn reconnect(&self) -> Result<(), ConsoleError> {
        self.transport.close();
        match self.transport.open() {
            Ok(()) => {
                self.status.lock().set_message("reconnected");
                self.notify_render();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("reconnect failed: {}", e);
                self.status.lock().set_message(format!("reconnect failed: {e}"));
                self.notify_render();
                Err(ConsoleError::Transport(e))
            }
        }
    }

    /// Suspend the reader task; buffered transport data stays in the OS.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        let _ = self.pause_tx.send(true);
        self.notify_render();
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        let _ = self.pause_tx.send(false);
        self.notify_render();
    }

    /// Show a transient message on the status bar.
    pub fn set_status_message(&self, text: impl Into<String>) {
        self.status.lock().set_message(text);
        self.notify_render();
    }

    fn notify_render(&self) {
        let _ = self.notify_tx.try_send(());
    }

    /// Cooperative shutdown: stop the tasks, close the transport, wake the
    /// event poller, wait up to two seconds, finalise the display.
    pub fn stop(&mut self) {
        if !self.is_running() && self.handles.is_empty() {
            return;
        }
        self.running.store(false, Ordering::Release);
        {
            self.terminal.write().set_running(false);
        }
        self.transport.close();
        // Wake a poller blocked in poll_event with a synthetic resize.
        let (w, h) = self.display.size();
        self.display.post_event(crate::display::Event::Resize {
            width: w,
            height: h,
        });
        self.notify_render();

        let deadline = Instant::now() + SHUTDOWN_WAIT;
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(10));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::warn!("task {} did not stop within {:?}", name, SHUTDOWN_WAIT);
            }
        }

        self.stats.mark_disconnected();
        self.display.fini();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}
