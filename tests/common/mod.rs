use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use squall::display::{Display, Event};
use squall::terminal::cursor::Attrs;
use squall::transport::Transport;

/// In-memory transport: tests feed bytes for the session to read and
/// inspect everything the session wrote.
pub struct MockTransport {
    incoming: Mutex<VecDeque<u8>>,
    written: Mutex<Vec<u8>>,
    open: AtomicBool,
    timeout: Mutex<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            incoming: Mutex::new(VecDeque::new()),
            written: Mutex::new(Vec::new()),
            open: AtomicBool::new(false),
            timeout: Mutex::new(Duration::from_millis(5)),
        }
    }

    pub fn feed(&self, bytes: &[u8]) {
        self.incoming.lock().extend(bytes.iter().copied());
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().clone()
    }

    pub fn clear_written(&self) {
        self.written.lock().clear();
    }
}

impl Transport for MockTransport {
    fn open(&self) -> io::Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        {
            let mut incoming = self.incoming.lock();
            if !incoming.is_empty() {
                let n = buf.len().min(incoming.len());
                for slot in buf.iter_mut().take(n) {
                    *slot = incoming.pop_front().unwrap();
                }
                return Ok(n);
            }
        }
        // Simulate the read deadline with a short sleep.
        std::thread::sleep(*self.timeout.lock());
        Ok(0)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()> {
        // Keep the simulated deadline short so tests stay fast.
        *self.timeout.lock() = timeout.min(Duration::from_millis(5));
        Ok(())
    }

    fn describe(&self) -> String {
        "mock:9600".to_string()
    }
}

/// In-memory display surface plus an injectable event queue.
pub struct MockDisplay {
    width: u16,
    height: u16,
    cells: Mutex<Vec<(char, Attrs)>>,
    cursor: Mutex<Option<(u16, u16)>>,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
    mouse_enabled: AtomicBool,
    finished: AtomicBool,
}

impl MockDisplay {
    pub fn new(width: u16, height: u16) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            width,
            height,
            cells: Mutex::new(vec![(' ', Attrs::default()); width as usize * height as usize]),
            cursor: Mutex::new(None),
            events_tx,
            events_rx,
            mouse_enabled: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    pub fn inject(&self, event: Event) {
        let _ = self.events_tx.send(event);
    }

    pub fn row_text(&self, y: u16) -> String {
        let cells = self.cells.lock();
        (0..self.width)
            .map(|x| cells[(y as usize * self.width as usize) + x as usize].0)
            .collect()
    }

    pub fn cursor(&self) -> Option<(u16, u16)> {
        *self.cursor.lock()
    }

    pub fn mouse_enabled(&self) -> bool {
        self.mouse_enabled.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Display for MockDisplay {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn set_content(&self, x: u16, y: u16, ch: char, style: Attrs) {
        if x < self.width && y < self.height {
            self.cells.lock()[(y as usize * self.width as usize) + x as usize] = (ch, style);
        }
    }

    fn show_cursor(&self, x: u16, y: u16) {
        *self.cursor.lock() = Some((x, y));
    }

    fn hide_cursor(&self) {
        *self.cursor.lock() = None;
    }

    fn poll_event(&self) -> Option<Event> {
        if self.finished.load(Ordering::SeqCst) {
            return None;
        }
        self.events_rx.recv().ok()
    }

    fn post_event(&self, event: Event) {
        let _ = self.events_tx.send(event);
    }

    fn enable_mouse(&self) {
        self.mouse_enabled.store(true, Ordering::SeqCst);
    }

    fn disable_mouse(&self) {
        self.mouse_enabled.store(false, Ordering::SeqCst);
    }

    fn clear(&self) {
        let mut cells = self.cells.lock();
        for cell in cells.iter_mut() {
            *cell = (' ', Attrs::default());
        }
    }

    fn show(&self) {}

    fn fini(&self) {
        self.finished.store(true, Ordering::SeqCst);
        // Wake any blocked poller.
        let _ = self.events_tx.send(Event::Resize {
            width: 0,
            height: 0,
        });
    }
}
