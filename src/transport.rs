use std::io;
use std::time::Duration;

/// The serial transport capability the core consumes. Serial lines are
/// full duplex, so reads (reader task) and writes (UI-event task) may run
/// concurrently: methods take `&self` and implementations synchronise
/// internally, the way a cloned port handle would.
///
/// A read that hits its deadline returns `Ok(0)`; timeouts are expected,
/// not errors.
pub trait Transport: Send + Sync {
    fn open(&self) -> io::Result<()>;
    fn close(&self);
    fn is_open(&self) -> bool;

    /// Read available bytes, waiting at most the configured timeout.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    fn set_read_timeout(&self, timeout: Duration) -> io::Result<()>;

    /// Human-readable connection identity for the status bar
    /// (e.g. "/dev/ttyUSB0 115200 8N1").
    fn describe(&self) -> String;
}
