use thiserror::Error;

/// Error taxonomy for the console core. Parser-level problems never surface
/// here: the parser resets to ground and the stream continues.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Read or write failure on the serial transport. Not fatal in the
    /// reader path; surfaced to the caller on writes.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// Configuration rejected before startup.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Out-of-bounds state supplied to `set_state`; nothing was mutated.
    #[error("invalid terminal state: {0}")]
    StateInvalid(String),

    /// A bounded buffer trimmed its oldest entries. Non-fatal.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
}
