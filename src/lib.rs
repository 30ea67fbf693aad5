pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod input;
pub mod session;
pub mod terminal;
pub mod transport;

pub use config::{ConsoleConfig, TerminalType};
pub use display::{ButtonMask, Display, Event, Key, Modifiers};
pub use error::ConsoleError;
pub use history::{Direction, HistoryBuffer};
pub use input::{MouseEncoder, ShortcutDispatcher};
pub use session::{Session, SessionStats};
pub use terminal::{MouseMode, Terminal};
pub use transport::Transport;

/// Initialise tracing for host applications. Filter defaults to
/// `squall=info`; override with `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "squall=info".into()),
        )
        .init();
}
