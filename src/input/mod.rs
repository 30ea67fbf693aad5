pub mod keys;
pub mod mouse;
pub mod shortcuts;

pub use keys::translate_key;
pub use mouse::MouseEncoder;
pub use shortcuts::{ShortcutDispatcher, ShortcutHandler};
