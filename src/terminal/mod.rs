pub mod action;
pub mod color;
pub mod cursor;
pub mod engine;
pub mod modes;
pub mod parser;
pub mod screen;
pub mod scrollback;
pub mod tabs;
pub mod utf8;

pub use engine::{RenderSnapshot, Terminal, TerminalEvent};
pub use modes::{MouseMode, TerminalModes};
