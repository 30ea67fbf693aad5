use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;
use crate::terminal::scrollback::{MAX_SCROLLBACK, MIN_SCROLLBACK, DEFAULT_SCROLLBACK};

/// Terminal type announced to the remote end on connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TerminalType {
    #[default]
    Xterm,
    Vt100,
}

impl TerminalType {
    /// Device-attributes style identity string sent on connect.
    pub fn announcement(self) -> &'static [u8] {
        match self {
            TerminalType::Xterm => b"\x1b[?62;c",
            TerminalType::Vt100 => b"\x1b[?1;2c",
        }
    }
}

/// Console configuration, loaded from the user config dir or built in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Terminal columns; 0 means detect from the display backend.
    pub terminal_width: u16,
    /// Terminal rows; 0 means detect from the display backend.
    pub terminal_height: u16,
    /// Scrollback capacity in lines, clamped to 100..=1,000,000.
    pub scrollback_size: usize,
    pub line_wrap: bool,
    /// Gates display-backend mouse enabling even when the remote end
    /// requests a reporting mode.
    pub enable_mouse: bool,
    pub send_window_size_on_connect: bool,
    pub send_window_size_on_resize: bool,
    pub terminal_type: TerminalType,
    /// History capture capacity in chunks.
    pub history_limit: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            terminal_width: 0,
            terminal_height: 0,
            scrollback_size: DEFAULT_SCROLLBACK,
            line_wrap: true,
            enable_mouse: true,
            send_window_size_on_connect: false,
            send_window_size_on_resize: false,
            terminal_type: TerminalType::Xterm,
            history_limit: 10_000,
        }
    }
}

impl ConsoleConfig {
    /// Clamp numeric fields into their legal ranges.
    pub fn clamped(mut self) -> Self {
        self.scrollback_size = self.scrollback_size.clamp(MIN_SCROLLBACK, MAX_SCROLLBACK);
        self.history_limit = self.history_limit.max(1);
        self
    }

    /// Reject configurations before startup. Zero dimensions mean detect;
    /// explicit dimensions must leave room for a usable grid.
    pub fn validate(&self) -> Result<(), ConsoleError> {
        if self.terminal_width == 1 {
            return Err(ConsoleError::ConfigInvalid(
                "terminal_width must be 0 (detect) or at least 2".into(),
            ));
        }
        if self.terminal_height == 1 {
            return Err(ConsoleError::ConfigInvalid(
                "terminal_height must be 0 (detect) or at least 2".into(),
            ));
        }
        Ok(())
    }

    /// Load from the standard config path, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<ConsoleConfig>(&content) {
                    Ok(config) => return config.clamped(),
                    Err(e) => {
                        tracing::warn!("Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save to the standard config path.
    pub fn save(&self) -> Result<(), ConsoleError> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConsoleError::ConfigInvalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("squall")
        .join("config.json")
}
