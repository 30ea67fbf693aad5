use crate::display::{Key, Modifiers};
use crate::error::ConsoleError;

pub type ShortcutHandler = Box<dyn FnMut() -> Result<(), ConsoleError> + Send>;

/// One named binding: a key (or rune) plus exact modifiers, a handler, and
/// an enabled flag.
pub struct Shortcut {
    pub key: Key,
    pub ch: char,
    pub mods: Modifiers,
    pub enabled: bool,
    handler: ShortcutHandler,
}

/// App-level key bindings checked before terminal key translation. Entries
/// are matched in registration order, so dispatch is deterministic; the
/// first match runs and short-circuits.
#[derive(Default)]
pub struct ShortcutDispatcher {
    entries: Vec<(String, Shortcut)>,
}

impl ShortcutDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a binding under `name`.
    pub fn register(
        &mut self,
        name: &str,
        key: Key,
        ch: char,
        mods: Modifiers,
        handler: ShortcutHandler,
    ) {
        let shortcut = Shortcut {
            key,
            ch,
            mods,
            enabled: true,
            handler,
        };
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = shortcut;
        } else {
            self.entries.push((name.to_string(), shortcut));
        }
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if let Some((_, s)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            s.enabled = enabled;
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Run the first matching enabled shortcut. Returns `None` when nothing
    /// matched, otherwise the handler's result.
    pub fn process(
        &mut self,
        key: Key,
        ch: char,
        mods: Modifiers,
    ) -> Option<Result<(), ConsoleError>> {
        for (_, shortcut) in &mut self.entries {
            if !shortcut.enabled || shortcut.mods != mods {
                continue;
            }
            let matches = if shortcut.key.is_rune() {
                key.is_rune() && shortcut.ch == ch
            } else {
                shortcut.key == key
            };
            if matches {
                return Some((shortcut.handler)());
            }
        }
        None
    }
}
