use crate::display::{Key, Modifiers};

/// Translate a UI key event into the xterm byte sequence the remote end
/// expects. `cursor_app` is the DECCKM application-mode flag. Returns
/// `None` for events with no wire representation.
pub fn translate_key(key: Key, ch: char, mods: Modifiers, cursor_app: bool) -> Option<Vec<u8>> {
    match key {
        Key::Enter => Some(vec![0x0D]),
        Key::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                Some(b"\x1b[Z".to_vec())
            } else {
                Some(vec![0x09])
            }
        }
        Key::Backspace => {
            if mods.contains(Modifiers::ALT) {
                Some(vec![0x1B, 0x7F])
            } else {
                Some(vec![0x7F])
            }
        }
        Key::Delete => Some(b"\x1b[3~".to_vec()),
        Key::Insert => Some(b"\x1b[2~".to_vec()),
        Key::Escape => Some(vec![0x1B]),
        Key::Up => Some(arrow(b'A', mods, cursor_app)),
        Key::Down => Some(arrow(b'B', mods, cursor_app)),
        Key::Right => Some(arrow(b'C', mods, cursor_app)),
        Key::Left => Some(arrow(b'D', mods, cursor_app)),
        Key::Home => Some(home_end(b'H', cursor_app)),
        Key::End => Some(home_end(b'F', cursor_app)),
        Key::PageUp => Some(b"\x1b[5~".to_vec()),
        Key::PageDown => Some(b"\x1b[6~".to_vec()),
        Key::F(n) => function_key(n, mods),
        Key::Rune => rune(ch, mods),
    }
}

fn arrow(letter: u8, mods: Modifiers, cursor_app: bool) -> Vec<u8> {
    if mods.is_empty() {
        if cursor_app {
            vec![0x1B, b'O', letter]
        } else {
            vec![0x1B, b'[', letter]
        }
    } else {
        format!("\x1b[1;{}{}", mods.xterm_param(), letter as char).into_bytes()
    }
}

fn home_end(letter: u8, cursor_app: bool) -> Vec<u8> {
    if cursor_app {
        vec![0x1B, b'O', letter]
    } else {
        vec![0x1B, b'[', letter]
    }
}

fn function_key(n: u8, mods: Modifiers) -> Option<Vec<u8>> {
    match n {
        1..=4 => {
            let letter = b"PQRS"[n as usize - 1] as char;
            if mods.is_empty() {
                Some(format!("\x1bO{letter}").into_bytes())
            } else {
                Some(format!("\x1b[1;{}{letter}", mods.xterm_param()).into_bytes())
            }
        }
        5..=12 => {
            let code = [15, 17, 18, 19, 20, 21, 23, 24][n as usize - 5];
            if mods.is_empty() {
                Some(format!("\x1b[{code}~").into_bytes())
            } else {
                Some(format!("\x1b[{code};{}~", mods.xterm_param()).into_bytes())
            }
        }
        _ => None,
    }
}

fn rune(ch: char, mods: Modifiers) -> Option<Vec<u8>> {
    let mut bytes = if mods.contains(Modifiers::CTRL) {
        match ctrl_byte(ch) {
            Some(b) => vec![b],
            None => encode_scalar(ch),
        }
    } else {
        encode_scalar(ch)
    };
    if mods.contains(Modifiers::ALT) {
        bytes.insert(0, 0x1B);
    }
    Some(bytes)
}

/// C0 composition for Ctrl combinations: letters map to 0x01-0x1A, space to
/// NUL, and the `\ ] ^ _` column to 0x1C-0x1F.
fn ctrl_byte(ch: char) -> Option<u8> {
    match ch {
        ' ' => Some(0x00),
        'a'..='z' => Some(ch as u8 - b'a' + 1),
        'A'..='Z' => Some(ch as u8 - b'A' + 1),
        '\\' => Some(0x1C),
        ']' => Some(0x1D),
        '^' => Some(0x1E),
        '_' => Some(0x1F),
        _ => None,
    }
}

fn encode_scalar(ch: char) -> Vec<u8> {
    let mut buf = [0u8; 4];
    ch.encode_utf8(&mut buf).as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: Key, ch: char, mods: Modifiers, app: bool) -> Vec<u8> {
        translate_key(k, ch, mods, app).expect("key should translate")
    }

    #[test]
    fn basic_editing_keys() {
        assert_eq!(key(Key::Enter, '\0', Modifiers::empty(), false), vec![0x0D]);
        assert_eq!(key(Key::Tab, '\0', Modifiers::empty(), false), vec![0x09]);
        assert_eq!(key(Key::Tab, '\0', Modifiers::SHIFT, false), b"\x1b[Z");
        assert_eq!(key(Key::Backspace, '\0', Modifiers::empty(), false), vec![0x7F]);
        assert_eq!(
            key(Key::Backspace, '\0', Modifiers::ALT, false),
            vec![0x1B, 0x7F]
        );
        assert_eq!(key(Key::Delete, '\0', Modifiers::empty(), false), b"\x1b[3~");
        assert_eq!(key(Key::Insert, '\0', Modifiers::empty(), false), b"\x1b[2~");
        assert_eq!(key(Key::Escape, '\0', Modifiers::empty(), false), vec![0x1B]);
    }

    #[test]
    fn arrows_switch_on_application_mode() {
        assert_eq!(key(Key::Up, '\0', Modifiers::empty(), false), b"\x1b[A");
        assert_eq!(key(Key::Up, '\0', Modifiers::empty(), true), b"\x1bOA");
        assert_eq!(key(Key::Left, '\0', Modifiers::empty(), false), b"\x1b[D");
        assert_eq!(key(Key::Left, '\0', Modifiers::empty(), true), b"\x1bOD");
    }

    #[test]
    fn modified_arrows_carry_the_parameter() {
        assert_eq!(key(Key::Up, '\0', Modifiers::SHIFT, false), b"\x1b[1;2A");
        assert_eq!(
            key(Key::Right, '\0', Modifiers::CTRL | Modifiers::ALT, true),
            b"\x1b[1;7C",
            "modifiers win over application mode"
        );
    }

    #[test]
    fn home_end_and_paging() {
        assert_eq!(key(Key::Home, '\0', Modifiers::empty(), false), b"\x1b[H");
        assert_eq!(key(Key::End, '\0', Modifiers::empty(), true), b"\x1bOF");
        assert_eq!(key(Key::PageUp, '\0', Modifiers::empty(), false), b"\x1b[5~");
        assert_eq!(key(Key::PageDown, '\0', Modifiers::empty(), false), b"\x1b[6~");
    }

    #[test]
    fn function_keys() {
        assert_eq!(key(Key::F(1), '\0', Modifiers::empty(), false), b"\x1bOP");
        assert_eq!(key(Key::F(4), '\0', Modifiers::empty(), false), b"\x1bOS");
        assert_eq!(key(Key::F(5), '\0', Modifiers::empty(), false), b"\x1b[15~");
        assert_eq!(key(Key::F(12), '\0', Modifiers::empty(), false), b"\x1b[24~");
        assert_eq!(key(Key::F(2), '\0', Modifiers::SHIFT, false), b"\x1b[1;2Q");
        assert_eq!(key(Key::F(7), '\0', Modifiers::CTRL, false), b"\x1b[18;5~");
    }

    #[test]
    fn ctrl_composition() {
        assert_eq!(key(Key::Rune, 'a', Modifiers::CTRL, false), vec![0x01]);
        assert_eq!(key(Key::Rune, 'Z', Modifiers::CTRL, false), vec![0x1A]);
        assert_eq!(key(Key::Rune, ' ', Modifiers::CTRL, false), vec![0x00]);
        assert_eq!(key(Key::Rune, '\\', Modifiers::CTRL, false), vec![0x1C]);
        assert_eq!(key(Key::Rune, ']', Modifiers::CTRL, false), vec![0x1D]);
        assert_eq!(key(Key::Rune, '^', Modifiers::CTRL, false), vec![0x1E]);
        assert_eq!(key(Key::Rune, '_', Modifiers::CTRL, false), vec![0x1F]);
    }

    #[test]
    fn alt_prefixes_escape() {
        assert_eq!(key(Key::Rune, 'x', Modifiers::ALT, false), vec![0x1B, b'x']);
        assert_eq!(
            key(Key::Rune, 'c', Modifiers::ALT | Modifiers::CTRL, false),
            vec![0x1B, 0x03],
            "Ctrl composes first, Alt wraps"
        );
    }

    #[test]
    fn plain_runes_encode_utf8() {
        assert_eq!(key(Key::Rune, 'q', Modifiers::empty(), false), vec![b'q']);
        assert_eq!(
            key(Key::Rune, 'é', Modifiers::empty(), false),
            "é".as_bytes().to_vec()
        );
        assert_eq!(
            key(Key::Rune, '中', Modifiers::empty(), false),
            "中".as_bytes().to_vec()
        );
    }
}
