//! Decoding raw terminal input into key presses

/// A single key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Control chord, e.g. `Ctrl('c')`
    Ctrl(char),
    Tab,
    BackTab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Enter,
    Backspace,
    Esc,
    Unknown,
}

/// Decodes every key in `input`
///
/// One SSH data packet may carry several keys, or a pasted string.
///
/// ```
/// use sshfolio::tui::keys::{parse, Key};
///
/// assert_eq!(parse(b"j\x1b[B\x03"), [Key::Char('j'), Key::Down, Key::Ctrl('c')]);
/// ```
pub fn parse(input: &[u8]) -> Vec<Key> {
    let mut keys = Vec::new();
    let mut i = 0;

    while i < input.len() {
        let (key, len) = decode(&input[i..]);
        keys.push(key);
        i += len;
    }
    keys
}

/// Decodes the key at the start of `input`, returning it with its byte length
fn decode(input: &[u8]) -> (Key, usize) {
    match input[0] {
        0x1b => escape(input),
        b'\t' => (Key::Tab, 1),
        b'\r' | b'\n' => (Key::Enter, 1),
        0x7f | 0x08 => (Key::Backspace, 1),
        b @ 0x01..=0x1a => (Key::Ctrl(char::from(b'a' + b - 1)), 1),
        b if b < 0x80 => (Key::Char(char::from(b)), 1),
        b => utf8(input, b),
    }
}

fn escape(input: &[u8]) -> (Key, usize) {
    match input.get(1) {
        Some(b'[') | Some(b'O') => {}
        _ => return (Key::Esc, 1),
    }

    let Some(end) = input[2..].iter().position(|b| (0x40..=0x7e).contains(b)) else {
        return (Key::Unknown, input.len());
    };
    let params = &input[2..2 + end];
    let key = match (params, input[2 + end]) {
        (_, b'A') => Key::Up,
        (_, b'B') => Key::Down,
        (_, b'C') => Key::Right,
        (_, b'D') => Key::Left,
        (_, b'Z') => Key::BackTab,
        (b"5", b'~') => Key::PageUp,
        (b"6", b'~') => Key::PageDown,
        _ => Key::Unknown,
    };
    (key, end + 3)
}

fn utf8(input: &[u8], lead: u8) -> (Key, usize) {
    let len = match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return (Key::Unknown, 1),
    };
    let Some(bytes) = input.get(..len) else {
        return (Key::Unknown, input.len());
    };
    match std::str::from_utf8(bytes).ok().and_then(|s| s.chars().next()) {
        Some(ch) => (Key::Char(ch), len),
        None => (Key::Unknown, 1),
    }
}
