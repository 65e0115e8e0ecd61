//! Width-aware helpers for strings that may carry ANSI escape sequences
//!
//! Every non-escape `char` counts as one column.

use super::styles::RESET;

const ESC: char = '\x1b';

/// Splits `s` into visible chars and escape sequences
fn segments(s: &str) -> impl Iterator<Item = Segment<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let ch = rest.chars().next()?;
        if ch == ESC {
            let len = escape_len(rest);
            let (seq, tail) = rest.split_at(len);
            rest = tail;
            Some(Segment::Escape(seq))
        } else {
            let (visible, tail) = rest.split_at(ch.len_utf8());
            rest = tail;
            Some(Segment::Visible(visible))
        }
    })
}

enum Segment<'a> {
    Visible(&'a str),
    Escape(&'a str),
}

/// Byte length of the escape sequence at the start of `s`
fn escape_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes.get(1) != Some(&b'[') {
        return 1;
    }
    bytes[2..]
        .iter()
        .position(|b| (0x40..=0x7e).contains(b))
        .map_or(bytes.len(), |end| end + 3)
}

/// Number of terminal columns `s` occupies
pub fn visible_width(s: &str) -> usize {
    segments(s)
        .filter(|seg| matches!(seg, Segment::Visible(_)))
        .count()
}

/// Cuts `s` down to `width` columns, keeping escape sequences intact
pub fn truncate(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut used = 0;
    let mut styled = false;

    for seg in segments(s) {
        match seg {
            Segment::Escape(seq) => {
                styled = true;
                out.push_str(seq);
            }
            Segment::Visible(ch) => {
                if used == width {
                    break;
                }
                out.push_str(ch);
                used += 1;
            }
        }
    }
    if styled {
        out.push_str(RESET);
    }
    out
}

/// Truncates or right-pads `s` to exactly `width` columns
pub fn fit(s: &str, width: usize) -> String {
    let mut out = truncate(s, width);
    let pad = width.saturating_sub(visible_width(&out));
    out.extend(std::iter::repeat_n(' ', pad));
    out
}

/// Centers `s` within `width` columns
pub fn center(s: &str, width: usize) -> String {
    let len = visible_width(s);
    if len >= width {
        return truncate(s, width);
    }
    let left = (width - len) / 2;
    format!("{}{s}", " ".repeat(left))
}

/// Greedy word wrap on visible width; words longer than `width` are kept whole
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut used = 0;

    for word in text.split_whitespace() {
        let len = visible_width(word);
        if used > 0 && used + 1 + len > width {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        if used > 0 {
            line.push(' ');
            used += 1;
        }
        line.push_str(word);
        used += len;
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}
