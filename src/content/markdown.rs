//! Minimal markdown to ANSI text
//!
//! Covers what portfolio pages use: headings, lists, quotes, rules, fenced
//! code, bold, inline code and links. Anything else passes through as text.

use crate::tui::styles::{self, BOLD, RESET};
use crate::tui::text::{visible_width, wrap};

/// Renders `source` as styled terminal text wrapped at `width` columns
pub fn render(source: &str, width: usize) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;

    for raw in source.lines() {
        let line = raw.trim_end();
        let trimmed = line.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            out.push(styles::code().paint(&format!("    {line}")));
            continue;
        }

        if trimmed.is_empty() {
            out.push(String::new());
        } else if let Some((level, text)) = heading(trimmed) {
            if !out.last().is_none_or(String::is_empty) {
                out.push(String::new());
            }
            out.push(styles::heading(level).paint(text));
        } else if is_rule(trimmed) {
            out.push(styles::border().paint(&"─".repeat(width.min(60))));
        } else if let Some(text) = bullet(trimmed) {
            push_wrapped(&mut out, &inline(text), width, "  • ", "    ");
        } else if let Some(text) = trimmed.strip_prefix('>') {
            let quote = styles::muted().italic().paint(text.trim_start());
            push_wrapped(&mut out, &quote, width, "  │ ", "  │ ");
        } else {
            push_wrapped(&mut out, &inline(trimmed), width, "", "");
        }
    }

    out.join("\n")
}

fn push_wrapped(out: &mut Vec<String>, text: &str, width: usize, first: &str, rest: &str) {
    let indent = visible_width(first).max(visible_width(rest));
    let body = width.saturating_sub(indent).max(10);
    for (i, line) in wrap(text, body).into_iter().enumerate() {
        let indent = if i == 0 { first } else { rest };
        out.push(format!("{indent}{line}"));
    }
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    line[level..].strip_prefix(' ').map(|text| (level, text.trim()))
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3 && ['-', '*', '_'].iter().any(|&m| compact.chars().all(|c| c == m))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
}

/// Applies bold, inline code and link styling
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['*', '`', '[']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix("**") {
            if let Some(end) = after.find("**") {
                out.push_str(BOLD);
                out.push_str(&after[..end]);
                out.push_str(RESET);
                rest = &after[end + 2..];
                continue;
            }
        } else if let Some(after) = rest.strip_prefix('`') {
            if let Some(end) = after.find('`') {
                out.push_str(&styles::code().paint(&after[..end]));
                rest = &after[end + 1..];
                continue;
            }
        } else if let Some((label, url, tail)) = link(rest) {
            out.push_str(&styles::link().paint(label));
            if url != label {
                out.push_str(&styles::muted().paint(&format!(" ({url})")));
            }
            rest = tail;
            continue;
        }

        // Unmatched marker, emit it literally. All markers are one byte.
        out.push_str(&rest[..1]);
        rest = &rest[1..];
    }

    out.push_str(rest);
    out
}

/// Parses `[label](url)` at the start of `s`
fn link(s: &str) -> Option<(&str, &str, &str)> {
    let body = s.strip_prefix('[')?;
    let close = body.find("](")?;
    let label = &body[..close];
    let after = &body[close + 2..];
    let end = after.find(')')?;
    Some((label, &after[..end], &after[end + 1..]))
}
