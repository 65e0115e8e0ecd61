//! ANSI styling with a Tokyo Night palette

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const ITALIC: &str = "\x1b[3m";
pub const UNDERLINE: &str = "\x1b[4m";

/// 24-bit colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const FOREGROUND: Rgb = Rgb(0xc0, 0xca, 0xf5);
/// Headings, active tab
pub const ACCENT: Rgb = Rgb(0x7a, 0xa2, 0xf7);
/// Links, emphasis
pub const HIGHLIGHT: Rgb = Rgb(0xbb, 0x9a, 0xf7);
pub const SUCCESS: Rgb = Rgb(0x9e, 0xce, 0x6a);
pub const BORDER: Rgb = Rgb(0x41, 0x48, 0x68);
pub const MUTED: Rgb = Rgb(0x56, 0x5f, 0x89);

impl Rgb {
    pub fn fg(self) -> String {
        format!("\x1b[38;2;{};{};{}m", self.0, self.1, self.2)
    }

    pub fn bg(self) -> String {
        format!("\x1b[48;2;{};{};{}m", self.0, self.1, self.2)
    }
}

/// A set of attributes applied to a run of text
#[derive(Debug, Clone, Default)]
pub struct Style {
    prefix: String,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fg(mut self, color: Rgb) -> Self {
        self.prefix.push_str(&color.fg());
        self
    }

    pub fn bg(mut self, color: Rgb) -> Self {
        self.prefix.push_str(&color.bg());
        self
    }

    pub fn bold(mut self) -> Self {
        self.prefix.push_str(BOLD);
        self
    }

    pub fn italic(mut self) -> Self {
        self.prefix.push_str(ITALIC);
        self
    }

    pub fn underline(mut self) -> Self {
        self.prefix.push_str(UNDERLINE);
        self
    }

    pub fn paint(&self, text: &str) -> String {
        if self.prefix.is_empty() {
            return text.to_string();
        }
        format!("{}{text}{RESET}", self.prefix)
    }
}

pub fn heading(level: usize) -> Style {
    match level {
        1 => Style::new().fg(ACCENT).bold().underline(),
        2 => Style::new().fg(ACCENT).bold(),
        _ => Style::new().fg(HIGHLIGHT).bold(),
    }
}

pub fn link() -> Style {
    Style::new().fg(HIGHLIGHT).underline()
}

pub fn code() -> Style {
    Style::new().fg(SUCCESS)
}

pub fn muted() -> Style {
    Style::new().fg(MUTED)
}

pub fn header() -> Style {
    Style::new().fg(ACCENT).bold()
}

pub fn active_tab() -> Style {
    Style::new().fg(FOREGROUND).bg(BORDER).bold()
}

pub fn inactive_tab() -> Style {
    Style::new().fg(MUTED)
}

pub fn stats() -> Style {
    Style::new().fg(HIGHLIGHT)
}

pub fn border() -> Style {
    Style::new().fg(BORDER)
}
