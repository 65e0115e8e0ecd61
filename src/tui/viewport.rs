use super::text::fit;

/// Scrollable window over a block of text
#[derive(Debug, Clone, Default)]
pub struct Viewport {
    width: usize,
    height: usize,
    offset: usize,
    lines: Vec<String>,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Replaces the content, keeping the scroll position where possible
    pub fn set_content(&mut self, content: &str) {
        self.lines = content.lines().map(str::to_string).collect();
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height.max(1));
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height.max(1));
    }

    pub fn goto_top(&mut self) {
        self.offset = 0;
    }

    pub fn goto_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// How far through the content the bottom edge is, 0.0 to 1.0
    pub fn scroll_percent(&self) -> f64 {
        let max = self.max_offset();
        if max == 0 {
            1.0
        } else {
            self.offset as f64 / max as f64
        }
    }

    /// Exactly `height` lines, each exactly `width` columns
    pub fn view(&self) -> Vec<String> {
        let blank = " ".repeat(self.width);
        (0..self.height)
            .map(|row| match self.lines.get(self.offset + row) {
                Some(line) => fit(line, self.width),
                None => blank.clone(),
            })
            .collect()
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }
}
