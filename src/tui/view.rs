use super::model::Model;
use super::styles;
use super::text::{center, fit, visible_width};
use std::time::{Duration, Instant};

pub const TITLE: &str = "SSH  PORTFOLIO";
pub const HELP: &str = "Tab/h/l: navigate  •  j/k: scroll  •  g/G: top/bottom  •  ?: help  •  q: quit";

impl Model {
    /// Renders the whole screen
    pub fn view(&self) -> String {
        self.view_at(Instant::now())
    }

    /// Renders the whole screen with uptime measured at `now`
    pub fn view_at(&self, now: Instant) -> String {
        if !self.ready {
            return "\n  Initializing...".to_string();
        }
        if self.show_splash {
            return self.render_splash();
        }

        let mut lines = self.render_header();
        lines.push(String::new());
        lines.extend(self.render_tab_bar());
        lines.push(String::new());
        lines.extend(self.viewport.view().into_iter().map(|row| format!("  {row}")));
        lines.push(String::new());
        lines.extend(self.render_stats_bar(now.saturating_duration_since(self.started_at)));
        if self.show_help {
            lines.extend(self.render_help_bar());
        }

        lines.join("\n")
    }

    fn render_header(&self) -> Vec<String> {
        let inner = 38;
        let top = format!("╔{}╗", "═".repeat(inner));
        let middle = format!("║{}║", fit(&center(TITLE, inner), inner));
        let bottom = format!("╚{}╝", "═".repeat(inner));

        [top, middle, bottom]
            .iter()
            .map(|line| styles::header().paint(&center(line, self.width)))
            .collect()
    }

    fn render_tab_bar(&self) -> Vec<String> {
        let tabs: String = self
            .tabs
            .iter()
            .enumerate()
            .map(|(i, tab)| {
                let label = format!("  {}  ", tab.name);
                if i == self.active_tab {
                    styles::active_tab().paint(&label)
                } else {
                    styles::inactive_tab().paint(&label)
                }
            })
            .collect();

        vec![fit(&format!(" {tabs}"), self.width), self.rule()]
    }

    fn render_stats_bar(&self, uptime: Duration) -> Vec<String> {
        let secs = uptime.as_secs();
        let left = format!(" ⏱ {}h {}m • Session: {}", secs / 3600, (secs / 60) % 60, self.session_id);
        let right = format!("{:>3.0}% ", self.viewport.scroll_percent() * 100.0);
        let gap = self
            .width
            .saturating_sub(visible_width(&left) + visible_width(&right));
        let line = format!("{left}{}{right}", " ".repeat(gap));

        vec![self.rule(), styles::stats().paint(&fit(&line, self.width))]
    }

    fn render_help_bar(&self) -> Vec<String> {
        vec![self.rule(), styles::muted().paint(&fit(&format!(" {HELP}"), self.width))]
    }

    fn rule(&self) -> String {
        styles::border().paint(&"─".repeat(self.width))
    }
}
