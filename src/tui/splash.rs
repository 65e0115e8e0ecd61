use super::model::Model;
use super::styles::{self, Style};
use super::text::center;

const LOGO: [&str; 6] = [
    "███████╗███████╗██╗  ██╗",
    "██╔════╝██╔════╝██║  ██║",
    "███████╗███████╗███████║",
    "╚════██║╚════██║██╔══██║",
    "███████║███████║██║  ██║",
    "╚══════╝╚══════╝╚═╝  ╚═╝",
];

impl Model {
    pub(super) fn render_splash(&self) -> String {
        let logo = Style::new().fg(styles::ACCENT).bold();
        let subtitle = Style::new().fg(styles::HIGHLIGHT).italic();

        let mut lines = vec![String::new(); 3];
        lines.extend(LOGO.iter().map(|row| logo.paint(&center(row, self.width))));
        lines.push(String::new());
        lines.push(styles::header().paint(&center("P O R T F O L I O", self.width)));
        lines.push(String::new());
        lines.push(subtitle.paint(&center("Welcome to my interactive portfolio", self.width)));
        lines.push(String::new());
        lines.push(styles::muted().paint(&center("Press any key to continue...", self.width)));

        lines.join("\n")
    }
}
