use super::keys::Key;
use super::viewport::Viewport;
use crate::content::Tab;
use std::time::Instant;

/// Rows taken by everything except the viewport
const HEADER_HEIGHT: usize = 3;
const TAB_HEIGHT: usize = 3;
const STATS_HEIGHT: usize = 2;
const HELP_HEIGHT: usize = 2;
const PADDING: usize = 2;

/// Largest terminal the renderer will lay out; bigger sizes are clamped
pub const MAX_COLS: usize = 512;
pub const MAX_ROWS: usize = 256;

/// Everything that can change the UI, delivered one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    Key(Key),
    Resize { width: usize, height: usize },
    SplashTimeout,
    /// Periodic redraw so the uptime stays current
    Tick,
}

/// What the session loop should do after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None,
    Quit,
}

/// UI state for one session
#[derive(Debug, Clone)]
pub struct Model {
    pub(super) tabs: Vec<Tab>,
    pub(super) active_tab: usize,
    pub(super) viewport: Viewport,
    pub(super) width: usize,
    pub(super) height: usize,
    pub(super) ready: bool,
    pub(super) show_help: bool,
    pub(super) show_splash: bool,
    pub(super) started_at: Instant,
    pub(super) session_id: String,
}

impl Model {
    pub fn new(tabs: Vec<Tab>, session_id: impl Into<String>) -> Self {
        Self {
            tabs,
            active_tab: 0,
            viewport: Viewport::new(80, 20),
            width: 0,
            height: 0,
            ready: false,
            show_help: true,
            show_splash: true,
            started_at: Instant::now(),
            session_id: session_id.into(),
        }
    }

    /// Sets the terminal size and lays out the viewport
    ///
    /// Sizes come straight from the client, so they are clamped to
    /// `MAX_COLS` x `MAX_ROWS` before anything is allocated for them.
    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width.min(MAX_COLS);
        self.height = height.min(MAX_ROWS);
        self.ready = true;
        self.layout();
        self.refresh_content();
    }

    /// Folds one message into the state
    pub fn update(&mut self, msg: Msg) -> Command {
        match msg {
            Msg::SplashTimeout => self.show_splash = false,
            Msg::Resize { width, height } => self.set_size(width, height),
            Msg::Tick => {}
            Msg::Key(Key::Ctrl('c')) => return Command::Quit,
            Msg::Key(_) if self.show_splash => self.show_splash = false,
            Msg::Key(key) => return self.handle_key(key),
        }
        Command::None
    }

    fn handle_key(&mut self, key: Key) -> Command {
        match key {
            Key::Char('q') => return Command::Quit,
            Key::Tab | Key::Char('l') | Key::Right => self.next_tab(),
            Key::BackTab | Key::Char('h') | Key::Left => self.prev_tab(),
            Key::Char('j') | Key::Down => self.viewport.scroll_down(1),
            Key::Char('k') | Key::Up => self.viewport.scroll_up(1),
            Key::Char('d') | Key::Ctrl('d') | Key::PageDown => self.viewport.page_down(),
            Key::Char('u') | Key::Ctrl('u') | Key::PageUp => self.viewport.page_up(),
            Key::Char('g') => self.viewport.goto_top(),
            Key::Char('G') => self.viewport.goto_bottom(),
            Key::Char('?') => {
                self.show_help = !self.show_help;
                self.layout();
            }
            _ => {}
        }
        Command::None
    }

    fn next_tab(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        self.active_tab = (self.active_tab + 1) % self.tabs.len();
        self.refresh_content();
    }

    fn prev_tab(&mut self) {
        if self.tabs.is_empty() {
            return;
        }
        self.active_tab = self.active_tab.checked_sub(1).unwrap_or(self.tabs.len() - 1);
        self.refresh_content();
    }

    fn layout(&mut self) {
        let help = if self.show_help { HELP_HEIGHT } else { 0 };
        let reserved = HEADER_HEIGHT + TAB_HEIGHT + STATS_HEIGHT + help + PADDING;
        self.viewport
            .set_size(self.width.saturating_sub(4), self.height.saturating_sub(reserved).max(1));
    }

    /// Loads the active tab into the viewport, scrolled to the top
    fn refresh_content(&mut self) {
        if let Some(tab) = self.tabs.get(self.active_tab) {
            self.viewport.set_content(&tab.content);
            self.viewport.goto_top();
        }
    }

    pub fn active_tab(&self) -> usize {
        self.active_tab
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn show_splash(&self) -> bool {
        self.show_splash
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tabs() -> Vec<Tab> {
        vec![
            Tab::new("Tab1", "Content 1"),
            Tab::new("Tab2", "Content 2"),
            Tab::new("Tab3", "Content 3"),
        ]
    }

    fn ready_model() -> Model {
        let mut m = Model::new(test_tabs(), "test-session");
        m.set_size(100, 40);
        m.update(Msg::SplashTimeout);
        m
    }

    fn press(m: &mut Model, key: Key) -> Command {
        m.update(Msg::Key(key))
    }

    #[test]
    fn test_new_model() {
        let m = Model::new(test_tabs(), "test-session");
        assert_eq!(m.active_tab(), 0);
        assert_eq!(m.tabs().len(), 3);
        assert!(m.show_help());
        assert!(m.show_splash());
        assert_eq!(m.session_id(), "test-session");
    }

    #[test]
    fn test_set_size_lays_out_viewport() {
        let mut m = Model::new(test_tabs(), "s");
        m.set_size(100, 40);
        assert_eq!(m.viewport().width(), 96);
        assert_eq!(m.viewport().height(), 40 - 12);
    }

    #[test]
    fn test_tab_navigation_wraps() {
        let mut m = ready_model();
        press(&mut m, Key::Tab);
        assert_eq!(m.active_tab(), 1);
        press(&mut m, Key::Char('l'));
        press(&mut m, Key::Right);
        assert_eq!(m.active_tab(), 0);

        press(&mut m, Key::BackTab);
        assert_eq!(m.active_tab(), 2);
        press(&mut m, Key::Char('h'));
        press(&mut m, Key::Left);
        assert_eq!(m.active_tab(), 0);
    }

    #[test]
    fn test_switching_tabs_resets_scroll() {
        let long = (0..200).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut m = Model::new(vec![Tab::new("Long", long.clone()), Tab::new("Other", long)], "s");
        m.set_size(80, 30);
        m.update(Msg::SplashTimeout);

        press(&mut m, Key::Char('G'));
        assert!(m.viewport().offset() > 0);
        press(&mut m, Key::Tab);
        assert_eq!(m.viewport().offset(), 0);
    }

    #[test]
    fn test_help_toggle_relayouts() {
        let mut m = ready_model();
        let with_help = m.viewport().height();
        press(&mut m, Key::Char('?'));
        assert!(!m.show_help());
        assert_eq!(m.viewport().height(), with_help + 2);
    }

    #[test]
    fn test_any_key_dismisses_splash_only() {
        let mut m = Model::new(test_tabs(), "s");
        m.set_size(80, 24);
        assert_eq!(press(&mut m, Key::Char('q')), Command::None);
        assert!(!m.show_splash());
        assert_eq!(m.active_tab(), 0);
        assert_eq!(press(&mut m, Key::Char('q')), Command::Quit);
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let mut m = Model::new(test_tabs(), "s");
        assert_eq!(press(&mut m, Key::Ctrl('c')), Command::Quit);
    }

    #[test]
    fn test_resize_message() {
        let mut m = ready_model();
        m.update(Msg::Resize { width: 120, height: 50 });
        assert_eq!(m.size(), (120, 50));
        assert_eq!(m.viewport().width(), 116);
    }

    #[test]
    fn test_oversized_terminal_is_clamped() {
        let mut m = Model::new(test_tabs(), "s");
        m.set_size(u32::MAX as usize, u32::MAX as usize);
        assert_eq!(m.size(), (MAX_COLS, MAX_ROWS));

        let splash = m.view();
        assert!(splash.len() < 64 * MAX_COLS * MAX_ROWS);

        m.update(Msg::SplashTimeout);
        m.update(Msg::Resize { width: usize::MAX, height: usize::MAX });
        let frame = m.view();
        assert_eq!(frame.lines().count(), MAX_ROWS);
        assert!(frame.len() < 64 * MAX_COLS * MAX_ROWS);
    }

    #[test]
    fn test_empty_tabs_do_not_panic() {
        let mut m = Model::new(Vec::new(), "s");
        m.set_size(80, 24);
        m.update(Msg::SplashTimeout);
        press(&mut m, Key::Tab);
        press(&mut m, Key::BackTab);
        assert_eq!(m.active_tab(), 0);
    }
}
