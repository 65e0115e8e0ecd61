use super::markdown;
use std::path::Path;
use tracing::debug;

/// One named page of the portfolio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub name: String,
    pub content: String,
}

impl Tab {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Tab names and their source files, in display order
pub const TAB_FILES: [(&str, &str); 4] = [
    ("Welcome", "welcome.md"),
    ("About", "about.md"),
    ("Projects", "projects.md"),
    ("Future", "future.md"),
];

/// Wrap width for rendered markdown
pub const WRAP_WIDTH: usize = 100;

/// Loads every tab from `content_dir`, rendering markdown to ANSI text
///
/// Never fails: a file that cannot be read is replaced by placeholder text.
pub fn load_tabs(content_dir: &Path) -> Vec<Tab> {
    TAB_FILES
        .iter()
        .map(|(name, filename)| match std::fs::read(content_dir.join(filename)) {
            Ok(bytes) => {
                let source = String::from_utf8_lossy(&bytes);
                Tab::new(*name, markdown::render(&source, WRAP_WIDTH))
            }
            Err(e) => {
                debug!(file = filename, error = %e, "Content file unavailable, using placeholder");
                Tab::new(*name, placeholder(name, filename))
            }
        })
        .collect()
}

pub fn placeholder(name: &str, filename: &str) -> String {
    format!("Content for {name} coming soon!\n\nFile not found: {filename}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gets_placeholder() {
        let dir = tempdir().unwrap();
        for file in ["welcome.md", "about.md", "projects.md"] {
            std::fs::write(dir.path().join(file), format!("# {file}\n\nHello")).unwrap();
        }

        let tabs = load_tabs(dir.path());
        assert_eq!(tabs.len(), 4);
        assert_eq!(
            tabs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            ["Welcome", "About", "Projects", "Future"]
        );
        assert!(tabs[0].content.contains("welcome.md"));
        assert!(!tabs[0].content.contains("coming soon"));
        assert_eq!(tabs[3].content, placeholder("Future", "future.md"));
    }

    #[test]
    fn test_nonexistent_directory() {
        let tabs = load_tabs(Path::new("/definitely/not/here"));
        assert_eq!(tabs.len(), 4);
        assert!(tabs.iter().all(|t| t.content.contains("coming soon!")));
    }

    #[test]
    fn test_invalid_utf8_is_tolerated() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("about.md"), b"caf\xe9 \xff").unwrap();

        let tabs = load_tabs(dir.path());
        assert!(tabs[1].content.contains("caf"));
    }
}
