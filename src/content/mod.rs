//! Portfolio content: markdown files rendered into named tabs

pub mod loader;
pub mod markdown;

pub use loader::{TAB_FILES, Tab, load_tabs, placeholder};
