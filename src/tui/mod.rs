//! Full-screen tabbed viewer: state, input decoding and frame rendering
//!
//! The model is a plain state machine. Keys, resizes and timer events all
//! arrive as [`Msg`] values through one loop, and [`Model::view`] turns the
//! current state into a complete frame.

pub mod keys;
pub mod model;
mod splash;
pub mod styles;
pub mod text;
pub mod view;
pub mod viewport;

pub use keys::Key;
pub use model::{Command, Model, Msg};
pub use viewport::Viewport;
