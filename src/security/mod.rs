//! Admission control and authentication

pub mod auth;
pub mod gate;
pub mod registry;
pub mod token_bucket;

pub use auth::AuthGate;
pub use gate::{Admission, ConnectionGate};
pub use registry::{LimiterRegistry, SweepPolicy, spawn_sweeper};
pub use token_bucket::TokenBucket;
