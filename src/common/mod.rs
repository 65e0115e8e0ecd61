//! Helpers shared by the integration tests and benchmarks

pub mod test_utils;

pub use test_utils::{TestServer, TrustingClient, connect_client, login, spawn_test_server};
