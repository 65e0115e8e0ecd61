//! Peer addressing and rate-limit identity

pub mod address;

pub use address::{PeerAddr, RateKey};
