//! SSH transport: host key, protocol callbacks and the accept loop
//!
//! Every accepted socket is screened by the [`ConnectionGate`](crate::ConnectionGate)
//! before any SSH bytes are exchanged. Admitted connections are handed to
//! russh with a [`ConnectionHandler`], which drives the session lifecycle and
//! spawns one [`run_session`] task per interactive shell.

pub mod handler;
pub mod host_key;
pub mod server;
pub mod session;

pub use handler::{ChannelSink, ConnectionHandler, SessionSettings};
pub use server::PortfolioServer;
pub use session::{
    EVENT_QUEUE, EventReceiver, EventSender, FrameSink, LifecycleError, PtyInfo, SessionEvent,
    SessionExit, SessionState, event_channel, run_session,
};
