//! Per-connection session state and the interactive event loop

use crate::Result;
use crate::tui::{Command, Model, Msg, keys};
use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{MissedTickBehavior, interval_at, sleep};
use tracing::debug;

const ENTER_SCREEN: &[u8] = b"\x1b[?1049h\x1b[?25l\x1b[2J";
const LEAVE_SCREEN: &[u8] = b"\x1b[?25h\x1b[?1049l";
const TICK: Duration = Duration::from_secs(30);

pub const PTY_REQUIRED: &str = "Error: PTY required\n";

/// Keystroke packets buffered per session before further input is dropped
pub const EVENT_QUEUE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("an interactive terminal (PTY) is required")]
    PtyRequired,
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
}

/// Terminal parameters negotiated by a PTY request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyInfo {
    pub term: String,
    pub width: usize,
    pub height: usize,
}

/// Input delivered from the SSH connection to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Input(Vec<u8>),
    Resize { width: usize, height: usize },
    Close,
}

/// Producer half of a session's event stream, held by the SSH handler
///
/// Input goes through a bounded queue and is dropped when the session loop
/// falls behind. Resizes bypass the queue: only the latest size is kept, so
/// they are never lost and never pile up.
#[derive(Debug)]
pub struct EventSender {
    input: mpsc::Sender<SessionEvent>,
    size: watch::Sender<(usize, usize)>,
}

/// Consumer half of a session's event stream, owned by the session loop
#[derive(Debug)]
pub struct EventReceiver {
    input: mpsc::Receiver<SessionEvent>,
    size: watch::Receiver<(usize, usize)>,
    size_open: bool,
}

/// Creates a connected sender/receiver pair for one session
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (input_tx, input_rx) = mpsc::channel(EVENT_QUEUE);
    let (size_tx, size_rx) = watch::channel((0, 0));
    (
        EventSender {
            input: input_tx,
            size: size_tx,
        },
        EventReceiver {
            input: input_rx,
            size: size_rx,
            size_open: true,
        },
    )
}

impl EventSender {
    /// Queues keyboard input; returns false if it was dropped
    pub fn input(&self, data: &[u8]) -> bool {
        self.input.try_send(SessionEvent::Input(data.to_vec())).is_ok()
    }

    /// Records the latest terminal size, replacing any unread one
    pub fn resize(&self, width: usize, height: usize) {
        self.size.send_replace((width, height));
    }

    /// Asks the loop to stop; dropping the sender has the same effect once
    /// queued input drains
    pub fn close(&self) {
        let _ = self.input.try_send(SessionEvent::Close);
    }
}

impl EventReceiver {
    /// Next event, with a pending resize taking priority over queued input
    ///
    /// Returns `None` once every sender is gone and the queue is empty.
    /// Cancel safe.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            tokio::select! {
                biased;
                changed = self.size.changed(), if self.size_open => {
                    if changed.is_ok() {
                        let (width, height) = *self.size.borrow_and_update();
                        return Some(SessionEvent::Resize { width, height });
                    }
                    self.size_open = false;
                }
                event = self.input.recv() => return event,
            }
        }
    }
}

/// Where a shell request leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellStart {
    pub user: String,
    pub pty: PtyInfo,
}

/// Connection lifecycle:
/// `Connecting → Authenticated → PtyRequested → Active → Closed`
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Connecting,
    Authenticated {
        user: String,
    },
    PtyRequested {
        user: String,
        pty: PtyInfo,
    },
    Active {
        user: String,
        events: EventSender,
    },
    Closed,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Authenticated { .. } => "authenticated",
            SessionState::PtyRequested { .. } => "pty-requested",
            SessionState::Active { .. } => "active",
            SessionState::Closed => "closed",
        }
    }

    /// Records a successful password check
    pub fn authenticate(&mut self, user: &str) -> std::result::Result<(), LifecycleError> {
        match self {
            SessionState::Connecting => {
                *self = SessionState::Authenticated {
                    user: user.to_string(),
                };
                Ok(())
            }
            other => Err(other.invalid("authenticate")),
        }
    }

    /// Records a PTY request; a repeated request replaces the earlier one
    pub fn request_pty(&mut self, pty: PtyInfo) -> std::result::Result<(), LifecycleError> {
        match std::mem::take(self) {
            SessionState::Authenticated { user } | SessionState::PtyRequested { user, .. } => {
                *self = SessionState::PtyRequested { user, pty };
                Ok(())
            }
            other => {
                let err = other.invalid("request a pty");
                *self = other;
                Err(err)
            }
        }
    }

    /// Starts the interactive session, wiring `events` as its input
    ///
    /// Without a prior PTY request the state moves straight to `Closed` and
    /// `PtyRequired` is returned.
    pub fn activate(
        &mut self,
        events: EventSender,
    ) -> std::result::Result<ShellStart, LifecycleError> {
        match std::mem::take(self) {
            SessionState::PtyRequested { user, pty } => {
                *self = SessionState::Active {
                    user: user.clone(),
                    events,
                };
                Ok(ShellStart { user, pty })
            }
            SessionState::Authenticated { .. } => {
                *self = SessionState::Closed;
                Err(LifecycleError::PtyRequired)
            }
            other => {
                let err = other.invalid("start a shell");
                *self = other;
                Err(err)
            }
        }
    }

    /// Applies a terminal resize, forwarding it if the session is running
    pub fn resize(&mut self, width: usize, height: usize) {
        match self {
            SessionState::PtyRequested { pty, .. } => {
                pty.width = width;
                pty.height = height;
            }
            SessionState::Active { events, .. } => events.resize(width, height),
            _ => {}
        }
    }

    /// Forwards raw keyboard input to a running session
    ///
    /// Returns false if the input was dropped because the session is not
    /// running or its queue is full.
    pub fn input(&self, data: &[u8]) -> bool {
        match self {
            SessionState::Active { events, .. } => {
                let queued = events.input(data);
                if !queued {
                    debug!(bytes = data.len(), "Session input queue full, dropping input");
                }
                queued
            }
            _ => false,
        }
    }

    /// Moves to `Closed`, telling a running session loop to stop
    pub fn close(&mut self) {
        if let SessionState::Active { events, .. } = std::mem::replace(self, SessionState::Closed) {
            events.close();
        }
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { user }
            | SessionState::PtyRequested { user, .. }
            | SessionState::Active { user, .. } => Some(user),
            SessionState::Connecting | SessionState::Closed => None,
        }
    }

    fn invalid(&self, action: &'static str) -> LifecycleError {
        LifecycleError::InvalidTransition {
            state: self.name(),
            action,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session identifier: username plus connect time in unix seconds
pub fn session_id(user: &str, at: SystemTime) -> String {
    let secs = at.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    format!("{user}-{secs}")
}

/// Destination for rendered frames
#[async_trait]
pub trait FrameSink: Send {
    /// Writes raw bytes to the client terminal
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Sends the exit status and closes the channel
    async fn finish(&mut self, exit_status: u32) -> Result<()>;
}

/// Why the session loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    Quit,
    Disconnected,
    Shutdown,
}

/// Drives one interactive session until quit, disconnect or shutdown
///
/// Keystrokes, resizes, the splash timer and the uptime tick all fold into
/// `model` from this single task, so UI state has exactly one writer.
pub async fn run_session<S: FrameSink>(
    mut model: Model,
    mut sink: S,
    mut events: EventReceiver,
    mut shutdown: broadcast::Receiver<()>,
    splash_duration: Duration,
) -> Result<SessionExit> {
    sink.write(ENTER_SCREEN).await?;
    sink.write(&frame_bytes(&model.view())).await?;

    let splash = sleep(splash_duration);
    tokio::pin!(splash);
    let mut splash_pending = true;

    let mut ticker = interval_at(tokio::time::Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let exit = loop {
        let msgs = tokio::select! {
            _ = &mut splash, if splash_pending => {
                splash_pending = false;
                vec![Msg::SplashTimeout]
            }
            _ = ticker.tick() => vec![Msg::Tick],
            event = events.recv() => match event {
                Some(SessionEvent::Input(bytes)) => keys::parse(&bytes).into_iter().map(Msg::Key).collect(),
                Some(SessionEvent::Resize { width, height }) => vec![Msg::Resize { width, height }],
                Some(SessionEvent::Close) | None => break SessionExit::Disconnected,
            },
            _ = shutdown.recv() => break SessionExit::Shutdown,
        };

        if msgs.into_iter().any(|msg| model.update(msg) == Command::Quit) {
            break SessionExit::Quit;
        }
        sink.write(&frame_bytes(&model.view())).await?;
    };

    debug!(?exit, session = model.session_id(), "Session loop finished");
    match exit {
        SessionExit::Disconnected => {}
        SessionExit::Quit => {
            sink.write(LEAVE_SCREEN).await?;
            sink.finish(0).await?;
        }
        SessionExit::Shutdown => {
            sink.write(LEAVE_SCREEN).await?;
            sink.write(b"Server is shutting down. Goodbye!\r\n").await?;
            sink.finish(0).await?;
        }
    }
    Ok(exit)
}

/// Tells a client without a PTY why it is being turned away
pub async fn reject_without_pty<S: FrameSink>(mut sink: S) -> Result<()> {
    sink.write(PTY_REQUIRED.as_bytes()).await?;
    sink.finish(1).await
}

/// Repaints the terminal in place with `frame`
fn frame_bytes(frame: &str) -> Vec<u8> {
    let mut out = String::with_capacity(frame.len() + 64);
    out.push_str("\x1b[H");
    for (i, line) in frame.split('\n').enumerate() {
        if i > 0 {
            out.push_str("\r\n");
        }
        out.push_str(line);
        out.push_str("\x1b[K");
    }
    out.push_str("\x1b[J");
    out.into_bytes()
}
