use super::session::{
    EventReceiver, FrameSink, LifecycleError, PtyInfo, SessionState, ShellStart, event_channel,
    reject_without_pty, run_session, session_id,
};
use crate::content::load_tabs;
use crate::network::PeerAddr;
use crate::security::AuthGate;
use crate::tui::Model;
use crate::{PortfolioError, Result};
use async_trait::async_trait;
use russh::server::{Auth, Handle, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info, info_span, warn};

/// Settings shared by every session on a server
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub content_dir: PathBuf,
    pub splash_duration: Duration,
}

/// Writes frames to one SSH channel through a session handle
pub struct ChannelSink {
    handle: Handle,
    channel: ChannelId,
}

impl ChannelSink {
    pub fn new(handle: Handle, channel: ChannelId) -> Self {
        Self { handle, channel }
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.handle
            .data(self.channel, CryptoVec::from_slice(bytes))
            .await
            .map_err(|_| PortfolioError::ChannelClosed)
    }

    async fn finish(&mut self, exit_status: u32) -> Result<()> {
        // The client may already be gone; nothing left to report to it.
        let _ = self.handle.exit_status_request(self.channel, exit_status).await;
        let _ = self.handle.eof(self.channel).await;
        let _ = self.handle.close(self.channel).await;
        Ok(())
    }
}

/// SSH protocol callbacks for a single admitted connection
pub struct ConnectionHandler {
    peer: PeerAddr,
    auth: Arc<AuthGate>,
    settings: Arc<SessionSettings>,
    shutdown: broadcast::Sender<()>,
    state: SessionState,
    channel: Option<ChannelId>,
}

impl ConnectionHandler {
    pub fn new(
        peer: PeerAddr,
        auth: Arc<AuthGate>,
        settings: Arc<SessionSettings>,
        shutdown: broadcast::Sender<()>,
    ) -> Self {
        Self {
            peer,
            auth,
            settings,
            shutdown,
            state: SessionState::default(),
            channel: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn owns(&self, channel: ChannelId) -> bool {
        self.channel == Some(channel)
    }

    /// Handles both shell and exec requests; the command line is ignored
    fn start(&mut self, channel: ChannelId, session: &mut Session) -> Result<()> {
        if !self.owns(channel) {
            let _ = session.channel_failure(channel);
            return Ok(());
        }

        let (events_tx, events_rx) = event_channel();
        match self.state.activate(events_tx) {
            Ok(start) => {
                let _ = session.channel_success(channel);
                self.spawn_session(start, ChannelSink::new(session.handle(), channel), events_rx);
                Ok(())
            }
            Err(LifecycleError::PtyRequired) => {
                let _ = session.channel_success(channel);
                warn!(peer = %self.peer, "Rejected session without PTY");
                let sink = ChannelSink::new(session.handle(), channel);
                tokio::spawn(async move {
                    let _ = reject_without_pty(sink).await;
                });
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "Refusing shell request");
                let _ = session.channel_failure(channel);
                Ok(())
            }
        }
    }

    fn spawn_session(
        &self,
        start: ShellStart,
        sink: ChannelSink,
        events: EventReceiver,
    ) {
        let ShellStart { user, pty } = start;
        let id = session_id(&user, SystemTime::now());
        let settings = self.settings.clone();
        let shutdown = self.shutdown.subscribe();
        let span = info_span!("session", %id);

        info!(user = %user, term = %pty.term, width = pty.width, height = pty.height, "Session started");
        tokio::spawn(
            async move {
                let dir = settings.content_dir.clone();
                let tabs = tokio::task::spawn_blocking(move || load_tabs(&dir))
                    .await
                    .unwrap_or_default();

                let mut model = Model::new(tabs, id);
                model.set_size(pty.width, pty.height);

                match run_session(model, sink, events, shutdown, settings.splash_duration).await {
                    Ok(exit) => info!(?exit, "Session ended"),
                    Err(e) => debug!(error = %e, "Session ended with error"),
                }
            }
            .instrument(span),
        );
    }
}

impl russh::server::Handler for ConnectionHandler {
    type Error = PortfolioError;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth> {
        if self.auth.check_credential(user, password) {
            self.state.authenticate(user)?;
            Ok(Auth::Accept)
        } else {
            Ok(Auth::reject())
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool> {
        if self.channel.is_some() || self.state.user().is_none() {
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<()> {
        let pty = PtyInfo {
            term: term.to_string(),
            width: col_width as usize,
            height: row_height as usize,
        };
        if self.owns(channel) && self.state.request_pty(pty).is_ok() {
            let _ = session.channel_success(channel);
        } else {
            let _ = session.channel_failure(channel);
        }
        Ok(())
    }

    async fn shell_request(&mut self, channel: ChannelId, session: &mut Session) -> Result<()> {
        self.start(channel, session)
    }

    async fn exec_request(
        &mut self,
        channel: ChannelId,
        _data: &[u8],
        session: &mut Session,
    ) -> Result<()> {
        self.start(channel, session)
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<()> {
        if self.owns(channel) {
            self.state.resize(col_width as usize, row_height as usize);
        }
        Ok(())
    }

    async fn data(&mut self, channel: ChannelId, data: &[u8], _session: &mut Session) -> Result<()> {
        if self.owns(channel) {
            self.state.input(data);
        }
        Ok(())
    }

    async fn channel_eof(&mut self, channel: ChannelId, _session: &mut Session) -> Result<()> {
        if self.owns(channel) {
            self.state.close();
        }
        Ok(())
    }

    async fn channel_close(&mut self, channel: ChannelId, _session: &mut Session) -> Result<()> {
        if self.owns(channel) {
            self.state.close();
        }
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.state.close();
    }
}
