//! Streamable HTTP sessions backed by the [`SessionRouter`].
//!
//! Each registered [`SessionChannel`] owns the message channel of one
//! session worker. The worker itself runs the session's [`McpSession`]
//! inside rmcp; the channel only routes HTTP traffic into it.
//!
//! [`McpSession`]: crate::McpSession

use crate::session::{SessionError, SessionInit, SessionRouter};
use rmcp::{
    model::{ClientJsonRpcMessage, ServerJsonRpcMessage},
    transport::{
        WorkerTransport,
        streamable_http_server::{
            SessionId, SessionManager,
            session::{
                ServerSseMessage,
                local::{
                    self, EventId, EventIdParseError, LocalSessionHandle, LocalSessionWorker,
                    SessionConfig,
                },
            },
        },
    },
};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio_stream::{Stream, wrappers::ReceiverStream};

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// A streamable HTTP session could not serve a request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Register(#[from] SessionError),

    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error(transparent)]
    Channel(#[from] local::SessionError),

    #[error(transparent)]
    EventId(#[from] EventIdParseError),
}

/// The handler a session registers in the router.
pub struct SessionChannel {
    init: SessionInit<SessionChannel>,
    handle: OnceLock<LocalSessionHandle>,
}

impl SessionChannel {
    fn new(init: SessionInit<SessionChannel>) -> Self {
        Self {
            init,
            handle: OnceLock::new(),
        }
    }

    /// The finalized session id, once opened.
    pub fn session_id(&self) -> Option<String> {
        self.init.id()
    }

    /// Whether the session has a running worker.
    pub fn is_open(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Decide this session's id, which registers it, and start its worker.
    fn open(&self, config: SessionConfig) -> Result<(SessionId, LocalSessionWorker), SessionError> {
        let id: SessionId = self.init.finalize()?.into();
        let (handle, worker) = local::create_local_session(id.clone(), config);
        if self.handle.set(handle).is_err() {
            tracing::warn!("session {id} opened twice");
        }
        Ok((id, worker))
    }

    fn handle(&self, id: &SessionId) -> Result<&LocalSessionHandle, TransportError> {
        self.handle
            .get()
            .ok_or_else(|| TransportError::NotFound(id.clone()))
    }
}

/// rmcp session manager over the shared session table.
pub struct RoutedSessions {
    sessions: Arc<SessionRouter<SessionChannel>>,
    config: SessionConfig,
}

impl RoutedSessions {
    pub fn new(sessions: Arc<SessionRouter<SessionChannel>>) -> Self {
        Self {
            sessions,
            config: SessionConfig::default(),
        }
    }

    /// The underlying table.
    pub fn sessions(&self) -> &Arc<SessionRouter<SessionChannel>> {
        &self.sessions
    }

    fn channel(&self, id: &SessionId) -> Result<Arc<SessionChannel>, TransportError> {
        self.sessions
            .get(id)
            .ok_or_else(|| TransportError::NotFound(id.clone()))
    }
}

impl SessionManager for RoutedSessions {
    type Error = TransportError;
    type Transport = WorkerTransport<LocalSessionWorker>;

    async fn create_session(&self) -> Result<(SessionId, Self::Transport), Self::Error> {
        let routed = self.sessions.route_for(None, SessionChannel::new);
        let (id, worker) = routed.handler.open(self.config.clone())?;
        Ok((id, WorkerTransport::spawn(worker)))
    }

    async fn initialize_session(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<ServerJsonRpcMessage, Self::Error> {
        let channel = self.channel(id)?;
        Ok(channel.handle(id)?.initialize(message).await?)
    }

    async fn has_session(&self, id: &SessionId) -> Result<bool, Self::Error> {
        Ok(self.sessions.get(id).is_some_and(|channel| channel.is_open()))
    }

    async fn close_session(&self, id: &SessionId) -> Result<(), Self::Error> {
        let Some(channel) = self.sessions.remove(id) else {
            return Ok(());
        };
        tracing::info!("closing session {id}");
        if let Some(handle) = channel.handle.get() {
            handle.close().await?;
        }
        Ok(())
    }

    async fn create_stream(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error> {
        let channel = self.channel(id)?;
        let handle = channel.handle(id)?;
        let receiver = handle.establish_request_wise_channel().await?;
        handle
            .push_message(message, receiver.http_request_id)
            .await?;
        Ok(ReceiverStream::new(receiver.inner))
    }

    async fn accept_message(
        &self,
        id: &SessionId,
        message: ClientJsonRpcMessage,
    ) -> Result<(), Self::Error> {
        let channel = self.channel(id)?;
        channel.handle(id)?.push_message(message, None).await?;
        Ok(())
    }

    async fn create_standalone_stream(
        &self,
        id: &SessionId,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error> {
        let channel = self.channel(id)?;
        let receiver = channel.handle(id)?.establish_common_channel().await?;
        Ok(ReceiverStream::new(receiver.inner))
    }

    async fn resume(
        &self,
        id: &SessionId,
        last_event_id: String,
    ) -> Result<impl Stream<Item = ServerSseMessage> + Send + Sync + 'static, Self::Error> {
        let event: EventId = last_event_id.parse()?;
        let channel = self.channel(id)?;
        let receiver = channel.handle(id)?.resume(event).await?;
        Ok(ReceiverStream::new(receiver.inner))
    }
}
