//! Shared gateway state.

use crate::{
    GatewayConfig,
    dispatch::Dispatcher,
    handler::McpSession,
    session::{IdGenerator, SessionRouter, UuidGenerator},
    transport::{RoutedSessions, SessionChannel},
};
use anyhow::{Context, Result};
use jobs::Studio;
use provider::{Client, HttpProvider, Provider};
use rmcp::transport::{StreamableHttpServerConfig, StreamableHttpService};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod serve;

/// State shared by every request handler.
pub struct Gateway<P: Provider + 'static> {
    /// Tool catalogue, shared by all sessions.
    pub dispatcher: Arc<Dispatcher<P>>,
    /// Session table.
    pub sessions: Arc<SessionRouter<SessionChannel>>,
    service: StreamableHttpService<McpSession<P>, RoutedSessions>,
    shutdown: CancellationToken,
}

impl<P: Provider + 'static> Clone for Gateway<P> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            sessions: Arc::clone(&self.sessions),
            service: self.service.clone(),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<P: Provider + 'static> Gateway<P> {
    pub fn new(studio: Studio<P>, sessions: SessionRouter<SessionChannel>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(studio));
        let sessions = Arc::new(sessions);
        let shutdown = CancellationToken::new();

        let service = StreamableHttpService::new(
            {
                let dispatcher = Arc::clone(&dispatcher);
                move || Ok(McpSession::new(Arc::clone(&dispatcher)))
            },
            Arc::new(RoutedSessions::new(Arc::clone(&sessions))),
            StreamableHttpServerConfig::default().with_cancellation_token(shutdown.child_token()),
        );
        Self {
            dispatcher,
            sessions,
            service,
            shutdown,
        }
    }

    /// A fresh MCP server over the shared catalogue, as each new session
    /// gets.
    pub fn mcp_session(&self) -> McpSession<P> {
        McpSession::new(Arc::clone(&self.dispatcher))
    }

    /// The streamable HTTP service mounted at `/mcp`.
    pub fn service(&self) -> &StreamableHttpService<McpSession<P>, RoutedSessions> {
        &self.service
    }

    /// End every open event stream. Called on shutdown.
    pub fn close_streams(&self) {
        self.shutdown.cancel();
    }
}

impl Gateway<HttpProvider> {
    /// Wire the HTTP provider and session table described by `config`.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        Self::with_ids(config, Arc::new(UuidGenerator))
    }

    /// Like [`Gateway::from_config`] with a custom id source.
    pub fn with_ids(config: &GatewayConfig, ids: Arc<dyn IdGenerator>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.provider.request_timeout())
            .build()
            .context("failed to build the HTTP client")?;
        let provider = HttpProvider::basic(
            client,
            &config.provider.api_key,
            &config.provider.secret_key,
            &config.provider.base_url,
        )
        .context("failed to build the provider client")?;
        tracing::info!("provider client targets {}", provider.base_url());

        let studio = Studio::new(
            Arc::new(provider),
            config.jobs.policy(),
            config.jobs.deadlines(),
        );
        Ok(Self::new(
            studio,
            SessionRouter::new(ids, config.session.idle_timeout()),
        ))
    }
}
