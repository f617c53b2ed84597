//! HTTP surface: the MCP endpoint, the health check and the serve loop.

use crate::{
    GatewayConfig,
    gateway::Gateway,
    session::SessionRouter,
    transport::{SESSION_HEADER, SessionChannel},
};
use anyhow::Result;
use axum::{
    Json, Router,
    body::{self, Body},
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
};
use provider::Provider;
use serde_json::{Value, json};
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinHandle};

/// Handle returned by [`serve`]: the bound port and a shutdown trigger.
pub struct ServeHandle {
    /// The port the gateway is listening on.
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<Result<(), std::io::Error>>>,
    sweeper: Option<JoinHandle<()>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            join.await??;
        }
        Ok(())
    }
}

/// Routes for one gateway.
pub fn router<P: Provider + 'static>(state: Gateway<P>) -> Router {
    Router::new()
        .route("/mcp", any(mcp_handler::<P>))
        .route("/health", get(health))
        .with_state(state)
}

/// Build the gateway described by `config`, bind it and start serving.
///
/// The server runs in a spawned task; call `handle.shutdown()` to stop it.
pub async fn serve(config: &GatewayConfig) -> Result<ServeHandle> {
    config.validate()?;
    let gateway = Gateway::from_config(config)?;
    serve_with(gateway, &config.bind_address(), config.session.sweep_interval()).await
}

/// Serve an already-built gateway on `bind`.
///
/// When the session table has an idle timeout, a sweep runs every
/// `sweep_every` until shutdown.
pub async fn serve_with<P: Provider + 'static>(
    gateway: Gateway<P>,
    bind: &str,
    sweep_every: Duration,
) -> Result<ServeHandle> {
    let sweeper = gateway
        .sessions
        .idle_timeout()
        .map(|_| spawn_sweeper(Arc::downgrade(&gateway.sessions), sweep_every));

    let streams = gateway.clone();
    let app = router(gateway);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("gateway listening on {bind} (port {port})");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
                tracing::info!("received shutdown signal");
                streams.close_streams();
            })
            .await
    });

    Ok(ServeHandle {
        port,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
        sweeper,
    })
}

/// Periodically evict idle sessions until the router is dropped.
pub fn spawn_sweeper<H: Send + Sync + 'static>(
    sessions: Weak<SessionRouter<H>>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(sessions) = sessions.upgrade() else {
                break;
            };
            let evicted = sessions.evict_idle();
            if evicted > 0 {
                tracing::info!("evicted {evicted} idle sessions, {} left", sessions.len());
            }
        }
    })
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn mcp_handler<P: Provider + 'static>(
    State(state): State<Gateway<P>>,
    request: Request,
) -> Response {
    match forget_unknown_session(&state.sessions, request).await {
        Ok(request) => state.service().handle(request).await.into_response(),
        Err(response) => response,
    }
}

/// Drop the session header from an `initialize` whose id is not in the
/// table, so it opens a new session. Other requests with unknown ids are
/// left for the transport to reject.
async fn forget_unknown_session(
    sessions: &SessionRouter<SessionChannel>,
    request: Request,
) -> Result<Request, Response> {
    let unknown = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !sessions.contains(id))
        .map(str::to_owned);
    let Some(id) = unknown else {
        return Ok(request);
    };
    if request.method() != Method::POST {
        return Ok(request);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())?;
    if is_initialize(&bytes) {
        tracing::debug!("unknown session {id}, starting a new one");
        parts.headers.remove(SESSION_HEADER);
    }
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

fn is_initialize(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .is_ok_and(|message| message.get("method").and_then(Value::as_str) == Some("initialize"))
}
