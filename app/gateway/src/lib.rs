//! Easel gateway: MCP sessions over HTTP, each routed to a handler that
//! runs generation tools through the shared job pipeline.

pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod handler;
pub mod session;
pub mod transport;
pub mod utils;

pub use config::GatewayConfig;
pub use dispatch::{DispatchError, Dispatcher};
pub use gateway::{
    Gateway,
    serve::{ServeHandle, router, serve, serve_with},
};
pub use handler::McpSession;
pub use session::{IdGenerator, Routed, SessionError, SessionInit, SessionRouter, UuidGenerator};
pub use transport::{RoutedSessions, SESSION_HEADER, SessionChannel, TransportError};
