//! Per-session MCP handler.

use crate::dispatch::Dispatcher;
use provider::Provider;
use rmcp::{
    ErrorData, RoleServer, ServerHandler,
    model::{
        CallToolRequestParams, CallToolResult, Implementation, InitializeRequestParams,
        InitializeResult, ListToolsResult, PaginatedRequestParams, ServerCapabilities, ServerInfo,
        Tool,
    },
    service::{NotificationContext, RequestContext},
};
use std::sync::Arc;

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "easel";

const INSTRUCTIONS: &str = "Generation tools submit a job, wait for it to finish and return \
    the resulting images. Use list_models to find a model id first.";

/// The MCP server behind one session.
///
/// One is built per session; all of them share the tool catalogue.
pub struct McpSession<P> {
    dispatcher: Arc<Dispatcher<P>>,
}

impl<P: Provider> McpSession<P> {
    pub fn new(dispatcher: Arc<Dispatcher<P>>) -> Self {
        Self { dispatcher }
    }
}

impl<P: Provider + 'static> ServerHandler for McpSession<P> {
    fn get_info(&self) -> ServerInfo {
        InitializeResult::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(Implementation::new(SERVER_NAME, env!("CARGO_PKG_VERSION")))
            .with_instructions(INSTRUCTIONS)
    }

    async fn initialize(
        &self,
        request: InitializeRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, ErrorData> {
        let client = &request.client_info;
        tracing::info!(
            "client {} {} connected with protocol {}",
            client.name,
            client.version,
            request.protocol_version
        );
        Ok(self.get_info())
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        if let Some(client) = context.peer.peer_info() {
            tracing::debug!("client {} finished initialization", client.client_info.name);
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult::with_all_items(self.dispatcher.tools()))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.dispatcher
            .tools()
            .into_iter()
            .find(|tool| tool.name == name)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        tracing::debug!("tools/call {}", request.name);
        self.dispatcher.call(&request.name, request.arguments).await
    }
}
