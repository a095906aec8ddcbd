//! MCP server lifecycle.
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: capability requests routed through the [`Dispatcher`]
//! 3. **Shutdown**: EOF on the transport, SIGINT or SIGTERM
//!
//! Requests are handled one at a time. Notifications raised while a request
//! runs (progress, log messages) are written before its response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::mcp::context::Notifier;
use crate::mcp::dispatcher::{Dispatcher, RequestKind};
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, OutgoingNotification, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{Line, StdioTransport, Transport};
use crate::registry::Registries;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool capabilities.
    pub tools: ListCapabilities,
    /// Resource capabilities.
    pub resources: ResourceCapabilities,
    /// Prompt capabilities.
    pub prompts: ListCapabilities,
    /// Root capabilities.
    pub roots: ListCapabilities,
    /// Logging capability (an empty object when supported).
    pub logging: Value,
}

/// Capabilities of a listable capability kind.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCapabilities {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceCapabilities {
    /// Whether clients may subscribe to resource updates.
    #[serde(skip_serializing_if = "is_false")]
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ServerCapabilities {
    fn advertised() -> Self {
        Self {
            logging: json!({}),
            ..Self::default()
        }
    }
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// The MCP server.
pub struct McpServer<R, W> {
    state: ServerState,
    transport: Transport<R, W>,
    protocol_version: Option<String>,
    info: ServerInfo,
    dispatcher: Dispatcher,
    notifications: UnboundedReceiver<OutgoingNotification>,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server on stdio.
    #[must_use]
    pub fn stdio(info: ServerInfo, registries: Registries) -> Self {
        Self::with_transport(info, registries, StdioTransport::stdio())
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    #[must_use]
    pub fn with_transport(info: ServerInfo, registries: Registries, transport: Transport<R, W>) -> Self {
        let (notifier, notifications) = Notifier::channel();
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            info,
            dispatcher: Dispatcher::new(registries, notifier),
            notifications,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// The negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// The dispatcher behind this server.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Consumes the server, returning its transport.
    pub fn into_transport(self) -> Transport<R, W> {
        self.transport
    }

    /// Runs the main loop until EOF or a termination signal.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(unix)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop until EOF or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(windows)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop until EOF, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> std::io::Result<()> {
        loop {
            let line_result = self.transport.read_line().await;
            if self.handle_transport_result(line_result).await? {
                return Ok(());
            }
        }
    }

    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<Line>>,
    ) -> std::io::Result<bool> {
        let line = match line_result? {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                warn!("Rejected line that is not valid UTF-8");
                self.transport.write_error(&error).await?;
                return Ok(false);
            }
            None => {
                info!("Transport closed, shutting down");
                self.state = ServerState::ShuttingDown;
                return Ok(true);
            }
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        Ok(self.state == ServerState::ShuttingDown)
    }

    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req).await,
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                Ok(())
            }
            Err(error) => {
                warn!(code = error.error.code, "Rejected malformed message");
                self.transport.write_error(&error).await
            }
        }
    }

    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(Self::handle_ping(&req)),
            method => match RequestKind::from_method(method) {
                Some(kind) => self.handle_capability_request(kind, &req).await,
                None => Err(JsonRpcError::method_not_found(req.id.clone(), method)),
            },
        };

        self.flush_notifications().await?;

        match response {
            Ok(resp) => self.transport.write_response(&resp).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    async fn handle_capability_request(
        &self,
        kind: RequestKind,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        self.dispatcher
            .dispatch(kind, req.params.as_ref())
            .await
            .map(|result| JsonRpcResponse::success(req.id.clone(), result))
            .map_err(|err| {
                warn!(method = kind.method(), id = %req.id, error = %err, "Request failed");
                err.into_rpc_error(req.id.clone())
            })
    }

    async fn flush_notifications(&mut self) -> std::io::Result<()> {
        while let Ok(notification) = self.notifications.try_recv() {
            self.transport.write_notification(&notification).await?;
        }
        Ok(())
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                info!("Client initialised, server running");
                self.state = ServerState::Running;
            }
            method => debug!(method, "Ignoring notification"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested_protocol = %params.protocol_version,
                "Initialising session"
            );
        }

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();
        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::advertised(),
            "serverInfo": self.info,
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }
}
