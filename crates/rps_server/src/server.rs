//! MCP server exposing session start/cancel to callers.

use crate::directory::GuardDirectory;
use derive_new::new;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use rps_sessions::{
    CallerId, GuardConsistent, GuardError, GuardState, RegistryError, SessionGuard, SessionId,
    SessionRegistry,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Request naming the caller acting through its guard.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, new)]
pub struct CallerRequest {
    /// Caller identity (non-empty).
    pub caller: String,
}

/// Request for joining another caller's session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, new)]
pub struct JoinRequest {
    /// Numeric session identifier, as returned by `start_session`.
    pub session_id: u64,
    /// Identity of the joining caller.
    pub caller: String,
}

/// Request naming a session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, new)]
pub struct SessionRequest {
    /// Numeric session identifier, as returned by `start_session`.
    pub session_id: u64,
}

fn invalid_params(err: impl Display) -> McpError {
    McpError::invalid_params(err.to_string(), None)
}

fn parse_caller(raw: String) -> Result<CallerId, McpError> {
    CallerId::parse(raw).map_err(invalid_params)
}

fn text(message: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message)])
}

/// Main server handler.
///
/// Handlers built with [`SessionServer::with_state`] over the same registry and
/// directory see the same sessions and the same per-caller exclusivity.
pub struct SessionServer {
    registry: Arc<SessionRegistry>,
    guards: GuardDirectory,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SessionServer {
    /// Creates a server over shared state.
    #[instrument(skip_all)]
    pub fn with_state(registry: Arc<SessionRegistry>, guards: GuardDirectory) -> Self {
        info!("Creating session server with shared state");
        Self {
            registry,
            guards,
            tool_router: Self::tool_router(),
        }
    }

    /// Creates a server with a fresh default registry.
    pub fn new() -> Self {
        Self::with_state(Arc::new(SessionRegistry::new()), GuardDirectory::new())
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The shared guard directory.
    pub fn guards(&self) -> &GuardDirectory {
        &self.guards
    }

    fn audit(&self, guard: &SessionGuard) {
        if cfg!(debug_assertions) {
            if let Err(violation) = GuardConsistent::check(guard, &self.registry) {
                error!(caller = %guard.caller(), %violation, "Guard out of sync with registry");
            }
        }
    }

    /// Starts a session for the caller.
    #[instrument(skip(self, req), fields(caller = %req.caller))]
    #[tool(description = "Start a rock-paper-scissors session for the caller. Fails if the caller already has an active session.")]
    pub async fn start_session(
        &self,
        Parameters(req): Parameters<CallerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let caller = parse_caller(req.caller)?;
        let guard = self.guards.guard_for(&caller);

        let session = guard.start(self.registry.as_ref()).map_err(|e| {
            warn!(error = %e, "Start refused");
            invalid_params(e)
        })?;
        self.audit(&guard);

        info!(session_id = %session, "Session started");
        Ok(text(format!(
            "Started {} for {}\nSession ID: {}",
            session,
            caller,
            session.as_raw()
        )))
    }

    /// Cancels the caller's active session.
    #[instrument(skip(self, req), fields(caller = %req.caller))]
    #[tool(description = "Cancel the caller's active session. Fails if the caller has none or an opponent already joined.")]
    pub async fn cancel_session(
        &self,
        Parameters(req): Parameters<CallerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let caller = parse_caller(req.caller)?;
        // Unknown callers hold nothing; do not create a guard just to refuse.
        let Some(guard) = self.guards.existing(&caller) else {
            warn!("Cancel refused: caller never started a session");
            return Err(invalid_params(GuardError::NoActiveSession));
        };

        let session = guard.cancel(self.registry.as_ref()).map_err(|e| {
            warn!(error = %e, "Cancel refused");
            invalid_params(e)
        })?;
        self.audit(&guard);

        info!(session_id = %session, "Session cancelled");
        Ok(text(format!("Cancelled {} for {}", session, caller)))
    }

    /// Joins another caller's open session as the second party.
    #[instrument(skip(self, req), fields(caller = %req.caller, session_id = req.session_id))]
    #[tool(description = "Join an open session as the second party. After this the owner can no longer cancel it.")]
    pub async fn join_session(
        &self,
        Parameters(req): Parameters<JoinRequest>,
    ) -> Result<CallToolResult, McpError> {
        let caller = parse_caller(req.caller)?;
        let session = SessionId::from_raw(req.session_id);

        self.registry
            .join_session(session, &caller)
            .map_err(invalid_params)?;

        info!("Caller joined session");
        Ok(text(format!("{} joined {}", caller, session)))
    }

    /// Marks a session as resolved by the game and releases its owner's guard.
    #[instrument(skip(self, req), fields(session_id = req.session_id))]
    #[tool(description = "Mark an open session as completed by the game. The owner may start a new session afterwards.")]
    pub async fn complete_session(
        &self,
        Parameters(req): Parameters<SessionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let session = SessionId::from_raw(req.session_id);
        let owner = self
            .registry
            .session(session)
            .map(|s| s.owner().clone())
            .ok_or_else(|| invalid_params(RegistryError::NotFound(session)))?;

        // Complete under the owner's guard lock so the guard never holds a
        // resolved session.
        match self.guards.existing(&owner) {
            Some(guard) => {
                let state = guard
                    .resolve_with(session, |s| self.registry.complete_session(s))
                    .map_err(invalid_params)?;
                info!(owner = %owner, %state, "Owner guard released");
            }
            None => self
                .registry
                .complete_session(session)
                .map_err(invalid_params)?,
        }

        Ok(text(format!("Completed {}", session)))
    }

    /// Reports whether the caller holds an active session.
    #[instrument(skip(self, req), fields(caller = %req.caller))]
    #[tool(description = "Show whether the caller is idle or holds an active session.")]
    pub async fn guard_status(
        &self,
        Parameters(req): Parameters<CallerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let caller = parse_caller(req.caller)?;

        let state = match self.guards.existing(&caller) {
            Some(guard) => guard.refresh(self.registry.as_ref()),
            None => GuardState::Idle,
        };

        Ok(text(format!("Caller {}: {}", caller, state)))
    }

    /// Lists open sessions waiting for a second party.
    #[instrument(skip(self))]
    #[tool(description = "List open sessions that are waiting for a second party")]
    pub async fn list_sessions(&self) -> Result<CallToolResult, McpError> {
        let open = self.registry.open_sessions();

        if open.is_empty() {
            info!("No joinable sessions");
            return Ok(text("No open sessions".to_string()));
        }

        let mut result = String::from("Open sessions:\n\n");
        for session in &open {
            result.push_str(&format!(
                "{} (id {})\n  Owner: {}\n",
                session.id(),
                session.id().as_raw(),
                session.owner()
            ));
        }

        Ok(text(result))
    }
}

impl Default for SessionServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for SessionServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Rock-paper-scissors session server. Each caller may hold one active session."
                .into(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}
