//! Rock-paper-scissors session server.
//!
//! Exposes the session lifecycle of [`rps_sessions`] as MCP tools, over stdio
//! or streamable HTTP.
//!
//! # Example
//!
//! ```no_run
//! use rps_server::{GuardDirectory, ServerConfig, SessionServer};
//! use rps_sessions::SessionRegistry;
//! use std::sync::Arc;
//!
//! let config = ServerConfig::default();
//! let registry = Arc::new(SessionRegistry::with_policy(config.cancel_policy().build()));
//! let server = SessionServer::with_state(registry, GuardDirectory::new());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cli;
mod config;
mod directory;
mod server;

pub use cli::{Cli, Command};
pub use config::{ConfigError, ServerConfig};
pub use directory::GuardDirectory;
pub use server::{CallerRequest, JoinRequest, SessionRequest, SessionServer};
