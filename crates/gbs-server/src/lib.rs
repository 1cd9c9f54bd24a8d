//! HTTP server for git-bundle-sync.
//!
//! Exposes the sync engine over HTTP: `GET /pull/*branch` streams the
//! source repository's branch as a bundle, `POST /push/*branch` applies an
//! uploaded bundle to the sink repository. Clients authenticate with a
//! bearer token; anonymous pulls are a configuration choice.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{Action, AllowAllAuth, AuthProvider, Credentials, Identity, TokenAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{outcome_status, AppState, PullQuery};
pub use server::GbsServer;
