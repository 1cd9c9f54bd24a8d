use async_trait::async_trait;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub authenticated: bool,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self { name: "anonymous".into(), authenticated: false }
    }

    pub fn client(name: impl Into<String>) -> Self {
        Self { name: name.into(), authenticated: true }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer(String),
    Anonymous,
}

impl Credentials {
    /// Read the `Authorization` header. A missing header is anonymous; any
    /// scheme other than `Bearer` is a malformed request.
    pub fn from_headers(headers: &HeaderMap) -> ServerResult<Self> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let invalid = || ServerError::BadRequest("invalid Authorization header".into());
        let value = value.to_str().map_err(|_| invalid())?;
        match value.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => Ok(Self::Bearer(token.to_string())),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Action {
    Pull { repo: String },
    Push { repo: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pull { repo } => write!(f, "pull:{repo}"),
            Self::Push { repo } => write!(f, "push:{repo}"),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity>;
    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool>;
}

/// Checks bearer tokens against one shared secret.
///
/// Pushes always require the token. Pulls require it unless
/// `allow_anonymous_read` is set.
pub struct TokenAuth {
    token: String,
    allow_anonymous_read: bool,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>, allow_anonymous_read: bool) -> Self {
        Self { token: token.into(), allow_anonymous_read }
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(token) if !self.token.is_empty() && constant_time_eq(token, &self.token) => {
                Ok(Identity::client("bearer"))
            }
            Credentials::Bearer(_) => Err(ServerError::AuthFailed("bearer token rejected".into())),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, identity: &Identity, action: &Action) -> ServerResult<bool> {
        Ok(match action {
            Action::Pull { .. } => identity.authenticated || self.allow_anonymous_read,
            Action::Push { .. } => identity.authenticated,
        })
    }
}

/// Accepts every request.
pub struct AllowAllAuth;

#[async_trait]
impl AuthProvider for AllowAllAuth {
    async fn authenticate(&self, credentials: &Credentials) -> ServerResult<Identity> {
        match credentials {
            Credentials::Bearer(_) => Ok(Identity::client("bearer")),
            Credentials::Anonymous => Ok(Identity::anonymous()),
        }
    }

    async fn authorize(&self, _identity: &Identity, _action: &Action) -> ServerResult<bool> {
        Ok(true)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
