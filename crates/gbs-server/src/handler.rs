use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use gbs_git::{Classifier, GitRunner};
use gbs_sync::{InMemoryMetrics, MetricsSink, OutcomeKind, PulledBundle, SyncEngine, SyncOutcome};
use gbs_types::{parse_duration, BundleOptions, RemoteRepoRef};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{Action, AuthProvider, Credentials, Identity, TokenAuth};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

pub const HEADER_HEAD: HeaderName = HeaderName::from_static("x-git-head");
pub const HEADER_IS_PARTIAL: HeaderName = HeaderName::from_static("x-git-ispartial");
pub const HEADER_HASH: HeaderName = HeaderName::from_static("x-git-hash");

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
    pub metrics: Arc<InMemoryMetrics>,
    pub auth: Arc<dyn AuthProvider>,
    pub source_repo: Option<String>,
    pub sink_repo: Option<String>,
    pub remote_token: String,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        let metrics = Arc::new(InMemoryMetrics::new());
        let runner = GitRunner::new(&config.git, Classifier::default());
        let engine = SyncEngine::new(&config.scratch_dir, runner)
            .with_metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>);
        Self {
            engine,
            metrics,
            auth: Arc::new(TokenAuth::new(&config.auth_token, config.allow_anonymous_read)),
            source_repo: config.source_repo.clone(),
            sink_repo: config.sink_repo.clone(),
            remote_token: config.effective_remote_token().to_string(),
        }
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }

    /// Resolve the caller and check it may perform `action`. A rejected
    /// token counts as no token; the policy then decides.
    async fn admit(&self, headers: &HeaderMap, action: Action) -> ServerResult<Identity> {
        let credentials = Credentials::from_headers(headers)?;
        let identity = match self.auth.authenticate(&credentials).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(error = %e, "treating caller as anonymous");
                Identity::anonymous()
            }
        };
        if self.auth.authorize(&identity, &action).await? {
            Ok(identity)
        } else {
            Err(ServerError::AuthorizationDenied { action: action.to_string() })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PullQuery {
    pub since: Option<String>,
    pub after: Option<String>,
}

impl PullQuery {
    /// Bundle options from the query. Empty parameters count as absent.
    pub fn options(&self) -> ServerResult<BundleOptions> {
        let since = self.since.as_deref().filter(|s| !s.is_empty());
        let after = self.after.as_deref().filter(|s| !s.is_empty());
        match (since, after) {
            (Some(_), Some(_)) => Err(ServerError::BadRequest(
                "only one of 'since' and 'after' may be given".into(),
            )),
            (Some(raw), None) => {
                let window = parse_duration(raw)
                    .map_err(|_| ServerError::BadRequest(format!("Invalid since duration '{raw}'")))?;
                if window.as_secs() < 1 {
                    return Err(ServerError::BadRequest(
                        "Since duration must be at least 1 second".into(),
                    ));
                }
                Ok(BundleOptions::since(window))
            }
            (None, Some(raw)) => {
                let cutoff = DateTime::parse_from_rfc3339(raw)
                    .map_err(|_| ServerError::BadRequest(format!("Invalid after time '{raw}'")))?
                    .with_timezone(&Utc);
                if cutoff.timestamp() <= 0 {
                    return Err(ServerError::BadRequest("After time must be non-zero".into()));
                }
                Ok(BundleOptions::after(cutoff))
            }
            (None, None) => Ok(BundleOptions::default()),
        }
    }
}

pub fn outcome_status(kind: OutcomeKind) -> StatusCode {
    match kind {
        OutcomeKind::Success => StatusCode::OK,
        OutcomeKind::NoContent => StatusCode::NO_CONTENT,
        OutcomeKind::NotFound => StatusCode::NOT_FOUND,
        OutcomeKind::AuthFailed => StatusCode::UNAUTHORIZED,
        OutcomeKind::Conflict => StatusCode::CONFLICT,
        OutcomeKind::BadInput => StatusCode::BAD_REQUEST,
        OutcomeKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_response<T>(outcome: SyncOutcome<T>) -> Response {
    let status = outcome_status(outcome.kind());
    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }
    let message = outcome.message().unwrap_or_default().to_string();
    (status, message).into_response()
}

fn bundle_response(bundle: PulledBundle) -> ServerResult<Response> {
    let header = |v: String| {
        HeaderValue::from_str(&v).map_err(|e| ServerError::Internal(format!("invalid header value: {e}")))
    };
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_HEAD, header(bundle.head.commit_id.clone())?);
    headers.insert(HEADER_IS_PARTIAL, header(bundle.is_partial.to_string())?);
    headers.insert(HEADER_HASH, header(bundle.idempotency_hash.clone())?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(
        CONTENT_DISPOSITION,
        header(format!("attachment; filename={}", bundle.file_name()))?,
    );
    Ok((StatusCode::OK, headers, bundle.bytes).into_response())
}

/// `GET /pull/*branch`: export the branch of the source repository.
pub async fn pull_handler(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    Query(query): Query<PullQuery>,
    headers: HeaderMap,
) -> ServerResult<Response> {
    let Some(url) = state.source_repo.clone() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    state.admit(&headers, Action::Pull { repo: url.clone() }).await?;
    let options = query.options()?;

    let repo = RemoteRepoRef::new(url, branch, state.remote_token.clone());
    match state.engine.pull(repo, &options).await {
        SyncOutcome::Success(bundle) => bundle_response(bundle),
        other => Ok(failure_response(other)),
    }
}

/// `POST /push/*branch`: apply the bundle in the body and push it to the
/// sink repository.
pub async fn push_handler(
    State(state): State<AppState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ServerResult<Response> {
    let Some(url) = state.sink_repo.clone() else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };
    state.admit(&headers, Action::Push { repo: url.clone() }).await?;

    let repo = RemoteRepoRef::new(url, branch, state.remote_token.clone());
    let mut reader: &[u8] = &body;
    match state.engine.push(repo, &mut reader).await {
        SyncOutcome::Success(_) => Ok((StatusCode::OK, "Bundle successfully pushed").into_response()),
        other => Ok(failure_response(other)),
    }
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> Json<gbs_sync::MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// `GET /v1/health`
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "name": "gbs-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /`: describes the enabled endpoints.
pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let mut body = String::from("<html><body>\n<h1>Git Bundle Sync</h1>\n");
    if let Some(source) = &state.source_repo {
        body.push_str(&format!("<p>Source repository: {}</p>\n", escape_html(source)));
    }
    if let Some(sink) = &state.sink_repo {
        body.push_str(&format!("<p>Sink repository: {}</p>\n", escape_html(sink)));
    }
    body.push_str("<ul>\n");
    if state.source_repo.is_some() {
        body.push_str(
            "<li>GET /pull/{branch} - Download the branch as a bundle. Optional query \
             parameters: since=&lt;duration&gt; (e.g. 90s, 1h30m) or after=&lt;RFC 3339 time&gt;. \
             Otherwise the full history is returned.</li>\n",
        );
    }
    if state.sink_repo.is_some() {
        body.push_str("<li>POST /push/{branch} - Upload a bundle and push it to the branch.</li>\n");
    }
    body.push_str("<li>GET /metrics - Operation counters.</li>\n</ul>\n</body></html>\n");
    Html(body)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
