//!
//! skeleton HTTP server
//! --------------------
//! Thin Axum layer exposing the per-session identity service to a view layer.
//!
//! Responsibilities:
//! - Session scope via a cookie; a session is opened on first contact.
//! - Building the request's authentication context from headers set by a trusted
//!   upstream authenticator (reverse proxy / SSO gateway). No credentials are checked here.
//! - JSON views of the session's identity and role checks.
//! - Logout (session termination) and periodic pruning of idle sessions.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{Authentication, AuthenticationContext, InMemoryUserDirectory, Principal, SessionRegistry, UserDirectory};

pub const SESSION_COOKIE: &str = "skeleton_session";
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    /// Lower-case name of the trusted username header
    pub user_header: String,
    /// Lower-case name of the trusted authorities header
    pub roles_header: String,
}

impl AppState {
    pub fn new(directory: Arc<dyn UserDirectory>, config: &ServerConfig) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(directory, config.session_ttl)),
            user_header: config.user_header.clone(),
            roles_header: config.roles_header.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionView {
    logged_in: bool,
    username: String,
    roles: String,
    user: Option<Principal>,
}

#[derive(Debug, Serialize)]
struct RoleView {
    role: String,
    granted: bool,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie")?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some((k, v)) = p.split_once('=') {
            if k == name { return Some(v.to_string()); }
        }
    }
    None
}

fn set_session_cookie(sid: &str) -> AppResult<HeaderValue> {
    // HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!("{}={}; HttpOnly; Secure; SameSite=Strict; Path=/", SESSION_COOKIE, sid))
        .map_err(|e| AppError::internal("cookie_error".to_string(), e.to_string()))
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("skeleton_session=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim)
}

/// Authentication context for one request. A missing or blank username header is anonymous.
/// Authorities may be separated by commas and/or whitespace; their order is preserved.
pub fn authentication_from_headers(headers: &HeaderMap, user_header: &str, roles_header: &str) -> Authentication {
    let Some(username) = header_str(headers, user_header).filter(|u| !u.is_empty()) else {
        return Authentication::anonymous();
    };
    let authorities: Vec<String> = header_str(headers, roles_header)
        .unwrap_or("")
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|r| !r.is_empty())
        .map(String::from)
        .collect();
    let auth = Authentication::authenticated(username, authorities);
    match header_str(headers, "x-request-id") {
        Some(id) if !id.is_empty() => auth.with_request_id(id),
        _ => auth,
    }
}

fn with_new_session_cookie(mut resp: Response, sid: Option<&str>) -> Response {
    if let Some(sid) = sid {
        match set_session_cookie(sid) {
            Ok(v) => { resp.headers_mut().insert("set-cookie", v); }
            Err(e) => return e.into_response(),
        }
    }
    resp
}

async fn session_info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let auth = authentication_from_headers(&headers, &state.user_header, &state.roles_header);
    let (session, created) = match state.sessions.get_or_open(parse_cookie(&headers, SESSION_COOKIE).as_deref()) {
        Ok(v) => v,
        Err(e) => {
            error!(target: "http", "session open failed: {e:#}");
            return AppError::from(e).into_response();
        }
    };
    let info = &session.info;
    let resp = match info.current_user(&auth) {
        Ok(user) => Json(SessionView {
            logged_in: info.is_logged_in(&auth),
            username: info.current_user_name(&auth),
            roles: info.current_user_roles(&auth),
            user: user.as_deref().cloned(),
        })
        .into_response(),
        Err(e) => {
            error!(target: "http", "current user lookup failed user={} request_id={:?}: {e}", auth.current_username(), auth.request_id);
            AppError::from(e).into_response()
        }
    };
    with_new_session_cookie(resp, created.then_some(session.id.as_str()))
}

async fn has_role(State(state): State<AppState>, headers: HeaderMap, Path(role): Path<String>) -> Response {
    let auth = authentication_from_headers(&headers, &state.user_header, &state.roles_header);
    let (session, created) = match state.sessions.get_or_open(parse_cookie(&headers, SESSION_COOKIE).as_deref()) {
        Ok(v) => v,
        Err(e) => return AppError::from(e).into_response(),
    };
    let granted = session.info.has_role(&auth, &role);
    debug!(target: "http", "has_role user={} role={} granted={}", auth.current_username(), role, granted);
    with_new_session_cookie(Json(RoleView { role, granted }).into_response(), created.then_some(session.id.as_str()))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let ended = parse_cookie(&headers, SESSION_COOKIE)
        .map(|sid| state.sessions.invalidate(&sid))
        .unwrap_or(false);
    let mut h = HeaderMap::new();
    h.insert("set-cookie", clear_session_cookie());
    (h, Json(serde_json::json!({"status":"ok","ended": ended})))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "skeleton ok" }))
        .route("/session", get(session_info))
        .route("/session/roles/{role}", get(has_role))
        .route("/logout", post(logout))
        .with_state(state)
}

/// Serve on an already bound listener until the server stops.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    let sessions = Arc::clone(&state.sessions);
    let pruner = tokio::spawn(async move {
        let mut tick = tokio::time::interval(PRUNE_INTERVAL);
        loop {
            tick.tick().await;
            sessions.prune_expired();
        }
    });
    let result = axum::serve(listener, router(state)).await;
    pruner.abort();
    result.context("http server failed")
}

fn load_directory(config: &ServerConfig) -> anyhow::Result<InMemoryUserDirectory> {
    match &config.users_file {
        Some(path) => InMemoryUserDirectory::from_json_file(path),
        None => {
            info!(target: "startup", "no users file configured; using built-in demo users");
            Ok(InMemoryUserDirectory::with_demo_users())
        }
    }
}

/// Start the HTTP server with the given configuration.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let directory = load_directory(&config)?;
    info!(
        target: "startup",
        "skeleton starting: users={}, session_ttl_secs={}, user_header='{}', roles_header='{}'",
        directory.len(), config.session_ttl.as_secs(), config.user_header, config.roles_header
    );
    let state = AppState::new(Arc::new(directory), &config);
    let addr = SocketAddr::new(config.bind_addr, config.http_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!(target: "startup", "HTTP listening on {}", addr);
    serve(listener, state).await
}
