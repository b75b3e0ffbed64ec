//! Session-cookie authentication
//!
//! Sessions are server-side rows; the browser holds only an opaque id in
//! the `tandem_session` cookie. A single `require_auth` middleware is the
//! authorization gate for every protected route.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use tandem_core::db::{LibSqlSessionRepository, LibSqlUserRepository, SessionRepository, UserRepository};
use tandem_core::models::{Session, User};

use crate::error::AppError;
use crate::routes::AppState;

pub const SESSION_COOKIE: &str = "tandem_session";

/// Identity resolved by the gate, available to handlers via extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub is_logged_in: bool,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub status: &'static str,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(HeaderMap, Json<UserSummary>), AppError> {
    let email = validate_email(&request.email)?;
    if request.password.len() < 8 {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters",
        ));
    }

    let hashed = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|error| AppError::internal(format!("Password hashing failed: {error}")))?;

    let conn = state.db.connection();
    let user = LibSqlUserRepository::new(conn).create(&email, &hashed).await?;
    let session = LibSqlSessionRepository::new(conn)
        .create(user.id, state.config.session_ttl)
        .await?;

    tracing::info!(user_id = user.id, "Registered operator account");
    Ok((session_headers(&state, &session)?, Json(summary(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(HeaderMap, Json<UserSummary>), AppError> {
    let email = validate_email(&request.email)?;

    let conn = state.db.connection();
    let user = LibSqlUserRepository::new(conn)
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No account for {email}")))?;

    let matches = bcrypt::verify(&request.password, &user.hashed_password)
        .map_err(|error| AppError::internal(format!("Password verification failed: {error}")))?;
    if !matches {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let session = LibSqlSessionRepository::new(conn)
        .create(user.id, state.config.session_ttl)
        .await?;

    tracing::info!(user_id = user.id, "Operator logged in");
    Ok((session_headers(&state, &session)?, Json(summary(&user))))
}

/// Deletes the session row when the cookie resolves; always clears the
/// cookie, so repeat calls are harmless.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(HeaderMap, Json<LogoutResponse>), AppError> {
    if let Some(session_id) = session_cookie_value(&headers) {
        LibSqlSessionRepository::new(state.db.connection())
            .delete(&session_id)
            .await?;
    }
    Ok((clear_headers()?, Json(LogoutResponse { status: "ok" })))
}

/// Public identity probe; anonymous callers get nulls instead of a 401.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    match resolve_session(&state, &headers).await? {
        Some(user) => Ok(Json(MeResponse {
            id: Some(user.id),
            email: Some(user.email),
            is_logged_in: true,
        })),
        None => Ok(Json(MeResponse {
            id: None,
            email: None,
            is_logged_in: false,
        })),
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_session(&state, request.headers())
        .await?
        .ok_or_else(|| AppError::unauthorized("A valid session is required"))?;
    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
    });
    Ok(next.run(request).await)
}

async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<Option<User>, AppError> {
    let Some(session_id) = session_cookie_value(headers) else {
        return Ok(None);
    };

    let conn = state.db.connection();
    let sessions = LibSqlSessionRepository::new(conn);
    let Some(session) = sessions.get(&session_id).await? else {
        return Ok(None);
    };
    if session.is_expired(chrono::Utc::now().timestamp_millis()) {
        // Expired rows are swept on touch rather than by a background job.
        sessions.delete(&session.id).await?;
        return Ok(None);
    }

    let user = LibSqlUserRepository::new(conn).get(session.user_id).await?;
    Ok(Some(user))
}

fn validate_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("A valid email address is required"));
    }
    Ok(email.to_string())
}

fn summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        email: user.email.clone(),
    }
}

/// Pull the session id out of the request's `Cookie` header, if any.
pub fn session_cookie_value(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == SESSION_COOKIE && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn session_headers(state: &AppState, session: &Session) -> Result<HeaderMap, AppError> {
    set_cookie_header(&format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id,
        state.config.session_ttl.as_secs()
    ))
}

fn clear_headers() -> Result<HeaderMap, AppError> {
    set_cookie_header(&format!(
        "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
    ))
}

fn set_cookie_header(cookie: &str) -> Result<HeaderMap, AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| AppError::internal("Session cookie is not a valid header value"))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}
