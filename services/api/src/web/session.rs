//! services/api/src/web/session.rs
//!
//! Visitor tracking middleware.
//!
//! Every request is tied to a `UserSession` through the `moodigo_session` cookie.
//! Visitors without a cookie (or with a malformed one) get a fresh token, and the
//! cookie is set on the way out.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "moodigo_session";

/// Two weeks, in seconds.
const SESSION_MAX_AGE: i64 = 14 * 24 * 60 * 60;

/// Reads the visitor token from the `Cookie` header, if it is a well-formed UUID.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| c.trim().strip_prefix(&format!("{}=", SESSION_COOKIE)).map(str::to_string))
        .filter(|token| Uuid::parse_str(token).is_ok())
}

/// The `Set-Cookie` value for `token`. An empty token expires the cookie.
pub fn session_cookie(token: &str, secure: bool) -> String {
    let max_age = if token.is_empty() { 0 } else { SESSION_MAX_AGE };
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Middleware that resolves the visitor session and inserts it into request extensions.
pub async fn track_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    // 1. Reuse the visitor's token or mint a new one
    let (token, issued) = match session_token(req.headers()) {
        Some(token) => (token, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    // 2. Get or create the session row, touching last_activity
    let session = match state.db.get_or_create_session(&token, None).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to resolve visitor session: {:?}", e);
            return ApiError::Port(e).into_response();
        }
    };
    if issued {
        debug!("Issued new visitor session {}", session.id);
    }

    // 3. Hand the session to the handler
    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;

    // 4. Set the cookie for newly issued tokens
    if issued {
        match HeaderValue::from_str(&session_cookie(&token, state.config.secure_cookies)) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => error!("Failed to build session cookie: {:?}", e),
        }
    }
    response
}
