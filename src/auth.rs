//! Caller identity seam for dashboard mutations.
//!
//! Session management lives outside this service. Handlers only need to know
//! whether a request carries an acceptable caller, which is what
//! [`SessionVerifier`] answers. [`BearerToken`] is the implementation wired in
//! by `main.rs`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::AppError;
use crate::routes::AppState;

// ---

/// Identity of an authenticated dashboard user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub name: String,
}

pub trait SessionVerifier: Send + Sync {
    /// Resolve the caller behind a request, or `None` to reject it.
    fn verify(&self, headers: &HeaderMap) -> Option<Caller>;
}

/// Accepts `Authorization: Bearer <token>` matching a configured token.
/// Without a configured token every request is accepted.
#[derive(Debug, Clone, Default)]
pub struct BearerToken {
    token: Option<String>,
}

impl BearerToken {
    pub fn new(token: Option<String>) -> Self {
        BearerToken { token }
    }
}

impl SessionVerifier for BearerToken {
    fn verify(&self, headers: &HeaderMap) -> Option<Caller> {
        // ---
        let Some(expected) = self.token.as_deref() else {
            return Some(Caller {
                name: "anonymous".into(),
            });
        };

        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)?;

        (presented == expected).then(|| Caller {
            name: "dashboard".into(),
        })
    }
}

/// Middleware guarding mutating dashboard routes.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // ---
    let caller = state
        .sessions
        .verify(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, please sign in".into()))?;

    debug!(caller = %caller.name, uri = %request.uri(), "Session accepted");
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
