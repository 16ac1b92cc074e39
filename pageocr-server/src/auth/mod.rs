//! Access gate module
//!
//! Admits or rejects a request before any page operation runs. Two checks,
//! each disabled when its list is empty:
//!
//! - the `X-Auth-Key` header must equal one of the configured tokens
//! - the peer IP must match at least one configured pattern

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use regex::Regex;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the client's access token.
pub const AUTH_HEADER: &str = "X-Auth-Key";

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingToken,
    UnknownToken,
    UnknownPeer,
    AddressNotAllowed,
}

impl Rejection {
    fn reason(self) -> &'static str {
        match self {
            Self::MissingToken => "missing access token",
            Self::UnknownToken => "access token not recognized",
            Self::UnknownPeer => "client address unknown",
            Self::AddressNotAllowed => "client address not allowed",
        }
    }
}

/// Token and client-address allow-lists.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    tokens: Vec<String>,
    ip_patterns: Vec<Regex>,
}

impl AccessGate {
    /// Gate that admits every request.
    pub fn open() -> Self {
        Self::default()
    }

    /// Build a gate, compiling each IP pattern.
    pub fn new(tokens: Vec<String>, ip_patterns: &[String]) -> Result<Self, regex::Error> {
        let ip_patterns = ip_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens, ip_patterns })
    }

    /// Whether any check is enabled.
    pub fn is_enforcing(&self) -> bool {
        !self.tokens.is_empty() || !self.ip_patterns.is_empty()
    }

    /// Decide on a request carrying `token` from `peer`.
    pub fn check(&self, token: Option<&str>, peer: Option<IpAddr>) -> Result<(), Rejection> {
        if !self.tokens.is_empty() {
            let token = token.ok_or(Rejection::MissingToken)?;
            if !self.tokens.iter().any(|t| t == token) {
                return Err(Rejection::UnknownToken);
            }
        }

        if !self.ip_patterns.is_empty() {
            let ip = peer.ok_or(Rejection::UnknownPeer)?.to_string();
            if !self.ip_patterns.iter().any(|p| p.is_match(&ip)) {
                return Err(Rejection::AddressNotAllowed);
            }
        }

        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn allow(&self, token: Option<&str>, peer: Option<IpAddr>) -> bool {
        self.check(token, peer).is_ok()
    }
}

/// Middleware applying the gate to page routes.
pub async fn require_access(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    if let Err(rejection) = state.gate.check(token, peer) {
        tracing::warn!(
            peer = ?peer,
            method = %request.method(),
            uri = %request.uri(),
            reason = rejection.reason(),
            "Access denied"
        );
        return Err(ApiError::forbidden(rejection.reason()));
    }

    Ok(next.run(request).await)
}
