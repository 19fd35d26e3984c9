//! Session token middleware.
//!
//! Every request carries a session token in the `x-session-token` header.
//! A missing or malformed token is replaced by a freshly minted one, and the
//! token is echoed back on the response. Binding a token allocates nothing:
//! provisioning starts only once a WPS request has passed validation.

use axum::{
    body::Body,
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use geoserve_session::SessionToken;
use tracing::{debug, warn};

/// Header carrying the session token.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// The token a request is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionBinding {
    pub token: SessionToken,
    /// The client sent no usable token and this one was minted for it.
    pub minted: bool,
}

/// Resolve or mint the session token and echo it back.
pub async fn session_middleware(mut request: Request<Body>, next: Next) -> Response {
    let binding = binding_for(&request);
    let token = binding.token;
    request.extensions_mut().insert(binding);

    let mut response = next.run(request).await;
    match HeaderValue::from_str(&token.to_string()) {
        Ok(value) => {
            response.headers_mut().insert(SESSION_TOKEN_HEADER, value);
        }
        Err(e) => warn!(token = %token, error = %e, "Failed to echo session token"),
    }
    response
}

fn binding_for(request: &Request<Body>) -> SessionBinding {
    let presented = request
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok());

    match presented {
        Some(token) => SessionBinding {
            token,
            minted: false,
        },
        None => {
            let token = SessionToken::new();
            debug!(token = %token, "Minted session token");
            SessionBinding {
                token,
                minted: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_header_is_kept() {
        let token = SessionToken::new();
        let request = Request::builder()
            .header(SESSION_TOKEN_HEADER, token.to_string())
            .body(Body::empty())
            .unwrap();
        let binding = binding_for(&request);
        assert_eq!(binding.token, token);
        assert!(!binding.minted);
    }

    #[test]
    fn test_malformed_header_mints_new_token() {
        let request = Request::builder()
            .header(SESSION_TOKEN_HEADER, "../../etc")
            .body(Body::empty())
            .unwrap();
        let first = binding_for(&request);
        let second = binding_for(&request);
        assert!(first.minted && second.minted);
        assert_ne!(first.token, second.token);
    }
}
