//! Request extractors.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Longest address the votes table stores.
pub const MAX_IP_LEN: usize = 45;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Best-effort client address: first `x-forwarded-for` hop, else the socket
/// peer, else `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let ip = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Self(ip.chars().take(MAX_IP_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(forwarded: Option<&str>, peer: Option<SocketAddr>) -> Parts {
        let mut builder = Request::builder().uri("/api/votes");
        if let Some(value) = forwarded {
            builder = builder.header(FORWARDED_FOR, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        if let Some(addr) = peer {
            parts.extensions.insert(ConnectInfo(addr));
        }
        parts
    }

    #[test]
    fn test_prefers_forwarded_header() {
        let peer = "10.0.0.1:5000".parse().unwrap();
        let ip = ClientIp::from_parts(&parts(Some("203.0.113.7, 10.0.0.2"), Some(peer)));
        assert_eq!(ip.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let peer = "10.0.0.1:5000".parse().unwrap();
        assert_eq!(ClientIp::from_parts(&parts(None, Some(peer))).as_str(), "10.0.0.1");
        assert_eq!(ClientIp::from_parts(&parts(Some(" "), None)).as_str(), "unknown");
    }

    #[test]
    fn test_truncates_long_values() {
        let long = "a".repeat(80);
        let ip = ClientIp::from_parts(&parts(Some(&long), None));
        assert_eq!(ip.as_str().len(), MAX_IP_LEN);
    }
}
