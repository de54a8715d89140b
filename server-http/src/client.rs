use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::SocketAddr;

const FORWARDED_FOR: &str = "X-Forwarded-For";

/// Network address of the caller, used to key rate limits.
///
/// The socket peer is the client unless the server is configured to sit
/// behind `trusted_proxies` reverse proxies. In that case the address is the
/// hop appended by the outermost trusted proxy, counted from the right of
/// `X-Forwarded-For`. Entries to the left of it are client-supplied and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

impl ClientAddr {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_proxies: usize) -> Self {
        let forwarded = if trusted_proxies > 0 {
            forwarded_hop(headers, trusted_proxies)
        } else {
            None
        };

        let addr = forwarded
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        ClientAddr(addr)
    }
}

/// The `trusted_proxies`-th hop from the right, or the leftmost hop when the
/// chain is shorter than that
fn forwarded_hop(headers: &HeaderMap, trusted_proxies: usize) -> Option<String> {
    let hops: Vec<&str> = headers
        .get_all(FORWARDED_FOR)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    hops.get(hops.len().saturating_sub(trusted_proxies))
        .map(|hop| hop.to_string())
}

impl FromRequestParts<AppState> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientAddr::resolve(&parts.headers, peer, state.trusted_proxies))
    }
}
