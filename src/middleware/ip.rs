use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::state::AppState;

/// Extract client IP from proxy headers and optional transport metadata.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> IpAddr {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.trim().parse::<IpAddr>() {
            return ip;
        }
    }
    fallback.unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Client address used for rate limiting. Proxy headers are client-controlled,
/// so they are read only when `trust_proxy` is set; otherwise the peer address wins.
pub fn resolve_client_ip(headers: &HeaderMap, remote: Option<IpAddr>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        extract_ip_from_headers(headers, remote)
    } else {
        remote.unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }
}

/// Client IP of a full request, for use in `from_fn` middleware.
pub fn client_ip(req: &Request, trust_proxy: bool) -> IpAddr {
    let remote = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    resolve_client_ip(req.headers(), remote, trust_proxy)
}

/// Client IP extractor for handlers. Never rejects: without connection info
/// (e.g. under `oneshot` in tests) it falls back to loopback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let remote = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
        Ok(ClientIp(resolve_client_ip(&parts.headers, remote, state.config.server.trust_proxy)))
    }
}
