//! Request extractors: client metadata and the verified caller.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::request::Parts;
use warden_auth::AuthContext;
use warden_core::error::WardenError;

use crate::error::ApiError;
use crate::routes::AppState;

/// Where a request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMeta {
    /// The peer address, or the first `X-Forwarded-For` hop when the
    /// peer is a trusted proxy. Empty when the peer is unknown.
    pub ip: String,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    fn from_parts(parts: &Parts, trusted_proxies: &[IpAddr]) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self {
            ip: client_ip(&parts.headers, peer, trusted_proxies),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        }
    }
}

impl FromRequestParts<AppState> for ClientMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state.trusted_proxies()))
    }
}

/// `X-Forwarded-For` is only believed when it was set by a trusted proxy.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = peer.map(|addr| addr.ip().to_canonical()) else {
        return String::new();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map_or_else(|| peer.to_string(), str::to_string)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// A caller whose bearer token verified.
pub struct Caller(pub AuthContext);

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let meta = ClientMeta::from_parts(parts, state.trusted_proxies());
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| WardenError::unauthenticated("missing bearer token"))?;
        let context = state.console().await?.verify(token, &meta.ip).await?;
        Ok(Caller(context))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    const PROXY: [IpAddr; 1] = [IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, 1))];

    #[test]
    fn trusted_proxy_forwards_first_hop() {
        let peer = Some(SocketAddr::from(([10, 0, 0, 1], 5000)));
        let h = headers(&[("x-forwarded-for", " 203.0.113.7 , 10.0.0.2")]);
        assert_eq!(client_ip(&h, peer, &PROXY), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), peer, &PROXY), "10.0.0.1");
        assert_eq!(
            client_ip(&headers(&[("x-forwarded-for", " ")]), peer, &PROXY),
            "10.0.0.1"
        );
    }

    #[test]
    fn untrusted_peers_cannot_choose_their_origin() {
        let peer = Some(SocketAddr::from(([203, 0, 113, 5], 41000)));
        let h = headers(&[("x-forwarded-for", "10.9.9.9")]);
        assert_eq!(client_ip(&h, peer, &PROXY), "203.0.113.5");
        assert_eq!(client_ip(&h, peer, &[]), "203.0.113.5");
        assert_eq!(client_ip(&h, None, &PROXY), "");
    }

    #[test]
    fn mapped_proxy_address_is_recognised() {
        let mapped: IpAddr = "::ffff:10.0.0.1".parse().unwrap();
        let peer = Some(SocketAddr::new(mapped, 5000));
        let h = headers(&[("x-forwarded-for", "198.51.100.4")]);
        assert_eq!(client_ip(&h, peer, &PROXY), "198.51.100.4");
    }

    #[test]
    fn bearer_requires_scheme_and_value() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc.def")])),
            Some("abc.def")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
