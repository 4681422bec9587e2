//! Client address and user agent.

use std::net::{IpAddr, SocketAddr};

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, Request},
};
use axum_extra::headers::{HeaderMapExt, UserAgent};

/// Who is calling, as far as the request tells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientInfo {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    fn from_parts(headers: &HeaderMap, extensions: &Extensions) -> Self {
        Self {
            ip: resolve_ip(headers, extensions),
            user_agent: headers
                .typed_get::<UserAgent>()
                .map(|ua| ua.as_str().to_string()),
        }
    }

    /// IP as stored in logs; `"unknown"` when it could not be determined.
    pub fn ip_string(&self) -> String {
        self.ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(&parts.headers, &parts.extensions))
    }
}

/// Client IP of a request, for middleware that holds the whole request.
pub fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    resolve_ip(req.headers(), req.extensions())
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
fn resolve_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        })
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::USER_AGENT;

    #[test]
    fn test_forwarded_for_first_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_ip(&req), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "garbage")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 4], 5000))));
        assert_eq!(client_ip(&req), Some("192.168.1.4".parse().unwrap()));
    }

    #[test]
    fn test_client_info_from_parts() {
        let (parts, _) = Request::builder()
            .header("x-real-ip", "2001:db8::1")
            .header(USER_AGENT, "curl/8.0")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let info = ClientInfo::from_parts(&parts.headers, &parts.extensions);
        assert_eq!(info.ip_string(), "2001:db8::1");
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.0"));

        assert_eq!(ClientInfo::default().ip_string(), "unknown");
    }
}
