//! Rate limiting for the signup and login endpoints using governor and
//! `tower_governor`.
//!
//! Clients are keyed by the TCP peer address (requires serving with
//! `into_make_service_with_connect_info`). Proxy headers are honoured only
//! when `RESERVIO_TRUST_PROXY_HEADERS` is set, which is safe only behind a
//! proxy that overwrites them; otherwise a client could rotate the header
//! to get a fresh budget.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Seconds to replenish one auth request.
///
/// With a burst of 5 this allows 5 requests per 15 minutes per client.
const AUTH_REPLENISH_SECS: u64 = 180;

/// Requests a client may make before being throttled.
const AUTH_BURST: u32 = 5;

/// Key extractor keyed on the client IP.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor {
    /// Prefer proxy headers over the peer address.
    pub trust_proxy_headers: bool,
}

fn header_ip<T>(req: &Request<T>, name: &str) -> Option<IpAddr> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // X-Forwarded-For is read up to its first entry, the original client
        let forwarded = || {
            ["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "fly-client-ip"]
                .iter()
                .find_map(|name| header_ip(req, name))
        };
        self.trust_proxy_headers
            .then(forwarded)
            .flatten()
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create the rate limiter for signup and login: 5 requests per 15 minutes per IP.
///
/// Throttled requests get `429 Too Many Requests`. Every route the layer is
/// applied to draws from the same per-IP budget. `trust_proxy_headers`
/// selects where the IP comes from (see [`ClientIpKeyExtractor`]).
///
/// # Panics
///
/// This function will not panic. `per_second(180)` and `burst_size(5)` are
/// non-zero and always accepted by `GovernorConfigBuilder`.
#[must_use]
pub fn auth_rate_limiter(trust_proxy_headers: bool) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor {
            trust_proxy_headers,
        })
        .per_second(AUTH_REPLENISH_SECS)
        .burst_size(AUTH_BURST)
        .finish()
        .expect("rate limiter config with per_second(180) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    const BEHIND_PROXY: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: true,
    };
    const DIRECT: ClientIpKeyExtractor = ClientIpKeyExtractor {
        trust_proxy_headers: false,
    };

    fn request() -> axum::http::request::Builder {
        Request::builder().uri("/api/auth/business/login")
    }

    fn with_peer(mut req: Request<()>) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.10:5000".parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_forwarded_for_uses_first_hop() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        let ip = BEHIND_PROXY.extract(&req).unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request()
            .header("x-forwarded-for", "203.0.113.7")
            .header("cf-connecting-ip", "198.51.100.2")
            .body(())
            .unwrap();
        let ip = BEHIND_PROXY.extract(&req).unwrap();
        assert_eq!(ip, "198.51.100.2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_headers_ignored_unless_trusted() {
        let req = with_peer(
            request()
                .header("x-forwarded-for", "203.0.113.7")
                .body(())
                .unwrap(),
        );
        let ip = DIRECT.extract(&req).unwrap();
        assert_eq!(ip, "192.0.2.10".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let req = with_peer(request().body(()).unwrap());
        for extractor in [BEHIND_PROXY, DIRECT] {
            let ip = extractor.extract(&req).unwrap();
            assert_eq!(ip, "192.0.2.10".parse::<IpAddr>().unwrap());
        }
    }

    #[test]
    fn test_no_source_is_an_error() {
        let req = request().header("x-real-ip", "not-an-ip").body(()).unwrap();
        assert!(BEHIND_PROXY.extract(&req).is_err());
        assert!(DIRECT.extract(&req).is_err());
    }
}
