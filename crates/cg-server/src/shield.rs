//! Blanket security middleware.
//!
//! Applied to every route: fixed security response headers, an HTTP
//! method whitelist, and a denylist of scanner user-agents. Decoy
//! honeypot paths are separate routes; this layer runs before all of
//! them.

use crate::proxy;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::body::EitherBody;
use actix_web::dev::Service;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::dev::Transform;
use actix_web::dev::forward_ready;
use actix_web::http::header;
use actix_web::http::header::HeaderValue;
use futures::future::LocalBoxFuture;
use futures::future::Ready;
use futures::future::ok;

const CSP: &str =
    "default-src 'self'; img-src 'self' https: data:; script-src 'self'; style-src 'self' 'unsafe-inline'; frame-ancestors 'none'";

/// Substrings of user-agents that only ever belong to scanners.
const SCANNERS: [&str; 12] = [
    "sqlmap",
    "nikto",
    "nmap",
    "masscan",
    "dirbuster",
    "gobuster",
    "wpscan",
    "nuclei",
    "zgrab",
    "acunetix",
    "netsparker",
    "nessus",
];

pub fn scanner(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    SCANNERS.iter().any(|probe| ua.contains(probe))
}

pub struct Shield;

impl<S, B> Transform<S, ServiceRequest> for Shield
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ShieldMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ok(ShieldMiddleware { service })
    }
}

pub struct ShieldMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for ShieldMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    forward_ready!(service);
    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !matches!(req.method().as_str(), "GET" | "POST" | "OPTIONS") {
            let response = req
                .into_response(HttpResponse::MethodNotAllowed().finish())
                .map_into_right_body();
            return Box::pin(async move { Ok(response) });
        }
        let ua = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if scanner(ua) {
            log::warn!(
                "[shield] blocked scanner {:?} from {}",
                ua,
                proxy::client_ip(&req)
            );
            let response = req
                .into_response(HttpResponse::Forbidden().finish())
                .map_into_right_body();
            return Box::pin(async move { Ok(response) });
        }
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            let headers = res.headers_mut();
            headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(CSP),
            );
            headers.insert(
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            );
            Ok(res.map_into_left_body())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_agents_are_flagged() {
        assert!(scanner("sqlmap/1.7#stable"));
        assert!(scanner("Mozilla/5.0 zgrab/0.x"));
        assert!(scanner("NIKTO-2.5"));
        assert!(!scanner("Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0"));
        assert!(!scanner(""));
    }
}
