//! Anonymous session identity.
//!
//! Every request carries a 16-character session id: the client's
//! `X-Session-ID` when well-formed, otherwise one minted here. The id
//! keys the ephemeral zero/streak state and is echoed on every
//! response so first-time clients can adopt it. It is opaque and never
//! tied to an account.

use cg_core::Arbitrary;
use cg_core::SessionId;
use actix_web::Error;
use actix_web::FromRequest;
use actix_web::HttpMessage;
use actix_web::HttpRequest;
use actix_web::dev::Payload;
use actix_web::dev::Service;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::dev::Transform;
use actix_web::dev::forward_ready;
use actix_web::http::header::HeaderName;
use actix_web::http::header::HeaderValue;
use futures::future::LocalBoxFuture;
use futures::future::Ready;
use futures::future::ok;

pub const SESSION_HEADER: &str = "x-session-id";

pub struct Identify;

impl<S, B> Transform<S, ServiceRequest> for Identify
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = IdentifyMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ok(IdentifyMiddleware { service })
    }
}

pub struct IdentifyMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for IdentifyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    forward_ready!(service);
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let id = req
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(SessionId::parse)
            .unwrap_or_else(SessionId::random);
        req.extensions_mut().insert(id.clone());
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                res.headers_mut()
                    .insert(HeaderName::from_static(SESSION_HEADER), value);
            }
            Ok(res)
        })
    }
}

/// Extractor handing the per-request anonymous session id to handlers.
pub struct Visitor(pub SessionId);

impl Visitor {
    pub fn id(&self) -> &SessionId {
        &self.0
    }
}

impl FromRequest for Visitor {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req
            .extensions()
            .get::<SessionId>()
            .cloned()
            .unwrap_or_else(SessionId::random);
        ok(Visitor(id))
    }
}
