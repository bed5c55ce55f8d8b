//! Per-IP token-bucket rate limiting.
//!
//! One [`Limiter`] per route group, each with its own rate and burst;
//! the [`Throttle`] middleware wraps a scope and answers 429 with a
//! `Retry-After` when a bucket runs dry. Buckets idle past
//! `BUCKET_IDLE_TTL` are reaped opportunistically.

use crate::proxy;
use cg_core::BUCKET_IDLE_TTL;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::body::EitherBody;
use actix_web::dev::Service;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::dev::Transform;
use actix_web::dev::forward_ready;
use futures::future::LocalBoxFuture;
use futures::future::Ready;
use futures::future::ok;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    touched: Instant,
}

/// Token-bucket state for one route group.
#[derive(Debug)]
pub struct Limiter {
    per_minute: u32,
    burst: u32,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl Limiter {
    pub fn new((per_minute, burst): (u32, u32)) -> Arc<Self> {
        Arc::new(Self {
            per_minute,
            burst,
            buckets: Mutex::new(HashMap::new()),
        })
    }

    /// Takes one token for `ip`, or reports how long until one refills.
    pub fn acquire(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        let rate = self.per_minute as f64 / 60.0;
        let mut buckets = self.buckets.lock().expect("bucket lock");
        buckets.retain(|_, b| now.duration_since(b.touched) < BUCKET_IDLE_TTL);
        let bucket = buckets.entry(ip).or_insert(Bucket {
            tokens: self.burst as f64,
            touched: now,
        });
        let elapsed = now.duration_since(bucket.touched).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * rate).min(self.burst as f64);
        bucket.touched = now;
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / rate))
        }
    }

    #[cfg(test)]
    fn backdate(&self, ip: IpAddr, by: Duration) {
        if let Some(b) = self.buckets.lock().unwrap().get_mut(&ip) {
            b.touched = Instant::now() - by;
        }
    }
}

/// Middleware wrapping a scope in a shared [`Limiter`].
pub struct Throttle {
    limiter: Arc<Limiter>,
}

impl Throttle {
    pub fn new(limiter: Arc<Limiter>) -> Self {
        Self { limiter }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Throttle
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ThrottleMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ok(ThrottleMiddleware {
            service,
            limiter: self.limiter.clone(),
        })
    }
}

pub struct ThrottleMiddleware<S> {
    service: S,
    limiter: Arc<Limiter>,
}

impl<S, B> Service<ServiceRequest> for ThrottleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    forward_ready!(service);
    fn call(&self, req: ServiceRequest) -> Self::Future {
        let ip = proxy::client_ip(&req);
        match self.limiter.acquire(ip) {
            Ok(()) => {
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(|res| res.map_into_left_body()) })
            }
            Err(retry_after) => {
                log::debug!("[throttle] limited {} on {}", ip, req.path());
                let response = HttpResponse::TooManyRequests()
                    .insert_header(("Retry-After", retry_after.as_secs().max(1).to_string()))
                    .body("rate limit exceeded");
                let response = req.into_response(response).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([203, 0, 113, last])
    }

    #[test]
    fn burst_then_deny() {
        let limiter = Limiter::new((60, 3));
        for _ in 0..3 {
            assert!(limiter.acquire(ip(1)).is_ok());
        }
        let retry = limiter.acquire(ip(1)).unwrap_err();
        assert!(retry <= Duration::from_secs(1));
    }

    #[test]
    fn buckets_are_per_ip() {
        let limiter = Limiter::new((60, 1));
        assert!(limiter.acquire(ip(1)).is_ok());
        assert!(limiter.acquire(ip(2)).is_ok());
        assert!(limiter.acquire(ip(1)).is_err());
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = Limiter::new((60, 1));
        assert!(limiter.acquire(ip(7)).is_ok());
        assert!(limiter.acquire(ip(7)).is_err());
        limiter.backdate(ip(7), Duration::from_secs(2));
        assert!(limiter.acquire(ip(7)).is_ok());
    }

    #[test]
    fn idle_buckets_are_reaped() {
        let limiter = Limiter::new((60, 1));
        assert!(limiter.acquire(ip(9)).is_ok());
        limiter.backdate(ip(9), BUCKET_IDLE_TTL + Duration::from_secs(1));
        assert!(limiter.acquire(ip(10)).is_ok());
        assert_eq!(limiter.buckets.lock().unwrap().len(), 1);
    }
}
