//! Rate limiting middleware.

use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use blogicum_shared::ErrorResponse;

use crate::state::AppState;

/// Rate limiting middleware factory.
///
/// Counts requests per client IP with the limiter held in [`AppState`];
/// requests pass untouched when the state carries none.
pub struct RateLimitMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let limiter = req
                .app_data::<web::Data<AppState>>()
                .and_then(|state| state.rate_limiter.clone());

            if let Some(limiter) = limiter {
                let key = req
                    .connection_info()
                    .realip_remote_addr()
                    .unwrap_or("unknown")
                    .to_string();

                match limiter.check(&key).await {
                    Ok(result) if !result.allowed => {
                        let retry_after = result.retry_after.as_secs().max(1);
                        tracing::warn!(key = %key, retry_after, "Rate limit exceeded");

                        let error = ErrorResponse::new(429, "Too Many Requests").with_detail(
                            format!("Rate limit exceeded. Try again in {retry_after} seconds."),
                        );
                        let response = HttpResponse::TooManyRequests()
                            .insert_header(("X-RateLimit-Remaining", "0"))
                            .insert_header(("Retry-After", retry_after.to_string()))
                            .json(error);

                        return Ok(req.into_response(response).map_into_right_body());
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Rate limiter error, failing open"),
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
