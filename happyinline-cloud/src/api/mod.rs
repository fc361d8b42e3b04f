//! HTTP API for happyinline-cloud

pub mod auth;
pub mod billing;
pub mod bookings;
pub mod health;
pub mod image;
pub mod profile;
pub mod services;
pub mod shops;
pub mod staff;
pub mod stripe_webhook;

use axum::routing::post;
use axum::{Json, Router, middleware};
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::rate_limit::{login_rate_limit, otp_rate_limit};
use crate::auth::user_auth::user_auth_middleware;
use crate::error::ServiceError;
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, ServiceError>;

/// Default page size for list endpoints
pub const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Clamp client paging parameters
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&uuid::Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = allowed_origin else {
        return CorsLayer::permissive();
    };
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            tracing::warn!(origin, error = %e, "Invalid CORS_ALLOWED_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Build the full application router
pub fn create_router(state: AppState, cors_allowed_origin: Option<&str>) -> Router {
    // Password sign-in and code verification (5/min per IP)
    let sign_in = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/otp/verify", post(auth::verify_otp))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    // Code delivery (3/min per IP)
    let otp = Router::new()
        .route("/api/auth/otp/request", post(auth::request_otp))
        .route_layer(middleware::from_fn_with_state(state.clone(), otp_rate_limit));

    // Everything that needs a signed-in user
    let protected = Router::new()
        .merge(profile::router())
        .merge(image::router())
        .merge(shops::router())
        .merge(staff::router())
        .merge(services::router())
        .merge(bookings::router())
        .merge(billing::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    Router::new()
        .merge(health::router())
        .merge(sign_in)
        .merge(otp)
        .merge(shops::public_router())
        .merge(services::public_router())
        .merge(stripe_webhook::router())
        .merge(protected)
        .layer(cors_layer(cors_allowed_origin))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamps() {
        assert_eq!(page(None, None), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page(Some(500), Some(-3)), (MAX_PAGE_SIZE, 0));
        assert_eq!(page(Some(0), Some(40)), (1, 40));
    }
}
