use crate::config::rate_limit::{RateLimitConfig, RateLimitRule};
use crate::handlers;
use axum::{routing, Router};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

pub fn create_routes() -> Router {
    Router::new().nest("/api/v1", api_routes())
}

fn api_routes() -> Router {
    let config = RateLimitConfig::from_env();
    read_routes(&config).merge(mail_routes(&config))
}

/// Profile and relation listings.
fn read_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route("/users/{id}", routing::get(handlers::user::get_user))
        .route(
            "/users/{id}/categories",
            routing::get(handlers::user::list_user_categories),
        )
        .route(
            "/users/{id}/posts",
            routing::get(handlers::user::list_user_posts),
        )
        .route(
            "/users/{id}/events",
            routing::get(handlers::user::list_user_events),
        );

    with_optional_rate_limit(router, config.enabled, config.read)
}

/// Endpoints that enqueue outbound email or consume its links.
fn mail_routes(config: &RateLimitConfig) -> Router {
    let router = Router::new()
        .route(
            "/email/verification-notification",
            routing::post(handlers::verification::send_verification_notification),
        )
        .route(
            "/email/verify/{id}/{hash}",
            routing::get(handlers::verification::verify_email),
        );

    with_optional_rate_limit(router, config.enabled, config.mail)
}

fn with_optional_rate_limit(router: Router, enabled: bool, rule: RateLimitRule) -> Router {
    if !enabled {
        return router;
    }

    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(rule.per_second)
        .burst_size(rule.burst_size)
        .finish()
    else {
        tracing::warn!("Invalid rate limit rule {:?}, serving without limit", rule);
        return router;
    };

    router.layer(GovernorLayer::new(governor_conf))
}
