use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use domain::services::MonitoringThresholds;
use persistence::repositories::{SecurityLogRepository, SettingRepository};
use sqlx::PgPool;
use theme_builder::Registry;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    load_session, login_rate_limit, metrics_middleware, require_auth, require_worker_token,
    security_headers_middleware, trace_id, verify_csrf, LoginRateLimiter, SecurityHeaders,
};
use crate::routes::{self, RouteSpec};
use crate::services::{BroadcastHub, CookieHelper, EmailService, Notifier, SecurityLog, Storage};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    pub login_limiter: Option<Arc<LoginRateLimiter>>,
    pub email: EmailService,
    pub storage: Storage,
    pub cookies: CookieHelper,
    pub broadcasts: BroadcastHub,
    pub notifier: Notifier,
    pub security_log: SecurityLog,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let broadcasts = BroadcastHub::new(
            config.notifications.broadcast_capacity,
            config.notifications.broadcast_log_size,
        );
        let notifier = Notifier::from_pool(
            pool.clone(),
            broadcasts.clone(),
            &config.email.sender_email,
            config.notifications.clone(),
        );
        let security_log = SecurityLog::new(
            SecurityLogRepository::new(pool.clone()),
            SettingRepository::new(pool.clone()),
            notifier.clone(),
            config.security.clone(),
        );

        Self {
            login_limiter: LoginRateLimiter::new(config.security.login_rate_limit_per_minute).map(Arc::new),
            email: EmailService::new(config.email.clone()),
            storage: Storage::new(config.storage.clone()),
            cookies: CookieHelper::new(config.session.clone()),
            registry: Arc::new(Registry::builtin()),
            broadcasts,
            notifier,
            security_log,
            config: Arc::new(config),
            pool,
        }
    }

    /// Monitoring thresholds from config, overridden by the settings page.
    pub async fn thresholds(&self) -> MonitoringThresholds {
        let base = self.config.workers.thresholds();
        match SettingRepository::new(self.pool.clone()).all().await {
            Ok(stored) => base.with_overrides(&stored),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load monitoring settings, using configured thresholds");
                base
            }
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    create_app_with_state(AppState::new(config, pool))
}

/// Builds the router from the route table. Per-route guards run in this
/// order: login rate limit, worker token or session auth, then CSRF.
pub fn create_app_with_state(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let mut router = Router::new();
    for route in routes::table() {
        let RouteSpec { path, handler, flags, .. } = route;
        let mut handler = handler;
        if flags.csrf {
            handler = handler.route_layer(middleware::from_fn_with_state(state.clone(), verify_csrf));
        }
        if flags.auth {
            handler = handler.route_layer(middleware::from_fn(require_auth));
        }
        if flags.worker_token {
            handler = handler.route_layer(middleware::from_fn_with_state(state.clone(), require_worker_token));
        }
        if flags.upload {
            handler = handler.layer(DefaultBodyLimit::max(config.storage.max_upload_request_bytes()));
        }
        if flags.login_limit {
            handler = handler.route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));
        }
        router = router.route(path, handler);
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), load_session))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn_with_state(
            SecurityHeaders {
                hsts: config.security.hsts_enabled,
            },
            security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .with_state(state)
}
