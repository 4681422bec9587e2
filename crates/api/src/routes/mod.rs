//! HTTP route handlers and the route table.
//!
//! Every endpoint is declared once in [`table`] together with the guards it
//! needs; `app::create_app_with_state` turns the flags into route layers.

pub mod ar_markers;
pub mod auth;
pub mod campaigns;
pub mod galleries;
pub mod health;
pub mod notifications;
pub mod public;
pub mod security;
pub mod settings;
pub mod theme_builder;
pub mod users;
pub mod workers;

use axum::{
    handler::Handler,
    http::Method,
    routing::{self, MethodRouter},
};
use shared::csrf::issue_token;

use crate::app::AppState;
use crate::extractors::AuthUser;
use crate::middleware::metrics_handler;

/// Guards applied to a single route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteFlags {
    /// Logged-in session required; viewers may only read.
    pub auth: bool,
    /// `X-CSRF-Token` must match the session.
    pub csrf: bool,
    /// `X-Worker-Token` must match the configured worker token.
    pub worker_token: bool,
    /// Per-IP login rate limit.
    pub login_limit: bool,
    /// Multipart upload; the body limit follows `storage.max_upload_bytes`.
    pub upload: bool,
}

/// One row of the route table.
pub struct RouteSpec {
    pub method: Method,
    pub path: &'static str,
    pub handler: MethodRouter<AppState>,
    pub flags: RouteFlags,
}

impl RouteSpec {
    pub fn get<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::GET,
            path,
            handler: routing::get(handler),
            flags: RouteFlags::default(),
        }
    }

    pub fn post<H, T>(path: &'static str, handler: H) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method: Method::POST,
            path,
            handler: routing::post(handler),
            flags: RouteFlags::default(),
        }
    }

    pub fn auth(mut self) -> Self {
        self.flags.auth = true;
        self
    }

    pub fn csrf(mut self) -> Self {
        self.flags.csrf = true;
        self
    }

    /// Authenticated, CSRF-checked write.
    pub fn admin_write(self) -> Self {
        self.auth().csrf()
    }

    pub fn worker_token(mut self) -> Self {
        self.flags.worker_token = true;
        self
    }

    pub fn login_limit(mut self) -> Self {
        self.flags.login_limit = true;
        self
    }

    pub fn upload(mut self) -> Self {
        self.flags.upload = true;
        self
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpec")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("flags", &self.flags)
            .finish()
    }
}

/// CSRF token for the request's session, handed to forms and the SPA.
pub fn csrf_token(state: &AppState, token_hash: &str) -> String {
    issue_token(&state.config.security.csrf_secret, token_hash)
}

pub(crate) fn csrf_for(state: &AppState, user: &AuthUser) -> String {
    csrf_token(state, &user.token_hash)
}

/// The complete route table.
pub fn table() -> Vec<RouteSpec> {
    use RouteSpec as R;

    vec![
        // Session
        R::get("/admin/login", auth::login_form),
        R::post("/admin/login", auth::login).csrf().login_limit(),
        R::get("/admin/logout", auth::logout).auth(),
        R::get("/admin/session", auth::session).auth(),
        // Galleries
        R::get("/admin/galleries", galleries::index).auth(),
        R::get("/admin/galleries/create", galleries::create_form).auth(),
        R::post("/admin/galleries", galleries::store).admin_write(),
        R::get("/admin/galleries/:id/edit", galleries::edit).auth(),
        R::post("/admin/galleries/:id", galleries::update).admin_write(),
        R::post("/admin/galleries/:id/delete", galleries::destroy).admin_write(),
        R::get("/admin/galleries/:id/images", galleries::images).auth(),
        R::post("/admin/galleries/:id/upload", galleries::upload).admin_write().upload(),
        R::post("/admin/galleries/:id/reorder", galleries::reorder).admin_write(),
        R::post("/admin/galleries/:id/images/:image_id/title", galleries::update_image_title).admin_write(),
        R::post("/admin/galleries/:id/images/:image_id/delete", galleries::delete_image).admin_write(),
        // Users
        R::get("/admin/users", users::index).auth(),
        R::get("/admin/users/create", users::create_form).auth(),
        R::post("/admin/users", users::store).admin_write(),
        R::get("/admin/users/:id/edit", users::edit).auth(),
        R::post("/admin/users/:id", users::update).admin_write(),
        R::post("/admin/users/:id/delete", users::destroy).admin_write(),
        // Workers
        R::get("/admin/workers", workers::index).auth(),
        R::get("/admin/workers/create", workers::create_form).auth(),
        R::post("/admin/workers", workers::store).admin_write(),
        R::get("/admin/workers/:id/edit", workers::edit).auth(),
        R::post("/admin/workers/:id", workers::update).admin_write(),
        R::post("/admin/workers/:id/delete", workers::destroy).admin_write(),
        R::get("/api/workers/status", workers::status).auth(),
        R::get("/api/workers/heartbeat-history", workers::heartbeat_history).auth(),
        R::post("/api/workers/:id/heartbeat", workers::heartbeat).worker_token(),
        R::get("/admin/workers/notifications", workers::notifications).auth(),
        R::post("/admin/workers/notifications/read-all", workers::mark_all_notifications_read).admin_write(),
        R::post("/admin/workers/notifications/:id/read", workers::mark_notification_read).admin_write(),
        // Settings
        R::get("/admin/settings", settings::show).auth(),
        R::post("/admin/settings", settings::update).admin_write(),
        // Notification center
        R::get("/admin/notifications", notifications::index).auth(),
        R::get("/admin/notifications/unread-count", notifications::unread_count).auth(),
        R::get("/admin/notifications/stream", notifications::stream).auth(),
        R::post("/admin/notifications/read-all", notifications::mark_all_read).admin_write(),
        R::post("/admin/notifications/:id/read", notifications::mark_read).admin_write(),
        R::post("/admin/notifications/:id/delete", notifications::destroy).admin_write(),
        // Security
        R::get("/admin/security/logs", security::logs).auth(),
        R::get("/admin/security/logs/stats", security::stats).auth(),
        R::get("/admin/security/logs/export", security::export).auth(),
        R::get("/admin/security/blocked-ips", security::blocked_ips).auth(),
        R::post("/admin/security/blocked-ips", security::block_ip).admin_write(),
        R::post("/admin/security/blocked-ips/:id/delete", security::unblock_ip).admin_write(),
        // Email campaigns and queue
        R::get("/admin/email-campaigns", campaigns::index).auth(),
        R::post("/admin/email-campaigns", campaigns::store).admin_write(),
        R::get("/admin/email-campaigns/:id", campaigns::show).auth(),
        R::post("/admin/email-campaigns/:id/send", campaigns::send).admin_write(),
        R::post("/admin/email-campaigns/:id/delete", campaigns::destroy).admin_write(),
        R::get("/admin/email-queue", campaigns::queue).auth(),
        R::post("/admin/email-queue/:id/retry", campaigns::retry).admin_write(),
        R::post("/admin/email-queue/:id/delete", campaigns::queue_destroy).admin_write(),
        // AR markers
        R::get("/admin/ar-markers", ar_markers::index).auth(),
        R::post("/admin/ar-markers", ar_markers::store).admin_write(),
        R::get("/admin/ar-markers/:id/image", ar_markers::image).auth(),
        R::post("/admin/ar-markers/:id/delete", ar_markers::destroy).admin_write(),
        // Theme builder
        R::get("/admin/theme-builder/modules", theme_builder::modules).auth(),
        R::get("/admin/theme-builder/modules/:slug", theme_builder::module).auth(),
        R::post("/admin/theme-builder/render", theme_builder::render).admin_write(),
        R::post("/admin/theme-builder/render-module", theme_builder::render_module).admin_write(),
        R::get("/admin/theme-builder/pages", theme_builder::pages).auth(),
        R::get("/admin/theme-builder/pages/create", theme_builder::create_page_form).auth(),
        R::post("/admin/theme-builder/pages", theme_builder::store_page).admin_write(),
        R::get("/admin/theme-builder/pages/:id/edit", theme_builder::edit_page).auth(),
        R::post("/admin/theme-builder/pages/:id", theme_builder::update_page).admin_write(),
        R::post("/admin/theme-builder/pages/:id/delete", theme_builder::destroy_page).admin_write(),
        R::get("/admin/theme-builder/settings", theme_builder::settings).auth(),
        R::post("/admin/theme-builder/settings", theme_builder::update_settings).admin_write(),
        // Public site
        R::get("/gallery/:slug", public::gallery),
        R::get("/page/:slug", public::page),
        R::get("/search", public::search),
        R::get("/uploads/*path", public::upload),
        R::post("/forms/contact", public::contact),
        R::post("/forms/signup", public::signup),
        // Probes
        R::get("/api/health", health::health_check),
        R::get("/api/health/live", health::live),
        R::get("/api/health/ready", health::ready),
        R::get("/metrics", metrics_handler),
    ]
}
