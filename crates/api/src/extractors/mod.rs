//! Custom Axum extractors.

pub mod client;
pub mod session;

pub use client::{client_ip, ClientInfo};
pub use session::{AuthUser, CurrentSession, SessionContext};
