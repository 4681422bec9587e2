//! Domain layer for the Jessie CMS backend.
//!
//! This crate contains:
//! - Domain models (albums, users, workers, security logs, settings, campaigns, pages)
//! - The notification layer and its channel sinks
//! - Worker monitoring, security event building and AR marker generation

pub mod models;
pub mod services;
