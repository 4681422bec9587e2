//! Persistence layer for Jessie CMS.
//!
//! - Connection pool and embedded migrations (`db`)
//! - Row mappings (`entities`)
//! - One repository per aggregate (`repositories`)
//! - Query timing metrics (`metrics`)

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use db::{create_pool, is_unique_violation, run_migrations, DatabaseConfig};
