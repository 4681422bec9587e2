//! Shared utilities for the Jessie CMS backend.
//!
//! Used by every other crate in the workspace:
//! - Hashing, random tokens and HMAC signatures
//! - Session-bound CSRF tokens
//! - Password hashing with Argon2id
//! - Offset pagination
//! - Slugs and common validators

pub mod crypto;
pub mod csrf;
pub mod pagination;
pub mod password;
pub mod slug;
pub mod validation;
