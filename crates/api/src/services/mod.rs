//! Services shared by handlers and background jobs.

pub mod bootstrap;
pub mod cookies;
pub mod email;
pub mod notifications;
pub mod security;
pub mod storage;

pub use cookies::CookieHelper;
pub use email::{EmailError, EmailMessage, EmailService};
pub use notifications::{BroadcastEvent, BroadcastHub, Notifier};
pub use security::SecurityLog;
pub use storage::{Storage, StorageError, StoredFile};
