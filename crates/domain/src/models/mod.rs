//! Domain models for Jessie CMS.

pub mod album;
pub mod ar_marker;
pub mod email_campaign;
pub mod notification;
pub mod page;
pub mod security_log;
pub mod session;
pub mod setting;
pub mod user;
pub mod worker;

pub use album::{Album, AlbumImage, DisplayTemplate};
pub use ar_marker::ArMarkerRecord;
pub use email_campaign::{CampaignStatus, EmailCampaign, QueueStatus, QueuedEmail};
pub use notification::{NotificationLevel, StoredNotification};
pub use page::{Page, PageStatus};
pub use security_log::{BlockedIp, SecurityEvent, Severity};
pub use session::Session;
pub use setting::Setting;
pub use user::{Role, User};
pub use worker::{Heartbeat, Worker, WorkerNotification, WorkerNotificationType};
