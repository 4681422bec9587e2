//! Database entity definitions.
//!
//! Entities map one-to-one to query result rows. Text status columns are
//! parsed into domain enums in the `From` conversions.

pub mod album;
pub mod content;
pub mod security_log;
pub mod user;
pub mod worker;

pub use album::{AlbumEntity, AlbumImageEntity};
pub use content::{
    ArMarkerEntity, EmailCampaignEntity, PageEntity, QueuedEmailEntity, SettingEntity,
};
pub use security_log::{BlockedIpEntity, CountRow, NotificationEntity, SecurityEventEntity};
pub use user::{SessionEntity, UserEntity};
pub use worker::{HeartbeatEntity, WorkerEntity, WorkerNotificationEntity};
