//! Repository implementations, one per aggregate.

pub mod album;
pub mod ar_marker;
pub mod email;
pub mod notification;
pub mod page;
pub mod security_log;
pub mod setting;
pub mod user;
pub mod worker;

pub use album::{AlbumInput, AlbumRepository, NewAlbumImage};
pub use ar_marker::ArMarkerRepository;
pub use email::{CampaignRepository, EmailQueueRepository};
pub use notification::{MatchCounts, NotificationRepository};
pub use page::{PageInput, PageRepository};
pub use security_log::SecurityLogRepository;
pub use setting::SettingRepository;
pub use user::{SessionRepository, UserInput, UserRepository, UserWriteError};
pub use worker::{WorkerInput, WorkerRepository};
