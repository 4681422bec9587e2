//! Domain services for Jessie CMS.
//!
//! Services contain business logic that operates on domain models.

pub mod ar_marker;
pub mod monitoring;
pub mod notification;
pub mod notification_center;
pub mod security;

pub use ar_marker::{ArMarker, ArMarkerError};
pub use monitoring::{
    bucket_heartbeats, HeartbeatHistory, HistoryWindow, MonitoringThresholds, WorkerAlert,
    WorkerHealth,
};
pub use notification::{
    CampaignQueued, Channel, ChannelSink, ContactFormSubmitted, DatabaseMessage, DeliveryResult,
    DispatchReport, MailMessage, Notification, NotificationDispatcher, Recipient, RecordingSink,
    SecurityAlert, UserWelcome, WorkerHeartbeatMissed, WorkerResourceAlert,
};
pub use security::{security_events, SecurityEventBuilder};
