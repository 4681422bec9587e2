//! Notification layer.
//!
//! A [`Notification`] describes one event and how it looks on each channel.
//! The [`NotificationDispatcher`] hands it to a [`ChannelSink`] per channel
//! named by [`Notification::via`]. Delivery problems are logged and reported,
//! never returned to the caller as errors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::models::notification::NotificationLevel;
use crate::models::security_log::Severity;
use crate::services::monitoring::WorkerAlert;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Mail,
    Database,
    Broadcast,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Mail => "mail",
            Channel::Database => "database",
            Channel::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who a notification is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: Option<i64>,
    pub email: Option<String>,
    pub name: String,
}

impl Recipient {
    pub fn user(user_id: i64, name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: Some(user_id),
            email,
            name: name.into(),
        }
    }

    /// A bare address with no account, such as a contact form recipient.
    pub fn address(email: impl Into<String>) -> Self {
        let email = email.into();
        Self {
            user_id: None,
            name: email.clone(),
            email: Some(email),
        }
    }

    pub fn has_email(&self) -> bool {
        self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Mail content built line by line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MailMessage {
    pub subject: String,
    pub greeting: Option<String>,
    pub lines: Vec<String>,
    pub action: Option<(String, String)>,
    pub reply_to: Option<String>,
}

impl MailMessage {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn action(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.action = Some((label.into(), url.into()));
        self
    }

    pub fn reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if let Some(greeting) = &self.greeting {
            out.push_str(greeting);
            out.push_str("\n\n");
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        if let Some((label, url)) = &self.action {
            out.push_str(&format!("\n{}: {}\n", label, url));
        }
        out
    }

    pub fn render_html(&self) -> String {
        let mut out = String::new();
        if let Some(greeting) = &self.greeting {
            out.push_str(&format!("<p><strong>{}</strong></p>", escape_html(greeting)));
        }
        for line in &self.lines {
            out.push_str(&format!("<p>{}</p>", escape_html(line)));
        }
        if let Some((label, url)) = &self.action {
            out.push_str(&format!(
                "<p><a href=\"{}\">{}</a></p>",
                escape_html(url),
                escape_html(label)
            ));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseMessage {
    pub level: NotificationLevel,
    pub message: String,
    pub data: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastMessage {
    pub event: String,
    pub payload: JsonValue,
}

pub trait Notification: Send + Sync {
    /// Stable snake_case name, stored as the notification type.
    fn kind(&self) -> &'static str;

    fn via(&self, recipient: &Recipient) -> Vec<Channel>;

    fn to_mail(&self, recipient: &Recipient) -> Option<MailMessage>;

    fn to_database(&self) -> DatabaseMessage;

    fn to_broadcast(&self) -> BroadcastMessage {
        let db = self.to_database();
        BroadcastMessage {
            event: self.kind().to_string(),
            payload: json!({
                "level": db.level,
                "message": db.message,
                "data": db.data,
            }),
        }
    }
}

/// Database and broadcast always, mail when the recipient has an address.
fn admin_channels(recipient: &Recipient, mail: bool) -> Vec<Channel> {
    let mut channels = vec![Channel::Database, Channel::Broadcast];
    if mail && recipient.has_email() {
        channels.insert(0, Channel::Mail);
    }
    channels
}

#[derive(Debug, Clone)]
pub struct WorkerHeartbeatMissed {
    pub worker_id: i64,
    pub worker_name: String,
    pub minutes_since: Option<i64>,
    pub dashboard_url: String,
}

impl Notification for WorkerHeartbeatMissed {
    fn kind(&self) -> &'static str {
        "worker_heartbeat_missed"
    }

    fn via(&self, recipient: &Recipient) -> Vec<Channel> {
        admin_channels(recipient, true)
    }

    fn to_mail(&self, recipient: &Recipient) -> Option<MailMessage> {
        Some(
            MailMessage::new(format!("Worker offline: {}", self.worker_name))
                .greeting(format!("Hello {},", recipient.name))
                .line(self.message())
                .line("The worker has been marked offline until it reports again.")
                .action("Open worker dashboard", self.dashboard_url.clone()),
        )
    }

    fn to_database(&self) -> DatabaseMessage {
        DatabaseMessage {
            level: NotificationLevel::Warning,
            message: self.message(),
            data: json!({
                "worker_id": self.worker_id,
                "worker_name": self.worker_name,
                "minutes_since": self.minutes_since,
            }),
        }
    }
}

impl WorkerHeartbeatMissed {
    fn message(&self) -> String {
        WorkerAlert::HeartbeatMissed {
            minutes_since: self.minutes_since,
        }
        .message(&self.worker_name)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerResourceAlert {
    pub worker_id: i64,
    pub worker_name: String,
    pub alert: WorkerAlert,
}

impl Notification for WorkerResourceAlert {
    fn kind(&self) -> &'static str {
        "worker_resource_alert"
    }

    fn via(&self, recipient: &Recipient) -> Vec<Channel> {
        admin_channels(recipient, false)
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        None
    }

    fn to_database(&self) -> DatabaseMessage {
        let level = match self.alert {
            WorkerAlert::Failing { .. } => NotificationLevel::Error,
            _ => NotificationLevel::Warning,
        };
        DatabaseMessage {
            level,
            message: self.alert.message(&self.worker_name),
            data: json!({
                "worker_id": self.worker_id,
                "worker_name": self.worker_name,
                "alert": self.alert,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityAlert {
    pub event_type: String,
    pub severity: Severity,
    pub ip_address: Option<String>,
    pub details: String,
}

impl Notification for SecurityAlert {
    fn kind(&self) -> &'static str {
        "security_alert"
    }

    /// Mail only goes out for error and critical events.
    fn via(&self, recipient: &Recipient) -> Vec<Channel> {
        admin_channels(recipient, self.severity >= Severity::Error)
    }

    fn to_mail(&self, recipient: &Recipient) -> Option<MailMessage> {
        let mut mail = MailMessage::new(format!(
            "[{}] Security alert: {}",
            self.severity.as_str().to_uppercase(),
            self.event_type
        ))
        .greeting(format!("Hello {},", recipient.name))
        .line(self.details.clone());
        if let Some(ip) = &self.ip_address {
            mail = mail.line(format!("Source IP: {}", ip));
        }
        Some(mail)
    }

    fn to_database(&self) -> DatabaseMessage {
        let level = match self.severity {
            Severity::Info => NotificationLevel::Info,
            Severity::Warning => NotificationLevel::Warning,
            Severity::Error | Severity::Critical => NotificationLevel::Error,
        };
        DatabaseMessage {
            level,
            message: self.details.clone(),
            data: json!({
                "event_type": self.event_type,
                "severity": self.severity,
                "ip_address": self.ip_address,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserWelcome {
    pub username: String,
    pub login_url: String,
}

impl Notification for UserWelcome {
    fn kind(&self) -> &'static str {
        "user_welcome"
    }

    fn via(&self, recipient: &Recipient) -> Vec<Channel> {
        if recipient.has_email() {
            vec![Channel::Mail, Channel::Database]
        } else {
            vec![Channel::Database]
        }
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        Some(
            MailMessage::new("Your admin account is ready")
                .greeting(format!("Welcome, {}!", self.username))
                .line("An administrator created an account for you.")
                .action("Sign in", self.login_url.clone()),
        )
    }

    fn to_database(&self) -> DatabaseMessage {
        DatabaseMessage {
            level: NotificationLevel::Info,
            message: format!("User {} was created", self.username),
            data: json!({ "username": self.username }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactFormSubmitted {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl Notification for ContactFormSubmitted {
    fn kind(&self) -> &'static str {
        "contact_form_submitted"
    }

    fn via(&self, recipient: &Recipient) -> Vec<Channel> {
        if recipient.has_email() {
            vec![Channel::Mail, Channel::Database]
        } else {
            vec![Channel::Database]
        }
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        let subject = self
            .subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("New contact form message");
        Some(
            MailMessage::new(subject)
                .line(format!("From: {} <{}>", self.name, self.email))
                .line(self.message.clone())
                .reply_to(self.email.clone()),
        )
    }

    fn to_database(&self) -> DatabaseMessage {
        DatabaseMessage {
            level: NotificationLevel::Info,
            message: format!("Contact form message from {}", self.name),
            data: json!({
                "name": self.name,
                "email": self.email,
                "subject": self.subject,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampaignQueued {
    pub campaign_id: i64,
    pub campaign_name: String,
    pub queued: usize,
    pub invalid: usize,
}

impl Notification for CampaignQueued {
    fn kind(&self) -> &'static str {
        "campaign_queued"
    }

    fn via(&self, _recipient: &Recipient) -> Vec<Channel> {
        vec![Channel::Database, Channel::Broadcast]
    }

    fn to_mail(&self, _recipient: &Recipient) -> Option<MailMessage> {
        None
    }

    fn to_database(&self) -> DatabaseMessage {
        DatabaseMessage {
            level: NotificationLevel::System,
            message: format!(
                "Campaign \"{}\" queued {} emails",
                self.campaign_name, self.queued
            ),
            data: json!({
                "campaign_id": self.campaign_id,
                "queued": self.queued,
                "invalid": self.invalid,
            }),
        }
    }
}

/// Result of handing a notification to one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryResult {
    Sent,
    /// The channel had nothing to do, such as mail without an address.
    Skipped,
    Failed(String),
}

impl DeliveryResult {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryResult::Sent => "sent",
            DeliveryResult::Skipped => "skipped",
            DeliveryResult::Failed(_) => "failed",
        }
    }
}

#[async_trait::async_trait]
pub trait ChannelSink: Send + Sync {
    fn channel(&self) -> Channel;

    async fn deliver(&self, notification: &dyn Notification, recipient: &Recipient) -> DeliveryResult;
}

/// Outcome counts per channel for one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
    /// `(channel, result)` per delivery attempt.
    #[serde(skip)]
    pub outcomes: Vec<(Channel, &'static str)>,
}

impl DispatchReport {
    fn record(&mut self, channel: Channel, result: &DeliveryResult) {
        match result {
            DeliveryResult::Sent => self.sent += 1,
            DeliveryResult::Skipped => self.skipped += 1,
            DeliveryResult::Failed(_) => self.failed += 1,
        }
        self.outcomes.push((channel, result.label()));
    }
}

#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    sinks: BTreeMap<Channel, Arc<dyn ChannelSink>>,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("channels", &self.sinks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink, replacing any earlier sink for the same channel.
    pub fn with_sink(mut self, sink: Arc<dyn ChannelSink>) -> Self {
        self.sinks.insert(sink.channel(), sink);
        self
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.sinks.keys().copied().collect()
    }

    /// Sends `notification` to every recipient on the channels it asks for.
    ///
    /// Broadcast is recipient independent and goes out at most once.
    pub async fn send(&self, notification: &dyn Notification, recipients: &[Recipient]) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut broadcast_done = false;

        for recipient in recipients {
            for channel in notification.via(recipient) {
                if channel == Channel::Broadcast {
                    if broadcast_done {
                        continue;
                    }
                    broadcast_done = true;
                }

                let result = match self.sinks.get(&channel) {
                    Some(sink) => sink.deliver(notification, recipient).await,
                    None => {
                        tracing::debug!(
                            kind = notification.kind(),
                            channel = %channel,
                            "No sink registered for channel"
                        );
                        DeliveryResult::Skipped
                    }
                };

                if let DeliveryResult::Failed(reason) = &result {
                    tracing::warn!(
                        kind = notification.kind(),
                        channel = %channel,
                        recipient = %recipient.name,
                        error = %reason,
                        "Notification delivery failed"
                    );
                }
                report.record(channel, &result);
            }
        }

        tracing::debug!(
            kind = notification.kind(),
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            "Notification dispatched"
        );
        report
    }
}

/// One delivery captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDelivery {
    pub channel: Channel,
    pub kind: &'static str,
    pub recipient: Recipient,
    pub mail: Option<MailMessage>,
    pub database: DatabaseMessage,
}

/// Sink that keeps every delivery in memory; used in tests and local runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    channel: Option<Channel>,
    fail_with: Option<String>,
    deliveries: Mutex<Vec<RecordedDelivery>>,
}

impl RecordingSink {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel: Some(channel),
            ..Default::default()
        }
    }

    /// A sink whose deliveries always fail.
    pub fn failing(channel: Channel, reason: impl Into<String>) -> Self {
        Self {
            channel: Some(channel),
            fail_with: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ChannelSink for RecordingSink {
    fn channel(&self) -> Channel {
        self.channel.unwrap_or(Channel::Database)
    }

    async fn deliver(&self, notification: &dyn Notification, recipient: &Recipient) -> DeliveryResult {
        if let Some(reason) = &self.fail_with {
            return DeliveryResult::Failed(reason.clone());
        }
        let mail = if self.channel() == Channel::Mail {
            match notification.to_mail(recipient) {
                Some(mail) => Some(mail),
                None => return DeliveryResult::Skipped,
            }
        } else {
            None
        };
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(RecordedDelivery {
                channel: self.channel(),
                kind: notification.kind(),
                recipient: recipient.clone(),
                mail,
                database: notification.to_database(),
            });
        }
        DeliveryResult::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Recipient {
        Recipient::user(1, "admin", Some("admin@example.com".into()))
    }

    fn no_mail() -> Recipient {
        Recipient::user(2, "editor", None)
    }

    fn recording_dispatcher() -> (NotificationDispatcher, Arc<RecordingSink>, Arc<RecordingSink>, Arc<RecordingSink>) {
        let mail = Arc::new(RecordingSink::new(Channel::Mail));
        let db = Arc::new(RecordingSink::new(Channel::Database));
        let broadcast = Arc::new(RecordingSink::new(Channel::Broadcast));
        let dispatcher = NotificationDispatcher::new()
            .with_sink(mail.clone())
            .with_sink(db.clone())
            .with_sink(broadcast.clone());
        (dispatcher, mail, db, broadcast)
    }

    fn heartbeat() -> WorkerHeartbeatMissed {
        WorkerHeartbeatMissed {
            worker_id: 3,
            worker_name: "indexer".into(),
            minutes_since: Some(9),
            dashboard_url: "http://localhost/admin/workers".into(),
        }
    }

    #[test]
    fn test_via_depends_on_email() {
        let n = heartbeat();
        assert_eq!(
            n.via(&admin()),
            vec![Channel::Mail, Channel::Database, Channel::Broadcast]
        );
        assert_eq!(n.via(&no_mail()), vec![Channel::Database, Channel::Broadcast]);
    }

    #[test]
    fn test_security_alert_mails_only_severe_events() {
        let mut alert = SecurityAlert {
            event_type: "login_failed".into(),
            severity: Severity::Warning,
            ip_address: Some("10.0.0.9".into()),
            details: "3 failed logins".into(),
        };
        assert!(!alert.via(&admin()).contains(&Channel::Mail));
        alert.severity = Severity::Critical;
        assert!(alert.via(&admin()).contains(&Channel::Mail));
        let mail = alert.to_mail(&admin()).unwrap();
        assert_eq!(mail.subject, "[CRITICAL] Security alert: login_failed");
        assert!(mail.render_text().contains("Source IP: 10.0.0.9"));
        assert_eq!(alert.to_database().level, NotificationLevel::Error);
    }

    #[test]
    fn test_mail_html_is_escaped() {
        let n = ContactFormSubmitted {
            name: "<b>Eve</b>".into(),
            email: "eve@example.com".into(),
            subject: None,
            message: "hi & bye".into(),
        };
        let mail = n.to_mail(&Recipient::address("owner@example.com")).unwrap();
        assert_eq!(mail.subject, "New contact form message");
        assert_eq!(mail.reply_to.as_deref(), Some("eve@example.com"));
        let html = mail.render_html();
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(html.contains("hi &amp; bye"));
    }

    #[test]
    fn test_default_broadcast_payload() {
        let b = heartbeat().to_broadcast();
        assert_eq!(b.event, "worker_heartbeat_missed");
        assert_eq!(b.payload["level"], "warning");
        assert_eq!(b.payload["data"]["worker_id"], 3);
    }

    #[tokio::test]
    async fn test_dispatch_routes_per_channel() {
        let (dispatcher, mail, db, broadcast) = recording_dispatcher();
        let report = dispatcher.send(&heartbeat(), &[admin(), no_mail()]).await;

        assert_eq!(mail.deliveries().len(), 1);
        assert_eq!(db.deliveries().len(), 2);
        // broadcast goes out once per notification
        assert_eq!(broadcast.deliveries().len(), 1);
        assert_eq!(report.sent, 4);
        assert_eq!(report.failed, 0);

        let sent_mail = mail.deliveries()[0].mail.clone().unwrap();
        assert_eq!(sent_mail.subject, "Worker offline: indexer");
    }

    #[tokio::test]
    async fn test_dispatch_never_fails_caller() {
        let dispatcher = NotificationDispatcher::new()
            .with_sink(Arc::new(RecordingSink::failing(Channel::Database, "db down")));
        let n = CampaignQueued {
            campaign_id: 1,
            campaign_name: "Spring".into(),
            queued: 10,
            invalid: 0,
        };
        let report = dispatcher.send(&n, &[admin()]).await;
        assert_eq!(report.failed, 1);
        // no broadcast sink registered
        assert_eq!(report.skipped, 1);
        assert_eq!(
            report.outcomes,
            vec![(Channel::Database, "failed"), (Channel::Broadcast, "skipped")]
        );
    }

    #[tokio::test]
    async fn test_mail_sink_skips_notifications_without_mail() {
        let mail = Arc::new(RecordingSink::new(Channel::Mail));
        let n = WorkerResourceAlert {
            worker_id: 1,
            worker_name: "w".into(),
            alert: WorkerAlert::HighCpu { usage: 99.0 },
        };
        assert_eq!(mail.deliver(&n, &admin()).await, DeliveryResult::Skipped);
        assert!(mail.deliveries().is_empty());
    }

    #[test]
    fn test_welcome_and_campaign_messages() {
        let welcome = UserWelcome {
            username: "jo".into(),
            login_url: "http://x/admin/login".into(),
        };
        assert_eq!(welcome.via(&no_mail()), vec![Channel::Database]);
        assert_eq!(welcome.to_database().message, "User jo was created");

        let queued = CampaignQueued {
            campaign_id: 4,
            campaign_name: "Trial".into(),
            queued: 6,
            invalid: 1,
        };
        assert_eq!(queued.to_database().message, "Campaign \"Trial\" queued 6 emails");
        assert_eq!(queued.to_database().level, NotificationLevel::System);
    }
}
