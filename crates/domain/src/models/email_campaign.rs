//! Email campaigns and the outgoing email queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

pub const MAX_CAMPAIGN_EMAILS: usize = 20;
pub const MAX_SEND_AFTER_DAYS: i32 = 365;
const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Queued,
    Sent,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Queued => "queued",
            CampaignStatus::Sent => "sent",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "queued" => Ok(CampaignStatus::Queued),
            "sent" => Ok(CampaignStatus::Sent),
            _ => Err(format!("Unknown campaign status: {}", s)),
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One email of a campaign sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignEmail {
    pub index: u32,
    pub internal_name: String,
    pub subject: String,
    pub preview_text: String,
    pub send_after_days: i32,
    pub primary_cta: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailCampaign {
    pub id: i64,
    pub name: String,
    pub goal: String,
    pub audience: String,
    pub offer: String,
    pub language: String,
    pub tone: String,
    pub num_emails: i32,
    pub emails: Vec<CampaignEmail>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Email draft as submitted; every field is optional and gets a fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailDraft {
    pub index: Option<i64>,
    pub internal_name: Option<String>,
    pub subject: Option<String>,
    pub preview_text: Option<String>,
    pub send_after_days: Option<i64>,
    pub primary_cta: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(max = 255, message = "Campaign name must be at most 255 characters"))]
    #[serde(default)]
    pub name: String,
    #[validate(length(max = 2000, message = "Goal must be at most 2000 characters"))]
    #[serde(default)]
    pub goal: String,
    #[validate(length(max = 2000, message = "Audience must be at most 2000 characters"))]
    #[serde(default)]
    pub audience: String,
    #[validate(length(max = 2000, message = "Offer must be at most 2000 characters"))]
    #[serde(default)]
    pub offer: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tone: String,
    pub num_emails: Option<i64>,
    #[serde(default)]
    pub emails: Vec<EmailDraft>,
}

/// Campaign ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCampaign {
    pub name: String,
    pub goal: String,
    pub audience: String,
    pub offer: String,
    pub language: String,
    pub tone: String,
    pub num_emails: i32,
    pub emails: Vec<CampaignEmail>,
}

/// Two lowercase ASCII letters taken from the front of `raw`, otherwise `en`.
pub fn normalize_language(raw: &str) -> String {
    let code: String = raw.trim().chars().take(2).collect::<String>().to_lowercase();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase()) {
        code
    } else {
        DEFAULT_LANGUAGE.to_string()
    }
}

pub fn clamp_num_emails(requested: Option<i64>) -> i32 {
    requested.unwrap_or(3).clamp(1, MAX_CAMPAIGN_EMAILS as i64) as i32
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Fills in defaults for every draft, keeping at most 20 and at least one.
pub fn normalize_emails(drafts: &[EmailDraft]) -> Vec<CampaignEmail> {
    let mut emails: Vec<CampaignEmail> = drafts
        .iter()
        .take(MAX_CAMPAIGN_EMAILS)
        .enumerate()
        .map(|(i, draft)| {
            let position = i as u32 + 1;
            let index = draft
                .index
                .filter(|n| *n >= 1)
                .map(|n| n.min(u32::MAX as i64) as u32)
                .unwrap_or(position);
            let subject = non_empty(draft.subject.as_deref())
                .unwrap_or_else(|| format!("Subject line for email {}", index));
            let preview_text = non_empty(draft.preview_text.as_deref())
                .unwrap_or_else(|| subject.chars().take(100).collect());
            CampaignEmail {
                index,
                internal_name: non_empty(draft.internal_name.as_deref())
                    .unwrap_or_else(|| format!("Email {}", index)),
                preview_text,
                subject,
                send_after_days: draft.send_after_days.unwrap_or(0).clamp(0, MAX_SEND_AFTER_DAYS as i64) as i32,
                primary_cta: non_empty(draft.primary_cta.as_deref())
                    .unwrap_or_else(|| "Learn More".to_string()),
                body: non_empty(draft.body.as_deref())
                    .unwrap_or_else(|| "<p>Email content goes here.</p>".to_string()),
            }
        })
        .collect();

    if emails.is_empty() {
        emails.push(CampaignEmail {
            index: 1,
            internal_name: "Email 1".to_string(),
            subject: "Welcome".to_string(),
            preview_text: "Welcome to our campaign".to_string(),
            send_after_days: 0,
            primary_cta: "Learn More".to_string(),
            body: "<p>Welcome email content.</p>".to_string(),
        });
    }
    emails
}

impl CreateCampaignRequest {
    pub fn normalize(&self) -> NewCampaign {
        let num_emails = clamp_num_emails(self.num_emails);
        let name = non_empty(Some(&self.name)).unwrap_or_else(|| "Untitled Campaign".to_string());
        let emails = normalize_emails(&self.emails);
        if emails.len() < num_emails as usize {
            tracing::debug!(
                campaign = %name,
                drafted = emails.len(),
                expected = num_emails,
                "Campaign has fewer emails than requested"
            );
        }
        NewCampaign {
            name,
            goal: self.goal.trim().to_string(),
            audience: self.audience.trim().to_string(),
            offer: self.offer.trim().to_string(),
            language: normalize_language(&self.language),
            tone: non_empty(Some(&self.tone)).unwrap_or_else(|| "professional".to_string()),
            num_emails,
            emails,
        }
    }
}

fn validate_recipients(recipients: &[String]) -> Result<(), ValidationError> {
    if recipients.iter().any(|r| !r.trim().is_empty()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("recipients_empty");
        err.message = Some("At least one recipient is required".into());
        Err(err)
    }
}

/// Body of `POST /admin/email-campaigns/:id/send`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendCampaignRequest {
    #[validate(custom(function = "validate_recipients"))]
    pub recipients: Vec<String>,
    /// Sends only this email of the sequence, prefixing subjects with `[TEST]`.
    pub test_email_index: Option<usize>,
}

impl SendCampaignRequest {
    /// Splits recipients into valid addresses (trimmed, lowercased, deduplicated) and an invalid count.
    pub fn partition_recipients(&self) -> (Vec<String>, usize) {
        let mut valid: Vec<String> = Vec::new();
        let mut invalid = 0;
        for raw in &self.recipients {
            let email = raw.trim();
            if email.is_empty() {
                continue;
            }
            if email.validate_email() {
                let email = email.to_lowercase();
                if !valid.contains(&email) {
                    valid.push(email);
                }
            } else {
                invalid += 1;
            }
        }
        (valid, invalid)
    }
}

/// Expands a campaign into queue rows: one per recipient and email.
pub fn plan_deliveries(
    campaign: &EmailCampaign,
    recipients: &[String],
    from_email: &str,
    test_email_index: Option<usize>,
    now: DateTime<Utc>,
) -> Vec<NewQueuedEmail> {
    let (emails, prefix): (Vec<&CampaignEmail>, &str) = match test_email_index {
        Some(i) => {
            let chosen = campaign.emails.get(i).or_else(|| campaign.emails.first());
            (chosen.into_iter().collect(), "[TEST] ")
        }
        None => (campaign.emails.iter().collect(), ""),
    };

    let mut rows = Vec::with_capacity(emails.len() * recipients.len());
    for email in emails {
        let scheduled_at = if test_email_index.is_some() {
            now
        } else {
            now + Duration::days(i64::from(email.send_after_days))
        };
        for to in recipients {
            rows.push(NewQueuedEmail {
                to_email: to.clone(),
                from_email: from_email.to_string(),
                subject: format!("{}{}", prefix, email.subject),
                body: email.body.clone(),
                campaign_id: Some(campaign.id),
                scheduled_at,
            });
        }
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    #[default]
    Pending,
    Processing,
    Sent,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Sent => "sent",
            QueueStatus::Failed => "failed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "sent" => Ok(QueueStatus::Sent),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(format!("Unknown queue status: {}", s)),
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEmail {
    pub id: i64,
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub body: String,
    pub status: QueueStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub campaign_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl QueuedEmail {
    /// Sent rows are final.
    pub fn can_retry(&self) -> bool {
        self.status != QueueStatus::Sent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQueuedEmail {
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub body: String,
    pub campaign_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
}

/// Query string of the email queue admin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQueueQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl EmailQueueQuery {
    /// Unknown statuses mean "all".
    pub fn status(&self) -> Option<QueueStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn search(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| q.chars().take(200).collect())
    }
}

/// Per-status counts for the queue dashboard.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct QueueCounts {
    pub pending: i64,
    pub processing: i64,
    pub sent: i64,
    pub failed: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campaign(emails: Vec<CampaignEmail>) -> EmailCampaign {
        EmailCampaign {
            id: 7,
            name: "Trial".into(),
            goal: String::new(),
            audience: String::new(),
            offer: String::new(),
            language: "en".into(),
            tone: "friendly".into(),
            num_emails: emails.len() as i32,
            emails,
            status: CampaignStatus::Draft,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("DE"), "de");
        assert_eq!(normalize_language(" fr-CA "), "fr");
        assert_eq!(normalize_language("1x"), "en");
        assert_eq!(normalize_language("e"), "en");
        assert_eq!(normalize_language(""), "en");
    }

    #[test]
    fn test_clamp_num_emails() {
        assert_eq!(clamp_num_emails(Some(0)), 1);
        assert_eq!(clamp_num_emails(Some(50)), 20);
        assert_eq!(clamp_num_emails(Some(5)), 5);
        assert_eq!(clamp_num_emails(None), 3);
    }

    #[test]
    fn test_normalize_emails_fills_defaults() {
        let emails = normalize_emails(&[EmailDraft {
            subject: Some("  Hello there ".into()),
            send_after_days: Some(900),
            ..Default::default()
        }]);
        assert_eq!(emails.len(), 1);
        let email = &emails[0];
        assert_eq!(email.index, 1);
        assert_eq!(email.internal_name, "Email 1");
        assert_eq!(email.subject, "Hello there");
        assert_eq!(email.preview_text, "Hello there");
        assert_eq!(email.send_after_days, 365);
        assert_eq!(email.primary_cta, "Learn More");
        assert_eq!(email.body, "<p>Email content goes here.</p>");
    }

    #[test]
    fn test_normalize_emails_empty_gets_welcome() {
        let emails = normalize_emails(&[]);
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].subject, "Welcome");
    }

    #[test]
    fn test_normalize_emails_caps_at_twenty() {
        let drafts = vec![EmailDraft::default(); 30];
        let emails = normalize_emails(&drafts);
        assert_eq!(emails.len(), MAX_CAMPAIGN_EMAILS);
        assert_eq!(emails[19].subject, "Subject line for email 20");
    }

    #[test]
    fn test_request_normalize() {
        let req = CreateCampaignRequest {
            name: "   ".into(),
            goal: " convert ".into(),
            audience: String::new(),
            offer: String::new(),
            language: "Spanish".into(),
            tone: String::new(),
            num_emails: Some(-4),
            emails: vec![],
        };
        let new = req.normalize();
        assert_eq!(new.name, "Untitled Campaign");
        assert_eq!(new.goal, "convert");
        assert_eq!(new.language, "sp");
        assert_eq!(new.tone, "professional");
        assert_eq!(new.num_emails, 1);
    }

    #[test]
    fn test_partition_recipients() {
        let req = SendCampaignRequest {
            recipients: vec![
                "A@Example.com".into(),
                "a@example.com".into(),
                "".into(),
                "broken".into(),
                "b@example.org".into(),
            ],
            test_email_index: None,
        };
        let (valid, invalid) = req.partition_recipients();
        assert_eq!(valid, vec!["a@example.com", "b@example.org"]);
        assert_eq!(invalid, 1);
    }

    #[test]
    fn test_plan_deliveries_is_cartesian_and_scheduled() {
        let mut emails = normalize_emails(&[EmailDraft::default(), EmailDraft::default()]);
        emails[1].send_after_days = 3;
        let c = campaign(emails);
        let now = Utc::now();
        let rows = plan_deliveries(&c, &["x@a.io".into(), "y@a.io".into()], "no-reply@a.io", None, now);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.campaign_id == Some(7)));
        assert_eq!(rows[2].scheduled_at, now + Duration::days(3));
    }

    #[test]
    fn test_plan_deliveries_test_send() {
        let c = campaign(normalize_emails(&[EmailDraft::default(), EmailDraft::default()]));
        let now = Utc::now();
        let rows = plan_deliveries(&c, &["x@a.io".into()], "f@a.io", Some(9), now);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "[TEST] Subject line for email 1");
        assert_eq!(rows[0].scheduled_at, now);
    }

    #[test]
    fn test_queue_query_status_fallback() {
        let q = EmailQueueQuery {
            status: Some("bogus".into()),
            ..Default::default()
        };
        assert_eq!(q.status(), None);
        let q = EmailQueueQuery {
            status: Some("failed".into()),
            q: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(q.status(), Some(QueueStatus::Failed));
        assert_eq!(q.search(), None);
    }
}
