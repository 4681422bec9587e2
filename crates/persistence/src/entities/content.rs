//! Settings, campaign, queue, page and AR marker entities.

use chrono::{DateTime, Utc};
use domain::models::email_campaign::CampaignEmail;
use domain::models::{ArMarkerRecord, EmailCampaign, Page, QueuedEmail, Setting};
use serde_json::Value as JsonValue;
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct SettingEntity {
    pub key: String,
    pub value: String,
    pub group_name: String,
    pub updated_at: DateTime<Utc>,
}

impl From<SettingEntity> for Setting {
    fn from(entity: SettingEntity) -> Self {
        Self {
            key: entity.key,
            value: entity.value,
            group_name: entity.group_name,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailCampaignEntity {
    pub id: i64,
    pub name: String,
    pub goal: String,
    pub audience: String,
    pub offer: String,
    pub language: String,
    pub tone: String,
    pub num_emails: i32,
    pub emails: Json<Vec<CampaignEmail>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EmailCampaignEntity> for EmailCampaign {
    fn from(entity: EmailCampaignEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            goal: entity.goal,
            audience: entity.audience,
            offer: entity.offer,
            language: entity.language.trim().to_string(),
            tone: entity.tone,
            num_emails: entity.num_emails,
            emails: entity.emails.0,
            status: entity.status.parse().unwrap_or_default(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct QueuedEmailEntity {
    pub id: i64,
    pub to_email: String,
    pub from_email: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub campaign_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<QueuedEmailEntity> for QueuedEmail {
    fn from(entity: QueuedEmailEntity) -> Self {
        Self {
            id: entity.id,
            to_email: entity.to_email,
            from_email: entity.from_email,
            subject: entity.subject,
            body: entity.body,
            status: entity.status.parse().unwrap_or_default(),
            attempts: entity.attempts,
            last_error: entity.last_error,
            campaign_id: entity.campaign_id,
            scheduled_at: entity.scheduled_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            sent_at: entity.sent_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct PageEntity {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: JsonValue,
    pub css_cache: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PageEntity> for Page {
    fn from(entity: PageEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            slug: entity.slug,
            content: entity.content,
            css_cache: entity.css_cache,
            status: entity.status.parse().unwrap_or_default(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ArMarkerEntity {
    pub id: i64,
    pub entity_id: i64,
    pub pattern: String,
    pub created_at: DateTime<Utc>,
}

impl From<ArMarkerEntity> for ArMarkerRecord {
    fn from(entity: ArMarkerEntity) -> Self {
        Self {
            id: entity.id,
            entity_id: entity.entity_id,
            pattern: entity.pattern,
            created_at: entity.created_at,
        }
    }
}
