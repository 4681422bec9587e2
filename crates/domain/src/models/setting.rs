//! Site settings: key/value rows validated against a static catalogue.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingGroup {
    General,
    Monitoring,
    Security,
    Theme,
    Email,
}

impl SettingGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingGroup::General => "general",
            SettingGroup::Monitoring => "monitoring",
            SettingGroup::Security => "security",
            SettingGroup::Theme => "theme",
            SettingGroup::Email => "email",
        }
    }
}

impl FromStr for SettingGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "general" => Ok(SettingGroup::General),
            "monitoring" => Ok(SettingGroup::Monitoring),
            "security" => Ok(SettingGroup::Security),
            "theme" => Ok(SettingGroup::Theme),
            "email" => Ok(SettingGroup::Email),
            _ => Err(format!("Unknown setting group: {}", s)),
        }
    }
}

impl fmt::Display for SettingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum SettingKind {
    /// Text with a character length range.
    #[serde(rename = "string")]
    Text { min: usize, max: usize },
    Integer { min: i64, max: i64 },
    Boolean,
    Email,
    Url,
    Color,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettingDefinition {
    pub key: &'static str,
    pub group: SettingGroup,
    pub label: &'static str,
    #[serde(flatten)]
    pub kind: SettingKind,
    pub default: &'static str,
}

const fn def(
    key: &'static str,
    group: SettingGroup,
    label: &'static str,
    kind: SettingKind,
    default: &'static str,
) -> SettingDefinition {
    SettingDefinition { key, group, label, kind, default }
}

use SettingGroup as G;
use SettingKind as K;

pub const CATALOGUE: &[SettingDefinition] = &[
    def("site_name", G::General, "Site name", K::Text { min: 1, max: 200 }, "Jessie CMS"),
    def("site_tagline", G::General, "Tagline", K::Text { min: 0, max: 200 }, ""),
    def("default_locale", G::General, "Default locale", K::Text { min: 1, max: 10 }, "en"),
    def("timezone", G::General, "Timezone", K::Text { min: 1, max: 64 }, "UTC"),
    def("date_format", G::General, "Date format", K::Text { min: 1, max: 32 }, "Y-m-d"),
    def("time_format", G::General, "Time format", K::Text { min: 1, max: 32 }, "H:i"),
    def("items_per_page", G::General, "Items per page", K::Integer { min: 5, max: 100 }, "20"),
    def("heartbeat_threshold_minutes", G::Monitoring, "Heartbeat threshold (minutes)", K::Integer { min: 1, max: 1440 }, "5"),
    def("cpu_threshold", G::Monitoring, "CPU alert threshold (%)", K::Integer { min: 1, max: 100 }, "90"),
    def("memory_threshold", G::Monitoring, "Memory alert threshold (%)", K::Integer { min: 1, max: 100 }, "90"),
    def("max_login_attempts", G::Security, "Failed logins before block", K::Integer { min: 1, max: 100 }, "5"),
    def("lockout_minutes", G::Security, "Failed login window (minutes)", K::Integer { min: 1, max: 1440 }, "15"),
    def("block_duration_minutes", G::Security, "Automatic block length (minutes)", K::Integer { min: 1, max: 525_600 }, "60"),
    def("security_log_retention_days", G::Security, "Security log retention (days)", K::Integer { min: 1, max: 3650 }, "90"),
    def("notify_on_security_alerts", G::Security, "Email admins on security alerts", K::Boolean, "1"),
    def("theme_primary_color", G::Theme, "Primary color", K::Color, "#6366f1"),
    def("theme_secondary_color", G::Theme, "Secondary color", K::Color, "#8b5cf6"),
    def("theme_logo_url", G::Theme, "Logo URL", K::Url, ""),
    def("email_from_address", G::Email, "Sender address", K::Email, "no-reply@example.com"),
    def("email_from_name", G::Email, "Sender name", K::Text { min: 1, max: 100 }, "Jessie CMS"),
    def("contact_recipient", G::Email, "Contact form recipient", K::Email, "admin@example.com"),
];

pub fn definition(key: &str) -> Option<&'static SettingDefinition> {
    CATALOGUE.iter().find(|d| d.key == key)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingError {
    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("{label} {reason}")]
    Invalid {
        key: String,
        label: &'static str,
        reason: String,
    },
}

impl SettingDefinition {
    /// Checks and normalizes a submitted value.
    pub fn normalize(&self, raw: &str) -> Result<String, SettingError> {
        let value = raw.trim();
        let invalid = |reason: String| SettingError::Invalid {
            key: self.key.to_string(),
            label: self.label,
            reason,
        };

        match self.kind {
            K::Text { min, max } => {
                let len = value.chars().count();
                if len < min || len > max {
                    return Err(invalid(format!("must be between {} and {} characters", min, max)));
                }
                Ok(value.to_string())
            }
            K::Integer { min, max } => match value.parse::<i64>() {
                Ok(n) if (min..=max).contains(&n) => Ok(n.to_string()),
                _ => Err(invalid(format!("must be a whole number between {} and {}", min, max))),
            },
            K::Boolean => match value.to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok("1".to_string()),
                "" | "0" | "false" | "off" | "no" => Ok("0".to_string()),
                _ => Err(invalid("must be on or off".to_string())),
            },
            K::Email => {
                if value.len() <= 255 && EMAIL_RE.is_match(value) {
                    Ok(value.to_string())
                } else {
                    Err(invalid("must be a valid email address".to_string()))
                }
            }
            K::Url => {
                if value.is_empty()
                    || ((value.starts_with("https://") || value.starts_with("http://") || value.starts_with('/'))
                        && !value.contains(char::is_whitespace)
                        && value.len() <= 2048)
                {
                    Ok(value.to_string())
                } else {
                    Err(invalid("must be an http(s) or site-relative URL".to_string()))
                }
            }
            K::Color => shared::validation::validate_hex_color(value)
                .map(|_| value.to_lowercase())
                .map_err(|_| invalid("must be a hex color like #1a2b3c".to_string())),
        }
    }
}

/// Validates a batch of submitted settings. Every key must be known; all errors are collected.
pub fn validate_updates(
    updates: &BTreeMap<String, String>,
) -> Result<Vec<(&'static SettingDefinition, String)>, Vec<SettingError>> {
    let mut accepted = Vec::with_capacity(updates.len());
    let mut errors = Vec::new();
    for (key, raw) in updates {
        match definition(key) {
            None => errors.push(SettingError::UnknownKey(key.clone())),
            Some(def) => match def.normalize(raw) {
                Ok(value) => accepted.push((def, value)),
                Err(err) => errors.push(err),
            },
        }
    }
    if errors.is_empty() {
        Ok(accepted)
    } else {
        Err(errors)
    }
}

/// A stored setting row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub group_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Effective value of every catalogue entry: stored value or default.
#[derive(Debug, Clone, Serialize)]
pub struct SettingView {
    #[serde(flatten)]
    pub definition: SettingDefinition,
    pub value: String,
}

pub fn effective_settings(stored: &[Setting]) -> Vec<SettingView> {
    CATALOGUE
        .iter()
        .map(|def| SettingView {
            definition: *def,
            value: stored
                .iter()
                .find(|s| s.key == def.key)
                .map(|s| s.value.clone())
                .unwrap_or_else(|| def.default.to_string()),
        })
        .collect()
}

/// Body of `POST /admin/settings`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSettingsRequest {
    pub settings: BTreeMap<String, String>,
}
