//! Security log, failed login and IP block repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use domain::models::security_log::{
    EventTypeCount, NewSecurityEvent, SecurityLogFilter, SecurityLogStats,
};
use domain::models::{BlockedIp, SecurityEvent};
use shared::pagination::{PageRequest, Paginated};
use sqlx::PgPool;

use crate::entities::{BlockedIpEntity, CountRow, SecurityEventEntity};
use crate::metrics::QueryTimer;

const EVENT_COLUMNS: &str =
    "id, event_type, severity, user_id, ip_address, user_agent, details, metadata, created_at";

/// Builds the WHERE clause for a [`SecurityLogFilter`], tracking parameter positions.
struct SecurityLogFilterBuilder {
    conditions: Vec<String>,
    param_count: usize,
}

impl SecurityLogFilterBuilder {
    fn build(filter: &SecurityLogFilter) -> Self {
        let mut conditions = vec!["TRUE".to_string()];
        let mut param_count = 0;
        let mut push = |condition: &str| {
            param_count += 1;
            conditions.push(condition.replace('?', &format!("${}", param_count)));
        };

        if filter.event_type.is_some() {
            push("event_type = ?");
        }
        if filter.severity.is_some() {
            push("severity = ?");
        }
        if filter.user_id.is_some() {
            push("user_id = ?");
        }
        if filter.ip.is_some() {
            push("ip_address LIKE '%' || ? || '%'");
        }
        if filter.from.is_some() {
            push("created_at >= ?");
        }
        if filter.until.is_some() {
            push("created_at < ?");
        }

        Self { conditions, param_count }
    }

    fn where_clause(&self) -> String {
        self.conditions.join(" AND ")
    }

    fn param_count(&self) -> usize {
        self.param_count
    }
}

/// Binds the filter values in the order [`SecurityLogFilterBuilder`] numbered them.
macro_rules! bind_security_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(ref event_type) = $filter.event_type {
            b = b.bind(event_type);
        }
        if let Some(ref severity) = $filter.severity {
            b = b.bind(severity.as_str());
        }
        if let Some(user_id) = $filter.user_id {
            b = b.bind(user_id);
        }
        if let Some(ref ip) = $filter.ip {
            b = b.bind(escape_like(ip));
        }
        if let Some(from) = $filter.from {
            b = b.bind(from);
        }
        if let Some(until) = $filter.until {
            b = b.bind(until);
        }
        b
    }};
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct SecurityLogRepository {
    pool: PgPool,
}

impl SecurityLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &NewSecurityEvent) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("insert_security_event");
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO security_logs (event_type, severity, user_id, ip_address, user_agent, details, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&event.event_type)
        .bind(event.severity.as_str())
        .bind(event.user_id)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.details)
        .bind(&event.metadata)
        .fetch_one(&self.pool)
        .await?;
        timer.record();
        Ok(id)
    }

    pub async fn list(
        &self,
        filter: &SecurityLogFilter,
        page: &PageRequest,
    ) -> Result<Paginated<SecurityEvent>, sqlx::Error> {
        let timer = QueryTimer::new("list_security_logs");
        let builder = SecurityLogFilterBuilder::build(filter);
        let where_clause = builder.where_clause();
        let param_count = builder.param_count();

        let count_query = format!("SELECT COUNT(*) FROM security_logs WHERE {}", where_clause);
        let count = bind_security_filters!(sqlx::query_scalar::<_, i64>(&count_query), filter);
        let total = count.fetch_one(&self.pool).await?;

        let list_query = format!(
            r#"
            SELECT {}
            FROM security_logs
            WHERE {}
            ORDER BY created_at DESC, id DESC
            LIMIT ${} OFFSET ${}
            "#,
            EVENT_COLUMNS,
            where_clause,
            param_count + 1,
            param_count + 2
        );
        let list = bind_security_filters!(sqlx::query_as::<_, SecurityEventEntity>(&list_query), filter);
        let rows = list
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        timer.record();

        Ok(Paginated::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    /// Newest first, at most `max_rows`.
    pub async fn export(&self, filter: &SecurityLogFilter, max_rows: i64) -> Result<Vec<SecurityEvent>, sqlx::Error> {
        let builder = SecurityLogFilterBuilder::build(filter);
        let query = format!(
            "SELECT {} FROM security_logs WHERE {} ORDER BY created_at DESC, id DESC LIMIT ${}",
            EVENT_COLUMNS,
            builder.where_clause(),
            builder.param_count() + 1
        );
        let rows = bind_security_filters!(sqlx::query_as::<_, SecurityEventEntity>(&query), filter)
            .bind(max_rows)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Counts by severity and the ten most frequent event types over `days`.
    pub async fn stats(&self, days: u32, now: DateTime<Utc>) -> Result<SecurityLogStats, sqlx::Error> {
        let timer = QueryTimer::new("security_log_stats");
        let since = now - Duration::days(i64::from(days));

        let severities = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT severity AS label, COUNT(*) AS count
            FROM security_logs WHERE created_at >= $1
            GROUP BY severity
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let types = sqlx::query_as::<_, CountRow>(
            r#"
            SELECT event_type AS label, COUNT(*) AS count
            FROM security_logs WHERE created_at >= $1
            GROUP BY event_type
            ORDER BY count DESC, event_type
            LIMIT 10
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let mut by_severity: BTreeMap<String, i64> = domain::models::Severity::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for row in severities {
            by_severity.insert(row.label, row.count);
        }

        Ok(SecurityLogStats {
            days,
            total: by_severity.values().sum(),
            by_severity,
            by_type: types
                .into_iter()
                .map(|r| EventTypeCount {
                    event_type: r.label,
                    count: r.count,
                })
                .collect(),
        })
    }

    pub async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM security_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn record_login_attempt(&self, ip: &str, username: &str, success: bool) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO login_attempts (ip_address, username, success) VALUES ($1, $2, $3)")
            .bind(ip)
            .bind(username)
            .bind(success)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Failed logins from `ip` since `since`, not counting failures before the last success.
    pub async fn recent_failures(&self, ip: &str, since: DateTime<Utc>) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM login_attempts
            WHERE ip_address = $1
              AND NOT success
              AND attempted_at >= GREATEST(
                    $2,
                    COALESCE((SELECT MAX(attempted_at) FROM login_attempts
                              WHERE ip_address = $1 AND success), $2)
                  )
            "#,
        )
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_login_attempts_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE attempted_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn blocked_ips(&self) -> Result<Vec<BlockedIp>, sqlx::Error> {
        let rows = sqlx::query_as::<_, BlockedIpEntity>(
            r#"
            SELECT id, ip_address, reason, blocked_by, blocked_until, is_permanent, created_at
            FROM blocked_ips
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The block covering `ip` right now, if any.
    pub async fn active_block(&self, ip: &str) -> Result<Option<BlockedIp>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_ip_block");
        let row = sqlx::query_as::<_, BlockedIpEntity>(
            r#"
            SELECT id, ip_address, reason, blocked_by, blocked_until, is_permanent, created_at
            FROM blocked_ips
            WHERE ip_address = $1
              AND (is_permanent OR blocked_until IS NULL OR blocked_until > NOW())
            "#,
        )
        .bind(ip)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(row.map(Into::into))
    }

    /// Blocks `ip`, replacing an earlier block of the same address.
    pub async fn block(
        &self,
        ip: &str,
        reason: Option<&str>,
        blocked_by: Option<i64>,
        blocked_until: Option<DateTime<Utc>>,
        permanent: bool,
    ) -> Result<BlockedIp, sqlx::Error> {
        let row = sqlx::query_as::<_, BlockedIpEntity>(
            r#"
            INSERT INTO blocked_ips (ip_address, reason, blocked_by, blocked_until, is_permanent)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (ip_address) DO UPDATE
            SET reason = EXCLUDED.reason,
                blocked_by = EXCLUDED.blocked_by,
                blocked_until = EXCLUDED.blocked_until,
                is_permanent = EXCLUDED.is_permanent,
                created_at = NOW()
            RETURNING id, ip_address, reason, blocked_by, blocked_until, is_permanent, created_at
            "#,
        )
        .bind(ip)
        .bind(reason)
        .bind(blocked_by)
        .bind(blocked_until)
        .bind(permanent)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn unblock(&self, id: i64) -> Result<Option<BlockedIp>, sqlx::Error> {
        let row = sqlx::query_as::<_, BlockedIpEntity>(
            r#"
            DELETE FROM blocked_ips WHERE id = $1
            RETURNING id, ip_address, reason, blocked_by, blocked_until, is_permanent, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::Severity;

    #[test]
    fn test_filter_builder_numbers_params_in_bind_order() {
        let filter = SecurityLogFilter {
            event_type: Some("login_failed".into()),
            severity: None,
            user_id: Some(3),
            ip: Some("10.".into()),
            from: None,
            until: Some(Utc::now()),
        };
        let builder = SecurityLogFilterBuilder::build(&filter);
        assert_eq!(builder.param_count(), 4);
        assert_eq!(
            builder.where_clause(),
            "TRUE AND event_type = $1 AND user_id = $2 AND ip_address LIKE '%' || $3 || '%' AND created_at < $4"
        );
    }

    #[test]
    fn test_empty_filter() {
        let builder = SecurityLogFilterBuilder::build(&SecurityLogFilter::default());
        assert_eq!(builder.where_clause(), "TRUE");
        assert_eq!(builder.param_count(), 0);

        let severity_only = SecurityLogFilter {
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        assert_eq!(
            SecurityLogFilterBuilder::build(&severity_only).where_clause(),
            "TRUE AND severity = $1"
        );
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("10.0_1%"), "10.0\\_1\\%");
    }

    #[test]
    fn test_escape_like_leaves_addresses_untouched() {
        use fake::faker::internet::en::{IPv4, IPv6};
        use fake::Fake;

        for _ in 0..20 {
            let v4: String = IPv4().fake();
            let v6: String = IPv6().fake();
            assert_eq!(escape_like(&v4), v4);
            assert_eq!(escape_like(&v6), v6);
        }
    }
}
