//! Site settings and theme builder overrides.

use domain::models::setting::SettingDefinition;
use domain::models::Setting;
use sqlx::PgPool;

use crate::entities::SettingEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct SettingRepository {
    pool: PgPool,
}

impl SettingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stored values only; defaults are filled in by the domain layer.
    pub async fn all(&self) -> Result<Vec<Setting>, sqlx::Error> {
        let timer = QueryTimer::new("list_settings");
        let rows = sqlx::query_as::<_, SettingEntity>(
            "SELECT key, value, group_name, updated_at FROM settings ORDER BY group_name, key",
        )
        .fetch_all(&self.pool)
        .await?;
        timer.record();
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
    }

    /// Upserts every validated pair in one transaction.
    pub async fn save_many(&self, updates: &[(&'static SettingDefinition, String)]) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("save_settings");
        let mut tx = self.pool.begin().await?;
        for (definition, value) in updates {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, group_name, updated_at)
                VALUES ($1, $2, $3, NOW())
                ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value, group_name = EXCLUDED.group_name, updated_at = NOW()
                "#,
            )
            .bind(definition.key)
            .bind(value)
            .bind(definition.group.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        timer.record();
        Ok(())
    }

    pub async fn theme_overrides(&self) -> Result<Vec<(String, String)>, sqlx::Error> {
        sqlx::query_as::<_, (String, String)>("SELECT key, value FROM tb_theme_settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
    }

    /// Replaces the theme overrides with `pairs`.
    pub async fn save_theme(&self, pairs: &[(String, String)]) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("save_theme_settings");
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM tb_theme_settings")
            .execute(&mut *tx)
            .await?;
        for (key, value) in pairs {
            sqlx::query("INSERT INTO tb_theme_settings (key, value) VALUES ($1, $2)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        timer.record();
        Ok(())
    }
}
