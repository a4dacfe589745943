use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::AlmSetting;
use super::store::{SettingsStore, SettingsTransaction, StoreError};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS alm_settings (
        uuid UUID PRIMARY KEY,
        kee VARCHAR(40) NOT NULL,
        alm_id VARCHAR(40) NOT NULL,
        url VARCHAR(2000),
        app_id VARCHAR(80),
        private_key VARCHAR(2000),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

// The unique index is what actually guarantees one setting per key
const CREATE_KEY_INDEX_SQL: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS uniq_alm_settings_kee ON alm_settings (kee)";

/// Postgres-backed settings store over the `alm_settings` table
#[derive(Clone)]
pub struct PgSettingsStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct AlmSettingRow {
    uuid: Uuid,
    kee: String,
    alm_id: String,
    url: Option<String>,
    app_id: Option<String>,
    private_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AlmSettingRow> for AlmSetting {
    type Error = StoreError;

    fn try_from(row: AlmSettingRow) -> Result<Self, Self::Error> {
        let alm = row
            .alm_id
            .parse()
            .map_err(|e: String| StoreError::InvalidRecord(format!("{} ({})", e, row.uuid)))?;

        Ok(AlmSetting {
            uuid: row.uuid,
            key: row.kee,
            alm,
            url: row.url.unwrap_or_default(),
            app_id: row.app_id.unwrap_or_default(),
            private_key: row.private_key.unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the settings table and its unique key index if missing
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE_SQL).execute(&self.pool).await?;
        sqlx::query(CREATE_KEY_INDEX_SQL).execute(&self.pool).await?;
        info!("alm_settings schema ready");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn begin(&self) -> Result<Box<dyn SettingsTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SettingsTransaction for PgTransaction {
    async fn select_by_key(&mut self, key: &str) -> Result<Option<AlmSetting>, StoreError> {
        let row = sqlx::query_as::<_, AlmSettingRow>(
            r#"
            SELECT uuid, kee, alm_id, url, app_id, private_key, created_at, updated_at
            FROM alm_settings
            WHERE kee = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(AlmSetting::try_from).transpose()
    }

    async fn update(&mut self, setting: &AlmSetting) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE alm_settings
            SET kee = $2, url = $3, app_id = $4, private_key = $5, updated_at = $6
            WHERE uuid = $1
            "#,
        )
        .bind(setting.uuid)
        .bind(&setting.key)
        .bind(&setting.url)
        .bind(&setting.app_id)
        .bind(&setting.private_key)
        .bind(setting.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(setting.uuid.to_string()));
        }
        debug!("Updated alm_settings row {}", setting.uuid);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Alm;

    fn row(alm_id: &str) -> AlmSettingRow {
        let now = Utc::now();
        AlmSettingRow {
            uuid: Uuid::new_v4(),
            kee: "gh1".to_string(),
            alm_id: alm_id.to_string(),
            url: Some("https://api.github.com".to_string()),
            app_id: None,
            private_key: Some("pk".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn converts_rows_into_settings() {
        let setting = AlmSetting::try_from(row("github")).unwrap();
        assert_eq!(setting.key, "gh1");
        assert_eq!(setting.alm, Alm::Github);
        assert_eq!(setting.app_id, "");
    }

    #[test]
    fn rejects_unknown_alm_ids() {
        let err = AlmSetting::try_from(row("gitlab")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
    }
}
