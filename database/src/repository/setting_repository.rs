use std::{collections::HashMap, sync::Arc};

use core_types::SettingName;
use sqlx::{Pool, Row, Sqlite};

use crate::database_error::DatabaseError;

#[derive(Debug)]
pub struct SettingRepository {
    pool: Arc<Pool<Sqlite>>,
}

impl SettingRepository {
    pub fn new(pool: Arc<Pool<Sqlite>>) -> Self {
        Self { pool }
    }

    pub async fn get_settings(&self) -> Result<HashMap<String, String>, DatabaseError> {
        let rows = sqlx::query("SELECT key, value FROM setting")
            .fetch_all(&*self.pool)
            .await?;
        let mut settings = HashMap::with_capacity(rows.len());
        for row in rows {
            settings.insert(row.try_get("key")?, row.try_get("value")?);
        }
        Ok(settings)
    }

    pub async fn get_setting(&self, key: &SettingName) -> Result<Option<String>, DatabaseError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM setting WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&*self.pool)
            .await?;
        Ok(value)
    }

    pub async fn add_or_update_setting(
        &self,
        key: &SettingName,
        value: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO setting (key, value)
             VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_or_update_settings(
        &self,
        settings: &HashMap<SettingName, String>,
    ) -> Result<(), DatabaseError> {
        let mut transaction = self.pool.begin().await?;
        for (key, value) in settings {
            sqlx::query(
                "INSERT INTO setting (key, value)
                 VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key.as_str())
            .bind(value)
            .execute(&mut *transaction)
            .await?;
        }
        transaction.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use core_types::SettingName;

    use crate::setup_test_db;

    use super::SettingRepository;

    #[async_std::test]
    async fn test_get_settings() {
        let pool = Arc::new(setup_test_db().await);
        let repository = SettingRepository::new(pool.clone());
        assert!(repository.get_settings().await.unwrap().is_empty());

        repository
            .add_or_update_setting(&SettingName::AutoDeleteAfterUpload, "true")
            .await
            .unwrap();

        let settings = repository.get_settings().await.unwrap();
        assert_eq!(
            settings
                .get(SettingName::AutoDeleteAfterUpload.as_str())
                .unwrap(),
            "true"
        );

        repository
            .add_or_update_setting(&SettingName::AutoDeleteAfterUpload, "false")
            .await
            .unwrap();
        let setting = repository
            .get_setting(&SettingName::AutoDeleteAfterUpload)
            .await
            .unwrap();
        assert_eq!(setting.as_deref(), Some("false"));

        let missing = repository
            .get_setting(&SettingName::WifiOnlyUploads)
            .await
            .unwrap();
        assert_eq!(missing, None);
    }

    #[async_std::test]
    async fn test_add_or_update_settings() {
        let pool = Arc::new(setup_test_db().await);
        let repository = SettingRepository::new(pool.clone());

        let mut settings = HashMap::new();
        settings.insert(SettingName::AutoDeleteAfterUpload, "true".to_string());
        settings.insert(SettingName::WifiOnlyUploads, "true".to_string());
        repository.add_or_update_settings(&settings).await.unwrap();

        settings.insert(SettingName::WifiOnlyUploads, "false".to_string());
        repository.add_or_update_settings(&settings).await.unwrap();

        let stored = repository.get_settings().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored.get("wifi_only_uploads").unwrap(), "false");
    }
}
