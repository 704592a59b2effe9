use super::Database;
use crate::config::{parse_channel, parse_flag, ConfigKey};
use entities::{config, prelude::*};
use poise::serenity_prelude::ChannelId;
use sea_orm::{prelude::*, ActiveValue::Set};
use sea_query::OnConflict;
use std::sync::Arc;

impl Database {
    /// Raw stored value, `None` when the key was never set.
    pub async fn get_config(&self, key: ConfigKey) -> Result<Option<String>, Arc<DbErr>> {
        self.config_cache
            .try_get_with(key, async {
                Ok(Config::find_by_id(key.key())
                    .one(&self.db)
                    .await?
                    .map(|row| row.value))
            })
            .await
    }
    /// Stored value when valid, otherwise the key's default.
    pub async fn config_value(&self, key: ConfigKey) -> Result<Option<String>, Arc<DbErr>> {
        Ok(self
            .get_config(key)
            .await?
            .filter(|value| key.is_valid(value))
            .or_else(|| key.default_value().map(String::from)))
    }
    pub async fn config_i64(&self, key: ConfigKey) -> Result<i64, Arc<DbErr>> {
        Ok(self
            .config_value(key)
            .await?
            .and_then(|value| value.parse().ok())
            .unwrap_or_default())
    }
    pub async fn config_flag(&self, key: ConfigKey) -> Result<bool, Arc<DbErr>> {
        Ok(self
            .config_value(key)
            .await?
            .and_then(|value| parse_flag(&value))
            .unwrap_or(false))
    }
    pub async fn config_channel(&self, key: ConfigKey) -> Result<Option<ChannelId>, Arc<DbErr>> {
        Ok(self
            .config_value(key)
            .await?
            .and_then(|value| parse_channel(&value)))
    }
    pub async fn set_config(&self, key: ConfigKey, value: impl Into<String> + Send) -> Result<(), DbErr> {
        Config::insert(config::ActiveModel {
            key: Set(key.key().to_owned()),
            value: Set(value.into()),
        })
        .on_conflict(
            OnConflict::column(config::Column::Key)
                .update_column(config::Column::Value)
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        self.config_cache.invalidate(&key).await;
        Ok(())
    }
    /// Effective value of every known key.
    pub async fn all_configs(&self) -> Result<Vec<(ConfigKey, Option<String>)>, Arc<DbErr>> {
        let mut res = Vec::with_capacity(ConfigKey::ALL.len());
        for key in ConfigKey::ALL {
            res.push((key, self.config_value(key).await?));
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::ConfigKey, database::test_db};

    #[tokio::test]
    async fn reads_fall_back_to_defaults() {
        let db = test_db().await;
        assert_eq!(db.config_i64(ConfigKey::PointsPerShare).await.unwrap(), 50);
        assert_eq!(db.get_config(ConfigKey::NotificationChannelId).await.unwrap(), None);
        assert_eq!(db.config_channel(ConfigKey::NotificationChannelId).await.unwrap(), None);
        assert!(db.config_flag(ConfigKey::DashboardEnabled).await.unwrap());
    }

    #[tokio::test]
    async fn writes_invalidate_the_cache() {
        let db = test_db().await;
        assert_eq!(db.config_i64(ConfigKey::PointsPerMessage).await.unwrap(), 5);
        db.set_config(ConfigKey::PointsPerMessage, "12").await.unwrap();
        assert_eq!(db.config_i64(ConfigKey::PointsPerMessage).await.unwrap(), 12);
        db.set_config(ConfigKey::NotificationChannelId, "42").await.unwrap();
        assert_eq!(
            db.config_channel(ConfigKey::NotificationChannelId)
                .await
                .unwrap()
                .map(|channel| channel.get()),
            Some(42)
        );
    }

    #[tokio::test]
    async fn unparsable_values_use_the_default() {
        let db = test_db().await;
        db.set_config(ConfigKey::DailyPointsLimit, "lots").await.unwrap();
        assert_eq!(db.config_i64(ConfigKey::DailyPointsLimit).await.unwrap(), 100);
        db.set_config(ConfigKey::VoiceChannelUpdateInterval, "5").await.unwrap();
        assert_eq!(
            db.config_i64(ConfigKey::VoiceChannelUpdateInterval).await.unwrap(),
            60
        );
    }

    #[tokio::test]
    async fn out_of_range_limits_keep_the_default_cap() {
        let db = test_db().await;
        db.set_config(ConfigKey::DailyPointsLimit, "9223372036854775808")
            .await
            .unwrap();
        assert_eq!(db.config_i64(ConfigKey::DailyPointsLimit).await.unwrap(), 100);
        db.set_config(ConfigKey::PointsPerMessage, "9223372036854775807")
            .await
            .unwrap();
        assert_eq!(db.config_i64(ConfigKey::PointsPerMessage).await.unwrap(), 5);
    }
}
