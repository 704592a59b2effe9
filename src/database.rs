#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use crate::{commands::CommandError, config::{self, ConfigKey}};
use ahash::RandomState;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use migration::{Migrator, MigratorTrait};
use moka::future::Cache;
use poise::serenity_prelude::ChannelId;
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::OnceCell};

mod admins;
mod campaigns;
mod channels;
mod config_store;
mod export;
mod leaderboard;
mod milestones;
mod points;
mod voice_display;

pub use leaderboard::{ActivityCounts, LeaderboardEntry};
pub use points::{invite_object, Activity, Award, AwardOutcome, LevelChange};

static DATABASE: OnceCell<Database> = OnceCell::const_new();

pub async fn db() -> &'static Database {
    DATABASE
        .get_or_init(|| async {
            Database::connect(config::database_url())
                .await
                .expect("Database should initialize successfully")
        })
        .await
}

impl From<DbErr> for CommandError {
    fn from(value: DbErr) -> Self {
        Self::Unexpected(value.into())
    }
}

impl From<Arc<DbErr>> for CommandError {
    fn from(value: Arc<DbErr>) -> Self {
        Self::Unexpected(value.into())
    }
}

pub struct Database {
    db: DatabaseConnection,
    config_cache: Cache<ConfigKey, Option<String>, RandomState>,
    tracked_cache: Cache<ChannelId, bool, RandomState>,
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, DbErr> {
        if let Some(parent) = sqlite_file(url).as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|err| {
                    DbErr::Custom(format!("cannot create {}: {err}", parent.display()))
                })?;
            }
        }
        // A single connection serializes writers and keeps `sqlite::memory:` one database.
        let mut options = ConnectOptions::new(url);
        options.max_connections(1).sqlx_logging(false);
        let db = sea_orm::Database::connect(options).await?;
        Migrator::up(&db, None).await?;
        Ok(Self {
            db,
            config_cache: Cache::builder()
                .max_capacity(64)
                .build_with_hasher(RandomState::new()),
            tracked_cache: Cache::builder()
                .max_capacity(10000)
                .build_with_hasher(RandomState::new()),
        })
    }
}

/// File behind a SQLite URL, `None` for in-memory databases.
fn sqlite_file(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

pub fn unix_time(at: DateTime<Utc>) -> i64 {
    at.timestamp()
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - ChronoDuration::days(1)
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database should migrate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::{member, prelude::*};
    use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QueryOrder};

    #[tokio::test]
    async fn migrations_seed_defaults() {
        let db = test_db().await;
        let milestones = Milestone::find().all(&db.db).await.unwrap();
        let values = milestones.iter().map(|m| m.value).collect::<Vec<_>>();
        assert_eq!(values, vec![1000, 5000, 10000, 15000, 25000, 40000, 50000]);
        assert!(milestones.iter().all(|m| m.level_based && m.active));
        let novice = milestones.iter().find(|m| m.value == 1000).unwrap();
        assert_eq!(novice.role_name.as_deref(), Some("Pit Novice"));
        let superfan = milestones.iter().find(|m| m.value == 50000).unwrap();
        assert_eq!(superfan.role_name.as_deref(), Some("TTP Superfan"));
        assert!(Config::find().count(&db.db).await.unwrap() >= 13);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let db = test_db().await;
        Migrator::down(&db.db, None).await.unwrap();
        Migrator::up(&db.db, None).await.unwrap();
        assert_eq!(Milestone::find().count(&db.db).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn level_backfill_uses_existing_points() {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).sqlx_logging(false);
        let conn = sea_orm::Database::connect(options).await.unwrap();
        Migrator::up(&conn, Some(1)).await.unwrap();
        conn.execute_unprepared(
            "INSERT INTO member (id, total_points) VALUES (1, 0), (2, 1200), (3, 60000)",
        )
        .await
        .unwrap();
        Migrator::up(&conn, None).await.unwrap();
        let members = Member::find()
            .order_by_asc(member::Column::Id)
            .all(&conn)
            .await
            .unwrap();
        assert_eq!(
            members.iter().map(|m| m.level).collect::<Vec<_>>(),
            vec![0, 1000, 50000]
        );
        let expected = yesterday(Utc::now().date_naive());
        assert!(members
            .iter()
            .all(|m| m.last_activity_date == Some(expected)));
        assert!(members.iter().all(|m| m.current_streak == 0));
    }

    #[test]
    fn sqlite_urls_map_to_files() {
        assert_eq!(
            sqlite_file("sqlite://data/database.db?mode=rwc"),
            Some(PathBuf::from("data/database.db"))
        );
        assert_eq!(
            sqlite_file("sqlite:///var/lib/bot/db.sqlite"),
            Some(PathBuf::from("/var/lib/bot/db.sqlite"))
        );
        assert_eq!(sqlite_file("sqlite:bot.db"), Some(PathBuf::from("bot.db")));
        assert_eq!(sqlite_file("sqlite::memory:"), None);
        assert_eq!(sqlite_file("postgres://localhost/bot"), None);
    }

    #[tokio::test]
    async fn connecting_creates_missing_directories() {
        let root = std::env::temp_dir().join(format!("engagement-dirs-{}", std::process::id()));
        let _ = tokio::fs::remove_dir_all(&root).await;
        let file = root.join("data").join("database.db");
        let db = Database::connect(&format!("sqlite://{}?mode=rwc", file.display()))
            .await
            .unwrap();
        assert_eq!(Milestone::find().count(&db.db).await.unwrap(), 7);
        drop(db);
        assert!(file.exists());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
