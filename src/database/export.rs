use super::Database;
use sea_orm::{ConnectionTrait, DbErr};
use std::path::Path;

impl Database {
    /// Writes a consistent snapshot of the whole database to `path`.
    pub async fn export_to(&self, path: &Path) -> Result<(), DbErr> {
        let target = path.to_string_lossy().replace('\'', "''");
        self.db
            .execute_unprepared(&format!("VACUUM INTO '{target}'"))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::database::Database;
    use poise::serenity_prelude::UserId;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("engagement-{name}-{}.db", std::process::id()))
    }

    async fn open(path: &std::path::Path) -> Database {
        Database::connect(&format!("sqlite://{}?mode=rwc", path.display()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn exported_copy_opens_with_the_same_data() {
        let source = temp_path("export-source");
        let target = temp_path("export-copy");
        for path in [&source, &target] {
            let _ = tokio::fs::remove_file(path).await;
        }
        let db = open(&source).await;
        let today = chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        db.add_points(UserId::new(3), 42, today).await.unwrap();
        db.export_to(&target).await.unwrap();
        assert!(tokio::fs::metadata(&target).await.unwrap().len() > 0);
        let copy = open(&target).await;
        assert_eq!(copy.member(UserId::new(3)).await.unwrap().unwrap().total_points, 42);
        drop((db, copy));
        for path in [&source, &target] {
            tokio::fs::remove_file(path).await.unwrap();
        }
    }
}
