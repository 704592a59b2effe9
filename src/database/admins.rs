use super::Database;
use entities::{admin, prelude::*};
use poise::serenity_prelude::UserId;
use sea_orm::{prelude::*, ActiveValue::Set, QueryOrder, QuerySelect};
use sea_query::{Expr, OnConflict};

impl Database {
    pub async fn is_admin(&self, user: UserId) -> Result<bool, DbErr> {
        Ok(Admin::find_by_id(user.get() as i64)
            .filter(admin::Column::Active.eq(true))
            .count(&self.db)
            .await?
            > 0)
    }
    pub async fn admin_ids(&self) -> Result<Vec<UserId>, DbErr> {
        Ok(Admin::find()
            .select_only()
            .column(admin::Column::Id)
            .filter(admin::Column::Active.eq(true))
            .order_by_asc(admin::Column::Id)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|id| UserId::new(id as u64))
            .collect())
    }
    /// Returns false when the user already was an active admin.
    pub async fn add_admin(&self, user: UserId) -> Result<bool, DbErr> {
        let was_admin = self.is_admin(user).await?;
        Admin::insert(admin::ActiveModel {
            id: Set(user.get() as i64),
            active: Set(true),
        })
        .on_conflict(
            OnConflict::column(admin::Column::Id)
                .update_column(admin::Column::Active)
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(!was_admin)
    }
    pub async fn remove_admin(&self, user: UserId) -> Result<bool, DbErr> {
        Ok(Admin::update_many()
            .col_expr(admin::Column::Active, Expr::value(false))
            .filter(admin::Column::Id.eq(user.get() as i64))
            .filter(admin::Column::Active.eq(true))
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
    pub async fn seed_admins(&self, users: impl IntoIterator<Item = UserId> + Send) -> Result<(), DbErr> {
        for user in users {
            self.add_admin(user).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_db;
    use poise::serenity_prelude::UserId;

    #[tokio::test]
    async fn admins_can_be_added_and_deactivated() {
        let db = test_db().await;
        let user = UserId::new(10);
        assert!(!db.is_admin(user).await.unwrap());
        assert!(db.add_admin(user).await.unwrap());
        assert!(!db.add_admin(user).await.unwrap());
        assert!(db.is_admin(user).await.unwrap());
        assert!(db.remove_admin(user).await.unwrap());
        assert!(!db.remove_admin(user).await.unwrap());
        assert!(!db.is_admin(user).await.unwrap());
        assert!(db.add_admin(user).await.unwrap());
    }

    #[tokio::test]
    async fn admin_ids_lists_active_admins_in_order() {
        let db = test_db().await;
        db.seed_admins([UserId::new(3), UserId::new(1), UserId::new(2)])
            .await
            .unwrap();
        db.remove_admin(UserId::new(2)).await.unwrap();
        assert_eq!(
            db.admin_ids().await.unwrap(),
            vec![UserId::new(1), UserId::new(3)]
        );
    }
}
