use super::{unix_time, Database};
use chrono::{DateTime, Utc};
use entities::{milestone, milestone_log, prelude::*};
use poise::serenity_prelude::UserId;
use sea_orm::{
    prelude::*,
    ActiveValue::{NotSet, Set},
    QueryOrder, QuerySelect,
};
use sea_query::{Expr, OnConflict, Query};

fn active() -> Select<Milestone> {
    Milestone::find().filter(milestone::Column::Active.eq(true))
}

impl Database {
    pub async fn active_milestones(&self) -> Result<Vec<milestone::Model>, DbErr> {
        active()
            .order_by_asc(milestone::Column::Value)
            .all(&self.db)
            .await
    }
    pub async fn milestone(&self, value: i64) -> Result<Option<milestone::Model>, DbErr> {
        Milestone::find_by_id(value).one(&self.db).await
    }
    /// Creates the milestone or reactivates and overwrites an existing one.
    pub async fn add_milestone(
        &self,
        value: i64,
        message: String,
        reward: Option<String>,
        role_name: Option<String>,
    ) -> Result<(), DbErr> {
        Milestone::insert(milestone::ActiveModel {
            value: Set(value),
            active: Set(true),
            message: Set(Some(message)),
            role_name: Set(role_name),
            level_based: Set(true),
            reward: Set(reward),
        })
        .on_conflict(
            OnConflict::column(milestone::Column::Value)
                .update_columns([
                    milestone::Column::Active,
                    milestone::Column::Message,
                    milestone::Column::RoleName,
                    milestone::Column::LevelBased,
                    milestone::Column::Reward,
                ])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(())
    }
    async fn update_milestone(
        &self,
        value: i64,
        column: milestone::Column,
        expr: impl Into<sea_query::SimpleExpr> + Send,
    ) -> Result<bool, DbErr> {
        Ok(Milestone::update_many()
            .col_expr(column, expr.into())
            .filter(milestone::Column::Value.eq(value))
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
    pub async fn set_milestone_active(&self, value: i64, active: bool) -> Result<bool, DbErr> {
        self.update_milestone(value, milestone::Column::Active, Expr::value(active))
            .await
    }
    pub async fn set_milestone_message(&self, value: i64, message: String) -> Result<bool, DbErr> {
        self.update_milestone(value, milestone::Column::Message, Expr::value(message))
            .await
    }
    pub async fn set_milestone_role(&self, value: i64, role_name: Option<String>) -> Result<bool, DbErr> {
        self.update_milestone(value, milestone::Column::RoleName, Expr::value(role_name))
            .await
    }
    pub async fn set_milestone_reward(&self, value: i64, reward: Option<String>) -> Result<bool, DbErr> {
        self.update_milestone(value, milestone::Column::Reward, Expr::value(reward))
            .await
    }
    /// Lowest active milestone at or below `points` that the member has not been credited with.
    pub async fn next_unrecorded_milestone(
        &self,
        user: UserId,
        points: i64,
    ) -> Result<Option<milestone::Model>, DbErr> {
        active()
            .filter(milestone::Column::Value.lte(points))
            .filter(
                milestone::Column::Value.not_in_subquery(
                    Query::select()
                        .column(milestone_log::Column::Milestone)
                        .from(MilestoneLog)
                        .and_where(milestone_log::Column::Member.eq(user.get() as i64))
                        .to_owned(),
                ),
            )
            .order_by_asc(milestone::Column::Value)
            .one(&self.db)
            .await
    }
    /// `None` when the member already had this milestone recorded.
    pub async fn record_milestone(
        &self,
        user: UserId,
        milestone: i64,
        reward_code: impl Into<String> + Send,
        at: DateTime<Utc>,
    ) -> Result<Option<milestone_log::Model>, DbErr> {
        let reward_code: String = reward_code.into();
        let inserted = MilestoneLog::insert(milestone_log::ActiveModel {
            id: NotSet,
            member: Set(user.get() as i64),
            milestone: Set(milestone),
            reached_at: Set(unix_time(at)),
            user_notified: Set(false),
            admin_notified: Set(false),
            reward_sent: Set(false),
            reward_code: Set(reward_code.clone()),
        })
        .on_conflict(
            OnConflict::columns([milestone_log::Column::Member, milestone_log::Column::Milestone])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        if inserted == 0 {
            return Ok(None);
        }
        MilestoneLog::find()
            .filter(milestone_log::Column::RewardCode.eq(reward_code))
            .one(&self.db)
            .await
    }
    async fn set_log_flag(&self, log: i32, column: milestone_log::Column) -> Result<(), DbErr> {
        MilestoneLog::update_many()
            .col_expr(column, Expr::value(true))
            .filter(milestone_log::Column::Id.eq(log))
            .exec(&self.db)
            .await?;
        Ok(())
    }
    pub async fn mark_user_notified(&self, log: i32) -> Result<(), DbErr> {
        self.set_log_flag(log, milestone_log::Column::UserNotified).await
    }
    pub async fn mark_admin_notified(&self, log: i32) -> Result<(), DbErr> {
        self.set_log_flag(log, milestone_log::Column::AdminNotified).await
    }
    /// False when the code is unknown or its reward was already sent.
    pub async fn mark_reward_sent(&self, code: &str) -> Result<bool, DbErr> {
        Ok(MilestoneLog::update_many()
            .col_expr(milestone_log::Column::RewardSent, Expr::value(true))
            .filter(milestone_log::Column::RewardCode.eq(code))
            .filter(milestone_log::Column::RewardSent.eq(false))
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
    pub async fn pending_rewards(&self) -> Result<Vec<milestone_log::Model>, DbErr> {
        MilestoneLog::find()
            .filter(milestone_log::Column::RewardSent.eq(false))
            .order_by_asc(milestone_log::Column::ReachedAt)
            .order_by_asc(milestone_log::Column::Id)
            .all(&self.db)
            .await
    }
    pub async fn reward_code_exists(&self, code: &str) -> Result<bool, DbErr> {
        Ok(MilestoneLog::find()
            .filter(milestone_log::Column::RewardCode.eq(code))
            .count(&self.db)
            .await?
            > 0)
    }
    pub async fn next_milestone_above(&self, points: i64) -> Result<Option<milestone::Model>, DbErr> {
        active()
            .filter(milestone::Column::Value.gt(points))
            .order_by_asc(milestone::Column::Value)
            .one(&self.db)
            .await
    }
    pub async fn previous_milestone_at_or_below(
        &self,
        points: i64,
    ) -> Result<Option<milestone::Model>, DbErr> {
        active()
            .filter(milestone::Column::Value.lte(points))
            .order_by_desc(milestone::Column::Value)
            .one(&self.db)
            .await
    }
    /// 1-based level number: how many active milestones have been passed.
    pub async fn level_number(&self, points: i64) -> Result<u64, DbErr> {
        active()
            .filter(milestone::Column::Value.lte(points))
            .count(&self.db)
            .await
    }
    pub async fn role_milestones(&self) -> Result<Vec<milestone::Model>, DbErr> {
        active()
            .filter(milestone::Column::RoleName.is_not_null())
            .filter(milestone::Column::RoleName.ne(""))
            .order_by_asc(milestone::Column::Value)
            .all(&self.db)
            .await
    }
    /// Role of the highest role-bearing milestone at or below `points`.
    pub async fn milestone_role_for(&self, points: i64) -> Result<Option<String>, DbErr> {
        Ok(active()
            .select_only()
            .column(milestone::Column::RoleName)
            .filter(milestone::Column::RoleName.is_not_null())
            .filter(milestone::Column::RoleName.ne(""))
            .filter(milestone::Column::Value.lte(points))
            .order_by_desc(milestone::Column::Value)
            .into_tuple::<Option<String>>()
            .one(&self.db)
            .await?
            .flatten())
    }
    pub async fn next_reward_above(&self, points: i64) -> Result<Option<milestone::Model>, DbErr> {
        active()
            .filter(milestone::Column::Value.gt(points))
            .filter(milestone::Column::Reward.is_not_null())
            .filter(milestone::Column::Reward.ne(""))
            .order_by_asc(milestone::Column::Value)
            .one(&self.db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_db;
    use chrono::{TimeZone, Utc};
    use poise::serenity_prelude::UserId;

    #[tokio::test]
    async fn unrecorded_milestones_come_out_lowest_first() {
        let db = test_db().await;
        let user = UserId::new(1);
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        db.add_points(user, 6000, at.date_naive()).await.unwrap();
        let first = db.next_unrecorded_milestone(user, 6000).await.unwrap().unwrap();
        assert_eq!(first.value, 1000);
        db.record_milestone(user, 1000, "AAAAA", at).await.unwrap();
        let second = db.next_unrecorded_milestone(user, 6000).await.unwrap().unwrap();
        assert_eq!(second.value, 5000);
        db.record_milestone(user, 5000, "BBBBB", at).await.unwrap();
        assert!(db.next_unrecorded_milestone(user, 6000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rewards_are_marked_once() {
        let db = test_db().await;
        let user = UserId::new(2);
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        db.add_points(user, 1000, at.date_naive()).await.unwrap();
        let log = db.record_milestone(user, 1000, "CODE1", at).await.unwrap().unwrap();
        assert!(db.record_milestone(user, 1000, "CODE2", at).await.unwrap().is_none());
        db.mark_user_notified(log.id).await.unwrap();
        assert!(db.reward_code_exists("CODE1").await.unwrap());
        assert_eq!(db.pending_rewards().await.unwrap().len(), 1);
        assert!(db.pending_rewards().await.unwrap()[0].user_notified);
        assert!(db.mark_reward_sent("CODE1").await.unwrap());
        assert!(!db.mark_reward_sent("CODE1").await.unwrap());
        assert!(!db.mark_reward_sent("NOPE1").await.unwrap());
        assert!(db.pending_rewards().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ladder_queries_follow_active_milestones() {
        let db = test_db().await;
        assert_eq!(db.next_milestone_above(0).await.unwrap().unwrap().value, 1000);
        assert_eq!(db.next_milestone_above(1000).await.unwrap().unwrap().value, 5000);
        assert!(db.previous_milestone_at_or_below(999).await.unwrap().is_none());
        assert_eq!(
            db.previous_milestone_at_or_below(12000).await.unwrap().unwrap().value,
            10000
        );
        assert_eq!(db.level_number(0).await.unwrap(), 0);
        assert_eq!(db.level_number(16000).await.unwrap(), 4);
        assert!(db.set_milestone_active(5000, false).await.unwrap());
        assert_eq!(db.level_number(16000).await.unwrap(), 3);
        assert_eq!(db.next_milestone_above(1000).await.unwrap().unwrap().value, 10000);
        assert!(db.next_milestone_above(50000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_milestones_pick_the_highest_reached() {
        let db = test_db().await;
        assert_eq!(db.milestone_role_for(500).await.unwrap(), None);
        assert_eq!(
            db.milestone_role_for(20000).await.unwrap().as_deref(),
            Some("Pit Novice")
        );
        assert_eq!(
            db.milestone_role_for(60000).await.unwrap().as_deref(),
            Some("TTP Superfan")
        );
        assert_eq!(db.role_milestones().await.unwrap().len(), 2);
        db.set_milestone_role(15000, Some(String::from("Veteran")))
            .await
            .unwrap();
        assert_eq!(
            db.milestone_role_for(20000).await.unwrap().as_deref(),
            Some("Veteran")
        );
        assert_eq!(db.next_reward_above(49999).await.unwrap().unwrap().value, 50000);
    }

    #[tokio::test]
    async fn added_milestones_replace_existing_ones() {
        let db = test_db().await;
        db.add_milestone(2500, String::from("Halfway"), None, None)
            .await
            .unwrap();
        assert_eq!(db.next_milestone_above(1000).await.unwrap().unwrap().value, 2500);
        db.set_milestone_active(2500, false).await.unwrap();
        db.add_milestone(2500, String::from("Back"), Some(String::from("Stickers")), None)
            .await
            .unwrap();
        let milestone = db.milestone(2500).await.unwrap().unwrap();
        assert!(milestone.active);
        assert_eq!(milestone.message.as_deref(), Some("Back"));
        assert!(db.set_milestone_message(2500, String::from("Again")).await.unwrap());
        assert!(db.set_milestone_reward(2500, None).await.unwrap());
        assert!(!db.set_milestone_message(2600, String::from("None")).await.unwrap());
    }
}
