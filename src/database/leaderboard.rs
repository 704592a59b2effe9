use super::{unix_time, Database};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use entities::{engagement_log, excluded_member, member, prelude::*};
use poise::serenity_prelude::UserId;
use sea_orm::{prelude::*, ActiveValue::Set, QueryOrder, QuerySelect};
use sea_query::{Expr, OnConflict, Query};

/// Engagement counts per activity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub messages: u64,
    pub reactions: u64,
    pub images: u64,
    pub shares: u64,
    pub invites: u64,
}

impl ActivityCounts {
    pub const fn total(&self) -> u64 {
        self.messages + self.reactions + self.images + self.shares + self.invites
    }
    fn record(&mut self, activity: &str, count: u64) {
        match activity {
            "message" => self.messages += count,
            "reaction" => self.reactions += count,
            "image" => self.images += count,
            "share" => self.shares += count,
            "invite" => self.invites += count,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub user: UserId,
    pub points: i64,
    pub level: i64,
    pub counts: ActivityCounts,
}

impl Database {
    /// Highest totals first, excluded members left out.
    pub async fn leaderboard(&self, limit: u64) -> Result<Vec<(UserId, i64)>, DbErr> {
        Ok(Member::find()
            .select_only()
            .column(member::Column::Id)
            .column(member::Column::TotalPoints)
            .filter(
                member::Column::Id.not_in_subquery(
                    Query::select()
                        .column(excluded_member::Column::Id)
                        .from(ExcludedMember)
                        .to_owned(),
                ),
            )
            .order_by_desc(member::Column::TotalPoints)
            .order_by_asc(member::Column::Id)
            .limit(limit)
            .into_tuple::<(i64, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(id, points)| (UserId::new(id as u64), points))
            .collect())
    }
    pub async fn top_users(&self, limit: u64) -> Result<Vec<LeaderboardEntry>, DbErr> {
        let members = Member::find()
            .filter(
                member::Column::Id.not_in_subquery(
                    Query::select()
                        .column(excluded_member::Column::Id)
                        .from(ExcludedMember)
                        .to_owned(),
                ),
            )
            .order_by_desc(member::Column::TotalPoints)
            .order_by_asc(member::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        let mut res = Vec::with_capacity(members.len());
        for member in members {
            let user = UserId::new(member.id as u64);
            res.push(LeaderboardEntry {
                user,
                points: member.total_points,
                level: member.level,
                counts: self.activity_counts(user).await?,
            });
        }
        Ok(res)
    }
    /// Returns false when the member was already excluded.
    pub async fn exclude_member(&self, user: UserId) -> Result<bool, DbErr> {
        Ok(ExcludedMember::insert(excluded_member::ActiveModel {
            id: Set(user.get() as i64),
        })
        .on_conflict(
            OnConflict::column(excluded_member::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?
            > 0)
    }
    /// Returns false when the member was not excluded.
    pub async fn include_member(&self, user: UserId) -> Result<bool, DbErr> {
        Ok(ExcludedMember::delete_by_id(user.get() as i64)
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
    pub async fn excluded_members(&self) -> Result<Vec<UserId>, DbErr> {
        Ok(ExcludedMember::find()
            .select_only()
            .column(excluded_member::Column::Id)
            .order_by_asc(excluded_member::Column::Id)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|id| UserId::new(id as u64))
            .collect())
    }
    pub async fn activity_counts(&self, user: UserId) -> Result<ActivityCounts, DbErr> {
        let mut counts = ActivityCounts::default();
        EngagementLog::find()
            .select_only()
            .column(engagement_log::Column::Activity)
            .column_as(Expr::col(engagement_log::Column::Id).count(), "count")
            .filter(engagement_log::Column::Member.eq(user.get() as i64))
            .group_by(engagement_log::Column::Activity)
            .into_tuple::<(String, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .for_each(|(activity, count)| counts.record(&activity, count as u64));
        Ok(counts)
    }
    /// Events per UTC day over the week ending `today`, oldest day first.
    pub async fn weekly_activity(&self, user: UserId, today: NaiveDate) -> Result<[u64; 7], DbErr> {
        let first_day = today - ChronoDuration::days(6);
        let since = unix_time(DateTime::<Utc>::from_naive_utc_and_offset(
            first_day.and_time(chrono::NaiveTime::MIN),
            Utc,
        ));
        let mut days = [0u64; 7];
        EngagementLog::find()
            .select_only()
            .column(engagement_log::Column::CreatedAt)
            .filter(engagement_log::Column::Member.eq(user.get() as i64))
            .filter(engagement_log::Column::CreatedAt.gte(since))
            .into_tuple::<i64>()
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|created_at| DateTime::from_timestamp(created_at, 0))
            .for_each(|created_at| {
                let offset = (created_at.date_naive() - first_day).num_days();
                if let Some(day) = usize::try_from(offset).ok().and_then(|day| days.get_mut(day)) {
                    *day += 1;
                }
            });
        Ok(days)
    }
    pub async fn engagement_count(&self) -> Result<u64, DbErr> {
        EngagementLog::find().count(&self.db).await
    }
}

#[cfg(test)]
mod tests {
    use crate::database::{test_db, Activity};
    use chrono::{TimeZone, Utc};
    use poise::serenity_prelude::UserId;

    #[tokio::test]
    async fn leaderboard_skips_excluded_members() {
        let db = test_db().await;
        let today = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap().date_naive();
        for (user, points) in [(1, 300), (2, 200), (3, 100)] {
            db.add_points(UserId::new(user), points, today).await.unwrap();
        }
        assert!(db.exclude_member(UserId::new(1)).await.unwrap());
        assert!(!db.exclude_member(UserId::new(1)).await.unwrap());
        assert_eq!(
            db.leaderboard(10).await.unwrap(),
            vec![(UserId::new(2), 200), (UserId::new(3), 100)]
        );
        assert_eq!(db.top_users(1).await.unwrap()[0].user, UserId::new(2));
        assert_eq!(db.excluded_members().await.unwrap(), vec![UserId::new(1)]);
        assert!(db.include_member(UserId::new(1)).await.unwrap());
        assert!(!db.include_member(UserId::new(1)).await.unwrap());
        assert_eq!(db.leaderboard(1).await.unwrap(), vec![(UserId::new(1), 300)]);
    }

    #[tokio::test]
    async fn counts_and_weekly_activity_group_the_ledger() {
        let db = test_db().await;
        let user = UserId::new(5);
        let now = Utc.with_ymd_and_hms(2025, 2, 10, 18, 0, 0).unwrap();
        db.ensure_member(user, now.date_naive()).await.unwrap();
        let events = [
            (Activity::Message, 0),
            (Activity::Message, 0),
            (Activity::Reaction, 1),
            (Activity::Image, 6),
            (Activity::Invite, 9),
        ];
        for (activity, days_ago) in events {
            db.log_engagement(
                user,
                activity,
                None,
                None,
                5,
                now - chrono::Duration::days(days_ago),
            )
            .await
            .unwrap();
        }
        let counts = db.activity_counts(user).await.unwrap();
        assert_eq!(
            (counts.messages, counts.reactions, counts.images, counts.invites),
            (2, 1, 1, 1)
        );
        assert_eq!(counts.total(), 5);
        assert_eq!(
            db.weekly_activity(user, now.date_naive()).await.unwrap(),
            [1, 0, 0, 0, 0, 1, 2]
        );
        assert_eq!(db.engagement_count().await.unwrap(), 5);
    }
}
