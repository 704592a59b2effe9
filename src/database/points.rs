use super::{campaigns::campaign_multiplier_on, unix_time, yesterday, Database};
use crate::config::ConfigKey;
use chrono::{DateTime, NaiveDate, Utc};
use entities::{engagement_log, member, milestone, milestone_log, prelude::*};
use poise::serenity_prelude::{ChannelId, MessageId, UserId};
use sea_orm::{
    prelude::*,
    ActiveValue::{NotSet, Set},
    QuerySelect, TransactionTrait,
};
use sea_query::{Expr, OnConflict};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// The kinds of engagement that earn points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activity {
    Message,
    Image,
    Share,
    Reaction,
    Invite,
}

impl Activity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Image => "image",
            Self::Share => "share",
            Self::Reaction => "reaction",
            Self::Invite => "invite",
        }
    }
    pub const fn points_key(self) -> ConfigKey {
        match self {
            Self::Message => ConfigKey::PointsPerMessage,
            Self::Image => ConfigKey::PointsPerImage,
            Self::Share => ConfigKey::PointsPerShare,
            Self::Reaction => ConfigKey::PointsPerReaction,
            Self::Invite => ConfigKey::PointsPerInvite,
        }
    }
    /// Invites bypass both the daily cap and campaign multipliers.
    pub const fn is_capped(self) -> bool {
        !matches!(self, Self::Invite)
    }
}

#[derive(Debug, Clone)]
pub struct Award {
    pub member: UserId,
    pub activity: Activity,
    pub object: Option<String>,
    pub channel: Option<ChannelId>,
    pub base_points: i64,
    pub daily_limit: Option<i64>,
    pub apply_campaigns: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub old: i64,
    pub new: i64,
}

impl LevelChange {
    pub const fn changed(self) -> bool {
        self.old != self.new
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AwardOutcome {
    Awarded {
        points: i64,
        multiplier: f64,
        total: i64,
        level: LevelChange,
    },
    Duplicate,
    DailyCapReached {
        earned_today: i64,
        limit: i64,
    },
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn scale_points(base: i64, multiplier: f64) -> i64 {
    (base as f64 * multiplier).round() as i64
}

impl Database {
    pub async fn member(&self, user: UserId) -> Result<Option<member::Model>, DbErr> {
        Member::find_by_id(user.get() as i64).one(&self.db).await
    }
    pub async fn member_exists(&self, user: UserId) -> Result<bool, DbErr> {
        Ok(Member::find_by_id(user.get() as i64).count(&self.db).await? > 0)
    }
    pub async fn members(&self) -> Result<Vec<member::Model>, DbErr> {
        Member::find().all(&self.db).await
    }
    pub async fn ensure_member(&self, user: UserId, today: NaiveDate) -> Result<(), DbErr> {
        ensure_member_on(&self.db, user, today).await
    }
    /// Adds points, creating the member if needed, and returns the new total.
    pub async fn add_points(&self, user: UserId, points: i64, today: NaiveDate) -> Result<i64, DbErr> {
        let txn = self.db.begin().await?;
        ensure_member_on(&txn, user, today).await?;
        let total = add_points_on(&txn, user, points).await?;
        txn.commit().await?;
        Ok(total)
    }
    pub async fn set_points(&self, user: UserId, points: i64, today: NaiveDate) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        ensure_member_on(&txn, user, today).await?;
        Member::update_many()
            .col_expr(member::Column::TotalPoints, Expr::value(points))
            .filter(member::Column::Id.eq(user.get() as i64))
            .exec(&txn)
            .await?;
        txn.commit().await
    }
    /// Applies a signed change, never going below zero. `None` if the member is unknown.
    pub async fn adjust_points(&self, user: UserId, delta: i64) -> Result<Option<i64>, DbErr> {
        let txn = self.db.begin().await?;
        let Some(current) = Member::find_by_id(user.get() as i64).one(&txn).await? else {
            return Ok(None);
        };
        let total = current.total_points.saturating_add(delta).max(0);
        Member::update_many()
            .col_expr(member::Column::TotalPoints, Expr::value(total))
            .filter(member::Column::Id.eq(user.get() as i64))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(Some(total))
    }
    /// Zeroes a member's points and level and forgets their milestones.
    pub async fn reset_points(&self, user: UserId) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;
        let res = Member::update_many()
            .col_expr(member::Column::TotalPoints, Expr::value(0))
            .col_expr(member::Column::Level, Expr::value(0))
            .filter(member::Column::Id.eq(user.get() as i64))
            .exec(&txn)
            .await?;
        MilestoneLog::delete_many()
            .filter(milestone_log::Column::Member.eq(user.get() as i64))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }
    pub async fn reset_all_points(&self) -> Result<u64, DbErr> {
        let txn = self.db.begin().await?;
        let res = Member::update_many()
            .col_expr(member::Column::TotalPoints, Expr::value(0))
            .col_expr(member::Column::Level, Expr::value(0))
            .exec(&txn)
            .await?;
        MilestoneLog::delete_many().exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected)
    }
    pub async fn update_level(&self, user: UserId) -> Result<LevelChange, DbErr> {
        update_level_on(&self.db, user).await
    }
    /// Points earned in the 24 hours before `at`.
    pub async fn daily_points(&self, user: UserId, at: DateTime<Utc>) -> Result<i64, DbErr> {
        daily_points_on(&self.db, user, at).await
    }
    pub async fn can_earn(
        &self,
        user: UserId,
        points: i64,
        limit: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        Ok(self.daily_points(user, at).await?.saturating_add(points) <= limit)
    }
    pub async fn member_rank(&self, user: UserId) -> Result<Option<u64>, DbErr> {
        let Some(member) = self.member(user).await? else {
            return Ok(None);
        };
        let ahead = Member::find()
            .filter(member::Column::TotalPoints.gt(member.total_points))
            .count(&self.db)
            .await?;
        Ok(Some(ahead + 1))
    }
    pub async fn member_count(&self) -> Result<u64, DbErr> {
        Member::find().count(&self.db).await
    }
    pub async fn log_engagement(
        &self,
        user: UserId,
        activity: Activity,
        object: Option<String>,
        channel: Option<ChannelId>,
        points: i64,
        at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        log_engagement_on(&self.db, user, activity, object, channel, points, 1.0, at).await
    }
    pub async fn has_reacted(&self, user: UserId, message: MessageId) -> Result<bool, DbErr> {
        is_duplicate_on(&self.db, user, Activity::Reaction, &message.to_string()).await
    }
    pub async fn has_invited(&self, invitee: UserId) -> Result<bool, DbErr> {
        is_duplicate_on(&self.db, invitee, Activity::Invite, &invite_object(invitee)).await
    }
    /// Records one engagement event and everything that follows from it atomically.
    pub async fn award(&self, award: &Award) -> Result<AwardOutcome, DbErr> {
        let today = award.at.date_naive();
        let txn = self.db.begin().await?;
        if let Some(object) = &award.object {
            if is_duplicate_on(&txn, award.member, award.activity, object).await? {
                txn.commit().await?;
                return Ok(AwardOutcome::Duplicate);
            }
        }
        ensure_member_on(&txn, award.member, today).await?;
        let multiplier = match award.channel {
            Some(channel) if award.apply_campaigns && award.activity.is_capped() => {
                campaign_multiplier_on(&txn, channel, today).await?
            }
            _ => 1.0,
        };
        let points = scale_points(award.base_points, multiplier);
        if let Some(limit) = award.daily_limit.filter(|_| award.activity.is_capped()) {
            let earned_today = daily_points_on(&txn, award.member, award.at).await?;
            if earned_today.saturating_add(points) > limit {
                update_streak_on(&txn, award.member, today).await?;
                txn.commit().await?;
                return Ok(AwardOutcome::DailyCapReached {
                    earned_today,
                    limit,
                });
            }
        }
        let total = add_points_on(&txn, award.member, points).await?;
        log_engagement_on(
            &txn,
            award.member,
            award.activity,
            award.object.clone(),
            award.channel,
            points,
            multiplier,
            award.at,
        )
        .await?;
        update_streak_on(&txn, award.member, today).await?;
        let level = update_level_on(&txn, award.member).await?;
        txn.commit().await?;
        Ok(AwardOutcome::Awarded {
            points,
            multiplier,
            total,
            level,
        })
    }
}

pub fn invite_object(invitee: UserId) -> String {
    format!("invite_{invitee}")
}

async fn ensure_member_on<C: ConnectionTrait>(
    conn: &C,
    user: UserId,
    today: NaiveDate,
) -> Result<(), DbErr> {
    Member::insert(member::ActiveModel {
        id: Set(user.get() as i64),
        total_points: Set(0),
        level: Set(0),
        current_streak: Set(0),
        longest_streak: Set(0),
        last_activity_date: Set(Some(yesterday(today))),
    })
    .on_conflict(OnConflict::column(member::Column::Id).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn add_points_on<C: ConnectionTrait>(conn: &C, user: UserId, points: i64) -> Result<i64, DbErr> {
    Member::update_many()
        .col_expr(
            member::Column::TotalPoints,
            Expr::col(member::Column::TotalPoints).add(points),
        )
        .filter(member::Column::Id.eq(user.get() as i64))
        .exec(conn)
        .await?;
    Ok(Member::find_by_id(user.get() as i64)
        .select_only()
        .column(member::Column::TotalPoints)
        .into_tuple::<i64>()
        .one(conn)
        .await?
        .unwrap_or_default())
}

/// Value of the highest active milestone at or below `points`, 0 when none.
pub(super) async fn level_for_on<C: ConnectionTrait>(conn: &C, points: i64) -> Result<i64, DbErr> {
    Ok(Milestone::find()
        .select_only()
        .column_as(Expr::col(milestone::Column::Value).max(), "level")
        .filter(milestone::Column::Active.eq(true))
        .filter(milestone::Column::Value.lte(points))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?
        .flatten()
        .unwrap_or(0))
}

async fn update_level_on<C: ConnectionTrait>(conn: &C, user: UserId) -> Result<LevelChange, DbErr> {
    let Some(member) = Member::find_by_id(user.get() as i64).one(conn).await? else {
        return Ok(LevelChange { old: 0, new: 0 });
    };
    let new = level_for_on(conn, member.total_points).await?;
    if new != member.level {
        Member::update_many()
            .col_expr(member::Column::Level, Expr::value(new))
            .filter(member::Column::Id.eq(member.id))
            .exec(conn)
            .await?;
    }
    Ok(LevelChange {
        old: member.level,
        new,
    })
}

/// Same day keeps the streak, the next day extends it, anything else restarts it.
pub(super) fn next_streak(last: Option<NaiveDate>, current: i32, today: NaiveDate) -> i32 {
    match last {
        Some(last) if last == today => current,
        Some(last) if last.succ_opt() == Some(today) => current + 1,
        _ => 1,
    }
}

async fn update_streak_on<C: ConnectionTrait>(
    conn: &C,
    user: UserId,
    today: NaiveDate,
) -> Result<(i32, i32), DbErr> {
    let Some(member) = Member::find_by_id(user.get() as i64).one(conn).await? else {
        return Ok((0, 0));
    };
    let current = next_streak(member.last_activity_date, member.current_streak, today);
    let longest = member.longest_streak.max(current);
    Member::update(member::ActiveModel {
        id: Set(member.id),
        total_points: NotSet,
        level: NotSet,
        current_streak: Set(current),
        longest_streak: Set(longest),
        last_activity_date: Set(Some(today)),
    })
    .exec(conn)
    .await?;
    Ok((current, longest))
}

async fn daily_points_on<C: ConnectionTrait>(
    conn: &C,
    user: UserId,
    at: DateTime<Utc>,
) -> Result<i64, DbErr> {
    Ok(EngagementLog::find()
        .select_only()
        .column_as(Expr::col(engagement_log::Column::Points).sum(), "points")
        .filter(engagement_log::Column::Member.eq(user.get() as i64))
        .filter(engagement_log::Column::CreatedAt.gt(unix_time(at) - SECONDS_PER_DAY))
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?
        .flatten()
        .unwrap_or(0))
}

/// Invites are unique per invitee across all inviters, everything else per member.
async fn is_duplicate_on<C: ConnectionTrait>(
    conn: &C,
    user: UserId,
    activity: Activity,
    object: &str,
) -> Result<bool, DbErr> {
    let mut query = EngagementLog::find()
        .filter(engagement_log::Column::Activity.eq(activity.as_str()))
        .filter(engagement_log::Column::ObjectId.eq(object));
    if activity != Activity::Invite {
        query = query.filter(engagement_log::Column::Member.eq(user.get() as i64));
    }
    Ok(query.count(conn).await? > 0)
}

#[allow(clippy::too_many_arguments)]
async fn log_engagement_on<C: ConnectionTrait>(
    conn: &C,
    user: UserId,
    activity: Activity,
    object: Option<String>,
    channel: Option<ChannelId>,
    points: i64,
    multiplier: f64,
    at: DateTime<Utc>,
) -> Result<(), DbErr> {
    EngagementLog::insert(engagement_log::ActiveModel {
        id: NotSet,
        member: Set(user.get() as i64),
        activity: Set(activity.as_str().to_owned()),
        object_id: Set(object),
        channel: Set(channel.map(|channel| channel.get() as i64)),
        points: Set(points),
        multiplier: Set(multiplier),
        created_at: Set(unix_time(at)),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_db;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn message(user: u64, object: &str, points: i64, when: DateTime<Utc>) -> Award {
        Award {
            member: UserId::new(user),
            activity: Activity::Message,
            object: Some(object.to_owned()),
            channel: Some(ChannelId::new(500)),
            base_points: points,
            daily_limit: None,
            apply_campaigns: true,
            at: when,
        }
    }

    #[test]
    fn streaks_follow_consecutive_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(next_streak(Some(today), 4, today), 4);
        assert_eq!(next_streak(Some(yesterday(today)), 4, today), 5);
        assert_eq!(next_streak(NaiveDate::from_ymd_opt(2025, 3, 7), 4, today), 1);
        assert_eq!(next_streak(None, 0, today), 1);
    }

    #[test]
    fn campaign_points_are_rounded() {
        assert_eq!(scale_points(5, 1.0), 5);
        assert_eq!(scale_points(5, 1.5), 8);
        assert_eq!(scale_points(10, 2.25), 23);
    }

    #[tokio::test]
    async fn awards_create_members_and_track_levels() {
        let db = test_db().await;
        let outcome = db.award(&message(1, "m1", 1000, at(1, 10))).await.unwrap();
        let AwardOutcome::Awarded { points, total, level, .. } = outcome else {
            panic!("expected an award, got {outcome:?}");
        };
        assert_eq!((points, total), (1000, 1000));
        assert_eq!(level, LevelChange { old: 0, new: 1000 });
        assert!(level.changed());
        let member = db.member(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(member.level, 1000);
        assert_eq!(member.current_streak, 1);
    }

    #[tokio::test]
    async fn reactions_are_counted_once_per_message() {
        let db = test_db().await;
        let mut reaction = message(2, "42", 5, at(1, 10));
        reaction.activity = Activity::Reaction;
        assert!(matches!(
            db.award(&reaction).await.unwrap(),
            AwardOutcome::Awarded { .. }
        ));
        assert_eq!(db.award(&reaction).await.unwrap(), AwardOutcome::Duplicate);
        assert!(db.has_reacted(UserId::new(2), MessageId::new(42)).await.unwrap());
        let mut other = reaction.clone();
        other.member = UserId::new(3);
        assert!(matches!(
            db.award(&other).await.unwrap(),
            AwardOutcome::Awarded { .. }
        ));
    }

    #[tokio::test]
    async fn daily_cap_blocks_points_but_keeps_the_streak() {
        let db = test_db().await;
        let user = UserId::new(4);
        for (index, object) in ["a", "b"].into_iter().enumerate() {
            let mut award = message(4, object, 5, at(1, 10 + index as u32));
            award.daily_limit = Some(10);
            assert!(matches!(
                db.award(&award).await.unwrap(),
                AwardOutcome::Awarded { .. }
            ));
        }
        let mut capped = message(4, "c", 5, at(2, 9));
        capped.daily_limit = Some(10);
        assert_eq!(
            db.award(&capped).await.unwrap(),
            AwardOutcome::DailyCapReached {
                earned_today: 10,
                limit: 10
            }
        );
        let member = db.member(user).await.unwrap().unwrap();
        assert_eq!(member.total_points, 10);
        assert_eq!(member.current_streak, 2);
        assert!(!db.can_earn(user, 1, 10, at(2, 9)).await.unwrap());
        assert!(db.can_earn(user, 5, 10, at(2, 12)).await.unwrap());
    }

    #[tokio::test]
    async fn oversized_awards_are_capped_instead_of_overflowing() {
        let db = test_db().await;
        let mut first = message(8, "a", 5, at(4, 10));
        first.daily_limit = Some(100);
        assert!(matches!(
            db.award(&first).await.unwrap(),
            AwardOutcome::Awarded { points: 5, .. }
        ));
        let mut huge = message(8, "b", i64::MAX, at(4, 11));
        huge.daily_limit = Some(100);
        huge.apply_campaigns = false;
        assert_eq!(
            db.award(&huge).await.unwrap(),
            AwardOutcome::DailyCapReached {
                earned_today: 5,
                limit: 100
            }
        );
        assert!(!db.can_earn(UserId::new(8), i64::MAX, 100, at(4, 12)).await.unwrap());
    }

    #[tokio::test]
    async fn invites_skip_cap_and_count_once_per_invitee() {
        let db = test_db().await;
        let invitee = UserId::new(99);
        let award = Award {
            member: UserId::new(5),
            activity: Activity::Invite,
            object: Some(invite_object(invitee)),
            channel: None,
            base_points: 1000,
            daily_limit: Some(100),
            apply_campaigns: true,
            at: at(3, 10),
        };
        assert!(matches!(
            db.award(&award).await.unwrap(),
            AwardOutcome::Awarded { points: 1000, .. }
        ));
        assert!(db.has_invited(invitee).await.unwrap());
        let mut other_inviter = award.clone();
        other_inviter.member = UserId::new(6);
        assert_eq!(db.award(&other_inviter).await.unwrap(), AwardOutcome::Duplicate);
    }

    #[tokio::test]
    async fn adjustments_floor_at_zero() {
        let db = test_db().await;
        let user = UserId::new(7);
        assert_eq!(db.adjust_points(user, 10).await.unwrap(), None);
        db.add_points(user, 30, at(1, 0).date_naive()).await.unwrap();
        assert_eq!(db.adjust_points(user, -50).await.unwrap(), Some(0));
        db.set_points(user, 6000, at(1, 0).date_naive()).await.unwrap();
        assert_eq!(
            db.update_level(user).await.unwrap(),
            LevelChange { old: 0, new: 5000 }
        );
    }

    #[tokio::test]
    async fn ranks_count_members_strictly_ahead() {
        let db = test_db().await;
        let today = at(1, 0).date_naive();
        db.add_points(UserId::new(1), 50, today).await.unwrap();
        db.add_points(UserId::new(2), 50, today).await.unwrap();
        db.add_points(UserId::new(3), 10, today).await.unwrap();
        assert_eq!(db.member_rank(UserId::new(1)).await.unwrap(), Some(1));
        assert_eq!(db.member_rank(UserId::new(2)).await.unwrap(), Some(1));
        assert_eq!(db.member_rank(UserId::new(3)).await.unwrap(), Some(3));
        assert_eq!(db.member_rank(UserId::new(4)).await.unwrap(), None);
        assert_eq!(db.member_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn resets_clear_levels_and_milestones() {
        let db = test_db().await;
        let user = UserId::new(8);
        db.award(&message(8, "x", 1200, at(1, 1))).await.unwrap();
        db.record_milestone(user, 1000, "AB123", at(1, 1)).await.unwrap();
        assert!(db.reset_points(user).await.unwrap());
        let member = db.member(user).await.unwrap().unwrap();
        assert_eq!((member.total_points, member.level), (0, 0));
        assert!(!db.reward_code_exists("AB123").await.unwrap());
        db.add_points(user, 20, at(1, 1).date_naive()).await.unwrap();
        assert_eq!(db.reset_all_points().await.unwrap(), 1);
    }
}
