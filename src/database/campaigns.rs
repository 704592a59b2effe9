use super::{channels::track_channel_on, Database};
use chrono::NaiveDate;
use entities::{campaign, prelude::*};
use poise::serenity_prelude::ChannelId;
use sea_orm::{prelude::*, ActiveValue::Set, QueryOrder, TransactionTrait};
use sea_query::{Expr, OnConflict};

impl Database {
    /// Creates or replaces the campaign on a channel and starts tracking it.
    pub async fn add_campaign(
        &self,
        channel: ChannelId,
        name: impl Into<String> + Send,
        multiplier: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(), DbErr> {
        let txn = self.db.begin().await?;
        Campaign::insert(campaign::ActiveModel {
            channel: Set(channel.get() as i64),
            name: Set(name.into()),
            multiplier: Set(multiplier),
            start_date: Set(start),
            end_date: Set(end),
            active: Set(true),
        })
        .on_conflict(
            OnConflict::column(campaign::Column::Channel)
                .update_columns([
                    campaign::Column::Name,
                    campaign::Column::Multiplier,
                    campaign::Column::StartDate,
                    campaign::Column::EndDate,
                    campaign::Column::Active,
                ])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        track_channel_on(&txn, channel).await?;
        txn.commit().await?;
        self.tracked_cache.invalidate(&channel).await;
        Ok(())
    }
    pub async fn campaign_multiplier(&self, channel: ChannelId, today: NaiveDate) -> Result<f64, DbErr> {
        campaign_multiplier_on(&self.db, channel, today).await
    }
    /// Campaigns running on `today`.
    pub async fn active_campaigns(&self, today: NaiveDate) -> Result<Vec<campaign::Model>, DbErr> {
        running_campaigns()
            .filter(campaign::Column::StartDate.lte(today))
            .filter(campaign::Column::EndDate.gte(today))
            .order_by_asc(campaign::Column::EndDate)
            .all(&self.db)
            .await
    }
    pub async fn all_campaigns(&self) -> Result<Vec<campaign::Model>, DbErr> {
        Campaign::find()
            .order_by_desc(campaign::Column::StartDate)
            .all(&self.db)
            .await
    }
    pub async fn set_campaign_active(&self, channel: ChannelId, active: bool) -> Result<bool, DbErr> {
        Ok(Campaign::update_many()
            .col_expr(campaign::Column::Active, Expr::value(active))
            .filter(campaign::Column::Channel.eq(channel.get() as i64))
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
    pub async fn delete_campaign(&self, channel: ChannelId) -> Result<bool, DbErr> {
        Ok(Campaign::delete_by_id(channel.get() as i64)
            .exec(&self.db)
            .await?
            .rows_affected
            > 0)
    }
}

fn running_campaigns() -> Select<Campaign> {
    Campaign::find().filter(campaign::Column::Active.eq(true))
}

pub(super) async fn campaign_multiplier_on<C: ConnectionTrait>(
    conn: &C,
    channel: ChannelId,
    today: NaiveDate,
) -> Result<f64, DbErr> {
    Ok(running_campaigns()
        .filter(campaign::Column::Channel.eq(channel.get() as i64))
        .filter(campaign::Column::StartDate.lte(today))
        .filter(campaign::Column::EndDate.gte(today))
        .one(conn)
        .await?
        .map_or(1.0, |campaign| campaign.multiplier))
}

#[cfg(test)]
mod tests {
    use crate::database::{test_db, Activity, Award, AwardOutcome};
    use chrono::{NaiveDate, TimeZone, Utc};
    use poise::serenity_prelude::{ChannelId, UserId};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    #[tokio::test]
    async fn multiplier_applies_only_inside_the_window() {
        let db = test_db().await;
        let channel = ChannelId::new(9);
        db.add_campaign(channel, "Launch week", 2.0, date(10), date(16))
            .await
            .unwrap();
        assert!(db.is_tracked(channel).await.unwrap());
        assert!((db.campaign_multiplier(channel, date(9)).await.unwrap() - 1.0).abs() < f64::EPSILON);
        assert!((db.campaign_multiplier(channel, date(10)).await.unwrap() - 2.0).abs() < f64::EPSILON);
        assert!((db.campaign_multiplier(channel, date(16)).await.unwrap() - 2.0).abs() < f64::EPSILON);
        assert_eq!(db.active_campaigns(date(12)).await.unwrap().len(), 1);
        assert!(db.active_campaigns(date(17)).await.unwrap().is_empty());
        assert!(db.set_campaign_active(channel, false).await.unwrap());
        assert!((db.campaign_multiplier(channel, date(12)).await.unwrap() - 1.0).abs() < f64::EPSILON);
        assert_eq!(db.all_campaigns().await.unwrap().len(), 1);
        assert!(db.delete_campaign(channel).await.unwrap());
        assert!(!db.delete_campaign(channel).await.unwrap());
    }

    #[tokio::test]
    async fn awards_in_campaign_channels_are_multiplied() {
        let db = test_db().await;
        let channel = ChannelId::new(11);
        db.add_campaign(channel, "Double", 1.5, date(1), date(30))
            .await
            .unwrap();
        let mut award = Award {
            member: UserId::new(1),
            activity: Activity::Image,
            object: Some(String::from("1")),
            channel: Some(channel),
            base_points: 10,
            daily_limit: Some(100),
            apply_campaigns: true,
            at: Utc.with_ymd_and_hms(2025, 6, 5, 12, 0, 0).unwrap(),
        };
        assert!(matches!(
            db.award(&award).await.unwrap(),
            AwardOutcome::Awarded { points: 15, .. }
        ));
        award.object = Some(String::from("2"));
        award.apply_campaigns = false;
        assert!(matches!(
            db.award(&award).await.unwrap(),
            AwardOutcome::Awarded { points: 10, .. }
        ));
    }
}
