use super::Database;
use entities::{prelude::*, tracked_channel};
use poise::serenity_prelude::ChannelId;
use sea_orm::{prelude::*, ActiveValue::Set, QueryOrder, QuerySelect};
use sea_query::{Expr, OnConflict};
use std::sync::Arc;

impl Database {
    /// Checked on every message, so it goes through the cache.
    pub async fn is_tracked(&self, channel: ChannelId) -> Result<bool, Arc<DbErr>> {
        self.tracked_cache
            .try_get_with(channel, async {
                Ok(TrackedChannel::find_by_id(channel.get() as i64)
                    .filter(tracked_channel::Column::Active.eq(true))
                    .count(&self.db)
                    .await?
                    > 0)
            })
            .await
    }
    /// Returns false when the channel was already tracked.
    pub async fn track_channel(&self, channel: ChannelId) -> Result<bool, DbErr> {
        let newly_tracked = track_channel_on(&self.db, channel).await?;
        self.tracked_cache.invalidate(&channel).await;
        Ok(newly_tracked)
    }
    pub async fn untrack_channel(&self, channel: ChannelId) -> Result<bool, DbErr> {
        let res = TrackedChannel::update_many()
            .col_expr(tracked_channel::Column::Active, Expr::value(false))
            .filter(tracked_channel::Column::Id.eq(channel.get() as i64))
            .filter(tracked_channel::Column::Active.eq(true))
            .exec(&self.db)
            .await?;
        self.tracked_cache.invalidate(&channel).await;
        Ok(res.rows_affected > 0)
    }
    pub async fn tracked_channels(&self) -> Result<Vec<ChannelId>, DbErr> {
        Ok(TrackedChannel::find()
            .select_only()
            .column(tracked_channel::Column::Id)
            .filter(tracked_channel::Column::Active.eq(true))
            .order_by_asc(tracked_channel::Column::Id)
            .into_tuple::<i64>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|id| ChannelId::new(id as u64))
            .collect())
    }
}

pub(super) async fn track_channel_on<C: ConnectionTrait>(
    conn: &C,
    channel: ChannelId,
) -> Result<bool, DbErr> {
    let was_tracked = TrackedChannel::find_by_id(channel.get() as i64)
        .filter(tracked_channel::Column::Active.eq(true))
        .count(conn)
        .await?
        > 0;
    TrackedChannel::insert(tracked_channel::ActiveModel {
        id: Set(channel.get() as i64),
        active: Set(true),
    })
    .on_conflict(
        OnConflict::column(tracked_channel::Column::Id)
            .update_column(tracked_channel::Column::Active)
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;
    Ok(!was_tracked)
}

#[cfg(test)]
mod tests {
    use crate::database::test_db;
    use poise::serenity_prelude::ChannelId;

    #[tokio::test]
    async fn tracking_is_reflected_through_the_cache() {
        let db = test_db().await;
        let channel = ChannelId::new(77);
        assert!(!db.is_tracked(channel).await.unwrap());
        assert!(db.track_channel(channel).await.unwrap());
        assert!(!db.track_channel(channel).await.unwrap());
        assert!(db.is_tracked(channel).await.unwrap());
        assert_eq!(db.tracked_channels().await.unwrap(), vec![channel]);
        assert!(db.untrack_channel(channel).await.unwrap());
        assert!(!db.untrack_channel(channel).await.unwrap());
        assert!(!db.is_tracked(channel).await.unwrap());
        assert!(db.tracked_channels().await.unwrap().is_empty());
    }
}
