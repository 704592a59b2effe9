use super::Database;
use entities::{prelude::*, voice_display_channel};
use poise::serenity_prelude::{ChannelId, GuildId};
use sea_orm::{prelude::*, ActiveValue::Set, QueryOrder, QuerySelect};
use sea_query::OnConflict;

impl Database {
    pub async fn save_voice_display(
        &self,
        guild: GuildId,
        position: i32,
        channel: ChannelId,
    ) -> Result<(), DbErr> {
        VoiceDisplayChannel::insert(voice_display_channel::ActiveModel {
            guild: Set(guild.get() as i64),
            position: Set(position),
            channel: Set(channel.get() as i64),
        })
        .on_conflict(
            OnConflict::columns([
                voice_display_channel::Column::Guild,
                voice_display_channel::Column::Position,
            ])
            .update_column(voice_display_channel::Column::Channel)
            .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await?;
        Ok(())
    }
    /// Stored display channels of a guild, ordered by position.
    pub async fn voice_display(&self, guild: GuildId) -> Result<Vec<(i32, ChannelId)>, DbErr> {
        Ok(VoiceDisplayChannel::find()
            .select_only()
            .column(voice_display_channel::Column::Position)
            .column(voice_display_channel::Column::Channel)
            .filter(voice_display_channel::Column::Guild.eq(guild.get() as i64))
            .order_by_asc(voice_display_channel::Column::Position)
            .into_tuple::<(i32, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(position, channel)| (position, ChannelId::new(channel as u64)))
            .collect())
    }
    pub async fn delete_voice_display(&self, guild: GuildId) -> Result<u64, DbErr> {
        Ok(VoiceDisplayChannel::delete_many()
            .filter(voice_display_channel::Column::Guild.eq(guild.get() as i64))
            .exec(&self.db)
            .await?
            .rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::test_db;
    use poise::serenity_prelude::{ChannelId, GuildId};

    #[tokio::test]
    async fn positions_are_overwritten_per_guild() {
        let db = test_db().await;
        let guild = GuildId::new(1);
        db.save_voice_display(guild, 1, ChannelId::new(20)).await.unwrap();
        db.save_voice_display(guild, 0, ChannelId::new(10)).await.unwrap();
        db.save_voice_display(guild, 1, ChannelId::new(21)).await.unwrap();
        db.save_voice_display(GuildId::new(2), 0, ChannelId::new(30))
            .await
            .unwrap();
        assert_eq!(
            db.voice_display(guild).await.unwrap(),
            vec![(0, ChannelId::new(10)), (1, ChannelId::new(21))]
        );
        assert_eq!(db.delete_voice_display(guild).await.unwrap(), 2);
        assert!(db.voice_display(guild).await.unwrap().is_empty());
    }
}
