use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250715_000001_level_features"
    }
}

const NEW_CONFIG: [(&str, &str); 7] = [
    ("voice_channel_display_enabled", "true"),
    ("voice_channel_update_interval", "60"),
    ("level_roles_enabled", "true"),
    ("campaign_system_enabled", "true"),
    ("dashboard_enabled", "true"),
    ("mystats_enabled", "true"),
    ("auto_assign_roles_on_startup", "true"),
];

struct LevelMilestone {
    value: i64,
    message: &'static str,
    role_name: Option<&'static str>,
    reward: &'static str,
}

const LEVEL_MILESTONES: [LevelMilestone; 7] = [
    LevelMilestone {
        value: 1000,
        message: "😊 Congrats! You've reached 1,000 points and unlocked the special \"Pit Novice\" role!",
        role_name: Some("Pit Novice"),
        reward: "Beginner Trader Badge - Unlock a special Discord role \"Pit Novice\"",
    },
    LevelMilestone {
        value: 5000,
        message: "💥 You're on fire! You've hit 5,000 points and receive a 5% discount! (prime challenges excluding 5K)",
        role_name: None,
        reward: "5% discount (prime challenges excluding 5K)",
    },
    LevelMilestone {
        value: 10000,
        message: "🤯 Incredible! You've reached 10,000 points!\n(US participants will receive Futures accounts)",
        role_name: None,
        reward: "10 10K CFD accounts\n(US participants will receive Futures accounts)",
    },
    LevelMilestone {
        value: 15000,
        message: "🎉 Well done! You've hit 15,000 points and earned a 15% discount!",
        role_name: None,
        reward: "15% discount",
    },
    LevelMilestone {
        value: 25000,
        message: "💼 Big moves! 25,000 points unlocked a 20% discount + a 20% Eshop voucher!",
        role_name: None,
        reward: "20% discount + 20% Eshop voucher\nNote: some regions might be eligible for discounts etc",
    },
    LevelMilestone {
        value: 40000,
        message: "🙌 You've crushed it! At 40,000 points, you've earned a TTP hoodie and a 30% voucher!",
        role_name: None,
        reward: "Hoodie + 30% voucher",
    },
    LevelMilestone {
        value: 50000,
        message: "👑 Legendary! 50,000 points reached. You've earned a free 50,000 CFD account and the coveted \"TTP Superfan\" role!",
        role_name: Some("TTP Superfan"),
        reward: "Free account + special Discord role \"TTP Superfan\"",
    },
];

const BACKFILL_LEVELS: &str = "UPDATE member SET \
    level = COALESCE((SELECT MAX(milestone.value) FROM milestone \
        WHERE milestone.active = 1 AND milestone.value <= member.total_points), 0), \
    last_activity_date = date('now', '-1 day')";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite only accepts one column per ALTER TABLE.
        let member_columns = [
            ColumnDef::new(Member::Level)
                .not_null()
                .big_integer()
                .default(0)
                .to_owned(),
            ColumnDef::new(Member::CurrentStreak)
                .not_null()
                .integer()
                .default(0)
                .to_owned(),
            ColumnDef::new(Member::LongestStreak)
                .not_null()
                .integer()
                .default(0)
                .to_owned(),
            ColumnDef::new(Member::LastActivityDate).date().to_owned(),
        ];
        for mut column in member_columns {
            manager
                .alter_table(
                    Table::alter()
                        .table(Member::Table)
                        .add_column(&mut column)
                        .to_owned(),
                )
                .await?;
        }
        let milestone_columns = [
            ColumnDef::new(Milestone::RoleName).string().to_owned(),
            ColumnDef::new(Milestone::LevelBased)
                .not_null()
                .boolean()
                .default(false)
                .to_owned(),
            ColumnDef::new(Milestone::Reward).text().to_owned(),
        ];
        for mut column in milestone_columns {
            manager
                .alter_table(
                    Table::alter()
                        .table(Milestone::Table)
                        .add_column(&mut column)
                        .to_owned(),
                )
                .await?;
        }
        manager
            .alter_table(
                Table::alter()
                    .table(EngagementLog::Table)
                    .add_column(
                        ColumnDef::new(EngagementLog::Multiplier)
                            .not_null()
                            .double()
                            .default(1.0),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Campaign::Table)
                    .col(
                        ColumnDef::new(Campaign::Channel)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .col(ColumnDef::new(Campaign::Name).not_null().string())
                    .col(
                        ColumnDef::new(Campaign::Multiplier)
                            .not_null()
                            .double()
                            .default(1.0),
                    )
                    .col(ColumnDef::new(Campaign::StartDate).not_null().date())
                    .col(ColumnDef::new(Campaign::EndDate).not_null().date())
                    .col(
                        ColumnDef::new(Campaign::Active)
                            .not_null()
                            .boolean()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(VoiceDisplayChannel::Table)
                    .col(
                        ColumnDef::new(VoiceDisplayChannel::Guild)
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(VoiceDisplayChannel::Position)
                            .not_null()
                            .integer(),
                    )
                    .col(
                        ColumnDef::new(VoiceDisplayChannel::Channel)
                            .not_null()
                            .big_integer(),
                    )
                    .primary_key(
                        Index::create()
                            .col(VoiceDisplayChannel::Guild)
                            .col(VoiceDisplayChannel::Position),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(ExcludedMember::Table)
                    .col(
                        ColumnDef::new(ExcludedMember::Id)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Member::Table)
                    .col(Member::Level)
                    .name("idx-member-level")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Member::Table)
                    .col(Member::CurrentStreak)
                    .name("idx-member-current_streak")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(EngagementLog::Table)
                    .col(EngagementLog::Member)
                    .col(EngagementLog::Activity)
                    .name("idx-engagement_log-member-activity")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(EngagementLog::Table)
                    .col(EngagementLog::CreatedAt)
                    .name("idx-engagement_log-created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Milestone::Table)
                    .col(Milestone::LevelBased)
                    .col(Milestone::Value)
                    .name("idx-milestone-level_based-value")
                    .to_owned(),
            )
            .await?;
        let mut config = Query::insert();
        config
            .into_table(Config::Table)
            .columns([Config::Key, Config::Value])
            .on_conflict(OnConflict::column(Config::Key).do_nothing().to_owned());
        for (key, value) in NEW_CONFIG {
            config.values_panic([key.into(), value.into()]);
        }
        manager.exec_stmt(config).await?;
        let mut milestones = Query::insert();
        milestones
            .into_table(Milestone::Table)
            .columns([
                Milestone::Value,
                Milestone::Active,
                Milestone::Message,
                Milestone::RoleName,
                Milestone::LevelBased,
                Milestone::Reward,
            ])
            .on_conflict(
                OnConflict::column(Milestone::Value)
                    .update_columns([
                        Milestone::Active,
                        Milestone::Message,
                        Milestone::RoleName,
                        Milestone::LevelBased,
                        Milestone::Reward,
                    ])
                    .to_owned(),
            );
        for milestone in LEVEL_MILESTONES {
            milestones.values_panic([
                milestone.value.into(),
                true.into(),
                milestone.message.into(),
                milestone.role_name.into(),
                true.into(),
                milestone.reward.into(),
            ]);
        }
        manager.exec_stmt(milestones).await?;
        manager
            .get_connection()
            .execute_unprepared(BACKFILL_LEVELS)
            .await?;
        Ok(())
    }
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for index in [
            "idx-member-level",
            "idx-member-current_streak",
            "idx-engagement_log-member-activity",
            "idx-engagement_log-created_at",
            "idx-milestone-level_based-value",
        ] {
            manager
                .drop_index(Index::drop().name(index).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(ExcludedMember::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VoiceDisplayChannel::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaign::Table).to_owned())
            .await?;
        manager
            .alter_table(
                Table::alter()
                    .table(EngagementLog::Table)
                    .drop_column(EngagementLog::Multiplier)
                    .to_owned(),
            )
            .await?;
        for column in [Milestone::RoleName, Milestone::LevelBased, Milestone::Reward] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Milestone::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }
        for column in [
            Member::Level,
            Member::CurrentStreak,
            Member::LongestStreak,
            Member::LastActivityDate,
        ] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Member::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }
}

#[derive(Iden)]
pub enum Member {
    Table,
    Level,
    CurrentStreak,
    LongestStreak,
    LastActivityDate,
}
#[derive(Iden)]
pub enum Milestone {
    Table,
    Value,
    Active,
    Message,
    RoleName,
    LevelBased,
    Reward,
}
#[derive(Iden)]
pub enum EngagementLog {
    Table,
    Member,
    Activity,
    CreatedAt,
    Multiplier,
}
#[derive(Iden)]
pub enum Config {
    Table,
    Key,
    Value,
}
#[derive(Iden)]
pub enum Campaign {
    Table,
    Channel,
    Name,
    Multiplier,
    StartDate,
    EndDate,
    Active,
}
#[derive(Iden)]
pub enum VoiceDisplayChannel {
    Table,
    Guild,
    Position,
    Channel,
}
#[derive(Iden)]
pub enum ExcludedMember {
    Table,
    Id,
}
