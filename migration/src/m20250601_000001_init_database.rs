use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250601_000001_init_database"
    }
}

const DEFAULT_CONFIG: [(&str, &str); 6] = [
    ("points_per_message", "5"),
    ("points_per_reaction", "5"),
    ("points_per_image", "10"),
    ("points_per_share", "50"),
    ("points_per_invite", "1000"),
    ("daily_points_limit", "100"),
];

const DEFAULT_MILESTONES: [(i64, &str); 3] = [
    (1000, "🎉 Congrats! You've reached 1,000 points!"),
    (5000, "🚀 You're on fire! You've hit 5,000 points!"),
    (10000, "🏆 Incredible! You've reached 10,000 points!"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    #[allow(clippy::too_many_lines)]
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Member::Table)
                    .col(
                        ColumnDef::new(Member::Id)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(Member::TotalPoints)
                            .not_null()
                            .big_integer()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Config::Table)
                    .col(ColumnDef::new(Config::Key).primary_key().not_null().string())
                    .col(ColumnDef::new(Config::Value).not_null().string())
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Admin::Table)
                    .col(
                        ColumnDef::new(Admin::Id)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(Admin::Active)
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
                    .table(TrackedChannel::Table)
                    .col(
                        ColumnDef::new(TrackedChannel::Id)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(TrackedChannel::Active)
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
                    .table(Milestone::Table)
                    .col(
                        ColumnDef::new(Milestone::Value)
                            .primary_key()
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(Milestone::Active)
                            .not_null()
                            .boolean()
                            .default(true),
                    )
                    .col(ColumnDef::new(Milestone::Message).text())
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(MilestoneLog::Table)
                    .col(
                        ColumnDef::new(MilestoneLog::Id)
                            .primary_key()
                            .not_null()
                            .integer()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(MilestoneLog::Member).not_null().big_integer())
                    .col(
                        ColumnDef::new(MilestoneLog::Milestone)
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(MilestoneLog::ReachedAt)
                            .not_null()
                            .big_integer(),
                    )
                    .col(
                        ColumnDef::new(MilestoneLog::UserNotified)
                            .not_null()
                            .boolean()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MilestoneLog::AdminNotified)
                            .not_null()
                            .boolean()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MilestoneLog::RewardSent)
                            .not_null()
                            .boolean()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(MilestoneLog::RewardCode)
                            .not_null()
                            .string()
                            .unique_key(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-milestone_log-member")
                            .from(MilestoneLog::Table, MilestoneLog::Member)
                            .to(Member::Table, Member::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(EngagementLog::Table)
                    .col(
                        ColumnDef::new(EngagementLog::Id)
                            .primary_key()
                            .not_null()
                            .integer()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(EngagementLog::Member)
                            .not_null()
                            .big_integer(),
                    )
                    .col(ColumnDef::new(EngagementLog::Activity).not_null().string())
                    .col(ColumnDef::new(EngagementLog::ObjectId).string())
                    .col(ColumnDef::new(EngagementLog::Channel).big_integer())
                    .col(
                        ColumnDef::new(EngagementLog::Points)
                            .not_null()
                            .big_integer()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(EngagementLog::CreatedAt)
                            .not_null()
                            .big_integer(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-engagement_log-member")
                            .from(EngagementLog::Table, EngagementLog::Member)
                            .to(Member::Table, Member::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(MilestoneLog::Table)
                    .col(MilestoneLog::Member)
                    .col(MilestoneLog::Milestone)
                    .name("idx-milestone_log-member-milestone")
                    .unique()
                    .to_owned(),
            )
            .await?;
        let mut config = Query::insert();
        config
            .into_table(Config::Table)
            .columns([Config::Key, Config::Value])
            .on_conflict(OnConflict::column(Config::Key).do_nothing().to_owned());
        for (key, value) in DEFAULT_CONFIG {
            config.values_panic([key.into(), value.into()]);
        }
        manager.exec_stmt(config).await?;
        let mut milestones = Query::insert();
        milestones
            .into_table(Milestone::Table)
            .columns([Milestone::Value, Milestone::Active, Milestone::Message])
            .on_conflict(OnConflict::column(Milestone::Value).do_nothing().to_owned());
        for (value, message) in DEFAULT_MILESTONES {
            milestones.values_panic([value.into(), true.into(), message.into()]);
        }
        manager.exec_stmt(milestones).await
    }
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EngagementLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MilestoneLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Milestone::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TrackedChannel::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Admin::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Config::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Member::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Member {
    Table,
    Id,
    TotalPoints,
}
#[derive(Iden)]
pub enum Config {
    Table,
    Key,
    Value,
}
#[derive(Iden)]
pub enum Admin {
    Table,
    Id,
    Active,
}
#[derive(Iden)]
pub enum TrackedChannel {
    Table,
    Id,
    Active,
}
#[derive(Iden)]
pub enum Milestone {
    Table,
    Value,
    Active,
    Message,
}
#[derive(Iden)]
pub enum MilestoneLog {
    Table,
    Id,
    Member,
    Milestone,
    ReachedAt,
    UserNotified,
    AdminNotified,
    RewardSent,
    RewardCode,
}
#[derive(Iden)]
pub enum EngagementLog {
    Table,
    Id,
    Member,
    Activity,
    ObjectId,
    Channel,
    Points,
    CreatedAt,
}
