use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "member")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub total_points: i64,
    /// Value of the highest active milestone reached, 0 when none.
    pub level: i64,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::engagement_log::Entity")]
    EngagementLog,
    #[sea_orm(has_many = "super::milestone_log::Entity")]
    MilestoneLog,
}

impl Related<super::engagement_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EngagementLog.def()
    }
}

impl Related<super::milestone_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilestoneLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
