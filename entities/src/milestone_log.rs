use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "milestone_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub member: i64,
    pub milestone: i64,
    /// Unix seconds.
    pub reached_at: i64,
    pub user_notified: bool,
    pub admin_notified: bool,
    pub reward_sent: bool,
    #[sea_orm(unique)]
    pub reward_code: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::Member",
        to = "super::member::Column::Id"
    )]
    Member,
}

impl Related<super::member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Member.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
