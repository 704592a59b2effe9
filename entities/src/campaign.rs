use sea_orm::entity::prelude::*;

/// A channel whose points are multiplied between two dates (inclusive).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaign")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub channel: i64,
    pub name: String,
    pub multiplier: f64,
    pub start_date: Date,
    pub end_date: Date,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
