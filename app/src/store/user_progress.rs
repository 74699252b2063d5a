use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub xp_level: i32,
    pub xp_points: i64,
    pub warnings: i32,
    pub is_prestige: bool,
    pub prestige_level: i32,
    pub prestige_xp: i64,
    pub prestige_inserted_at: DateTimeUtc,
    pub prestige_updated_at: DateTimeUtc,
    pub inserted_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
