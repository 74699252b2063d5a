use sea_orm::entity::prelude::*;

/// Id sets are stored as JSON arrays of snowflakes.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "guild_config")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: i64,
    pub xp_enabled: bool,
    pub blacklisted_xp_users: String,
    pub ignored_xp_channels: String,
    pub ignored_xp_roles: String,
    pub announcement_channel: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
