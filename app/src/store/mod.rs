//! Persistence for user progression and guild configuration.
//!
//! Serenity ids are stored as `i64` and converted at this boundary, the same
//! way the rest of the bot never sees a raw database row.

pub mod guild_config;
pub mod user_progress;

use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, UserId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, Database,
    DatabaseConnection, EntityTrait, QueryFilter, Schema,
};
use std::collections::HashSet;
use std::hash::Hash;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{GuildConfig, Prestige, UserProgression};

#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connects and makes sure both tables exist.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        let store = Self::new(db);
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn init_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut users = schema.create_table_from_entity(user_progress::Entity);
        users.if_not_exists();
        self.db.execute(backend.build(&users)).await?;

        let mut guilds = schema.create_table_from_entity(guild_config::Entity);
        guilds.if_not_exists();
        self.db.execute(backend.build(&guilds)).await?;

        info!("Database schema ready");
        Ok(())
    }

    pub async fn find_guild(&self, guild_id: GuildId) -> Result<Option<GuildConfig>> {
        guild_config::Entity::find_by_id(guild_id.get() as i64)
            .one(&self.db)
            .await?
            .map(guild_from_model)
            .transpose()
    }

    pub async fn upsert_guild(&self, config: &GuildConfig) -> Result<()> {
        let model = guild_config::ActiveModel {
            guild_id: Set(config.guild_id.get() as i64),
            xp_enabled: Set(config.xp_enabled),
            blacklisted_xp_users: Set(encode_ids(&config.blacklisted_xp_users, |id| id.get())?),
            ignored_xp_channels: Set(encode_ids(&config.ignored_xp_channels, |id| id.get())?),
            ignored_xp_roles: Set(encode_ids(&config.ignored_xp_roles, |id| id.get())?),
            announcement_channel: Set(config.announcement_channel.map(|c| c.get() as i64)),
        };

        guild_config::Entity::insert(model)
            .on_conflict(
                OnConflict::column(guild_config::Column::GuildId)
                    .update_columns([
                        guild_config::Column::XpEnabled,
                        guild_config::Column::BlacklistedXpUsers,
                        guild_config::Column::IgnoredXpChannels,
                        guild_config::Column::IgnoredXpRoles,
                        guild_config::Column::AnnouncementChannel,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Guilds that opted into periodic announcements.
    pub async fn guilds_with_announcements(&self) -> Result<Vec<GuildConfig>> {
        guild_config::Entity::find()
            .filter(guild_config::Column::AnnouncementChannel.is_not_null())
            .all(&self.db)
            .await?
            .into_iter()
            .map(guild_from_model)
            .collect()
    }

    pub async fn find_user(&self, user_id: UserId) -> Result<Option<UserProgression>> {
        let model = user_progress::Entity::find_by_id(user_id.get() as i64)
            .one(&self.db)
            .await?;
        Ok(model.map(user_from_model))
    }

    pub async fn create_user(&self, user_id: UserId, now: DateTime<Utc>) -> Result<UserProgression> {
        let user = UserProgression::new(user_id, now);
        let model = user_progress::ActiveModel {
            user_id: Set(user_id.get() as i64),
            xp_level: Set(0),
            xp_points: Set(0),
            warnings: Set(0),
            is_prestige: Set(false),
            prestige_level: Set(0),
            prestige_xp: Set(0),
            prestige_inserted_at: Set(now),
            prestige_updated_at: Set(now),
            inserted_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&self.db).await?;
        debug!("Created progression record for user {}", user_id);
        Ok(user)
    }

    pub async fn find_or_create_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<UserProgression> {
        match self.find_user(user_id).await? {
            Some(user) => Ok(user),
            None => self.create_user(user_id, now).await,
        }
    }

    /// Writes the normal-track counters and nothing else.
    pub async fn update_level(
        &self,
        user_id: UserId,
        xp_points: u64,
        xp_level: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        user_progress::ActiveModel {
            user_id: Set(user_id.get() as i64),
            xp_points: Set(xp_points as i64),
            xp_level: Set(xp_level as i32),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }

    /// Writes the prestige-track counters and stamps the prestige update time.
    pub async fn update_prestige(
        &self,
        user_id: UserId,
        prestige_xp: u64,
        prestige_level: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        user_progress::ActiveModel {
            user_id: Set(user_id.get() as i64),
            prestige_xp: Set(prestige_xp as i64),
            prestige_level: Set(prestige_level as i32),
            prestige_updated_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .update(&self.db)
        .await?;
        Ok(())
    }
}

fn user_from_model(m: user_progress::Model) -> UserProgression {
    UserProgression {
        user_id: UserId::new(m.user_id as u64),
        xp_level: m.xp_level as u32,
        xp_points: m.xp_points as u64,
        warnings: m.warnings as u32,
        prestige: Prestige {
            is_prestige: m.is_prestige,
            prestige_level: m.prestige_level as u32,
            prestige_xp: m.prestige_xp as u64,
            prestige_inserted_at: m.prestige_inserted_at,
            prestige_updated_at: m.prestige_updated_at,
        },
        inserted_at: m.inserted_at,
        updated_at: m.updated_at,
    }
}

fn guild_from_model(m: guild_config::Model) -> Result<GuildConfig> {
    Ok(GuildConfig {
        guild_id: GuildId::new(m.guild_id as u64),
        xp_enabled: m.xp_enabled,
        blacklisted_xp_users: decode_ids(&m.blacklisted_xp_users)?,
        ignored_xp_channels: decode_ids(&m.ignored_xp_channels)?,
        ignored_xp_roles: decode_ids(&m.ignored_xp_roles)?,
        announcement_channel: m.announcement_channel.map(|c| ChannelId::new(c as u64)),
    })
}

fn encode_ids<T>(ids: &HashSet<T>, raw: impl Fn(&T) -> u64) -> Result<String> {
    let mut raw_ids: Vec<u64> = ids.iter().map(raw).collect();
    raw_ids.sort_unstable();
    Ok(serde_json::to_string(&raw_ids)?)
}

fn decode_ids<T: From<u64> + Eq + Hash>(raw: &str) -> Result<HashSet<T>> {
    let ids: Vec<u64> = serde_json::from_str(raw)?;
    Ok(ids.into_iter().map(T::from).collect())
}

#[cfg(test)]
pub(crate) async fn memory_store() -> Store {
    Store::connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

#[cfg(test)]
impl Store {
    /// Full overwrite of a progression record, for seeding test state.
    pub(crate) async fn save_user(&self, user: &UserProgression) -> Result<()> {
        let model = user_progress::ActiveModel {
            user_id: Set(user.user_id.get() as i64),
            xp_level: Set(user.xp_level as i32),
            xp_points: Set(user.xp_points as i64),
            warnings: Set(user.warnings as i32),
            is_prestige: Set(user.prestige.is_prestige),
            prestige_level: Set(user.prestige.prestige_level as i32),
            prestige_xp: Set(user.prestige.prestige_xp as i64),
            prestige_inserted_at: Set(user.prestige.prestige_inserted_at),
            prestige_updated_at: Set(user.prestige.prestige_updated_at),
            inserted_at: Set(user.inserted_at),
            updated_at: Set(user.updated_at),
        };
        user_progress::Entity::insert(model)
            .on_conflict(
                OnConflict::column(user_progress::Column::UserId)
                    .update_columns([
                        user_progress::Column::XpLevel,
                        user_progress::Column::XpPoints,
                        user_progress::Column::Warnings,
                        user_progress::Column::IsPrestige,
                        user_progress::Column::PrestigeLevel,
                        user_progress::Column::PrestigeXp,
                        user_progress::Column::PrestigeInsertedAt,
                        user_progress::Column::PrestigeUpdatedAt,
                        user_progress::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use poise::serenity_prelude::RoleId;

    #[tokio::test]
    async fn missing_records_are_none() {
        let store = memory_store().await;
        assert!(store.find_user(UserId::new(1)).await.unwrap().is_none());
        assert!(store.find_guild(GuildId::new(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_schema_is_repeatable() {
        let store = memory_store().await;
        store.init_schema().await.unwrap();
    }

    #[tokio::test]
    async fn find_or_create_creates_once() {
        let store = memory_store().await;
        let now = Utc::now();
        let created = store.find_or_create_user(UserId::new(5), now).await.unwrap();
        assert_eq!(created.xp_points, 0);
        assert!(!created.prestige.is_prestige);

        let later = now + TimeDelta::minutes(5);
        let found = store.find_or_create_user(UserId::new(5), later).await.unwrap();
        assert_eq!(found.inserted_at, created.inserted_at);
    }

    #[tokio::test]
    async fn level_update_leaves_prestige_untouched() {
        let store = memory_store().await;
        let now = Utc::now();
        let user = store.create_user(UserId::new(9), now).await.unwrap();

        let later = now + TimeDelta::seconds(30);
        store.update_level(user.user_id, 120, 5, later).await.unwrap();

        let stored = store.find_user(user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.xp_points, 120);
        assert_eq!(stored.xp_level, 5);
        assert_eq!(stored.prestige, user.prestige);
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn prestige_update_leaves_level_untouched() {
        let store = memory_store().await;
        let now = Utc::now();
        let mut user = UserProgression::new(UserId::new(9), now);
        user.xp_level = 50;
        user.xp_points = 6000;
        user.prestige.is_prestige = true;
        store.save_user(&user).await.unwrap();

        let later = now + TimeDelta::hours(4);
        store.update_prestige(user.user_id, 30, 1, later).await.unwrap();

        let stored = store.find_user(user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.xp_points, 6000);
        assert_eq!(stored.xp_level, 50);
        assert_eq!(stored.prestige.prestige_xp, 30);
        assert_eq!(stored.prestige.prestige_level, 1);
        assert_eq!(stored.prestige.prestige_updated_at, later);
    }

    #[tokio::test]
    async fn guild_config_round_trips_id_sets() {
        let store = memory_store().await;
        let mut config = GuildConfig::new(GuildId::new(77));
        config.blacklisted_xp_users.insert(UserId::new(3));
        config.ignored_xp_channels.insert(ChannelId::new(4));
        config.ignored_xp_roles.insert(RoleId::new(5));
        store.upsert_guild(&config).await.unwrap();

        let stored = store.find_guild(config.guild_id).await.unwrap().unwrap();
        assert_eq!(stored, config);

        config.xp_enabled = false;
        config.announcement_channel = Some(ChannelId::new(8));
        store.upsert_guild(&config).await.unwrap();

        let stored = store.find_guild(config.guild_id).await.unwrap().unwrap();
        assert!(!stored.xp_enabled);
        assert_eq!(stored.announcement_channel, Some(ChannelId::new(8)));
    }

    #[tokio::test]
    async fn lists_only_guilds_with_announcement_channel() {
        let store = memory_store().await;
        store.upsert_guild(&GuildConfig::new(GuildId::new(1))).await.unwrap();

        let mut announcing = GuildConfig::new(GuildId::new(2));
        announcing.announcement_channel = Some(ChannelId::new(20));
        store.upsert_guild(&announcing).await.unwrap();

        let guilds = store.guilds_with_announcements().await.unwrap();
        assert_eq!(guilds.len(), 1);
        assert_eq!(guilds[0].guild_id, GuildId::new(2));
    }
}
