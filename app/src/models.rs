use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prestige {
    pub is_prestige: bool,
    pub prestige_level: u32,
    pub prestige_xp: u64,
    pub prestige_inserted_at: DateTime<Utc>,
    pub prestige_updated_at: DateTime<Utc>,
}

/// A user's progression, shared across every guild the bot is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProgression {
    pub user_id: UserId,
    pub xp_level: u32,
    pub xp_points: u64,
    pub warnings: u32,
    pub prestige: Prestige,
    pub inserted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgression {
    /// A freshly observed user with every counter at zero.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            xp_level: 0,
            xp_points: 0,
            warnings: 0,
            prestige: Prestige {
                is_prestige: false,
                prestige_level: 0,
                prestige_xp: 0,
                prestige_inserted_at: now,
                prestige_updated_at: now,
            },
            inserted_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: GuildId,
    pub xp_enabled: bool,
    pub blacklisted_xp_users: HashSet<UserId>,
    pub ignored_xp_channels: HashSet<ChannelId>,
    pub ignored_xp_roles: HashSet<RoleId>,
    pub announcement_channel: Option<ChannelId>,
}

impl GuildConfig {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            xp_enabled: true,
            blacklisted_xp_users: HashSet::new(),
            ignored_xp_channels: HashSet::new(),
            ignored_xp_roles: HashSet::new(),
            announcement_channel: None,
        }
    }

    pub fn holds_ignored_role(&self, roles: &[RoleId]) -> bool {
        roles.iter().any(|r| self.ignored_xp_roles.contains(r))
    }
}

/// Adds or removes `id`, returning whether the set changed.
pub fn toggle_member<T: Eq + Hash>(set: &mut HashSet<T>, id: T, remove: bool) -> bool {
    if remove {
        set.remove(&id)
    } else {
        set.insert(id)
    }
}
