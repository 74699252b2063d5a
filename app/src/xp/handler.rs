use chrono::{DateTime, TimeDelta, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::cooldown::{CooldownTracker, UserLocks};
use super::gate::{self, Skip};
use super::tables::LevelTables;
use super::{award_range, roll_award, PRESTIGE_AWARD, PRESTIGE_INTERVAL_SECS};
use crate::error::Result;
use crate::models::UserProgression;
use crate::store::Store;

/// The parts of an inbound message the progression logic looks at.
#[derive(Debug, Clone)]
pub struct XpMessage {
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub member_roles: Vec<RoleId>,
    /// Roles that currently exist in the guild, by id, with their names.
    pub guild_roles: HashMap<RoleId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpNotice {
    pub level: u32,
    pub role_id: RoleId,
    pub role_name: String,
    /// False when the author already holds the role.
    pub grant: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(Skip),
    Awarded {
        award: u64,
        xp_points: u64,
        xp_level: u32,
        notices: Vec<LevelUpNotice>,
    },
    PrestigeAwarded {
        award: u64,
        prestige_xp: u64,
        prestige_level: u32,
        leveled_up: bool,
    },
    /// Prestige user whose last prestige award is too recent.
    PrestigeResting,
}

impl Outcome {
    pub fn roles_to_grant(&self) -> impl Iterator<Item = &LevelUpNotice> {
        let notices: &[LevelUpNotice] = match self {
            Outcome::Awarded { notices, .. } => notices.as_slice(),
            _ => &[],
        };
        notices.iter().filter(|n| n.grant)
    }

    /// Text of the single level-up reply, if this message earned one.
    pub fn level_up_description(&self) -> Option<String> {
        let Outcome::Awarded {
            xp_level, notices, ..
        } = self
        else {
            return None;
        };
        if notices.is_empty() {
            return None;
        }

        let granted: Vec<String> = self
            .roles_to_grant()
            .map(|n| format!("`{}`", n.role_name))
            .collect();
        let mut description = format!(
            "🎉 Congratulations, you have leveled up!\nYou are now level `{}`",
            xp_level
        );
        match granted.len() {
            0 => {}
            1 => description.push_str(&format!(" and received the {} role", granted[0])),
            _ => description.push_str(&format!(" and received the {} roles", granted.join(", "))),
        }
        Some(description)
    }
}

/// Owns everything the per-message progression needs for the life of the process.
pub struct XpEngine {
    store: Store,
    tables: Arc<LevelTables>,
    cooldowns: CooldownTracker,
    locks: UserLocks,
}

impl XpEngine {
    pub fn new(store: Store, tables: Arc<LevelTables>, cooldown: std::time::Duration) -> Self {
        Self {
            store,
            tables,
            cooldowns: CooldownTracker::new(cooldown),
            locks: UserLocks::new(),
        }
    }

    pub fn tables(&self) -> &LevelTables {
        &self.tables
    }

    pub async fn process<R: Rng + Send + ?Sized>(
        &self,
        msg: &XpMessage,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome> {
        if msg.author_is_bot {
            return Ok(Outcome::Skipped(Skip::BotAuthor));
        }
        let Some(guild_id) = msg.guild_id else {
            return Ok(Outcome::Skipped(Skip::NotInGuild));
        };

        let guild = self.store.find_guild(guild_id).await?;
        if let Err(skip) = gate::check_guild(guild.as_ref(), msg) {
            return Ok(Outcome::Skipped(skip));
        }

        // Held until the write lands so concurrent messages see each other's XP.
        let _guard = self.locks.lock(msg.author_id).await;

        let user = self.store.find_or_create_user(msg.author_id, now).await?;
        if let Err(skip) = gate::check_progress(&user) {
            return Ok(Outcome::Skipped(skip));
        }
        if self.cooldowns.is_cooling_down(msg.author_id, now) {
            return Ok(Outcome::Skipped(Skip::Cooldown));
        }

        let outcome = if user.prestige.is_prestige {
            self.award_prestige(&user, now, rng).await?
        } else {
            self.award_level(&user, msg, now, rng).await?
        };
        if matches!(
            outcome,
            Outcome::Awarded { .. } | Outcome::PrestigeAwarded { .. }
        ) {
            self.cooldowns.record(msg.author_id, now);
        }
        Ok(outcome)
    }

    async fn award_level<R: Rng + Send + ?Sized>(
        &self,
        user: &UserProgression,
        msg: &XpMessage,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome> {
        let award = roll_award(award_range(&now), rng);
        let xp_points = user.xp_points + award;
        let (xp_level, crossed) = self.tables.advance_level(user.xp_level, xp_points);

        let notices = crossed
            .into_iter()
            .filter_map(|entry| {
                let role_name = msg.guild_roles.get(&entry.role_id)?;
                Some(LevelUpNotice {
                    level: entry.level,
                    role_id: entry.role_id,
                    role_name: role_name.clone(),
                    grant: !msg.member_roles.contains(&entry.role_id),
                })
            })
            .collect();

        self.store
            .update_level(user.user_id, xp_points, xp_level, now)
            .await?;
        debug!(
            "User {} earned {} XP ({} total, level {})",
            user.user_id, award, xp_points, xp_level
        );

        Ok(Outcome::Awarded {
            award,
            xp_points,
            xp_level,
            notices,
        })
    }

    async fn award_prestige<R: Rng + Send + ?Sized>(
        &self,
        user: &UserProgression,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Outcome> {
        let since = now - user.prestige.prestige_updated_at;
        if since <= TimeDelta::seconds(PRESTIGE_INTERVAL_SECS) {
            return Ok(Outcome::PrestigeResting);
        }

        let award = roll_award(PRESTIGE_AWARD, rng);
        let prestige_xp = user.prestige.prestige_xp + award;
        let (prestige_level, leveled_up) = self
            .tables
            .advance_prestige(user.prestige.prestige_level, prestige_xp);

        self.store
            .update_prestige(user.user_id, prestige_xp, prestige_level, now)
            .await?;
        debug!(
            "User {} earned {} prestige XP ({} total, prestige level {})",
            user.user_id, award, prestige_xp, prestige_level
        );

        Ok(Outcome::PrestigeAwarded {
            award,
            prestige_xp,
            prestige_level,
            leveled_up,
        })
    }
}
