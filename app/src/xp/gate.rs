use std::fmt;

use super::handler::XpMessage;
use super::{MAX_LEVEL, MAX_PRESTIGE_LEVEL};
use crate::models::{GuildConfig, UserProgression};

/// Why a message earned nothing. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    BotAuthor,
    NotInGuild,
    NoGuildConfig,
    XpDisabled,
    Blacklisted,
    IgnoredChannel,
    IgnoredRole,
    MaxLevel,
    MaxPrestigeLevel,
    Cooldown,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Skip::BotAuthor => "author is a bot",
            Skip::NotInGuild => "message is not in a guild",
            Skip::NoGuildConfig => "guild has no XP configuration",
            Skip::XpDisabled => "XP is disabled in this guild",
            Skip::Blacklisted => "author is blacklisted",
            Skip::IgnoredChannel => "channel is ignored",
            Skip::IgnoredRole => "author holds an ignored role",
            Skip::MaxLevel => "author is at the maximum level",
            Skip::MaxPrestigeLevel => "author is at the maximum prestige level",
            Skip::Cooldown => "author is on cooldown",
        };
        f.write_str(reason)
    }
}

/// Guild-level checks. Runs before the author's record is touched.
pub fn check_guild(guild: Option<&GuildConfig>, msg: &XpMessage) -> Result<(), Skip> {
    let guild = guild.ok_or(Skip::NoGuildConfig)?;
    if !guild.xp_enabled {
        return Err(Skip::XpDisabled);
    }
    if guild.blacklisted_xp_users.contains(&msg.author_id) {
        return Err(Skip::Blacklisted);
    }
    if guild.ignored_xp_channels.contains(&msg.channel_id) {
        return Err(Skip::IgnoredChannel);
    }
    if guild.holds_ignored_role(&msg.member_roles) {
        return Err(Skip::IgnoredRole);
    }
    Ok(())
}

/// Progression caps for whichever track the user is on.
pub fn check_progress(user: &UserProgression) -> Result<(), Skip> {
    if user.prestige.is_prestige {
        if user.prestige.prestige_level >= MAX_PRESTIGE_LEVEL {
            return Err(Skip::MaxPrestigeLevel);
        }
    } else if user.xp_level >= MAX_LEVEL {
        return Err(Skip::MaxLevel);
    }
    Ok(())
}
