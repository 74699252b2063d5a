use crate::models::{toggle_member, GuildConfig};
use crate::{Context, Error};
use poise::serenity_prelude::{self as serenity, GuildChannel, Role};

/// XP settings for this server
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "status",
        "toggle",
        "blacklist",
        "ignore_channel",
        "ignore_role",
        "announcements"
    )
)]
pub async fn xp(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

pub fn describe_config(config: &GuildConfig) -> String {
    fn list<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
        let items: Vec<String> = items.map(|i| i.to_string()).collect();
        if items.is_empty() {
            "none".to_string()
        } else {
            items.join(", ")
        }
    }

    let mut users: Vec<_> = config.blacklisted_xp_users.iter().collect();
    users.sort();
    let mut channels: Vec<_> = config.ignored_xp_channels.iter().collect();
    channels.sort();
    let mut roles: Vec<_> = config.ignored_xp_roles.iter().collect();
    roles.sort();

    format!(
        "XP enabled: {}\nBlacklisted users: {}\nIgnored channels: {}\nIgnored roles: {}\nAnnouncements: {}",
        if config.xp_enabled { "yes" } else { "no" },
        list(users.into_iter().map(|u| format!("<@{u}>"))),
        list(channels.into_iter().map(|c| format!("<#{c}>"))),
        list(roles.into_iter().map(|r| format!("<@&{r}>"))),
        config
            .announcement_channel
            .map_or("off".to_string(), |c| format!("<#{c}>")),
    )
}

/// Loads this guild's config (or a fresh one), applies `edit` and saves it.
async fn edit_config(
    ctx: Context<'_>,
    edit: impl FnOnce(&mut GuildConfig) -> String,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a server")?;
    let store = &ctx.data().store;

    let mut config = store
        .find_guild(guild_id)
        .await?
        .unwrap_or_else(|| GuildConfig::new(guild_id));
    let reply = edit(&mut config);
    store.upsert_guild(&config).await?;

    tracing::info!("Updated XP settings for guild {}", guild_id);
    ctx.say(reply).await?;
    Ok(())
}

/// Show the XP settings for this server
#[poise::command(slash_command, ephemeral)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or("This command must be used in a server")?;
    let reply = match ctx.data().store.find_guild(guild_id).await? {
        Some(config) => describe_config(&config),
        None => "XP has not been set up here yet. Use `/xp toggle` to start.".to_string(),
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Turn XP on or off
#[poise::command(slash_command)]
pub async fn toggle(
    ctx: Context<'_>,
    #[description = "Whether messages earn XP"] enabled: bool,
) -> Result<(), Error> {
    edit_config(ctx, |config| {
        config.xp_enabled = enabled;
        format!("✅ XP is now {}", if enabled { "enabled" } else { "disabled" })
    })
    .await
}

/// Stop (or resume) a member earning XP
#[poise::command(slash_command)]
pub async fn blacklist(
    ctx: Context<'_>,
    #[description = "Member to blacklist"] user: serenity::User,
    #[description = "Remove from the blacklist instead"] remove: Option<bool>,
) -> Result<(), Error> {
    let remove = remove.unwrap_or(false);
    edit_config(ctx, |config| {
        match (toggle_member(&mut config.blacklisted_xp_users, user.id, remove), remove) {
            (true, false) => format!("✅ <@{}> no longer earns XP", user.id),
            (true, true) => format!("✅ <@{}> earns XP again", user.id),
            (false, false) => format!("<@{}> is already blacklisted", user.id),
            (false, true) => format!("<@{}> was not blacklisted", user.id),
        }
    })
    .await
}

/// Ignore (or stop ignoring) messages in a channel
#[poise::command(slash_command)]
pub async fn ignore_channel(
    ctx: Context<'_>,
    #[description = "Channel to ignore"] channel: GuildChannel,
    #[description = "Stop ignoring it instead"] remove: Option<bool>,
) -> Result<(), Error> {
    let remove = remove.unwrap_or(false);
    edit_config(ctx, |config| {
        match (toggle_member(&mut config.ignored_xp_channels, channel.id, remove), remove) {
            (true, false) => format!("✅ Messages in <#{}> no longer earn XP", channel.id),
            (true, true) => format!("✅ Messages in <#{}> earn XP again", channel.id),
            (false, false) => format!("<#{}> is already ignored", channel.id),
            (false, true) => format!("<#{}> was not ignored", channel.id),
        }
    })
    .await
}

/// Ignore (or stop ignoring) members holding a role
#[poise::command(slash_command)]
pub async fn ignore_role(
    ctx: Context<'_>,
    #[description = "Role to ignore"] role: Role,
    #[description = "Stop ignoring it instead"] remove: Option<bool>,
) -> Result<(), Error> {
    let remove = remove.unwrap_or(false);
    edit_config(ctx, |config| {
        match (toggle_member(&mut config.ignored_xp_roles, role.id, remove), remove) {
            (true, false) => format!("✅ Members with `{}` no longer earn XP", role.name),
            (true, true) => format!("✅ Members with `{}` earn XP again", role.name),
            (false, false) => format!("`{}` is already ignored", role.name),
            (false, true) => format!("`{}` was not ignored", role.name),
        }
    })
    .await
}

/// Set the channel for scheduled announcements, or leave empty to turn them off
#[poise::command(slash_command, required_permissions = "MANAGE_CHANNELS")]
pub async fn announcements(
    ctx: Context<'_>,
    #[description = "Channel for loot drops, weekend and lottery announcements"]
    channel: Option<GuildChannel>,
) -> Result<(), Error> {
    edit_config(ctx, |config| {
        config.announcement_channel = channel.as_ref().map(|c| c.id);
        match &channel {
            Some(c) => format!("✅ Set announcement channel to <#{}>", c.id),
            None => "✅ Scheduled announcements turned off".to_string(),
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::{ChannelId, GuildId, RoleId, UserId};

    #[test]
    fn describes_fresh_config() {
        let config = GuildConfig::new(GuildId::new(1));
        assert_eq!(
            describe_config(&config),
            "XP enabled: yes\nBlacklisted users: none\nIgnored channels: none\nIgnored roles: none\nAnnouncements: off"
        );
    }

    #[test]
    fn describes_populated_config() {
        let mut config = GuildConfig::new(GuildId::new(1));
        config.xp_enabled = false;
        config.blacklisted_xp_users.insert(UserId::new(3));
        config.blacklisted_xp_users.insert(UserId::new(2));
        config.ignored_xp_channels.insert(ChannelId::new(4));
        config.ignored_xp_roles.insert(RoleId::new(5));
        config.announcement_channel = Some(ChannelId::new(6));
        assert_eq!(
            describe_config(&config),
            "XP enabled: no\nBlacklisted users: <@2>, <@3>\nIgnored channels: <#4>\nIgnored roles: <@&5>\nAnnouncements: <#6>"
        );
    }
}
