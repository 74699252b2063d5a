use crate::models::UserProgression;
use crate::xp::{LevelTables, MAX_LEVEL, MAX_PRESTIGE_LEVEL};
use crate::{Context, Error};
use chrono::Utc;
use poise::serenity_prelude::{self as serenity, Color, CreateEmbed};
use poise::CreateReply;

/// Progress summary shown by `/level`.
pub fn describe_progress(progress: &UserProgression, tables: &LevelTables) -> String {
    let prestige = &progress.prestige;
    if prestige.is_prestige {
        let next = match tables.next_prestige_level(prestige.prestige_level) {
            _ if prestige.prestige_level >= MAX_PRESTIGE_LEVEL => "Maximum prestige reached!".to_string(),
            Some(next) => format!(
                "{} prestige XP until prestige level {}",
                next.xp_required.saturating_sub(prestige.prestige_xp),
                next.prestige_level
            ),
            None => "No further prestige levels".to_string(),
        };
        return format!(
            "Prestige level `{}` with `{}` prestige XP\n{}",
            prestige.prestige_level, prestige.prestige_xp, next
        );
    }

    let next = match tables.next_level(progress.xp_level) {
        _ if progress.xp_level >= MAX_LEVEL => "Maximum level reached!".to_string(),
        Some(next) => format!(
            "{} XP until level {}",
            next.xp_required.saturating_sub(progress.xp_points),
            next.level
        ),
        None => "No further level rewards".to_string(),
    };
    format!(
        "Level `{}` with `{}` XP\n{}",
        progress.xp_level, progress.xp_points, next
    )
}

/// Show a member's level and XP
#[poise::command(slash_command, guild_only)]
pub async fn level(
    ctx: Context<'_>,
    #[description = "Member to look up (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let Some(progress) = ctx.data().store.find_user(target.id).await? else {
        ctx.say(format!("{} has not earned any XP yet.", target.name))
            .await?;
        return Ok(());
    };

    let description = describe_progress(&progress, ctx.data().engine.tables());
    let reply = CreateReply::default().embed(
        CreateEmbed::default()
            .title(format!("{}'s progress", target.name))
            .description(description)
            .color(Color::from_rgb(255, 255, 255))
            .timestamp(Utc::now()),
    );
    ctx.send(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xp::tables::{LevelRole, PrestigeLevelRole};
    use poise::serenity_prelude::{RoleId, UserId};

    fn tables() -> LevelTables {
        LevelTables::new(
            vec![
                LevelRole {
                    level: 5,
                    xp_required: 100,
                    role_id: RoleId::new(5),
                },
                LevelRole {
                    level: 50,
                    xp_required: 5500,
                    role_id: RoleId::new(50),
                },
            ],
            vec![PrestigeLevelRole {
                prestige_level: 1,
                xp_required: 25,
            }],
        )
        .unwrap()
    }

    #[test]
    fn normal_track_shows_distance_to_next_level() {
        let mut user = UserProgression::new(UserId::new(1), Utc::now());
        user.xp_points = 40;
        assert_eq!(
            describe_progress(&user, &tables()),
            "Level `0` with `40` XP\n60 XP until level 5"
        );
    }

    #[test]
    fn max_level_is_called_out() {
        let mut user = UserProgression::new(UserId::new(1), Utc::now());
        user.xp_level = 50;
        user.xp_points = 5600;
        assert_eq!(
            describe_progress(&user, &tables()),
            "Level `50` with `5600` XP\nMaximum level reached!"
        );
    }

    #[test]
    fn prestige_track_uses_prestige_counters() {
        let mut user = UserProgression::new(UserId::new(1), Utc::now());
        user.xp_level = 50;
        user.prestige.is_prestige = true;
        user.prestige.prestige_xp = 20;
        assert_eq!(
            describe_progress(&user, &tables()),
            "Prestige level `0` with `20` prestige XP\n5 prestige XP until prestige level 1"
        );
    }
}
