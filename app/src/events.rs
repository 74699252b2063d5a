use crate::tasks::{announcement::AnnouncementTask, TaskManager};
use crate::xp::{Outcome, XpMessage};
use crate::{Data, Error};
use chrono::Utc;
use poise::serenity_prelude::{
    self as serenity, ActivityData, Colour, CreateEmbed, CreateMessage, Mentionable, OnlineStatus,
    ReactionType, Timestamp,
};
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};
use tracing::{debug, error, info};

const PRESTIGE_REACTION: &str = "🏴‍☠️";

pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            on_ready(ctx, data_about_bot, data);
        }
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = on_message(ctx, new_message, data).await {
                error!("Error processing XP for message {}: {}", new_message.id, e);
            }
        }
        _ => {}
    }
    Ok(())
}

fn on_ready(ctx: &serenity::Context, ready: &serenity::Ready, data: &Data) {
    info!("{} is now online", ready.user.name);
    ctx.set_presence(
        Some(ActivityData::watching(&data.settings.presence)),
        OnlineStatus::Online,
    );

    // Ready fires again after a gateway reconnect.
    if !data.claim_tasks() {
        debug!("Periodic tasks already scheduled");
        return;
    }

    let mut task_manager = TaskManager::new();
    for job in data.settings.jobs.iter().filter(|job| job.enabled) {
        task_manager.register_task(AnnouncementTask::from_config(job));
    }

    let http = ctx.http.clone();
    let data = data.clone();
    tokio::spawn(async move {
        match task_manager.run_all(http, data.clone()).await {
            Ok(count) => info!("Scheduled {} periodic task(s)", count),
            Err(e) => {
                error!("Failed to start the task scheduler: {}", e);
                // Let the next ready event try again.
                data.release_tasks();
            }
        }
    });
}

fn xp_message(ctx: &serenity::Context, msg: &serenity::Message) -> XpMessage {
    let guild_roles = msg
        .guild_id
        .and_then(|guild_id| {
            ctx.cache.guild(guild_id).map(|guild| {
                guild
                    .roles
                    .iter()
                    .map(|(id, role)| (*id, role.name.clone()))
                    .collect()
            })
        })
        .unwrap_or_default();

    XpMessage {
        author_id: msg.author.id,
        author_is_bot: msg.author.bot,
        guild_id: msg.guild_id,
        channel_id: msg.channel_id,
        member_roles: msg
            .member
            .as_ref()
            .map(|member| member.roles.clone())
            .unwrap_or_default(),
        guild_roles,
    }
}

async fn on_message(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<(), Error> {
    if msg.author.bot {
        return Ok(());
    }

    let mut rng = StdRng::from_entropy();
    let outcome = data
        .engine
        .process(&xp_message(ctx, msg), Utc::now(), &mut rng)
        .await?;

    apply_outcome(ctx, msg, &outcome).await
}

/// Performs the reply, reaction and role grants for an already persisted outcome.
async fn apply_outcome(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    outcome: &Outcome,
) -> Result<(), Error> {
    match outcome {
        Outcome::Skipped(reason) => {
            debug!("No XP for message {}: {}", msg.id, reason);
        }
        Outcome::PrestigeResting => {
            debug!("User {} is between prestige awards", msg.author.id);
        }
        Outcome::PrestigeAwarded {
            award,
            prestige_xp,
            prestige_level,
            leveled_up,
        } => {
            debug!(
                "User {} earned {} prestige XP ({} total)",
                msg.author.id, award, prestige_xp
            );
            if *leveled_up {
                info!("User {} reached prestige level {}", msg.author.id, prestige_level);
                msg.react(&ctx.http, ReactionType::Unicode(PRESTIGE_REACTION.to_string()))
                    .await?;
            }
        }
        Outcome::Awarded {
            award,
            xp_points,
            xp_level,
            ..
        } => {
            debug!(
                "User {} earned {} XP ({} total)",
                msg.author.id, award, xp_points
            );
            if let Some(guild_id) = msg.guild_id {
                for notice in outcome.roles_to_grant() {
                    ctx.http
                        .add_member_role(
                            guild_id,
                            msg.author.id,
                            notice.role_id,
                            Some("Level reward"),
                        )
                        .await?;
                    info!(
                        "Granted role {} to user {} for level {}",
                        notice.role_name, msg.author.id, notice.level
                    );
                }
            }

            if let Some(description) = outcome.level_up_description() {
                info!("User {} reached level {}", msg.author.id, xp_level);
                let colour = Colour::new(thread_rng().gen_range(0..=0xFF_FF_FF));
                let embed = CreateEmbed::new()
                    .colour(colour)
                    .description(description)
                    .timestamp(Timestamp::now());
                let reply = CreateMessage::new()
                    .content(msg.author.mention().to_string())
                    .embed(embed)
                    .reference_message(msg);
                msg.channel_id.send_message(&ctx.http, reply).await?;
            }
        }
    }
    Ok(())
}
