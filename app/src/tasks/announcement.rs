use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, ChannelId};
use std::time::Duration;
use tracing::{error, info};

use super::TaskHandler;
use crate::settings::JobConfig;
use crate::store::Store;
use crate::{Data, Error};

const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Posts a fixed message to every guild's announcement channel on a schedule.
/// Loot drops, the weekend notice and the lottery phases all run as one of these.
#[derive(Debug, Clone)]
pub struct AnnouncementTask {
    name: String,
    schedule: String,
    message: String,
}

impl AnnouncementTask {
    pub fn from_config(job: &JobConfig) -> Self {
        Self {
            name: job.name.clone(),
            schedule: job.schedule.clone(),
            message: job.message.clone(),
        }
    }
}

async fn announcement_channels(store: &Store) -> Result<Vec<ChannelId>, Error> {
    Ok(store
        .guilds_with_announcements()
        .await?
        .into_iter()
        .filter_map(|g| g.announcement_channel)
        .collect())
}

#[async_trait]
impl TaskHandler for AnnouncementTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self, http: &serenity::Http, data: &Data) -> Result<(), Error> {
        let channels = announcement_channels(&data.store).await?;
        info!("Running {} for {} channel(s)", self.name, channels.len());

        for channel in channels {
            if let Err(e) = channel.say(http, &self.message).await {
                error!("{} could not post in channel {}: {}", self.name, channel, e);
            }
            tokio::time::sleep(RATE_LIMIT_DELAY).await;
        }
        Ok(())
    }
}
