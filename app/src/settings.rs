use anyhow::Context as _;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::xp::LevelTables;

const DEFAULT_JOBS: &str = include_str!("../config/jobs.json");
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10);
const DEFAULT_PRESENCE: &str = "over Team Void";

/// One periodic announcement job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobConfig {
    pub name: String,
    /// Six-field cron expression (seconds first), evaluated in UTC.
    pub schedule: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub message: String,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct JobsFile {
    jobs: Vec<JobConfig>,
}

/// Process-wide configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub database_url: String,
    pub xp_cooldown: Duration,
    pub presence: String,
    pub levels: LevelTables,
    pub jobs: Vec<JobConfig>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_token = required(&lookup, "DISCORD_TOKEN")?;
        let database_url = required(&lookup, "DATABASE_URL")?;

        let xp_cooldown = match lookup("XP_COOLDOWN_SECS") {
            Some(raw) => raw.trim().parse().map(Duration::from_secs).map_err(|_| {
                BotError::Config(format!("XP_COOLDOWN_SECS must be a whole number of seconds, got {raw:?}"))
            })?,
            None => DEFAULT_COOLDOWN,
        };

        let levels = match lookup("LEVELS_CONFIG") {
            Some(path) => LevelTables::from_json(&read_config(&path)?)?,
            None => LevelTables::bundled()?,
        };

        let jobs = match lookup("JOBS_CONFIG") {
            Some(path) => parse_jobs(&read_config(&path)?)?,
            None => parse_jobs(DEFAULT_JOBS)?,
        };

        Ok(Self {
            discord_token,
            database_url,
            xp_cooldown,
            presence: lookup("BOT_PRESENCE").unwrap_or_else(|| DEFAULT_PRESENCE.to_string()),
            levels,
            jobs,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BotError::Config(format!("{key} not set")))
}

fn read_config(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read config file {path}"))
}

fn parse_jobs(raw: &str) -> Result<Vec<JobConfig>> {
    let file: JobsFile = serde_json::from_str(raw)?;
    for (i, job) in file.jobs.iter().enumerate() {
        if file.jobs[..i].iter().any(|other| other.name == job.name) {
            return Err(BotError::Config(format!("duplicate job name {}", job.name)));
        }
    }
    Ok(file.jobs)
}
