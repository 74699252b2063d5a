use poise::serenity_prelude::RoleId;
use serde::Deserialize;

use super::{MAX_LEVEL, MAX_PRESTIGE_LEVEL};
use crate::error::{BotError, Result};

const DEFAULT_LEVELS: &str = include_str!("../../config/levels.json");

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRole {
    pub level: u32,
    pub xp_required: u64,
    pub role_id: RoleId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrestigeLevelRole {
    pub prestige_level: u32,
    pub xp_required: u64,
}

/// Ordered, immutable level thresholds for both progression tracks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelTables {
    level_roles: Vec<LevelRole>,
    prestige_level_roles: Vec<PrestigeLevelRole>,
}

impl LevelTables {
    pub fn new(
        level_roles: Vec<LevelRole>,
        prestige_level_roles: Vec<PrestigeLevelRole>,
    ) -> Result<Self> {
        let tables = Self {
            level_roles,
            prestige_level_roles,
        };
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let tables: Self = serde_json::from_str(raw)?;
        tables.validate()?;
        Ok(tables)
    }

    /// The tables shipped with the bot.
    pub fn bundled() -> Result<Self> {
        Self::from_json(DEFAULT_LEVELS)
    }

    fn validate(&self) -> Result<()> {
        let levels = self.level_roles.iter().map(|r| (r.level, r.xp_required));
        check_ordered("levelRoles", levels, MAX_LEVEL)?;

        let prestige = self
            .prestige_level_roles
            .iter()
            .map(|r| (r.prestige_level, r.xp_required));
        check_ordered("prestigeLevelRoles", prestige, MAX_PRESTIGE_LEVEL)
    }

    pub fn level_roles(&self) -> &[LevelRole] {
        &self.level_roles
    }

    pub fn prestige_level_roles(&self) -> &[PrestigeLevelRole] {
        &self.prestige_level_roles
    }

    /// Walks the level table for a user at `current` who now has `xp`.
    ///
    /// Every entry that is reached and lies above the tracked level raises the
    /// tracked level, so several thresholds can be crossed by one award.
    /// Returns the final level and the crossed entries in table order.
    pub fn advance_level(&self, current: u32, xp: u64) -> (u32, Vec<&LevelRole>) {
        let mut tracked = current;
        let mut crossed = Vec::new();
        for entry in &self.level_roles {
            if xp >= entry.xp_required && entry.level > tracked {
                tracked = entry.level;
                crossed.push(entry);
            }
        }
        (tracked.min(MAX_LEVEL), crossed)
    }

    /// Same walk as [`advance_level`](Self::advance_level) over the prestige track.
    pub fn advance_prestige(&self, current: u32, xp: u64) -> (u32, bool) {
        let mut tracked = current;
        let mut changed = false;
        for entry in &self.prestige_level_roles {
            if xp >= entry.xp_required && entry.prestige_level > tracked {
                tracked = entry.prestige_level;
                changed = true;
            }
        }
        (tracked.min(MAX_PRESTIGE_LEVEL), changed)
    }

    /// First level-table entry above `level`, used for progress display.
    pub fn next_level(&self, level: u32) -> Option<&LevelRole> {
        self.level_roles.iter().find(|r| r.level > level)
    }

    pub fn next_prestige_level(&self, prestige_level: u32) -> Option<&PrestigeLevelRole> {
        self.prestige_level_roles
            .iter()
            .find(|r| r.prestige_level > prestige_level)
    }
}

fn check_ordered(
    table: &str,
    entries: impl Iterator<Item = (u32, u64)>,
    max_level: u32,
) -> Result<()> {
    let mut previous: Option<(u32, u64)> = None;
    for (level, xp) in entries {
        if level == 0 || level > max_level {
            return Err(BotError::InvalidTable(format!(
                "{table}: level {level} outside 1..={max_level}"
            )));
        }
        if let Some((prev_level, prev_xp)) = previous {
            if level <= prev_level || xp <= prev_xp {
                return Err(BotError::InvalidTable(format!(
                    "{table}: entry for level {level} is not strictly after level {prev_level}"
                )));
            }
        }
        previous = Some((level, xp));
    }
    Ok(())
}
