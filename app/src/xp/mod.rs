//! Message-driven XP progression: award rolls, level tables, the eligibility
//! gate and the handler tying them to the store.

pub mod cooldown;
pub mod gate;
pub mod handler;
pub mod tables;

use chrono::{DateTime, Datelike, Local, TimeZone, Weekday};
use rand::Rng;
use std::ops::Range;

pub use handler::{Outcome, XpEngine, XpMessage};
pub use tables::LevelTables;

pub const MAX_LEVEL: u32 = 50;
pub const MAX_PRESTIGE_LEVEL: u32 = 10;

pub const WEEKDAY_AWARD: Range<u64> = 2..4;
pub const WEEKEND_AWARD: Range<u64> = 4..8;
pub const PRESTIGE_AWARD: Range<u64> = 1..3;

/// Minimum gap between two prestige awards.
pub const PRESTIGE_INTERVAL_SECS: i64 = 3 * 60 * 60;

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Normal-track award range for the local calendar day of `at`.
pub fn award_range<Tz: TimeZone>(at: &DateTime<Tz>) -> Range<u64> {
    if is_weekend(at.with_timezone(&Local).weekday()) {
        WEEKEND_AWARD
    } else {
        WEEKDAY_AWARD
    }
}

pub fn roll_award<R: Rng + ?Sized>(range: Range<u64>, rng: &mut R) -> u64 {
    rng.gen_range(range)
}
