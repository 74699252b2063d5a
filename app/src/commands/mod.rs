pub mod levels;
pub mod xp;
