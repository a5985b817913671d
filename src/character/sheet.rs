use super::job::Job;
use super::leveling::LevelingTable;
use super::stats::Stats;
use crate::core::error::CharacterError;
use serde::{Deserialize, Serialize};

/// One persisted character.
///
/// `experience_to_next_level` is always `table.requirement(level)`; it is
/// stored so the document is self-describing, but only ever recomputed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Character {
    pub name: String,
    pub job: Job,
    pub level: u32,
    pub experience: u64,
    #[serde(rename = "experienceToNextLevel")]
    pub experience_to_next_level: u64,
    #[serde(flatten)]
    pub stats: Stats,
    /// Bumped by the store on every persisted mutation.
    #[serde(default)]
    pub revision: u64,
}

impl Character {
    pub fn new(name: &str, job: Job, table: &LevelingTable) -> Self {
        Self {
            name: name.trim().to_string(),
            job,
            level: 1,
            experience: 0,
            experience_to_next_level: table.requirement(1),
            stats: Stats::base(),
            revision: 0,
        }
    }

    /// Fails without changing anything if the total would not fit.
    pub fn grant_experience(&mut self, amount: u64) -> Result<(), CharacterError> {
        self.experience = self
            .experience
            .checked_add(amount)
            .ok_or(CharacterError::ExperienceOverflow(amount))?;
        Ok(())
    }

    pub fn is_max_level(&self, table: &LevelingTable) -> bool {
        self.level >= table.max_level()
    }

    /// Spends banked experience on as many levels as it covers.
    ///
    /// Returns the number of levels gained (0 when experience is short or the
    /// character is already at the cap).
    pub fn apply_level_ups(&mut self, table: &LevelingTable) -> u32 {
        let increments = self.job.level_increments();
        let mut gained = 0;

        while !self.is_max_level(table) {
            let required = table.requirement(self.level);
            if self.experience < required {
                break;
            }
            self.experience -= required;
            self.level += 1;
            self.experience_to_next_level = table.requirement(self.level);
            self.stats.add(&increments);
            gained += 1;
        }

        gained
    }
}
