use super::stats::Stats;
use crate::core::error::CharacterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Job {
    Warrior,
    Mage,
    Rogue,
}

impl Job {
    pub fn all() -> [Job; 3] {
        [Job::Warrior, Job::Mage, Job::Rogue]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Job::Warrior => "Warrior",
            Job::Mage => "Mage",
            Job::Rogue => "Rogue",
        }
    }

    /// Stats gained on every level-up.
    pub fn level_increments(&self) -> Stats {
        match self {
            Job::Warrior => Stats {
                hp: 10,
                mp: 5,
                physical_attack: 3,
                magical_attack: 1,
                defense: 2,
                hit_rate: 1,
            },
            Job::Mage => Stats {
                hp: 5,
                mp: 10,
                physical_attack: 1,
                magical_attack: 3,
                defense: 1,
                hit_rate: 2,
            },
            Job::Rogue => Stats {
                hp: 7,
                mp: 7,
                physical_attack: 2,
                magical_attack: 2,
                defense: 2,
                hit_rate: 3,
            },
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Job {
    type Err = CharacterError;

    /// Case-insensitive: "mage", "MAGE" and "Mage" all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Job::all()
            .into_iter()
            .find(|job| job.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CharacterError::InvalidJob(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("mage".parse::<Job>().unwrap(), Job::Mage);
        assert_eq!("WARRIOR".parse::<Job>().unwrap(), Job::Warrior);
        assert_eq!(" Rogue ".parse::<Job>().unwrap(), Job::Rogue);
    }

    #[test]
    fn test_parse_rejects_unknown_job() {
        let err = "Bard".parse::<Job>().unwrap_err();
        assert!(matches!(err, CharacterError::InvalidJob(ref j) if j == "Bard"));
        assert!("".parse::<Job>().is_err());
    }

    #[test]
    fn test_every_job_gains_every_stat() {
        for job in Job::all() {
            let inc = job.level_increments();
            assert!(inc.hp > 0 && inc.mp > 0);
            assert!(inc.physical_attack > 0 && inc.magical_attack > 0);
            assert!(inc.defense > 0 && inc.hit_rate > 0);
        }
    }

    #[test]
    fn test_job_serializes_as_plain_name() {
        assert_eq!(serde_json::to_string(&Job::Rogue).unwrap(), "\"Rogue\"");
        assert_eq!(Job::Warrior.to_string(), "Warrior");
    }
}
