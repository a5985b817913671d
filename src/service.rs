//! Character progression: the operations a client session can perform.
//!
//! The active character is not global state. Each client gets a [`Session`]
//! which is passed into every operation, and only successful store writes
//! change it.

use crate::character::{same_name, validate_name, Character, Job, LevelingTable};
use crate::core::error::CharacterError;
use crate::store::{find_index, CharacterStore};
use tracing::info;
use uuid::Uuid;

/// One client's view: who it is and which character it has selected.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    active: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            active: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn require_active(&self) -> Result<String, CharacterError> {
        self.active.clone().ok_or(CharacterError::NoActiveCharacter)
    }
}

/// Result of a level-up attempt. Gaining no level is an ordinary outcome, not
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelUpOutcome {
    Leveled {
        character: Character,
        levels_gained: u32,
    },
    InsufficientExperience {
        character: Character,
    },
    /// Already at the level cap; banked experience is kept.
    AtMaxLevel {
        character: Character,
    },
}

impl LevelUpOutcome {
    pub fn character(&self) -> &Character {
        match self {
            LevelUpOutcome::Leveled { character, .. } => character,
            LevelUpOutcome::InsufficientExperience { character } => character,
            LevelUpOutcome::AtMaxLevel { character } => character,
        }
    }

    pub fn levels_gained(&self) -> u32 {
        match self {
            LevelUpOutcome::Leveled { levels_gained, .. } => *levels_gained,
            LevelUpOutcome::InsufficientExperience { .. } | LevelUpOutcome::AtMaxLevel { .. } => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CharacterService {
    store: CharacterStore,
    table: &'static LevelingTable,
}

impl CharacterService {
    pub fn new(store: CharacterStore) -> Self {
        Self {
            store,
            table: LevelingTable::standard(),
        }
    }

    pub fn store(&self) -> &CharacterStore {
        &self.store
    }

    pub fn table(&self) -> &'static LevelingTable {
        self.table
    }

    pub fn list_names(&self) -> Result<Vec<String>, CharacterError> {
        self.store.names()
    }

    /// Creates a level 1 character and makes it the session's active one.
    ///
    /// A taken name is reported before the name format or job is checked.
    pub fn create(
        &self,
        session: &mut Session,
        name: &str,
        job: &str,
    ) -> Result<Character, CharacterError> {
        let table = self.table;
        let created = self.store.modify(|characters| {
            if let Some(idx) = find_index(characters, name) {
                return Err(CharacterError::DuplicateName(characters[idx].name.clone()));
            }
            validate_name(name).map_err(CharacterError::InvalidName)?;
            let job: Job = job.parse()?;
            characters.push(Character::new(name, job, table));
            Ok(characters.len() - 1)
        })?;

        info!(session = %session.id, name = %created.name, job = %created.job, "character created");
        session.active = Some(created.name.clone());
        Ok(created)
    }

    pub fn select(&self, session: &mut Session, name: &str) -> Result<Character, CharacterError> {
        let character = self.store.find_by_name(name)?;
        info!(session = %session.id, name = %character.name, "active character set");
        session.active = Some(character.name.clone());
        Ok(character)
    }

    pub fn active(&self, session: &Session) -> Result<Character, CharacterError> {
        let name = session.require_active()?;
        self.store.find_by_name(&name)
    }

    /// Renames the active character. The session follows the new name only
    /// once the store has been written.
    pub fn rename(
        &self,
        session: &mut Session,
        new_name: &str,
    ) -> Result<Character, CharacterError> {
        let current = session.require_active()?;
        validate_name(new_name).map_err(CharacterError::InvalidName)?;

        let renamed = self.store.modify(|characters| {
            let idx = find_index(characters, &current)
                .ok_or_else(|| CharacterError::NotFound(current.clone()))?;
            let collision = characters
                .iter()
                .enumerate()
                .any(|(i, c)| i != idx && same_name(&c.name, new_name));
            if collision {
                return Err(CharacterError::DuplicateName(new_name.trim().to_string()));
            }
            characters[idx].name = new_name.trim().to_string();
            Ok(idx)
        })?;

        info!(session = %session.id, from = %current, to = %renamed.name, "character renamed");
        session.active = Some(renamed.name.clone());
        Ok(renamed)
    }

    /// Adds experience without leveling. Negative amounts are rejected.
    pub fn grant_experience(
        &self,
        session: &Session,
        amount: i64,
    ) -> Result<Character, CharacterError> {
        let name = session.require_active()?;
        let amount =
            u64::try_from(amount).map_err(|_| CharacterError::NegativeExperience(amount))?;

        let updated = self.store.modify(|characters| {
            let idx = find_index(characters, &name)
                .ok_or_else(|| CharacterError::NotFound(name.clone()))?;
            characters[idx].grant_experience(amount)?;
            Ok(idx)
        })?;

        info!(session = %session.id, name = %updated.name, amount, total = updated.experience, "experience granted");
        Ok(updated)
    }

    /// Spends banked experience on as many levels as it covers, up to the cap.
    pub fn level_up(&self, session: &Session) -> Result<LevelUpOutcome, CharacterError> {
        let name = session.require_active()?;
        let table = self.table;
        let mut levels_gained = 0;

        let character = self.store.modify(|characters| {
            let idx = find_index(characters, &name)
                .ok_or_else(|| CharacterError::NotFound(name.clone()))?;
            levels_gained = characters[idx].apply_level_ups(table);
            Ok(idx)
        })?;

        if levels_gained == 0 {
            if character.is_max_level(table) {
                return Ok(LevelUpOutcome::AtMaxLevel { character });
            }
            return Ok(LevelUpOutcome::InsufficientExperience { character });
        }

        info!(session = %session.id, name = %character.name, levels_gained, level = character.level, "level up");
        Ok(LevelUpOutcome::Leveled {
            character,
            levels_gained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> (TempDir, CharacterService) {
        let dir = TempDir::new().unwrap();
        let store = CharacterStore::open(dir.path()).unwrap();
        (dir, CharacterService::new(store))
    }

    #[test]
    fn test_create_sets_active() {
        let (_dir, svc) = service();
        let mut session = Session::new();

        let aria = svc.create(&mut session, "Aria", "Mage").unwrap();
        assert_eq!(aria.level, 1);
        assert_eq!(aria.experience_to_next_level, 1000);
        assert_eq!(session.active_name(), Some("Aria"));
        assert_eq!(svc.active(&session).unwrap(), aria);
    }

    #[test]
    fn test_create_duplicate_beats_invalid_job() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        let mut other = Session::new();
        let err = svc.create(&mut other, "ARIA", "Bard").unwrap_err();
        assert!(matches!(err, CharacterError::DuplicateName(_)));
        assert_eq!(other.active_name(), None);
    }

    #[test]
    fn test_create_invalid_job_stores_nothing() {
        let (_dir, svc) = service();
        let mut session = Session::new();

        let err = svc.create(&mut session, "Aria", "Bard").unwrap_err();
        assert!(matches!(err, CharacterError::InvalidJob(_)));
        assert!(svc.list_names().unwrap().is_empty());
        assert_eq!(session.active_name(), None);
    }

    #[test]
    fn test_create_invalid_name() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        let err = svc.create(&mut session, "   ", "Mage").unwrap_err();
        assert!(matches!(err, CharacterError::InvalidName(_)));
    }

    #[test]
    fn test_operations_need_active_character() {
        let (_dir, svc) = service();
        let mut session = Session::new();

        assert!(matches!(
            svc.active(&session),
            Err(CharacterError::NoActiveCharacter)
        ));
        assert!(matches!(
            svc.rename(&mut session, "Bob"),
            Err(CharacterError::NoActiveCharacter)
        ));
        assert!(matches!(
            svc.grant_experience(&session, 10),
            Err(CharacterError::NoActiveCharacter)
        ));
        assert!(matches!(
            svc.level_up(&session),
            Err(CharacterError::NoActiveCharacter)
        ));
    }

    #[test]
    fn test_select_unknown_name() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        assert!(matches!(
            svc.select(&mut session, "Ghost"),
            Err(CharacterError::NotFound(_))
        ));
        assert_eq!(session.active_name(), None);
    }

    #[test]
    fn test_select_uses_stored_spelling() {
        let (_dir, svc) = service();
        let mut creator = Session::new();
        svc.create(&mut creator, "Aria", "Mage").unwrap();

        let mut session = Session::new();
        svc.select(&mut session, "aRIA").unwrap();
        assert_eq!(session.active_name(), Some("Aria"));
    }

    #[test]
    fn test_rename_collision_keeps_old_name() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Brak", "Warrior").unwrap();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        let err = svc.rename(&mut session, "brak").unwrap_err();
        assert!(matches!(err, CharacterError::DuplicateName(_)));
        assert_eq!(session.active_name(), Some("Aria"));
        assert_eq!(svc.list_names().unwrap(), vec!["Brak", "Aria"]);
    }

    #[test]
    fn test_rename_updates_store_and_session() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        let renamed = svc.rename(&mut session, "Seraph").unwrap();
        assert_eq!(renamed.name, "Seraph");
        assert_eq!(session.active_name(), Some("Seraph"));
        assert_eq!(svc.list_names().unwrap(), vec!["Seraph"]);
    }

    #[test]
    fn test_rename_to_own_name_with_new_case() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "aria", "Mage").unwrap();

        let renamed = svc.rename(&mut session, "Aria").unwrap();
        assert_eq!(renamed.name, "Aria");
    }

    #[test]
    fn test_negative_experience_rejected() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        let err = svc.grant_experience(&session, -1).unwrap_err();
        assert!(matches!(err, CharacterError::NegativeExperience(-1)));
        assert_eq!(svc.active(&session).unwrap().experience, 0);
    }

    #[test]
    fn test_grant_does_not_level() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        let c = svc.grant_experience(&session, 5000).unwrap();
        assert_eq!(c.experience, 5000);
        assert_eq!(c.level, 1);
    }

    #[test]
    fn test_level_up_outcomes() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        svc.grant_experience(&session, 500).unwrap();
        let before = svc.active(&session).unwrap();
        let outcome = svc.level_up(&session).unwrap();
        assert_eq!(
            outcome,
            LevelUpOutcome::InsufficientExperience {
                character: before.clone()
            }
        );
        assert_eq!(svc.active(&session).unwrap(), before);

        svc.grant_experience(&session, 500).unwrap();
        let outcome = svc.level_up(&session).unwrap();
        assert_eq!(outcome.levels_gained(), 1);
        assert_eq!(outcome.character().level, 2);
        assert_eq!(outcome.character().experience, 0);
    }

    #[test]
    fn test_level_cap_is_reported_separately() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Vex", "Rogue").unwrap();

        svc.grant_experience(&session, i64::MAX).unwrap();
        let outcome = svc.level_up(&session).unwrap();
        assert_eq!(outcome.levels_gained(), 39);
        let banked = outcome.character().experience;

        let outcome = svc.level_up(&session).unwrap();
        assert!(matches!(outcome, LevelUpOutcome::AtMaxLevel { .. }));
        assert_eq!(outcome.levels_gained(), 0);
        assert_eq!(outcome.character().level, 40);
        assert_eq!(outcome.character().experience, banked);
    }

    #[test]
    fn test_experience_overflow_changes_nothing() {
        let (_dir, svc) = service();
        let mut session = Session::new();
        svc.create(&mut session, "Aria", "Mage").unwrap();

        svc.grant_experience(&session, i64::MAX).unwrap();
        svc.grant_experience(&session, i64::MAX).unwrap();
        let before = svc.active(&session).unwrap();

        let err = svc.grant_experience(&session, i64::MAX).unwrap_err();
        assert!(matches!(err, CharacterError::ExperienceOverflow(_)));
        assert_eq!(svc.active(&session).unwrap(), before);
    }

    #[test]
    fn test_sessions_are_independent() {
        let (_dir, svc) = service();
        let mut first = Session::new();
        let mut second = Session::new();
        svc.create(&mut first, "Aria", "Mage").unwrap();
        svc.create(&mut second, "Brak", "Warrior").unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(svc.active(&first).unwrap().name, "Aria");
        assert_eq!(svc.active(&second).unwrap().name, "Brak");
    }
}
