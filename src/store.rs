//! Durable character storage.
//!
//! All characters live in one JSON document (`character_data.json`). Every
//! mutation is a full read-modify-write under an exclusive lock file. Each
//! character carries a revision that is bumped whenever its record changes;
//! writing back a copy read at an older revision fails with `Conflict`.

use crate::character::{same_name, Character};
use crate::core::constants::{CHARACTER_DATA_FILE, STORE_LOCK_RETRY_MS, STORE_LOCK_TIMEOUT_MS};
use crate::core::error::CharacterError;
use crate::utils::persistence::{read_json_or_init, write_json_atomic, FileLock};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CharacterStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl CharacterStore {
    /// Opens (without reading) the store document inside `data_dir`.
    pub fn open(data_dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(data_dir)?;
        Ok(Self::at_path(data_dir.join(CHARACTER_DATA_FILE)))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self {
            path,
            lock_timeout: Duration::from_millis(STORE_LOCK_TIMEOUT_MS),
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored character in insertion order. The first read of a fresh
    /// data directory writes an empty document.
    pub fn load_all(&self) -> Result<Vec<Character>, CharacterError> {
        Ok(read_json_or_init(&self.path)?)
    }

    /// Replaces the whole document. Readers see the old or the new document,
    /// never a partial one.
    pub fn save_all(&self, characters: &[Character]) -> Result<(), CharacterError> {
        let _lock = self.lock()?;
        self.write_document(characters)
    }

    fn write_document(&self, characters: &[Character]) -> Result<(), CharacterError> {
        write_json_atomic(&self.path, &characters)?;
        debug!(path = %self.path.display(), count = characters.len(), "store saved");
        Ok(())
    }

    fn lock(&self) -> io::Result<FileLock> {
        FileLock::acquire(
            &self.path,
            self.lock_timeout,
            Duration::from_millis(STORE_LOCK_RETRY_MS),
        )
    }

    pub fn find_by_name(&self, name: &str) -> Result<Character, CharacterError> {
        let characters = self.load_all()?;
        find_index(&characters, name)
            .map(|idx| characters[idx].clone())
            .ok_or_else(|| CharacterError::NotFound(name.trim().to_string()))
    }

    pub fn names(&self) -> Result<Vec<String>, CharacterError> {
        Ok(self.load_all()?.into_iter().map(|c| c.name).collect())
    }

    /// Replaces the entry with the same name (ignoring case), or appends.
    ///
    /// Fails with `Conflict` when the stored entry's revision differs from the
    /// one `character` was read at.
    pub fn upsert(&self, character: Character) -> Result<Character, CharacterError> {
        self.modify(|characters| match find_index(characters, &character.name) {
            Some(idx) => {
                if characters[idx].revision != character.revision {
                    return Err(CharacterError::Conflict(characters[idx].name.clone()));
                }
                characters[idx] = character;
                Ok(idx)
            }
            None => {
                characters.push(character);
                Ok(characters.len() - 1)
            }
        })
    }

    /// Locked read-modify-write of the whole collection.
    ///
    /// `edit` returns the index of the character the caller cares about; its
    /// post-write record is returned. Records that changed get their revision
    /// bumped. Nothing is written if `edit` fails or changes nothing.
    pub fn modify<F>(&self, edit: F) -> Result<Character, CharacterError>
    where
        F: FnOnce(&mut Vec<Character>) -> Result<usize, CharacterError>,
    {
        let _lock = self.lock()?;

        let before = self.load_all()?;
        let mut characters = before.clone();
        let idx = edit(&mut characters)?;

        let mut changed = false;
        for (i, character) in characters.iter_mut().enumerate() {
            if before.get(i) != Some(character) {
                character.revision += 1;
                changed = true;
            }
        }
        if changed {
            self.write_document(&characters)?;
        }

        characters.get(idx).cloned().ok_or_else(|| {
            CharacterError::Persistence(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no character at index {}", idx),
            ))
        })
    }
}

/// Case-insensitive position of `name` in `characters`.
pub fn find_index(characters: &[Character], name: &str) -> Option<usize> {
    characters.iter().position(|c| same_name(&c.name, name))
}
