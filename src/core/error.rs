//! Error taxonomy shared by the store, the state machine and the protocol.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Failures raised by character operations and the store beneath them.
#[derive(Debug, Error)]
pub enum CharacterError {
    #[error("A character named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{0}' is not a valid job. Choose Warrior, Mage, or Rogue")]
    InvalidJob(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("No active character selected")]
    NoActiveCharacter,

    #[error("No character named '{0}'")]
    NotFound(String),

    #[error("Experience points must be zero or more (got {0})")]
    NegativeExperience(i64),

    #[error("Adding {0} experience points would overflow the experience total")]
    ExperienceOverflow(u64),

    #[error("Character '{0}' was changed by another process, try again")]
    Conflict(String),

    #[error("Could not access the character store: {0}")]
    Persistence(#[from] io::Error),
}

impl CharacterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CharacterError::DuplicateName(_) => ErrorKind::DuplicateName,
            CharacterError::InvalidJob(_) => ErrorKind::InvalidJob,
            CharacterError::InvalidName(_) => ErrorKind::InvalidName,
            CharacterError::NoActiveCharacter => ErrorKind::NoActiveCharacter,
            CharacterError::NotFound(_) => ErrorKind::NotFound,
            CharacterError::NegativeExperience(_) => ErrorKind::NegativeExperience,
            CharacterError::ExperienceOverflow(_) => ErrorKind::ExperienceOverflow,
            CharacterError::Conflict(_) => ErrorKind::Conflict,
            CharacterError::Persistence(_) => ErrorKind::PersistenceError,
        }
    }
}

/// Machine-readable error class carried in every error response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateName,
    InvalidJob,
    InvalidName,
    NoActiveCharacter,
    NotFound,
    NegativeExperience,
    ExperienceOverflow,
    Conflict,
    PersistenceError,
    UnknownCommand,
    MalformedRequest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_persistence_errors() {
        let err: CharacterError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), ErrorKind::PersistenceError);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_messages_differ_per_kind() {
        let messages = [
            CharacterError::DuplicateName("Aria".into()).to_string(),
            CharacterError::InvalidJob("Bard".into()).to_string(),
            CharacterError::NoActiveCharacter.to_string(),
            CharacterError::NotFound("Aria".into()).to_string(),
            CharacterError::NegativeExperience(-5).to_string(),
            CharacterError::ExperienceOverflow(5).to_string(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in messages.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NoActiveCharacter).unwrap();
        assert_eq!(json, "\"no_active_character\"");
    }
}
