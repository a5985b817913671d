use super::request::ProtocolError;
use crate::character::Character;
use crate::core::error::{CharacterError, ErrorKind};
use crate::service::LevelUpOutcome;
use serde::{Deserialize, Serialize};

const INSUFFICIENT_EXPERIENCE: &str = "Not enough experience to level up";
const AT_MAX_LEVEL: &str = "Already at the maximum level";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
}

/// Reply envelope. Always serialized as a single JSON line.
///
/// - `{"status":"success","character":{...}}`
/// - `{"status":"success","names":[...]}`
/// - `{"status":"error","error":"duplicate_name","message":"..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels_gained: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    fn success() -> Self {
        Self {
            status: Status::Success,
            character: None,
            names: None,
            levels_gained: None,
            error: None,
            message: None,
        }
    }

    pub fn with_character(character: Character) -> Self {
        Self {
            character: Some(character),
            ..Self::success()
        }
    }

    pub fn with_names(names: Vec<String>) -> Self {
        Self {
            names: Some(names),
            ..Self::success()
        }
    }

    /// Every outcome is a success; gaining no level only adds a notice.
    pub fn level_up(outcome: LevelUpOutcome) -> Self {
        match outcome {
            LevelUpOutcome::Leveled {
                character,
                levels_gained,
            } => Self {
                character: Some(character),
                levels_gained: Some(levels_gained),
                ..Self::success()
            },
            LevelUpOutcome::InsufficientExperience { character } => Self {
                character: Some(character),
                levels_gained: Some(0),
                message: Some(INSUFFICIENT_EXPERIENCE.to_string()),
                ..Self::success()
            },
            LevelUpOutcome::AtMaxLevel { character } => Self {
                character: Some(character),
                levels_gained: Some(0),
                message: Some(AT_MAX_LEVEL.to_string()),
                ..Self::success()
            },
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            error: Some(kind),
            message: Some(message.into()),
            ..Self::success()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({
                "status": "error",
                "error": ErrorKind::PersistenceError,
                "message": format!("could not encode reply: {}", e),
            })
            .to_string()
        })
    }

    pub fn decode(raw: &str) -> Result<Response, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }
}

impl From<&CharacterError> for Response {
    fn from(err: &CharacterError) -> Self {
        Response::failure(err.kind(), err.to_string())
    }
}

impl From<&ProtocolError> for Response {
    fn from(err: &ProtocolError) -> Self {
        let kind = match err {
            ProtocolError::UnknownCommand(_) => ErrorKind::UnknownCommand,
            ProtocolError::MalformedRequest(_) => ErrorKind::MalformedRequest,
        };
        Response::failure(kind, err.to_string())
    }
}
