use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Carries the unrecognised token for logging; the message stays fixed.
    #[error("Unknown command")]
    UnknownCommand(String),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// One client request.
///
/// On the wire a request is either a text line
/// (`create_new_character name=Aria job=Mage`) or a JSON object tagged by
/// `command` (`{"command":"create_new_character","name":"Aria","job":"Mage"}`).
/// Text values cannot contain spaces; JSON values can.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    GetCharacterList,
    CreateNewCharacter { name: String, job: String },
    SetActiveCharacter { name: String },
    GetActiveCharacter,
    UpdateCharacterName { new_name: String },
    AddExperience { exp_points: i64 },
    LevelUp,
}

impl Request {
    pub const COMMANDS: [&'static str; 7] = [
        "get_character_list",
        "create_new_character",
        "set_active_character",
        "get_active_character",
        "update_character_name",
        "add_experience",
        "level_up",
    ];

    pub fn command(&self) -> &'static str {
        match self {
            Request::GetCharacterList => "get_character_list",
            Request::CreateNewCharacter { .. } => "create_new_character",
            Request::SetActiveCharacter { .. } => "set_active_character",
            Request::GetActiveCharacter => "get_active_character",
            Request::UpdateCharacterName { .. } => "update_character_name",
            Request::AddExperience { .. } => "add_experience",
            Request::LevelUp => "level_up",
        }
    }

    /// Accepts either wire form.
    pub fn decode(raw: &str) -> Result<Request, ProtocolError> {
        let raw = raw.trim();
        if raw.starts_with('{') {
            Self::from_json(raw)
        } else {
            Self::parse_line(raw)
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn from_json(raw: &str) -> Result<Request, ProtocolError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ProtocolError::MalformedRequest(e.to_string()))?;
        let command = value
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::MalformedRequest("missing \"command\" field".into()))?;
        if !Self::COMMANDS.contains(&command) {
            return Err(ProtocolError::UnknownCommand(command.to_string()));
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::MalformedRequest(e.to_string()))
    }

    /// `command key=value key=value ...`
    pub fn parse_line(line: &str) -> Result<Request, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let command = tokens
            .next()
            .ok_or_else(|| ProtocolError::MalformedRequest("empty request".into()))?;
        if !Self::COMMANDS.contains(&command) {
            return Err(ProtocolError::UnknownCommand(command.to_string()));
        }

        let mut params = Params::parse(tokens)?;
        let request = match command {
            "get_character_list" => Request::GetCharacterList,
            "create_new_character" => Request::CreateNewCharacter {
                name: params.take("name")?,
                job: params.take("job")?,
            },
            "set_active_character" => Request::SetActiveCharacter {
                name: params.take("name")?,
            },
            "get_active_character" => Request::GetActiveCharacter,
            "update_character_name" => Request::UpdateCharacterName {
                new_name: params.take("new_name")?,
            },
            "add_experience" => {
                let raw = params.take("exp_points")?;
                let exp_points = raw.parse().map_err(|_| {
                    ProtocolError::MalformedRequest(format!(
                        "exp_points must be a whole number, got '{}'",
                        raw
                    ))
                })?;
                Request::AddExperience { exp_points }
            }
            "level_up" => Request::LevelUp,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        params.finish(command)?;
        Ok(request)
    }
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Request::decode(s)
    }
}

/// Text-line form.
impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())?;
        match self {
            Request::CreateNewCharacter { name, job } => write!(f, " name={} job={}", name, job),
            Request::SetActiveCharacter { name } => write!(f, " name={}", name),
            Request::UpdateCharacterName { new_name } => write!(f, " new_name={}", new_name),
            Request::AddExperience { exp_points } => write!(f, " exp_points={}", exp_points),
            Request::GetCharacterList | Request::GetActiveCharacter | Request::LevelUp => Ok(()),
        }
    }
}

struct Params<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> Params<'a> {
    fn parse(tokens: impl Iterator<Item = &'a str>) -> Result<Self, ProtocolError> {
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        for token in tokens {
            let (key, value) = token.split_once('=').ok_or_else(|| {
                ProtocolError::MalformedRequest(format!("expected key=value, got '{}'", token))
            })?;
            if key.is_empty() {
                return Err(ProtocolError::MalformedRequest(format!(
                    "missing key in '{}'",
                    token
                )));
            }
            if pairs.iter().any(|(k, _)| *k == key) {
                return Err(ProtocolError::MalformedRequest(format!(
                    "parameter '{}' given twice",
                    key
                )));
            }
            pairs.push((key, value));
        }
        Ok(Self { pairs })
    }

    fn take(&mut self, key: &str) -> Result<String, ProtocolError> {
        let idx = self
            .pairs
            .iter()
            .position(|(k, _)| *k == key)
            .ok_or_else(|| ProtocolError::MalformedRequest(format!("missing parameter '{}'", key)))?;
        Ok(self.pairs.remove(idx).1.to_string())
    }

    fn finish(self, command: &str) -> Result<(), ProtocolError> {
        match self.pairs.first() {
            Some((key, _)) => Err(ProtocolError::MalformedRequest(format!(
                "unexpected parameter '{}' for {}",
                key, command
            ))),
            None => Ok(()),
        }
    }
}
