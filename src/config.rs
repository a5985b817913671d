//! Command line and environment configuration.
//!
//! Precedence: built-in default, then `RIVERSTONE_*` environment variables,
//! then flags.

use crate::core::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_REPLY_TIMEOUT_SECONDS, DEFAULT_SOCKET_ADDR,
};
use crate::utils::persistence::default_data_dir;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Invalid value '{value}' for {setting}")]
    InvalidValue { setting: String, value: String },

    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("send needs a request, e.g. `riverstone send get_character_list`")]
    MissingRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    FileDrop,
    Socket,
}

impl FromStr for TransportKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "file-drop" | "file_drop" => Ok(TransportKind::FileDrop),
            "socket" | "tcp" => Ok(TransportKind::Socket),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::FileDrop => f.write_str("file"),
            TransportKind::Socket => f.write_str("socket"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `None` means ~/.riverstone/.
    pub data_dir: Option<PathBuf>,
    pub transport: TransportKind,
    pub addr: SocketAddr,
    pub poll_interval: Duration,
    pub reply_timeout: Duration,
}

impl Config {
    pub fn from_env(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config {
            data_dir: None,
            transport: TransportKind::Socket,
            addr: parse_setting("socket address", DEFAULT_SOCKET_ADDR)?,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            reply_timeout: Duration::from_secs(DEFAULT_REPLY_TIMEOUT_SECONDS),
        };

        if let Some(v) = env("RIVERSTONE_DATA_DIR").filter(|v| !v.trim().is_empty()) {
            config.data_dir = Some(v.into());
        }
        if let Some(v) = env("RIVERSTONE_TRANSPORT") {
            config.apply("RIVERSTONE_TRANSPORT", &v)?;
        }
        if let Some(v) = env("RIVERSTONE_ADDR") {
            config.apply("RIVERSTONE_ADDR", &v)?;
        }
        if let Some(v) = env("RIVERSTONE_POLL_MS") {
            config.apply("RIVERSTONE_POLL_MS", &v)?;
        }
        if let Some(v) = env("RIVERSTONE_TIMEOUT_SECS") {
            config.apply("RIVERSTONE_TIMEOUT_SECS", &v)?;
        }

        Ok(config)
    }

    /// Resolves the data directory, creating the default one if needed.
    pub fn data_dir(&self) -> io::Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    fn apply(&mut self, setting: &str, value: &str) -> Result<(), ConfigError> {
        match setting {
            "RIVERSTONE_DATA_DIR" | "--data-dir" => self.data_dir = Some(value.into()),
            "RIVERSTONE_TRANSPORT" | "--transport" => {
                self.transport = value.parse().map_err(|_| invalid(setting, value))?
            }
            "RIVERSTONE_ADDR" | "--addr" => self.addr = parse_setting(setting, value)?,
            "RIVERSTONE_POLL_MS" | "--poll-ms" => {
                let ms: u64 = parse_setting(setting, value)?;
                if ms == 0 {
                    return Err(invalid(setting, value));
                }
                self.poll_interval = Duration::from_millis(ms);
            }
            "RIVERSTONE_TIMEOUT_SECS" | "--timeout-secs" => {
                let secs: u64 = parse_setting(setting, value)?;
                if secs == 0 {
                    return Err(invalid(setting, value));
                }
                self.reply_timeout = Duration::from_secs(secs);
            }
            other => return Err(ConfigError::UnexpectedArgument(other.to_string())),
        }
        Ok(())
    }
}

fn parse_setting<T: FromStr>(setting: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(setting, value))
}

fn invalid(setting: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        setting: setting.to_string(),
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Run the character service.
    Serve(Config),
    /// Send one request and print the reply.
    Send(Config, String),
    /// Read requests from stdin, one per line, over one session.
    Client(Config),
    Version,
    Help,
}

/// Parses arguments (without the program name).
pub fn parse_args<I>(args: I, env: &dyn Fn(&str) -> Option<String>) -> Result<Invocation, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let command = match args.next() {
        Some(c) => c,
        None => return Ok(Invocation::Help),
    };

    match command.as_str() {
        "--version" | "-v" => return Ok(Invocation::Version),
        "--help" | "-h" | "help" => return Ok(Invocation::Help),
        "serve" | "send" | "client" => {}
        other => return Err(ConfigError::UnknownCommand(other.to_string())),
    }

    let mut config = Config::from_env(env)?;
    let mut words = Vec::new();

    while let Some(arg) = args.next() {
        if let Some(flag) = arg.strip_prefix("--") {
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };
            let setting = format!("--{}", name);
            let value = match inline {
                Some(v) => v,
                None => args
                    .next()
                    .ok_or_else(|| ConfigError::MissingValue(setting.clone()))?,
            };
            config.apply(&setting, &value)?;
        } else if command == "send" {
            words.push(arg);
        } else {
            return Err(ConfigError::UnexpectedArgument(arg));
        }
    }

    Ok(match command.as_str() {
        "serve" => Invocation::Serve(config),
        "client" => Invocation::Client(config),
        _ if words.is_empty() => return Err(ConfigError::MissingRequest),
        _ => Invocation::Send(config, words.join(" ")),
    })
}
