//! Riverstone - character progression service for a text adventure.
//!
//! Characters are created with a job, earn experience, level up along a fixed
//! curve and persist in a single JSON document. Clients talk to the service
//! through a file-drop or TCP transport using the request/response protocol.

pub mod character;
pub mod config;
pub mod core;
pub mod protocol;
pub mod service;
pub mod store;
pub mod transport;
pub mod utils;
