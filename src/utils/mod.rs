//! Utility modules: persistence helpers and logging setup.

#![allow(unused_imports)]

pub mod logging;
pub mod persistence;

pub use logging::*;
pub use persistence::*;
