//! Core constants and the error taxonomy.

#![allow(unused_imports)]

pub mod constants;
pub mod error;

pub use constants::*;
pub use error::*;
