//! Characters: jobs, stats, the leveling curve and name rules.

#![allow(unused_imports)]

pub mod job;
pub mod leveling;
pub mod names;
pub mod sheet;
pub mod stats;

pub use job::*;
pub use leveling::*;
pub use names::*;
pub use sheet::*;
pub use stats::*;
