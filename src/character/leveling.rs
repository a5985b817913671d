//! Experience thresholds per level, computed once per process.

use crate::core::constants::{LEVEL_CURVE_BASE, LEVEL_CURVE_GROWTH, MAX_LEVEL};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelingTable {
    thresholds: Vec<u64>,
}

impl LevelingTable {
    /// `floor(1000 * 1.2^(level - 1))` for levels 1..=40.
    pub fn generate() -> Self {
        let thresholds = (1..=MAX_LEVEL)
            .map(|level| (LEVEL_CURVE_BASE * LEVEL_CURVE_GROWTH.powf((level - 1) as f64)) as u64)
            .collect();
        Self { thresholds }
    }

    /// The process-wide table.
    pub fn standard() -> &'static LevelingTable {
        static TABLE: OnceLock<LevelingTable> = OnceLock::new();
        TABLE.get_or_init(LevelingTable::generate)
    }

    /// Experience needed to advance past `level`.
    ///
    /// Defined for 1..=40; out-of-range levels clamp to the nearest bound.
    pub fn requirement(&self, level: u32) -> u64 {
        let idx = level.clamp(1, MAX_LEVEL) as usize - 1;
        self.thresholds[idx]
    }

    pub fn max_level(&self) -> u32 {
        MAX_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_levels() {
        let table = LevelingTable::standard();
        assert_eq!(table.requirement(1), 1000);
        assert_eq!(table.requirement(2), 1200);
        assert_eq!(table.requirement(3), 1440);
    }

    #[test]
    fn test_strictly_increasing() {
        let table = LevelingTable::standard();
        for level in 2..=MAX_LEVEL {
            assert!(table.requirement(level) > table.requirement(level - 1));
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        assert_eq!(LevelingTable::generate(), LevelingTable::generate());
        assert_eq!(&LevelingTable::generate(), LevelingTable::standard());
    }

    #[test]
    fn test_out_of_range_clamps() {
        let table = LevelingTable::standard();
        assert_eq!(table.requirement(0), table.requirement(1));
        assert_eq!(table.requirement(99), table.requirement(MAX_LEVEL));
    }
}
