use crate::core::constants::{
    BASE_DEFENSE, BASE_HIT_RATE, BASE_HP, BASE_MAGICAL_ATTACK, BASE_MP, BASE_PHYSICAL_ATTACK,
};
use serde::{Deserialize, Serialize};

/// Combat stats. Field names match the persisted document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub hp: u32,
    pub mp: u32,
    pub physical_attack: u32,
    pub magical_attack: u32,
    pub defense: u32,
    pub hit_rate: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self::base()
    }
}

impl Stats {
    pub fn base() -> Self {
        Self {
            hp: BASE_HP,
            mp: BASE_MP,
            physical_attack: BASE_PHYSICAL_ATTACK,
            magical_attack: BASE_MAGICAL_ATTACK,
            defense: BASE_DEFENSE,
            hit_rate: BASE_HIT_RATE,
        }
    }

    /// Adds another Stats' values to this one (one level's increments).
    pub fn add(&mut self, other: &Stats) {
        self.hp = self.hp.saturating_add(other.hp);
        self.mp = self.mp.saturating_add(other.mp);
        self.physical_attack = self.physical_attack.saturating_add(other.physical_attack);
        self.magical_attack = self.magical_attack.saturating_add(other.magical_attack);
        self.defense = self.defense.saturating_add(other.defense);
        self.hit_rate = self.hit_rate.saturating_add(other.hit_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_stats() {
        let stats = Stats::base();
        assert_eq!(stats.hp, 100);
        assert_eq!(stats.mp, 50);
        assert_eq!(stats.physical_attack, 10);
        assert_eq!(stats.magical_attack, 5);
        assert_eq!(stats.defense, 5);
        assert_eq!(stats.hit_rate, 5);
    }

    #[test]
    fn test_add() {
        let mut stats = Stats::base();
        stats.add(&Stats {
            hp: 1,
            mp: 2,
            physical_attack: 3,
            magical_attack: 4,
            defense: 5,
            hit_rate: 6,
        });
        assert_eq!(stats.hp, 101);
        assert_eq!(stats.mp, 52);
        assert_eq!(stats.hit_rate, 11);
    }
}
