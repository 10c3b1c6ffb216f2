/*
Copyright 2021 Robin Marchart

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/

//! Rule tables consulted by the size functions.
//!
//! The defaults are the Pathfinder damage dice progression and reach chart.
//! Homebrew tables can be deserialized from a config file and passed in
//! instead.

use crate::size::{DieExpression, Size, Stature};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reach {
    pub melee: u32,
    pub reach: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReachEntry {
    pub tall: Reach,
    pub long: Reach,
}

impl ReachEntry {
    const fn both(melee: u32, reach: u32) -> ReachEntry {
        ReachEntry {
            tall: Reach { melee, reach },
            long: Reach { melee, reach },
        }
    }

    const fn split(tall: (u32, u32), long: (u32, u32)) -> ReachEntry {
        ReachEntry {
            tall: Reach {
                melee: tall.0,
                reach: tall.1,
            },
            long: Reach {
                melee: long.0,
                reach: long.1,
            },
        }
    }
}

pub const DEFAULT_SIZE_DIE: [&str; 21] = [
    "1", "1d2", "1d3", "1d4", "1d6", "1d8", "1d10", "2d6", "2d8", "3d6", "3d8", "4d6", "4d8",
    "6d6", "6d8", "8d6", "8d8", "12d6", "12d8", "16d6", "16d8",
];

pub const DEFAULT_REACH: [ReachEntry; 9] = [
    ReachEntry::both(0, 0),
    ReachEntry::both(0, 0),
    ReachEntry::both(0, 5),
    ReachEntry::both(5, 10),
    ReachEntry::both(5, 10),
    ReachEntry::split((10, 20), (5, 10)),
    ReachEntry::split((15, 30), (10, 20)),
    ReachEntry::split((20, 40), (15, 30)),
    ReachEntry::split((30, 60), (20, 40)),
];

const FALLBACK_REACH: Reach = Reach {
    melee: 5,
    reach: 10,
};

#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RulesTable {
    /// Damage dice ordered by average, one step per size category.
    pub size_die: Vec<String>,
    /// Natural reach per size category, Fine first.
    pub reach: Vec<ReachEntry>,
}

impl Default for RulesTable {
    fn default() -> Self {
        RulesTable {
            size_die: DEFAULT_SIZE_DIE.iter().map(|s| s.to_string()).collect(),
            reach: DEFAULT_REACH.to_vec(),
        }
    }
}

impl RulesTable {
    pub fn position(&self, key: &str) -> Option<usize> {
        self.size_die.iter().position(|entry| entry.trim() == key)
    }

    pub fn entry(&self, index: usize) -> Option<DieExpression> {
        self.size_die.get(index).and_then(|e| e.trim().parse().ok())
    }

    pub fn reach_for(&self, size: Size, stature: Stature) -> Reach {
        match self.reach.get(size.index()) {
            Some(entry) => match stature {
                Stature::Tall => entry.tall,
                Stature::Long => entry.long,
            },
            None => FALLBACK_REACH,
        }
    }

    /// Checks that every progression entry is a die expression or a number.
    pub fn validate(&self) -> Result<(), String> {
        if self.size_die.is_empty() {
            return Err("size die table is empty".to_string());
        }
        match self
            .size_die
            .iter()
            .find(|entry| entry.trim().parse::<DieExpression>().is_err())
        {
            Some(entry) => Err(format!("invalid size die table entry {:?}", entry)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_default_table() {
        let rules = RulesTable::default();
        assert_eq!(rules.validate(), Ok(()));
        assert_eq!(rules.position("1d6"), Some(4));
        assert_eq!(rules.position("1d8"), Some(5));
        assert_eq!(rules.position("5d6"), None);
        assert_eq!(rules.entry(0), Some(DieExpression { count: 1, sides: 1 }));
        assert_eq!(rules.entry(7), Some(DieExpression { count: 2, sides: 6 }));
        assert_eq!(rules.entry(21), None);
    }

    #[test]
    fn test_reach() {
        let rules = RulesTable::default();
        assert_eq!(
            rules.reach_for(Size::Medium, Stature::Tall),
            Reach {
                melee: 5,
                reach: 10
            }
        );
        assert_eq!(rules.reach_for(Size::Large, Stature::Long).melee, 5);
        assert_eq!(rules.reach_for(Size::Huge, Stature::Tall).reach, 30);
        assert_eq!(rules.reach_for(Size::Tiny, Stature::Tall).melee, 0);

        let truncated = RulesTable {
            reach: vec![],
            ..RulesTable::default()
        };
        assert_eq!(truncated.reach_for(Size::Colossal, Stature::Tall), FALLBACK_REACH);
    }

    #[test]
    fn test_validate() {
        let broken = RulesTable {
            size_die: vec!["1d6".to_string(), "fire".to_string()],
            ..RulesTable::default()
        };
        assert!(broken.validate().is_err());
        let empty = RulesTable {
            size_die: vec![],
            ..RulesTable::default()
        };
        assert!(empty.validate().is_err());
    }
}
