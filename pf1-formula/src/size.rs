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

//! Creature sizes and damage dice scaling.

use crate::{
    evaluate::EvaluationErrors,
    formula_types::{Dice, Term},
    rules::RulesTable,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[cfg(feature = "logging")]
use log::{debug, warn};

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Size {
    Fine,
    Diminutive,
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
    Gargantuan,
    Colossal,
}

const SIZES: [Size; 9] = [
    Size::Fine,
    Size::Diminutive,
    Size::Tiny,
    Size::Small,
    Size::Medium,
    Size::Large,
    Size::Huge,
    Size::Gargantuan,
    Size::Colossal,
];

impl Default for Size {
    fn default() -> Self {
        Size::Medium
    }
}

impl Size {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Out of range indices clamp to Fine or Colossal.
    pub fn from_index(index: i64) -> Size {
        SIZES[index.clamp(0, SIZES.len() as i64 - 1) as usize]
    }

    pub fn code(self) -> char {
        match self {
            Size::Fine => 'F',
            Size::Diminutive => 'D',
            Size::Tiny => 'T',
            Size::Small => 'S',
            Size::Medium => 'M',
            Size::Large => 'L',
            Size::Huge => 'H',
            Size::Gargantuan => 'G',
            Size::Colossal => 'C',
        }
    }
}

impl FromStr for Size {
    type Err = EvaluationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<i64>() {
            return Ok(Size::from_index(index));
        }
        match s.to_ascii_lowercase().as_str() {
            "f" | "fine" => Ok(Size::Fine),
            "d" | "dim" | "diminutive" => Ok(Size::Diminutive),
            "t" | "tiny" => Ok(Size::Tiny),
            "s" | "sm" | "small" => Ok(Size::Small),
            "m" | "med" | "medium" => Ok(Size::Medium),
            "l" | "lg" | "large" => Ok(Size::Large),
            "h" | "huge" => Ok(Size::Huge),
            "g" | "grg" | "gargantuan" => Ok(Size::Gargantuan),
            "c" | "col" | "colossal" => Ok(Size::Colossal),
            _ => Err(EvaluationErrors::InvalidSize(s.to_string())),
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stature {
    Tall,
    Long,
}

impl Default for Stature {
    fn default() -> Self {
        Stature::Tall
    }
}

impl FromStr for Stature {
    type Err = EvaluationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tall" => Ok(Stature::Tall),
            "long" => Ok(Stature::Long),
            other => Err(EvaluationErrors::NotANumber(other.to_string())),
        }
    }
}

/// `count` dice with `sides` faces, the unit of the size progression table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DieExpression {
    pub count: u32,
    pub sides: u32,
}

impl DieExpression {
    pub fn into_term(self) -> Term {
        match self.sides {
            0 => Term::Numeric(0.0),
            1 => Term::Numeric(self.count.into()),
            sides => Term::Die(Dice::new(self.count, sides)),
        }
    }
}

impl fmt::Display for DieExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sides == 1 {
            write!(f, "{}", self.count)
        } else {
            write!(f, "{}d{}", self.count, self.sides)
        }
    }
}

impl FromStr for DieExpression {
    type Err = EvaluationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EvaluationErrors::NotANumber(s.to_string());
        let mut parts = s.trim().splitn(2, |c: char| c == 'd' || c == 'D');
        let count = parts
            .next()
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let sides = match parts.next() {
            Some(sides) => sides.parse::<u32>().map_err(|_| invalid())?,
            None => 1,
        };
        Ok(DieExpression { count, sides })
    }
}

fn locate(rules: &RulesTable, die: DieExpression) -> Option<usize> {
    if let Some(index) = rules.position(&die.to_string()) {
        return Some(index);
    }
    // BUG?: rules as written say nothing about counts missing from the chart,
    // d6 borrows the d8 row of the next lower count and d8 the d6 row of the
    // next higher count
    let counts = |sides: u32| {
        rules
            .size_die
            .iter()
            .filter_map(|e| e.trim().parse::<DieExpression>().ok())
            .filter(move |e| e.sides == sides)
            .map(|e| e.count)
    };
    let substitute = match die.sides {
        6 => counts(6).filter(|c| *c < die.count).max().map(|count| DieExpression {
            count,
            sides: 8,
        }),
        8 => counts(8).filter(|c| *c > die.count).min().map(|count| DieExpression {
            count,
            sides: 6,
        }),
        _ => None,
    }?;
    #[cfg(feature = "logging")]
    {
        debug!("{} is not on the size chart, using {}", die, substitute);
    }
    rules.position(&substitute.to_string())
}

/// Scales `count`d`sides` from `initial` to `target` size along the damage
/// dice progression.
pub fn size_roll(rules: &RulesTable, count: f64, sides: f64, target: Size, initial: Size) -> Term {
    if !count.is_finite() || !sides.is_finite() || count < 0.0 || sides < 0.0 {
        return Term::Numeric(f64::NAN);
    }
    let original = DieExpression {
        count: count.trunc().min(u32::MAX.into()) as u32,
        sides: sides.trunc().min(u32::MAX.into()) as u32,
    };
    if target == initial {
        return original.into_term();
    }

    let target = target.index() as i64;
    let mut current = initial.index() as i64;
    let mut die = original;

    // BUG?: the d10 conversion is not confirmed by the rules, kept as is for
    // existing content
    if die.sides == 10 && die.count > 1 {
        if target > current {
            die.count = die.count.saturating_mul(2);
            current += 1;
        } else {
            current -= 1;
        }
        die.sides = 8;
    } else if die.sides == 4 && die.count > 1 {
        die.sides = if die.count % 2 == 0 { 8 } else { 6 };
        die.count = die.count / 2 + die.count % 2;
    } else if die.sides == 12 {
        die.count = die.count.saturating_mul(2);
        die.sides = 6;
    }

    let mut index = match locate(rules, die) {
        Some(index) => index as i64,
        None => {
            #[cfg(feature = "logging")]
            {
                warn!(
                    "could not find {} in the size die table, keeping {}",
                    die, original
                );
            }
            return original.into_term();
        }
    };

    let up_threshold = rules.position("1d6").map(|i| i as i64);
    let down_threshold = rules.position("1d8").map(|i| i as i64);
    while current < target {
        let single = current <= Size::Small.index() as i64
            || up_threshold.map_or(true, |threshold| index <= threshold);
        index += if single { 1 } else { 2 };
        current += 1;
    }
    while current > target {
        let single = current <= Size::Medium.index() as i64
            || down_threshold.map_or(true, |threshold| index <= threshold);
        index -= if single { 1 } else { 2 };
        current -= 1;
    }
    let index = index.clamp(0, rules.size_die.len() as i64 - 1) as usize;

    match rules.entry(index) {
        Some(scaled) => {
            #[cfg(feature = "logging")]
            {
                debug!("scaled {} to {}", original, scaled);
            }
            scaled.into_term()
        }
        None => original.into_term(),
    }
}

/// Natural melee (or reach weapon) distance in feet.
pub fn size_reach(rules: &RulesTable, size: Size, reach: bool, stature: Stature) -> u32 {
    let distances = rules.reach_for(size, stature);
    if reach {
        distances.reach
    } else {
        distances.melee
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn scaled(count: f64, sides: f64, target: Size) -> String {
        size_roll(&RulesTable::default(), count, sides, target, Size::Medium).to_string()
    }

    #[test]
    fn test_size_parse() {
        assert_eq!("L".parse(), Ok(Size::Large));
        assert_eq!("l".parse(), Ok(Size::Large));
        assert_eq!("med".parse(), Ok(Size::Medium));
        assert_eq!("Colossal".parse(), Ok(Size::Colossal));
        assert_eq!("6".parse(), Ok(Size::Huge));
        assert_eq!("12".parse(), Ok(Size::Colossal));
        assert_eq!("-3".parse(), Ok(Size::Fine));
        assert_eq!(
            "X".parse::<Size>(),
            Err(EvaluationErrors::InvalidSize("X".to_string()))
        );
        assert_eq!(Size::from_index(4), Size::Medium);
        assert_eq!(Size::Gargantuan.to_string(), "G");
    }

    #[test]
    fn test_die_expression() {
        assert_eq!("2d6".parse(), Ok(DieExpression { count: 2, sides: 6 }));
        assert_eq!("1".parse(), Ok(DieExpression { count: 1, sides: 1 }));
        assert!("d6".parse::<DieExpression>().is_err());
        assert!("2d".parse::<DieExpression>().is_err());
        assert_eq!(DieExpression { count: 1, sides: 1 }.to_string(), "1");
        assert_eq!(
            DieExpression { count: 1, sides: 1 }.into_term(),
            Term::Numeric(1.0)
        );
    }

    #[test]
    fn test_same_size_is_unchanged() {
        for size in SIZES.iter() {
            for (count, sides) in &[(1.0, 6.0), (2.0, 10.0), (3.0, 4.0), (1.0, 12.0), (0.0, 8.0)] {
                assert_eq!(
                    size_roll(&RulesTable::default(), *count, *sides, *size, *size),
                    Term::Die(Dice::new(*count as u32, *sides as u32))
                );
            }
        }
        assert_eq!(
            size_roll(&RulesTable::default(), 1.0, 1.0, Size::Large, Size::Large),
            Term::Numeric(1.0)
        );
    }

    #[test]
    fn test_border_rule() {
        assert_eq!(scaled(1.0, 6.0, Size::Large), "1d8");
        assert_eq!(scaled(1.0, 6.0, Size::Huge), "2d6");
        assert_eq!(scaled(1.0, 8.0, Size::Small), "1d6");
        assert_eq!(scaled(2.0, 6.0, Size::Large), "3d6");
        assert_eq!(scaled(1.0, 6.0, Size::Tiny), "1d3");
    }

    #[test]
    fn test_d10_rule() {
        assert_eq!(scaled(2.0, 10.0, Size::Large), "4d8");
        assert_eq!(scaled(2.0, 10.0, Size::Small), "2d8");
        assert_eq!(scaled(1.0, 10.0, Size::Large), "2d8");
    }

    #[test]
    fn test_d4_rule() {
        assert_eq!(scaled(2.0, 4.0, Size::Large), "2d6");
        assert_eq!(scaled(6.0, 4.0, Size::Large), "4d8");
        assert_eq!(scaled(1.0, 4.0, Size::Large), "1d6");
    }

    #[test]
    fn test_d12_folds_into_d6() {
        let rules = RulesTable::default();
        for size in SIZES.iter().filter(|s| **s != Size::Medium) {
            assert_eq!(
                size_roll(&rules, 1.0, 12.0, *size, Size::Medium),
                size_roll(&rules, 2.0, 6.0, *size, Size::Medium)
            );
        }
    }

    #[test]
    fn test_off_chart_counts() {
        // 5d6 rides the 4d8 row, 5d8 the 6d6 row
        assert_eq!(scaled(5.0, 6.0, Size::Large), "6d8");
        assert_eq!(scaled(5.0, 8.0, Size::Large), "8d6");
        assert_eq!(scaled(7.0, 10.0, Size::Colossal), "16d8");
        assert_eq!(scaled(2.0, 20.0, Size::Large), "2d20");
    }

    #[test]
    fn test_clamped_to_table() {
        assert_eq!(scaled(1.0, 2.0, Size::Fine), "1");
        assert_eq!(scaled(16.0, 8.0, Size::Colossal), "16d8");
    }

    #[test]
    fn test_invalid_input() {
        match size_roll(&RulesTable::default(), f64::NAN, 6.0, Size::Large, Size::Medium) {
            Term::Numeric(n) => assert!(n.is_nan()),
            other => panic!("expected NaN, got {:?}", other),
        }
        match size_roll(&RulesTable::default(), 1.0, f64::INFINITY, Size::Large, Size::Medium) {
            Term::Numeric(n) => assert!(n.is_nan()),
            other => panic!("expected NaN, got {:?}", other),
        }
    }

    #[test]
    fn test_size_reach() {
        let rules = RulesTable::default();
        assert_eq!(size_reach(&rules, Size::Medium, false, Stature::Tall), 5);
        assert_eq!(size_reach(&rules, Size::Medium, true, Stature::Tall), 10);
        assert_eq!(size_reach(&rules, Size::Large, false, Stature::Tall), 10);
        assert_eq!(size_reach(&rules, Size::Large, false, Stature::Long), 5);
        assert_eq!(size_reach(&rules, Size::Colossal, true, Stature::Tall), 60);
    }
}
