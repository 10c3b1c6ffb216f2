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

use crate::{
    evaluate::{DiceSource, EvaluationErrors, Evaluator},
    formula_types::{Dice, DiceType, Formula},
    rules::RulesTable,
    FormulaError,
};

pub trait DiceLimits {
    fn min(&self) -> i64;
    fn max(&self) -> i64;
}

impl DiceLimits for DiceType {
    fn min(&self) -> i64 {
        match self {
            DiceType::Number(0) => 0,
            DiceType::Number(_) => 1,
            DiceType::Fudge => -1,
        }
    }

    fn max(&self) -> i64 {
        match self {
            DiceType::Number(n) => (*n).into(),
            DiceType::Fudge => 1,
        }
    }
}

impl DiceLimits for Dice {
    fn min(&self) -> i64 {
        i64::from(self.kept()) * self.faces.min()
    }

    fn max(&self) -> i64 {
        i64::from(self.kept()) * self.faces.max()
    }
}

/// Every die shows its lowest face.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minimized;

/// Every die shows its highest face.
#[derive(Debug, Clone, Copy, Default)]
pub struct Maximized;

impl DiceSource for Minimized {
    fn roll(&mut self, dice: &Dice) -> Result<i64, EvaluationErrors> {
        Ok(dice.min())
    }
}

impl DiceSource for Maximized {
    fn roll(&mut self, dice: &Dice) -> Result<i64, EvaluationErrors> {
        Ok(dice.max())
    }
}

pub trait FormulaLimits {
    fn min(&self, rules: &RulesTable) -> Result<f64, FormulaError>;
    fn max(&self, rules: &RulesTable) -> Result<f64, FormulaError>;
}

impl FormulaLimits for Formula {
    fn min(&self, rules: &RulesTable) -> Result<f64, FormulaError> {
        Evaluator::new(rules, Minimized).formula(self)
    }

    fn max(&self, rules: &RulesTable) -> Result<f64, FormulaError> {
        Evaluator::new(rules, Maximized).formula(self)
    }
}
