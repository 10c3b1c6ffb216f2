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
use rand::{distributions::Uniform, Rng};

#[cfg(feature = "logging")]
use log::debug;

/// Rolls dice with `rng`, checking `timeout_f` before every 256 dice.
pub struct RandomDice<'t, T: FnMut() -> bool, R: Rng> {
    timeout_f: &'t mut T,
    rng: &'t mut R,
    rolls: Vec<i64>,
}

impl<'t, T: FnMut() -> bool, R: Rng> RandomDice<'t, T, R> {
    pub fn new(timeout_f: &'t mut T, rng: &'t mut R) -> Self {
        RandomDice {
            timeout_f,
            rng,
            rolls: Vec::new(),
        }
    }

    /// Every face thrown so far, including dropped ones.
    pub fn into_rolls(self) -> Vec<i64> {
        self.rolls
    }

    fn throw(&mut self, dice: &Dice) -> Result<Vec<i64>, EvaluationErrors> {
        if (self.timeout_f)() {
            return Err(EvaluationErrors::Timeout);
        }
        let mut rolls: Vec<i64> = Vec::with_capacity(dice.count.min(1024) as usize);
        let mut roll_counter: u8 = 0;
        let dist = match dice.faces {
            DiceType::Number(0) => None,
            DiceType::Number(faces) => Some(Uniform::new_inclusive(1, i64::from(faces))),
            DiceType::Fudge => Some(Uniform::new_inclusive(-1, 1)),
        };
        for _ in 0..dice.count {
            roll_counter = roll_counter.wrapping_add(1);
            if roll_counter == 0 && (self.timeout_f)() {
                return Err(EvaluationErrors::Timeout);
            }
            rolls.push(match &dist {
                Some(dist) => self.rng.sample(dist),
                None => 0,
            });
        }

        #[cfg(feature = "logging")]
        {
            debug!("Dice roll result for {} is {:?}", dice, &rolls);
        }

        Ok(rolls)
    }
}

impl<'t, T: FnMut() -> bool, R: Rng> DiceSource for RandomDice<'t, T, R> {
    fn roll(&mut self, dice: &Dice) -> Result<i64, EvaluationErrors> {
        let rolls = self.throw(dice)?;
        self.rolls.extend_from_slice(&rolls);
        dice.keep(rolls)
            .into_iter()
            .try_fold(0i64, |total, face| total.checked_add(face))
            .ok_or(EvaluationErrors::Overflow)
    }
}

pub trait FormulaRoll {
    /// Rolls the formula once, returning the total and every face thrown.
    fn roll<T: FnMut() -> bool, R: Rng>(
        &self,
        rules: &RulesTable,
        timeout_f: &mut T,
        rng: &mut R,
    ) -> Result<(f64, Vec<i64>), FormulaError>;
}

impl FormulaRoll for Formula {
    fn roll<T: FnMut() -> bool, R: Rng>(
        &self,
        rules: &RulesTable,
        timeout_f: &mut T,
        rng: &mut R,
    ) -> Result<(f64, Vec<i64>), FormulaError> {
        let mut evaluator = Evaluator::new(rules, RandomDice::new(timeout_f, rng));
        let total = evaluator.formula(self)?;
        let rolls = evaluator.into_source().into_rolls();
        #[cfg(feature = "logging")]
        {
            debug!("rolled {} for {} from {:?}", total, self, &rolls)
        }
        Ok((total, rolls))
    }
}
