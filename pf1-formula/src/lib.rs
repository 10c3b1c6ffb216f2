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

//! Pathfinder roll formulas: parsing, evaluation, constant folding and
//! creature size scaling of damage dice.

#[cfg(feature = "roll")]
pub mod dice_roll;
pub mod evaluate;
pub mod formula_types;
pub mod functions;
pub mod limits;
pub mod parser;
pub mod preprocess;
pub mod rules;
pub mod simplify;
pub mod size;

pub use evaluate::EvaluationErrors;
pub use formula_types::{Formula, Term};
pub use parser::parse;
pub use rules::RulesTable;
pub use simplify::{simplify, simplify_for_display, SimplifyOptions};
pub use size::{size_reach, size_roll, Size, Stature};

use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FormulaError {
    /// The input stopped parsing at `remaining`.
    Parse { input: String, remaining: String },
    Evaluation(EvaluationErrors),
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaError::Parse { input, remaining } if remaining.is_empty() => {
                write!(f, "unexpected end of formula {:?}", input)
            }
            FormulaError::Parse { input, remaining } => {
                write!(f, "could not parse {:?} in formula {:?}", remaining, input)
            }
            FormulaError::Evaluation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for FormulaError {}

impl From<EvaluationErrors> for FormulaError {
    fn from(e: EvaluationErrors) -> Self {
        FormulaError::Evaluation(e)
    }
}
