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
    formula_types::{Dice, Formula, FunctionCall, Operator, Term},
    functions::{truthy, Resolution, RollFunction, Value},
    parser::parse,
    rules::RulesTable,
    FormulaError,
};
use std::{fmt, slice};

#[cfg(feature = "logging")]
use log::debug;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum EvaluationErrors {
    Timeout,
    Overflow,
    MalformedFormula,
    NotANumber(String),
    UnknownFunction(String),
    ArgumentCount { function: String, found: usize },
    InvalidSize(String),
}

impl fmt::Display for EvaluationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationErrors::Timeout => f.write_str("evaluation timed out"),
            EvaluationErrors::Overflow => f.write_str("dice total overflowed"),
            EvaluationErrors::MalformedFormula => f.write_str("malformed formula"),
            EvaluationErrors::NotANumber(text) => write!(f, "{:?} is not a number", text),
            EvaluationErrors::UnknownFunction(name) => write!(f, "unknown function {}", name),
            EvaluationErrors::ArgumentCount { function, found } => {
                write!(f, "{} does not take {} arguments", function, found)
            }
            EvaluationErrors::InvalidSize(text) => write!(f, "{:?} is not a size", text),
        }
    }
}

/// Produces the kept total of a single dice term.
pub trait DiceSource {
    fn roll(&mut self, dice: &Dice) -> Result<i64, EvaluationErrors>;
}

/// Numeric evaluation of a term sequence. Dice are delegated to the source,
/// which decides whether they are minimized, maximized or rolled.
pub struct Evaluator<'r, S> {
    rules: &'r RulesTable,
    source: S,
}

impl<'r, S: DiceSource> Evaluator<'r, S> {
    pub fn new(rules: &'r RulesTable, source: S) -> Evaluator<'r, S> {
        Evaluator { rules, source }
    }

    pub fn into_source(self) -> S {
        self.source
    }

    pub fn formula(&mut self, formula: &Formula) -> Result<f64, FormulaError> {
        self.sequence(&formula.terms)
    }

    pub fn sequence(&mut self, terms: &[Term]) -> Result<f64, FormulaError> {
        if terms.is_empty() {
            return Ok(0.0);
        }
        let mut pos = 0;
        let value = self.binary(terms, &mut pos, 1)?;
        if pos < terms.len() {
            return Err(EvaluationErrors::MalformedFormula.into());
        }
        Ok(value)
    }

    pub fn term(&mut self, term: &Term) -> Result<f64, FormulaError> {
        let result = match term {
            Term::Numeric(n) => Ok(*n),
            Term::Die(dice) => Ok(self.source.roll(dice)? as f64),
            Term::Parenthetical(formula) => self.formula(formula),
            Term::Function(call) => self.function(call),
            Term::Ternary(ternary) => {
                if truthy(self.formula(&ternary.condition)?) {
                    self.formula(&ternary.when_true)
                } else {
                    self.formula(&ternary.when_false)
                }
            }
            Term::Part(part) => match part.total() {
                Some(total) => Ok(total),
                None => self.sequence(part.terms()),
            },
            Term::Str(s) => Err(EvaluationErrors::NotANumber(s.text.clone()).into()),
            Term::Operator(_) => Err(EvaluationErrors::MalformedFormula.into()),
        };
        #[cfg(feature = "logging")]
        {
            debug!("got {:?} for term {}", &result, term)
        }
        result
    }

    /// Evaluates a function argument, keeping single string literals as text.
    pub fn value(&mut self, formula: &Formula) -> Result<Value, FormulaError> {
        match formula.as_text() {
            Some(text) => Ok(Value::Text(text.text.clone())),
            None => self.formula(formula).map(Value::Number),
        }
    }

    fn binary(
        &mut self,
        terms: &[Term],
        pos: &mut usize,
        min_precedence: u8,
    ) -> Result<f64, FormulaError> {
        let mut left = self.unary(terms, pos)?;
        while let Some(Term::Operator(op)) = terms.get(*pos) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            *pos += 1;
            let next = if op.is_right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.binary(terms, pos, next)?;
            left = op.apply(left, right);
        }
        Ok(left)
    }

    fn unary(&mut self, terms: &[Term], pos: &mut usize) -> Result<f64, FormulaError> {
        match terms.get(*pos) {
            Some(Term::Operator(Operator::Sub)) => {
                *pos += 1;
                Ok(-self.binary(terms, pos, Operator::Pow.precedence())?)
            }
            Some(Term::Operator(Operator::Add)) => {
                *pos += 1;
                self.binary(terms, pos, Operator::Pow.precedence())
            }
            _ => self.operand(terms, pos),
        }
    }

    fn operand(&mut self, terms: &[Term], pos: &mut usize) -> Result<f64, FormulaError> {
        let term = terms
            .get(*pos)
            .ok_or(EvaluationErrors::MalformedFormula)?;
        *pos += 1;
        let value = self.term(term)?;
        if !matches!(term, Term::Numeric(_) | Term::Parenthetical(_)) {
            return Ok(value);
        }
        // `(expr)dN` rolls `expr` dice
        let faces = match terms.get(*pos) {
            Some(Term::Str(suffix)) => suffix.die_suffix(),
            _ => None,
        };
        match faces {
            Some(faces) => {
                *pos += 1;
                let count = if value.is_finite() && value > 0.0 {
                    value.trunc().min(u32::MAX.into()) as u32
                } else {
                    0
                };
                Ok(self.source.roll(&Dice::new(count, faces))? as f64)
            }
            None => Ok(value),
        }
    }

    fn function(&mut self, call: &FunctionCall) -> Result<f64, FormulaError> {
        let function: RollFunction = call.name.parse()?;
        let rules = self.rules;
        let resolution = function.resolve(rules, call.args.len(), |i| self.value(&call.args[i]))?;
        match resolution {
            Resolution::Argument(i) => self.embedded(&call.args[i]),
            Resolution::Term(term) => self.sequence(slice::from_ref(&term)),
        }
    }

    /// A selected argument that is a string literal holds a formula of its own.
    fn embedded(&mut self, arg: &Formula) -> Result<f64, FormulaError> {
        match arg.as_text() {
            Some(text) => {
                let inner = parse(&text.text)?;
                self.formula(&inner)
            }
            None => self.formula(arg),
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::limits::{Maximized, Minimized};

    fn minimized(input: &str) -> Result<f64, FormulaError> {
        let rules = RulesTable::default();
        let formula = parse(input)?;
        Evaluator::new(&rules, Minimized).formula(&formula)
    }

    fn maximized(input: &str) -> Result<f64, FormulaError> {
        let rules = RulesTable::default();
        let formula = parse(input)?;
        Evaluator::new(&rules, Maximized).formula(&formula)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(minimized("2+3*4"), Ok(14.0));
        assert_eq!(minimized("(2+3)*4"), Ok(20.0));
        assert_eq!(minimized("10-2-3"), Ok(5.0));
        assert_eq!(minimized("2**3**2"), Ok(512.0));
        assert_eq!(minimized("-2**2"), Ok(-4.0));
        assert_eq!(minimized("2*-3"), Ok(-6.0));
        assert_eq!(minimized("7%4"), Ok(3.0));
        assert_eq!(minimized("1+1==2"), Ok(1.0));
        assert_eq!(minimized("3>2==1"), Ok(1.0));
        assert_eq!(minimized(""), Ok(0.0));
    }

    #[test]
    fn test_dice() {
        assert_eq!(minimized("1d6+2"), Ok(3.0));
        assert_eq!(maximized("1d6+2"), Ok(8.0));
        assert_eq!(maximized("(1+1)d6"), Ok(12.0));
        assert_eq!(minimized("2d6kh1"), Ok(1.0));
        assert_eq!(maximized("4dF"), Ok(4.0));
    }

    #[test]
    fn test_functions() {
        assert_eq!(minimized("if(1, \"1d6\")"), Ok(1.0));
        assert_eq!(maximized("if(1, \"1d6\")"), Ok(6.0));
        assert_eq!(minimized("if(0, \"1d6\")"), Ok(0.0));
        assert_eq!(minimized("ifelse(2==2, 2, \"2+2\")"), Ok(2.0));
        assert_eq!(minimized("ifelse(0, 2, \"2+2\")"), Ok(4.0));
        assert_eq!(minimized("lookup(3, -1, 10, 20, 30)"), Ok(30.0));
        assert_eq!(minimized("lookup(7, -1, 10, 20, 30)"), Ok(-1.0));
        assert_eq!(maximized("sizeRoll(1, 6, \"L\")"), Ok(8.0));
        assert_eq!(minimized("sizeReach(\"L\")"), Ok(10.0));
        assert_eq!(minimized("floor(7/2)"), Ok(3.0));
    }

    #[test]
    fn test_ternary() {
        assert_eq!(maximized("1 > 0 ? 1d6 : 2"), Ok(6.0));
        assert_eq!(maximized("0 ? 1d6 : 2"), Ok(2.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            minimized("fire + 1"),
            Err(FormulaError::Evaluation(EvaluationErrors::NotANumber(
                "fire".to_string()
            )))
        );
        assert_eq!(
            minimized("1 +"),
            Err(FormulaError::Evaluation(EvaluationErrors::MalformedFormula))
        );
        assert_eq!(
            minimized("1 2"),
            Err(FormulaError::Evaluation(EvaluationErrors::MalformedFormula))
        );
        assert_eq!(
            minimized("frobnicate(1)"),
            Err(FormulaError::Evaluation(EvaluationErrors::UnknownFunction(
                "frobnicate".to_string()
            )))
        );
        assert_eq!(
            minimized("not(1, 2)"),
            Err(FormulaError::Evaluation(EvaluationErrors::ArgumentCount {
                function: "not".to_string(),
                found: 2
            }))
        );
    }
}
