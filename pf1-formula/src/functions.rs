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

//! Functions callable by name from inside a formula.

use crate::{
    evaluate::EvaluationErrors,
    formula_types::Term,
    rules::RulesTable,
    size::{size_reach, size_roll, Size, Stature},
    FormulaError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub fn truthy(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// An evaluated function argument.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Result<f64, EvaluationErrors> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| EvaluationErrors::NotANumber(text.clone())),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => truthy(*n),
            Value::Text(text) => match text.trim().parse::<f64>() {
                Ok(n) => truthy(n),
                Err(_) => !text.is_empty(),
            },
        }
    }

    pub fn as_size(&self) -> Result<Size, EvaluationErrors> {
        match self {
            Value::Number(n) if n.is_finite() => Ok(Size::from_index(n.trunc() as i64)),
            Value::Number(n) => Err(EvaluationErrors::InvalidSize(n.to_string())),
            Value::Text(text) => text.parse(),
        }
    }

    pub fn as_stature(&self) -> Result<Stature, EvaluationErrors> {
        match self {
            Value::Text(text) => text.parse(),
            Value::Number(n) => Err(EvaluationErrors::NotANumber(n.to_string())),
        }
    }
}

/// What a function call reduces to.
#[derive(Debug, PartialEq, Clone)]
pub enum Resolution {
    /// The call is replaced by one of its own arguments.
    Argument(usize),
    Term(Term),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RollFunction {
    IfElse,
    If,
    Lookup,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Xor,
    Not,
    SizeRoll,
    SizeReach,
    Abs,
    Ceil,
    Floor,
    Round,
    Trunc,
    Sign,
    Sqrt,
    Min,
    Max,
    Pow,
    Clamp,
}

impl FromStr for RollFunction {
    type Err = EvaluationErrors;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "ifelse" => RollFunction::IfElse,
            "if" => RollFunction::If,
            "lookup" => RollFunction::Lookup,
            "eq" => RollFunction::Eq,
            "ne" => RollFunction::Ne,
            "lt" => RollFunction::Lt,
            "lte" => RollFunction::Lte,
            "gt" => RollFunction::Gt,
            "gte" => RollFunction::Gte,
            "and" => RollFunction::And,
            "or" => RollFunction::Or,
            "xor" => RollFunction::Xor,
            "not" => RollFunction::Not,
            "sizeroll" => RollFunction::SizeRoll,
            "sizereach" => RollFunction::SizeReach,
            "abs" => RollFunction::Abs,
            "ceil" => RollFunction::Ceil,
            "floor" => RollFunction::Floor,
            "round" => RollFunction::Round,
            "trunc" => RollFunction::Trunc,
            "sign" => RollFunction::Sign,
            "sqrt" => RollFunction::Sqrt,
            "min" => RollFunction::Min,
            "max" => RollFunction::Max,
            "pow" => RollFunction::Pow,
            "clamp" => RollFunction::Clamp,
            _ => return Err(EvaluationErrors::UnknownFunction(s.to_string())),
        })
    }
}

impl RollFunction {
    pub fn name(self) -> &'static str {
        match self {
            RollFunction::IfElse => "ifelse",
            RollFunction::If => "if",
            RollFunction::Lookup => "lookup",
            RollFunction::Eq => "eq",
            RollFunction::Ne => "ne",
            RollFunction::Lt => "lt",
            RollFunction::Lte => "lte",
            RollFunction::Gt => "gt",
            RollFunction::Gte => "gte",
            RollFunction::And => "and",
            RollFunction::Or => "or",
            RollFunction::Xor => "xor",
            RollFunction::Not => "not",
            RollFunction::SizeRoll => "sizeRoll",
            RollFunction::SizeReach => "sizeReach",
            RollFunction::Abs => "abs",
            RollFunction::Ceil => "ceil",
            RollFunction::Floor => "floor",
            RollFunction::Round => "round",
            RollFunction::Trunc => "trunc",
            RollFunction::Sign => "sign",
            RollFunction::Sqrt => "sqrt",
            RollFunction::Min => "min",
            RollFunction::Max => "max",
            RollFunction::Pow => "pow",
            RollFunction::Clamp => "clamp",
        }
    }

    fn arity(self) -> (usize, usize) {
        match self {
            RollFunction::IfElse | RollFunction::Clamp => (3, 3),
            RollFunction::If | RollFunction::Pow => (2, 2),
            RollFunction::Eq
            | RollFunction::Ne
            | RollFunction::Lt
            | RollFunction::Lte
            | RollFunction::Gt
            | RollFunction::Gte => (2, 2),
            RollFunction::Lookup => (2, usize::MAX),
            RollFunction::And
            | RollFunction::Or
            | RollFunction::Xor
            | RollFunction::Min
            | RollFunction::Max => (1, usize::MAX),
            RollFunction::SizeRoll => (2, 4),
            RollFunction::SizeReach => (0, 3),
            RollFunction::Not
            | RollFunction::Abs
            | RollFunction::Ceil
            | RollFunction::Floor
            | RollFunction::Round
            | RollFunction::Trunc
            | RollFunction::Sign
            | RollFunction::Sqrt => (1, 1),
        }
    }

    /// Selectors return one of their arguments unevaluated, so only the first
    /// argument has to be known to resolve them.
    pub fn is_selector(self) -> bool {
        matches!(
            self,
            RollFunction::IfElse | RollFunction::If | RollFunction::Lookup
        )
    }

    /// Resolves a call with `arg_count` arguments. `arg` evaluates the
    /// argument at an index and is only called for the arguments needed.
    pub fn resolve<E>(
        self,
        rules: &RulesTable,
        arg_count: usize,
        mut arg: E,
    ) -> Result<Resolution, FormulaError>
    where
        E: FnMut(usize) -> Result<Value, FormulaError>,
    {
        let (min, max) = self.arity();
        if arg_count < min || arg_count > max {
            return Err(EvaluationErrors::ArgumentCount {
                function: self.name().to_string(),
                found: arg_count,
            }
            .into());
        }
        let mut number = |i: usize| -> Result<f64, FormulaError> { Ok(arg(i)?.as_number()?) };

        let value = match self {
            RollFunction::IfElse => {
                return Ok(Resolution::Argument(if truthy(number(0)?) { 1 } else { 2 }));
            }
            RollFunction::If => {
                return Ok(if truthy(number(0)?) {
                    Resolution::Argument(1)
                } else {
                    Resolution::Term(Term::Numeric(0.0))
                });
            }
            RollFunction::Lookup => {
                let index = number(0)?;
                let results = arg_count - 2;
                let selected = if index.fract() == 0.0 && index >= 1.0 && index <= results as f64
                {
                    1 + index as usize
                } else {
                    1
                };
                return Ok(Resolution::Argument(selected));
            }
            RollFunction::Eq => truth(number(0)? == number(1)?),
            RollFunction::Ne => truth(number(0)? != number(1)?),
            RollFunction::Lt => truth(number(0)? < number(1)?),
            RollFunction::Lte => truth(number(0)? <= number(1)?),
            RollFunction::Gt => truth(number(0)? > number(1)?),
            RollFunction::Gte => truth(number(0)? >= number(1)?),
            RollFunction::And => {
                let mut all = true;
                for i in 0..arg_count {
                    all &= truthy(number(i)?);
                }
                truth(all)
            }
            RollFunction::Or => {
                let mut any = false;
                for i in 0..arg_count {
                    any |= truthy(number(i)?);
                }
                truth(any)
            }
            RollFunction::Xor => {
                let mut count = 0;
                for i in 0..arg_count {
                    if truthy(number(i)?) {
                        count += 1;
                    }
                }
                truth(count == 1)
            }
            RollFunction::Not => truth(!truthy(number(0)?)),
            RollFunction::SizeRoll => {
                let count = number(0)?;
                let sides = number(1)?;
                let target = optional(&mut arg, arg_count, 2)?
                    .map(|v| v.as_size())
                    .transpose()?
                    .unwrap_or_default();
                let initial = optional(&mut arg, arg_count, 3)?
                    .map(|v| v.as_size())
                    .transpose()?
                    .unwrap_or_default();
                return Ok(Resolution::Term(size_roll(
                    rules, count, sides, target, initial,
                )));
            }
            RollFunction::SizeReach => {
                let size = optional(&mut arg, arg_count, 0)?
                    .map(|v| v.as_size())
                    .transpose()?
                    .unwrap_or_default();
                let reach = optional(&mut arg, arg_count, 1)?
                    .map_or(false, |v| v.truthy());
                let stature = optional(&mut arg, arg_count, 2)?
                    .map(|v| v.as_stature())
                    .transpose()?
                    .unwrap_or_default();
                size_reach(rules, size, reach, stature).into()
            }
            RollFunction::Abs => number(0)?.abs(),
            RollFunction::Ceil => number(0)?.ceil(),
            RollFunction::Floor => number(0)?.floor(),
            // half-way cases round up, -2.5 becomes -2
            RollFunction::Round => (number(0)? + 0.5).floor(),
            RollFunction::Trunc => number(0)?.trunc(),
            RollFunction::Sign => {
                let n = number(0)?;
                if n == 0.0 || n.is_nan() {
                    n
                } else {
                    n.signum()
                }
            }
            RollFunction::Sqrt => number(0)?.sqrt(),
            RollFunction::Min => {
                let mut result = f64::INFINITY;
                for i in 0..arg_count {
                    result = result.min(number(i)?);
                }
                result
            }
            RollFunction::Max => {
                let mut result = f64::NEG_INFINITY;
                for i in 0..arg_count {
                    result = result.max(number(i)?);
                }
                result
            }
            RollFunction::Pow => number(0)?.powf(number(1)?),
            RollFunction::Clamp => {
                let value = number(0)?;
                let low = number(1)?;
                let high = number(2)?;
                value.max(low).min(high)
            }
        };
        Ok(Resolution::Term(Term::Numeric(value)))
    }
}

fn optional<E>(arg: &mut E, arg_count: usize, index: usize) -> Result<Option<Value>, FormulaError>
where
    E: FnMut(usize) -> Result<Value, FormulaError>,
{
    if index < arg_count {
        arg(index).map(Some)
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::formula_types::Dice;

    fn call(name: &str, args: Vec<Value>) -> Result<Resolution, FormulaError> {
        let function: RollFunction = name.parse()?;
        function.resolve(&RulesTable::default(), args.len(), |i| Ok(args[i].clone()))
    }

    fn numbers(name: &str, args: &[f64]) -> Result<Resolution, FormulaError> {
        call(name, args.iter().copied().map(Value::Number).collect())
    }

    fn numeric(n: f64) -> Result<Resolution, FormulaError> {
        Ok(Resolution::Term(Term::Numeric(n)))
    }

    #[test]
    fn test_parse_name() {
        assert_eq!("IfElse".parse(), Ok(RollFunction::IfElse));
        assert_eq!("sizeroll".parse(), Ok(RollFunction::SizeRoll));
        assert_eq!(
            "explode".parse::<RollFunction>(),
            Err(EvaluationErrors::UnknownFunction("explode".to_string()))
        );
    }

    #[test]
    fn test_selectors() {
        assert_eq!(numbers("ifelse", &[1.0, 5.0, 6.0]), Ok(Resolution::Argument(1)));
        assert_eq!(numbers("ifelse", &[0.0, 5.0, 6.0]), Ok(Resolution::Argument(2)));
        assert_eq!(numbers("if", &[2.0, 5.0]), Ok(Resolution::Argument(1)));
        assert_eq!(numbers("if", &[0.0, 5.0]), numeric(0.0));
        assert_eq!(
            numbers("lookup", &[3.0, -1.0, 10.0, 20.0, 30.0]),
            Ok(Resolution::Argument(4))
        );
        assert_eq!(
            numbers("lookup", &[0.0, -1.0, 10.0, 20.0, 30.0]),
            Ok(Resolution::Argument(1))
        );
        assert_eq!(
            numbers("lookup", &[4.0, -1.0, 10.0, 20.0, 30.0]),
            Ok(Resolution::Argument(1))
        );
        assert_eq!(
            numbers("lookup", &[1.5, -1.0, 10.0]),
            Ok(Resolution::Argument(1))
        );
    }

    #[test]
    fn test_selectors_evaluate_lazily() {
        let mut seen = vec![];
        let resolution = RollFunction::IfElse.resolve(&RulesTable::default(), 3, |i| {
            seen.push(i);
            Ok(Value::Number(1.0))
        });
        assert_eq!(resolution, Ok(Resolution::Argument(1)));
        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(numbers("eq", &[2.0, 2.0]), numeric(1.0));
        assert_eq!(numbers("ne", &[2.0, 2.0]), numeric(0.0));
        assert_eq!(numbers("lt", &[1.0, 2.0]), numeric(1.0));
        assert_eq!(numbers("lte", &[2.0, 2.0]), numeric(1.0));
        assert_eq!(numbers("gt", &[1.0, 2.0]), numeric(0.0));
        assert_eq!(numbers("gte", &[3.0, 2.0]), numeric(1.0));
    }

    #[test]
    fn test_boolean() {
        assert_eq!(numbers("and", &[1.0, 2.0, 3.0]), numeric(1.0));
        assert_eq!(numbers("and", &[1.0, 0.0]), numeric(0.0));
        assert_eq!(numbers("or", &[0.0, 0.0, 4.0]), numeric(1.0));
        assert_eq!(numbers("or", &[0.0]), numeric(0.0));
        assert_eq!(numbers("xor", &[0.0, 1.0, 0.0]), numeric(1.0));
        assert_eq!(numbers("xor", &[1.0, 1.0]), numeric(0.0));
        assert_eq!(numbers("not", &[0.0]), numeric(1.0));
        assert_eq!(numbers("not", &[f64::NAN]), numeric(1.0));
    }

    #[test]
    fn test_math() {
        assert_eq!(numbers("floor", &[3.5]), numeric(3.0));
        assert_eq!(numbers("ceil", &[3.2]), numeric(4.0));
        assert_eq!(numbers("round", &[2.5]), numeric(3.0));
        assert_eq!(numbers("round", &[-2.5]), numeric(-2.0));
        assert_eq!(numbers("min", &[3.0, 1.0, 2.0]), numeric(1.0));
        assert_eq!(numbers("max", &[3.0, 1.0, 2.0]), numeric(3.0));
        assert_eq!(numbers("clamp", &[7.0, 0.0, 5.0]), numeric(5.0));
        assert_eq!(numbers("pow", &[2.0, 3.0]), numeric(8.0));
        assert_eq!(numbers("sign", &[-4.0]), numeric(-1.0));
    }

    #[test]
    fn test_size_functions() {
        assert_eq!(
            call(
                "sizeRoll",
                vec![
                    Value::Number(1.0),
                    Value::Number(6.0),
                    Value::Text("L".to_string())
                ]
            ),
            Ok(Resolution::Term(Term::Die(Dice::new(1, 8))))
        );
        assert_eq!(
            numbers("sizeRoll", &[1.0, 6.0, 5.0]),
            Ok(Resolution::Term(Term::Die(Dice::new(1, 8))))
        );
        assert_eq!(
            numbers("sizeRoll", &[1.0, 6.0]),
            Ok(Resolution::Term(Term::Die(Dice::new(1, 6))))
        );
        assert_eq!(call("sizeReach", vec![]), numeric(5.0));
        assert_eq!(
            call(
                "sizeReach",
                vec![
                    Value::Text("H".to_string()),
                    Value::Number(1.0),
                    Value::Text("long".to_string())
                ]
            ),
            numeric(20.0)
        );
        assert_eq!(
            call("sizeRoll", vec![Value::Number(1.0), Value::Number(6.0), Value::Text("X".to_string())]),
            Err(FormulaError::Evaluation(EvaluationErrors::InvalidSize(
                "X".to_string()
            )))
        );
    }

    #[test]
    fn test_argument_count() {
        assert_eq!(
            numbers("ifelse", &[1.0, 2.0]),
            Err(FormulaError::Evaluation(EvaluationErrors::ArgumentCount {
                function: "ifelse".to_string(),
                found: 2
            }))
        );
        assert!(numbers("lookup", &[1.0]).is_err());
        assert!(numbers("sizeRoll", &[1.0, 6.0, 4.0, 4.0, 4.0]).is_err());
    }

    #[test]
    fn test_value() {
        assert_eq!(Value::Text(" 3 ".to_string()).as_number(), Ok(3.0));
        assert!(Value::Text("L".to_string()).as_number().is_err());
        assert!(Value::Text("L".to_string()).truthy());
        assert!(!Value::Text("0".to_string()).truthy());
        assert!(!Value::Text(String::new()).truthy());
        assert_eq!(Value::Number(9.0).as_size(), Ok(Size::Colossal));
    }
}
