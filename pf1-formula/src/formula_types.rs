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

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiceType {
    Number(u32),
    Fudge,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Selector {
    KeepHighest,
    KeepLowest,
    DropHighest,
    DropLowest,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dice {
    pub count: u32,
    pub faces: DiceType,
    pub selector: Option<(Selector, u32)>,
}

impl Dice {
    pub fn new(count: u32, sides: u32) -> Dice {
        Dice {
            count,
            faces: DiceType::Number(sides),
            selector: None,
        }
    }

    /// Number of dice that contribute to the total once the selector is applied.
    pub fn kept(&self) -> u32 {
        match self.selector {
            None => self.count,
            Some((Selector::KeepHighest, n)) | Some((Selector::KeepLowest, n)) => {
                n.min(self.count)
            }
            Some((Selector::DropHighest, n)) | Some((Selector::DropLowest, n)) => {
                self.count.saturating_sub(n)
            }
        }
    }

    /// Applies the selector to the thrown faces.
    pub fn keep(&self, mut rolls: Vec<i64>) -> Vec<i64> {
        let selector = match self.selector {
            Some((selector, _)) => selector,
            None => return rolls,
        };
        let kept = self.kept() as usize;
        rolls.sort_unstable();
        let len = rolls.len();
        match selector {
            Selector::KeepHighest | Selector::DropLowest => rolls.split_off(len - kept.min(len)),
            Selector::KeepLowest | Selector::DropHighest => {
                rolls.truncate(kept);
                rolls
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operator {
    Pow,
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    Bigger,
    BiggerEq,
    Smaller,
    SmallerEq,
}

impl Operator {
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Eq | Operator::StrictEq | Operator::NotEq | Operator::StrictNotEq => 1,
            Operator::Bigger | Operator::BiggerEq | Operator::Smaller | Operator::SmallerEq => 2,
            Operator::Add | Operator::Sub => 3,
            Operator::Mul | Operator::Div | Operator::Rem => 4,
            Operator::Pow => 5,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == Operator::Pow
    }

    pub fn is_relational(self) -> bool {
        self.precedence() == 2
    }

    pub fn is_equality(self) -> bool {
        self.precedence() == 1
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        match self {
            Operator::Pow => left.powf(right),
            Operator::Mul => left * right,
            Operator::Div => left / right,
            Operator::Rem => left % right,
            Operator::Add => left + right,
            Operator::Sub => left - right,
            Operator::Eq | Operator::StrictEq => truth(left == right),
            Operator::NotEq | Operator::StrictNotEq => truth(left != right),
            Operator::Bigger => truth(left > right),
            Operator::BiggerEq => truth(left >= right),
            Operator::Smaller => truth(left < right),
            Operator::SmallerEq => truth(left <= right),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Pow => "**",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Eq => "==",
            Operator::StrictEq => "===",
            Operator::NotEq => "!=",
            Operator::StrictNotEq => "!==",
            Operator::Bigger => ">",
            Operator::BiggerEq => ">=",
            Operator::Smaller => "<",
            Operator::SmallerEq => "<=",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StringTerm {
    pub text: String,
    pub quoted: bool,
}

impl StringTerm {
    /// Face count of a bare `dN` suffix left behind by `(expr)dN`.
    pub fn die_suffix(&self) -> Option<u32> {
        if self.quoted {
            return None;
        }
        let rest = self
            .text
            .strip_prefix('d')
            .or_else(|| self.text.strip_prefix('D'))?;
        if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        rest.parse().ok()
    }
}

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Formula>,
}

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ternary {
    pub condition: Formula,
    pub when_true: Formula,
    pub when_false: Formula,
}

/// Terms already proven combinable, produced while simplifying.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FormulaPart {
    terms: Vec<Term>,
    simple: bool,
    total: Option<f64>,
}

impl FormulaPart {
    pub fn new(terms: Vec<Term>, simple: bool, total: Option<f64>) -> FormulaPart {
        FormulaPart {
            terms,
            simple,
            total,
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn simple(&self) -> bool {
        self.simple
    }

    pub fn total(&self) -> Option<f64> {
        self.total
    }
}

#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    Numeric(f64),
    Die(Dice),
    Operator(Operator),
    Parenthetical(Formula),
    Function(FunctionCall),
    Str(StringTerm),
    Ternary(Box<Ternary>),
    Part(FormulaPart),
}

impl Term {
    pub fn is_operator(&self) -> bool {
        matches!(self, Term::Operator(_))
    }

    /// No randomness and no strings anywhere below this term, so it can be
    /// reduced to a number.
    pub fn is_deterministic(&self) -> bool {
        match self {
            Term::Numeric(_) | Term::Operator(_) => true,
            Term::Die(_) | Term::Str(_) => false,
            Term::Parenthetical(formula) => formula.is_deterministic(),
            Term::Function(call) => {
                !call.name.eq_ignore_ascii_case("sizeRoll")
                    && call.args.iter().all(Formula::is_deterministic)
            }
            Term::Ternary(ternary) => {
                ternary.condition.is_deterministic()
                    && ternary.when_true.is_deterministic()
                    && ternary.when_false.is_deterministic()
            }
            Term::Part(part) => part.total.is_some() || part.terms.iter().all(Term::is_deterministic),
        }
    }

    /// Contains no dice. Strings count as constant here since function
    /// arguments may be size codes or embedded formulas.
    pub fn is_constant(&self) -> bool {
        match self {
            Term::Numeric(_) | Term::Operator(_) | Term::Str(_) => true,
            Term::Die(_) => false,
            Term::Parenthetical(formula) => formula.is_constant(),
            Term::Function(call) => call.args.iter().all(Formula::is_constant),
            Term::Ternary(ternary) => {
                ternary.condition.is_constant()
                    && ternary.when_true.is_constant()
                    && ternary.when_false.is_constant()
            }
            Term::Part(part) => part.terms.iter().all(Term::is_constant),
        }
    }

    pub fn is_simple(&self) -> bool {
        match self {
            Term::Numeric(_) => true,
            Term::Part(part) => part.simple,
            _ => false,
        }
    }

    /// Renders as one unit inside a larger sequence without needing parentheses.
    pub fn is_leaf(&self) -> bool {
        match self {
            Term::Part(part) => part.total.is_some(),
            Term::Ternary(_) | Term::Operator(_) => false,
            _ => true,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Formula {
    pub terms: Vec<Term>,
}

impl Formula {
    pub fn new(terms: Vec<Term>) -> Formula {
        Formula { terms }
    }

    pub fn is_deterministic(&self) -> bool {
        self.terms.iter().all(Term::is_deterministic)
    }

    pub fn is_constant(&self) -> bool {
        self.terms.iter().all(Term::is_constant)
    }

    /// The text of a formula consisting of a single string literal.
    pub fn as_text(&self) -> Option<&StringTerm> {
        match self.terms.as_slice() {
            [Term::Str(s)] => Some(s),
            _ => None,
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for DiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiceType::Number(n) => write!(f, "{}", n),
            DiceType::Fudge => write!(f, "F"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Selector::KeepHighest => "kh",
            Selector::KeepLowest => "kl",
            Selector::DropHighest => "dh",
            Selector::DropLowest => "dl",
        })
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.faces)?;
        match self.selector {
            Some((selector, n)) => write!(f, "{}{}", selector, n),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for StringTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.text)
        } else {
            f.write_str(&self.text)
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for Ternary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ? {} : {}",
            self.condition, self.when_true, self.when_false
        )
    }
}

impl fmt::Display for FormulaPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => f.write_str(&format_number(total)),
            None => write_sequence(f, &self.terms),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Numeric(n) => f.write_str(&format_number(*n)),
            Term::Die(dice) => write!(f, "{}", dice),
            Term::Operator(op) => write!(f, "{}", op),
            Term::Parenthetical(formula) => write!(f, "({})", formula),
            Term::Function(call) => write!(f, "{}", call),
            Term::Str(s) => write!(f, "{}", s),
            Term::Ternary(ternary) => write!(f, "{}", ternary),
            Term::Part(part) => write!(f, "{}", part),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sequence(f, &self.terms)
    }
}

// binary operators get spaces, unary ones stick to their operand and
// `+ -x` is written as `- x`
fn write_sequence(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
    let mut pending: Option<Operator> = None;
    let mut unary = String::new();
    let mut after_operand = false;
    for term in terms {
        if let Term::Operator(op) = term {
            if after_operand && pending.is_none() {
                pending = Some(*op);
            } else {
                unary.push_str(op.symbol());
            }
            continue;
        }
        let text = format!("{}{}", unary, term);
        unary.clear();
        match pending.take() {
            Some(Operator::Add) if text.starts_with('-') => write!(f, " - {}", &text[1..])?,
            Some(op) => write!(f, " {} {}", op, text)?,
            None => f.write_str(&text)?,
        }
        after_operand = true;
    }
    if let Some(op) = pending {
        write!(f, " {}", op)?;
    }
    f.write_str(&unary)
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_dice_keep() {
        let mut dice = Dice::new(4, 6);
        dice.selector = Some((Selector::KeepHighest, 3));
        assert_eq!(dice.kept(), 3);
        assert_eq!(dice.keep(vec![2, 6, 1, 4]), vec![2, 4, 6]);
        dice.selector = Some((Selector::KeepLowest, 1));
        assert_eq!(dice.keep(vec![2, 6, 1, 4]), vec![1]);
        dice.selector = Some((Selector::DropLowest, 1));
        assert_eq!(dice.keep(vec![2, 6, 1, 4]), vec![2, 4, 6]);
        dice.selector = Some((Selector::DropHighest, 5));
        assert_eq!(dice.kept(), 0);
        assert_eq!(dice.keep(vec![2, 6, 1, 4]), Vec::<i64>::new());
    }

    #[test]
    fn test_die_suffix() {
        let suffix = |text: &str, quoted| {
            StringTerm {
                text: text.to_string(),
                quoted,
            }
            .die_suffix()
        };
        assert_eq!(suffix("d6", false), Some(6));
        assert_eq!(suffix("D20", false), Some(20));
        assert_eq!(suffix("d6", true), None);
        assert_eq!(suffix("d", false), None);
        assert_eq!(suffix("dex", false), None);
    }

    #[test]
    fn test_display_sequence() {
        let formula = Formula::new(vec![
            Term::Die(Dice::new(1, 12)),
            Term::Operator(Operator::Add),
            Term::Numeric(-1.0),
            Term::Operator(Operator::Mul),
            Term::Operator(Operator::Sub),
            Term::Parenthetical(Formula::new(vec![Term::Numeric(2.0)])),
        ]);
        assert_eq!(formula.to_string(), "1d12 - 1 * -(2)");

        let call = Term::Function(FunctionCall {
            name: "max".to_string(),
            args: vec![
                Formula::new(vec![Term::Die(Dice::new(1, 4))]),
                Formula::new(vec![Term::Str(StringTerm {
                    text: "L".to_string(),
                    quoted: true,
                })]),
            ],
        });
        assert_eq!(call.to_string(), "max(1d4, \"L\")");
    }

    #[test]
    fn test_deterministic() {
        assert!(Term::Numeric(1.0).is_deterministic());
        assert!(!Term::Die(Dice::new(1, 6)).is_deterministic());
        let size_roll = Term::Function(FunctionCall {
            name: "sizeRoll".to_string(),
            args: vec![Formula::new(vec![Term::Numeric(1.0)])],
        });
        assert!(!size_roll.is_deterministic());
        assert!(size_roll.is_constant());
    }
}
