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

//! Constant folding of roll formulas.
//!
//! Deterministic sub-expressions collapse to numbers while dice stay
//! symbolic, so `1d12+1d8+6-8+3-2` becomes `1d12 + 1d8 - 1`.

use crate::{
    evaluate::Evaluator,
    formula_types::{Dice, Formula, FormulaPart, FunctionCall, Operator, Term, Ternary},
    functions::{truthy, Resolution, RollFunction},
    limits::Minimized,
    parser::parse,
    preprocess::prepare,
    rules::RulesTable,
    FormulaError,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "logging")]
use log::{debug, warn};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimplifyOptions {
    /// Report invalid formulas as errors instead of returning them unsimplified.
    pub strict: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        SimplifyOptions { strict: true }
    }
}

/// Simplifies `formula` after substituting `roll_data`.
pub fn simplify(
    rules: &RulesTable,
    formula: &str,
    roll_data: &Value,
    options: SimplifyOptions,
) -> Result<String, FormulaError> {
    let prepared = prepare(formula, roll_data);
    if prepared.is_empty() {
        return Ok("0".to_string());
    }
    let parsed = parse(&prepared).and_then(|parsed| {
        Evaluator::new(rules, Minimized)
            .formula(&parsed)
            .map(|_| parsed)
    });
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) if options.strict => return Err(e),
        Err(_e) => {
            #[cfg(feature = "logging")]
            {
                debug!("returning {} unsimplified: {}", prepared, _e);
            }
            return Ok(prepared);
        }
    };

    let text = Simplifier { rules }.formula(&parsed).to_string();
    #[cfg(feature = "logging")]
    {
        debug!("simplified {} to {}", formula, text);
    }
    Ok(match text.strip_suffix(" + 0") {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Simplifies a formula for display. Failures and non-finite results are
/// logged with `context` and shown as `NaN`.
pub fn simplify_for_display(
    rules: &RulesTable,
    formula: &str,
    roll_data: &Value,
    context: &str,
) -> String {
    match simplify(rules, formula, roll_data, SimplifyOptions::default()) {
        Ok(text) if !text.contains("NaN") && !text.contains("Infinity") => text,
        Ok(_text) => {
            #[cfg(feature = "logging")]
            {
                warn!("{}: {} is not finite ({})", context, formula, _text);
            }
            #[cfg(not(feature = "logging"))]
            let _ = context;
            "NaN".to_string()
        }
        Err(_e) => {
            #[cfg(feature = "logging")]
            {
                warn!("{}: could not simplify {}: {}", context, formula, _e);
            }
            "NaN".to_string()
        }
    }
}

fn is_additive(op: Operator) -> bool {
    op == Operator::Add || op == Operator::Sub
}

fn is_multiplicative(op: Operator) -> bool {
    matches!(op, Operator::Mul | Operator::Div | Operator::Rem)
}

fn is_operand(term: Option<&Term>) -> bool {
    term.map_or(false, |t| !t.is_operator())
}

struct Simplifier<'r> {
    rules: &'r RulesTable,
}

impl<'r> Simplifier<'r> {
    fn formula(&self, formula: &Formula) -> Term {
        let terms = self.sequence(&formula.terms);
        self.finish(terms)
    }

    fn sequence(&self, terms: &[Term]) -> Vec<Term> {
        let terms = terms.iter().map(|term| self.term(term)).collect();
        let terms = self.die_suffixes(terms);
        let terms = self.powers(terms);
        let terms = self.negatives(terms);
        let terms = self.fold_left(terms, is_multiplicative, false);
        let terms = self.fold_left(terms, is_additive, true);
        let terms = self.comparisons(terms);
        self.stitch(terms)
    }

    fn finish(&self, mut terms: Vec<Term>) -> Term {
        if terms.len() == 1 {
            if let Some(term) = terms.pop() {
                return term;
            }
        }
        self.part(terms, false)
    }

    fn part(&self, terms: Vec<Term>, simple: bool) -> Term {
        let total = if terms.iter().all(Term::is_deterministic) {
            Evaluator::new(self.rules, Minimized).sequence(&terms).ok()
        } else {
            None
        };
        Term::Part(FormulaPart::new(terms, simple, total))
    }

    fn signed(&self, op: Operator, operand: Term) -> Term {
        if op == Operator::Sub {
            let simple = operand.is_simple();
            self.part(vec![Term::Operator(op), operand], simple)
        } else {
            operand
        }
    }

    fn combine(&self, left: Term, op: Operator, right: Term) -> Term {
        let simple = left.is_simple() && right.is_simple();
        self.part(vec![left, Term::Operator(op), right], simple)
    }

    /// Wraps a term in parentheses unless it already reads as one unit.
    fn embed(&self, term: Term) -> Term {
        if term.is_leaf() {
            term
        } else {
            Term::Parenthetical(Formula::new(vec![term]))
        }
    }

    fn term(&self, term: &Term) -> Term {
        match term {
            Term::Parenthetical(inner) => {
                if inner.is_deterministic() {
                    if let Ok(total) = Evaluator::new(self.rules, Minimized).formula(inner) {
                        return Term::Numeric(total);
                    }
                }
                self.embed(self.formula(inner))
            }
            Term::Function(call) => self.function(call),
            Term::Ternary(ternary) => self.ternary(ternary),
            other => other.clone(),
        }
    }

    fn function(&self, call: &FunctionCall) -> Term {
        let reduced: Vec<Term> = call.args.iter().map(|arg| self.formula(arg)).collect();
        let args: Vec<Formula> = reduced
            .iter()
            .map(|arg| Formula::new(vec![arg.clone()]))
            .collect();

        if let Ok(function) = call.name.parse::<RollFunction>() {
            let decidable = if function.is_selector() {
                args.first().map_or(false, Formula::is_constant)
            } else {
                args.iter().all(Formula::is_constant)
            };
            if decidable {
                let resolved = function.resolve(self.rules, args.len(), |i| {
                    Evaluator::new(self.rules, Minimized).value(&args[i])
                });
                match resolved {
                    Ok(Resolution::Term(term)) => return term,
                    Ok(Resolution::Argument(i)) => return self.selected(&reduced[i]),
                    Err(_e) => {
                        #[cfg(feature = "logging")]
                        {
                            debug!("keeping {} unresolved: {}", call, _e);
                        }
                    }
                }
            }
        }
        Term::Function(FunctionCall {
            name: call.name.clone(),
            args,
        })
    }

    /// A selected string argument is a formula of its own.
    fn selected(&self, arg: &Term) -> Term {
        match arg {
            Term::Str(text) => match parse(&text.text) {
                Ok(inner) => self.embed(self.formula(&inner)),
                Err(_) => arg.clone(),
            },
            other => self.embed(other.clone()),
        }
    }

    fn ternary(&self, ternary: &Ternary) -> Term {
        let condition = self.formula(&ternary.condition);
        if condition.is_constant() {
            if let Ok(value) = Evaluator::new(self.rules, Minimized).term(&condition) {
                let branch = if truthy(value) {
                    &ternary.when_true
                } else {
                    &ternary.when_false
                };
                return self.formula(branch);
            }
        }
        Term::Ternary(Box::new(Ternary {
            condition: Formula::new(vec![condition]),
            when_true: Formula::new(vec![self.formula(&ternary.when_true)]),
            when_false: Formula::new(vec![self.formula(&ternary.when_false)]),
        }))
    }

    /// `5` followed by `d6` becomes the die `5d6`, anything else keeps the
    /// suffix glued to its parenthesised count.
    fn die_suffixes(&self, terms: Vec<Term>) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        for term in terms {
            let faces = match &term {
                Term::Str(s) => s.die_suffix(),
                _ => None,
            };
            if let Some(faces) = faces {
                match out.pop() {
                    Some(Term::Numeric(n))
                        if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) =>
                    {
                        out.push(Term::Die(Dice::new(n as u32, faces)));
                        continue;
                    }
                    Some(prev) if !prev.is_operator() => {
                        let count = match prev {
                            Term::Parenthetical(_) => prev,
                            other => Term::Parenthetical(Formula::new(vec![other])),
                        };
                        out.push(Term::Part(FormulaPart::new(vec![count, term], false, None)));
                        continue;
                    }
                    Some(prev) => out.push(prev),
                    None => {}
                }
            }
            out.push(term);
        }
        out
    }

    // right to left, `2 ** 3 ** 2` is `2 ** 9`
    fn powers(&self, mut rest: Vec<Term>) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(rest.len());
        while let Some(term) = rest.pop() {
            match term {
                Term::Operator(op)
                    if is_additive(op)
                        && matches!(rest.last(), Some(Term::Operator(Operator::Pow)))
                        && is_operand(out.last()) =>
                {
                    if let Some(operand) = out.pop() {
                        out.push(self.signed(op, operand));
                    }
                }
                Term::Operator(Operator::Pow)
                    if is_operand(out.last()) && is_operand(rest.last()) =>
                {
                    if let (Some(left), Some(right)) = (rest.pop(), out.pop()) {
                        out.push(self.combine(left, Operator::Pow, right));
                    }
                }
                term => out.push(term),
            }
        }
        out.reverse();
        out
    }

    fn negatives(&self, terms: Vec<Term>) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        let mut iter = terms.into_iter().peekable();
        while let Some(term) = iter.next() {
            match term {
                Term::Operator(op) if is_additive(op) && is_operand(iter.peek()) => {
                    if is_operand(out.last()) {
                        out.push(Term::Operator(Operator::Add));
                    }
                    if let Some(operand) = iter.next() {
                        out.push(self.signed(op, operand));
                    }
                }
                term => out.push(term),
            }
        }
        out
    }

    fn fold_left(&self, terms: Vec<Term>, level: fn(Operator) -> bool, gated: bool) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        let mut iter = terms.into_iter().peekable();
        while let Some(term) = iter.next() {
            if let Term::Operator(op) = term {
                let combinable = match (out.last(), iter.peek()) {
                    (Some(left), Some(right)) => {
                        level(op)
                            && !left.is_operator()
                            && !right.is_operator()
                            && (!gated || (left.is_simple() && right.is_simple()))
                    }
                    _ => false,
                };
                if combinable {
                    if let (Some(left), Some(right)) = (out.pop(), iter.next()) {
                        out.push(self.combine(left, op, right));
                        continue;
                    }
                }
            }
            out.push(term);
        }
        out
    }

    /// Comparisons take whole segments as operands, `1d6 + 2 > 3` compares
    /// `1d6 + 2` with `3`. Equality binds loosest, so relational chains are
    /// folded inside each equality operand.
    fn comparisons(&self, terms: Vec<Term>) -> Vec<Term> {
        self.split_fold(terms, Operator::is_equality, &|segment| {
            self.split_fold(segment, Operator::is_relational, &|inner| inner)
        })
    }

    fn split_fold(
        &self,
        terms: Vec<Term>,
        level: fn(Operator) -> bool,
        inner: &dyn Fn(Vec<Term>) -> Vec<Term>,
    ) -> Vec<Term> {
        let is_level = |term: &Term| matches!(term, Term::Operator(op) if level(*op));
        let positions: Vec<usize> = terms
            .iter()
            .enumerate()
            .filter(|(_, term)| is_level(term))
            .map(|(i, _)| i)
            .collect();
        if positions.is_empty() {
            return inner(terms);
        }
        let malformed = positions.first() == Some(&0)
            || positions.last() == Some(&(terms.len() - 1))
            || positions.windows(2).any(|w| w[1] == w[0] + 1);
        if malformed {
            return terms;
        }

        let mut acc: Option<Term> = None;
        let mut pending: Option<Operator> = None;
        let mut segment: Vec<Term> = Vec::new();
        for term in terms {
            match term {
                Term::Operator(op) if level(op) => {
                    let operand = self.finish(inner(std::mem::take(&mut segment)));
                    acc = Some(match (acc.take(), pending) {
                        (Some(left), Some(prev)) => self.combine(left, prev, operand),
                        _ => operand,
                    });
                    pending = Some(op);
                }
                term => segment.push(term),
            }
        }
        let operand = self.finish(inner(segment));
        match (acc, pending) {
            (Some(left), Some(prev)) => vec![self.combine(left, prev, operand)],
            _ => vec![operand],
        }
    }

    /// Leftover strings join the term to their right.
    fn stitch(&self, terms: Vec<Term>) -> Vec<Term> {
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        let mut iter = terms.into_iter().peekable();
        while let Some(term) = iter.next() {
            if matches!(term, Term::Str(_)) && is_operand(iter.peek()) {
                if let Some(next) = iter.next() {
                    out.push(Term::Part(FormulaPart::new(vec![term, next], false, None)));
                    continue;
                }
            }
            out.push(term);
        }
        out
    }
}
