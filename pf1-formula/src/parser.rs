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
    formula_types::{
        Dice, DiceType, Formula, FunctionCall, Operator, Selector, StringTerm, Term, Ternary,
    },
    FormulaError,
};

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while},
    character::complete::{char, digit1, multispace0, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, recognize, success, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

pub fn parse_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

pub fn parse_number(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

/// `Infinity` and `NaN` as totals are displayed.
pub fn parse_special_number(input: &str) -> IResult<&str, f64> {
    terminated(
        alt((
            value(f64::INFINITY, tag("Infinity")),
            value(f64::NAN, tag("NaN")),
        )),
        not(satisfy(|c| c.is_ascii_alphanumeric() || c == '_')),
    )(input)
}

pub fn parse_dice_type(input: &str) -> IResult<&str, DiceType> {
    alt((
        map(parse_u32, DiceType::Number),
        map(tag_no_case("f"), |_| DiceType::Fudge),
        map(tag("%"), |_| DiceType::Number(100)),
    ))(input)
}

pub fn parse_selector(input: &str) -> IResult<&str, Selector> {
    alt((
        value(Selector::KeepHighest, tag_no_case("kh")),
        value(Selector::KeepLowest, tag_no_case("kl")),
        value(Selector::DropHighest, tag_no_case("dh")),
        value(Selector::DropLowest, tag_no_case("dl")),
        value(Selector::KeepHighest, tag_no_case("k")),
    ))(input)
}

pub fn parse_dice(input: &str) -> IResult<&str, Dice> {
    map(
        tuple((
            alt((parse_u32, success(1))),
            preceded(tag_no_case("d"), parse_dice_type),
            opt(pair(parse_selector, alt((parse_u32, success(1))))),
        )),
        |(count, faces, selector)| Dice {
            count,
            faces,
            selector,
        },
    )(input)
}

pub fn parse_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Pow, tag("**")),
        value(Operator::StrictEq, tag("===")),
        value(Operator::StrictNotEq, tag("!==")),
        value(Operator::Eq, tag("==")),
        value(Operator::NotEq, tag("!=")),
        value(Operator::BiggerEq, tag(">=")),
        value(Operator::SmallerEq, tag("<=")),
        value(Operator::Bigger, tag(">")),
        value(Operator::Smaller, tag("<")),
        value(Operator::Mul, tag("*")),
        value(Operator::Div, tag("/")),
        value(Operator::Rem, tag("%")),
        value(Operator::Add, tag("+")),
        value(Operator::Sub, tag("-")),
    ))(input)
}

pub fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

pub fn parse_quoted(input: &str) -> IResult<&str, StringTerm> {
    map(
        alt((
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
        )),
        |text: &str| StringTerm {
            text: text.to_string(),
            quoted: true,
        },
    )(input)
}

pub fn parse_function(input: &str) -> IResult<&str, FunctionCall> {
    map(
        pair(
            terminated(parse_identifier, multispace0),
            delimited(
                char('('),
                separated_list0(char(','), parse_formula),
                preceded(multispace0, char(')')),
            ),
        ),
        |(name, args)| FunctionCall {
            name: name.to_string(),
            args: args
                .into_iter()
                .filter(|arg: &Formula| !arg.terms.is_empty())
                .collect(),
        },
    )(input)
}

fn parse_die_suffix(input: &str) -> IResult<&str, StringTerm> {
    map(recognize(pair(tag_no_case("d"), digit1)), |text: &str| {
        StringTerm {
            text: text.to_string(),
            quoted: false,
        }
    })(input)
}

pub fn parse_parenthetical(input: &str) -> IResult<&str, Vec<Term>> {
    map(
        pair(
            delimited(
                char('('),
                parse_formula,
                preceded(multispace0, char(')')),
            ),
            opt(parse_die_suffix),
        ),
        |(inner, suffix)| {
            let mut terms = vec![Term::Parenthetical(inner)];
            terms.extend(suffix.map(Term::Str));
            terms
        },
    )(input)
}

pub fn parse_term(input: &str) -> IResult<&str, Vec<Term>> {
    alt((
        map(parse_function, |call| vec![Term::Function(call)]),
        map(parse_dice, |dice| vec![Term::Die(dice)]),
        map(parse_number, |n| vec![Term::Numeric(n)]),
        map(parse_special_number, |n| vec![Term::Numeric(n)]),
        parse_parenthetical,
        map(parse_quoted, |s| vec![Term::Str(s)]),
        map(parse_operator, |op| vec![Term::Operator(op)]),
        map(parse_identifier, |word| {
            vec![Term::Str(StringTerm {
                text: word.to_string(),
                quoted: false,
            })]
        }),
    ))(input)
}

pub fn parse_sequence(input: &str) -> IResult<&str, Vec<Term>> {
    map(many0(preceded(multispace0, parse_term)), |terms| {
        terms.into_iter().flatten().collect()
    })(input)
}

pub fn parse_formula(input: &str) -> IResult<&str, Formula> {
    map(
        pair(
            parse_sequence,
            opt(pair(
                preceded(pair(multispace0, char('?')), parse_formula),
                preceded(pair(multispace0, char(':')), parse_formula),
            )),
        ),
        |(terms, branches)| match branches {
            Some((when_true, when_false)) => Formula::new(vec![Term::Ternary(Box::new(Ternary {
                condition: Formula::new(terms),
                when_true,
                when_false,
            }))]),
            None => Formula::new(terms),
        },
    )(input)
}

/// Deepest nesting of parentheses, ternaries, exponents and sign runs a
/// formula may have.
pub const MAX_NESTING: usize = 64;

// every `(`, `?` and `**` costs one level of recursion while parsing or
// evaluating, as does every sign in a run like `---1`
fn check_nesting(input: &str) -> Result<(), FormulaError> {
    let mut depth = 0usize;
    let mut nested = 0usize;
    let mut signs = 0usize;
    let mut quote: Option<char> = None;
    let mut previous = ' ';
    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '?' => nested += 1,
                '*' if previous == '*' => nested += 1,
                _ => {}
            },
        }
        if quote.is_none() && (c == '+' || c == '-') {
            signs += 1;
        } else if !c.is_whitespace() {
            signs = 0;
        }
        if depth + nested + signs > MAX_NESTING {
            return Err(FormulaError::Parse {
                input: input.to_string(),
                remaining: input[i..].to_string(),
            });
        }
        previous = if previous == '*' && c == '*' { ' ' } else { c };
    }
    Ok(())
}

/// Parses a complete formula string.
pub fn parse(input: &str) -> Result<Formula, FormulaError> {
    check_nesting(input)?;
    let result = all_consuming(terminated(parse_formula, multispace0))(input);
    match result {
        Ok((_, formula)) => Ok(formula),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(FormulaError::Parse {
            input: input.to_string(),
            remaining: e.input.to_string(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(FormulaError::Parse {
            input: input.to_string(),
            remaining: String::new(),
        }),
    }
}
