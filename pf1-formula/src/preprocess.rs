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

//! Textual clean up of a formula before it is parsed: flair is stripped,
//! `@` references are replaced from the roll data, whitespace is dropped and
//! runs of signs are compressed.

use crate::formula_types::format_number;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{anychar, char},
    combinator::{map, recognize, value},
    multi::fold_many0,
    sequence::{delimited, preceded},
    IResult,
};
use serde_json::Value;

#[cfg(feature = "logging")]
use log::warn;

#[derive(Debug, PartialEq, Clone)]
enum Segment<'a> {
    Quoted(&'a str),
    Flair,
    Reference(&'a str),
    Other(char),
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn parse_segment(input: &str) -> IResult<&str, Segment<'_>> {
    alt((
        map(
            recognize(alt((
                delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
                delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            ))),
            Segment::Quoted,
        ),
        value(
            Segment::Flair,
            delimited(char('['), take_while(|c: char| c != ']'), char(']')),
        ),
        map(
            preceded(char('@'), take_while1(is_path_char)),
            Segment::Reference,
        ),
        map(anychar, Segment::Other),
    ))(input)
}

/// Follows a dotted path through objects and arrays.
pub fn lookup<'v>(data: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(data, |value, key| match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn substitute(path: &str, roll_data: &Value) -> String {
    match lookup(roll_data, path) {
        Some(Value::Number(n)) => n.as_f64().map_or_else(|| n.to_string(), format_number),
        Some(Value::Bool(b)) => String::from(if *b { "1" } else { "0" }),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "0".to_string(),
        Some(other) => {
            #[cfg(feature = "logging")]
            {
                warn!("@{} refers to {}, substituting 0", path, other);
            }
            #[cfg(not(feature = "logging"))]
            let _ = other;
            "0".to_string()
        }
    }
}

fn push_compressed(out: &mut String, text: &str) {
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        if c == '+' || c == '-' {
            match out.chars().last() {
                Some('+') => {
                    out.pop();
                    out.push(c);
                    continue;
                }
                Some('-') => {
                    out.pop();
                    out.push(if c == '-' { '+' } else { '-' });
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
}

fn write_segment(out: &mut String, segment: Segment<'_>, roll_data: &Value) {
    match segment {
        Segment::Quoted(text) => out.push_str(text),
        Segment::Flair => {}
        Segment::Reference(raw) => {
            let path = raw.trim_end_matches('.');
            push_compressed(out, &substitute(path, roll_data));
            out.push_str(&raw[path.len()..]);
        }
        Segment::Other(c) => {
            let mut buf = [0; 4];
            push_compressed(out, c.encode_utf8(&mut buf));
        }
    }
}

/// Produces the formula text the parser sees.
pub fn prepare(formula: &str, roll_data: &Value) -> String {
    let result: IResult<&str, String> = fold_many0(
        parse_segment,
        || String::with_capacity(formula.len()),
        |mut out, segment| {
            write_segment(&mut out, segment, roll_data);
            out
        },
    )(formula);
    match result {
        Ok((_, out)) => out,
        Err(_) => formula.to_string(),
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use serde_json::json;

    #[test]
    fn test_segments() {
        assert_eq!(parse_segment("[fire]+2"), Ok(("+2", Segment::Flair)));
        assert_eq!(
            parse_segment("@a.b+2"),
            Ok(("+2", Segment::Reference("a.b")))
        );
        assert_eq!(
            parse_segment("\"1d6 + 2\")"),
            Ok((")", Segment::Quoted("\"1d6 + 2\"")))
        );
        assert_eq!(parse_segment("[open"), Ok(("open", Segment::Other('['))));
        assert_eq!(parse_segment("@ "), Ok((" ", Segment::Other('@'))));
    }

    #[test]
    fn test_lookup() {
        let data = json!({"a": {"b": [1, {"c": 2}]}});
        assert_eq!(lookup(&data, "a.b.1.c"), Some(&json!(2)));
        assert_eq!(lookup(&data, "a.x"), None);
        assert_eq!(lookup(&data, "a.b.7"), None);
    }

    #[test]
    fn test_references() {
        let data = json!({
            "abilities": {"str": {"mod": 3}},
            "penalty": -2,
            "half": 1.5,
            "flag": true,
            "bonus": "1d4",
            "nothing": null,
            "nested": {"x": 1}
        });
        assert_eq!(prepare("@abilities.str.mod + 1d20", &data), "3+1d20");
        assert_eq!(prepare("1d20 + @penalty", &data), "1d20-2");
        assert_eq!(prepare("@half*2", &data), "1.5*2");
        assert_eq!(prepare("@flag", &data), "1");
        assert_eq!(prepare("1d6 + @bonus", &data), "1d6+1d4");
        assert_eq!(prepare("@nothing + @missing + 2", &data), "0+0+2");
        assert_eq!(prepare("@nested + 1", &data), "0+1");
        assert_eq!(prepare("@abilities.str.mod.", &data), "3.");
    }

    #[test]
    fn test_flair_and_signs() {
        let data = json!({});
        assert_eq!(prepare("1d6[fire] + 2[bonus]", &data), "1d6+2");
        assert_eq!(prepare("1 + -2", &data), "1-2");
        assert_eq!(prepare("1 - -2", &data), "1+2");
        assert_eq!(prepare("1 -+ 2", &data), "1-2");
        assert_eq!(prepare("1 ++ 2", &data), "1+2");
        assert_eq!(prepare("  ", &data), "");
    }

    #[test]
    fn test_quoted_untouched() {
        assert_eq!(
            prepare("if(1, \"1d6 + -2\")", &json!({})),
            "if(1,\"1d6 + -2\")"
        );
    }
}
