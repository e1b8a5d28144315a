//! file: core/src/vm/term.rs
//! description: parser for ground terms written in source syntax.
//!
//! Accepts integers, double-quoted strings, atoms (`foo`, `'Foo bar'`),
//! compound terms (`point(1, 2)`) and lists (`[1, 2 | T]` with a ground
//! tail).
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::vm::value::{Value, LIST_CONS};
use crate::vm::VmError;

#[derive(Parser)]
#[grammar = "vm/term.pest"]
pub struct TermParser;

pub fn parse_term(text: &str) -> Result<Value, VmError> {
    let mut pairs =
        TermParser::parse(Rule::term, text).map_err(|e| VmError::new(format!("cannot parse term `{}`: {}", text, e)))?;
    let top = pairs.next().ok_or_else(|| VmError::new(format!("empty term `{}`", text)))?;
    let inner = top
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or_else(|| VmError::new(format!("empty term `{}`", text)))?;
    build(inner)
}

fn atom_name(pair: &Pair<Rule>) -> String {
    let text = pair.as_str();
    match text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
        Some(quoted) => quoted.to_string(),
        None => text.to_string(),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn build(pair: Pair<Rule>) -> Result<Value, VmError> {
    match pair.as_rule() {
        Rule::int => pair
            .as_str()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| VmError::new(format!("integer `{}` out of range: {}", pair.as_str(), e))),
        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Value::Str(unescape(raw)))
        }
        Rule::atom => {
            let name = pair.into_inner().next().map(|p| atom_name(&p)).unwrap_or_default();
            Ok(Value::atom(&name))
        }
        Rule::compound => {
            let mut inner = pair.into_inner();
            let name = inner.next().map(|p| atom_name(&p)).unwrap_or_default();
            let args = inner.map(build).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::compound(&name, args))
        }
        Rule::list => {
            let mut items = Vec::new();
            let mut tail = None;
            for p in pair.into_inner() {
                if p.as_rule() == Rule::list_tail {
                    let t = p.into_inner().next().ok_or_else(|| VmError::new("list tail without a value"))?;
                    tail = Some(build(t)?);
                } else {
                    items.push(build(p)?);
                }
            }
            Ok(match tail {
                None => Value::list(items),
                Some(t) => items.into_iter().rev().fold(t, |acc, head| Value::compound(LIST_CONS, vec![head, acc])),
            })
        }
        other => Err(VmError::new(format!("unexpected {:?} in term", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_terms() {
        let v = parse_term("pair(-3, [a, \"x y\"])").unwrap();
        assert_eq!(
            v,
            Value::compound("pair", vec![Value::Int(-3), Value::list(vec![Value::atom("a"), Value::Str("x y".into())])])
        );
        assert_eq!(v.to_string(), "pair(-3, [a, \"x y\"])");
    }

    #[test]
    fn rejects_variables() {
        assert!(parse_term("X").is_err());
    }
}
