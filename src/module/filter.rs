//! LDAP-style requirement filters.
//!
//! Requirements select capabilities with filters such as
//! `(&(osgi.wiring.package=org.example.api)(version>=1.2))`. Comparison is
//! typed by the capability attribute: version attributes compare as
//! [`Version`]s, long attributes numerically, and everything else as strings.
//! List attributes match when any element matches.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::capability::AttrValue;
use super::version::Version;
use crate::error::{ModGraphError, Result};

/// Comparison operator of a simple filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

impl Op {
    fn as_str(self) -> &'static str {
        match self {
            Op::Equal => "=",
            Op::Approx => "~=",
            Op::GreaterEq => ">=",
            Op::LessEq => "<=",
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Compare { attr: String, op: Op, value: String },
    Present(String),
    /// `attr=a*b*c`; `parts` holds the text between wildcards.
    Substring { attr: String, parts: Vec<String> },
}

impl Filter {
    /// Parse a filter string.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            input,
            chars: input.chars().collect(),
            pos: 0,
        };
        parser.skip_whitespace();
        let filter = parser.filter()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }

    /// `(attr=value)`.
    pub fn equal(attr: &str, value: &str) -> Self {
        Filter::Compare {
            attr: attr.to_string(),
            op: Op::Equal,
            value: value.to_string(),
        }
    }

    /// `(attr>=value)`.
    pub fn greater_eq(attr: &str, value: &str) -> Self {
        Filter::Compare {
            attr: attr.to_string(),
            op: Op::GreaterEq,
            value: value.to_string(),
        }
    }

    /// `(attr<=value)`.
    pub fn less_eq(attr: &str, value: &str) -> Self {
        Filter::Compare {
            attr: attr.to_string(),
            op: Op::LessEq,
            value: value.to_string(),
        }
    }

    /// Evaluate the filter against a capability's attributes.
    pub fn matches(&self, attrs: &BTreeMap<String, AttrValue>) -> bool {
        match self {
            Filter::And(items) => items.iter().all(|f| f.matches(attrs)),
            Filter::Or(items) => items.iter().any(|f| f.matches(attrs)),
            Filter::Not(inner) => !inner.matches(attrs),
            Filter::Present(attr) => lookup(attrs, attr).is_some(),
            Filter::Compare { attr, op, value } => {
                lookup(attrs, attr).is_some_and(|v| compare(v, *op, value))
            }
            Filter::Substring { attr, parts } => {
                lookup(attrs, attr).is_some_and(|v| match v {
                    AttrValue::String(s) => substring_match(s, parts),
                    AttrValue::Strings(list) => list.iter().any(|s| substring_match(s, parts)),
                    _ => false,
                })
            }
        }
    }
}

impl FromStr for Filter {
    type Err = ModGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn lookup<'a>(attrs: &'a BTreeMap<String, AttrValue>, key: &str) -> Option<&'a AttrValue> {
    attrs.get(key).or_else(|| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn compare(value: &AttrValue, op: Op, operand: &str) -> bool {
    match value {
        AttrValue::String(s) => compare_str(s, op, operand),
        AttrValue::Strings(list) => list.iter().any(|s| compare_str(s, op, operand)),
        AttrValue::Long(n) => match operand.trim().parse::<i64>() {
            Ok(rhs) => compare_ord(n, op, &rhs),
            Err(_) => false,
        },
        AttrValue::Version(v) => match Version::parse(operand) {
            Ok(rhs) => compare_ord(v, op, &rhs),
            Err(_) => false,
        },
        AttrValue::Versions(list) => match Version::parse(operand) {
            Ok(rhs) => list.iter().any(|v| compare_ord(v, op, &rhs)),
            Err(_) => false,
        },
    }
}

fn compare_ord<T: Ord>(lhs: &T, op: Op, rhs: &T) -> bool {
    match op {
        Op::Equal | Op::Approx => lhs == rhs,
        Op::GreaterEq => lhs >= rhs,
        Op::LessEq => lhs <= rhs,
    }
}

fn compare_str(lhs: &str, op: Op, rhs: &str) -> bool {
    match op {
        Op::Approx => normalize(lhs) == normalize(rhs),
        _ => compare_ord(&lhs, op, &rhs),
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_match(s: &str, parts: &[String]) -> bool {
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return true,
    };
    let Some(mut remaining) = s.strip_prefix(first.as_str()) else {
        return false;
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return remaining.is_empty(),
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ModGraphError {
        ModGraphError::InvalidFilter {
            filter: self.input.to_string(),
            message: format!("{} at position {}", message, self.pos),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: char) -> Result<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", c)))
        }
    }

    fn filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_whitespace();
                Filter::Not(Box::new(self.filter()?))
            }
            _ => self.item()?,
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn list(&mut self) -> Result<Vec<Filter>> {
        let mut items = Vec::new();
        self.skip_whitespace();
        while self.peek() == Some('(') {
            items.push(self.filter()?);
            self.skip_whitespace();
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn item(&mut self) -> Result<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .trim()
            .to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                Op::Equal
            }
            Some(c @ ('~' | '<' | '>')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '~' => Op::Approx,
                    '<' => Op::LessEq,
                    _ => Op::GreaterEq,
                }
            }
            _ => return Err(self.error("missing operator")),
        };

        // Unescaped '*' splits the value into substring parts.
        let mut parts = vec![String::new()];
        loop {
            match self.peek() {
                None => return Err(self.error("unexpected end of filter")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '('")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    if let Some(last) = parts.last_mut() {
                        last.push(escaped);
                    }
                    self.pos += 1;
                }
                Some('*') if op == Op::Equal => {
                    parts.push(String::new());
                    self.pos += 1;
                }
                Some(c) => {
                    if let Some(last) = parts.last_mut() {
                        last.push(c);
                    }
                    self.pos += 1;
                }
            }
        }

        Ok(match parts.len() {
            1 => Filter::Compare {
                attr,
                op,
                value: parts.remove(0),
            },
            2 if parts.iter().all(String::is_empty) => Filter::Present(attr),
            _ => Filter::Substring { attr, parts },
        })
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(items) | Filter::Or(items) => {
                let sign = if matches!(self, Filter::And(_)) { '&' } else { '|' };
                write!(f, "({}", sign)?;
                for item in items {
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Filter::Not(inner) => write!(f, "(!{})", inner),
            Filter::Compare { attr, op, value } => {
                write!(f, "({}{}{})", attr, op.as_str(), escape(value))
            }
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::Substring { attr, parts } => {
                let joined: Vec<String> = parts.iter().map(|p| escape(p)).collect();
                write!(f, "({}={})", attr, joined.join("*"))
            }
        }
    }
}
