//! LDAP-style filter expressions (RFC 1960).
//!
//! Repositories use these in two places: artifact mapping rules
//! (`(& (classifier=osgi.bundle))`) and platform filters on units and
//! requirements (`(&(osgi.os=linux)(osgi.ws=gtk))`).

use std::cmp::Ordering;
use std::fmt;

use thiserror::Error;

use crate::core::version::Version;

/// Error parsing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid filter `{input}` at offset {offset}: {reason}")]
pub struct FilterError {
    pub input: String,
    pub offset: usize,
    pub reason: String,
}

/// Comparison operator of a simple filter item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equal,
    Approx,
    GreaterEq,
    LessEq,
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Present(String),
    /// Substring match; `None` pieces stand for `*`.
    Substring(String, Vec<Option<String>>),
    Compare(String, Op, String),
}

impl Filter {
    /// Parse a filter string.
    pub fn parse(input: &str) -> Result<Filter, FilterError> {
        let mut parser = FilterParser {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        };
        parser.skip_ws();
        let filter = parser.filter()?;
        parser.skip_ws();
        if parser.pos < parser.chars.len() {
            return Err(parser.error("trailing characters after filter"));
        }
        Ok(filter)
    }

    /// Evaluate against a property lookup. Attribute names are compared
    /// case-insensitively by the lookup's caller contract: `lookup` receives
    /// the lowercased attribute name.
    pub fn matches<'a, F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        match self {
            Filter::And(items) => items.iter().all(|f| f.matches(lookup)),
            Filter::Or(items) => items.iter().any(|f| f.matches(lookup)),
            Filter::Not(inner) => !inner.matches(lookup),
            Filter::Present(attr) => lookup(attr).is_some(),
            Filter::Substring(attr, pieces) => match lookup(attr) {
                Some(value) => substring_match(value, pieces),
                None => false,
            },
            Filter::Compare(attr, op, expected) => match lookup(attr) {
                Some(actual) => compare(actual, *op, expected),
                None => false,
            },
        }
    }

    /// Evaluate against a list of `(name, value)` pairs.
    pub fn matches_pairs<K, V>(&self, pairs: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.matches(&|attr: &str| {
            pairs
                .iter()
                .find(|(k, _)| k.as_ref().eq_ignore_ascii_case(attr))
                .map(|(_, v)| v.as_ref())
        })
    }
}

fn compare(actual: &str, op: Op, expected: &str) -> bool {
    match op {
        Op::Equal => actual == expected,
        Op::Approx => {
            let strip = |s: &str| -> String {
                s.chars()
                    .filter(|c| !c.is_whitespace())
                    .flat_map(char::to_lowercase)
                    .collect()
            };
            strip(actual) == strip(expected)
        }
        Op::GreaterEq | Op::LessEq => {
            let ordering = match (Version::parse(actual), Version::parse(expected)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => actual.cmp(expected),
            };
            match op {
                Op::GreaterEq => ordering != Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

fn substring_match(value: &str, pieces: &[Option<String>]) -> bool {
    let mut rest = value;
    let mut anchored = true;

    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            None => anchored = false,
            Some(text) => {
                let is_last = i == pieces.len() - 1;
                if anchored {
                    if !rest.starts_with(text.as_str()) {
                        return false;
                    }
                    rest = &rest[text.len()..];
                } else if is_last {
                    return rest.ends_with(text.as_str());
                } else {
                    match rest.find(text.as_str()) {
                        Some(idx) => rest = &rest[idx + text.len()..],
                        None => return false,
                    }
                }
                anchored = true;
            }
        }
    }

    // A trailing `*` accepts any remainder.
    !anchored || rest.is_empty() || matches!(pieces.last(), Some(None))
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(items) | Filter::Or(items) => {
                let op = if matches!(self, Filter::And(_)) { '&' } else { '|' };
                write!(f, "({}", op)?;
                for item in items {
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Filter::Not(inner) => write!(f, "(!{})", inner),
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::Substring(attr, pieces) => {
                write!(f, "({}=", attr)?;
                for piece in pieces {
                    match piece {
                        Some(text) => write!(f, "{}", escape(text))?,
                        None => write!(f, "*")?,
                    }
                }
                write!(f, ")")
            }
            Filter::Compare(attr, op, value) => {
                let op = match op {
                    Op::Equal => "=",
                    Op::Approx => "~=",
                    Op::GreaterEq => ">=",
                    Op::LessEq => "<=",
                };
                write!(f, "({}{}{})", attr, op, escape(value))
            }
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

struct FilterParser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl FilterParser<'_> {
    fn error(&self, reason: &str) -> FilterError {
        let offset = self
            .chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len());
        FilterError {
            input: self.input.to_string(),
            offset,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), FilterError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", expected)))
        }
    }

    fn filter(&mut self) -> Result<Filter, FilterError> {
        self.expect('(')?;
        self.skip_ws();

        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_ws();
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };

        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, FilterError> {
        let mut items = Vec::new();
        self.skip_ws();
        while self.peek() == Some('(') {
            items.push(self.filter()?);
            self.skip_ws();
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn item(&mut self) -> Result<Filter, FilterError> {
        let mut attr = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '~' | '<' | '>' | '(' | ')') {
                break;
            }
            attr.push(c);
            self.pos += 1;
        }
        let attr = attr.trim().to_ascii_lowercase();
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
            _ => return Err(self.error("expected comparison operator")),
        };

        let pieces = self.value()?;

        if op != Op::Equal {
            let value = pieces
                .into_iter()
                .map(|p| p.unwrap_or_else(|| "*".to_string()))
                .collect();
            return Ok(Filter::Compare(attr, op, value));
        }

        match pieces.as_slice() {
            [None] => Ok(Filter::Present(attr)),
            [Some(text)] => Ok(Filter::Compare(attr, Op::Equal, text.clone())),
            [] => Ok(Filter::Compare(attr, Op::Equal, String::new())),
            _ => Ok(Filter::Substring(attr, pieces)),
        }
    }

    /// Read a value up to the closing paren, splitting on unescaped `*`.
    fn value(&mut self) -> Result<Vec<Option<String>>, FilterError> {
        let mut pieces = Vec::new();
        let mut current = String::new();

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped `(` in value")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            current.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some('*') => {
                    self.pos += 1;
                    if !current.is_empty() {
                        pieces.push(Some(std::mem::take(&mut current)));
                    }
                    pieces.push(None);
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }

        if !current.is_empty() {
            pieces.push(Some(current));
        }
        Ok(pieces)
    }
}
