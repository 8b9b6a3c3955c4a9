//! File filter expressions.
//!
//! An expression is a list of terms joined by `|` (or) and `&` (and, binds
//! tighter). A term is a keyword (`all`, `wanted`, `complete`), a
//! comparison such as `size>10M` or `priority=high`, or a bare word that
//! matches file names. A leading `!` negates a term.

use std::{cmp::Ordering, fmt};

use thiserror::Error;

use crate::model::{Priority, TorrentFile};

/// Decides whether a file is shown.
pub trait FileFilter {
    fn matches(&self, file: &TorrentFile) -> bool;
}

impl<F> FileFilter for F
where
    F: Fn(&TorrentFile) -> bool,
{
    fn matches(&self, file: &TorrentFile) -> bool {
        self(file)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("empty filter expression")]
    Empty,
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),
    #[error("invalid value for {filter}: '{value}'")]
    InvalidValue { filter: String, value: String },
    #[error("operator '{operator}' is not supported by {filter}")]
    InvalidOperator { filter: String, operator: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    source: String,
    any_of: Vec<Vec<Term>>,
}

impl FilterExpr {
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(FilterError::Empty);
        }
        let mut any_of = Vec::new();
        for group in trimmed.split('|') {
            let mut all_of = Vec::new();
            for raw in group.split('&') {
                let raw = raw.trim();
                if raw.is_empty() {
                    return Err(FilterError::Empty);
                }
                all_of.push(Term::parse(raw)?);
            }
            any_of.push(all_of);
        }
        Ok(Self {
            source: trimmed.to_string(),
            any_of,
        })
    }

    /// `None` for expressions that match every file.
    pub fn parse_optional(source: Option<&str>) -> Result<Option<Self>, FilterError> {
        match source.map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => {
                let expr = Self::parse(text)?;
                Ok(if expr.is_all() { None } else { Some(expr) })
            }
        }
    }

    pub fn is_all(&self) -> bool {
        self.any_of
            .iter()
            .any(|group| group.iter().all(|term| !term.negate && term.test == Test::All))
    }
}

impl FileFilter for FilterExpr {
    fn matches(&self, file: &TorrentFile) -> bool {
        self.any_of
            .iter()
            .any(|group| group.iter().all(|term| term.matches(file)))
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Term {
    negate: bool,
    test: Test,
}

#[derive(Debug, Clone, PartialEq)]
enum Test {
    All,
    Wanted,
    Complete,
    Name(TextOp, String),
    Path(TextOp, String),
    Size(Cmp, u64),
    Downloaded(Cmp, u64),
    Progress(Cmp, f64),
    Priority(Cmp, Priority),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextOp {
    Equals,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            Cmp::Eq => ordering == Ordering::Equal,
            Cmp::Lt => ordering == Ordering::Less,
            Cmp::Le => ordering != Ordering::Greater,
            Cmp::Gt => ordering == Ordering::Greater,
            Cmp::Ge => ordering != Ordering::Less,
        }
    }
}

impl Term {
    fn parse(raw: &str) -> Result<Self, FilterError> {
        let (mut negate, body) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, raw),
        };
        let Some((name, operator, value)) = split_operator(body) else {
            let test = match body.to_ascii_lowercase().as_str() {
                "all" | "*" => Test::All,
                "wanted" => Test::Wanted,
                "complete" => Test::Complete,
                _ => Test::Name(TextOp::Contains, body.to_lowercase()),
            };
            return Ok(Self { negate, test });
        };

        let filter = name.trim().to_ascii_lowercase();
        let value = value.trim();
        let operator = if operator == "!=" {
            negate = !negate;
            "="
        } else {
            operator
        };
        let invalid_value = || FilterError::InvalidValue {
            filter: filter.clone(),
            value: value.to_string(),
        };
        let invalid_operator = || FilterError::InvalidOperator {
            filter: filter.clone(),
            operator: operator.to_string(),
        };

        let test = match filter.as_str() {
            "name" | "n" => Test::Name(text_op(operator).ok_or_else(invalid_operator)?, fold(operator, value)),
            "path" => Test::Path(text_op(operator).ok_or_else(invalid_operator)?, fold(operator, value)),
            "size" => Test::Size(
                cmp_op(operator).ok_or_else(invalid_operator)?,
                parse_size(value).ok_or_else(invalid_value)?,
            ),
            "downloaded" => Test::Downloaded(
                cmp_op(operator).ok_or_else(invalid_operator)?,
                parse_size(value).ok_or_else(invalid_value)?,
            ),
            "progress" | "%downloaded" | "%" => Test::Progress(
                cmp_op(operator).ok_or_else(invalid_operator)?,
                parse_percent(value).ok_or_else(invalid_value)?,
            ),
            "priority" | "prio" => Test::Priority(
                cmp_op(operator).ok_or_else(invalid_operator)?,
                value.parse().map_err(|_| invalid_value())?,
            ),
            "all" | "wanted" | "complete" => return Err(invalid_operator()),
            _ => return Err(FilterError::UnknownFilter(name.trim().to_string())),
        };
        Ok(Self { negate, test })
    }

    fn matches(&self, file: &TorrentFile) -> bool {
        let hit = match &self.test {
            Test::All => true,
            Test::Wanted => file.is_wanted(),
            Test::Complete => file.is_complete(),
            Test::Name(op, needle) => text_matches(*op, &file.name, needle),
            Test::Path(op, needle) => text_matches(*op, &file.full_path(), needle),
            Test::Size(cmp, limit) => cmp.holds(file.size.cmp(limit)),
            Test::Downloaded(cmp, limit) => cmp.holds(file.downloaded.cmp(limit)),
            Test::Progress(cmp, limit) => {
                let percent = file.progress() * 100.0;
                percent
                    .partial_cmp(limit)
                    .is_some_and(|ordering| cmp.holds(ordering))
            }
            Test::Priority(cmp, level) => cmp.holds(file.priority.cmp(level)),
        };
        hit != self.negate
    }
}

const OPERATORS: [&str; 7] = ["!=", "<=", ">=", "=", "~", "<", ">"];

fn split_operator(body: &str) -> Option<(&str, &str, &str)> {
    for (idx, _) in body.char_indices() {
        let rest = &body[idx..];
        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            if idx == 0 {
                return None;
            }
            return Some((&body[..idx], op, &rest[op.len()..]));
        }
    }
    None
}

fn text_op(operator: &str) -> Option<TextOp> {
    match operator {
        "=" => Some(TextOp::Equals),
        "~" => Some(TextOp::Contains),
        _ => None,
    }
}

fn cmp_op(operator: &str) -> Option<Cmp> {
    match operator {
        "=" => Some(Cmp::Eq),
        "<" => Some(Cmp::Lt),
        "<=" => Some(Cmp::Le),
        ">" => Some(Cmp::Gt),
        ">=" => Some(Cmp::Ge),
        _ => None,
    }
}

// `~` is case-insensitive, `=` is exact.
fn fold(operator: &str, value: &str) -> String {
    if operator == "~" {
        value.to_lowercase()
    } else {
        value.to_string()
    }
}

fn text_matches(op: TextOp, haystack: &str, needle: &str) -> bool {
    match op {
        TextOp::Equals => haystack == needle,
        TextOp::Contains => haystack.to_lowercase().contains(needle),
    }
}

/// Accepts plain byte counts and binary multiples: `2048`, `10k`, `1.5GiB`, `700MB`.
fn parse_size(value: &str) -> Option<u64> {
    let lower = value.trim().to_ascii_lowercase();
    let mut digits = lower.as_str();
    digits = digits.strip_suffix('b').unwrap_or(digits);
    digits = digits.strip_suffix('i').unwrap_or(digits);
    let (number, exponent) = match digits.chars().last()? {
        'k' => (&digits[..digits.len() - 1], 1),
        'm' => (&digits[..digits.len() - 1], 2),
        'g' => (&digits[..digits.len() - 1], 3),
        't' => (&digits[..digits.len() - 1], 4),
        _ => (digits, 0),
    };
    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some((number * 1024f64.powi(exponent)).round() as u64)
}

fn parse_percent(value: &str) -> Option<f64> {
    let number: f64 = value.trim().trim_end_matches('%').trim().parse().ok()?;
    (number.is_finite() && (0.0..=100.0).contains(&number)).then_some(number)
}
