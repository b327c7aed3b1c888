use std::{borrow::Cow, sync::OnceLock};

use regex::Regex;

use crate::VariableValue;

/// Comparison encoded by a segment operand string such as `lower(chrome)` or `wildcard(*pro*)`.
#[derive(Debug, Clone)]
pub enum Operand {
    Equals(String),
    Lower(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    /// `None` if the pattern failed to compile.
    Regex(String, Option<Regex>),
    GreaterThan(String),
    GreaterThanOrEqual(String),
    LessThan(String),
    LessThanOrEqual(String),
}

fn grouping_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)^(\w+)\((.*)\)$").expect("grouping pattern is valid"))
}

impl Operand {
    /// Parse an operand string. Strings that are not of the `type(value)` form, or whose type is
    /// unknown, compare for equality with the whole string.
    pub fn parse(operand: &str) -> Operand {
        let Some(captures) = grouping_pattern().captures(operand) else {
            return Operand::Equals(operand.to_owned());
        };
        let value = captures[2].to_owned();
        match &captures[1] {
            "lower" => Operand::Lower(value),
            "wildcard" => Operand::parse_wildcard(value),
            "regex" => {
                let regex = Regex::new(&value).ok();
                if regex.is_none() {
                    log::warn!(target: "vwo",
                               pattern:display = value;
                               "segment regex does not compile, leaf never matches");
                }
                Operand::Regex(value, regex)
            }
            "gt" => Operand::GreaterThan(value),
            "gte" => Operand::GreaterThanOrEqual(value),
            "lt" => Operand::LessThan(value),
            "lte" => Operand::LessThanOrEqual(value),
            _ => Operand::Equals(operand.to_owned()),
        }
    }

    fn parse_wildcard(value: String) -> Operand {
        let leading = value.starts_with('*');
        let trailing = value.len() > 1 && value.ends_with('*');
        let start = usize::from(leading);
        let end = value.len() - usize::from(trailing);
        let inner = value.get(start..end.max(start)).unwrap_or_default().to_owned();
        match (leading, trailing) {
            (true, true) => Operand::Contains(inner),
            (true, false) => Operand::EndsWith(inner),
            (false, true) => Operand::StartsWith(inner),
            (false, false) => Operand::Equals(inner),
        }
    }

    /// Apply the operand to a variable value. Missing, null and empty values never match.
    pub fn eval(&self, candidate: Option<&VariableValue>) -> bool {
        let Some(candidate) = candidate.and_then(VariableValue::to_segment_string) else {
            return false;
        };
        if candidate.is_empty() {
            return false;
        }

        match self {
            Operand::Equals(expected) => {
                let (expected, candidate) = normalize(expected, &candidate);
                expected == candidate
            }
            Operand::Lower(expected) => {
                let (expected, candidate) = normalize(expected, &candidate);
                expected.to_lowercase() == candidate.to_lowercase()
            }
            Operand::Contains(expected) => {
                let (expected, candidate) = normalize(expected, &candidate);
                candidate.contains(expected.as_ref())
            }
            Operand::StartsWith(expected) => {
                let (expected, candidate) = normalize(expected, &candidate);
                candidate.starts_with(expected.as_ref())
            }
            Operand::EndsWith(expected) => {
                let (expected, candidate) = normalize(expected, &candidate);
                candidate.ends_with(expected.as_ref())
            }
            Operand::Regex(pattern, regex) => {
                let Some(regex) = regex else {
                    return false;
                };
                let (_, candidate) = normalize(pattern, &candidate);
                regex.is_match(&candidate)
            }
            Operand::GreaterThan(expected) => {
                compare(expected, &candidate).is_some_and(|(expected, candidate)| candidate > expected)
            }
            Operand::GreaterThanOrEqual(expected) => {
                compare(expected, &candidate).is_some_and(|(expected, candidate)| candidate >= expected)
            }
            Operand::LessThan(expected) => {
                compare(expected, &candidate).is_some_and(|(expected, candidate)| candidate < expected)
            }
            Operand::LessThanOrEqual(expected) => {
                compare(expected, &candidate).is_some_and(|(expected, candidate)| candidate <= expected)
            }
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// If both sides are numbers, rewrite them in canonical form so that `123`, `123.0` and
/// `"123.000"` compare equal. Otherwise return them unchanged.
fn normalize<'a>(operand: &'a str, candidate: &'a str) -> (Cow<'a, str>, Cow<'a, str>) {
    match (parse_number(operand), parse_number(candidate)) {
        (Some(operand), Some(candidate)) => (
            Cow::Owned(operand.to_string()),
            Cow::Owned(candidate.to_string()),
        ),
        _ => (Cow::Borrowed(operand), Cow::Borrowed(candidate)),
    }
}

fn compare(operand: &str, candidate: &str) -> Option<(f64, f64)> {
    Some((parse_number(operand)?, parse_number(candidate)?))
}
