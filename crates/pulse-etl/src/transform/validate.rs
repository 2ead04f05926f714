//! Record validation and cleaning
//!
//! A schema is an ordered list of field rules; validation always collects
//! every violation rather than stopping at the first, so a single transform
//! log row can carry the complete picture for a rejected record.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;

/// One validation rule applied to a single field.
///
/// All rules except [`Rule::Required`] treat a missing or null value as
/// valid; presence is checked separately so optional fields stay optional.
pub enum Rule {
    Required,
    DateFormat {
        format: &'static str,
    },
    NumericRange {
        min: Option<f64>,
        max: Option<f64>,
    },
    StringLength {
        min: usize,
        max: Option<usize>,
    },
    Pattern {
        regex: Regex,
        description: &'static str,
    },
    Custom {
        predicate: fn(&Value) -> bool,
        message: &'static str,
    },
}

impl Rule {
    pub fn validate(&self, value: Option<&Value>) -> bool {
        match self {
            Rule::Required => match value {
                None | Some(Value::Null) => false,
                Some(Value::String(s)) => !s.trim().is_empty(),
                Some(_) => true,
            },
            Rule::DateFormat { format } => match value {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) if s.is_empty() => true,
                Some(Value::String(s)) => parse_with_format(s, format),
                Some(_) => false,
            },
            Rule::NumericRange { min, max } => {
                let Some(value) = present(value) else {
                    return true;
                };
                let Some(num) = as_number(value) else {
                    return false;
                };
                min.is_none_or(|lo| num >= lo) && max.is_none_or(|hi| num <= hi)
            },
            Rule::StringLength { min, max } => {
                let Some(value) = present(value) else {
                    return true;
                };
                let Some(s) = value.as_str() else {
                    return false;
                };
                s.len() >= *min && max.is_none_or(|hi| s.len() <= hi)
            },
            Rule::Pattern { regex, .. } => {
                let Some(value) = present(value) else {
                    return true;
                };
                value.as_str().is_some_and(|s| regex.is_match(s))
            },
            Rule::Custom { predicate, .. } => {
                predicate(value.unwrap_or(&Value::Null))
            },
        }
    }

    pub fn error_message(&self, field: &str) -> String {
        match self {
            Rule::Required => {
                format!("Field '{}' is required but was empty or missing", field)
            },
            Rule::DateFormat { format } => {
                format!("Field '{}' must be a valid date in format {}", field, format)
            },
            Rule::NumericRange { min, max } => match (min, max) {
                (Some(lo), Some(hi)) => format!(
                    "Field '{}' must be between {} and {}",
                    field,
                    fmt_bound(*lo),
                    fmt_bound(*hi)
                ),
                (Some(lo), None) => format!(
                    "Field '{}' must be greater than or equal to {}",
                    field,
                    fmt_bound(*lo)
                ),
                (None, Some(hi)) => format!(
                    "Field '{}' must be less than or equal to {}",
                    field,
                    fmt_bound(*hi)
                ),
                (None, None) => format!("Field '{}' must be a valid number", field),
            },
            Rule::StringLength { min, max } => match max {
                Some(hi) => format!(
                    "Field '{}' must be between {} and {} characters",
                    field, min, hi
                ),
                None => format!("Field '{}' must be at least {} characters", field, min),
            },
            Rule::Pattern { description, .. } => {
                format!("Field '{}' must match {}", field, description)
            },
            Rule::Custom { message, .. } => message.replace("{field}", field),
        }
    }
}

/// Ordered field rules for one record shape
pub struct Schema {
    fields: Vec<(&'static str, Vec<Rule>)>,
}

impl Schema {
    pub fn new(fields: Vec<(&'static str, Vec<Rule>)>) -> Self {
        Self { fields }
    }

    /// Collect every violation in declaration order
    pub fn validate(&self, record: &Value) -> Vec<String> {
        let mut violations = Vec::new();

        for (field, rules) in &self.fields {
            let value = record.get(field);
            for rule in rules {
                if !rule.validate(value) {
                    violations.push(rule.error_message(field));
                }
            }
        }

        violations
    }

    pub fn is_valid(&self, record: &Value) -> bool {
        self.validate(record).is_empty()
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn parse_with_format(value: &str, format: &str) -> bool {
    if format.contains("%H") {
        NaiveDateTime::parse_from_str(value, format).is_ok()
    } else {
        NaiveDate::parse_from_str(value, format).is_ok()
    }
}

/// Range bounds are declared as whole numbers; render them without a
/// trailing fraction
fn fmt_bound(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

const DATE_INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%y",
];

/// Parse a date in any accepted input format and render it as `%Y-%m-%d`
pub fn normalize_date(value: &str) -> Option<String> {
    for format in DATE_INPUT_FORMATS {
        let parsed = if format.contains("%H") {
            NaiveDateTime::parse_from_str(value, format)
                .map(|dt| dt.date())
                .ok()
        } else {
            NaiveDate::parse_from_str(value, format).ok()
        };
        if let Some(date) = parsed {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    None
}

/// Parse a numeric value, tolerating currency symbols and thousands
/// separators in string input
pub fn normalize_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.replace(['$', ','], "").trim().parse().ok(),
        _ => None,
    }
}

/// Trim and collapse internal whitespace
pub fn clean_string(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
