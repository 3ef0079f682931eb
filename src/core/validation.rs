//! Form validation shared by every mutator.
//!
//! Each mutator declares its rules as a table of [`Rule`]s (field, check,
//! message) and runs it with [`validate`] before touching the store. The first
//! failing rule wins, so tables are ordered the way the form reads.

use crate::errors::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// String-typed input as it arrives from a form.
pub trait Form {
    /// Raw value of `field`, `None` when the form has no such field.
    fn field(&self, name: &str) -> Option<&str>;
}

/// Predicate applied to one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Non-empty after trimming
    Required,
    /// Parses with [`parse_amount`] to a finite number
    Number,
    /// Like [`Check::Number`] and strictly positive
    PositiveNumber,
    /// Empty, or parses like [`Check::Number`]
    OptionalNumber,
    /// Parses with [`parse_date`]
    Date,
    /// Parses with [`parse_timestamp`]
    Timestamp,
    /// Contains an `@` with text on both sides
    Email,
}

impl Check {
    fn passes(self, raw: &str) -> bool {
        match self {
            Self::Required => !raw.trim().is_empty(),
            Self::Number => parse_amount(raw).is_some(),
            Self::PositiveNumber => parse_amount(raw).is_some_and(|n| n > 0.0),
            Self::OptionalNumber => raw.trim().is_empty() || parse_amount(raw).is_some(),
            Self::Date => parse_date(raw).is_some(),
            Self::Timestamp => parse_timestamp(raw).is_some(),
            Self::Email => raw
                .trim()
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && !domain.is_empty()),
        }
    }
}

/// One row of a validation table.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Field name passed to [`Form::field`]
    pub field: &'static str,
    /// Predicate
    pub check: Check,
    /// Message reported when the predicate fails
    pub message: &'static str,
}

impl Rule {
    /// Builds a rule.
    #[must_use]
    pub const fn new(field: &'static str, check: Check, message: &'static str) -> Self {
        Self {
            field,
            check,
            message,
        }
    }
}

/// Runs `rules` against `form` in order.
///
/// # Errors
/// Returns [`Error::Validation`] for the first rule that fails. A field the
/// form does not have is treated as empty.
pub fn validate(form: &impl Form, rules: &[Rule]) -> Result<()> {
    for rule in rules {
        let raw = form.field(rule.field).unwrap_or_default();
        if !rule.check.passes(raw) {
            tracing::debug!(field = rule.field, "Validation failed: {}", rule.message);
            return Err(Error::validation(rule.field, rule.message));
        }
    }
    Ok(())
}

/// Permissive numeric coercion for money-like input.
///
/// Accepts surrounding whitespace, one leading `+` or `$`, and `,` thousands
/// separators. Empty, non-numeric and non-finite input yields `None`.
#[must_use]
pub fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let unsigned = trimmed
        .strip_prefix('+')
        .or_else(|| trimmed.strip_prefix('$'))
        .unwrap_or(trimmed);
    let cleaned: String = unsigned.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a calendar date as `YYYY-MM-DD` or `MM/DD/YYYY`.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .ok()
}

/// Parses an RFC 3339 time.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
