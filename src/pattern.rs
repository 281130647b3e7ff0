//! Market and origin-destination (O&D) pattern validation.
//!
//! An O&D pattern has the form `ORIGIN-DESTINATION`, where each side is either a 3-character
//! city/airport code or the `*` wildcard. Several patterns may be given as a comma separated
//! list, e.g. `PAR-*,LON-NYC`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::InsightsError;

/// Wildcard matching any location.
pub const WILDCARD: &str = "*";

/// A directed origin-destination pair.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, Validate)]
pub struct OdPattern {
    /// Origin code or wildcard
    #[validate(custom = "validate_location")]
    pub origin: String,
    /// Destination code or wildcard
    #[validate(custom = "validate_location")]
    pub destination: String,
}

impl OdPattern {
    /// Return a new OdPattern object.
    pub fn new(origin: &str, destination: &str) -> Self {
        OdPattern {
            origin: origin.to_string(),
            destination: destination.to_string(),
        }
    }
}

impl fmt::Display for OdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

impl FromStr for OdPattern {
    type Err = InsightsError;

    /// Parse and validate a single `ORIGIN-DESTINATION` pattern.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let pattern = split_pattern(text)?;
        pattern.validate()?;
        Ok(pattern)
    }
}

/// Split a pattern into its two sides without checking them.
fn split_pattern(text: &str) -> Result<OdPattern, ValidationError> {
    let tokens: Vec<&str> = text.split('-').collect();
    match tokens[..] {
        [origin, destination] => Ok(OdPattern::new(origin, destination)),
        _ => {
            let mut error = ValidationError::new("invalid_pattern");
            error.message = Some(Cow::from(
                "O&D pattern must have the form ORIGIN-DESTINATION",
            ));
            error.add_param("pattern".into(), &text);
            Err(error)
        }
    }
}

/// Validate one side of an O&D pattern
fn validate_location(location: &str) -> Result<(), ValidationError> {
    if location == WILDCARD || location.chars().count() == 3 {
        return Ok(());
    }
    let mut error = ValidationError::new("invalid_location");
    error.message = Some(Cow::from("location must be a 3-letter code or *"));
    error.add_param("location".into(), &location);
    Err(error)
}

/// A market together with the O&D patterns searched from it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Validate)]
pub struct MarketFilter {
    /// Market code
    #[validate(length(min = 1, message = "market must not be empty"))]
    pub market: String,
    /// O&D patterns, in the order given
    #[validate]
    #[validate(length(min = 1, message = "at least one O&D pattern is required"))]
    pub ond_patterns: Vec<OdPattern>,
}

impl MarketFilter {
    /// Parse a market and a comma separated list of O&D patterns.
    ///
    /// Every problem found is reported, not only the first one.
    ///
    /// # Arguments
    ///
    /// * `market`: Market code
    /// * `onds`: Comma separated O&D patterns, e.g. `PAR-*,LON-NYC`
    pub fn parse(market: &str, onds: &str) -> Result<Self, InsightsError> {
        let mut ond_patterns = Vec::new();
        let mut structural = Vec::new();
        if !onds.is_empty() {
            for text in onds.split(',') {
                match split_pattern(text) {
                    Ok(pattern) => ond_patterns.push(pattern),
                    Err(error) => structural.push(error),
                }
            }
        }
        let filter = MarketFilter {
            market: market.to_string(),
            ond_patterns,
        };
        let mut errors = match filter.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };
        for error in structural {
            errors.add("onds", error);
        }
        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(InsightsError::InvalidFilter(errors))
        }
    }
}

/// Returns whether the market and O&D patterns form a valid filter.
///
/// # Arguments
///
/// * `market`: Market code, must not be empty
/// * `onds`: Comma separated O&D patterns
pub fn validate(market: &str, onds: &str) -> bool {
    MarketFilter::parse(market, onds).is_ok()
}

/// Returns the reasons why a filter is not valid, or nothing when it is.
pub fn explain(market: &str, onds: &str) -> Vec<String> {
    match MarketFilter::parse(market, onds) {
        Ok(_) => vec![],
        Err(InsightsError::InvalidFilter(errors)) => {
            let mut reasons = Vec::new();
            collect_reasons("", &errors, &mut reasons);
            reasons.sort();
            reasons
        }
        Err(error) => vec![error.to_string()],
    }
}

/// Flatten nested validation errors into `path: message` strings.
fn collect_reasons(prefix: &str, errors: &ValidationErrors, reasons: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .clone()
                        .unwrap_or_else(|| error.code.clone());
                    reasons.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_reasons(&path, nested, reasons),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_reasons(&format!("{path}[{index}]"), nested, reasons);
                }
            }
        }
    }
}
