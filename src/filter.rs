//! Dashboard filter state and fingerprints.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use validator::{Validate, ValidationError};

use crate::models::{Level, QueryParams};
use crate::patterns::{Favorite, OndSelection};

/// Current query parameters of a dashboard.
///
/// Each analysis reads the subset of fields it depends on.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct FilterState {
    /// Market code
    pub market: String,
    /// Comma separated O&D patterns
    pub onds: String,
    /// Traffic origin
    pub origin: String,
    /// Traffic destination
    pub destination: String,
    /// Traffic level of detail
    pub level: Level,
    /// Traffic reference month
    pub month: String,
    /// Token forwarded to the traffic repository
    pub auth_token: String,
    /// First month of a variation comparison
    pub first_month: String,
    /// Second month of a variation comparison
    pub second_month: String,
    /// Histogram period
    pub period: Option<String>,
    /// Chart title. Cosmetic only.
    pub title: String,
}

/// Canonical form of the parameters an analysis sends to the repository.
///
/// Two equal fingerprints mean a second fetch would return the same data.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct FilterFingerprint {
    analysis: &'static str,
    params: Vec<(&'static str, String)>,
}

impl FilterFingerprint {
    /// Return a new FilterFingerprint for the query of an analysis.
    pub fn new<Q: QueryParams>(analysis: &'static str, query: &Q) -> Self {
        FilterFingerprint {
            analysis,
            params: query.params(),
        }
    }

    /// Name of the analysis
    pub fn analysis(&self) -> &'static str {
        self.analysis
    }

    /// Hex md5 digest of the fingerprint.
    ///
    /// Safe to log: parameter values such as auth tokens do not appear in it.
    pub fn digest(&self) -> String {
        let mut canonical = self.analysis.to_string();
        for (name, value) in &self.params {
            canonical.push('&');
            canonical.push_str(name);
            canonical.push('=');
            canonical.push_str(value);
        }
        format!("{:x}", md5::compute(canonical.as_bytes()))
    }
}

impl fmt::Debug for FilterFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.analysis, self.digest())
    }
}

/// A partial change to a dashboard filter.
///
/// Absent fields are left unchanged.
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FilterUpdate {
    /// Market code
    pub market: Option<String>,
    /// Markets available to the analyst
    pub markets: Option<Vec<String>>,
    /// Saved O&D favorites
    #[validate]
    pub favorites: Option<Vec<Favorite>>,
    /// How the O&D patterns are chosen
    pub ond_selection: Option<OndSelection>,
    #[validate(length(max = 3, message = "origin must be at most 3 characters"))]
    pub origin: Option<String>,
    #[validate(length(max = 3, message = "destination must be at most 3 characters"))]
    pub destination: Option<String>,
    pub level: Option<Level>,
    #[validate(custom = "validate_month")]
    pub month: Option<String>,
    pub auth_token: Option<String>,
    #[validate(custom = "validate_month")]
    pub first_month: Option<String>,
    #[validate(custom = "validate_month")]
    pub second_month: Option<String>,
    /// Histogram period; empty clears it
    pub period: Option<String>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
}

impl FilterUpdate {
    /// Apply the scalar fields of this update to a filter.
    ///
    /// The O&D patterns are not touched; they are resolved from the O&D selection.
    pub fn apply(&self, filter: &mut FilterState) {
        fn set(target: &mut String, value: &Option<String>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }
        set(&mut filter.market, &self.market);
        set(&mut filter.origin, &self.origin);
        set(&mut filter.destination, &self.destination);
        set(&mut filter.month, &self.month);
        set(&mut filter.auth_token, &self.auth_token);
        set(&mut filter.first_month, &self.first_month);
        set(&mut filter.second_month, &self.second_month);
        set(&mut filter.title, &self.title);
        if let Some(level) = self.level {
            filter.level = level;
        }
        if let Some(period) = &self.period {
            filter.period = Some(period.clone()).filter(|period| !period.is_empty());
        }
    }
}

/// Validate a `YYYY-MM` month. An empty month is accepted and means "unset".
fn validate_month(month: &str) -> Result<(), ValidationError> {
    if month.is_empty() {
        return Ok(());
    }
    let format = format_description!("[year]-[month]-[day]");
    match time::Date::parse(&format!("{month}-01"), &format) {
        Ok(_) if month.len() == 7 => Ok(()),
        _ => {
            let mut error = ValidationError::new("invalid_month");
            error.message = Some("month must have the form YYYY-MM".into());
            error.add_param("month".into(), &month);
            Err(error)
        }
    }
}
