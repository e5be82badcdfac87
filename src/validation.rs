//! Parameter validation.
//!
//! The field validators run while a descriptor is built and never touch the
//! network. [`EndpointValidator`] is the optional pre-flight check against the
//! portal's endpoint metadata; it degrades to warnings when metadata is
//! missing instead of failing the request.

use crate::constants::{
    COLLEGE_SOURCES, DISTRICT_SOURCES, MAIN_FILTERS, MIN_YEAR, SCHOOL_SOURCES, VALID_STATISTICS,
    state_name,
};
use crate::error::{Error, Result};
use crate::models::{EndpointDescriptor, EndpointInfo, Level, Scalar};
use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;

static SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_.-]*$").expect("segment pattern"));

/// Case-fold a path segment and check that it can be placed in a URL path.
pub fn validate_segment(field: &str, value: &str, min_len: usize) -> Result<String> {
    let folded = value.trim().to_lowercase();
    if folded.chars().count() < min_len {
        return Err(Error::validation(format!(
            "invalid {}: '{}'. Must be at least {} characters",
            field, folded, min_len
        )));
    }
    if !SEGMENT.is_match(&folded) {
        return Err(Error::validation(format!(
            "invalid {}: '{}'. Only letters, digits, '-', '_' and '.' are allowed",
            field, folded
        )));
    }
    Ok(folded)
}

pub fn validate_level(level: &str) -> Result<Level> {
    level.parse()
}

/// Sources are not checked against a fixed list; new ones appear over time.
pub fn validate_source(source: &str) -> Result<String> {
    validate_segment("source", source, 2)
}

/// Normalize a statistic name (`mean` becomes `avg`).
pub fn validate_statistic(stat: &str) -> Result<String> {
    let mut stat = stat.trim().to_lowercase();
    if stat == "mean" {
        stat = "avg".into();
    }
    if !VALID_STATISTICS.contains(&stat.as_str()) {
        return Err(Error::validation(format!(
            "invalid statistic: '{}'. Must be one of: {}",
            stat,
            VALID_STATISTICS.join(", ")
        )));
    }
    Ok(stat)
}

/// Years run from 1980 through next calendar year.
pub fn validate_year(year: &Scalar) -> Result<i64> {
    let y = scalar_to_int(year)
        .ok_or_else(|| Error::validation(format!("invalid year: '{}'. Must be an integer", year)))?;
    let max = i64::from(chrono::Utc::now().year()) + 1;
    if !(MIN_YEAR..=max).contains(&y) {
        return Err(Error::validation(format!(
            "invalid year: {}. Must be between {} and {}",
            y, MIN_YEAR, max
        )));
    }
    Ok(y)
}

/// Shape check only: a FIPS filter value must be an integer.
pub fn fips_code(fips: &Scalar) -> Result<i64> {
    scalar_to_int(fips).ok_or_else(|| {
        Error::validation(format!("invalid FIPS code: '{}'. Must be an integer", fips))
    })
}

/// A FIPS code listed in the state and territory table.
pub fn validate_fips(fips: &Scalar) -> Result<i64> {
    let code = fips_code(fips)?;
    if state_name(code).is_none() {
        return Err(Error::validation(format!(
            "unknown FIPS code: {}. Not a listed state or territory code",
            code
        )));
    }
    Ok(code)
}

fn scalar_to_int(s: &Scalar) -> Option<i64> {
    match s {
        Scalar::Int(i) => Some(*i),
        Scalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Scalar::Str(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Result of a best-effort pre-flight check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// `false` only when metadata was available and the endpoint is not in it.
    pub ok: bool,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self {
            ok: true,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, msg: String) {
        log::warn!("{}", msg);
        self.warnings.push(msg);
    }

    /// Turn a failed outcome into an endpoint-not-found error.
    pub fn into_result(self, d: &EndpointDescriptor) -> Result<Self> {
        if self.ok {
            Ok(self)
        } else {
            Err(Error::EndpointNotFound {
                url: format!("{}/{}/{}", d.level(), d.source(), d.topic()),
            })
        }
    }
}

/// Checks descriptors against the `api-endpoints` metadata listing.
#[derive(Debug, Clone, Default)]
pub struct EndpointValidator {
    endpoints: Option<Vec<EndpointInfo>>,
}

impl EndpointValidator {
    pub fn new(endpoints: Vec<EndpointInfo>) -> Self {
        Self {
            endpoints: Some(endpoints),
        }
    }

    /// A validator with no metadata; every check passes with a warning.
    pub fn without_metadata() -> Self {
        Self { endpoints: None }
    }

    pub fn validate(&self, d: &EndpointDescriptor) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::passed();

        let known = match d.level() {
            Level::Schools => SCHOOL_SOURCES,
            Level::SchoolDistricts => DISTRICT_SOURCES,
            Level::CollegeUniversity => COLLEGE_SOURCES,
        };
        if !known.contains(&d.source()) {
            outcome.warn(format!(
                "source '{}' is not a known source for level '{}'",
                d.source(),
                d.level()
            ));
        }

        if let Some(fips) = d.filters().get("fips") {
            for v in fips.values() {
                if let Err(e) = validate_fips(v) {
                    outcome.warn(e.to_string());
                }
            }
        }

        let Some(endpoints) = self.endpoints.as_ref() else {
            outcome.warn("endpoint metadata unavailable; cannot validate, proceeding anyway".into());
            return outcome;
        };

        let Some(info) = endpoints.iter().find(|e| e.is_for(d)) else {
            outcome.ok = false;
            outcome.warn(format!(
                "endpoint not found in metadata: level='{}', source='{}', topic='{}'",
                d.level(),
                d.source(),
                d.topic()
            ));
            return outcome;
        };

        let valid = info.known_filters();
        if valid.is_empty() {
            return outcome;
        }
        for name in d.filters().keys() {
            if !valid.contains(&name.as_str()) && !MAIN_FILTERS.contains(&name.as_str()) {
                outcome.warn(format!(
                    "filter '{}' may not be valid for this endpoint. Valid filters: {}",
                    name,
                    valid.join(", ")
                ));
            }
        }
        outcome
    }
}
