//! Region identifier normalization.
//!
//! The API reports regions as `<platform>-<region>` (`aws-us-west-2`) but
//! expects only the `<region>` part on project creation. Configuration uses the
//! reported form so that a created project reads back unchanged.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static REGION_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+-(?P<region>.+)$").unwrap());

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not parse region ID, expected the form `aws-us-west-2`, given: {given:?}")]
pub struct RegionParseError {
    pub given: String,
}

/// Strip the platform prefix from a region identifier.
///
/// `aws-us-west-2` becomes `us-west-2`. Fails when there is no alphabetic
/// prefix followed by a hyphen and a non-empty remainder.
pub fn normalize_region_id(region_id: &str) -> Result<&str, RegionParseError> {
    REGION_ID_REGEX
        .captures(region_id)
        .and_then(|caps| caps.name("region"))
        .map(|m| m.as_str())
        .ok_or_else(|| RegionParseError {
            given: region_id.to_string(),
        })
}
