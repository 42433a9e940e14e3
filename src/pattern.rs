//! Wildcard service names
//!
//! A name containing `*` selects every registered service whose name ends
//! with the pattern, where each `*` stands for one or more characters
//! within a single `.`-separated segment.

use crate::{DiError, Result};
use regex::Regex;

/// The wildcard marker
pub const WILDCARD: char = '*';

/// A compiled wildcard name.
///
/// # Examples
///
/// ```rust
/// use named_injector::ServicePattern;
///
/// let pattern = ServicePattern::new("handlers.*").unwrap();
/// assert!(pattern.matches("handlers.user"));
/// assert!(pattern.matches("http.handlers.user"));
/// assert!(!pattern.matches("handlers.user.create"));
/// assert!(!pattern.matches("handlers."));
/// ```
#[derive(Debug, Clone)]
pub struct ServicePattern {
    source: String,
    regex: Regex,
}

impl ServicePattern {
    /// Check whether `name` should be treated as a pattern
    #[inline]
    pub fn is_pattern(name: &str) -> bool {
        name.contains(WILDCARD)
    }

    /// Compile a pattern.
    ///
    /// Everything except `*` matches literally, `.` included.
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split(WILDCARD)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("[^.]+");

        let regex = Regex::new(&format!("{body}$")).map_err(|err| DiError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// Test a registered name against the pattern
    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The pattern as written
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for ServicePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}
