//! Team name generation and validation
//!
//! This module produces generated team names for sessions that ask for them
//! and validates names typed in by hosts, filtering inappropriate content
//! and enforcing length limits.

use heck::ToTitleCase;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::teams::MAX_NAME_LENGTH;

/// Defines the style of automatically generated team names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, garde::Validate)]
pub enum NameStyle {
    /// Roman-style names (praenomen + nomen, optionally + cognomen)
    Roman(#[garde(range(min = 2, max = 3))] usize),
    /// Pet-style names (adjective + animal combinations)
    Petname(#[garde(range(min = 2, max = 3))] usize),
}

impl Default for NameStyle {
    /// Default name style is Petname with 2 words
    fn default() -> Self {
        Self::Petname(2)
    }
}

impl NameStyle {
    /// Generates a random name according to this style
    ///
    /// # Returns
    ///
    /// A randomly generated, title-cased name.
    pub fn get_name(&self) -> String {
        match self {
            Self::Roman(count) => romanname::romanname(romanname::NameConfig {
                praenomen: *count > 2,
            }),
            Self::Petname(count) => petname::petname(*count as u8, " ").unwrap_or_default(),
        }
        .to_title_case()
    }
}

/// Trait for generating names according to a specific naming scheme.
pub trait NamingScheme {
    /// Generates and returns a name according to the naming scheme.
    fn get_name(&self) -> String;

    /// Generates and returns the plural form of a name, which reads better
    /// for a team ("Brave Otters").
    fn get_plural_name(&self) -> String {
        pluralizer::pluralize(&self.get_name(), 2, false)
    }
}

impl NamingScheme for NameStyle {
    fn get_name(&self) -> String {
        self.get_name()
    }
}

/// Errors that can occur during name validation
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The name is empty or contains only whitespace
    #[error("name cannot be empty")]
    Empty,
    /// The name contains inappropriate content
    #[error("name is inappropriate")]
    Sinful,
    /// The name exceeds the maximum allowed length
    #[error("name is too long")]
    TooLong,
}

/// Validates a team name typed in by a host
///
/// # Returns
///
/// The name with surrounding whitespace removed.
///
/// # Errors
///
/// * `Error::TooLong` - Name exceeds the maximum team name length
/// * `Error::Empty` - Name is empty after trimming whitespace
/// * `Error::Sinful` - Name contains inappropriate content
pub fn validate_team_name(name: &str) -> Result<String, Error> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::TooLong);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::Empty);
    }
    if name.is_inappropriate() {
        return Err(Error::Sinful);
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_validate_team_name_accepts_plain_name() {
        assert_eq!(validate_team_name("Team 1"), Ok("Team 1".to_string()));
    }

    #[test]
    fn test_validate_team_name_too_long() {
        let long_name = "a".repeat(MAX_NAME_LENGTH + 1);
        assert_eq!(validate_team_name(&long_name), Err(Error::TooLong));
    }

    #[test]
    fn test_validate_team_name_max_length_allowed() {
        let max_name = "a".repeat(MAX_NAME_LENGTH);
        assert_eq!(validate_team_name(&max_name), Ok(max_name));
    }

    #[test]
    fn test_validate_team_name_empty() {
        assert_eq!(validate_team_name(""), Err(Error::Empty));
        assert_eq!(validate_team_name("   "), Err(Error::Empty));
        assert_eq!(validate_team_name("\t\n"), Err(Error::Empty));
    }

    #[test]
    fn test_validate_team_name_trims_whitespace() {
        assert_eq!(validate_team_name("  Eagles  "), Ok("Eagles".to_string()));
    }

    #[test]
    fn test_validate_team_name_inappropriate_content() {
        for name in ["damn", "fuck", "shit"] {
            assert_eq!(
                validate_team_name(name),
                Err(Error::Sinful),
                "Expected '{name}' to be flagged as inappropriate"
            );
        }
    }

    #[test]
    fn test_error_display() {
        assert_eq!(Error::Empty.to_string(), "name cannot be empty");
        assert_eq!(Error::Sinful.to_string(), "name is inappropriate");
        assert_eq!(Error::TooLong.to_string(), "name is too long");
    }

    #[test]
    fn test_name_style_default() {
        assert_eq!(NameStyle::default(), NameStyle::Petname(2));
    }

    #[test]
    fn test_name_style_petname_generation() {
        let name_3 = NameStyle::Petname(3).get_name();
        assert!(!name_3.is_empty());
        assert_eq!(name_3.matches(' ').count(), 2);
    }

    #[test]
    fn test_name_style_roman_generation() {
        let name = NameStyle::Roman(2).get_name();
        assert!(name.chars().next().unwrap().is_uppercase());
    }

    #[test]
    fn test_plural_name_is_not_empty() {
        assert!(!NameStyle::Petname(2).get_plural_name().is_empty());
        assert!(!NameStyle::Roman(3).get_plural_name().is_empty());
    }

    #[test]
    fn test_name_style_validation() {
        use garde::Validate;

        assert!(NameStyle::Petname(2).validate().is_ok());
        assert!(NameStyle::Roman(3).validate().is_ok());
        assert!(NameStyle::Petname(1).validate().is_err());
        assert!(NameStyle::Roman(4).validate().is_err());
    }
}
