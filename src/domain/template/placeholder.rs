use serde::{Deserialize, Serialize};
use std::{fmt, result, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse unknown placeholder {0}")]
    ParsePlaceholderError(String),
}

pub type Result<T> = result::Result<T, Error>;

/// Represents a named substitution slot of a template.
///
/// Each placeholder is spelled `{{NAME}}` in templates. The closing
/// braces prevent any token from being a prefix of another one.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placeholder {
    FirstName,
    LastName,
    CompanyName,
    Role,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::FirstName,
        Placeholder::LastName,
        Placeholder::CompanyName,
        Placeholder::Role,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FirstName => "FIRST_NAME",
            Self::LastName => "LAST_NAME",
            Self::CompanyName => "COMPANY_NAME",
            Self::Role => "ROLE",
        }
    }

    /// Returns the literal token spelling, for example
    /// `{{FIRST_NAME}}`.
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.name())
    }

    /// Returns the header names the auto-mapper recognizes for this
    /// placeholder, ordered by preference.
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Self::FirstName => &["firstname", "first name", "given name", "first", "fname"],
            Self::LastName => &["lastname", "last name", "surname", "lname"],
            Self::CompanyName => &[
                "companyname",
                "company name",
                "organization",
                "company",
                "employer",
            ],
            Self::Role => &["role", "position", "job title", "applied for", "job"],
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Placeholder {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|placeholder| placeholder.name() == name)
            .copied()
            .ok_or_else(|| Error::ParsePlaceholderError(name.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_do_not_collide() {
        for a in Placeholder::ALL {
            for b in Placeholder::ALL {
                if a != b {
                    assert!(!a.token().contains(&b.token()));
                }
            }
        }
    }

    #[test]
    fn parse_placeholder() {
        assert_eq!(Placeholder::Role, "ROLE".parse().unwrap());
        assert_eq!("{{COMPANY_NAME}}", Placeholder::CompanyName.token());
        assert!(matches!(
            "role".parse::<Placeholder>(),
            Err(Error::ParsePlaceholderError(name)) if name == "role"
        ));
    }
}
