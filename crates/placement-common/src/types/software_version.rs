//! Dataset software version
//!
//! Versions are stored as a 4-tuple. The textual form is a strict tuple
//! literal such as `(10, 6, 2, 'patch1')`; only integers and quoted strings
//! are accepted as elements.

use crate::error::{PlacementError, Result};
use serde::{Deserialize, Serialize};

/// One element of a software version tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionField {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for VersionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionField::Number(n) => write!(f, "{}", n),
            VersionField::Text(s) => write!(f, "'{}'", s),
        }
    }
}

/// Software release a dataset was produced with: (cycle, major, minor, suffix)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoftwareVersion {
    pub cycle: VersionField,
    pub major: VersionField,
    pub minor: VersionField,
    pub suffix: VersionField,
}

impl SoftwareVersion {
    /// Build a version from exactly four fields.
    pub fn from_fields(fields: Vec<VersionField>) -> Result<Self> {
        let count = fields.len();
        let [cycle, major, minor, suffix]: [VersionField; 4] = fields.try_into().map_err(|_| {
            PlacementError::format(format!(
                "Invalid software version: expected 4 elements, got {}",
                count
            ))
        })?;

        Ok(Self {
            cycle,
            major,
            minor,
            suffix,
        })
    }

    /// Parse a tuple literal `(a, b, c, d)`.
    pub fn parse(literal: &str) -> Result<Self> {
        let invalid = || PlacementError::format(format!("Invalid software version {:?}", literal));

        let inner = literal
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let mut fields = Vec::with_capacity(4);
        let mut chars = inner.chars().peekable();

        loop {
            skip_whitespace(&mut chars);
            match chars.peek() {
                None => break,
                Some(&quote) if quote == '\'' || quote == '"' => {
                    chars.next();
                    let mut text = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some('\\') => return Err(invalid()),
                            Some(c) => text.push(c),
                            None => return Err(invalid()),
                        }
                    }
                    fields.push(VersionField::Text(text));
                },
                Some(c) if c.is_ascii_digit() || *c == '-' => {
                    let mut number = String::new();
                    number.push(chars.next().ok_or_else(invalid)?);
                    while let Some(c) = chars.peek().copied() {
                        if !c.is_ascii_digit() {
                            break;
                        }
                        number.push(c);
                        chars.next();
                    }
                    fields.push(VersionField::Number(number.parse().map_err(|_| invalid())?));
                },
                Some(_) => return Err(invalid()),
            }

            skip_whitespace(&mut chars);
            match chars.next() {
                None => break,
                Some(',') => continue,
                Some(_) => return Err(invalid()),
            }
        }

        Self::from_fields(fields).map_err(|_| invalid())
    }
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

impl std::str::FromStr for SoftwareVersion {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for SoftwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.cycle, self.major, self.minor, self.suffix
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tuple_literal() {
        let version = SoftwareVersion::parse("(10, 6, 2, 'patch1')").unwrap();
        assert_eq!(version.cycle, VersionField::Number(10));
        assert_eq!(version.major, VersionField::Number(6));
        assert_eq!(version.minor, VersionField::Number(2));
        assert_eq!(version.suffix, VersionField::Text("patch1".to_string()));
        assert_eq!(version.to_string(), "(10, 6, 2, 'patch1')");
    }

    #[test]
    fn test_parse_empty_suffix_and_double_quotes() {
        let version: SoftwareVersion = "( 9,4,0,\"\" )".parse().unwrap();
        assert_eq!(version.suffix, VersionField::Text(String::new()));
    }

    #[test]
    fn test_parse_trailing_comma() {
        assert!(SoftwareVersion::parse("(1, 2, 3, 'x',)").is_ok());
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!(SoftwareVersion::parse("(1, 2, 3)").is_err());
        assert!(SoftwareVersion::parse("(1, 2, 3, 4, 5)").is_err());
        assert!(SoftwareVersion::parse("()").is_err());
    }

    #[test]
    fn test_parse_rejects_expressions() {
        assert!(SoftwareVersion::parse("(1 + 1, 2, 3, 'x')").is_err());
        assert!(SoftwareVersion::parse("__import__('os')").is_err());
        assert!(SoftwareVersion::parse("(1, 2, 3, x)").is_err());
        assert!(SoftwareVersion::parse("[1, 2, 3, 4]").is_err());
        assert!(SoftwareVersion::parse("(1, 2, 3, 'x') + ()").is_err());
        assert!(SoftwareVersion::parse("(1, 2, 3, 'unterminated)").is_err());
    }

    #[test]
    fn test_from_fields_requires_four() {
        let fields = vec![VersionField::Number(1), VersionField::Number(2)];
        assert!(matches!(
            SoftwareVersion::from_fields(fields),
            Err(PlacementError::Format(_))
        ));
    }
}
