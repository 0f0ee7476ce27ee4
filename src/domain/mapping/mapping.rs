use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Placeholder;

/// Header names recognized as the recipient email column, ordered
/// by preference.
pub const EMAIL_PATTERNS: &[&str] = &["email", "e-mail", "email address", "e mail"];

/// Normalizes a header name or a pattern before comparing them:
/// lowercase, without spaces nor underscores.
pub fn normalize(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect()
}

/// Finds the first header, in table order, matching one of the given
/// patterns.
fn find_header<'a>(headers: &'a [String], patterns: &[&str]) -> Option<&'a String> {
    let patterns: Vec<String> = patterns.iter().map(|p| normalize(p)).collect();
    headers
        .iter()
        .find(|header| patterns.contains(&normalize(header)))
}

/// Represents the association between the recipient email address or
/// a placeholder and a column of the loaded table. An absent entry
/// means unmapped.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub email: Option<String>,
    pub placeholders: BTreeMap<Placeholder, String>,
}

impl ColumnMapping {
    pub fn set_email<C: Into<String>>(&mut self, column: C) {
        self.email = Some(column.into());
    }

    pub fn set<C: Into<String>>(&mut self, placeholder: Placeholder, column: C) {
        self.placeholders.insert(placeholder, column.into());
    }

    pub fn unset(&mut self, placeholder: Placeholder) {
        self.placeholders.remove(&placeholder);
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.placeholders.get(&placeholder).map(String::as_str)
    }

    /// Returns the email column only if it exists among the given
    /// headers.
    pub fn email_column(&self, headers: &[String]) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|column| headers.iter().any(|header| header == column))
    }

    /// Guesses the columns of the given headers. Mappings referencing
    /// an existing header are kept, stale ones are replaced by the
    /// first matching header or dropped.
    pub fn autodetect(&self, headers: &[String]) -> Self {
        trace!(">> autodetect column mapping");

        let is_valid = |column: &String| headers.contains(column);
        let mut mapping = Self::default();

        mapping.email = match self.email.as_ref().filter(|c| is_valid(*c)) {
            Some(column) => Some(column.to_owned()),
            None => {
                let detected = find_header(headers, EMAIL_PATTERNS).cloned();
                if let Some(ref column) = detected {
                    debug!("auto-detected email column: {:?}", column);
                }
                detected
            }
        };

        for placeholder in Placeholder::ALL {
            let column = match self.placeholders.get(&placeholder).filter(|c| is_valid(*c)) {
                Some(column) => Some(column.to_owned()),
                None => {
                    let detected = find_header(headers, placeholder.patterns()).cloned();
                    if let Some(ref column) = detected {
                        debug!("auto-detected {} column: {:?}", placeholder, column);
                    }
                    detected
                }
            };

            if let Some(column) = column {
                mapping.placeholders.insert(placeholder, column);
            }
        }

        trace!("column mapping: {:?}", mapping);
        trace!("<< autodetect column mapping");
        mapping
    }
}

/// Guesses the column mapping of the given headers, keeping the
/// still valid entries of the existing mapping.
pub fn autodetect(headers: &[String], existing: &ColumnMapping) -> ColumnMapping {
    existing.autodetect(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn normalize_header() {
        assert_eq!("emailaddress", normalize("Email Address"));
        assert_eq!("firstname", normalize("FIRST_NAME"));
        assert_eq!("e-mail", normalize(" E-Mail "));
    }

    #[test]
    fn autodetect_email_address() {
        let headers = headers(&["Email Address", "First Name", "Org"]);
        let mapping = autodetect(&headers, &ColumnMapping::default());

        assert_eq!(Some("Email Address"), mapping.email_column(&headers));
        assert_eq!(Some("First Name"), mapping.get(Placeholder::FirstName));
        assert_eq!(None, mapping.get(Placeholder::CompanyName));
        assert_eq!(None, mapping.get(Placeholder::LastName));
    }

    #[test]
    fn autodetect_first_header_wins() {
        let headers = headers(&["company", "E_Mail", "email", "Employer", "Job Title"]);
        let mapping = autodetect(&headers, &ColumnMapping::default());

        assert_eq!(Some("E_Mail"), mapping.email.as_deref());
        assert_eq!(Some("company"), mapping.get(Placeholder::CompanyName));
        assert_eq!(Some("Job Title"), mapping.get(Placeholder::Role));
    }

    #[test]
    fn autodetect_is_deterministic_and_stable() {
        let headers = headers(&["fname", "Surname", "Organization", "Position", "e-mail"]);
        let first = autodetect(&headers, &ColumnMapping::default());
        let second = autodetect(&headers, &ColumnMapping::default());

        assert_eq!(first, second);
        assert_eq!(first, autodetect(&headers, &first));
        assert_eq!(Some("e-mail"), first.email.as_deref());
        assert_eq!(4, first.placeholders.len());
    }

    #[test]
    fn autodetect_keeps_valid_mapping() {
        let headers = headers(&["Email", "Contact", "First Name"]);
        let mut existing = ColumnMapping::default();
        existing.set_email("Contact");
        existing.set(Placeholder::FirstName, "Contact");
        existing.set(Placeholder::Role, "Missing Column");

        let mapping = autodetect(&headers, &existing);

        assert_eq!(Some("Contact"), mapping.email.as_deref());
        assert_eq!(Some("Contact"), mapping.get(Placeholder::FirstName));
        assert_eq!(None, mapping.get(Placeholder::Role));
    }

    #[test]
    fn email_column_must_exist() {
        let mut mapping = ColumnMapping::default();
        mapping.set_email("Mail");

        assert_eq!(None, mapping.email_column(&headers(&["Email"])));
        assert_eq!(Some("Mail"), mapping.email_column(&headers(&["Email", "Mail"])));
    }
}
