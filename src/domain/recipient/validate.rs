use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

/// Checks that the given value looks like `local-part@domain.tld`,
/// ignoring surrounding whitespace. This is a format check only: no
/// DNS nor mailbox verification is involved.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email.trim())
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn valid_emails() {
        for email in [
            "a@b.com",
            "first.last+tag@mail.example.org",
            " padded@example.io ",
            "x_y%z@sub-domain.co",
            "alice@mail.test",
        ] {
            assert!(is_valid_email(email), "{} should be valid", email);
        }
    }

    #[test]
    fn invalid_emails() {
        for email in [
            "",
            "not-an-email",
            "bad",
            "a@b",
            "alice@localhost",
            "a@b.c",
            "@b.com",
            "a b@c.com",
            "a@b.c0m",
        ] {
            assert!(!is_valid_email(email), "{} should be invalid", email);
        }
    }
}
