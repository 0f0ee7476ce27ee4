use lazy_static::lazy_static;
use regex::Regex;
use std::{collections::HashMap, ops::Range};

use super::Placeholder;

/// Represents the values substituted into a template, one per
/// placeholder.
pub type Values = HashMap<Placeholder, String>;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\{\{([A-Z0-9_]+)\}\}").unwrap();
}

/// Finds the first known placeholder token of the given text.
fn find_token(text: &str) -> Option<(Range<usize>, Placeholder)> {
    TOKEN.captures_iter(text).find_map(|caps| {
        let placeholder = caps[1].parse::<Placeholder>().ok()?;
        caps.get(0).map(|token| (token.range(), placeholder))
    })
}

/// Renders the given template.
///
/// Every known placeholder token is replaced by its value, or by an
/// empty string when the value is missing. Values are inserted
/// verbatim, so a value spelling a token is never expanded. Removing
/// a token may join the template text around it into a new token,
/// which is replaced in turn. Unknown tokens are left untouched.
pub fn render(tpl: &str, values: &Values) -> String {
    let mut out = String::with_capacity(tpl.len());
    let mut rest = tpl.to_owned();

    while let Some((range, placeholder)) = find_token(&rest) {
        match values.get(&placeholder).filter(|value| !value.is_empty()) {
            Some(value) => {
                out.push_str(&rest[..range.start]);
                out.push_str(value);
                rest.drain(..range.end);
            }
            None => rest.replace_range(range, ""),
        }
    }

    out.push_str(&rest);
    out
}
