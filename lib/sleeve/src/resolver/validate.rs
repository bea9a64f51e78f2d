use shared::fields::{Field, FieldKind};
use url::Url;

use crate::error::{Result, SleeveError};

/// Field-specific validity predicate. Returns the normalized value on success.
pub fn check(field: Field, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(invalid(field, "empty value"));
    }

    match field.kind() {
        FieldKind::Text => Ok(value.to_string()),
        FieldKind::Link => check_link(field, value),
        FieldKind::Year => check_year(field, value),
        FieldKind::Lines => {
            let lines: Vec<&str> = value
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if lines.is_empty() {
                return Err(invalid(field, "no entries"));
            }
            Ok(lines.join("\n"))
        }
    }
}

pub fn is_valid(field: Field, raw: &str) -> bool {
    check(field, raw).is_ok()
}

fn check_link(field: Field, value: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|e| invalid(field, &format!("not a URL ({e})")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, &format!("unsupported scheme {}", url.scheme())));
    }
    match url.host_str() {
        Some(host) if host.contains('.') => Ok(value.to_string()),
        _ => Err(invalid(field, "missing host")),
    }
}

fn check_year(field: Field, value: &str) -> Result<String> {
    // Dates such as "1998-05-01" carry the year up front.
    let digits: String = value.chars().take(4).collect();
    let followed_by_digit = value.chars().nth(4).is_some_and(|c| c.is_ascii_digit());
    match digits.parse::<u32>() {
        Ok(year) if digits.len() == 4 && !followed_by_digit && (1000..=2999).contains(&year) => {
            Ok(digits)
        }
        _ => Err(invalid(field, "not a four digit year")),
    }
}

fn invalid(field: Field, reason: &str) -> SleeveError {
    SleeveError::Validation {
        field,
        reason: reason.to_string(),
    }
}
