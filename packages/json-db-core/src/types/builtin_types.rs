//! String-shaped checks for the EMAIL, DATE, DATETIME and UUID kinds.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use uuid::{Uuid, Variant};

/// Datetime layouts accepted besides RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Integral JSON number. Floats with no fractional part count.
pub fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0),
        _ => false,
    }
}

/// `local@domain.tld`: one `@`, no whitespace, a dot inside the domain.
pub fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

/// `YYYY-MM-DD` naming a real calendar day.
pub fn is_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    shape_ok && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Any string parseable as a timestamp.
pub fn is_datetime(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || DateTime::parse_from_rfc2822(s).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
        || is_date(s)
}

/// Canonical hyphenated 8-4-4-4-12 UUID with version 1-5 and RFC 4122 variant.
pub fn is_uuid(s: &str) -> bool {
    let hyphens_ok = s.len() == 36
        && s.char_indices()
            .all(|(i, c)| matches!(i, 8 | 13 | 18 | 23) == (c == '-'));
    if !hyphens_ok {
        return false;
    }
    match Uuid::parse_str(s) {
        Ok(uuid) => (1..=5).contains(&uuid.get_version_num()) && uuid.get_variant() == Variant::RFC4122,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last@sub.example.org"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.com"));
        assert!(!is_email("a@.com"));
        assert!(!is_email("a@b."));
        assert!(!is_email("a b@c.com"));
        assert!(!is_email("a@b@c.com"));
    }

    #[test]
    fn date_requires_real_day() {
        assert!(is_date("2024-02-29"));
        assert!(!is_date("2023-02-29"));
        assert!(!is_date("2024-2-9"));
        assert!(!is_date("2024-02-29T00:00:00"));
    }

    #[test]
    fn datetime_accepts_common_layouts() {
        assert!(is_datetime("2024-05-01T10:20:30Z"));
        assert!(is_datetime("2024-05-01T10:20:30.123+02:00"));
        assert!(is_datetime("2024-05-01 10:20:30"));
        assert!(is_datetime("2024-05-01"));
        assert!(!is_datetime("yesterday"));
    }

    #[test]
    fn uuid_is_canonical_and_case_insensitive() {
        assert!(is_uuid("123e4567-e89b-42d3-a456-426614174000"));
        assert!(is_uuid("123E4567-E89B-42D3-A456-426614174000"));
        // version 0
        assert!(!is_uuid("123e4567-e89b-02d3-a456-426614174000"));
        // NCS variant
        assert!(!is_uuid("123e4567-e89b-42d3-1456-426614174000"));
        assert!(!is_uuid("123e4567e89b42d3a456426614174000"));
        assert!(!is_uuid("{123e4567-e89b-42d3-a456-426614174000}"));
    }
}
