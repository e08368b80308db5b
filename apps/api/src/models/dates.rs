//! Calendar dates as stored in company datasets.
//!
//! Datasets keep dates as ISO-8601 strings. They are parsed exactly once, when
//! the dataset is deserialized, into an [`EntityDate`]. Unparseable input never
//! surfaces as an error: it is kept as [`EntityDate::Invalid`] so the page can
//! print a placeholder instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const NO_DATE: &str = "No date";
pub const INVALID_DATE: &str = "Invalid Date";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EntityDate {
    Date(NaiveDate),
    /// Absent, null or blank in the source.
    #[default]
    Missing,
    /// Non-empty source text that is not a recognizable date.
    Invalid(String),
}

impl EntityDate {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return EntityDate::Missing;
        };
        match parse_iso_date(raw) {
            Some(date) => EntityDate::Date(date),
            None => EntityDate::Invalid(raw.to_string()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            EntityDate::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, EntityDate::Missing)
    }

    /// "Jan 2022", or the placeholder for missing / invalid input.
    pub fn display(&self) -> String {
        self.display_or(NO_DATE)
    }

    /// Like [`display`](Self::display) but with a caller-chosen label for a
    /// missing date, e.g. "Present" for an open-ended position.
    pub fn display_or(&self, missing: &str) -> String {
        match self {
            EntityDate::Date(d) => format_month_year(*d),
            EntityDate::Missing => missing.to_string(),
            EntityDate::Invalid(_) => INVALID_DATE.to_string(),
        }
    }
}

/// en-US short month and numeric year.
pub fn format_month_year(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, naive date-times and RFC 3339.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if s.len() == 7 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(d);
        }
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    None
}

impl Serialize for EntityDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EntityDate::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            EntityDate::Missing => serializer.serialize_none(),
            EntityDate::Invalid(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for EntityDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(EntityDate::parse(raw.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_accepts_common_iso_shapes() {
        assert_eq!(parse_iso_date("2022-03-15"), Some(ymd(2022, 3, 15)));
        assert_eq!(parse_iso_date("2022-03"), Some(ymd(2022, 3, 1)));
        assert_eq!(parse_iso_date("2022"), Some(ymd(2022, 1, 1)));
        assert_eq!(
            parse_iso_date("2022-03-15T00:00:00.000Z"),
            Some(ymd(2022, 3, 15))
        );
        assert_eq!(
            parse_iso_date("2022-03-15T08:30:00"),
            Some(ymd(2022, 3, 15))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_iso_date("sometime in spring"), None);
        assert_eq!(parse_iso_date("2022-13-01"), None);
    }

    #[test]
    fn test_empty_string_is_missing_and_displays_no_date() {
        let date = EntityDate::parse(Some("   "));
        assert!(date.is_missing());
        assert_eq!(date.display(), "No date");
    }

    #[test]
    fn test_unparseable_string_displays_invalid_date() {
        let date = EntityDate::parse(Some("not-a-date"));
        assert_eq!(date, EntityDate::Invalid("not-a-date".to_string()));
        assert_eq!(date.display(), "Invalid Date");
    }

    #[test]
    fn test_valid_date_displays_month_and_year() {
        assert_eq!(EntityDate::parse(Some("2022-01-10")).display(), "Jan 2022");
        assert_eq!(EntityDate::parse(Some("2019-11")).display(), "Nov 2019");
    }

    #[test]
    fn test_display_or_uses_label_only_for_missing() {
        assert_eq!(EntityDate::Missing.display_or("Present"), "Present");
        assert_eq!(
            EntityDate::Invalid("x".into()).display_or("Present"),
            "Invalid Date"
        );
    }

    #[test]
    fn test_deserialize_null_and_string() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default)]
            a: EntityDate,
            #[serde(default)]
            b: EntityDate,
            #[serde(default)]
            c: EntityDate,
        }
        let h: Holder = serde_json::from_str(r#"{"a": null, "b": "2021-06-01"}"#).unwrap();
        assert!(h.a.is_missing());
        assert_eq!(h.b.as_date(), Some(ymd(2021, 6, 1)));
        assert!(h.c.is_missing());
    }

    #[test]
    fn test_deserialize_number_is_schema_violation() {
        let result: Result<EntityDate, _> = serde_json::from_str("20210601");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_keeps_iso_or_raw_text() {
        let json = serde_json::to_value(EntityDate::parse(Some("2021-06"))).unwrap();
        assert_eq!(json, serde_json::json!("2021-06-01"));
        let json = serde_json::to_value(EntityDate::Missing).unwrap();
        assert!(json.is_null());
        let json = serde_json::to_value(EntityDate::Invalid("soon".into())).unwrap();
        assert_eq!(json, serde_json::json!("soon"));
    }
}
