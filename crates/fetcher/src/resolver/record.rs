//! Defensive access to loosely-typed build records
//!
//! The nightly and archive backends disagree on field names and types, and
//! individual records may omit anything. Every lookup here returns an
//! `Option`; a missing, null, or wrong-typed field is `None`, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d{8})-").unwrap());
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^lineage-(\d+)\.(\d+)-").unwrap());

/// Field aliases probed for a build timestamp, in the exact order the
/// upstream catalogs actually use them.
const TIMESTAMP_ALIASES: [&str; 3] = ["datetime", "timestamp", "time"];

/// One build entry as reported by a backend.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    fields: Map<String, Value>,
}

impl BuildRecord {
    /// Wraps a JSON value; non-object entries are discarded.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Trimmed, non-empty string field.
    pub fn text(&self, key: &str) -> Option<&str> {
        let text = self.fields.get(key)?.as_str()?.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Integer field, accepting integers, floats, and digit-strings.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    s.parse().ok()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// The archive catalog reports filenames under either key.
    pub fn filename(&self) -> Option<&str> {
        self.text("filename").or_else(|| self.text("name"))
    }

    pub fn device(&self) -> Option<&str> {
        self.text("device")
    }

    pub fn url(&self) -> Option<&str> {
        self.text("url")
    }

    pub fn id(&self) -> Option<i64> {
        self.integer("id")
    }

    /// First parsable value among the timestamp aliases.
    pub fn timestamp(&self) -> Option<i64> {
        TIMESTAMP_ALIASES.iter().find_map(|key| self.integer(key))
    }
}

/// `-YYYYMMDD-` token as a numeric date; `0` when absent or unparsable.
pub fn date_from_filename(filename: &str) -> u64 {
    DATE_RE
        .captures(filename)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0)
}

/// The raw `-YYYYMMDD-` token, for building mirror URLs.
pub fn date_token(filename: &str) -> Option<String> {
    DATE_RE.captures(filename).map(|c| c[1].to_string())
}

/// `(major, minor)` from a `lineage-<major>.<minor>-` prefix, else `(0, 0)`.
pub fn version_from_filename(filename: &str) -> (u32, u32) {
    VERSION_RE
        .captures(filename)
        .and_then(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .unwrap_or((0, 0))
}

/// Composite ranking key for archive builds: backend timestamp first, then
/// the filename version, then the filename date. Records lacking all three
/// rank lowest. Sorting descending by this key is the archive locator's
/// entire ordering contract.
pub fn archive_sort_key(record: &BuildRecord) -> (i64, (u32, u32), u64) {
    let filename = record.filename().unwrap_or("");
    (
        record.timestamp().unwrap_or(0),
        version_from_filename(filename),
        date_from_filename(filename),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> BuildRecord {
        BuildRecord::from_value(value).unwrap()
    }

    #[test]
    fn non_object_entries_are_discarded() {
        assert!(BuildRecord::from_value(json!("zip")).is_none());
        assert!(BuildRecord::from_value(json!(42)).is_none());
        assert!(BuildRecord::from_value(json!(null)).is_none());
        assert!(BuildRecord::from_value(json!({})).is_some());
    }

    #[test]
    fn text_rejects_empty_and_wrong_types() {
        let r = record(json!({ "device": "  redfin  ", "filename": "", "id": 7 }));
        assert_eq!(r.device(), Some("redfin"));
        assert_eq!(r.text("filename"), None);
        assert_eq!(r.text("id"), None);
        assert_eq!(r.text("missing"), None);
    }

    #[test]
    fn integer_accepts_numbers_floats_and_digit_strings() {
        let r = record(json!({
            "a": 1700000000,
            "b": 1700000000.9,
            "c": "1700000001",
            "d": "not-a-number",
            "e": "17.5",
        }));
        assert_eq!(r.integer("a"), Some(1_700_000_000));
        assert_eq!(r.integer("b"), Some(1_700_000_000));
        assert_eq!(r.integer("c"), Some(1_700_000_001));
        assert_eq!(r.integer("d"), None);
        assert_eq!(r.integer("e"), None);
    }

    #[test]
    fn filename_falls_back_to_name() {
        let r = record(json!({ "name": "lineage-20.0-20230101-redfin.zip" }));
        assert_eq!(r.filename(), Some("lineage-20.0-20230101-redfin.zip"));

        let both = record(json!({ "filename": "a.zip", "name": "b.zip" }));
        assert_eq!(both.filename(), Some("a.zip"));
    }

    #[test]
    fn timestamp_alias_precedence_is_fixed() {
        let r = record(json!({ "time": 1, "timestamp": 2, "datetime": 3 }));
        assert_eq!(r.timestamp(), Some(3));

        // An unparsable value under the preferred alias falls through to the
        // next one, it is not a hard zero.
        let r = record(json!({ "datetime": "n/a", "timestamp": "2", "time": 1 }));
        assert_eq!(r.timestamp(), Some(2));

        let r = record(json!({ "time": 1 }));
        assert_eq!(r.timestamp(), Some(1));

        let r = record(json!({ "filename": "x.zip" }));
        assert_eq!(r.timestamp(), None);
    }

    #[test]
    fn date_extraction_never_panics() {
        assert_eq!(
            date_from_filename("lineage-21.0-20240115-nightly-redfin-signed.zip"),
            20_240_115
        );
        assert_eq!(date_from_filename("no-date-here.zip"), 0);
        assert_eq!(date_from_filename(""), 0);
        assert_eq!(date_token("lineage-21.0-20240115-x.zip").as_deref(), Some("20240115"));
        assert_eq!(date_token("plain.zip"), None);
    }

    #[test]
    fn version_extraction() {
        assert_eq!(
            version_from_filename("lineage-21.0-20240115-nightly-redfin-signed.zip"),
            (21, 0)
        );
        assert_eq!(version_from_filename("lineage-18.1-20210601-x.zip"), (18, 1));
        // The prefix must anchor at the start.
        assert_eq!(version_from_filename("foo-lineage-18.1-x.zip"), (0, 0));
        assert_eq!(version_from_filename("random.zip"), (0, 0));
    }

    #[test]
    fn sort_key_timestamp_tier_dominates() {
        let older_but_stamped = record(json!({
            "datetime": 100,
            "filename": "lineage-17.1-20200101-x.zip",
        }));
        let newer_no_stamp = record(json!({
            "filename": "lineage-21.0-20240101-x.zip",
        }));
        assert!(archive_sort_key(&older_but_stamped) > archive_sort_key(&newer_no_stamp));
    }

    #[test]
    fn sort_key_version_tier_beats_date_tier() {
        // Neither record carries a timestamp field: the higher version wins
        // even against a newer filename date.
        let high_version = record(json!({ "filename": "lineage-21.0-20230101-x.zip" }));
        let newer_date = record(json!({ "filename": "lineage-18.1-20240601-x.zip" }));
        assert!(archive_sort_key(&high_version) > archive_sort_key(&newer_date));
    }

    #[test]
    fn sort_key_date_breaks_version_ties() {
        let newer = record(json!({ "filename": "lineage-20.0-20230601-x.zip" }));
        let older = record(json!({ "filename": "lineage-20.0-20230101-x.zip" }));
        assert!(archive_sort_key(&newer) > archive_sort_key(&older));
    }

    #[test]
    fn sort_key_defaults_to_lowest_rank() {
        let bare = record(json!({ "device": "redfin" }));
        assert_eq!(archive_sort_key(&bare), (0, (0, 0), 0));
    }
}
