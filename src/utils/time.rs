//! RFC 3339 timestamps for exported transcripts and session stats.
//!
//! Use with `#[serde(with = "crate::utils::time")]`.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};

/// Formats a timestamp as RFC 3339, e.g. `2025-03-01T12:30:00Z`.
pub fn format_rfc3339(datetime: &OffsetDateTime) -> Result<String> {
    datetime
        .format(&Rfc3339)
        .map_err(|err| Error::serialization("timestamp is not representable", Some(Box::new(err))))
}

/// Parses an RFC 3339 timestamp.
pub fn parse_rfc3339(s: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(s.trim(), &Rfc3339)
        .map_err(|err| Error::serialization(format!("bad timestamp {s:?}"), Some(Box::new(err))))
}

pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_rfc3339(&s).map_err(serde::de::Error::custom)
}

pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = format_rfc3339(datetime).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::utils::time")]
        at: OffsetDateTime,
    }

    #[test]
    fn formats_utc() {
        let at = datetime!(2025-03-01 12:30:00 UTC);
        assert_eq!(format_rfc3339(&at).unwrap(), "2025-03-01T12:30:00Z");
        assert_eq!(parse_rfc3339(" 2025-03-01T12:30:00Z ").unwrap(), at);
    }

    #[test]
    fn serde_field() {
        let stamped = Stamped {
            at: datetime!(2025-03-01 12:30:00 +02:00),
        };
        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"at":"2025-03-01T12:30:00+02:00"}"#);
        assert_eq!(serde_json::from_str::<Stamped>(&json).unwrap(), stamped);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_rfc3339("yesterday").is_err());
        assert!(serde_json::from_str::<Stamped>(r#"{"at":"soon"}"#).is_err());
    }
}
