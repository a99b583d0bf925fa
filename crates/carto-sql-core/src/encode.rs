//! Literal encoding of bound values.
//!
//! The remote endpoint accepts a single SQL string and has no native
//! parameter binding, so every bound value is rendered as a literal. Strings
//! are wrapped in dollar quotes whose tag is negotiated against the payload,
//! which makes quote-character injection impossible without relying on
//! backslash escaping.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use regex::Regex;

use crate::builder::SqlValue;
use crate::error::EncodingError;

const TAG_BASE: &str = "cartodb";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+\- ])(\d\d):?(\d\d)?$").expect("valid offset regex"));

/// Timezone used when rendering timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZone {
    /// The process-local zone; timestamps are not shifted.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Offset(FixedOffset),
}

impl TimeZone {
    /// UTC (`Z`).
    #[must_use]
    pub fn utc() -> Self {
        Self::Offset(Utc.fix())
    }
}

impl FromStr for TimeZone {
    type Err = EncodingError;

    /// Parses `local`, `Z`, `+HH:MM`, `-HHMM` or `+HH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "local" {
            return Ok(Self::Local);
        }
        if s == "Z" {
            return Ok(Self::utc());
        }
        let invalid = || EncodingError::InvalidTimeZone(s.to_string());
        let caps = OFFSET_RE.captures(s).ok_or_else(invalid)?;
        let hours: i32 = caps[2].parse().map_err(|_| invalid())?;
        let minutes: i32 = caps
            .get(3)
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| invalid())?;
        let sign = if &caps[1] == "-" { -1 } else { 1 };
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::Offset)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Offset(offset) => write!(f, "{offset}"),
        }
    }
}

/// Encodes a value as a literal SQL fragment.
///
/// # Errors
///
/// Fails for non-finite floats and for nested raw statements, which have to
/// be spliced by the materializer instead.
pub fn encode(value: &SqlValue, tz: TimeZone) -> Result<String, EncodingError> {
    match value {
        SqlValue::Null => Ok(String::from("NULL")),
        SqlValue::Bool(b) => Ok(String::from(if *b { "true" } else { "false" })),
        SqlValue::Int(n) => Ok(format!("numeric $${n}$$")),
        SqlValue::Float(f) => {
            if f.is_finite() {
                Ok(format!("numeric $${f}$$"))
            } else {
                Err(EncodingError::NonFiniteNumber(f.to_string()))
            }
        }
        SqlValue::Text(s) => Ok(quote_string(s)),
        SqlValue::Timestamp(ts) => Ok(quote_string(&format_timestamp(ts, tz))),
        SqlValue::Blob(bytes) => Ok(format!("$$\\x{}$$", hex::encode(bytes))),
        SqlValue::Geometry(geometry) => {
            let text = json_text(geometry.as_geojson());
            Ok(format!(
                "ST_SetSRID(ST_GeomFromGeoJSON({}), 4326)",
                quote_string(&text)
            ))
        }
        SqlValue::Json(json) => Ok(quote_string(&json_text(json))),
        SqlValue::Raw(_) => Err(EncodingError::NestedRaw),
    }
}

fn json_text(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS.mmm` in the given zone.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>, tz: TimeZone) -> String {
    match tz {
        TimeZone::Local => ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
        TimeZone::Offset(offset) => ts.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
    }
}

/// Escapes control characters, then wraps the text in a negotiated
/// dollar quote.
#[must_use]
pub fn quote_string(s: &str) -> String {
    dollar_quote(&escape_control(s))
}

/// Backslash-escapes `NUL`, `\n`, `\r`, `\b`, `\t`, `\x1a` and the backslash.
#[must_use]
pub fn escape_control(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\u{1a}' => out.push_str("\\Z"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps `payload` in `$tag$…$tag$`, choosing the first of `$cartodb$`,
/// `$cartodb0$`, `$cartodb1$`, … that cannot terminate the literal early.
#[must_use]
pub fn dollar_quote(payload: &str) -> String {
    let tag = negotiate_tag(payload);
    format!("{tag}{payload}{tag}")
}

/// Returns the dollar-quote tag `dollar_quote` would use for `payload`.
#[must_use]
pub fn negotiate_tag(payload: &str) -> String {
    let base = format!("${TAG_BASE}$");
    if closes_only_at_end(payload, &base) {
        return base;
    }
    let mut i: u64 = 0;
    loop {
        let tag = format!("${TAG_BASE}{i}$");
        if closes_only_at_end(payload, &tag) {
            return tag;
        }
        i += 1;
    }
}

// The server scans for the closing tag from the start of the payload. The tag
// is safe when its first occurrence in `payload + tag` is the closing one,
// which rules out both an embedded tag and a payload suffix that completes it.
fn closes_only_at_end(payload: &str, tag: &str) -> bool {
    let mut candidate = String::with_capacity(payload.len() + tag.len());
    candidate.push_str(payload);
    candidate.push_str(tag);
    candidate.find(tag) == Some(payload.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Geometry, Raw};
    use chrono::TimeZone as _;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, 9, 23, 5, 7).unwrap()
            + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode(&SqlValue::Null, TimeZone::Local).unwrap(), "NULL");
        assert_eq!(encode(&SqlValue::Bool(true), TimeZone::Local).unwrap(), "true");
        assert_eq!(encode(&SqlValue::Bool(false), TimeZone::Local).unwrap(), "false");
        assert_eq!(
            encode(&SqlValue::Int(-100), TimeZone::Local).unwrap(),
            "numeric $$-100$$"
        );
        assert_eq!(
            encode(&SqlValue::Float(2.5), TimeZone::Local).unwrap(),
            "numeric $$2.5$$"
        );
    }

    #[test]
    fn test_float_literals_round_trip() {
        for f in [0.1, -0.000_123, 1e21, 123_456.789, f64::MAX, f64::MIN_POSITIVE] {
            let literal = encode(&SqlValue::Float(f), TimeZone::Local).unwrap();
            let inner = literal
                .strip_prefix("numeric $$")
                .and_then(|s| s.strip_suffix("$$"))
                .unwrap();
            assert_eq!(inner.parse::<f64>().unwrap(), f, "literal {literal}");
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                encode(&SqlValue::Float(f), TimeZone::Local),
                Err(EncodingError::NonFiniteNumber(_))
            ));
        }
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(
            encode(&SqlValue::Text("it's".into()), TimeZone::Local).unwrap(),
            "$cartodb$it's$cartodb$"
        );
    }

    #[test]
    fn test_sql_injection_prevention() {
        let malicious = "'; DROP TABLE users; --";
        let literal = encode(&SqlValue::Text(malicious.into()), TimeZone::Local).unwrap();
        assert_eq!(literal, "$cartodb$'; DROP TABLE users; --$cartodb$");
    }

    #[test]
    fn test_control_characters_escaped() {
        assert_eq!(
            quote_string("a\nb\tc\0d\r\u{8}\u{1a}\\"),
            "$cartodb$a\\nb\\tc\\0d\\r\\b\\Z\\\\$cartodb$"
        );
    }

    #[test]
    fn test_tag_negotiation_skips_embedded_tags() {
        assert_eq!(negotiate_tag("plain"), "$cartodb$");
        assert_eq!(negotiate_tag("x $cartodb$ y"), "$cartodb0$");
        assert_eq!(negotiate_tag("$cartodb$ $cartodb0$ $cartodb1$"), "$cartodb2$");
    }

    #[test]
    fn test_tag_negotiation_rejects_completing_suffix() {
        // "…$cartodb" followed by "$cartodb$" would close at the payload's "$cartodb$".
        assert_eq!(negotiate_tag("x$cartodb"), "$cartodb0$");
        assert_eq!(negotiate_tag("x$cartodb0"), "$cartodb$");
        assert_eq!(negotiate_tag("$cartodb$y$cartodb0"), "$cartodb1$");
    }

    #[test]
    fn test_encode_blob() {
        assert_eq!(
            encode(&SqlValue::Blob(vec![0x48, 0x45, 0x4c, 0x4c, 0x4f]), TimeZone::Local).unwrap(),
            "$$\\x48454c4c4f$$"
        );
    }

    #[test]
    fn test_encode_geometry() {
        let literal = encode(&SqlValue::Geometry(Geometry::point(1.0, 2.0)), TimeZone::Local)
            .unwrap();
        assert_eq!(
            literal,
            "ST_SetSRID(ST_GeomFromGeoJSON($cartodb${\"coordinates\":[1.0,2.0],\"type\":\"Point\"}$cartodb$), 4326)"
        );
    }

    #[test]
    fn test_encode_json() {
        let literal = encode(&SqlValue::Json(json!({"a": [1, "b"]})), TimeZone::Local).unwrap();
        assert_eq!(literal, "$cartodb${\"a\":[1,\"b\"]}$cartodb$");
    }

    #[test]
    fn test_encode_nested_raw_fails() {
        let raw = SqlValue::Raw(Box::new(Raw::new("now()")));
        assert_eq!(encode(&raw, TimeZone::Local), Err(EncodingError::NestedRaw));
    }

    #[test]
    fn test_timestamp_in_offsets() {
        assert_eq!(format_timestamp(&ts(), TimeZone::utc()), "2016-03-09 23:05:07.042");
        let plus_two: TimeZone = "+02:00".parse().unwrap();
        assert_eq!(format_timestamp(&ts(), plus_two), "2016-03-10 01:05:07.042");
        let minus_half: TimeZone = "-0530".parse().unwrap();
        assert_eq!(format_timestamp(&ts(), minus_half), "2016-03-09 17:35:07.042");
        assert_eq!(
            encode(&SqlValue::Timestamp(ts()), TimeZone::utc()).unwrap(),
            "$cartodb$2016-03-09 23:05:07.042$cartodb$"
        );
    }

    #[test]
    fn test_timezone_parsing() {
        assert_eq!("local".parse::<TimeZone>().unwrap(), TimeZone::Local);
        assert_eq!("Z".parse::<TimeZone>().unwrap(), TimeZone::utc());
        assert_eq!(
            "+05".parse::<TimeZone>().unwrap(),
            TimeZone::Offset(FixedOffset::east_opt(5 * 3600).unwrap())
        );
        assert!(matches!(
            "Europe/Paris".parse::<TimeZone>(),
            Err(EncodingError::InvalidTimeZone(_))
        ));
        assert!("+99:00".parse::<TimeZone>().is_err());
    }
}
