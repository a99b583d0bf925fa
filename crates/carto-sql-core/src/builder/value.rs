//! Typed values bound into statements.
//!
//! Every value that ends up in a statement is one of the [`SqlValue`]
//! variants. The variant is chosen when the value enters a builder, either
//! through [`ToSqlValue`] or through `From<serde_json::Value>`, and the
//! encoder matches on it exhaustively.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::raw::Raw;

/// A SQL value that can be bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Point in time, stored in UTC and rendered in the requested timezone.
    Timestamp(DateTime<Utc>),
    /// Binary blob value.
    Blob(Vec<u8>),
    /// GeoJSON geometry, loaded with SRID 4326.
    Geometry(Geometry),
    /// Arbitrary JSON document.
    Json(Value),
    /// A nested statement spliced in place of its placeholder.
    Raw(Box<Raw>),
}

impl SqlValue {
    /// Short type name used in prepared statement names and error messages.
    #[must_use]
    pub const fn type_tag(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) | Self::Float(_) => "numeric",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Blob(_) => "bytea",
            Self::Geometry(_) => "geometry",
            Self::Json(_) => "json",
            Self::Raw(_) => "raw",
        }
    }

    /// Returns the text if this is a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The seven GeoJSON geometry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// Looks up a kind by its GeoJSON `type` member.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "MultiPoint" => Some(Self::MultiPoint),
            "LineString" => Some(Self::LineString),
            "MultiLineString" => Some(Self::MultiLineString),
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            "GeometryCollection" => Some(Self::GeometryCollection),
            _ => None,
        }
    }

    /// Returns the GeoJSON `type` member.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::MultiPoint => "MultiPoint",
            Self::LineString => "LineString",
            Self::MultiLineString => "MultiLineString",
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
            Self::GeometryCollection => "GeometryCollection",
        }
    }
}

/// A GeoJSON geometry object whose `type` is one of [`GeometryKind`].
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    kind: GeometryKind,
    geojson: Value,
}

impl Geometry {
    /// Accepts a GeoJSON object whose `type` names a geometry.
    ///
    /// Returns `None` for anything else, including `Feature` objects.
    #[must_use]
    pub fn from_geojson(geojson: Value) -> Option<Self> {
        Self::try_from(geojson).ok()
    }

    /// Creates a point geometry.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self {
            kind: GeometryKind::Point,
            geojson: serde_json::json!({ "type": "Point", "coordinates": [x, y] }),
        }
    }

    /// Returns the geometry kind.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        self.kind
    }

    /// Returns the GeoJSON document.
    #[must_use]
    pub const fn as_geojson(&self) -> &Value {
        &self.geojson
    }
}

impl TryFrom<Value> for Geometry {
    type Error = Value;

    /// Hands the document back unchanged when it is not a geometry.
    fn try_from(geojson: Value) -> Result<Self, Value> {
        let kind = geojson
            .get("type")
            .and_then(Value::as_str)
            .and_then(GeometryKind::from_type_name);
        match kind {
            Some(kind) => Ok(Self { kind, geojson }),
            None => Err(geojson),
        }
    }
}

impl From<Value> for SqlValue {
    /// Infers the variant from the JSON shape: objects with a geometry `type`
    /// become [`SqlValue::Geometry`], other objects and arrays stay JSON.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s),
            Value::Array(_) => Self::Json(value),
            Value::Object(_) => match Geometry::try_from(value) {
                Ok(geometry) => Self::Geometry(geometry),
                Err(value) => Self::Json(value),
            },
        }
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for i16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u16 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u8 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(f64::from(self))
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl<Tz: TimeZone> ToSqlValue for DateTime<Tz> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self.with_timezone(&Utc))
    }
}

impl ToSqlValue for Geometry {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Geometry(self)
    }
}

impl ToSqlValue for Value {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::from(self)
    }
}

impl ToSqlValue for Raw {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Raw(Box::new(self))
    }
}
