//! Cell values read from the source and their rendering as SQL literals.
//!
//! Rendering is driven by the column's declared type, not by the Rust
//! variant: a `Text` value in a `json` column is re-serialized as JSON, an
//! `Int` in a `text` column is quoted.

use std::fmt;
use std::io;

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Timelike};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::errors::DumpError;
use crate::sql::quote_literal;

pub const NULL: &str = "NULL";

/// Declared-type prefixes whose values must be written as quoted literals.
const QUOTED_TYPE_PREFIXES: &[&str] = &[
    "character",
    "geography",
    "geometry",
    "text",
    "citext",
    "uuid",
    "date",
    "time",
    "interval",
    "inet",
    "cidr",
    "macaddr",
    "bytea",
    "name",
    "xml",
    "tsvector",
    "bit",
];

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Text form of any type the reader does not decode natively.
    Text(String),
    Json(serde_json::Value),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// ISO-8601 form for timestamps, the plain text form for anything else.
    /// Fractional seconds are written as microseconds, and only when non-zero.
    pub fn to_iso8601(&self) -> String {
        match self {
            SqlValue::Timestamp(ts) if ts.nanosecond() == 0 => {
                ts.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
            SqlValue::Timestamp(ts) => ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            SqlValue::TimestampTz(ts) if ts.nanosecond() == 0 => {
                ts.to_rfc3339_opts(SecondsFormat::Secs, false)
            }
            SqlValue::TimestampTz(ts) => ts.to_rfc3339_opts(SecondsFormat::Micros, false),
            other => other.to_string(),
        }
    }

    /// Canonical JSON text, with a space after `:` and `,`.
    ///
    /// `Text` is parsed first so that JSON read as a string is normalized the
    /// same way as JSON decoded natively.
    pub fn to_json_text(&self) -> Result<String, DumpError> {
        let json = match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| {
                    DumpError::Encoding(format!("{} is not representable as JSON", f))
                })?,
            SqlValue::Text(s) => serde_json::from_str(s)
                .map_err(|e| DumpError::Encoding(format!("invalid JSON text {:?}: {}", s, e)))?,
            SqlValue::Json(v) => v.clone(),
            SqlValue::Timestamp(_) | SqlValue::TimestampTz(_) => {
                serde_json::Value::String(self.to_iso8601())
            }
        };

        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        json.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| DumpError::Encoding(e.to_string()))
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str(NULL),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Float(v) if v.is_nan() => f.write_str("NaN"),
            SqlValue::Float(v) if v.is_infinite() && *v > 0.0 => f.write_str("Infinity"),
            SqlValue::Float(v) if v.is_infinite() => f.write_str("-Infinity"),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Json(v) => write!(f, "{}", v),
            SqlValue::Timestamp(_) | SqlValue::TimestampTz(_) => f.write_str(&self.to_iso8601()),
        }
    }
}

/// How a declared column type is written in an `INSERT` literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    Quoted,
    Json,
    Timestamp,
    /// Numeric, boolean and anything unrecognized.
    Bare,
}

impl ValueClass {
    pub fn of(declared_type: &str) -> Self {
        let t = declared_type.trim().to_ascii_lowercase();
        // Arrays of any element type arrive in their text form.
        if t.ends_with("[]") {
            ValueClass::Quoted
        } else if t.starts_with("json") {
            ValueClass::Json
        } else if t.starts_with("timestamp") {
            ValueClass::Timestamp
        } else if QUOTED_TYPE_PREFIXES.iter().any(|p| t.starts_with(p)) {
            ValueClass::Quoted
        } else {
            ValueClass::Bare
        }
    }
}

/// Render one value as a SQL literal for a column of `declared_type`.
pub fn render_literal(value: &SqlValue, declared_type: &str) -> Result<String, DumpError> {
    if value.is_null() {
        return Ok(NULL.to_string());
    }

    let literal = match ValueClass::of(declared_type) {
        ValueClass::Json => quote_literal(&value.to_json_text()?),
        ValueClass::Timestamp => quote_literal(&value.to_iso8601()),
        ValueClass::Quoted => quote_literal(&value.to_string()),
        ValueClass::Bare => match value {
            SqlValue::Float(f) if !f.is_finite() => quote_literal(&value.to_string()),
            SqlValue::Text(s) if is_special_number(s) => quote_literal(s),
            _ => value.to_string(),
        },
    };
    Ok(literal)
}

/// `NaN` and the infinities, as `numeric` and the float types print them.
fn is_special_number(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "nan" | "infinity" | "+infinity" | "-infinity" | "inf" | "+inf" | "-inf"
    )
}

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
