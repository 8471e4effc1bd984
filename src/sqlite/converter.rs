// ABOUTME: SQLite to PostgreSQL value conversion guided by destination column types
// ABOUTME: Reinterprets loosely typed SQLite scalars as timestamps, booleans, and JSON text

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::io;

/// Epoch values above this magnitude are milliseconds rather than seconds.
pub const EPOCH_MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Coarse storage class of a SQLite column, derived from its declared type
///
/// SQLite does not enforce declared types. The class follows SQLite's
/// column affinity rules, except that an empty declaration is treated as
/// text rather than blob so untyped columns still get string coercions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl StorageClass {
    /// Map a declared column type (e.g. `VARCHAR(255)`, `BIGINT`) to a class
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.trim().to_ascii_uppercase();

        if upper.contains("INT") {
            StorageClass::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            StorageClass::Text
        } else if upper.contains("BLOB") {
            StorageClass::Blob
        } else if upper.is_empty() {
            StorageClass::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            StorageClass::Real
        } else {
            StorageClass::Numeric
        }
    }
}

/// Category of a PostgreSQL column type that changes how values are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Timestamp,
    Boolean,
    Other,
}

impl DestinationKind {
    /// Classify an `information_schema.columns.data_type` value
    pub fn of(type_name: &str) -> Self {
        let lower = type_name.to_ascii_lowercase();
        if lower.contains("timestamp") {
            DestinationKind::Timestamp
        } else if lower == "boolean" {
            DestinationKind::Boolean
        } else {
            DestinationKind::Other
        }
    }
}

/// A raw value read from the source
///
/// SQLite only ever produces the five storage-class variants. `Bool` and
/// `Json` cover values handed to the converter from other callers.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Json(JsonValue),
}

impl SourceValue {
    /// Build a source value from a JSON value, keeping scalars as scalars
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => SourceValue::Null,
            JsonValue::Bool(b) => SourceValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => SourceValue::Integer(i),
                None => SourceValue::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => SourceValue::Text(s),
            structured => SourceValue::Json(structured),
        }
    }
}

/// Copy a borrowed SQLite cell into an owned value
///
/// SQLite stores TEXT without validating its encoding, so invalid UTF-8 is
/// decoded lossily (U+FFFD) instead of failing the row.
impl From<ValueRef<'_>> for SourceValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SourceValue::Null,
            ValueRef::Integer(i) => SourceValue::Integer(i),
            ValueRef::Real(f) => SourceValue::Real(f),
            ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => SourceValue::Text(text.to_string()),
                Err(_) => {
                    tracing::warn!(
                        "Replacing invalid UTF-8 in TEXT value ({} bytes)",
                        bytes.len()
                    );
                    SourceValue::Text(String::from_utf8_lossy(bytes).into_owned())
                }
            },
            ValueRef::Blob(bytes) => SourceValue::Blob(bytes.to_vec()),
        }
    }
}

/// A value ready to be written to PostgreSQL
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl PgValue {
    /// Render the value in PostgreSQL text input syntax
    ///
    /// Inserts bind every value as `text` and cast it to the column type,
    /// so this is the only encoding the writer needs. `None` means NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            PgValue::Null => None,
            PgValue::Bool(b) => Some(b.to_string()),
            PgValue::Integer(i) => Some(i.to_string()),
            PgValue::Real(f) => Some(if f.is_nan() {
                "NaN".to_string()
            } else if f.is_infinite() {
                if *f > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            } else {
                f.to_string()
            }),
            PgValue::Text(s) => Some(s.clone()),
            PgValue::Bytes(b) => Some(format!("\\x{}", hex::encode(b))),
            PgValue::Timestamp(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Convert a single SQLite value for a PostgreSQL column
///
/// Rules, first match wins:
/// 1. NULL stays NULL.
/// 2. Timestamp columns read positive numbers and all-digit strings as Unix
///    epochs (milliseconds above [`EPOCH_MILLIS_THRESHOLD`], else seconds).
/// 3. Boolean columns read integers as nonzero/zero and strings as one of
///    `true`, `1`, `yes`, `on` (case-insensitive).
/// 4. BLOB columns pass through untouched.
/// 5. Booleans, numbers and bytes pass through.
/// 6. The strings `true` / `false` (any case) become booleans.
/// 7. Objects and arrays become JSON text.
///
/// The destination type wins whenever it disambiguates; without one only
/// the value-shape rules apply. The function is total.
///
/// # Examples
///
/// ```
/// # use sqlite_pg_migrate::sqlite::converter::{convert_value, PgValue, SourceValue, StorageClass};
/// let value = convert_value(SourceValue::Integer(1), StorageClass::Integer, Some("boolean"));
/// assert_eq!(value, PgValue::Bool(true));
/// ```
pub fn convert_value(
    value: SourceValue,
    source_class: StorageClass,
    destination_type: Option<&str>,
) -> PgValue {
    if value == SourceValue::Null {
        return PgValue::Null;
    }

    match destination_type.map(DestinationKind::of) {
        Some(DestinationKind::Timestamp) => {
            if let Some(ts) = epoch_timestamp(&value) {
                return PgValue::Timestamp(ts);
            }
        }
        Some(DestinationKind::Boolean) => {
            if let Some(b) = boolean_hint(&value) {
                return PgValue::Bool(b);
            }
        }
        Some(DestinationKind::Other) | None => {}
    }

    if source_class == StorageClass::Blob {
        return pass_through(value);
    }

    match value {
        SourceValue::Text(s) => {
            if s.eq_ignore_ascii_case("true") {
                PgValue::Bool(true)
            } else if s.eq_ignore_ascii_case("false") {
                PgValue::Bool(false)
            } else {
                PgValue::Text(s)
            }
        }
        other => pass_through(other),
    }
}

/// Serialize structured data as JSON text with `", "` and `": "` separators
pub fn json_to_text(value: &JsonValue) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

fn pass_through(value: SourceValue) -> PgValue {
    match value {
        SourceValue::Null => PgValue::Null,
        SourceValue::Bool(b) => PgValue::Bool(b),
        SourceValue::Integer(i) => PgValue::Integer(i),
        SourceValue::Real(f) => PgValue::Real(f),
        SourceValue::Text(s) => PgValue::Text(s),
        SourceValue::Blob(b) => PgValue::Bytes(b),
        SourceValue::Json(j) => PgValue::Text(json_to_text(&j)),
    }
}

fn epoch_timestamp(value: &SourceValue) -> Option<DateTime<Utc>> {
    match value {
        SourceValue::Integer(i) if *i > 0 => timestamp_from_epoch_int(*i),
        SourceValue::Real(f) if *f > 0.0 => timestamp_from_epoch_float(*f),
        SourceValue::Text(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse::<i64>().ok().and_then(timestamp_from_epoch_int)
        }
        _ => None,
    }
}

fn timestamp_from_epoch_int(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch > EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch)
    } else {
        DateTime::from_timestamp(epoch, 0)
    }
}

fn timestamp_from_epoch_float(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let seconds = if epoch > EPOCH_MILLIS_THRESHOLD as f64 {
        epoch / 1000.0
    } else {
        epoch
    };
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn boolean_hint(value: &SourceValue) -> Option<bool> {
    match value {
        SourceValue::Bool(b) => Some(*b),
        SourceValue::Integer(i) => Some(*i != 0),
        SourceValue::Text(s) => {
            let lower = s.to_ascii_lowercase();
            Some(matches!(lower.as_str(), "true" | "1" | "yes" | "on"))
        }
        _ => None,
    }
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
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
