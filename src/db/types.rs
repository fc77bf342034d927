//! Row materialization.
//!
//! This module turns PostgreSQL rows into JSON maps and renames columns from
//! the store's snake_case convention to the camelCase convention the rest of
//! the platform consumes.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Per-category decoders handle the actual value extraction
//!
//! Field renaming happens once per column, after decoding, so every consumer
//! of a [`RowSet`](crate::models::RowSet) sees the same naming convention.
//!
//! Statements without parameters travel over the simple protocol and come
//! back as text; parameterized ones come back in binary. Types without a
//! native decoder go through [`PgText`], which yields the same text in both
//! cases.

use chrono::{NaiveTime, Timelike};
use serde_json::Value as JsonValue;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::PgInterval;
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind, PgValueFormat, PgValueRef, Postgres};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Field Naming
// =============================================================================

/// Convert a snake_case identifier to camelCase.
///
/// Leading underscores are preserved, repeated underscores collapse, and
/// identifiers that are already camelCase pass through unchanged.
pub fn snake_to_camel(name: &str) -> String {
    let trimmed = name.trim_start_matches('_');
    let prefix = &name[..name.len() - trimmed.len()];

    let mut out = String::with_capacity(name.len());
    out.push_str(prefix);

    let mut upper_next = false;
    for ch in trimmed.chars() {
        if ch == '_' {
            upper_next = out.len() > prefix.len();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Interval,
    Numeric,
    TsVector,
    TextArray,
    Unknown,
}

/// Classify a PostgreSQL type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    match lower.as_str() {
        "int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "serial" | "bigserial" => {
            TypeCategory::Integer
        }
        "float4" | "float8" | "real" | "double precision" => TypeCategory::Float,
        "bool" | "boolean" => TypeCategory::Boolean,
        "text" | "varchar" | "bpchar" | "char" | "name" | "citext" => TypeCategory::Text,
        "bytea" => TypeCategory::Binary,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "timestamp" => TypeCategory::Timestamp,
        "timestamptz" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "interval" => TypeCategory::Interval,
        "numeric" | "decimal" => TypeCategory::Numeric,
        "tsvector" => TypeCategory::TsVector,
        "text[]" | "varchar[]" | "_text" | "_varchar" => TypeCategory::TextArray,
        // Enum types and everything else
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Text Rendering
// =============================================================================

/// A column value as PostgreSQL prints it in text mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgText(pub String);

impl Type<Postgres> for PgText {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(_ty: &PgTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, Postgres> for PgText {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        if value.format() == PgValueFormat::Text {
            return Ok(PgText(value.as_str()?.to_string()));
        }

        let type_info = value.type_info().into_owned();
        let rendered = match categorize_type(type_info.name()) {
            TypeCategory::Numeric => render_numeric(value.as_bytes()?)?,
            TypeCategory::Interval => {
                render_interval(&<PgInterval as Decode<Postgres>>::decode(value)?)
            }
            TypeCategory::Time => render_time(<NaiveTime as Decode<Postgres>>::decode(value)?),
            TypeCategory::TsVector => render_tsvector(value.as_bytes()?)?,
            // Enum labels are sent as their text in both formats
            _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => value.as_str()?.to_string(),
            _ => {
                return Err(format!("no text rendering for binary `{}`", type_info.name()).into());
            }
        };
        Ok(PgText(rendered))
    }
}

/// Big-endian reader over a binary wire value.
struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BoxDynError> {
        if self.buf.len() < n {
            return Err("truncated binary value".into());
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16, BoxDynError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Result<i16, BoxDynError> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    fn i32(&mut self) -> Result<i32, BoxDynError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn cstr(&mut self) -> Result<&'a str, BoxDynError> {
        let end = self
            .buf
            .iter()
            .position(|&b| b == 0)
            .ok_or("unterminated string in binary value")?;
        let s = std::str::from_utf8(&self.buf[..end])?;
        self.buf = &self.buf[end + 1..];
        Ok(s)
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Render a binary `numeric` (base-10000 digit groups) with its display scale.
pub fn render_numeric(buf: &[u8]) -> Result<String, BoxDynError> {
    let mut reader = WireReader::new(buf);
    let ndigits = reader.i16()?;
    let weight = i32::from(reader.i16()?);
    let sign = reader.u16()?;
    let dscale = usize::from(reader.u16()?);

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits.max(0))
        .map(|_| reader.i16())
        .collect::<Result<Vec<_>, _>>()?;
    // Groups outside the stored range are zero
    let group = |pos: i32| -> i16 {
        usize::try_from(pos)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&group(0).to_string());
        for pos in 1..=weight {
            out.push_str(&format!("{:04}", group(pos)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut pos = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", group(pos)));
            pos += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

/// Fractional seconds with trailing zeros removed, or nothing for whole seconds.
fn fractional_seconds(micros: u64) -> String {
    if micros == 0 {
        return String::new();
    }
    format!(".{micros:06}").trim_end_matches('0').to_string()
}

/// Render an interval the way the default `postgres` interval style does.
pub fn render_interval(interval: &PgInterval) -> String {
    let mut out = String::new();
    let mut is_before = false;

    let fields = [
        (interval.months / 12, "year"),
        (interval.months % 12, "mon"),
        (interval.days, "day"),
    ];
    for (value, unit) in fields {
        if value == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        let sign = if is_before && value > 0 { "+" } else { "" };
        let plural = if value == 1 { "" } else { "s" };
        out.push_str(&format!("{sign}{value} {unit}{plural}"));
        is_before = value < 0;
    }

    let micros = interval.microseconds;
    if out.is_empty() || micros != 0 {
        if !out.is_empty() {
            out.push(' ');
        }
        let sign = if micros < 0 {
            "-"
        } else if is_before {
            "+"
        } else {
            ""
        };
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        out.push_str(&format!(
            "{sign}{:02}:{:02}:{:02}{}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60,
            fractional_seconds(abs % 1_000_000)
        ));
    }
    out
}

/// Render a time of day as `HH:MM:SS[.ffffff]`.
pub fn render_time(time: NaiveTime) -> String {
    format!(
        "{}{}",
        time.format("%H:%M:%S"),
        fractional_seconds(u64::from(time.nanosecond() / 1000))
    )
}

/// Render a binary `tsvector` as `'lexeme':pos[weight],...` entries.
pub fn render_tsvector(buf: &[u8]) -> Result<String, BoxDynError> {
    let mut reader = WireReader::new(buf);
    let count = reader.i32()?;
    let mut entries = Vec::with_capacity(usize::try_from(count).unwrap_or(0));

    for _ in 0..count {
        let lexeme = reader.cstr()?;
        let mut entry = format!("'{}'", lexeme.replace('\\', "\\\\").replace('\'', "''"));
        for i in 0..reader.u16()? {
            let word_pos = reader.u16()?;
            entry.push(if i == 0 { ':' } else { ',' });
            entry.push_str(&(word_pos & 0x3fff).to_string());
            match word_pos >> 14 {
                3 => entry.push('A'),
                2 => entry.push('B'),
                1 => entry.push('C'),
                _ => {}
            }
        }
        entries.push(entry);
    }
    Ok(entries.join(" "))
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Encode binary column data as base64 text.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps with camelCase keys.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                let value = postgres::decode_column(self, idx, category);
                (snake_to_camel(col.name()), value)
            })
            .collect()
    }
}

// =============================================================================
// PostgreSQL Decoders
// =============================================================================

mod postgres {
    use super::*;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> JsonValue {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::Timestamp => decode_timestamp(row, idx),
            TypeCategory::TimestampTz => decode_timestamptz(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            TypeCategory::TextArray => decode_text_array(row, idx),
            TypeCategory::Text => decode_text(row, idx),
            TypeCategory::Time
            | TypeCategory::Interval
            | TypeCategory::Numeric
            | TypeCategory::TsVector
            | TypeCategory::Unknown => decode_pg_text(row, idx),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn float_value(v: f64) -> JsonValue {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string()))
    }

    fn decode_binary_col(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_timestamp(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_timestamptz(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_rfc3339()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_date(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::String(v.to_string()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text_array(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<Vec<String>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::Array(v.into_iter().map(JsonValue::String).collect()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null)
    }

    /// Types without a renderer for their binary form decode to NULL.
    fn decode_pg_text(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<PgText>, _>(idx) {
            Ok(Some(PgText(v))) => JsonValue::String(v),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::debug!(column = idx, error = %e, "Undecodable column, returning NULL");
                JsonValue::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_to_camel_basic() {
        assert_eq!(snake_to_camel("created_at"), "createdAt");
        assert_eq!(snake_to_camel("search_vector_en"), "searchVectorEn");
        assert_eq!(snake_to_camel("id"), "id");
    }

    #[test]
    fn test_snake_to_camel_edge_cases() {
        assert_eq!(snake_to_camel("address_line_2"), "addressLine2");
        assert_eq!(snake_to_camel("shelter__id"), "shelterId");
        assert_eq!(snake_to_camel("_internal_flag"), "_internalFlag");
        assert_eq!(snake_to_camel("trailing_"), "trailing");
        assert_eq!(snake_to_camel("alreadyCamel"), "alreadyCamel");
        assert_eq!(snake_to_camel("count"), "count");
        assert_eq!(snake_to_camel(""), "");
    }

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("int8"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT2"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
    }

    #[test]
    fn test_categorize_type_other() {
        assert_eq!(categorize_type("jsonb"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::TextArray);
        assert_eq!(categorize_type("pet_species"), TypeCategory::Unknown);
    }

    #[test]
    fn test_categorize_type_text_rendered() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Numeric);
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Interval);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
        assert_eq!(categorize_type("tsvector"), TypeCategory::TsVector);
    }

    #[test]
    fn test_render_numeric() {
        assert_eq!(render_numeric(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 3]).unwrap(), "3");
        // 12345.670: groups 1 | 2345 | 6700, display scale 3
        let bytes = [0, 3, 0, 1, 0, 0, 0, 3, 0, 1, 0x09, 0x29, 0x1A, 0x2C];
        assert_eq!(render_numeric(&bytes).unwrap(), "12345.670");
        let bytes = [0, 1, 0xFF, 0xFF, 0x40, 0, 0, 2, 0x01, 0xF4];
        assert_eq!(render_numeric(&bytes).unwrap(), "-0.05");
        assert_eq!(render_numeric(&[0, 0, 0, 0, 0, 0, 0, 2]).unwrap(), "0.00");
        // 1e20 stores a single group
        assert_eq!(
            render_numeric(&[0, 1, 0, 5, 0, 0, 0, 0, 0, 1]).unwrap(),
            "100000000000000000000"
        );
        assert_eq!(render_numeric(&[0, 0, 0, 0, 0xC0, 0, 0, 0]).unwrap(), "NaN");
        assert_eq!(render_numeric(&[0, 0, 0, 0, 0xF0, 0, 0, 0]).unwrap(), "-Infinity");
        assert!(render_numeric(&[0, 1]).is_err());
    }

    #[test]
    fn test_render_interval() {
        let interval = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(render_interval(&interval(0, 1, 0)), "1 day");
        assert_eq!(render_interval(&interval(0, 0, 0)), "00:00:00");
        assert_eq!(
            render_interval(&interval(14, 3, 14_706_500_000)),
            "1 year 2 mons 3 days 04:05:06.5"
        );
        assert_eq!(render_interval(&interval(0, -1, 7_200_000_000)), "-1 days +02:00:00");
        assert_eq!(render_interval(&interval(1, -2, 0)), "1 mon -2 days");
        assert_eq!(render_interval(&interval(0, 0, -1_000_000)), "-00:00:01");
        assert_eq!(render_interval(&interval(0, 0, 90_000_000_000)), "25:00:00");
    }

    #[test]
    fn test_render_time() {
        let time = NaiveTime::from_hms_micro_opt(4, 5, 6, 500_000).unwrap();
        assert_eq!(render_time(time), "04:05:06.5");
        let time = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(render_time(time), "23:59:59");
    }

    #[test]
    fn test_render_tsvector() {
        let mut bytes = vec![0, 0, 0, 3];
        bytes.extend_from_slice(b"dog\0");
        bytes.extend_from_slice(&[0, 1, 0, 2]);
        bytes.extend_from_slice(b"happi\0");
        // position 1 with weight A, then position 3
        bytes.extend_from_slice(&[0, 2, 0xC0, 0x01, 0, 3]);
        bytes.extend_from_slice(b"o'neil\0");
        bytes.extend_from_slice(&[0, 0]);

        assert_eq!(
            render_tsvector(&bytes).unwrap(),
            "'dog':2 'happi':1A,3 'o''neil'"
        );
        assert_eq!(render_tsvector(&[0, 0, 0, 0]).unwrap(), "");
        assert!(render_tsvector(&[0, 0, 0, 1, b'x']).is_err());
    }

    #[test]
    fn test_decode_binary_value() {
        assert_eq!(
            decode_binary_value(b"hello world"),
            JsonValue::String("aGVsbG8gd29ybGQ=".to_string())
        );
        assert_eq!(decode_binary_value(&[]), JsonValue::String(String::new()));
    }
}
