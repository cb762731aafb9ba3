//! Core types for qexec

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DbError, Result};

/// A database value that can represent any SQL type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 32-bit floating point
    Float32(f32),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// UUID
    Uuid(Uuid),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time (hour, minute, second, nanosecond)
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// DateTime with timezone (UTC)
    DateTimeUtc(DateTime<Utc>),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::String(s) => s.parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the variant, used in conversion diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int8(_) => "INT8",
            Value::Int16(_) => "INT16",
            Value::Int32(_) => "INT32",
            Value::Int64(_) => "INT64",
            Value::Float32(_) => "FLOAT32",
            Value::Float64(_) => "FLOAT64",
            Value::Decimal(_) => "DECIMAL",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Uuid(_) => "UUID",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::DateTime(_) => "DATETIME",
            Value::DateTimeUtc(_) => "DATETIME_UTC",
            Value::Json(_) => "JSON",
        }
    }

    /// Coerce this value to the representation of the given SQL type.
    ///
    /// NULL stays NULL for every target type. `SqlType::Other` leaves the
    /// value untouched so driver-specific values pass through.
    pub fn coerce(&self, target: SqlType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }

        let coerced = match target {
            SqlType::Null => Some(Value::Null),
            SqlType::Other => Some(self.clone()),
            SqlType::Bit | SqlType::Boolean => self.to_bool().map(Value::Bool),
            SqlType::TinyInt => self
                .to_integer()
                .and_then(|v| i8::try_from(v).ok())
                .map(Value::Int8),
            SqlType::SmallInt => self
                .to_integer()
                .and_then(|v| i16::try_from(v).ok())
                .map(Value::Int16),
            SqlType::Integer => self
                .to_integer()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int32),
            SqlType::BigInt => self.to_integer().map(Value::Int64),
            SqlType::Real => self.to_float().map(|v| Value::Float32(v as f32)),
            SqlType::Float | SqlType::Double => self.to_float().map(Value::Float64),
            SqlType::Numeric | SqlType::Decimal => self.to_decimal().map(Value::Decimal),
            SqlType::Char
            | SqlType::Varchar
            | SqlType::LongVarchar
            | SqlType::NChar
            | SqlType::NVarchar
            | SqlType::Clob => self.to_text().map(Value::String),
            SqlType::Binary | SqlType::VarBinary | SqlType::LongVarBinary | SqlType::Blob => {
                self.to_bytes().map(Value::Bytes)
            }
            SqlType::Date => self.to_date().map(Value::Date),
            SqlType::Time => self.to_time().map(Value::Time),
            SqlType::Timestamp => self.to_datetime().map(Value::DateTime),
            SqlType::TimestampWithTimezone => self.to_datetime_utc().map(Value::DateTimeUtc),
        };

        coerced.ok_or_else(|| {
            DbError::Conversion(format!("cannot convert {} value '{}' to {}", self.kind(), self, target))
        })
    }

    fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            other => other.to_integer().map(|v| v != 0),
        }
    }

    /// Integer view of the value; fractional numbers are truncated toward zero.
    fn to_integer(&self) -> Option<i64> {
        match self {
            Value::Bool(v) => Some(*v as i64),
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => self.as_i64(),
            Value::Float32(_) | Value::Float64(_) => self.as_f64().and_then(truncate_float),
            Value::Decimal(s) | Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_float))
            }
            _ => None,
        }
    }

    fn to_float(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
                self.as_i64().map(|v| v as f64)
            }
            Value::Float32(_) | Value::Float64(_) => self.as_f64(),
            Value::Decimal(s) | Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn to_decimal(&self) -> Option<String> {
        match self {
            Value::Decimal(s) => Some(s.clone()),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<f64>().ok().map(|_| s.to_string())
            }
            Value::Int8(_) | Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => {
                self.as_i64().map(|v| v.to_string())
            }
            Value::Float32(_) | Value::Float64(_) => self
                .as_f64()
                .filter(|v| v.is_finite())
                .map(|v| v.to_string()),
            _ => None,
        }
    }

    fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::Decimal(s) => Some(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.clone()).ok(),
            Value::DateTimeUtc(dt) => Some(dt.to_rfc3339()),
            other => Some(other.to_string()),
        }
    }

    fn to_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Bytes(b) => Some(b.clone()),
            Value::String(s) => Some(s.as_bytes().to_vec()),
            Value::Uuid(u) => Some(u.as_bytes().to_vec()),
            _ => None,
        }
    }

    fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date()),
            Value::DateTimeUtc(dt) => Some(dt.date_naive()),
            Value::String(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()))
            }
            _ => None,
        }
    }

    fn to_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(t) => Some(*t),
            Value::DateTime(dt) => Some(dt.time()),
            Value::DateTimeUtc(dt) => Some(dt.time()),
            Value::String(s) => {
                let s = s.trim();
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                    .ok()
                    .or_else(|| parse_naive_datetime(s).map(|dt| dt.time()))
            }
            _ => None,
        }
    }

    fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::DateTimeUtc(dt) => Some(dt.naive_utc()),
            Value::Date(d) => d.and_hms_opt(0, 0, 0),
            Value::String(s) => {
                let s = s.trim();
                parse_naive_datetime(s).or_else(|| {
                    DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|dt| dt.naive_utc())
                })
            }
            _ => None,
        }
    }

    fn to_datetime_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTimeUtc(dt) => Some(*dt),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
                .or_else(|| self.to_datetime().map(|dt| dt.and_utc())),
            other => other.to_datetime().map(|dt| dt.and_utc()),
        }
    }
}

fn truncate_float(v: f64) -> Option<i64> {
    if v.is_finite() && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::DateTimeUtc(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_value_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => DateTime,
    DateTime<Utc> => DateTimeUtc,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// SQL type codes used for declared procedure arguments and typed reads.
///
/// Discriminants follow the widely used JDBC `java.sql.Types` numbering so
/// catalogs written for other tooling can be reused unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
#[repr(i32)]
pub enum SqlType {
    Bit = -7,
    TinyInt = -6,
    SmallInt = 5,
    Integer = 4,
    BigInt = -5,
    Real = 7,
    Float = 6,
    Double = 8,
    Numeric = 2,
    Decimal = 3,
    Char = 1,
    Varchar = 12,
    LongVarchar = -1,
    NChar = -15,
    NVarchar = -9,
    Clob = 2005,
    Binary = -2,
    VarBinary = -3,
    LongVarBinary = -4,
    Blob = 2004,
    Date = 91,
    Time = 92,
    Timestamp = 93,
    TimestampWithTimezone = 2014,
    Boolean = 16,
    Null = 0,
    Other = 1111,
}

impl SqlType {
    const ALL: [SqlType; 27] = [
        SqlType::Bit,
        SqlType::TinyInt,
        SqlType::SmallInt,
        SqlType::Integer,
        SqlType::BigInt,
        SqlType::Real,
        SqlType::Float,
        SqlType::Double,
        SqlType::Numeric,
        SqlType::Decimal,
        SqlType::Char,
        SqlType::Varchar,
        SqlType::LongVarchar,
        SqlType::NChar,
        SqlType::NVarchar,
        SqlType::Clob,
        SqlType::Binary,
        SqlType::VarBinary,
        SqlType::LongVarBinary,
        SqlType::Blob,
        SqlType::Date,
        SqlType::Time,
        SqlType::Timestamp,
        SqlType::TimestampWithTimezone,
        SqlType::Boolean,
        SqlType::Null,
        SqlType::Other,
    ];

    /// Numeric type code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up a type by its numeric code
    pub fn from_code(code: i32) -> Option<SqlType> {
        Self::ALL.iter().copied().find(|t| t.code() == code)
    }

    /// Canonical upper-case name, as used in catalogs
    pub fn name(self) -> &'static str {
        match self {
            SqlType::Bit => "BIT",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INTEGER",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Numeric => "NUMERIC",
            SqlType::Decimal => "DECIMAL",
            SqlType::Char => "CHAR",
            SqlType::Varchar => "VARCHAR",
            SqlType::LongVarchar => "LONGVARCHAR",
            SqlType::NChar => "NCHAR",
            SqlType::NVarchar => "NVARCHAR",
            SqlType::Clob => "CLOB",
            SqlType::Binary => "BINARY",
            SqlType::VarBinary => "VARBINARY",
            SqlType::LongVarBinary => "LONGVARBINARY",
            SqlType::Blob => "BLOB",
            SqlType::Date => "DATE",
            SqlType::Time => "TIME",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Null => "NULL",
            SqlType::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for SqlType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let alias = match upper.as_str() {
            "INT" => Some(SqlType::Integer),
            "TEXT" => Some(SqlType::Varchar),
            "BOOL" => Some(SqlType::Boolean),
            _ => None,
        };
        alias
            .or_else(|| Self::ALL.iter().copied().find(|t| t.name() == upper))
            .or_else(|| upper.parse::<i32>().ok().and_then(Self::from_code))
            .ok_or_else(|| DbError::Configuration(format!("unknown SQL type '{}'", s)))
    }
}

impl TryFrom<String> for SqlType {
    type Error = DbError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<SqlType> for &'static str {
    fn from(t: SqlType) -> Self {
        t.name()
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColumnMeta {
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Data type (database-specific string)
    #[serde(default)]
    pub data_type: String,
    /// Whether the column can be NULL
    #[serde(default)]
    pub nullable: bool,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
}

/// Conversion from a database [`Value`] into a Rust type.
///
/// `SQL_TYPE` is the type code handed to the driver's typed column accessor
/// before `from_value` runs, so the driver gets a chance to coerce first.
pub trait FromValue: Sized {
    const SQL_TYPE: SqlType;

    fn from_value(value: Value) -> Result<Self>;
}

fn conversion_error(value: &Value, target: &str) -> DbError {
    DbError::Conversion(format!("cannot convert {} value '{}' to {}", value.kind(), value, target))
}

macro_rules! impl_from_value {
    ($ty:ty, $sql_type:expr, $($pattern:pat => $out:expr),+ $(,)?) => {
        impl FromValue for $ty {
            const SQL_TYPE: SqlType = $sql_type;

            fn from_value(value: Value) -> Result<Self> {
                match value.coerce(Self::SQL_TYPE)? {
                    $($pattern => Ok($out),)+
                    other => Err(conversion_error(&other, stringify!($ty))),
                }
            }
        }
    };
}

impl_from_value!(bool, SqlType::Boolean, Value::Bool(v) => v);
impl_from_value!(i8, SqlType::TinyInt, Value::Int8(v) => v);
impl_from_value!(i16, SqlType::SmallInt, Value::Int16(v) => v);
impl_from_value!(i32, SqlType::Integer, Value::Int32(v) => v);
impl_from_value!(i64, SqlType::BigInt, Value::Int64(v) => v);
impl_from_value!(f32, SqlType::Real, Value::Float32(v) => v);
impl_from_value!(f64, SqlType::Double, Value::Float64(v) => v);
impl_from_value!(String, SqlType::Varchar, Value::String(v) => v);
impl_from_value!(Vec<u8>, SqlType::VarBinary, Value::Bytes(v) => v);
impl_from_value!(NaiveDate, SqlType::Date, Value::Date(v) => v);
impl_from_value!(NaiveTime, SqlType::Time, Value::Time(v) => v);
impl_from_value!(NaiveDateTime, SqlType::Timestamp, Value::DateTime(v) => v);
impl_from_value!(DateTime<Utc>, SqlType::TimestampWithTimezone, Value::DateTimeUtc(v) => v);

impl FromValue for Value {
    const SQL_TYPE: SqlType = SqlType::Other;

    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

/// SQL NULL converts to `None`; anything else goes through `T`
impl<T: FromValue> FromValue for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Uuid {
    const SQL_TYPE: SqlType = SqlType::Other;

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => Uuid::parse_str(s.trim()).map_err(|_| conversion_error(&value, "Uuid")),
            Value::Bytes(b) => Uuid::from_slice(b).map_err(|_| conversion_error(&value, "Uuid")),
            _ => Err(conversion_error(&value, "Uuid")),
        }
    }
}

impl FromValue for serde_json::Value {
    const SQL_TYPE: SqlType = SqlType::Other;

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::String(s) => serde_json::from_str(&s)
                .map_err(|e| DbError::Conversion(format!("invalid JSON text: {}", e))),
            other => Err(conversion_error(&other, "serde_json::Value")),
        }
    }
}

#[cfg(test)]
mod tests;
