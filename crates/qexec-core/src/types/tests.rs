//! Tests for value coercion and SQL type codes

use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;

use super::{FromValue, SqlType, Value};
use crate::DbError;

#[test]
fn test_null_coerces_to_null_for_every_type() {
    for sql_type in SqlType::ALL {
        assert_eq!(Value::Null.coerce(sql_type).unwrap(), Value::Null);
    }
}

#[test]
fn test_integer_coercion_truncates_floats_and_parses_text() {
    assert_eq!(
        Value::Float64(3.9).coerce(SqlType::Integer).unwrap(),
        Value::Int32(3)
    );
    assert_eq!(
        Value::String(" 42 ".into()).coerce(SqlType::BigInt).unwrap(),
        Value::Int64(42)
    );
    assert_eq!(
        Value::Decimal("12.50".into()).coerce(SqlType::Integer).unwrap(),
        Value::Int32(12)
    );
    assert_eq!(
        Value::Bool(true).coerce(SqlType::SmallInt).unwrap(),
        Value::Int16(1)
    );
}

#[test]
fn test_integer_coercion_rejects_out_of_range() {
    let err = Value::Int64(300).coerce(SqlType::TinyInt).unwrap_err();
    assert!(matches!(err, DbError::Conversion(_)));

    let err = Value::String("abc".into())
        .coerce(SqlType::Integer)
        .unwrap_err();
    assert!(err.to_string().contains("cannot convert STRING value 'abc' to INTEGER"));
}

#[test]
fn test_text_coercion() {
    assert_eq!(
        Value::Int64(7).coerce(SqlType::Varchar).unwrap(),
        Value::String("7".into())
    );
    assert_eq!(
        Value::Bytes(b"hello".to_vec()).coerce(SqlType::Char).unwrap(),
        Value::String("hello".into())
    );
    assert!(Value::Bytes(vec![0xff, 0xfe]).coerce(SqlType::Varchar).is_err());
}

#[test]
fn test_boolean_coercion() {
    assert_eq!(
        Value::String("yes".into()).coerce(SqlType::Boolean).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        Value::Int64(0).coerce(SqlType::Bit).unwrap(),
        Value::Bool(false)
    );
    assert!(Value::String("maybe".into()).coerce(SqlType::Boolean).is_err());
}

#[test]
fn test_temporal_coercion_from_text() {
    assert_eq!(
        Value::String("2024-03-01".into()).coerce(SqlType::Date).unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    );
    assert_eq!(
        Value::String("2024-03-01 10:20:30".into())
            .coerce(SqlType::Time)
            .unwrap(),
        Value::Time(NaiveTime::from_hms_opt(10, 20, 30).unwrap())
    );

    let ts = Value::String("2024-03-01T10:20:30".into())
        .coerce(SqlType::Timestamp)
        .unwrap();
    assert_eq!(ts.to_string(), "2024-03-01 10:20:30");

    let utc = Value::String("2024-03-01T10:20:30+02:00".into())
        .coerce(SqlType::TimestampWithTimezone)
        .unwrap();
    assert_eq!(utc.to_string(), "2024-03-01 08:20:30 UTC");
}

#[test]
fn test_decimal_coercion_keeps_text_precision() {
    assert_eq!(
        Value::String("10.000000000000000001".into())
            .coerce(SqlType::Decimal)
            .unwrap(),
        Value::Decimal("10.000000000000000001".into())
    );
    assert!(Value::String("ten".into()).coerce(SqlType::Numeric).is_err());
}

#[test]
fn test_other_passes_value_through() {
    let json = Value::Json(serde_json::json!({"a": 1}));
    assert_eq!(json.coerce(SqlType::Other).unwrap(), json);
}

#[test]
fn test_sql_type_codes_round_trip() {
    for sql_type in SqlType::ALL {
        assert_eq!(SqlType::from_code(sql_type.code()), Some(sql_type));
    }
    assert_eq!(SqlType::Varchar.code(), 12);
    assert_eq!(SqlType::Integer.code(), 4);
    assert_eq!(SqlType::from_code(4242), None);
}

#[test]
fn test_sql_type_parsing() {
    assert_eq!("varchar".parse::<SqlType>().unwrap(), SqlType::Varchar);
    assert_eq!("INT".parse::<SqlType>().unwrap(), SqlType::Integer);
    assert_eq!("TIMESTAMP_WITH_TIMEZONE".parse::<SqlType>().unwrap(), SqlType::TimestampWithTimezone);
    assert_eq!("-5".parse::<SqlType>().unwrap(), SqlType::BigInt);
    assert!("GEOMETRY".parse::<SqlType>().is_err());
}

#[test]
fn test_sql_type_serde_uses_names() {
    let json = serde_json::to_string(&vec![SqlType::Integer, SqlType::LongVarchar]).unwrap();
    assert_eq!(json, r#"["INTEGER","LONGVARCHAR"]"#);

    let parsed: Vec<SqlType> = serde_json::from_str(r#"["DOUBLE","nvarchar"]"#).unwrap();
    assert_eq!(parsed, vec![SqlType::Double, SqlType::NVarchar]);
}

#[test]
fn test_from_value_conversions() {
    assert_eq!(i32::from_value(Value::Int64(5)).unwrap(), 5);
    assert_eq!(f64::from_value(Value::String("2.5".into())).unwrap(), 2.5);
    assert_eq!(String::from_value(Value::Int32(9)).unwrap(), "9");
    assert!(bool::from_value(Value::Int8(1)).unwrap());

    let id = uuid::Uuid::new_v4();
    assert_eq!(uuid::Uuid::from_value(Value::String(id.to_string())).unwrap(), id);

    let json = serde_json::Value::from_value(Value::String(r#"{"k":[1,2]}"#.into())).unwrap();
    assert_eq!(json["k"][1], 2);
}

#[test]
fn test_value_from_option() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::String("x".into()));
}

#[test]
fn test_optional_from_value() {
    assert_eq!(<Option<i64>>::from_value(Value::Null).unwrap(), None);
    assert_eq!(
        <Option<i64>>::from_value(Value::String("12".into())).unwrap(),
        Some(12)
    );
    assert_eq!(<Option<String> as FromValue>::SQL_TYPE, SqlType::Varchar);
    assert!(<Option<bool>>::from_value(Value::String("maybe".into())).is_err());
}
