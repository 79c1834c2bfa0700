//! Forgiving serde adapters for form-style JSON.
//!
//! Web forms send numbers as strings and empty inputs as `""`. These
//! adapters accept a JSON number or a numeric string, and treat `null`,
//! an absent key and a blank string alike as `None`. Use with
//! `#[serde(default, deserialize_with = "...")]`.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// Raw value as text, `None` when null or blank.
fn raw_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_owned())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a number or string, got {other}"
        ))),
    }
}

fn parse_opt<'de, D, T>(deserializer: D, what: &'static str) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    raw_text(deserializer)?
        .map(|s| {
            s.parse::<T>()
                .map_err(|_| de::Error::custom(format!("'{s}' is not a valid {what}")))
        })
        .transpose()
}

pub fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_opt(deserializer, "integer")
}

pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_opt(deserializer, "integer")
}

pub fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    raw_text(deserializer)?
        .map(|s| {
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map_err(|_| de::Error::custom(format!("'{s}' is not a valid amount")))
        })
        .transpose()
}

/// `yyyy-MM-dd`
pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    raw_text(deserializer)?
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| de::Error::custom(format!("'{s}' is not a yyyy-MM-dd date")))
        })
        .transpose()
}

/// Times travel as `HH:mm`; `HH:mm:ss` is accepted on input.
pub mod hm_time {
    use super::*;

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        raw_text(deserializer)?
            .map(|s| {
                NaiveTime::parse_from_str(&s, FORMAT)
                    .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                    .map_err(|_| de::Error::custom(format!("'{s}' is not an HH:mm time")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Deserialize, Serialize, Debug, Default)]
    struct Form {
        #[serde(default, deserialize_with = "opt_i32")]
        quantity: Option<i32>,
        #[serde(default, deserialize_with = "opt_i64")]
        user_id: Option<i64>,
        #[serde(default, deserialize_with = "opt_decimal")]
        price: Option<Decimal>,
        #[serde(default, deserialize_with = "opt_date")]
        date: Option<NaiveDate>,
        #[serde(default, with = "hm_time")]
        time: Option<NaiveTime>,
    }

    #[test]
    fn numbers_and_numeric_strings() {
        let form: Form = serde_json::from_str(
            r#"{"quantity": "3", "user_id": 12, "price": "149.50"}"#,
        )
        .unwrap();
        assert_eq!(form.quantity, Some(3));
        assert_eq!(form.user_id, Some(12));
        assert_eq!(form.price, Some(Decimal::new(14950, 2)));

        let form: Form = serde_json::from_str(r#"{"price": 20.25}"#).unwrap();
        assert_eq!(form.price, Some(Decimal::new(2025, 2)));
    }

    #[test]
    fn blank_null_and_absent_are_none() {
        let form: Form =
            serde_json::from_str(r#"{"quantity": "", "user_id": null, "date": "  "}"#).unwrap();
        assert_eq!(form.quantity, None);
        assert_eq!(form.user_id, None);
        assert_eq!(form.date, None);
        assert_eq!(form.price, None);
        assert_eq!(form.time, None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(serde_json::from_str::<Form>(r#"{"quantity": "three"}"#).is_err());
        assert!(serde_json::from_str::<Form>(r#"{"quantity": [1]}"#).is_err());
        assert!(serde_json::from_str::<Form>(r#"{"date": "12/05/2025"}"#).is_err());
    }

    #[test]
    fn time_formats() {
        let form: Form = serde_json::from_str(r#"{"time": "14:05"}"#).unwrap();
        assert_eq!(form.time, NaiveTime::from_hms_opt(14, 5, 0));

        let form: Form = serde_json::from_str(r#"{"time": "09:30:15"}"#).unwrap();
        assert_eq!(form.time, NaiveTime::from_hms_opt(9, 30, 15));

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["time"], "09:30");
    }
}
