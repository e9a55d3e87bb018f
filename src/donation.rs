//! Reading the `amount` of a donation request.
//!
//! Amounts arrive either as JSON numbers or as strings. Only the integer
//! part counts: fractions are truncated toward zero and anything after the
//! leading digits of a string is ignored. Input with no digits at all is
//! rejected rather than folded into the total.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Body of `PUT /recipients/{id}/donate`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DonationJson {
    #[serde(default)]
    pub amount: Value,
}

pub fn parse_amount(value: &Value) -> Result<i64> {
    match value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                return Ok(n);
            }
            match number.as_f64() {
                Some(f) if f.is_finite() && f.trunc().abs() < i64::MAX as f64 => {
                    Ok(f.trunc() as i64)
                }
                _ => Err(Error::invalid_amount(number.to_string())),
            }
        }
        Value::String(text) => parse_leading_integer(text),
        Value::Null => Err(Error::invalid_amount("missing")),
        other => Err(Error::invalid_amount(other.to_string())),
    }
}

fn parse_leading_integer(text: &str) -> Result<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(Error::invalid_amount(format!("'{text}'")));
    }

    let magnitude: i64 = rest[..digits_len]
        .parse()
        .map_err(|_| Error::invalid_amount(format!("'{text}' is out of range")))?;
    Ok(if negative { -magnitude } else { magnitude })
}
