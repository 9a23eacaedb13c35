use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

/// A single value read from a result set or an expectation document.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
}

impl Scalar {
    /// Convert a YAML scalar. Sequences, mappings and tagged values are rejected.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<Self> {
        use serde_yaml::Value;

        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(flag) => Some(Scalar::Bool(*flag)),
            Value::Number(number) => number
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| number.as_f64().map(Scalar::Float)),
            Value::String(text) => Some(Scalar::Text(text.clone())),
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl PartialEq for Scalar {
    /// Exact comparison. Numbers compare by value across representations;
    /// no other coercion happens.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(left), Scalar::Bool(right)) => left == right,
            (Scalar::Text(left), Scalar::Text(right)) => left == right,
            (Scalar::Int(left), Scalar::Int(right)) => left == right,
            (Scalar::Float(left), Scalar::Float(right)) => left == right,
            (Scalar::Decimal(left), Scalar::Decimal(right)) => left == right,
            (Scalar::Int(int), Scalar::Float(float)) | (Scalar::Float(float), Scalar::Int(int)) => {
                int_equals_float(*int, *float)
            }
            (Scalar::Int(int), Scalar::Decimal(dec)) | (Scalar::Decimal(dec), Scalar::Int(int)) => {
                Decimal::from(*int) == *dec
            }
            (Scalar::Float(float), Scalar::Decimal(dec))
            | (Scalar::Decimal(dec), Scalar::Float(float)) => decimal_equals_float(dec, *float),
            _ => false,
        }
    }
}

// 2^63 as f64; every f64 in [-2^63, 2^63) with no fraction fits in an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn int_equals_float(int: i64, float: f64) -> bool {
    float.is_finite()
        && float.fract() == 0.0
        && (-I64_BOUND..I64_BOUND).contains(&float)
        && float as i64 == int
}

/// Exact comparison of `mantissa / 10^scale` with `numerator / 2^bits`.
fn decimal_equals_float(dec: &Decimal, float: f64) -> bool {
    if !float.is_finite() {
        return false;
    }

    let mut scaled = float;
    let mut bits: u32 = 0;
    while scaled.fract() != 0.0 {
        scaled *= 2.0;
        bits += 1;
    }
    // Decimal mantissas stay below 2^96.
    if scaled.abs() >= 2f64.powi(96) {
        return false;
    }
    let numerator = scaled as i128;
    let mantissa = dec.mantissa();
    let scale = dec.scale();

    // mantissa * 2^bits == numerator * 2^scale * 5^scale, after cancelling 2^min(bits, scale).
    let five_pow = 5i128.pow(scale);
    if scale >= bits {
        numerator
            .checked_mul(five_pow)
            .and_then(|value| value.checked_mul(1i128 << (scale - bits)))
            == Some(mantissa)
    } else {
        let shift = bits - scale;
        if shift >= 127 {
            return mantissa == 0 && numerator == 0;
        }
        mantissa.checked_mul(1i128 << shift) == numerator.checked_mul(five_pow)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(value) => write!(f, "{value}"),
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Float(value) => write!(f, "{value}"),
            Scalar::Decimal(value) => write!(f, "{value}"),
            Scalar::Text(value) => write!(f, "{value:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}
