// Copyright 2026 The mdcore Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// The wire/schema type tag of a field. Order matches the 1-byte type tag
/// used by the unpacked binary framing (see [`FieldType::wire_tag`]).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum FieldType {
    Undefined,
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    /// Integer mantissa plus a `hint` in `0..=14` selecting one of fifteen
    /// negative powers of ten; converts losslessly to `Double` within that
    /// precision.
    Real,
    Date,
    Time,
    TimeSec,
    DateTime,
    UnixTime,
    ByteStream,
    /// Length-prefixed array of `Double` sharing one decimal precision.
    Vector,
}

impl FieldType {
    pub const ALL: [FieldType; 16] = [
        FieldType::Undefined,
        FieldType::String,
        FieldType::Int8,
        FieldType::Int16,
        FieldType::Int32,
        FieldType::Int64,
        FieldType::Float,
        FieldType::Double,
        FieldType::Real,
        FieldType::Date,
        FieldType::Time,
        FieldType::TimeSec,
        FieldType::DateTime,
        FieldType::UnixTime,
        FieldType::ByteStream,
        FieldType::Vector,
    ];

    /// The 1-byte type tag used by the unpacked binary framing.
    pub fn wire_tag(self) -> u8 {
        match self {
            FieldType::Undefined => 0,
            FieldType::String => 1,
            FieldType::Int8 => 2,
            FieldType::Int16 => 3,
            FieldType::Int32 => 4,
            FieldType::Int64 => 5,
            FieldType::Float => 6,
            FieldType::Double => 7,
            FieldType::Real => 8,
            FieldType::Date => 9,
            FieldType::Time => 10,
            FieldType::TimeSec => 11,
            FieldType::DateTime => 12,
            FieldType::UnixTime => 13,
            FieldType::ByteStream => 14,
            FieldType::Vector => 15,
        }
    }

    pub fn from_wire_tag(tag: u8) -> Option<FieldType> {
        Some(match tag {
            0 => FieldType::Undefined,
            1 => FieldType::String,
            2 => FieldType::Int8,
            3 => FieldType::Int16,
            4 => FieldType::Int32,
            5 => FieldType::Int64,
            6 => FieldType::Float,
            7 => FieldType::Double,
            8 => FieldType::Real,
            9 => FieldType::Date,
            10 => FieldType::Time,
            11 => FieldType::TimeSec,
            12 => FieldType::DateTime,
            13 => FieldType::UnixTime,
            14 => FieldType::ByteStream,
            15 => FieldType::Vector,
            _ => return None,
        })
    }

    /// Whether the on-wire/on-disk representation of this type has a fixed
    /// byte width (as opposed to carrying a `u16` length prefix).
    pub fn is_fixed_width(self) -> bool {
        !matches!(self, FieldType::String | FieldType::ByteStream | FieldType::Vector)
    }

    /// The lowercase name used in a schema definition file's `type` column.
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Undefined => "undefined",
            FieldType::String => "string",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Real => "real",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::TimeSec => "time_sec",
            FieldType::DateTime => "date_time",
            FieldType::UnixTime => "unix_time",
            FieldType::ByteStream => "byte_stream",
            FieldType::Vector => "vector",
        }
    }

    pub fn from_name(name: &str) -> Option<FieldType> {
        Some(match name {
            "undefined" => FieldType::Undefined,
            "string" => FieldType::String,
            "int8" => FieldType::Int8,
            "int16" => FieldType::Int16,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "float" => FieldType::Float,
            "double" => FieldType::Double,
            "real" => FieldType::Real,
            "date" => FieldType::Date,
            "time" => FieldType::Time,
            "time_sec" => FieldType::TimeSec,
            "date_time" => FieldType::DateTime,
            "unix_time" => FieldType::UnixTime,
            "byte_stream" => FieldType::ByteStream,
            "vector" => FieldType::Vector,
            _ => return None,
        })
    }
}

/// Fifteen powers of ten a [`FieldValue::Real`] hint may select, indexed by
/// the hint itself (`hint in 0..=14`).
pub const REAL_SCALE: [i64; 15] = [
    1,
    10,
    100,
    1_000,
    10_000,
    100_000,
    1_000_000,
    10_000_000,
    100_000_000,
    1_000_000_000,
    10_000_000_000,
    100_000_000_000,
    1_000_000_000_000,
    10_000_000_000_000,
    100_000_000_000_000,
];

/// A concrete field value, tagged by the [`FieldType`] it was produced as.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Undefined,
    String(String),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    /// `mantissa * 10.pow(-hint)`. `hint` must be `0..=14`.
    Real { mantissa: i64, hint: u8 },
    /// Days since the Unix epoch.
    Date(i32),
    /// Milliseconds since midnight.
    Time(i32),
    /// Seconds since midnight.
    TimeSec(i32),
    /// Seconds since the Unix epoch.
    DateTime(i64),
    /// Seconds since the Unix epoch (kept distinct from `DateTime` because
    /// the wire reserves a separate type tag for it).
    UnixTime(i64),
    ByteStream(Vec<u8>),
    /// Shared decimal `precision`; on the wire each value is stored as
    /// `round(value * 10.pow(precision))`.
    Vector { precision: u8, values: Vec<f64> },
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Undefined => FieldType::Undefined,
            FieldValue::String(_) => FieldType::String,
            FieldValue::Int8(_) => FieldType::Int8,
            FieldValue::Int16(_) => FieldType::Int16,
            FieldValue::Int32(_) => FieldType::Int32,
            FieldValue::Int64(_) => FieldType::Int64,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Real { .. } => FieldType::Real,
            FieldValue::Date(_) => FieldType::Date,
            FieldValue::Time(_) => FieldType::Time,
            FieldValue::TimeSec(_) => FieldType::TimeSec,
            FieldValue::DateTime(_) => FieldType::DateTime,
            FieldValue::UnixTime(_) => FieldType::UnixTime,
            FieldValue::ByteStream(_) => FieldType::ByteStream,
            FieldValue::Vector { .. } => FieldType::Vector,
        }
    }

    /// Lossless conversion to `Double`, valid for every numeric variant.
    /// Non-numeric variants (`String`, `ByteStream`, `Vector`, `Undefined`)
    /// return `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Int8(v) => Some(v as f64),
            FieldValue::Int16(v) => Some(v as f64),
            FieldValue::Int32(v) => Some(v as f64),
            FieldValue::Int64(v) => Some(v as f64),
            FieldValue::Float(v) => Some(v as f64),
            FieldValue::Double(v) => Some(v),
            FieldValue::Real { mantissa, hint } => {
                let hint = hint.min(14) as usize;
                Some(mantissa as f64 / REAL_SCALE[hint] as f64)
            }
            FieldValue::Date(v) => Some(v as f64),
            FieldValue::Time(v) => Some(v as f64),
            FieldValue::TimeSec(v) => Some(v as f64),
            FieldValue::DateTime(v) => Some(v as f64),
            FieldValue::UnixTime(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Render as the ASCII representation used by the XML and MarketFeed
    /// framings, which carry every value as text.
    pub fn to_ascii(&self) -> String {
        match self {
            FieldValue::Undefined => String::new(),
            FieldValue::String(s) => s.clone(),
            FieldValue::Int8(v) => v.to_string(),
            FieldValue::Int16(v) => v.to_string(),
            FieldValue::Int32(v) => v.to_string(),
            FieldValue::Int64(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Double(v) => v.to_string(),
            FieldValue::Real { mantissa, hint } => {
                let hint = (*hint).min(14) as usize;
                format!("{:.*}", hint, *mantissa as f64 / REAL_SCALE[hint] as f64)
            }
            FieldValue::Date(v) => v.to_string(),
            FieldValue::Time(v) => v.to_string(),
            FieldValue::TimeSec(v) => v.to_string(),
            FieldValue::DateTime(v) => v.to_string(),
            FieldValue::UnixTime(v) => v.to_string(),
            FieldValue::ByteStream(bytes) => {
                bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
            }
            FieldValue::Vector { values, .. } => values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Convert a decoded ASCII value into `ty`'s native representation, as
    /// used by `nativeField` mode on the MarketFeed framing and by explicit
    /// typing on XML decode.
    pub fn parse_ascii(text: &str, ty: FieldType) -> FieldValue {
        match ty {
            FieldType::Undefined => FieldValue::Undefined,
            FieldType::String => FieldValue::String(text.to_string()),
            FieldType::Int8 => text.parse().map(FieldValue::Int8).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Int16 => text.parse().map(FieldValue::Int16).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Int32 => text.parse().map(FieldValue::Int32).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Int64 => text.parse().map(FieldValue::Int64).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Float => text.parse().map(FieldValue::Float).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Double => parse_fractional(text)
                .map(FieldValue::Double)
                .or_else(|| text.parse().ok().map(FieldValue::Double))
                .unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Real => text
                .parse::<f64>()
                .ok()
                .map(|v| real_from_f64(v, 2))
                .unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Date => text.parse().map(FieldValue::Date).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::Time => text.parse().map(FieldValue::Time).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::TimeSec => text.parse().map(FieldValue::TimeSec).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::DateTime => text.parse().map(FieldValue::DateTime).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::UnixTime => text.parse().map(FieldValue::UnixTime).unwrap_or(FieldValue::String(text.to_string())),
            FieldType::ByteStream => FieldValue::ByteStream(text.as_bytes().to_vec()),
            FieldType::Vector => FieldValue::Vector {
                precision: 6,
                values: text.split(',').filter_map(|s| s.trim().parse().ok()).collect(),
            },
        }
    }
}

pub fn real_from_f64(value: f64, hint: u8) -> FieldValue {
    let hint = hint.min(14);
    let scale = REAL_SCALE[hint as usize] as f64;
    FieldValue::Real {
        mantissa: (value * scale).round() as i64,
        hint,
    }
}

/// Recognizes 32nds-style fractional prices such as `"99 24/32"` and
/// converts them to a plain double (`99 + 24/32 == 99.75`).
pub fn parse_fractional(text: &str) -> Option<f64> {
    let text = text.trim();
    let (whole, rest) = text.split_once(' ')?;
    let (num, den) = rest.split_once('/')?;
    let whole: f64 = whole.parse().ok()?;
    let num: f64 = num.parse().ok()?;
    let den: f64 = den.parse().ok()?;
    if den == 0.0 {
        return None;
    }
    let sign = if whole < 0.0 { -1.0 } else { 1.0 };
    Some(whole + sign * num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_round_trips_within_precision() {
        let v = FieldValue::Real { mantissa: 12055, hint: 2 };
        assert!((v.as_f64().unwrap() - 120.55).abs() < 1e-9);
    }

    #[test]
    fn fractional_price_parses() {
        assert_eq!(parse_fractional("99 24/32"), Some(99.75));
        assert_eq!(parse_fractional("not-a-fraction"), None);
    }

    #[test]
    fn wire_tag_round_trips() {
        for ty in FieldType::ALL {
            assert_eq!(FieldType::from_wire_tag(ty.wire_tag()), Some(ty));
        }
    }

    #[test]
    fn name_round_trips() {
        for ty in FieldType::ALL {
            assert_eq!(FieldType::from_name(ty.name()), Some(ty));
        }
    }
}
