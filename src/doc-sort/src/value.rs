// Copyright 2023 Greptime Team
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

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::FieldType;

/// Value of a document attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Date(i32),
    Time(i32),
    Timestamp(i64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the [FieldType] of this value, `None` for null.
    pub fn field_type(&self) -> Option<FieldType> {
        let field_type = match self {
            Value::Null => return None,
            Value::Int8(_) => FieldType::Int8,
            Value::Int16(_) => FieldType::Int16,
            Value::Int32(_) => FieldType::Int32,
            Value::Int64(_) => FieldType::Int64,
            Value::UInt8(_) => FieldType::UInt8,
            Value::UInt16(_) => FieldType::UInt16,
            Value::UInt32(_) => FieldType::UInt32,
            Value::UInt64(_) => FieldType::UInt64,
            Value::Float32(_) => FieldType::Float32,
            Value::Float64(_) => FieldType::Float64,
            Value::Date(_) => FieldType::Date,
            Value::Time(_) => FieldType::Time,
            Value::Timestamp(_) => FieldType::Timestamp,
            Value::String(_) => FieldType::String,
        };
        Some(field_type)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::Time(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_value_from {
    ($($native: ty => $variant: ident),*) => {
        $(
            impl From<$native> for Value {
                fn from(value: $native) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    };
}

impl_value_from!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String
);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_field_type() {
        assert_eq!(None, Value::Null.field_type());
        assert_eq!(Some(FieldType::UInt32), Value::from(3u32).field_type());
        assert_eq!(Some(FieldType::Date), Value::Date(19000).field_type());
        assert_eq!(Some(FieldType::String), Value::from("a").field_type());
        assert_eq!(Value::Null, Value::from(Option::<i64>::None));
        assert_eq!(Value::Int64(5), Value::from(Some(5i64)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!("Null", Value::Null.to_string());
        assert_eq!("-3", Value::Int16(-3).to_string());
        assert_eq!("1.5", Value::Float64(1.5).to_string());
        assert_eq!("skey", Value::from("skey").to_string());
    }

    #[test]
    fn test_value_serde() {
        let values = vec![Value::Null, Value::UInt8(1), Value::Float32(0.25), "a".into()];
        let json = serde_json::to_string(&values).unwrap();
        let decoded: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(values, decoded);
    }
}
