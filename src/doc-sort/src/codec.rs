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

//! Order-preserving encoding of sort field values.

use bytes::BufMut;
use memcomparable::Serializer;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{FieldTypeMismatchSnafu, NotSupportedFieldSnafu, Result, SerializeFieldSnafu};
use crate::schema::FieldType;
use crate::value::Value;

/// Direction of a sort field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPattern {
    #[default]
    Asc,
    Desc,
}

/// A field to sort documents by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescription {
    pub field_name: String,
    #[serde(default)]
    pub pattern: SortPattern,
}

impl SortDescription {
    pub fn new(field_name: impl Into<String>, pattern: SortPattern) -> Self {
        Self {
            field_name: field_name.into(),
            pattern,
        }
    }
}

/// Encodes values of one field so that comparing the encoded bytes
/// reproduces the order of the values.
///
/// Null is encoded as the zero value of the field type.
#[derive(Debug, Clone, Copy)]
pub struct SortKeyCodec {
    field_type: FieldType,
    pattern: SortPattern,
}

impl SortKeyCodec {
    pub fn new(field_type: FieldType, pattern: SortPattern) -> Self {
        Self {
            field_type,
            pattern,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn pattern(&self) -> SortPattern {
        self.pattern
    }

    /// Size of an encoded value.
    pub fn estimated_size(&self) -> usize {
        match self.field_type {
            FieldType::Int8 | FieldType::UInt8 => 1,
            FieldType::Int16 | FieldType::UInt16 => 2,
            FieldType::Int32
            | FieldType::UInt32
            | FieldType::Float32
            | FieldType::Date
            | FieldType::Time => 4,
            FieldType::Int64 | FieldType::UInt64 | FieldType::Float64 | FieldType::Timestamp => 8,
            FieldType::String => 0,
        }
    }

    /// Appends the encoded `value` to `buf`.
    pub fn encode_to<B: BufMut>(&self, value: &Value, buf: B) -> Result<()> {
        let mut serializer = Serializer::new(buf);
        serializer.set_reverse(self.pattern == SortPattern::Desc);

        macro_rules! serialize_by_type {
            (
                $self: ident;
                $value: ident;
                $serializer: ident;
                $(
                    $ty: ident => $native: ty
                ),*
            ) => {
                match ($self.field_type, $value) {
                    $(
                        (FieldType::$ty, Value::$ty(v)) => v.serialize(&mut $serializer),
                        (FieldType::$ty, Value::Null) => <$native>::default().serialize(&mut $serializer),
                    )*
                    (FieldType::String, _) => {
                        return NotSupportedFieldSnafu {
                            field_type: $self.field_type,
                        }
                        .fail();
                    }
                    (field_type, value) => {
                        return FieldTypeMismatchSnafu {
                            value: value.to_string(),
                            field_type,
                        }
                        .fail();
                    }
                }
            };
        }

        serialize_by_type!(self; value; serializer;
            Int8 => i8,
            Int16 => i16,
            Int32 => i32,
            Int64 => i64,
            UInt8 => u8,
            UInt16 => u16,
            UInt32 => u32,
            UInt64 => u64,
            Float32 => f32,
            Float64 => f64,
            Date => i32,
            Time => i32,
            Timestamp => i64
        )
        .context(SerializeFieldSnafu)
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.estimated_size());
        self.encode_to(value, &mut buf)?;
        Ok(buf)
    }
}
