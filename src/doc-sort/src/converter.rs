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

use ahash::{HashSet, HashSetExt};
use bytes::{BufMut, Bytes, BytesMut};
use snafu::{ensure, OptionExt};

use crate::codec::{SortDescription, SortKeyCodec};
use crate::document::{Document, OpType};
use crate::error::{
    DuplicateSortFieldSnafu, MissingSortFieldSnafu, Result, UnknownSortFieldSnafu,
    UnsortableFieldSnafu,
};
use crate::schema::{FieldId, Schema, TableType};
use crate::value::Value;

/// Projection of a pushed document used while sorting.
#[derive(Debug, Clone)]
pub struct SortDocument {
    sort_key: Bytes,
    primary_key: String,
    op_type: OpType,
    payload: Bytes,
    position: usize,
}

impl SortDocument {
    /// Composite key of the document, empty if the operation doesn't carry one.
    pub fn sort_key(&self) -> &Bytes {
        &self.sort_key
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    /// Serialized document.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Position of the document in push order.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn decode_document(&self) -> Result<Document> {
        Document::decode(&self.payload)
    }

    pub(crate) fn memory_use(&self) -> usize {
        self.sort_key.len() + self.primary_key.len() + self.payload.len()
    }
}

/// Encodes one sort field of a document.
#[derive(Debug)]
struct SortFieldConverter {
    field_id: FieldId,
    field_name: String,
    nullable: bool,
    codec: SortKeyCodec,
}

/// Converts documents into [SortDocument]s.
#[derive(Debug)]
pub struct SortDocumentConverter {
    converters: Vec<SortFieldConverter>,
    table_type: TableType,
    key_size: usize,
}

impl SortDocumentConverter {
    /// Binds `descriptions` to fields of the `schema`.
    pub fn try_new(descriptions: &[SortDescription], schema: &Schema) -> Result<Self> {
        let mut converters = Vec::with_capacity(descriptions.len());
        let mut seen = HashSet::with_capacity(descriptions.len());
        for description in descriptions {
            let field = schema
                .field_by_name(&description.field_name)
                .context(UnknownSortFieldSnafu {
                    field_name: &description.field_name,
                })?;
            ensure!(
                field.field_type().is_sortable(),
                UnsortableFieldSnafu {
                    field_name: &description.field_name,
                    field_type: field.field_type(),
                }
            );
            ensure!(
                seen.insert(field.id()),
                DuplicateSortFieldSnafu {
                    field_name: &description.field_name,
                }
            );
            converters.push(SortFieldConverter {
                field_id: field.id(),
                field_name: field.name().to_string(),
                nullable: field.is_nullable(),
                codec: SortKeyCodec::new(field.field_type(), description.pattern),
            });
        }
        let key_size = converters.iter().map(|c| c.codec.estimated_size()).sum();

        Ok(Self {
            converters,
            table_type: schema.table_type(),
            key_size,
        })
    }

    /// Returns true if no sort field is bound.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Size of a composite sort key.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Returns true if documents of `op_type` are ordered by a sort key.
    pub fn carries_sort_key(&self, op_type: OpType) -> bool {
        match self.table_type {
            TableType::Normal => op_type == OpType::Add,
            TableType::Kv | TableType::Kkv => {
                matches!(op_type, OpType::Add | OpType::UpdateField)
            }
        }
    }

    /// Converts the `document` pushed at `position`, allocating its key and
    /// payload from `pool`.
    pub fn convert(
        &self,
        document: &Document,
        position: usize,
        pool: &mut BytesMut,
    ) -> Result<SortDocument> {
        if self.carries_sort_key(document.op_type()) {
            pool.reserve(self.key_size);
            if let Err(e) = self.encode_sort_key(document, position, pool) {
                pool.clear();
                return Err(e);
            }
        }
        let sort_key = pool.split().freeze();

        if let Err(e) = document.encode_to((&mut *pool).writer()) {
            pool.clear();
            return Err(e);
        }
        let payload = pool.split().freeze();

        Ok(SortDocument {
            sort_key,
            primary_key: document.primary_key().to_string(),
            op_type: document.op_type(),
            payload,
            position,
        })
    }

    fn encode_sort_key(
        &self,
        document: &Document,
        position: usize,
        pool: &mut BytesMut,
    ) -> Result<()> {
        for converter in &self.converters {
            let value = match document.attribute(converter.field_id) {
                Some(value) => value,
                // Absent nullable fields sort as null.
                None if converter.nullable => &Value::Null,
                None => {
                    return MissingSortFieldSnafu {
                        field_name: &converter.field_name,
                        position,
                    }
                    .fail()
                }
            };
            converter.codec.encode_to(value, &mut *pool)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SortPattern;
    use crate::error::Error;
    use crate::test_util::{normal_schema, FIELD_INT, FIELD_PRICE, FIELD_TITLE};

    #[test]
    fn test_try_new_converter() {
        let schema = normal_schema();
        let converter = SortDocumentConverter::try_new(
            &[
                SortDescription::new("price", SortPattern::Desc),
                SortDescription::new("int", SortPattern::Asc),
            ],
            &schema,
        )
        .unwrap();
        assert!(!converter.is_empty());
        assert_eq!(8 + 4, converter.key_size());

        let err = SortDocumentConverter::try_new(
            &[SortDescription::new("unknown", SortPattern::Asc)],
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownSortField { .. }), "{err:?}");

        let err = SortDocumentConverter::try_new(
            &[SortDescription::new("title", SortPattern::Asc)],
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsortableField { .. }), "{err:?}");

        let err = SortDocumentConverter::try_new(
            &[
                SortDescription::new("int", SortPattern::Asc),
                SortDescription::new("int", SortPattern::Desc),
            ],
            &schema,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateSortField { .. }), "{err:?}");
    }

    #[test]
    fn test_convert_document() {
        let schema = normal_schema();
        let converter = SortDocumentConverter::try_new(
            &[
                SortDescription::new("int", SortPattern::Asc),
                SortDescription::new("price", SortPattern::Desc),
            ],
            &schema,
        )
        .unwrap();
        let document = Document::new(OpType::Add)
            .with_primary_key("pk")
            .with_attribute(FIELD_INT, 3i32)
            .with_attribute(FIELD_PRICE, 1.5f64)
            .with_attribute(FIELD_TITLE, "hello");

        let mut pool = BytesMut::with_capacity(1024);
        let sort_doc = converter.convert(&document, 5, &mut pool).unwrap();
        assert_eq!(5, sort_doc.position());
        assert_eq!("pk", sort_doc.primary_key());
        assert_eq!(OpType::Add, sort_doc.op_type());
        assert_eq!(12, sort_doc.sort_key().len());
        assert_eq!(document, sort_doc.decode_document().unwrap());
        assert!(pool.is_empty());

        // Updates don't carry a sort key in normal tables.
        let update = Document::new(OpType::UpdateField)
            .with_primary_key("pk")
            .with_attribute(FIELD_TITLE, "world");
        let sort_doc = converter.convert(&update, 6, &mut pool).unwrap();
        assert!(sort_doc.sort_key().is_empty());
        assert_eq!(update, sort_doc.decode_document().unwrap());
    }

    #[test]
    fn test_convert_missing_field() {
        let schema = normal_schema();
        let converter = SortDocumentConverter::try_new(
            &[SortDescription::new("int", SortPattern::Asc)],
            &schema,
        )
        .unwrap();
        let document = Document::new(OpType::Add).with_attribute(FIELD_PRICE, 1.0f64);
        let mut pool = BytesMut::new();
        let err = converter.convert(&document, 2, &mut pool).unwrap_err();
        assert!(
            matches!(err, Error::MissingSortField { position: 2, .. }),
            "{err:?}"
        );

        let document = Document::new(OpType::Add).with_attribute(FIELD_INT, Value::UInt64(1));
        let err = converter.convert(&document, 3, &mut pool).unwrap_err();
        assert!(matches!(err, Error::FieldTypeMismatch { .. }), "{err:?}");
    }

    #[test]
    fn test_convert_absent_nullable_field() {
        let schema = normal_schema();
        let converter = SortDocumentConverter::try_new(
            &[SortDescription::new("price", SortPattern::Desc)],
            &schema,
        )
        .unwrap();
        let mut pool = BytesMut::new();
        let absent = converter
            .convert(&Document::new(OpType::Add), 0, &mut pool)
            .unwrap();
        let null = converter
            .convert(
                &Document::new(OpType::Add).with_attribute(FIELD_PRICE, Value::Null),
                1,
                &mut pool,
            )
            .unwrap();
        let zero = converter
            .convert(
                &Document::new(OpType::Add).with_attribute(FIELD_PRICE, 0.0f64),
                2,
                &mut pool,
            )
            .unwrap();
        assert_eq!(null.sort_key(), absent.sort_key());
        assert_eq!(zero.sort_key(), absent.sort_key());
    }
}
