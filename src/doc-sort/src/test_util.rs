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

//! Utilities for testing.

use std::sync::Arc;

use crate::codec::{SortDescription, SortPattern};
use crate::config::SortConfig;
use crate::document::{Document, DocumentRef, OpType};
use crate::locator::Locator;
use crate::schema::{FieldId, FieldOptions, FieldType, SchemaBuilder, SchemaRef, TableType};
use crate::value::Value;

pub const FIELD_PK: FieldId = 0;
pub const FIELD_INT: FieldId = 1;
pub const FIELD_PRICE: FieldId = 2;
pub const FIELD_TITLE: FieldId = 3;
pub const FIELD_UINT: FieldId = 4;
pub const FIELD_TAG: FieldId = 5;

pub const KV_FIELD_VALUE: FieldId = 1;
pub const KV_FIELD_SCORE: FieldId = 2;
pub const KKV_FIELD_SKEY: FieldId = 1;
pub const KKV_FIELD_VALUE: FieldId = 2;

fn normal_fields(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .push_field(FieldOptions::new("pk", FieldType::String))
        .push_field(FieldOptions::new("int", FieldType::Int32))
        .push_field(FieldOptions::new("price", FieldType::Float64).with_nullable(true))
        .push_field(FieldOptions::new("title", FieldType::String))
        .push_field(FieldOptions::new("field", FieldType::UInt32).with_nullable(true))
        .push_field(
            FieldOptions::new("tag", FieldType::Int64).with_updatable_inverted_index(true),
        )
}

/// Normal table keyed by `pk`.
pub fn normal_schema() -> SchemaRef {
    Arc::new(
        normal_fields(SchemaBuilder::new(TableType::Normal))
            .primary_key("pk")
            .build()
            .unwrap(),
    )
}

pub fn normal_schema_without_pk() -> SchemaRef {
    Arc::new(
        normal_fields(SchemaBuilder::new(TableType::Normal))
            .build()
            .unwrap(),
    )
}

pub fn normal_schema_with_sub_schema() -> SchemaRef {
    Arc::new(
        normal_fields(SchemaBuilder::new(TableType::Normal))
            .primary_key("pk")
            .sub_schema(true)
            .build()
            .unwrap(),
    )
}

pub fn kv_schema() -> SchemaRef {
    Arc::new(
        SchemaBuilder::new(TableType::Kv)
            .push_field(FieldOptions::new("pk", FieldType::String))
            .push_field(FieldOptions::new("value", FieldType::Int64))
            .push_field(FieldOptions::new("score", FieldType::UInt32))
            .primary_key("pk")
            .build()
            .unwrap(),
    )
}

pub fn kkv_schema() -> SchemaRef {
    Arc::new(
        SchemaBuilder::new(TableType::Kkv)
            .push_field(FieldOptions::new("pk", FieldType::String))
            .push_field(FieldOptions::new("skey", FieldType::Int64))
            .push_field(FieldOptions::new("value", FieldType::Int64))
            .primary_key("pk")
            .suffix_key("skey")
            .build()
            .unwrap(),
    )
}

pub fn sort_config(descriptions: &[(&str, SortPattern)]) -> SortConfig {
    SortConfig {
        sort_descriptions: descriptions
            .iter()
            .map(|(name, pattern)| SortDescription::new(*name, *pattern))
            .collect(),
        ..Default::default()
    }
}

/// Builds a document with `pk`, locator offset `offset` and attributes.
pub fn new_document(
    op_type: OpType,
    pk: &str,
    offset: i64,
    attributes: &[(FieldId, Value)],
) -> DocumentRef {
    let mut document = Document::new(op_type)
        .with_primary_key(pk)
        .with_locator(Locator::new(0, offset))
        .with_timestamp(offset);
    for (field_id, value) in attributes {
        document.set_attribute(*field_id, value.clone());
    }
    Arc::new(document)
}
