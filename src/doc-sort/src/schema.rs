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

//! Schema of the documents to sort.

use std::fmt;
use std::sync::Arc;

use ahash::{HashMap, HashMapExt};
use serde::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};

use crate::error::{InvalidSchemaSnafu, PrimaryKeyRequiredSnafu, Result};

/// Id of a field, assigned by [SchemaBuilder] in declaration order.
pub type FieldId = u32;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Days since UNIX epoch.
    Date,
    /// Milliseconds since midnight.
    Time,
    /// Milliseconds since UNIX epoch.
    Timestamp,
    String,
}

impl FieldType {
    /// Returns true if values of this type can be encoded into a sort key.
    pub fn is_sortable(&self) -> bool {
        !matches!(self, FieldType::String)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Kind of the table the documents belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TableType {
    /// Documents with attribute fields, optionally keyed by a primary key.
    #[default]
    Normal,
    /// Key-value table, keyed by the primary key.
    Kv,
    /// Key-key-value table, keyed by the primary key and a suffix key.
    Kkv,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Normal => "normal",
            TableType::Kv => "kv",
            TableType::Kkv => "kkv",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    id: FieldId,
    name: String,
    field_type: FieldType,
    nullable: bool,
    updatable_inverted_index: bool,
}

impl FieldSchema {
    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns true if an update of this field also rewrites an inverted index.
    pub fn has_updatable_inverted_index(&self) -> bool {
        self.updatable_inverted_index
    }
}

/// Options of a field to add to [SchemaBuilder].
#[derive(Debug, Clone)]
pub struct FieldOptions {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub updatable_inverted_index: bool,
}

impl FieldOptions {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            updatable_inverted_index: false,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_updatable_inverted_index(mut self, updatable: bool) -> Self {
        self.updatable_inverted_index = updatable;
        self
    }
}

pub type SchemaRef = Arc<Schema>;

/// Immutable schema shared by the container, the converter and the sorters.
#[derive(Debug, Clone)]
pub struct Schema {
    table_type: TableType,
    fields: Vec<FieldSchema>,
    name_to_index: HashMap<String, usize>,
    primary_key: Option<FieldId>,
    suffix_key: Option<FieldId>,
    has_sub_schema: bool,
}

impl Schema {
    pub fn table_type(&self) -> TableType {
        self.table_type
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, id: FieldId) -> Option<&FieldSchema> {
        self.fields.get(id as usize)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldSchema> {
        self.name_to_index.get(name).map(|idx| &self.fields[*idx])
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key.is_some()
    }

    pub fn primary_key_field(&self) -> Option<&FieldSchema> {
        self.primary_key.and_then(|id| self.field(id))
    }

    /// Returns the suffix key field of a KKV table.
    pub fn suffix_key_field(&self) -> Option<&FieldSchema> {
        self.suffix_key.and_then(|id| self.field(id))
    }

    pub fn has_sub_schema(&self) -> bool {
        self.has_sub_schema
    }

    /// Returns true if any field has an updatable inverted index.
    pub fn has_updatable_inverted_index(&self) -> bool {
        self.fields.iter().any(|f| f.updatable_inverted_index)
    }
}

/// Builder of [Schema].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    table_type: TableType,
    fields: Vec<FieldOptions>,
    primary_key: Option<String>,
    suffix_key: Option<String>,
    has_sub_schema: bool,
}

impl SchemaBuilder {
    pub fn new(table_type: TableType) -> Self {
        Self {
            table_type,
            ..Default::default()
        }
    }

    pub fn push_field(mut self, field: FieldOptions) -> Self {
        self.fields.push(field);
        self
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = Some(name.into());
        self
    }

    pub fn suffix_key(mut self, name: impl Into<String>) -> Self {
        self.suffix_key = Some(name.into());
        self
    }

    pub fn sub_schema(mut self, has_sub_schema: bool) -> Self {
        self.has_sub_schema = has_sub_schema;
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut name_to_index = HashMap::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());
        for (idx, options) in self.fields.into_iter().enumerate() {
            ensure!(
                !name_to_index.contains_key(&options.name),
                InvalidSchemaSnafu {
                    reason: format!("duplicate field {}", options.name),
                }
            );
            name_to_index.insert(options.name.clone(), idx);
            fields.push(FieldSchema {
                id: idx as FieldId,
                name: options.name,
                field_type: options.field_type,
                nullable: options.nullable,
                updatable_inverted_index: options.updatable_inverted_index,
            });
        }

        let resolve = |name: &str| {
            name_to_index
                .get(name)
                .map(|idx| *idx as FieldId)
                .with_context(|| InvalidSchemaSnafu {
                    reason: format!("key field {name} not found"),
                })
        };
        let primary_key = self.primary_key.as_deref().map(resolve).transpose()?;
        let suffix_key = self.suffix_key.as_deref().map(resolve).transpose()?;

        match self.table_type {
            TableType::Normal => {
                ensure!(
                    suffix_key.is_none(),
                    InvalidSchemaSnafu {
                        reason: "suffix key is only allowed in kkv table",
                    }
                );
            }
            TableType::Kv => {
                ensure!(
                    primary_key.is_some(),
                    PrimaryKeyRequiredSnafu {
                        table_type: self.table_type,
                    }
                );
            }
            TableType::Kkv => {
                ensure!(
                    primary_key.is_some(),
                    PrimaryKeyRequiredSnafu {
                        table_type: self.table_type,
                    }
                );
                ensure!(
                    suffix_key.is_some(),
                    InvalidSchemaSnafu {
                        reason: "kkv table requires a suffix key",
                    }
                );
            }
        }
        ensure!(
            !self.has_sub_schema || self.table_type == TableType::Normal,
            InvalidSchemaSnafu {
                reason: "sub schema is only allowed in normal table",
            }
        );

        Ok(Schema {
            table_type: self.table_type,
            fields,
            name_to_index,
            primary_key,
            suffix_key,
            has_sub_schema: self.has_sub_schema,
        })
    }
}
