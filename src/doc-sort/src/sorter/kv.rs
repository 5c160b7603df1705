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

//! Sorter for KV and KKV tables.

use ahash::{HashMap, HashMapExt};
use bytes::BytesMut;
use common_telemetry::debug;
use snafu::{ensure, OptionExt};

use crate::config::SortConfig;
use crate::converter::{SortDocument, SortDocumentConverter};
use crate::document::Document;
use crate::error::{MissingPrimaryKeySnafu, MissingSuffixKeySnafu, PrimaryKeyRequiredSnafu, Result};
use crate::schema::{FieldId, SchemaRef, TableType};
use crate::sorter::{DocumentSorter, SortedBatch};

/// Key of a record, the suffix key is `None` for KV tables and for
/// primary key level deletes of KKV tables.
type RecordKey = (String, Option<String>);

#[derive(Debug)]
struct SuffixField {
    id: FieldId,
    name: String,
}

/// Sorter for KV and KKV tables.
///
/// Every document supersedes earlier documents of the same key. In KKV tables
/// a delete without suffix key deletes every earlier document of the primary
/// key.
///
/// Surviving deletes are output first in push order, then surviving writes
/// ordered by their sort keys. Without sort fields, writes are ordered by the
/// hash of their primary keys.
#[derive(Debug)]
pub struct KvSortDocSorter {
    table_type: TableType,
    converter: SortDocumentConverter,
    suffix_field: Option<SuffixField>,
    documents: Vec<SortDocument>,
    /// Key of each pushed document.
    record_keys: Vec<RecordKey>,
    /// Latest position of each key.
    latest_positions: HashMap<RecordKey, usize>,
    /// Latest position of primary key level deletes.
    pk_delete_positions: HashMap<String, usize>,
}

impl KvSortDocSorter {
    pub fn try_new(config: &SortConfig, schema: SchemaRef) -> Result<Self> {
        let pk_field = schema
            .primary_key_field()
            .context(PrimaryKeyRequiredSnafu {
                table_type: schema.table_type(),
            })?;
        let converter = SortDocumentConverter::try_new(&config.sort_descriptions, &schema)?;
        let suffix_field = match schema.table_type() {
            TableType::Kkv => schema.suffix_key_field().map(|field| SuffixField {
                id: field.id(),
                name: field.name().to_string(),
            }),
            TableType::Normal | TableType::Kv => None,
        };
        debug!(
            "Create {} sorter, primary key: {}, sort by hash: {}",
            schema.table_type(),
            pk_field.name(),
            converter.is_empty()
        );

        Ok(Self {
            table_type: schema.table_type(),
            converter,
            suffix_field,
            documents: Vec::new(),
            record_keys: Vec::new(),
            latest_positions: HashMap::new(),
            pk_delete_positions: HashMap::new(),
        })
    }

    fn suffix_key(&self, document: &Document, position: usize) -> Result<Option<String>> {
        let Some(suffix_field) = &self.suffix_field else {
            return Ok(None);
        };
        let suffix_key = document
            .attribute(suffix_field.id)
            .filter(|value| !value.is_null())
            .map(|value| value.to_string());
        if suffix_key.is_none() && !document.op_type().is_delete() {
            // Only deletes can apply to the whole primary key.
            return MissingSuffixKeySnafu {
                field_name: &suffix_field.name,
                op_type: document.op_type(),
                position,
            }
            .fail();
        }
        Ok(suffix_key)
    }

    fn is_selected(&self, record_key: &RecordKey, position: usize) -> bool {
        let deleted = self
            .pk_delete_positions
            .get(&record_key.0)
            .map(|delete_position| *delete_position > position)
            .unwrap_or(false);
        self.latest_positions.get(record_key) == Some(&position) && !deleted
    }
}

impl DocumentSorter for KvSortDocSorter {
    fn push(&mut self, document: &Document, position: usize, pool: &mut BytesMut) -> Result<()> {
        debug_assert_eq!(self.documents.len(), position);

        ensure!(
            !document.primary_key().is_empty(),
            MissingPrimaryKeySnafu { position }
        );
        let suffix_key = self.suffix_key(document, position)?;
        let sort_document = self.converter.convert(document, position, pool)?;

        if self.table_type == TableType::Kkv && suffix_key.is_none() {
            self.pk_delete_positions
                .insert(document.primary_key().to_string(), position);
        }
        let record_key = (document.primary_key().to_string(), suffix_key);
        self.latest_positions.insert(record_key.clone(), position);
        self.record_keys.push(record_key);
        self.documents.push(sort_document);
        Ok(())
    }

    fn sort(&mut self) -> Result<SortedBatch> {
        let mut batch = SortedBatch::default();
        let mut deletes = Vec::new();
        let mut writes = Vec::new();

        for (document, record_key) in self.documents.iter().zip(&self.record_keys) {
            if !self.is_selected(record_key, document.position()) {
                batch.num_superseded += 1;
            } else if document.op_type().is_delete() {
                deletes.push(document);
            } else {
                writes.push(document);
            }
        }

        if self.converter.is_empty() {
            writes.sort_by_key(|document| fxhash::hash64(document.primary_key().as_bytes()));
        } else {
            writes.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        }

        batch.positions = deletes
            .into_iter()
            .chain(writes)
            .map(|document| document.position())
            .collect();
        Ok(batch)
    }

    fn clear(&mut self) {
        self.documents.clear();
        self.record_keys.clear();
        self.latest_positions.clear();
        self.pk_delete_positions.clear();
    }

    fn num_pushed(&self) -> usize {
        self.documents.len()
    }

    fn memory_use(&self) -> usize {
        self.documents
            .iter()
            .map(|document| document.memory_use())
            .sum::<usize>()
            + (self.record_keys.len() + self.latest_positions.len())
                * std::mem::size_of::<(RecordKey, usize)>()
    }
}
