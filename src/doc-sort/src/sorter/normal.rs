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

//! Sorter for normal tables.

use ahash::{HashMap, HashMapExt};
use bytes::BytesMut;
use common_telemetry::debug;

use crate::config::SortConfig;
use crate::converter::{SortDocument, SortDocumentConverter};
use crate::document::{Document, OpType};
use crate::error::Result;
use crate::schema::SchemaRef;
use crate::sorter::{DocumentSorter, SortedBatch};

/// Positions of a primary key.
#[derive(Debug, Default, Clone, Copy)]
struct PkPosition {
    /// Position of the latest ADD of the key. Documents of the key pushed
    /// before it are superseded.
    reset_position: usize,
    /// Index of the merge chain still open for the key.
    merge_chain: Option<usize>,
}

/// Sorter for normal tables.
///
/// ADD documents are sorted by their sort keys. Documents of other operations
/// follow in push order so they are always applied after the ADD of the same
/// primary key.
///
/// With a primary key, an ADD supersedes all earlier documents of the key and
/// consecutive mergeable UPDATE_FIELD documents of the key are folded into the
/// first one of them.
#[derive(Debug)]
pub struct NormalSortDocSorter {
    schema: SchemaRef,
    converter: SortDocumentConverter,
    /// Whether updates can be merged at all.
    enable_merge: bool,
    /// No field rewrites an inverted index on update.
    all_fields_mergeable: bool,
    documents: Vec<SortDocument>,
    pk_positions: HashMap<String, PkPosition>,
    /// Chains of mergeable updates, each in push order.
    merge_positions: Vec<Vec<usize>>,
}

impl NormalSortDocSorter {
    pub fn try_new(config: &SortConfig, schema: SchemaRef) -> Result<Self> {
        let converter = SortDocumentConverter::try_new(&config.sort_descriptions, &schema)?;
        let enable_merge = config.enable_update_merge && !schema.has_sub_schema();
        let all_fields_mergeable = !schema.has_updatable_inverted_index();
        debug!(
            "Create normal sorter, has_primary_key: {}, enable_merge: {}, all_fields_mergeable: {}",
            schema.has_primary_key(),
            enable_merge,
            all_fields_mergeable
        );

        Ok(Self {
            schema,
            converter,
            enable_merge,
            all_fields_mergeable,
            documents: Vec::new(),
            pk_positions: HashMap::new(),
            merge_positions: Vec::new(),
        })
    }

    /// Returns true if the update can be merged with other updates of the key.
    fn is_mergeable(&self, document: &Document) -> bool {
        if !self.enable_merge {
            return false;
        }
        self.all_fields_mergeable
            || document.attributes().keys().all(|field_id| {
                self.schema
                    .field(*field_id)
                    .map(|field| !field.has_updatable_inverted_index())
                    .unwrap_or(true)
            })
    }

    fn update_pk_position(&mut self, document: &Document, position: usize) {
        let mergeable =
            document.op_type() == OpType::UpdateField && self.is_mergeable(document);
        let pk_position = self
            .pk_positions
            .entry(document.primary_key().to_string())
            .or_default();

        match document.op_type() {
            OpType::Add => {
                pk_position.reset_position = position;
                pk_position.merge_chain = None;
            }
            OpType::UpdateField if mergeable => match pk_position.merge_chain {
                Some(chain) => self.merge_positions[chain].push(position),
                None => {
                    pk_position.merge_chain = Some(self.merge_positions.len());
                    self.merge_positions.push(vec![position]);
                }
            },
            OpType::UpdateField | OpType::Delete | OpType::DeleteSub => {
                pk_position.merge_chain = None;
            }
        }
    }

    fn is_superseded(&self, document: &SortDocument) -> bool {
        if document.primary_key().is_empty() {
            return false;
        }
        self.pk_positions
            .get(document.primary_key())
            .map(|pk_position| document.position() < pk_position.reset_position)
            .unwrap_or(false)
    }
}

impl DocumentSorter for NormalSortDocSorter {
    fn push(&mut self, document: &Document, position: usize, pool: &mut BytesMut) -> Result<()> {
        debug_assert_eq!(self.documents.len(), position);

        let sort_document = self.converter.convert(document, position, pool)?;
        if self.schema.has_primary_key() && !document.primary_key().is_empty() {
            self.update_pk_position(document, position);
        }
        self.documents.push(sort_document);
        Ok(())
    }

    fn sort(&mut self) -> Result<SortedBatch> {
        let mut batch = SortedBatch::default();
        let mut selected: Vec<bool> = self
            .documents
            .iter()
            .map(|document| !self.is_superseded(document))
            .collect();
        batch.num_superseded = selected.iter().filter(|s| !**s).count();

        for chain in &self.merge_positions {
            let [head, members @ ..] = chain.as_slice() else {
                continue;
            };
            if members.is_empty() || !selected[*head] {
                continue;
            }

            let mut merged = self.documents[*head].decode_document()?;
            for member in members {
                let update = self.documents[*member].decode_document()?;
                merged.overlay_attributes(&update);
                selected[*member] = false;
            }
            batch.num_merged += members.len();
            batch.merged.insert(*head, merged);
        }

        let (mut adds, others): (Vec<_>, Vec<_>) = self
            .documents
            .iter()
            .filter(|document| selected[document.position()])
            .partition(|document| document.op_type() == OpType::Add);
        // `sort_by` is stable so documents with equal keys keep push order.
        adds.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

        batch.positions = adds
            .into_iter()
            .chain(others)
            .map(|document| document.position())
            .collect();
        Ok(batch)
    }

    fn clear(&mut self) {
        self.documents.clear();
        self.pk_positions.clear();
        self.merge_positions.clear();
    }

    fn num_pushed(&self) -> usize {
        self.documents.len()
    }

    fn memory_use(&self) -> usize {
        self.documents
            .iter()
            .map(|document| document.memory_use())
            .sum::<usize>()
            + self.pk_positions.len() * std::mem::size_of::<(String, PkPosition)>()
    }
}
