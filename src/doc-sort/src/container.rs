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

//! Container that sorts a batch of documents.

use std::ops::Index;
use std::sync::Arc;

use bytes::BytesMut;
use common_telemetry::{debug, info};
use snafu::OptionExt;

use crate::config::SortConfig;
use crate::document::{Document, DocumentRef};
use crate::error::{NotInitializedSnafu, Result};
use crate::locator::Locator;
use crate::metrics::{DROPPED_DOCUMENTS_TOTAL, PUSHED_DOCUMENTS_TOTAL, SORT_ELAPSED};
use crate::schema::SchemaRef;
use crate::sorter::{DocumentSorter, SortDocSorter, SortedBatch};

/// Holds a batch of pushed documents and exposes them in sorted order.
///
/// Usage:
/// - call [init](SortDocumentContainer::init) to bind the schema and sort fields;
/// - push documents by [push_document](SortDocumentContainer::push_document);
/// - call [sort_document](SortDocumentContainer::sort_document) once all documents are pushed;
/// - read the sorted documents by index or [iter](SortDocumentContainer::iter).
///
/// Only the last sorted document carries a resumable locator. It is the
/// largest locator among all pushed documents.
#[derive(Debug, Default)]
pub struct SortDocumentContainer {
    schema: Option<SchemaRef>,
    sorter: Option<SortDocSorter>,
    /// Documents in push order.
    documents: Vec<DocumentRef>,
    sorted_documents: Vec<DocumentRef>,
    /// Pool of sort keys and payloads.
    pool: BytesMut,
    first_locator: Locator,
    last_locator: Locator,
    /// Whether `sorted_documents` is up to date.
    sorted: bool,
}

impl SortDocumentContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes the container, dropping all documents it holds.
    pub fn init(
        &mut self,
        config: &SortConfig,
        schema: SchemaRef,
        initial_locator: Locator,
    ) -> Result<()> {
        let mut config = config.clone();
        config.sanitize();
        let sorter = SortDocSorter::try_new(&config, schema.clone())?;
        info!(
            "Init sort document container, table_type: {}, sort_descriptions: {:?}, initial_locator: {}",
            schema.table_type(),
            config.sort_descriptions,
            initial_locator
        );

        self.schema = Some(schema);
        self.sorter = Some(sorter);
        self.documents.clear();
        self.sorted_documents.clear();
        self.pool = BytesMut::with_capacity(config.pool_capacity);
        self.first_locator = initial_locator;
        self.last_locator = initial_locator;
        self.sorted = false;
        Ok(())
    }

    pub fn schema(&self) -> Option<&SchemaRef> {
        self.schema.as_ref()
    }

    /// Pushes a document to the container.
    ///
    /// Pushing invalidates the result of the last sort.
    pub fn push_document(&mut self, document: DocumentRef) -> Result<()> {
        let sorter = self.sorter.as_mut().context(NotInitializedSnafu)?;
        let position = self.documents.len();
        sorter.push(&document, position, &mut self.pool)?;

        self.last_locator = self.last_locator.max(document.locator());
        self.documents.push(document);
        if self.sorted {
            self.sorted = false;
            self.sorted_documents.clear();
        }
        PUSHED_DOCUMENTS_TOTAL.inc();
        Ok(())
    }

    /// Sorts pushed documents. Sorting a sorted container is a no-op.
    pub fn sort_document(&mut self) -> Result<()> {
        if self.sorted {
            return Ok(());
        }
        let sorter = self.sorter.as_mut().context(NotInitializedSnafu)?;
        let table_type = self
            .schema
            .as_ref()
            .map(|schema| schema.table_type().as_str())
            .unwrap_or_default();
        let timer = SORT_ELAPSED.with_label_values(&[table_type]).start_timer();

        let SortedBatch {
            positions,
            mut merged,
            num_merged,
            num_superseded,
        } = sorter.sort()?;

        let mut sorted_documents: Vec<DocumentRef> = positions
            .into_iter()
            .map(|position| match merged.remove(&position) {
                Some(document) => Arc::new(document),
                None => self.documents[position].clone(),
            })
            .collect();

        let last_index = sorted_documents.len().saturating_sub(1);
        for (index, document) in sorted_documents.iter_mut().enumerate() {
            let locator = if index == last_index {
                self.last_locator
            } else {
                document.locator().unresumable()
            };
            if document.locator() != locator {
                // Clones the document if the caller still holds it.
                Arc::make_mut(document).set_locator(locator);
            }
        }

        DROPPED_DOCUMENTS_TOTAL
            .with_label_values(&["merge"])
            .inc_by(num_merged as u64);
        DROPPED_DOCUMENTS_TOTAL
            .with_label_values(&["supersede"])
            .inc_by(num_superseded as u64);
        let elapsed = timer.stop_and_record();
        debug!(
            "Sort documents, pushed: {}, sorted: {}, merged: {}, superseded: {}, cost: {:.3}s",
            self.documents.len(),
            sorted_documents.len(),
            num_merged,
            num_superseded,
            elapsed
        );

        self.sorted_documents = sorted_documents;
        self.sorted = true;
        Ok(())
    }

    /// Number of pushed documents.
    pub fn all_doc_count(&self) -> usize {
        self.documents.len()
    }

    /// Number of documents in the sorted output, 0 before sorting.
    pub fn sorted_doc_count(&self) -> usize {
        self.sorted_documents.len()
    }

    /// Number of documents still to be consumed: all pushed documents
    /// before sorting and the sorted documents after sorting.
    pub fn unprocessed_count(&self) -> usize {
        if self.sorted {
            self.sorted_documents.len()
        } else {
            self.documents.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Returns the `index`-th sorted document.
    pub fn get(&self, index: usize) -> Option<&DocumentRef> {
        self.sorted_documents.get(index)
    }

    /// Iterates sorted documents.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentRef> {
        self.sorted_documents.iter()
    }

    /// Documents in push order, for diagnosis.
    pub fn pushed_documents(&self) -> &[DocumentRef] {
        &self.documents
    }

    /// Locator the current batch starts from: the one given to `init`, or the
    /// last locator at the latest `clear`. Pushed documents do not move it.
    pub fn first_locator(&self) -> Locator {
        self.first_locator
    }

    /// Largest locator of pushed documents.
    pub fn last_locator(&self) -> Locator {
        self.last_locator
    }

    /// Bytes held by the container.
    pub fn memory_use(&self) -> usize {
        self.pool.capacity()
            + self.sorter.as_ref().map(|s| s.memory_use()).unwrap_or(0)
            + (self.documents.len() + self.sorted_documents.len())
                * std::mem::size_of::<DocumentRef>()
    }

    /// Drops all documents but keeps the last locator.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.sorted_documents.clear();
        if let Some(sorter) = self.sorter.as_mut() {
            sorter.clear();
        }
        self.pool.clear();
        self.first_locator = self.last_locator;
        self.sorted = false;
    }

    /// Exchanges the whole state with `other`.
    pub fn swap(&mut self, other: &mut SortDocumentContainer) {
        std::mem::swap(self, other);
    }
}

impl Index<usize> for SortDocumentContainer {
    type Output = Document;

    fn index(&self, index: usize) -> &Document {
        &self.sorted_documents[index]
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::codec::SortPattern;
    use crate::document::OpType;
    use crate::error::Error;
    use crate::schema::FieldId;
    use crate::test_util::{
        kv_schema, new_document, normal_schema, normal_schema_without_pk, sort_config, FIELD_INT,
        FIELD_PRICE, FIELD_UINT, KV_FIELD_SCORE,
    };
    use crate::value::Value;

    fn new_container(
        schema: SchemaRef,
        descriptions: &[(&str, SortPattern)],
    ) -> SortDocumentContainer {
        let mut container = SortDocumentContainer::new();
        container
            .init(&sort_config(descriptions), schema, Locator::new(0, 0))
            .unwrap();
        container
    }

    fn timestamps(container: &SortDocumentContainer) -> Vec<i64> {
        container.iter().map(|document| document.timestamp()).collect()
    }

    #[rstest]
    #[case(SortPattern::Asc, vec![0, 1, 2, 3])]
    #[case(SortPattern::Desc, vec![3, 1, 2, 0])]
    fn test_sort_by_uint32(#[case] pattern: SortPattern, #[case] expect: Vec<i64>) {
        common_telemetry::init_default_ut_logging();

        let mut container = new_container(normal_schema(), &[("field", pattern)]);
        for (doc_id, value) in [(0, 1u32), (1, 2), (2, 2), (3, 3)] {
            container
                .push_document(new_document(
                    OpType::Add,
                    &doc_id.to_string(),
                    doc_id,
                    &[(FIELD_UINT, Value::UInt32(value))],
                ))
                .unwrap();
        }
        container.sort_document().unwrap();

        assert_eq!(4, container.sorted_doc_count());
        assert_eq!(4, container.all_doc_count());
        assert_eq!(expect, timestamps(&container));
    }

    #[rstest]
    #[case(SortPattern::Desc, vec![1, 2, 4, 5, 0, 3, 6])]
    #[case(SortPattern::Asc, vec![0, 3, 6, 5, 4, 2, 1])]
    fn test_sort_null_as_zero(#[case] pattern: SortPattern, #[case] expect: Vec<i64>) {
        let mut container = new_container(normal_schema_without_pk(), &[("field", pattern)]);
        let values = [
            Value::Null,
            Value::UInt32(8),
            Value::UInt32(3),
            Value::Null,
            Value::UInt32(2),
            Value::UInt32(1),
            Value::UInt32(0),
        ];
        for (offset, value) in values.into_iter().enumerate() {
            container
                .push_document(new_document(
                    OpType::Add,
                    "",
                    offset as i64,
                    &[(FIELD_UINT, value)],
                ))
                .unwrap();
        }
        container.sort_document().unwrap();
        assert_eq!(expect, timestamps(&container));
    }

    #[test]
    fn test_locator_checkpoint() {
        let mut container = new_container(normal_schema(), &[("int", SortPattern::Asc)]);
        let documents: Vec<_> = [(5, 4), (9, 1), (7, 3), (3, 2)]
            .into_iter()
            .map(|(offset, value)| {
                new_document(
                    OpType::Add,
                    &offset.to_string(),
                    offset,
                    &[(FIELD_INT, Value::Int32(value))],
                )
            })
            .collect();
        for document in &documents {
            container.push_document(document.clone()).unwrap();
        }
        assert_eq!(Locator::new(0, 0), container.first_locator());
        assert_eq!(Locator::new(0, 9), container.last_locator());

        container.sort_document().unwrap();
        assert_eq!(vec![9, 3, 7, 5], timestamps(&container));
        for index in 0..container.sorted_doc_count() - 1 {
            assert_eq!(-1, container[index].locator().offset());
        }
        assert_eq!(Locator::new(0, 9), container[3].locator());
        // Documents held by the caller are untouched.
        assert_eq!(Locator::new(0, 9), documents[1].locator());
        assert_eq!(Locator::new(0, 5), documents[0].locator());

        container.clear();
        assert_eq!(Locator::new(0, 9), container.first_locator());
        assert_eq!(Locator::new(0, 9), container.last_locator());
        assert_eq!(0, container.unprocessed_count());
        assert!(container.is_empty());
    }

    #[test]
    fn test_pk_merge() {
        let mut container = new_container(normal_schema(), &[("field", SortPattern::Asc)]);
        let attrs = [(FIELD_UINT, Value::UInt32(0))];
        for (offset, op_type) in [
            OpType::Add,
            OpType::UpdateField,
            OpType::Add,
            OpType::UpdateField,
            OpType::Delete,
        ]
        .into_iter()
        .enumerate()
        {
            container
                .push_document(new_document(op_type, "1", offset as i64, &attrs))
                .unwrap();
        }
        container.sort_document().unwrap();

        assert_eq!(5, container.all_doc_count());
        assert_eq!(3, container.sorted_doc_count());
        let ops: Vec<_> = container.iter().map(|d| d.op_type()).collect();
        assert_eq!(vec![OpType::Add, OpType::UpdateField, OpType::Delete], ops);
        assert_eq!(vec![2, 3, 4], timestamps(&container));
    }

    #[test]
    fn test_merge_updates() {
        let mut container = new_container(normal_schema(), &[]);
        let updates: [&[(FieldId, Value)]; 3] = [
            &[(FIELD_INT, Value::Int32(1)), (FIELD_PRICE, Value::Float64(1.0))],
            &[(FIELD_INT, Value::Int32(2)), (FIELD_UINT, Value::UInt32(2))],
            &[(FIELD_UINT, Value::UInt32(3))],
        ];
        for (offset, attributes) in updates.into_iter().enumerate() {
            container
                .push_document(new_document(
                    OpType::UpdateField,
                    "pk",
                    offset as i64,
                    attributes,
                ))
                .unwrap();
        }
        container.sort_document().unwrap();

        assert_eq!(1, container.sorted_doc_count());
        let merged = &container[0];
        assert_eq!(Some(&Value::Int32(2)), merged.attribute(FIELD_INT));
        assert_eq!(Some(&Value::Float64(1.0)), merged.attribute(FIELD_PRICE));
        assert_eq!(Some(&Value::UInt32(3)), merged.attribute(FIELD_UINT));
        assert_eq!(0, merged.timestamp());
        assert_eq!(Locator::new(0, 2), merged.locator());
    }

    #[test]
    fn test_unprocessed_count() {
        let mut container = new_container(normal_schema(), &[]);
        let attrs = [(FIELD_INT, Value::Int32(1))];
        container
            .push_document(new_document(OpType::Add, "a", 1, &attrs))
            .unwrap();
        container
            .push_document(new_document(OpType::Add, "a", 2, &attrs))
            .unwrap();
        assert_eq!(2, container.unprocessed_count());
        assert_eq!(0, container.sorted_doc_count());

        container.sort_document().unwrap();
        assert!(container.is_sorted());
        assert_eq!(1, container.unprocessed_count());
        // Sorting again is a no-op.
        container.sort_document().unwrap();
        assert_eq!(1, container.sorted_doc_count());

        container
            .push_document(new_document(OpType::Add, "b", 3, &attrs))
            .unwrap();
        assert!(!container.is_sorted());
        assert_eq!(3, container.unprocessed_count());
        container.sort_document().unwrap();
        assert_eq!(2, container.sorted_doc_count());
        assert!(container.sorted_doc_count() <= container.all_doc_count());

        container.clear();
        assert_eq!(0, container.unprocessed_count());
        assert_eq!(0, container.all_doc_count());
        assert!(container.get(0).is_none());
    }

    #[test]
    fn test_not_initialized() {
        let mut container = SortDocumentContainer::new();
        let err = container
            .push_document(new_document(OpType::Add, "a", 0, &[]))
            .unwrap_err();
        assert!(matches!(err, Error::NotInitialized { .. }), "{err:?}");
        let err = container.sort_document().unwrap_err();
        assert!(matches!(err, Error::NotInitialized { .. }), "{err:?}");
    }

    #[test]
    fn test_push_invalid_document() {
        let mut container = new_container(normal_schema(), &[("int", SortPattern::Asc)]);
        let err = container
            .push_document(new_document(OpType::Add, "a", 10, &[]))
            .unwrap_err();
        assert!(matches!(err, Error::MissingSortField { .. }), "{err:?}");
        assert_eq!(0, container.all_doc_count());
        assert_eq!(Locator::new(0, 0), container.last_locator());
    }

    #[test]
    fn test_swap() {
        let mut building = new_container(normal_schema(), &[]);
        let mut flushing = new_container(kv_schema(), &[("score", SortPattern::Asc)]);
        building
            .push_document(new_document(
                OpType::Add,
                "a",
                4,
                &[(FIELD_INT, Value::Int32(1))],
            ))
            .unwrap();
        building.sort_document().unwrap();

        building.swap(&mut flushing);
        assert!(building.is_empty());
        assert_eq!(Locator::new(0, 0), building.last_locator());
        assert_eq!(1, flushing.sorted_doc_count());
        assert_eq!(Locator::new(0, 4), flushing.last_locator());

        // The swapped-in container keeps its own sorter.
        building
            .push_document(new_document(
                OpType::Add,
                "k",
                5,
                &[(KV_FIELD_SCORE, Value::UInt32(1))],
            ))
            .unwrap();
        building.sort_document().unwrap();
        assert_eq!(1, building.sorted_doc_count());
        assert!(building.memory_use() > 0);

        flushing.clear();
        assert_eq!(Locator::new(0, 4), flushing.first_locator());
    }
}
