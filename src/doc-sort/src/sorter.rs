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

//! Strategies to order, merge and deduplicate pushed documents.

pub mod kv;
pub mod normal;

use ahash::HashMap;
use bytes::BytesMut;

use crate::config::SortConfig;
use crate::document::Document;
use crate::error::Result;
use crate::schema::{SchemaRef, TableType};
use crate::sorter::kv::KvSortDocSorter;
use crate::sorter::normal::NormalSortDocSorter;

/// Result of sorting pushed documents.
#[derive(Debug, Default)]
pub struct SortedBatch {
    /// Push positions of the surviving documents in output order.
    pub positions: Vec<usize>,
    /// Documents that replace the pushed document at the position after
    /// merging updates into it.
    pub merged: HashMap<usize, Document>,
    /// Number of documents merged into another document.
    pub num_merged: usize,
    /// Number of documents superseded by a later document of the same key.
    pub num_superseded: usize,
}

/// Strategy to sort documents.
pub trait DocumentSorter: Send {
    /// Pushes the `document` at `position`, allocating its sort key from `pool`.
    ///
    /// Positions must be pushed in ascending order starting from 0.
    fn push(&mut self, document: &Document, position: usize, pool: &mut BytesMut) -> Result<()>;

    /// Sorts all pushed documents.
    ///
    /// Sorting doesn't consume the pushed documents so callers may push more
    /// documents and sort again.
    fn sort(&mut self) -> Result<SortedBatch>;

    /// Drops all pushed documents.
    fn clear(&mut self);

    /// Number of pushed documents.
    fn num_pushed(&self) -> usize;

    /// Bytes held by the sorter.
    fn memory_use(&self) -> usize;
}

/// Sorter chosen by the table type of the schema.
#[derive(Debug)]
pub enum SortDocSorter {
    Normal(NormalSortDocSorter),
    Kv(KvSortDocSorter),
}

impl SortDocSorter {
    pub fn try_new(config: &SortConfig, schema: SchemaRef) -> Result<Self> {
        match schema.table_type() {
            TableType::Normal => Ok(SortDocSorter::Normal(NormalSortDocSorter::try_new(
                config, schema,
            )?)),
            TableType::Kv | TableType::Kkv => Ok(SortDocSorter::Kv(KvSortDocSorter::try_new(
                config, schema,
            )?)),
        }
    }

    fn as_sorter(&self) -> &dyn DocumentSorter {
        match self {
            SortDocSorter::Normal(s) => s,
            SortDocSorter::Kv(s) => s,
        }
    }

    fn as_sorter_mut(&mut self) -> &mut dyn DocumentSorter {
        match self {
            SortDocSorter::Normal(s) => s,
            SortDocSorter::Kv(s) => s,
        }
    }
}

impl DocumentSorter for SortDocSorter {
    fn push(&mut self, document: &Document, position: usize, pool: &mut BytesMut) -> Result<()> {
        self.as_sorter_mut().push(document, position, pool)
    }

    fn sort(&mut self) -> Result<SortedBatch> {
        self.as_sorter_mut().sort()
    }

    fn clear(&mut self) {
        self.as_sorter_mut().clear()
    }

    fn num_pushed(&self) -> usize {
        self.as_sorter().num_pushed()
    }

    fn memory_use(&self) -> usize {
        self.as_sorter().memory_use()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SortPattern;
    use crate::test_util::{kkv_schema, kv_schema, normal_schema, sort_config};

    #[test]
    fn test_select_sorter() {
        let config = sort_config(&[]);
        let sorter = SortDocSorter::try_new(&config, normal_schema()).unwrap();
        assert!(matches!(sorter, SortDocSorter::Normal(_)));
        let sorter = SortDocSorter::try_new(&config, kv_schema()).unwrap();
        assert!(matches!(sorter, SortDocSorter::Kv(_)));
        let sorter = SortDocSorter::try_new(&config, kkv_schema()).unwrap();
        assert!(matches!(sorter, SortDocSorter::Kv(_)));
        assert_eq!(0, sorter.num_pushed());
    }

    #[test]
    fn test_select_sorter_invalid_field() {
        let config = sort_config(&[("unknown", SortPattern::Asc)]);
        assert!(SortDocSorter::try_new(&config, normal_schema()).is_err());
        assert!(SortDocSorter::try_new(&config, kv_schema()).is_err());
    }
}
