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

//! Docid ranges and layers.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type DocId = u32;

/// Whether documents in a range are sorted by the sort attributes of the index.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderedType {
    Sorted,
    Unsorted,
    #[default]
    Unknown,
}

/// An inclusive docid range `[begin, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocIdRangeMeta {
    pub begin: DocId,
    pub end: DocId,
    pub ordered: OrderedType,
    /// Number of documents the scanner may return from this range.
    pub quota: u32,
}

impl DocIdRangeMeta {
    pub fn new(begin: DocId, end: DocId) -> Self {
        debug_assert!(begin <= end);
        Self {
            begin,
            end,
            ordered: OrderedType::Unknown,
            quota: 0,
        }
    }

    pub fn with_ordered(mut self, ordered: OrderedType) -> Self {
        self.ordered = ordered;
        self
    }

    /// Number of documents in the range.
    pub fn doc_count(&self) -> u64 {
        (self.end - self.begin) as u64 + 1
    }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.begin <= doc_id && doc_id <= self.end
    }
}

impl fmt::Display for DocIdRangeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.begin, self.end)
    }
}

/// Where the quota of a layer is enforced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaMode {
    /// Every document matched counts against the quota.
    #[default]
    PerDoc,
    /// The quota applies to the layer as a whole.
    PerLayer,
}

/// How the quota of a layer is spread over its ranges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaType {
    /// Proportional to the number of documents of each range.
    #[default]
    Proportion,
    /// The quota is a fixed count per range.
    Quota,
    /// Evenly across ranges.
    Average,
}

/// Sorted, non-overlapping docid ranges of a layer and their quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMeta {
    pub ranges: Vec<DocIdRangeMeta>,
    pub quota: u32,
    /// Quota declared for the layer.
    pub max_quota: u32,
    pub quota_mode: QuotaMode,
    pub quota_type: QuotaType,
    /// Whether results of all layers must be aggregated.
    pub need_aggregate: bool,
}

impl Default for LayerMeta {
    fn default() -> Self {
        Self {
            ranges: Vec::new(),
            quota: u32::MAX,
            max_quota: u32::MAX,
            quota_mode: QuotaMode::default(),
            quota_type: QuotaType::default(),
            need_aggregate: false,
        }
    }
}

impl LayerMeta {
    pub fn new(ranges: Vec<DocIdRangeMeta>) -> Self {
        Self {
            ranges,
            ..Default::default()
        }
    }

    /// Returns a layer with the same quota settings but the given ranges.
    pub fn with_ranges(&self, ranges: Vec<DocIdRangeMeta>) -> Self {
        Self {
            ranges,
            quota: self.quota,
            max_quota: self.max_quota,
            quota_mode: self.quota_mode,
            quota_type: self.quota_type,
            need_aggregate: self.need_aggregate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn doc_count(&self) -> u64 {
        self.ranges.iter().map(|r| r.doc_count()).sum()
    }
}

impl fmt::Display for LayerMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quota: {}, max_quota: {}, quota_mode: {:?}, quota_type: {:?}, need_aggregate: {}, ranges: ",
            self.quota, self.max_quota, self.quota_mode, self.quota_type, self.need_aggregate
        )?;
        for range in &self.ranges {
            write!(f, "{range}")?;
        }
        Ok(())
    }
}

pub type LayerMetas = Vec<LayerMeta>;
