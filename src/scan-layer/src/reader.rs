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

use std::collections::HashSet;
use std::sync::Arc;

use snafu::{ensure, OptionExt};

use crate::clause::LayerKeyRange;
use crate::error::{AttributeNotFoundSnafu, InvalidAttributeValueSnafu, Result};
use crate::range::{DocId, DocIdRangeMeta, OrderedType};
use crate::util;

/// Range metadata of the index snapshot to scan.
pub trait IndexRangeReader: Send + Sync {
    /// Number of documents in the snapshot.
    fn total_doc_count(&self) -> DocId;

    /// Number of documents of each segment, in docid order.
    fn segment_doc_counts(&self) -> Vec<DocId>;

    /// Docid ranges sorted by the sort attributes.
    fn sorted_ranges(&self) -> Vec<DocIdRangeMeta>;

    /// Docid ranges not sorted by the sort attributes.
    fn unsorted_ranges(&self) -> Vec<DocIdRangeMeta>;

    /// Returns true if the reader can look up ranges of these dimensions
    /// exactly.
    fn validate_dimensions(&self, key_ranges: &[LayerKeyRange]) -> bool;

    /// Returns sorted, non-overlapping ranges that may contain documents
    /// matching all dimensions.
    fn lookup_ranges(&self, key_ranges: &[LayerKeyRange]) -> Result<Vec<DocIdRangeMeta>>;

    /// Partitions `ranges` into at most `way_count` groups.
    fn partition_ranges(
        &self,
        ranges: &[DocIdRangeMeta],
        way_count: usize,
    ) -> Vec<Vec<DocIdRangeMeta>> {
        util::split_ranges_evenly(ranges, way_count)
    }
}

pub type IndexRangeReaderRef = Arc<dyn IndexRangeReader>;

#[derive(Debug)]
struct Segment {
    base_docid: DocId,
    sorted: bool,
    /// Attribute values of each document.
    rows: Vec<Vec<i64>>,
}

impl Segment {
    fn range(&self) -> Option<DocIdRangeMeta> {
        (!self.rows.is_empty()).then(|| {
            DocIdRangeMeta::new(
                self.base_docid,
                self.base_docid + self.rows.len() as DocId - 1,
            )
        })
    }
}

/// Inclusive bounds an attribute value must fall into.
type AttrFilter = (usize, Vec<(i64, i64)>);

/// In-memory [IndexRangeReader] over segments of integer attribute rows.
///
/// Rows of sorted segments are ordered by the attributes in declaration
/// order, so a lookup may narrow sorted segments by a prefix of the
/// attributes. Unsorted segments always match as a whole.
#[derive(Debug)]
pub struct MemIndexRangeReader {
    attr_names: Vec<String>,
    segments: Vec<Segment>,
    total_doc_count: DocId,
}

impl MemIndexRangeReader {
    pub fn builder(attr_names: &[&str]) -> MemIndexRangeReaderBuilder {
        MemIndexRangeReaderBuilder {
            attr_names: attr_names.iter().map(|name| name.to_string()).collect(),
            segments: Vec::new(),
            next_docid: 0,
        }
    }

    pub fn attr_names(&self) -> &[String] {
        &self.attr_names
    }

    fn segment_ranges(&self, sorted: bool) -> Vec<DocIdRangeMeta> {
        let ordered = if sorted {
            OrderedType::Sorted
        } else {
            OrderedType::Unsorted
        };
        self.segments
            .iter()
            .filter(|segment| segment.sorted == sorted)
            .filter_map(|segment| segment.range())
            .map(|range| range.with_ordered(ordered))
            .collect()
    }

    fn build_filter(&self, key_range: &LayerKeyRange) -> Result<AttrFilter> {
        let attr_idx = self
            .attr_names
            .iter()
            .position(|name| *name == key_range.attr_name)
            .context(AttributeNotFoundSnafu {
                attr_name: &key_range.attr_name,
            })?;

        let parse = |value: &str, unbounded: i64| -> Result<i64> {
            if value.is_empty() {
                return Ok(unbounded);
            }
            value.parse().ok().context(InvalidAttributeValueSnafu {
                attr_name: &key_range.attr_name,
                value,
            })
        };

        let mut bounds = Vec::with_capacity(key_range.values.len() + key_range.ranges.len());
        for value in &key_range.values {
            let value = value.trim();
            ensure!(
                !value.is_empty(),
                InvalidAttributeValueSnafu {
                    attr_name: &key_range.attr_name,
                    value,
                }
            );
            let value = parse(value, 0)?;
            bounds.push((value, value));
        }
        for range in &key_range.ranges {
            bounds.push((
                parse(range.from.as_str(), i64::MIN)?,
                parse(range.to.as_str(), i64::MAX)?,
            ));
        }
        if bounds.is_empty() {
            bounds.push((i64::MIN, i64::MAX));
        }
        Ok((attr_idx, bounds))
    }
}

impl IndexRangeReader for MemIndexRangeReader {
    fn total_doc_count(&self) -> DocId {
        self.total_doc_count
    }

    fn segment_doc_counts(&self) -> Vec<DocId> {
        self.segments
            .iter()
            .map(|segment| segment.rows.len() as DocId)
            .collect()
    }

    fn sorted_ranges(&self) -> Vec<DocIdRangeMeta> {
        self.segment_ranges(true)
    }

    fn unsorted_ranges(&self) -> Vec<DocIdRangeMeta> {
        self.segment_ranges(false)
    }

    fn validate_dimensions(&self, key_ranges: &[LayerKeyRange]) -> bool {
        if key_ranges.len() > self.attr_names.len() {
            return false;
        }
        let mut seen = HashSet::with_capacity(key_ranges.len());
        // Dimensions must be distinct and form a prefix of the sort attributes.
        key_ranges.iter().all(|key_range| {
            seen.insert(&key_range.attr_name)
                && self.attr_names[..key_ranges.len()].contains(&key_range.attr_name)
        })
    }

    fn lookup_ranges(&self, key_ranges: &[LayerKeyRange]) -> Result<Vec<DocIdRangeMeta>> {
        let filters = key_ranges
            .iter()
            .map(|key_range| self.build_filter(key_range))
            .collect::<Result<Vec<_>>>()?;
        let matches = |row: &[i64]| {
            filters.iter().all(|(attr_idx, bounds)| {
                let value = row[*attr_idx];
                bounds
                    .iter()
                    .any(|(from, to)| *from <= value && value <= *to)
            })
        };

        let mut ranges = Vec::new();
        for segment in &self.segments {
            if !segment.sorted {
                ranges.extend(segment.range());
                continue;
            }
            let matched = segment
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| matches(row.as_slice()))
                .map(|(offset, _)| segment.base_docid + offset as DocId)
                .map(|docid| DocIdRangeMeta::new(docid, docid));
            ranges.extend(matched);
        }
        Ok(util::accumulate_ranges(&ranges, &[]))
    }
}

pub struct MemIndexRangeReaderBuilder {
    attr_names: Vec<String>,
    segments: Vec<Segment>,
    next_docid: DocId,
}

impl MemIndexRangeReaderBuilder {
    /// Appends a segment sorted by the attributes. Rows are sorted on push.
    pub fn sorted_segment(mut self, mut rows: Vec<Vec<i64>>) -> Self {
        rows.sort();
        self.push_segment(rows, true);
        self
    }

    /// Appends a segment in insertion order.
    pub fn unsorted_segment(mut self, rows: Vec<Vec<i64>>) -> Self {
        self.push_segment(rows, false);
        self
    }

    fn push_segment(&mut self, rows: Vec<Vec<i64>>, sorted: bool) {
        let width = self.attr_names.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, 0);
                row
            })
            .collect::<Vec<_>>();
        let base_docid = self.next_docid;
        self.next_docid += rows.len() as DocId;
        self.segments.push(Segment {
            base_docid,
            sorted,
            rows,
        });
    }

    pub fn build(self) -> MemIndexRangeReader {
        MemIndexRangeReader {
            attr_names: self.attr_names,
            segments: self.segments,
            total_doc_count: self.next_docid,
        }
    }
}
