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

//! Interval arithmetic over sorted, non-overlapping docid ranges.

use std::cmp;

use itertools::Itertools;
use snafu::ensure;

use crate::error::{InvalidWayCountSnafu, Result, SplitOverflowSnafu};
use crate::range::{DocId, DocIdRangeMeta, LayerMeta, LayerMetas, OrderedType, QuotaType};
use crate::reader::IndexRangeReader;

/// Unions two range sets into sorted ranges. Overlapping and adjacent ranges
/// are coalesced and keep the metadata of the leftmost range.
pub fn accumulate_ranges(a: &[DocIdRangeMeta], b: &[DocIdRangeMeta]) -> Vec<DocIdRangeMeta> {
    a.iter()
        .chain(b)
        .copied()
        .sorted_by_key(|range| range.begin)
        .coalesce(|prev, next| {
            if next.begin as u64 <= prev.end as u64 + 1 {
                Ok(DocIdRangeMeta {
                    end: cmp::max(prev.end, next.end),
                    ..prev
                })
            } else {
                Err((prev, next))
            }
        })
        .collect()
}

/// Intersects two sorted, non-overlapping range sets. Output ranges keep the
/// metadata of the ranges in `a`.
pub fn intersect_ranges(a: &[DocIdRangeMeta], b: &[DocIdRangeMeta]) -> Vec<DocIdRangeMeta> {
    let mut result = Vec::with_capacity(cmp::min(a.len(), b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (left, right) = (&a[i], &b[j]);
        let begin = cmp::max(left.begin, right.begin);
        let end = cmp::min(left.end, right.end);
        if begin <= end {
            result.push(DocIdRangeMeta {
                begin,
                end,
                ..*left
            });
        }
        if left.end < right.end {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// Returns the complement of sorted, non-overlapping `ranges` within
/// `[0, total_doc_count)`.
pub fn reverse_range_with_end(
    ranges: &[DocIdRangeMeta],
    total_doc_count: DocId,
) -> Vec<DocIdRangeMeta> {
    let mut result = Vec::with_capacity(ranges.len() + 1);
    // Next docid not covered yet.
    let mut cursor = 0u64;
    let total = total_doc_count as u64;
    for range in ranges {
        if cursor >= total {
            break;
        }
        let begin = range.begin as u64;
        if begin > cursor {
            let end = cmp::min(begin, total) - 1;
            result.push(DocIdRangeMeta::new(cursor as DocId, end as DocId));
        }
        cursor = cmp::max(cursor, range.end as u64 + 1);
    }
    if cursor < total {
        result.push(DocIdRangeMeta::new(cursor as DocId, (total - 1) as DocId));
    }
    result
}

/// Selects the documents at `[from, to)` percent of the concatenated `ranges`.
///
/// Both boundaries round up, so slices of adjacent percent intervals never
/// overlap and never leave a gap.
pub fn percent_convert(ranges: &[DocIdRangeMeta], from: u32, to: u32) -> Vec<DocIdRangeMeta> {
    let from = cmp::min(from, 100) as u64;
    let to = cmp::min(to, 100) as u64;
    if from >= to {
        return Vec::new();
    }

    let total: u64 = ranges.iter().map(|range| range.doc_count()).sum();
    let start = (total * from).div_ceil(100);
    let end = (total * to).div_ceil(100);

    let mut result = Vec::new();
    let mut offset = 0u64;
    for range in ranges {
        let count = range.doc_count();
        let local_begin = cmp::max(start, offset);
        let local_end = cmp::min(end, offset + count);
        if local_begin < local_end {
            let begin = range.begin as u64 + (local_begin - offset);
            let end = range.begin as u64 + (local_end - offset) - 1;
            result.push(DocIdRangeMeta {
                begin: begin as DocId,
                end: end as DocId,
                ..*range
            });
        }
        offset += count;
        if offset >= end {
            break;
        }
    }
    result
}

/// Splits `ranges` into at most `way_count` groups holding the same number of
/// documents, except the last one. Empty groups are omitted.
pub fn split_ranges_evenly(
    ranges: &[DocIdRangeMeta],
    way_count: usize,
) -> Vec<Vec<DocIdRangeMeta>> {
    let total: u64 = ranges.iter().map(|range| range.doc_count()).sum();
    if way_count == 0 || total == 0 {
        return Vec::new();
    }
    let chunk = total.div_ceil(way_count as u64);

    let mut splits = Vec::with_capacity(way_count);
    let mut current = Vec::new();
    let mut remaining = chunk;
    for range in ranges {
        let mut begin = range.begin as u64;
        let end = range.end as u64;
        while begin <= end {
            let take = cmp::min(remaining, end - begin + 1);
            current.push(DocIdRangeMeta {
                begin: begin as DocId,
                end: (begin + take - 1) as DocId,
                ..*range
            });
            begin += take;
            remaining -= take;
            if remaining == 0 {
                splits.push(std::mem::take(&mut current));
                remaining = chunk;
            }
        }
    }
    if !current.is_empty() {
        splits.push(current);
    }
    splits
}

/// Fans out every layer over `way_count` workers.
///
/// Returns exactly `way_count` [LayerMetas], one per worker, each holding one
/// layer per input layer. Layers keep their quota settings in every split.
/// Workers the partitioner leaves without ranges get an empty layer.
pub fn split_layer_metas(
    layer_metas: &LayerMetas,
    way_count: usize,
    reader: &dyn IndexRangeReader,
) -> Result<Vec<LayerMetas>> {
    ensure!(way_count > 0, InvalidWayCountSnafu { way_count });

    let mut result = vec![LayerMetas::with_capacity(layer_metas.len()); way_count];
    for layer_meta in layer_metas {
        let splits = reader.partition_ranges(&layer_meta.ranges, way_count);
        ensure!(
            splits.len() <= way_count,
            SplitOverflowSnafu {
                actual: splits.len(),
                way_count,
            }
        );

        let mut splits = splits.into_iter();
        for worker in result.iter_mut() {
            let ranges = splits.next().unwrap_or_default();
            worker.push(layer_meta.with_ranges(ranges));
        }
    }
    Ok(result)
}

/// Assigns every range of `layer_meta` its share of the layer quota.
///
/// Shares are proportional to the range length for [QuotaType::Proportion]
/// and even otherwise. The remainder goes to the leading ranges so the shares
/// sum to the layer quota.
pub fn distribute_quota(layer_meta: &mut LayerMeta) {
    let range_count = layer_meta.ranges.len() as u64;
    if range_count == 0 {
        return;
    }
    let quota = layer_meta.quota as u64;

    let mut assigned = 0u64;
    match layer_meta.quota_type {
        QuotaType::Proportion => {
            let total = layer_meta.doc_count();
            for range in layer_meta.ranges.iter_mut() {
                let share = (quota as u128 * range.doc_count() as u128 / total as u128) as u64;
                range.quota = share as u32;
                assigned += share;
            }
        }
        QuotaType::Average | QuotaType::Quota => {
            let share = quota / range_count;
            for range in layer_meta.ranges.iter_mut() {
                range.quota = share as u32;
                assigned += share;
            }
        }
    }

    // The remainder is less than the range count.
    let remainder = quota - assigned;
    for range in layer_meta.ranges.iter_mut().take(remainder as usize) {
        range.quota += 1;
    }
}

/// Tags every range as sorted or unsorted if one of the given ranges covers it.
pub fn mark_ordered_type(
    ranges: &mut [DocIdRangeMeta],
    sorted_ranges: &[DocIdRangeMeta],
    unsorted_ranges: &[DocIdRangeMeta],
) {
    let sorted_ranges = accumulate_ranges(sorted_ranges, &[]);
    let unsorted_ranges = accumulate_ranges(unsorted_ranges, &[]);
    let covered_by = |range: &DocIdRangeMeta, candidates: &[DocIdRangeMeta]| {
        candidates
            .iter()
            .any(|candidate| candidate.begin <= range.begin && range.end <= candidate.end)
    };

    for range in ranges.iter_mut() {
        range.ordered = if covered_by(range, &sorted_ranges) {
            OrderedType::Sorted
        } else if covered_by(range, &unsorted_ranges) {
            OrderedType::Unsorted
        } else {
            OrderedType::Unknown
        };
    }
}
