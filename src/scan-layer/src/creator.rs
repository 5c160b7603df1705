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

//! Resolves declared layers into docid ranges.

use common_telemetry::{debug, info, warn};
use itertools::Itertools;
use snafu::{ensure, OptionExt};

use crate::clause::{
    LayerDescription, LayerKeyRange, QueryLayerClause, KEYWORD_DOCID, KEYWORD_OTHER,
    KEYWORD_PERCENT, KEYWORD_SEGMENTID, KEYWORD_SORTED, KEYWORD_UNSORTED,
};
use crate::config::ScanLayerConfig;
use crate::default_layer::DefaultLayerMetaUtil;
use crate::error::{InvalidDocIdRangeSnafu, InvalidKeywordValueSnafu, Result, UnknownKeywordSnafu};
use crate::range::{DocId, DocIdRangeMeta, LayerMeta, LayerMetas, QuotaMode, QuotaType};
use crate::reader::IndexRangeReaderRef;
use crate::util;

/// A layer and whether its ranges are exact.
struct ResolvedLayer {
    layer_meta: LayerMeta,
    /// False if some dimensions could not narrow the ranges.
    exact: bool,
}

/// Creates [LayerMetas] of a query from its layer clause.
pub struct LayerMetasCreator {
    reader: IndexRangeReaderRef,
    default_quota: u32,
}

impl LayerMetasCreator {
    pub fn new(reader: IndexRangeReaderRef) -> Self {
        Self {
            reader,
            default_quota: u32::MAX,
        }
    }

    /// Sets the quota of the fallback layer.
    pub fn with_default_quota(mut self, default_quota: u32) -> Self {
        self.default_quota = default_quota;
        self
    }

    pub fn reader(&self) -> &IndexRangeReaderRef {
        &self.reader
    }

    /// Creates layers declared by `clause` in order.
    ///
    /// Falls back to one layer over the whole index if the clause is absent or
    /// every declared layer is empty. No layer is appended for documents left
    /// unclaimed; declare a trailing `range:%other` layer to scan them.
    pub fn create_layer_metas(&self, clause: Option<&QueryLayerClause>) -> Result<LayerMetas> {
        let Some(clause) = clause.filter(|clause| !clause.is_empty()) else {
            return Ok(self.create_default_layer_metas());
        };

        // Ranges claimed by previous layers.
        let mut visited = Vec::new();
        let mut layer_metas = LayerMetas::with_capacity(clause.layer_descriptions().len());
        for description in clause.layer_descriptions() {
            let resolved = self.resolve_layer(description, &visited)?;
            if resolved.exact {
                visited = util::accumulate_ranges(&visited, &resolved.layer_meta.ranges);
            }
            if resolved.layer_meta.is_empty() {
                debug!("Skip empty layer {}", description);
                continue;
            }
            layer_metas.push(resolved.layer_meta);
        }

        if layer_metas.is_empty() {
            return Ok(self.create_default_layer_metas());
        }
        let need_aggregate = layer_metas.len() > 1;
        for layer_meta in &mut layer_metas {
            layer_meta.need_aggregate = need_aggregate;
        }
        debug!(
            "Created layers: [{}]",
            layer_metas.iter().map(|layer| layer.to_string()).join("; ")
        );

        Ok(layer_metas)
    }

    /// Creates the layer of `description`. `%other` matches documents outside
    /// of `visited`.
    pub fn create_layer_meta(
        &self,
        description: &LayerDescription,
        visited: &[DocIdRangeMeta],
    ) -> Result<LayerMeta> {
        self.resolve_layer(description, visited)
            .map(|resolved| resolved.layer_meta)
    }

    fn create_default_layer_metas(&self) -> LayerMetas {
        DefaultLayerMetaUtil::create_default_layer_metas(self.reader.as_ref(), self.default_quota)
    }

    fn resolve_layer(
        &self,
        description: &LayerDescription,
        visited: &[DocIdRangeMeta],
    ) -> Result<ResolvedLayer> {
        let total_doc_count = self.reader.total_doc_count();
        let mut ranges = if total_doc_count == 0 {
            Vec::new()
        } else {
            vec![DocIdRangeMeta::new(0, total_doc_count - 1)]
        };
        let mut quota_mode = description.quota_mode;
        let mut exact = true;

        // Consecutive attribute dimensions are looked up together.
        let key_ranges = &description.key_ranges;
        let mut batch_start = 0;
        for (idx, key_range) in key_ranges.iter().enumerate() {
            if !key_range.is_keyword() {
                continue;
            }
            exact &= self.narrow_by_attributes(&key_ranges[batch_start..idx], &mut ranges)?;
            batch_start = idx + 1;
            self.narrow_by_keyword(key_range, visited, &mut ranges, &mut quota_mode)?;
        }
        exact &= self.narrow_by_attributes(&key_ranges[batch_start..], &mut ranges)?;
        if !exact {
            quota_mode = QuotaMode::PerLayer;
        }

        util::mark_ordered_type(
            &mut ranges,
            &self.reader.sorted_ranges(),
            &self.reader.unsorted_ranges(),
        );
        let mut layer_meta = LayerMeta {
            ranges,
            quota: description.quota,
            max_quota: description.quota,
            quota_mode,
            quota_type: description.quota_type,
            need_aggregate: false,
        };
        if layer_meta.quota_type == QuotaType::Quota {
            // The quota applies to every range.
            let range_count = u32::try_from(layer_meta.ranges.len()).unwrap_or(u32::MAX);
            layer_meta.quota_type = QuotaType::Average;
            layer_meta.quota = description.quota.saturating_mul(range_count);
        }
        util::distribute_quota(&mut layer_meta);

        Ok(ResolvedLayer { layer_meta, exact })
    }

    /// Narrows `ranges` by attribute dimensions. Returns false if the reader
    /// rejects the dimensions and `ranges` stay unchanged.
    fn narrow_by_attributes(
        &self,
        key_ranges: &[LayerKeyRange],
        ranges: &mut Vec<DocIdRangeMeta>,
    ) -> Result<bool> {
        if key_ranges.is_empty() {
            return Ok(true);
        }
        if !self.reader.validate_dimensions(key_ranges) {
            warn!(
                "Unable to look up ranges of dimensions [{}], scan the layer with per layer quota",
                key_ranges.iter().join("*")
            );
            return Ok(false);
        }

        let matched = self.reader.lookup_ranges(key_ranges)?;
        *ranges = util::intersect_ranges(ranges, &matched);
        Ok(true)
    }

    fn narrow_by_keyword(
        &self,
        key_range: &LayerKeyRange,
        visited: &[DocIdRangeMeta],
        ranges: &mut Vec<DocIdRangeMeta>,
        quota_mode: &mut QuotaMode,
    ) -> Result<()> {
        let total_doc_count = self.reader.total_doc_count();
        match key_range.attr_name.as_str() {
            KEYWORD_DOCID => {
                if key_range.is_unbounded() {
                    return Ok(());
                }
                let docid_ranges = self.docid_ranges(key_range, total_doc_count)?;
                *ranges = util::intersect_ranges(ranges, &docid_ranges);
            }
            KEYWORD_SEGMENTID => {
                if key_range.is_unbounded() {
                    return Ok(());
                }
                let segment_ranges = self.segment_ranges(key_range)?;
                *ranges = util::intersect_ranges(ranges, &segment_ranges);
            }
            KEYWORD_SORTED => {
                let sorted = util::accumulate_ranges(&self.reader.sorted_ranges(), &[]);
                *ranges = util::intersect_ranges(ranges, &sorted);
            }
            KEYWORD_UNSORTED => {
                let unsorted = util::accumulate_ranges(&self.reader.unsorted_ranges(), &[]);
                *ranges = util::intersect_ranges(ranges, &unsorted);
                *quota_mode = QuotaMode::PerLayer;
            }
            KEYWORD_PERCENT => {
                if key_range.is_unbounded() {
                    return Ok(());
                }
                *ranges = self.percent_ranges(key_range, ranges)?;
            }
            KEYWORD_OTHER => {
                let others = util::reverse_range_with_end(visited, total_doc_count);
                *ranges = util::intersect_ranges(ranges, &others);
            }
            keyword => {
                return UnknownKeywordSnafu { keyword }.fail();
            }
        }
        Ok(())
    }

    /// Unions docid values and ranges of `%docid`, clamped to the index.
    fn docid_ranges(
        &self,
        key_range: &LayerKeyRange,
        total_doc_count: DocId,
    ) -> Result<Vec<DocIdRangeMeta>> {
        let mut docid_ranges = Vec::new();
        for (begin, end) in keyword_bounds(key_range, DocId::MAX)? {
            ensure!(begin <= end, InvalidDocIdRangeSnafu { begin, end });
            if begin >= total_doc_count {
                continue;
            }
            let end = end.min(total_doc_count - 1);
            docid_ranges.push(DocIdRangeMeta::new(begin, end));
        }
        Ok(util::accumulate_ranges(&docid_ranges, &[]))
    }

    /// Unions docid ranges of the segments selected by `%segmentid`.
    fn segment_ranges(&self, key_range: &LayerKeyRange) -> Result<Vec<DocIdRangeMeta>> {
        let segment_doc_counts = self.reader.segment_doc_counts();
        let mut segments = Vec::with_capacity(segment_doc_counts.len());
        let mut base_docid = 0;
        for doc_count in segment_doc_counts {
            segments.push((base_docid, doc_count));
            base_docid += doc_count;
        }

        let mut segment_ranges = Vec::new();
        for (begin, end) in keyword_bounds(key_range, DocId::MAX)? {
            ensure!(
                begin <= end,
                InvalidKeywordValueSnafu {
                    keyword: KEYWORD_SEGMENTID,
                    value: format!("[{begin},{end}]"),
                }
            );
            let selected = segments
                .iter()
                .enumerate()
                .filter(|(segment_id, _)| (begin..=end).contains(&(*segment_id as DocId)))
                .filter(|(_, (_, doc_count))| *doc_count > 0)
                .map(|(_, (base_docid, doc_count))| {
                    DocIdRangeMeta::new(*base_docid, base_docid + doc_count - 1)
                });
            segment_ranges.extend(selected);
        }
        Ok(util::accumulate_ranges(&segment_ranges, &[]))
    }

    /// Unions percent slices `[from, to)` of `ranges` declared by `%percent`.
    fn percent_ranges(
        &self,
        key_range: &LayerKeyRange,
        ranges: &[DocIdRangeMeta],
    ) -> Result<Vec<DocIdRangeMeta>> {
        ensure!(
            key_range.values.is_empty(),
            InvalidKeywordValueSnafu {
                keyword: KEYWORD_PERCENT,
                value: key_range.values.join(","),
            }
        );

        let mut sliced = Vec::new();
        for (from, to) in keyword_bounds(key_range, 100)? {
            ensure!(
                from <= to && to <= 100,
                InvalidKeywordValueSnafu {
                    keyword: KEYWORD_PERCENT,
                    value: format!("[{from},{to}]"),
                }
            );
            let slice = util::percent_convert(ranges, from, to);
            sliced = util::accumulate_ranges(&sliced, &slice);
        }
        Ok(sliced)
    }
}

/// Returns inclusive numeric bounds of a keyword. A value `v` is `[v, v]` and
/// empty range bounds are `0` and `upper`.
fn keyword_bounds(key_range: &LayerKeyRange, upper: u32) -> Result<Vec<(u32, u32)>> {
    let parse = |value: &str, unbounded: u32| -> Result<u32> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(unbounded);
        }
        value.parse().ok().context(InvalidKeywordValueSnafu {
            keyword: &key_range.attr_name,
            value,
        })
    };

    let mut bounds = Vec::with_capacity(key_range.values.len() + key_range.ranges.len());
    for value in &key_range.values {
        ensure!(
            !value.trim().is_empty(),
            InvalidKeywordValueSnafu {
                keyword: &key_range.attr_name,
                value,
            }
        );
        let value = parse(value.as_str(), 0)?;
        bounds.push((value, value));
    }
    for range in &key_range.ranges {
        bounds.push((parse(range.from.as_str(), 0)?, parse(range.to.as_str(), upper)?));
    }
    Ok(bounds)
}

/// Plans layers of a scan and fans them out over `config.parallel_num`
/// scanners.
pub fn plan_scan_layers(
    config: &ScanLayerConfig,
    reader: IndexRangeReaderRef,
) -> Result<Vec<LayerMetas>> {
    let mut config = config.clone();
    config.sanitize();

    let clause = config
        .layer_clause
        .as_deref()
        .map(str::parse::<QueryLayerClause>)
        .transpose()?;
    let creator = LayerMetasCreator::new(reader).with_default_quota(config.default_quota);
    let layer_metas = creator.create_layer_metas(clause.as_ref())?;
    info!(
        "Plan {} scan layers over {} documents for {} scanners",
        layer_metas.len(),
        creator.reader().total_doc_count(),
        config.parallel_num
    );

    util::split_layer_metas(&layer_metas, config.parallel_num, creator.reader().as_ref())
}
