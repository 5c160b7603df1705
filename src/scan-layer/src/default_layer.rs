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

use crate::range::{DocIdRangeMeta, LayerMeta, LayerMetas, QuotaMode, QuotaType};
use crate::reader::IndexRangeReader;
use crate::util;

/// Builds the layer used when a query declares no layer.
pub struct DefaultLayerMetaUtil;

impl DefaultLayerMetaUtil {
    /// Returns one layer over all documents of `reader` with the given quota.
    pub fn create_default_layer_metas(reader: &dyn IndexRangeReader, quota: u32) -> LayerMetas {
        vec![Self::create_default_layer_meta(reader, quota)]
    }

    pub fn create_default_layer_meta(reader: &dyn IndexRangeReader, quota: u32) -> LayerMeta {
        let total_doc_count = reader.total_doc_count();
        let mut ranges = if total_doc_count == 0 {
            Vec::new()
        } else {
            vec![DocIdRangeMeta::new(0, total_doc_count - 1)]
        };
        util::mark_ordered_type(
            &mut ranges,
            &reader.sorted_ranges(),
            &reader.unsorted_ranges(),
        );

        let mut layer_meta = LayerMeta {
            ranges,
            quota,
            max_quota: quota,
            quota_mode: QuotaMode::PerDoc,
            quota_type: QuotaType::Proportion,
            need_aggregate: false,
        };
        util::distribute_quota(&mut layer_meta);
        layer_meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::OrderedType;
    use crate::reader::MemIndexRangeReader;
    use crate::test_util::new_test_reader;

    #[test]
    fn test_default_layer() {
        let reader = new_test_reader();
        let layers = DefaultLayerMetaUtil::create_default_layer_metas(&reader, u32::MAX);
        assert_eq!(1, layers.len());
        let layer = &layers[0];
        assert_eq!(1, layer.ranges.len());
        assert_eq!((0, 19), (layer.ranges[0].begin, layer.ranges[0].end));
        // The layer spans sorted and unsorted segments.
        assert_eq!(OrderedType::Unknown, layer.ranges[0].ordered);
        assert_eq!(u32::MAX, layer.ranges[0].quota);
        assert_eq!(u32::MAX, layer.quota);
        assert_eq!(QuotaMode::PerDoc, layer.quota_mode);
        assert_eq!(QuotaType::Proportion, layer.quota_type);
        assert!(!layer.need_aggregate);
    }

    #[test]
    fn test_default_layer_sorted_index() {
        let reader = MemIndexRangeReader::builder(&["a"])
            .sorted_segment(vec![vec![1], vec![2]])
            .build();
        let layer = DefaultLayerMetaUtil::create_default_layer_meta(&reader, 10);
        assert_eq!(OrderedType::Sorted, layer.ranges[0].ordered);
        assert_eq!(10, layer.ranges[0].quota);
    }

    #[test]
    fn test_default_layer_empty_index() {
        let reader = MemIndexRangeReader::builder(&["a"]).build();
        let layer = DefaultLayerMetaUtil::create_default_layer_meta(&reader, 10);
        assert!(layer.is_empty());
        assert_eq!(10, layer.quota);
    }
}
