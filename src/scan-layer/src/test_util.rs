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

//! Utilities for testing.

use std::sync::Arc;

use crate::range::{DocId, DocIdRangeMeta};
use crate::reader::{IndexRangeReaderRef, MemIndexRangeReader};

/// Builds ranges `[begin, end]` without metadata.
pub(crate) fn ranges(bounds: &[(DocId, DocId)]) -> Vec<DocIdRangeMeta> {
    bounds
        .iter()
        .map(|(begin, end)| DocIdRangeMeta::new(*begin, *end))
        .collect()
}

/// Returns a reader over attributes `price` and `type` with 20 documents:
/// - sorted segment 0: docids `[0, 9]`
/// - sorted segment 1: docids `[10, 15]`
/// - unsorted segment 2: docids `[16, 19]`
pub(crate) fn new_test_reader() -> MemIndexRangeReader {
    MemIndexRangeReader::builder(&["price", "type"])
        .sorted_segment(vec![
            vec![10, 1],
            vec![10, 2],
            vec![20, 1],
            vec![20, 2],
            vec![30, 1],
            vec![40, 1],
            vec![50, 1],
            vec![50, 2],
            vec![60, 1],
            vec![70, 1],
        ])
        .sorted_segment(vec![
            vec![15, 1],
            vec![25, 1],
            vec![35, 2],
            vec![45, 1],
            vec![55, 1],
            vec![65, 2],
        ])
        .unsorted_segment(vec![vec![100, 1], vec![5, 2], vec![50, 1], vec![20, 2]])
        .build()
}

pub(crate) fn new_test_reader_ref() -> IndexRangeReaderRef {
    Arc::new(new_test_reader())
}
