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

use lazy_static::lazy_static;
use prometheus::*;

/// Reason a document is dropped from the sorted output.
pub const DROP_REASON: &str = "reason";
/// Table type label.
pub const TABLE_TYPE_LABEL: &str = "table_type";

lazy_static! {
    /// Counter of documents pushed into sort containers.
    pub static ref PUSHED_DOCUMENTS_TOTAL: IntCounter = register_int_counter!(
        "greptime_doc_sort_pushed_documents_total",
        "doc sort pushed documents total"
    )
    .unwrap();
    /// Counter of documents dropped by merging or superseding.
    pub static ref DROPPED_DOCUMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greptime_doc_sort_dropped_documents_total",
        "doc sort dropped documents total",
        &[DROP_REASON]
    )
    .unwrap();
    /// Elapsed time of sorting a batch.
    pub static ref SORT_ELAPSED: HistogramVec = register_histogram_vec!(
        "greptime_doc_sort_sort_elapsed",
        "doc sort sort elapsed",
        &[TABLE_TYPE_LABEL],
        vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    )
    .unwrap();
}
