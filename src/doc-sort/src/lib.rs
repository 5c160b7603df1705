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

//! Sorting, merging and deduplicating a batch of documents before they are
//! built into an index.
//!
//! Callers push documents into a [SortDocumentContainer](container::SortDocumentContainer),
//! sort the batch once and then consume the documents in their final order.

pub mod codec;
pub mod config;
pub mod container;
pub mod converter;
pub mod document;
pub mod error;
pub mod locator;
pub mod metrics;
pub mod schema;
pub mod sorter;
#[cfg(test)]
pub(crate) mod test_util;
pub mod value;
