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

//! Partitions the docid space of an index into layers of docid ranges to scan.
//!
//! A [QueryLayerClause](clause::QueryLayerClause) declares the layers. The
//! [LayerMetasCreator](creator::LayerMetasCreator) resolves them against an
//! [IndexRangeReader](reader::IndexRangeReader) into [LayerMetas](range::LayerMetas),
//! which [split_layer_metas](util::split_layer_metas) can fan out to parallel scanners.

pub mod clause;
pub mod config;
pub mod creator;
pub mod default_layer;
pub mod error;
pub mod range;
pub mod reader;
#[cfg(test)]
pub(crate) mod test_util;
pub mod util;
