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

use common_telemetry::warn;
use serde::{Deserialize, Serialize};

/// Configuration for planning scan layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLayerConfig {
    /// Number of scanners working on the layers in parallel.
    pub parallel_num: usize,
    /// Quota of the layer scanning the whole index when no layer is declared.
    pub default_quota: u32,
    /// Layer clause of the query, e.g. `range:%sorted,quota:100;range:%other`.
    pub layer_clause: Option<String>,
}

impl Default for ScanLayerConfig {
    fn default() -> Self {
        Self {
            parallel_num: 1,
            default_quota: u32::MAX,
            layer_clause: None,
        }
    }
}

impl ScanLayerConfig {
    /// Sanitizes the config.
    pub fn sanitize(&mut self) {
        if self.parallel_num == 0 {
            warn!("Sanitize parallel num 0 to 1");
            self.parallel_num = 1;
        }
        if self
            .layer_clause
            .as_ref()
            .is_some_and(|clause| clause.trim().is_empty())
        {
            self.layer_clause = None;
        }
    }
}
