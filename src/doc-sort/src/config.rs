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

//! Configurations.

use common_telemetry::warn;
use serde::{Deserialize, Serialize};

use crate::codec::SortDescription;

/// Default initial capacity of the sort key pool.
const DEFAULT_POOL_CAPACITY: usize = 64 * 1024;

/// Configuration for sorting documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Fields to sort documents by, in priority order.
    pub sort_descriptions: Vec<SortDescription>,
    /// Whether to merge consecutive updates of the same primary key.
    pub enable_update_merge: bool,
    /// Initial capacity in bytes of the pool holding sort keys and payloads.
    pub pool_capacity: usize,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            sort_descriptions: Vec::new(),
            enable_update_merge: true,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

impl SortConfig {
    /// Sanitizes the config.
    pub fn sanitize(&mut self) {
        if self.pool_capacity == 0 {
            warn!("Sanitize pool capacity 0 to {}", DEFAULT_POOL_CAPACITY);
            self.pool_capacity = DEFAULT_POOL_CAPACITY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SortPattern;

    #[test]
    fn test_deserialize_config() {
        let config: SortConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(SortConfig::default(), config);

        let json = r#"{
            "sort_descriptions": [
                {"field_name": "price", "pattern": "desc"},
                {"field_name": "int"}
            ],
            "enable_update_merge": false
        }"#;
        let config: SortConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            vec![
                SortDescription::new("price", SortPattern::Desc),
                SortDescription::new("int", SortPattern::Asc),
            ],
            config.sort_descriptions
        );
        assert!(!config.enable_update_merge);
        assert_eq!(DEFAULT_POOL_CAPACITY, config.pool_capacity);
    }

    #[test]
    fn test_sanitize_config() {
        common_telemetry::init_default_ut_logging();

        let mut config = SortConfig {
            pool_capacity: 0,
            ..Default::default()
        };
        config.sanitize();
        assert_eq!(DEFAULT_POOL_CAPACITY, config.pool_capacity);
    }
}
