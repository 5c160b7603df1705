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

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{DeserializeDocumentSnafu, Result, SerializeDocumentSnafu};
use crate::locator::Locator;
use crate::schema::FieldId;
use crate::value::Value;

/// Operation a document applies to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    Add,
    /// Updates the attributes present in the document.
    UpdateField,
    Delete,
    /// Deletes a sub document.
    DeleteSub,
}

impl OpType {
    pub fn is_delete(&self) -> bool {
        matches!(self, OpType::Delete | OpType::DeleteSub)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::Add => "add",
            OpType::UpdateField => "update_field",
            OpType::Delete => "delete",
            OpType::DeleteSub => "delete_sub",
        }
    }
}

pub type DocumentRef = Arc<Document>;

/// A document pushed into the sort pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    primary_key: String,
    op_type: OpType,
    locator: Locator,
    timestamp: i64,
    attributes: BTreeMap<FieldId, Value>,
}

impl Document {
    pub fn new(op_type: OpType) -> Self {
        Self {
            primary_key: String::new(),
            op_type,
            locator: Locator::default(),
            timestamp: 0,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = primary_key.into();
        self
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_attribute(mut self, field_id: FieldId, value: impl Into<Value>) -> Self {
        self.attributes.insert(field_id, value.into());
        self
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn op_type(&self) -> OpType {
        self.op_type
    }

    pub fn locator(&self) -> Locator {
        self.locator
    }

    pub fn set_locator(&mut self, locator: Locator) {
        self.locator = locator;
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn attribute(&self, field_id: FieldId) -> Option<&Value> {
        self.attributes.get(&field_id)
    }

    pub fn set_attribute(&mut self, field_id: FieldId, value: Value) {
        self.attributes.insert(field_id, value);
    }

    /// Returns the attributes ordered by field id.
    pub fn attributes(&self) -> &BTreeMap<FieldId, Value> {
        &self.attributes
    }

    /// Overwrites attributes of this document by the attributes of `other`.
    ///
    /// Attributes absent in `other` are left unchanged.
    pub fn overlay_attributes(&mut self, other: &Document) {
        for (field_id, value) in &other.attributes {
            self.attributes.insert(*field_id, value.clone());
        }
    }

    /// Serializes the document into `writer`.
    pub fn encode_to<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self).context(SerializeDocumentSnafu)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).context(DeserializeDocumentSnafu)
    }
}
