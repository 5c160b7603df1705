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

use std::any::Any;

use common_error::ext::ErrorExt;
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

use crate::document::OpType;
use crate::schema::{FieldType, TableType};

/// Error definitions for document sorting.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid schema, reason: {}", reason))]
    InvalidSchema {
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Sort field {} not found in schema", field_name))]
    UnknownSortField {
        field_name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Field {} of type {} is not sortable", field_name, field_type))]
    UnsortableField {
        field_name: String,
        field_type: FieldType,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Sort field {} is declared more than once", field_name))]
    DuplicateSortField {
        field_name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Document at position {} doesn't have sort field {}",
        position,
        field_name
    ))]
    MissingSortField {
        field_name: String,
        position: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Value {} mismatches field type {}", value, field_type))]
    FieldTypeMismatch {
        value: String,
        field_type: FieldType,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Data type: {} does not support sort key encoding", field_type))]
    NotSupportedField {
        field_type: FieldType,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize field"))]
    SerializeField {
        #[snafu(source)]
        error: memcomparable::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to serialize document"))]
    SerializeDocument {
        #[snafu(source)]
        error: bincode::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to deserialize document"))]
    DeserializeDocument {
        #[snafu(source)]
        error: bincode::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid locator length {}, expect {}", actual, expect))]
    InvalidLocator {
        actual: usize,
        expect: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("{} table requires a primary key field", table_type))]
    PrimaryKeyRequired {
        table_type: TableType,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Document at position {} has an empty primary key", position))]
    MissingPrimaryKey {
        position: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Document at position {} with op {:?} doesn't have suffix key field {}",
        position,
        op_type,
        field_name
    ))]
    MissingSuffixKey {
        field_name: String,
        op_type: OpType,
        position: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Sort document container is not initialized"))]
    NotInitialized {
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        use Error::*;

        match self {
            InvalidSchema { .. } | PrimaryKeyRequired { .. } | DuplicateSortField { .. } => {
                StatusCode::InvalidArguments
            }
            UnknownSortField { .. } => StatusCode::FieldNotFound,
            UnsortableField { .. } | NotSupportedField { .. } => StatusCode::FieldTypeNotSupported,
            MissingSortField { .. }
            | FieldTypeMismatch { .. }
            | MissingPrimaryKey { .. }
            | MissingSuffixKey { .. }
            | DeserializeDocument { .. }
            | InvalidLocator { .. } => StatusCode::InvalidDocument,
            SerializeField { .. } | SerializeDocument { .. } => StatusCode::Unexpected,
            NotInitialized { .. } => StatusCode::NotInitialized,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
