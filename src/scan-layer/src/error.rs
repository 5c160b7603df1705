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

use common_error::ext::{BoxedError, ErrorExt};
use common_error::status_code::StatusCode;
use snafu::{Location, Snafu};

use crate::range::DocId;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to parse layer clause {}, reason: {}", clause, reason))]
    ParseLayerClause {
        clause: String,
        reason: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid value {} of keyword {}", value, keyword))]
    InvalidKeywordValue {
        keyword: String,
        value: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Unknown layer keyword {}", keyword))]
    UnknownKeyword {
        keyword: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid value {} of attribute {}", value, attr_name))]
    InvalidAttributeValue {
        attr_name: String,
        value: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Attribute {} is not indexed", attr_name))]
    AttributeNotFound {
        attr_name: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Failed to look up ranges of dimensions {}", dimensions))]
    LookupRanges {
        dimensions: String,
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: BoxedError,
    },

    #[snafu(display("Invalid docid range [{}, {}]", begin, end))]
    InvalidDocIdRange {
        begin: DocId,
        end: DocId,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display(
        "Partitioner returns {} splits, more than the way count {}",
        actual,
        way_count
    ))]
    SplitOverflow {
        actual: usize,
        way_count: usize,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("Invalid way count {}", way_count))]
    InvalidWayCount {
        way_count: usize,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl ErrorExt for Error {
    fn status_code(&self) -> StatusCode {
        use Error::*;

        match self {
            ParseLayerClause { .. } => StatusCode::InvalidSyntax,
            InvalidKeywordValue { .. }
            | UnknownKeyword { .. }
            | InvalidAttributeValue { .. }
            | InvalidDocIdRange { .. }
            | InvalidWayCount { .. } => StatusCode::InvalidArguments,
            AttributeNotFound { .. } => StatusCode::FieldNotFound,
            SplitOverflow { .. } => StatusCode::IllegalState,
            LookupRanges { error, .. } => error.status_code(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
