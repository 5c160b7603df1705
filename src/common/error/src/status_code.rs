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

use std::fmt;

use strum::{AsRefStr, EnumIter, EnumString, FromRepr};

/// Common status code for public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr, EnumIter, FromRepr)]
pub enum StatusCode {
    // ====== Begin of common status code ==============
    /// Success.
    Success = 0,

    /// Unknown error.
    Unknown = 1000,
    /// Unsupported operation.
    Unsupported = 1001,
    /// Unexpected error, maybe there is a BUG.
    Unexpected = 1002,
    /// Internal error.
    Internal = 1003,
    /// Invalid arguments.
    InvalidArguments = 1004,
    // ====== End of common status code ================

    // ====== Begin of schema related status code ======
    /// A field referenced by name does not exist in the schema.
    FieldNotFound = 2000,
    /// The field exists but its type can't be used in this position.
    FieldTypeNotSupported = 2001,
    // ====== End of schema related status code ========

    // ====== Begin of build related status code =======
    /// A document doesn't match the schema it is built with.
    InvalidDocument = 3000,
    /// The component is used before it is initialized.
    NotInitialized = 3001,
    // ====== End of build related status code =========

    // ====== Begin of scan related status code ========
    /// Layer clause syntax error.
    InvalidSyntax = 4000,
    /// A collaborator broke the contract of the scan layer.
    IllegalState = 4001,
    // ====== End of scan related status code ==========
}

impl StatusCode {
    /// Returns `true` if `code` is success.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Returns `true` if the error with this code is retryable.
    ///
    /// Every failure of the sort and layer components is deterministic for
    /// the same input, so nothing is retryable except internal errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            StatusCode::Internal => true,

            StatusCode::Success
            | StatusCode::Unknown
            | StatusCode::Unsupported
            | StatusCode::Unexpected
            | StatusCode::InvalidArguments
            | StatusCode::FieldNotFound
            | StatusCode::FieldTypeNotSupported
            | StatusCode::InvalidDocument
            | StatusCode::NotInitialized
            | StatusCode::InvalidSyntax
            | StatusCode::IllegalState => false,
        }
    }

    /// Returns `true` if we should print an error log for an error with
    /// this status code.
    pub fn should_log_error(&self) -> bool {
        match self {
            StatusCode::Unknown
            | StatusCode::Unexpected
            | StatusCode::Internal
            | StatusCode::NotInitialized
            | StatusCode::IllegalState => true,
            StatusCode::Success
            | StatusCode::Unsupported
            | StatusCode::InvalidArguments
            | StatusCode::FieldNotFound
            | StatusCode::FieldTypeNotSupported
            | StatusCode::InvalidDocument
            | StatusCode::InvalidSyntax => false,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        StatusCode::from_repr(value as usize)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The current debug format is suitable to display.
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn assert_status_code_display(code: StatusCode, msg: &str) {
        let code_msg = format!("{code}");
        assert_eq!(msg, code_msg);
    }

    #[test]
    fn test_display_status_code() {
        assert_status_code_display(StatusCode::Unknown, "Unknown");
        assert_status_code_display(StatusCode::FieldNotFound, "FieldNotFound");
    }

    #[test]
    fn test_from_u32() {
        for code in StatusCode::iter() {
            let num = code as u32;
            assert_eq!(StatusCode::from_u32(num), Some(code));
        }

        assert_eq!(StatusCode::from_u32(10000), None);
    }

    #[test]
    fn test_is_success() {
        assert!(StatusCode::is_success(0));
        assert!(!StatusCode::is_success(1));
        assert!(!StatusCode::is_success(1004));
    }

    #[test]
    fn test_retryable_and_log() {
        assert!(StatusCode::Internal.is_retryable());
        assert!(!StatusCode::InvalidDocument.is_retryable());
        assert!(StatusCode::IllegalState.should_log_error());
        assert!(!StatusCode::InvalidSyntax.should_log_error());
    }
}
