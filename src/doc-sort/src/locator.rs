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

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::error::{InvalidLocatorSnafu, Result};

/// Offset of a locator that is not a restart point.
pub const UNRESUMABLE_OFFSET: i64 = -1;

/// Checkpoint of a document in its source stream.
///
/// Locators are ordered by `(src, offset)`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Locator {
    src: u64,
    offset: i64,
}

impl Locator {
    /// Size of an encoded locator.
    pub const ENCODED_SIZE: usize = 16;

    pub fn new(src: u64, offset: i64) -> Self {
        Self { src, offset }
    }

    pub fn src(&self) -> u64 {
        self.src
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Returns a locator of the same source that ingestion can't resume from.
    pub fn unresumable(&self) -> Self {
        Self {
            src: self.src,
            offset: UNRESUMABLE_OFFSET,
        }
    }

    pub fn is_resumable(&self) -> bool {
        self.offset != UNRESUMABLE_OFFSET
    }

    /// Encodes the locator into `buf`.
    pub fn encode_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64(self.src);
        buf.put_i64(self.offset);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::ENCODED_SIZE);
        self.encode_to(&mut buf);
        buf
    }

    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() == Self::ENCODED_SIZE,
            InvalidLocatorSnafu {
                actual: bytes.len(),
                expect: Self::ENCODED_SIZE,
            }
        );
        let src = bytes.get_u64();
        let offset = bytes.get_i64();
        Ok(Self { src, offset })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.src, self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_locator_order() {
        assert!(Locator::new(0, 10) < Locator::new(1, 0));
        assert!(Locator::new(1, 2) < Locator::new(1, 3));
        assert_eq!(
            Locator::new(2, 3),
            Locator::new(1, 100).max(Locator::new(2, 3))
        );
    }

    #[test]
    fn test_unresumable() {
        let locator = Locator::new(7, 100);
        assert!(locator.is_resumable());
        let unresumable = locator.unresumable();
        assert_eq!(7, unresumable.src());
        assert_eq!(-1, unresumable.offset());
        assert!(!unresumable.is_resumable());
    }

    #[test]
    fn test_encode_decode() {
        let locator = Locator::new(u64::MAX - 1, -1);
        let bytes = locator.encode();
        assert_eq!(Locator::ENCODED_SIZE, bytes.len());
        assert_eq!(locator, Locator::decode(&bytes).unwrap());

        let err = Locator::decode(&bytes[..10]).unwrap_err();
        assert!(
            matches!(
                err,
                Error::InvalidLocator {
                    actual: 10,
                    expect: 16,
                    ..
                }
            ),
            "{err:?}"
        );
    }
}
