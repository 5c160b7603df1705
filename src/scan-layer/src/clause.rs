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

//! Declarative layer clause.
//!
//! A clause consists of layers separated by `;`. A layer is a comma separated
//! list of `key:value` items:
//! - `range:` dimensions joined by `*`, each `name{item,...}` where an item is
//!   a value or an inclusive range `[from,to]`. Either bound of a range may be
//!   empty. Keywords without items may omit the braces.
//! - `quota:N`
//! - `quota_mode:per_doc|per_layer` or `0|1`
//! - `quota_type:proportion|quota|average` or `0|1|2`
//!
//! e.g. `range:price{[,100]}*%sorted,quota:500;range:%other,quota_mode:per_layer`.

use std::fmt;
use std::str::FromStr;

use snafu::ensure;

use crate::error::{Error, ParseLayerClauseSnafu, Result};
use crate::range::{QuotaMode, QuotaType};

/// Docid range keyword.
pub const KEYWORD_DOCID: &str = "%docid";
/// Segment id range keyword.
pub const KEYWORD_SEGMENTID: &str = "%segmentid";
/// Keyword of documents sorted by the sort attributes.
pub const KEYWORD_SORTED: &str = "%sorted";
/// Keyword of documents not sorted by the sort attributes.
pub const KEYWORD_UNSORTED: &str = "%unsorted";
/// Percentage of documents keyword, ranges are `[from, to)` in percent.
pub const KEYWORD_PERCENT: &str = "%percent";
/// Keyword of documents not covered by previous layers.
pub const KEYWORD_OTHER: &str = "%other";

const KEY_RANGE: &str = "range";
const KEY_QUOTA: &str = "quota";
const KEY_QUOTA_MODE: &str = "quota_mode";
const KEY_QUOTA_TYPE: &str = "quota_type";

/// Inclusive range of attribute values. An empty bound is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerAttrRange {
    pub from: String,
    pub to: String,
}

impl LayerAttrRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One dimension of a layer: an attribute or a keyword with the values and
/// ranges it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerKeyRange {
    pub attr_name: String,
    pub values: Vec<String>,
    pub ranges: Vec<LayerAttrRange>,
}

impl LayerKeyRange {
    pub fn new(attr_name: impl Into<String>) -> Self {
        Self {
            attr_name: attr_name.into(),
            values: Vec::new(),
            ranges: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_range(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.ranges.push(LayerAttrRange::new(from, to));
        self
    }

    /// Returns true if the dimension is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.attr_name.starts_with('%')
    }

    /// Returns true if the dimension has neither values nor ranges.
    pub fn is_unbounded(&self) -> bool {
        self.values.is_empty() && self.ranges.is_empty()
    }
}

impl fmt::Display for LayerKeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.attr_name)?;
        if self.is_unbounded() {
            return Ok(());
        }
        let items = self
            .values
            .iter()
            .cloned()
            .chain(
                self.ranges
                    .iter()
                    .map(|range| format!("[{},{}]", range.from, range.to)),
            )
            .collect::<Vec<_>>();
        write!(f, "{{{}}}", items.join(","))
    }
}

/// Declaration of one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescription {
    pub key_ranges: Vec<LayerKeyRange>,
    pub quota: u32,
    pub quota_mode: QuotaMode,
    pub quota_type: QuotaType,
}

impl Default for LayerDescription {
    fn default() -> Self {
        Self {
            key_ranges: Vec::new(),
            quota: u32::MAX,
            quota_mode: QuotaMode::PerDoc,
            quota_type: QuotaType::Proportion,
        }
    }
}

impl fmt::Display for LayerDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut items = Vec::with_capacity(4);
        if !self.key_ranges.is_empty() {
            let dims = self
                .key_ranges
                .iter()
                .map(|key_range| key_range.to_string())
                .collect::<Vec<_>>();
            items.push(format!("{KEY_RANGE}:{}", dims.join("*")));
        }
        items.push(format!("{KEY_QUOTA}:{}", self.quota));
        let quota_mode = match self.quota_mode {
            QuotaMode::PerDoc => "per_doc",
            QuotaMode::PerLayer => "per_layer",
        };
        items.push(format!("{KEY_QUOTA_MODE}:{quota_mode}"));
        let quota_type = match self.quota_type {
            QuotaType::Proportion => "proportion",
            QuotaType::Quota => "quota",
            QuotaType::Average => "average",
        };
        items.push(format!("{KEY_QUOTA_TYPE}:{quota_type}"));
        write!(f, "{}", items.join(","))
    }
}

/// Layers declared by a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryLayerClause {
    layer_descriptions: Vec<LayerDescription>,
}

impl QueryLayerClause {
    pub fn new(layer_descriptions: Vec<LayerDescription>) -> Self {
        Self { layer_descriptions }
    }

    pub fn layer_descriptions(&self) -> &[LayerDescription] {
        &self.layer_descriptions
    }

    pub fn push(&mut self, layer_description: LayerDescription) {
        self.layer_descriptions.push(layer_description);
    }

    pub fn is_empty(&self) -> bool {
        self.layer_descriptions.is_empty()
    }
}

impl fmt::Display for QueryLayerClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers = self
            .layer_descriptions
            .iter()
            .map(|layer| layer.to_string())
            .collect::<Vec<_>>();
        write!(f, "{}", layers.join(";"))
    }
}

impl FromStr for QueryLayerClause {
    type Err = Error;

    fn from_str(clause: &str) -> Result<Self> {
        let parser = ClauseParser { clause };
        let layer_descriptions = split_top_level(clause, ';')
            .into_iter()
            .map(str::trim)
            .filter(|layer| !layer.is_empty())
            .map(|layer| parser.parse_layer(layer))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { layer_descriptions })
    }
}

struct ClauseParser<'a> {
    clause: &'a str,
}

impl ClauseParser<'_> {
    fn error(&self, reason: impl Into<String>) -> Error {
        ParseLayerClauseSnafu {
            clause: self.clause,
            reason: reason.into(),
        }
        .build()
    }

    fn parse_layer(&self, layer: &str) -> Result<LayerDescription> {
        let mut description = LayerDescription::default();
        for item in split_top_level(layer, ',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (key, value) = item
                .split_once(':')
                .ok_or_else(|| self.error(format!("expect key:value, found {item}")))?;
            let value = value.trim();
            match key.trim() {
                KEY_RANGE => {
                    for dim in split_top_level(value, '*') {
                        let key_range = self.parse_key_range(dim.trim())?;
                        description.key_ranges.push(key_range);
                    }
                }
                KEY_QUOTA => {
                    description.quota = value
                        .parse()
                        .map_err(|_| self.error(format!("invalid quota {value}")))?;
                }
                KEY_QUOTA_MODE => {
                    description.quota_mode = match value {
                        "per_doc" | "0" => QuotaMode::PerDoc,
                        "per_layer" | "1" => QuotaMode::PerLayer,
                        _ => return Err(self.error(format!("invalid quota mode {value}"))),
                    };
                }
                KEY_QUOTA_TYPE => {
                    description.quota_type = match value {
                        "proportion" | "0" => QuotaType::Proportion,
                        "quota" | "1" => QuotaType::Quota,
                        "average" | "2" => QuotaType::Average,
                        _ => return Err(self.error(format!("invalid quota type {value}"))),
                    };
                }
                other => return Err(self.error(format!("unknown key {other}"))),
            }
        }
        Ok(description)
    }

    fn parse_key_range(&self, dim: &str) -> Result<LayerKeyRange> {
        let (name, body) = match dim.find('{') {
            Some(start) => {
                ensure!(
                    dim.ends_with('}'),
                    ParseLayerClauseSnafu {
                        clause: self.clause,
                        reason: format!("unclosed brace in {dim}"),
                    }
                );
                (&dim[..start], Some(&dim[start + 1..dim.len() - 1]))
            }
            None => (dim, None),
        };
        let name = name.trim();
        ensure!(
            !name.is_empty(),
            ParseLayerClauseSnafu {
                clause: self.clause,
                reason: format!("empty dimension name in {dim}"),
            }
        );

        let mut key_range = LayerKeyRange::new(name);
        for item in body.map(|b| split_top_level(b, ',')).unwrap_or_default() {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            match item.strip_prefix('[') {
                Some(rest) => {
                    let (from, to) = rest
                        .strip_suffix(']')
                        .and_then(|inner| inner.split_once(','))
                        .ok_or_else(|| self.error(format!("invalid range {item}")))?;
                    key_range
                        .ranges
                        .push(LayerAttrRange::new(from.trim(), to.trim()));
                }
                None => key_range.values.push(item.to_string()),
            }
        }
        Ok(key_range)
    }
}

/// Splits `input` by `sep` outside of braces and brackets.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in input.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_parse_clause() {
        let clause: QueryLayerClause =
            "range:price{[,100],200}*type{1,2}*%sorted,quota:500,quota_type:quota;range:%other,quota_mode:1"
                .parse()
                .unwrap();
        assert_eq!(2, clause.layer_descriptions().len());

        let first = &clause.layer_descriptions()[0];
        assert_eq!(
            vec![
                LayerKeyRange::new("price")
                    .with_value("200")
                    .with_range("", "100"),
                LayerKeyRange::new("type").with_value("1").with_value("2"),
                LayerKeyRange::new(KEYWORD_SORTED),
            ],
            first.key_ranges
        );
        assert_eq!(500, first.quota);
        assert_eq!(QuotaType::Quota, first.quota_type);
        assert_eq!(QuotaMode::PerDoc, first.quota_mode);

        let second = &clause.layer_descriptions()[1];
        assert_eq!(vec![LayerKeyRange::new(KEYWORD_OTHER)], second.key_ranges);
        assert!(second.key_ranges[0].is_keyword());
        assert_eq!(u32::MAX, second.quota);
        assert_eq!(QuotaMode::PerLayer, second.quota_mode);
    }

    #[test]
    fn test_parse_whitespace_and_empty_layers() {
        let clause: QueryLayerClause = " range: %docid{[0, 9], 20} , quota : 10 ;; "
            .parse()
            .unwrap();
        assert_eq!(1, clause.layer_descriptions().len());
        let layer = &clause.layer_descriptions()[0];
        assert_eq!(
            vec![LayerKeyRange::new(KEYWORD_DOCID)
                .with_value("20")
                .with_range("0", "9")],
            layer.key_ranges
        );
        assert_eq!(10, layer.quota);

        let clause: QueryLayerClause = "".parse().unwrap();
        assert!(clause.is_empty());
    }

    #[test]
    fn test_display_round_trip() {
        let text = "range:%percent{[0,50]}*price{7,[1,5]},quota:3,quota_mode:per_layer,quota_type:average;quota:4294967295,quota_mode:per_doc,quota_type:proportion";
        let clause: QueryLayerClause = text.parse().unwrap();
        assert_eq!(text, clause.to_string());
        assert_eq!(clause, clause.to_string().parse().unwrap());
    }

    #[rstest]
    #[case("range")]
    #[case("quota:abc")]
    #[case("quota_mode:2")]
    #[case("quota_type:3")]
    #[case("unknown:1")]
    #[case("range:price{[1,2}")]
    #[case("range:price{[1]}")]
    #[case("range:{1}")]
    fn test_parse_invalid_clause(#[case] clause: &str) {
        let err = clause.parse::<QueryLayerClause>().unwrap_err();
        assert!(
            matches!(err, Error::ParseLayerClause { .. }),
            "{clause}: {err:?}"
        );
    }
}
