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
//
// SPDX-License-Identifier: Apache-2.0
//! # Token profile resolution
//!
//! The token processing system picks the token profile for a smart card
//! operation from an ordered list of mappings. Every mapping carries
//! optional filters on the token attributes reported by the client and the
//! resulting token type; the first mapping whose filters all accept the token
//! wins.
//!
//! ```text
//! mapping.order=userKey,soKey
//! mapping.userKey.filter.tokenType=userKey
//! mapping.userKey.filter.tokenCUID.start=40900000000000000000
//! mapping.userKey.filter.tokenCUID.end=409fffffffffffffffff
//! mapping.userKey.filter.appletMajorVersion=1
//! mapping.userKey.target.tokenType=userKey
//! ```
use std::path::Path;
use tracing::debug;

pub mod error;

use crate::common::Properties;

pub use error::TokenResolverError;

/// Token attributes reported by the client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenAttributes {
    /// Token type requested by the client.
    pub token_type: Option<String>,
    /// Answer to reset of the card.
    pub atr: Option<String>,
    /// Card unique id in hex.
    pub cuid: Option<String>,
    pub applet_major_version: Option<u8>,
    pub applet_minor_version: Option<u8>,
}

/// One mapping entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenMapping {
    pub id: String,
    pub token_type: Option<String>,
    pub atr: Option<String>,
    /// Inclusive CUID range.
    pub cuid_range: (Option<u128>, Option<u128>),
    pub applet_major_version: Option<u8>,
    pub applet_minor_version: Option<u8>,
    /// Resulting token profile.
    pub target: String,
}

fn parse_cuid(value: &str) -> Option<u128> {
    u128::from_str_radix(value.trim(), 16).ok()
}

impl TokenMapping {
    fn from_properties(props: &Properties, id: &str) -> Result<Self, TokenResolverError> {
        let filter = props.sub_store(&format!("mapping.{id}.filter"));
        let cuid = |key: &str| {
            filter
                .get_non_empty(key)
                .map(|val| {
                    parse_cuid(val).ok_or_else(|| {
                        TokenResolverError::InvalidConfig(format!(
                            "mapping {id}: {key} is not a hex CUID"
                        ))
                    })
                })
                .transpose()
        };
        let version = |key: &str| {
            filter
                .get_non_empty(key)
                .map(|val| {
                    val.parse::<u8>().map_err(|_| {
                        TokenResolverError::InvalidConfig(format!(
                            "mapping {id}: {key} is not a version number"
                        ))
                    })
                })
                .transpose()
        };
        let cuid_range = (cuid("tokenCUID.start")?, cuid("tokenCUID.end")?);
        if let (Some(start), Some(end)) = cuid_range {
            if start > end {
                return Err(TokenResolverError::InvalidConfig(format!(
                    "mapping {id}: empty CUID range"
                )));
            }
        }
        Ok(Self {
            id: id.to_string(),
            token_type: filter.get_non_empty("tokenType").map(Into::into),
            atr: filter.get_non_empty("tokenATR").map(Into::into),
            cuid_range,
            applet_major_version: version("appletMajorVersion")?,
            applet_minor_version: version("appletMinorVersion")?,
            target: props
                .get_non_empty(&format!("mapping.{id}.target.tokenType"))
                .ok_or_else(|| {
                    TokenResolverError::InvalidConfig(format!(
                        "mapping {id}: target.tokenType is not set"
                    ))
                })?
                .to_string(),
        })
    }

    /// Whether every configured filter accepts the token. A filter rejects a
    /// token missing the filtered attribute.
    pub fn matches(&self, token: &TokenAttributes) -> bool {
        fn accepts<T: PartialEq>(filter: &Option<T>, value: Option<&T>) -> bool {
            filter.as_ref().is_none_or(|expected| value == Some(expected))
        }
        let cuid = token.cuid.as_deref().map(parse_cuid);
        let in_range = match (self.cuid_range, cuid) {
            ((None, None), _) => true,
            (_, None | Some(None)) => false,
            ((start, end), Some(Some(cuid))) => {
                start.is_none_or(|start| cuid >= start) && end.is_none_or(|end| cuid <= end)
            }
        };
        accepts(&self.token_type, token.token_type.as_ref())
            && self.atr.as_ref().is_none_or(|atr| {
                token
                    .atr
                    .as_ref()
                    .is_some_and(|val| val.eq_ignore_ascii_case(atr))
            })
            && in_range
            && accepts(&self.applet_major_version, token.applet_major_version.as_ref())
            && accepts(&self.applet_minor_version, token.applet_minor_version.as_ref())
    }
}

/// Resolver of the token profile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MappingResolver {
    mappings: Vec<TokenMapping>,
}

impl MappingResolver {
    /// Build the resolver from the mappings in `mapping.order` order.
    pub fn from_properties(props: &Properties) -> Result<Self, TokenResolverError> {
        let mappings = props
            .list("mapping.order")
            .iter()
            .map(|id| TokenMapping::from_properties(props, id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mappings })
    }

    pub fn parse(input: &str) -> Result<Self, TokenResolverError> {
        Self::from_properties(&Properties::parse(input)?)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, TokenResolverError> {
        let path = path.as_ref();
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| TokenResolverError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
        Self::parse(&content)
    }

    pub fn mappings(&self) -> &[TokenMapping] {
        &self.mappings
    }

    /// Resolve the token profile. The first matching mapping wins.
    pub fn resolve(&self, token: &TokenAttributes) -> Result<&str, TokenResolverError> {
        let mapping = self
            .mappings
            .iter()
            .find(|mapping| mapping.matches(token))
            .ok_or(TokenResolverError::NoMatch)?;
        debug!("token resolved by mapping {} to {}", mapping.id, mapping.target);
        Ok(&mapping.target)
    }
}
