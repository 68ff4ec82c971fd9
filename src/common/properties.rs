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
//! # Flat property files
//!
//! Profiles and token mappings are stored as flat `key=value` files where the
//! hierarchy is encoded in dotted key names (`policyset.serverCertSet.1...`)
//! and the ordering of repeated elements is given by explicit `*.list` keys.
use std::collections::BTreeMap;

use thiserror::Error;

/// Property file parsing error.
#[derive(Debug, Error, PartialEq)]
pub enum PropertiesError {
    /// A non comment line has no `=` separator.
    #[error("malformed property at line {line}: {content}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// Offending content.
        content: String,
    },

    /// Value is not a boolean.
    #[error("property {key} has a non boolean value {value}")]
    NotABoolean { key: String, value: String },

    /// Value is not a number.
    #[error("property {key} has a non numeric value {value}")]
    NotANumber { key: String, value: String },
}

/// Parsed property store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    /// Parse the property file content.
    ///
    /// Empty lines and lines starting with `#` or `!` are ignored. Keys and
    /// values are trimmed. A key repeated later in the file overrides the
    /// earlier value.
    pub fn parse(input: &str) -> Result<Self, PropertiesError> {
        let mut entries = BTreeMap::new();
        for (idx, raw) in input.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or(PropertiesError::Malformed {
                line: idx + 1,
                content: line.to_string(),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PropertiesError::Malformed {
                    line: idx + 1,
                    content: line.to_string(),
                });
            }
            entries.insert(key.to_string(), value.trim().to_string());
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get the raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Get the value treating an empty string as absent.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|val| !val.is_empty())
    }

    /// Get a boolean value falling back to `default` when the key is absent.
    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, PropertiesError> {
        match self.get_non_empty(key) {
            None => Ok(default),
            Some(val) => match val.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(PropertiesError::NotABoolean {
                    key: key.to_string(),
                    value: val.to_string(),
                }),
            },
        }
    }

    /// Get a numeric value.
    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, PropertiesError> {
        self.get_non_empty(key)
            .map(|val| {
                val.parse::<i64>().map_err(|_| PropertiesError::NotANumber {
                    key: key.to_string(),
                    value: val.to_string(),
                })
            })
            .transpose()
    }

    /// Get the comma separated list value in the declared order.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|val| {
                val.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(Into::into)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Return all entries below `prefix.` with the prefix stripped.
    pub fn sub_store(&self, prefix: &str) -> Properties {
        let dotted = format!("{prefix}.");
        Properties {
            entries: self
                .entries
                .iter()
                .filter_map(|(key, val)| {
                    key.strip_prefix(&dotted)
                        .map(|rest| (rest.to_string(), val.clone()))
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
