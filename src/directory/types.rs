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
//! # Directory data types
use std::collections::BTreeMap;

use crate::directory::error::DirectoryError;

/// Directory entry.
///
/// Attribute names are case-insensitive and kept lowercased. Values are raw
/// bytes since some of them (enrollment pins) are binary.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entry {
    pub dn: String,
    attributes: BTreeMap<String, Vec<Vec<u8>>>,
}

impl Entry {
    pub fn new<S: Into<String>>(dn: S) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder style helper adding a string value.
    pub fn with<K: AsRef<str>, V: AsRef<str>>(mut self, name: K, value: V) -> Self {
        self.add_value(name, value.as_ref().as_bytes().to_vec());
        self
    }

    /// Builder style helper adding a binary value.
    pub fn with_bytes<K: AsRef<str>>(mut self, name: K, value: Vec<u8>) -> Self {
        self.add_value(name, value);
        self
    }

    pub fn add_value<K: AsRef<str>>(&mut self, name: K, value: Vec<u8>) {
        let values = self
            .attributes
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    /// Remove the value, or the whole attribute when `value` is `None`.
    pub fn remove_value<K: AsRef<str>>(&mut self, name: K, value: Option<&[u8]>) {
        let name = name.as_ref().to_ascii_lowercase();
        match value {
            None => {
                self.attributes.remove(&name);
            }
            Some(value) => {
                if let Some(values) = self.attributes.get_mut(&name) {
                    values.retain(|val| val != value);
                    if values.is_empty() {
                        self.attributes.remove(&name);
                    }
                }
            }
        }
    }

    pub fn replace_values<K: AsRef<str>>(&mut self, name: K, values: Vec<Vec<u8>>) {
        let name = name.as_ref().to_ascii_lowercase();
        if values.is_empty() {
            self.attributes.remove(&name);
        } else {
            self.attributes.insert(name, values);
        }
    }

    pub fn values(&self, name: &str) -> &[Vec<u8>] {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// First value as bytes.
    pub fn first(&self, name: &str) -> Option<&[u8]> {
        self.values(name).first().map(Vec::as_slice)
    }

    /// First value as a string. Non UTF-8 values are skipped.
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.first(name).and_then(|val| std::str::from_utf8(val).ok())
    }

    /// All values as strings.
    pub fn strings(&self, name: &str) -> Vec<String> {
        self.values(name)
            .iter()
            .map(|val| String::from_utf8_lossy(val).into_owned())
            .collect()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        !self.values(name).is_empty()
    }

    /// Copy of the entry restricted to the given attributes. An empty list
    /// means all attributes.
    pub fn project(&self, attrs: &[String]) -> Entry {
        if attrs.is_empty() || attrs.iter().any(|a| a == "*") {
            return self.clone();
        }
        let wanted: Vec<String> = attrs.iter().map(|a| a.to_ascii_lowercase()).collect();
        Entry {
            dn: self.dn.clone(),
            attributes: self
                .attributes
                .iter()
                .filter(|(name, _)| wanted.contains(name))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Search scope.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// Direct children of the base entry.
    OneLevel,
    /// The base entry and all its descendants.
    Subtree,
}

/// Entry modification.
#[derive(Clone, Debug, PartialEq)]
pub enum Modification {
    Add { attr: String, values: Vec<Vec<u8>> },
    /// Delete the listed values, or the whole attribute with no values.
    Delete { attr: String, values: Vec<Vec<u8>> },
    Replace { attr: String, values: Vec<Vec<u8>> },
}

impl Modification {
    pub fn add<A: Into<String>, V: AsRef<[u8]>>(attr: A, value: V) -> Self {
        Self::Add {
            attr: attr.into(),
            values: vec![value.as_ref().to_vec()],
        }
    }

    pub fn delete<A: Into<String>, V: AsRef<[u8]>>(attr: A, value: V) -> Self {
        Self::Delete {
            attr: attr.into(),
            values: vec![value.as_ref().to_vec()],
        }
    }

    pub fn delete_attribute<A: Into<String>>(attr: A) -> Self {
        Self::Delete {
            attr: attr.into(),
            values: Vec::new(),
        }
    }

    pub fn apply(&self, entry: &mut Entry) {
        match self {
            Self::Add { attr, values } => {
                for val in values {
                    entry.add_value(attr, val.clone());
                }
            }
            Self::Delete { attr, values } => {
                if values.is_empty() {
                    entry.remove_value(attr, None);
                } else {
                    for val in values {
                        entry.remove_value(attr, Some(val));
                    }
                }
            }
            Self::Replace { attr, values } => entry.replace_values(attr, values.clone()),
        }
    }
}

/// Normalized form of the DN used for comparison.
pub fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| {
            rdn.split_once('=')
                .map(|(attr, val)| {
                    format!(
                        "{}={}",
                        attr.trim().to_ascii_lowercase(),
                        val.trim().to_lowercase()
                    )
                })
                .unwrap_or_else(|| rdn.trim().to_lowercase())
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Escape the value for the use in the search filter.
pub fn escape_filter_value(value: &str) -> String {
    let mut res = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => res.push_str("\\2a"),
            '(' => res.push_str("\\28"),
            ')' => res.push_str("\\29"),
            '\\' => res.push_str("\\5c"),
            '\0' => res.push_str("\\00"),
            other => res.push(other),
        }
    }
    res
}

/// Parsed search filter.
///
/// Supported subset: equality `(a=v)`, presence `(a=*)`, and the `&`, `|`,
/// `!` combinators.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Equality(String, Vec<u8>),
    Present(String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, DirectoryError> {
        let mut parser = FilterParser {
            input: input.trim().as_bytes(),
            pos: 0,
            raw: input,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.input.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Self::Present(attr) => {
                attr.eq_ignore_ascii_case("objectclass") || entry.has_attribute(attr)
            }
            Self::Equality(attr, value) => entry
                .values(attr)
                .iter()
                .any(|val| val.eq_ignore_ascii_case(value)),
            Self::And(items) => items.iter().all(|f| f.matches(entry)),
            Self::Or(items) => items.iter().any(|f| f.matches(entry)),
            Self::Not(inner) => !inner.matches(entry),
        }
    }
}

struct FilterParser<'a> {
    input: &'a [u8],
    pos: usize,
    raw: &'a str,
}

impl FilterParser<'_> {
    fn error(&self, reason: &str) -> DirectoryError {
        DirectoryError::InvalidFilter {
            filter: self.raw.to_string(),
            reason: format!("{reason} at {}", self.pos),
        }
    }

    fn expect(&mut self, ch: u8) -> Result<(), DirectoryError> {
        if self.input.get(self.pos) == Some(&ch) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", ch as char)))
        }
    }

    fn filter(&mut self) -> Result<Filter, DirectoryError> {
        self.expect(b'(')?;
        let res = match self.input.get(self.pos) {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end")),
        };
        self.expect(b')')?;
        Ok(res)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>, DirectoryError> {
        let mut items = Vec::new();
        while self.input.get(self.pos) == Some(&b'(') {
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(items)
    }

    fn item(&mut self) -> Result<Filter, DirectoryError> {
        let start = self.pos;
        while let Some(ch) = self.input.get(self.pos) {
            if *ch == b'=' {
                break;
            }
            if !(ch.is_ascii_alphanumeric() || *ch == b'-' || *ch == b'.' || *ch == b';') {
                return Err(self.error("invalid attribute name"));
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("missing attribute name"));
        }
        let attr = String::from_utf8_lossy(&self.input[start..self.pos]).to_string();
        self.expect(b'=')?;
        let mut value = Vec::new();
        let mut wildcard = false;
        while let Some(ch) = self.input.get(self.pos) {
            match ch {
                b')' => break,
                b'(' => return Err(self.error("unescaped '('")),
                b'*' => {
                    wildcard = true;
                    self.pos += 1;
                }
                b'\\' => {
                    let hex = self
                        .input
                        .get(self.pos + 1..self.pos + 3)
                        .and_then(|hex| std::str::from_utf8(hex).ok())
                        .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                        .ok_or_else(|| self.error("invalid escape"))?;
                    value.push(hex);
                    self.pos += 3;
                }
                other => {
                    value.push(*other);
                    self.pos += 1;
                }
            }
        }
        match (wildcard, value.is_empty()) {
            (true, true) => Ok(Filter::Present(attr)),
            (true, false) => Err(self.error("substring filters are not supported")),
            (false, _) => Ok(Filter::Equality(attr, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry::new("uid=jdoe,ou=people,o=ca")
            .with("uid", "jdoe")
            .with("objectClass", "person")
            .with("mail", "jdoe@example.com")
    }

    #[test]
    fn test_parse_and_match() {
        let entry = entry();
        assert!(Filter::parse("(uid=jdoe)").unwrap().matches(&entry));
        assert!(Filter::parse("(UID=JDOE)").unwrap().matches(&entry));
        assert!(Filter::parse("(mail=*)").unwrap().matches(&entry));
        assert!(!Filter::parse("(pin=*)").unwrap().matches(&entry));
        assert!(
            Filter::parse("(&(uid=jdoe)(|(objectclass=group)(objectclass=person)))")
                .unwrap()
                .matches(&entry)
        );
        assert!(Filter::parse("(!(uid=other))").unwrap().matches(&entry));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Filter::parse("uid=jdoe").is_err());
        assert!(Filter::parse("(uid=jdoe").is_err());
        assert!(Filter::parse("(&)").is_err());
        assert!(Filter::parse("(uid=jd*)").is_err());
        assert!(Filter::parse("(uid=jdoe))").is_err());
    }

    #[test]
    fn test_escape() {
        let escaped = escape_filter_value("a*)(uid=*");
        assert_eq!("a\\2a\\29\\28uid=\\2a", escaped);
        let filter = Filter::parse(&format!("(uid={escaped})")).unwrap();
        assert_eq!(
            Filter::Equality("uid".into(), b"a*)(uid=*".to_vec()),
            filter
        );
        assert!(!filter.matches(&entry()));
    }

    #[test]
    fn test_normalize_dn() {
        assert_eq!(
            "uid=jdoe,ou=people,o=ca",
            normalize_dn("UID=JDoe, ou = People,O=CA")
        );
    }

    #[test]
    fn test_modifications() {
        let mut entry = entry();
        Modification::add("member", "a").apply(&mut entry);
        Modification::add("member", "b").apply(&mut entry);
        Modification::add("member", "a").apply(&mut entry);
        assert_eq!(vec!["a", "b"], entry.strings("member"));
        Modification::delete("member", "a").apply(&mut entry);
        assert_eq!(vec!["b"], entry.strings("member"));
        Modification::delete_attribute("mail").apply(&mut entry);
        assert!(!entry.has_attribute("mail"));
        let projected = entry.project(&["uid".into()]);
        assert!(projected.has_attribute("uid"));
        assert!(!projected.has_attribute("member"));
    }
}
