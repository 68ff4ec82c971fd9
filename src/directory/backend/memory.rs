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
//! # In-memory directory
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::directory::DirectoryGateway;
use crate::directory::error::DirectoryError;
use crate::directory::types::*;

/// Attribute holding the bind password.
pub const PASSWORD_ATTRIBUTE: &str = "userPassword";

/// Directory kept in memory. Clones share the data.
#[derive(Clone, Debug)]
pub struct MemoryDirectory {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    available: Arc<AtomicBool>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryDirectory {
    /// Add or replace the entry.
    pub async fn add_entry(&self, entry: Entry) {
        self.entries
            .write()
            .await
            .insert(normalize_dn(&entry.dn), entry);
    }

    pub async fn get_entry(&self, dn: &str) -> Option<Entry> {
        self.entries.read().await.get(&normalize_dn(dn)).cloned()
    }

    /// Simulate the server outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DirectoryError::ServerUnavailable(
                "memory directory is offline".into(),
            ))
        }
    }
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::OneLevel => dn
            .split_once(',')
            .is_some_and(|(_, parent)| parent == base),
        SearchScope::Subtree => dn == base || dn.ends_with(&format!(",{base}")),
    }
}

#[async_trait]
impl DirectoryGateway for MemoryDirectory {
    async fn bind(&self, dn: &str, password: &SecretString) -> Result<(), DirectoryError> {
        self.check_available()?;
        // Unauthenticated binds are refused.
        if password.expose_secret().is_empty() {
            return Err(DirectoryError::InvalidCredentials);
        }
        let entries = self.entries.read().await;
        let entry = entries
            .get(&normalize_dn(dn))
            .ok_or(DirectoryError::InvalidCredentials)?;
        if entry
            .values(PASSWORD_ATTRIBUTE)
            .iter()
            .any(|val| val.as_slice() == password.expose_secret().as_bytes())
        {
            Ok(())
        } else {
            Err(DirectoryError::InvalidCredentials)
        }
    }

    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Entry>, DirectoryError> {
        self.check_available()?;
        let filter = Filter::parse(filter)?;
        let base = normalize_dn(base);
        let entries = self.entries.read().await;
        if !entries.contains_key(&base) {
            return Err(DirectoryError::NotFound(base));
        }
        let res: Vec<Entry> = entries
            .iter()
            .filter(|(dn, _)| in_scope(dn, &base, scope))
            .filter(|(_, entry)| filter.matches(entry))
            .map(|(_, entry)| entry.project(attrs))
            .collect();
        debug!("search below {} returned {} entries", base, res.len());
        Ok(res)
    }

    async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<(), DirectoryError> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&normalize_dn(dn))
            .ok_or_else(|| DirectoryError::NotFound(dn.to_string()))?;
        for change in changes.iter() {
            change.apply(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn directory() -> MemoryDirectory {
        let dir = MemoryDirectory::default();
        dir.add_entry(Entry::new("o=ca").with("o", "ca")).await;
        dir.add_entry(Entry::new("ou=people,o=ca").with("ou", "people"))
            .await;
        dir.add_entry(
            Entry::new("uid=jdoe,ou=people,o=ca")
                .with("uid", "jdoe")
                .with(PASSWORD_ATTRIBUTE, "secret"),
        )
        .await;
        dir
    }

    #[tokio::test]
    async fn test_bind() {
        let dir = directory().await;
        dir.bind("uid=jdoe,ou=people,o=ca", &SecretString::from("secret"))
            .await
            .unwrap();
        assert_eq!(
            Err(DirectoryError::InvalidCredentials),
            dir.bind("uid=jdoe,ou=people,o=ca", &SecretString::from("wrong"))
                .await
        );
        assert_eq!(
            Err(DirectoryError::InvalidCredentials),
            dir.bind("uid=jdoe,ou=people,o=ca", &SecretString::from(""))
                .await
        );
        assert_eq!(
            Err(DirectoryError::InvalidCredentials),
            dir.bind("uid=other,ou=people,o=ca", &SecretString::from("secret"))
                .await
        );
    }

    #[tokio::test]
    async fn test_search_scopes() {
        let dir = directory().await;
        let one = dir
            .search("o=ca", SearchScope::OneLevel, "(objectclass=*)", &[])
            .await
            .unwrap();
        assert_eq!(vec!["ou=people,o=ca"], one.iter().map(|e| e.dn.as_str()).collect::<Vec<_>>());
        let sub = dir
            .search("o=ca", SearchScope::Subtree, "(uid=jdoe)", &["uid".into()])
            .await
            .unwrap();
        assert_eq!(1, sub.len());
        assert!(!sub[0].has_attribute(PASSWORD_ATTRIBUTE));
        let base = dir
            .search("ou=people,o=ca", SearchScope::Base, "(objectclass=*)", &[])
            .await
            .unwrap();
        assert_eq!(1, base.len());
        assert!(matches!(
            dir.search("o=missing", SearchScope::Subtree, "(uid=*)", &[])
                .await,
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_modify_and_outage() {
        let dir = directory().await;
        dir.modify(
            "uid=jdoe,ou=people,o=ca",
            vec![Modification::add("mail", "jdoe@example.com")],
        )
        .await
        .unwrap();
        assert_eq!(
            Some("jdoe@example.com"),
            dir.get_entry("uid=jdoe,ou=people,o=ca")
                .await
                .unwrap()
                .first_str("mail")
        );
        dir.set_available(false);
        assert!(matches!(
            dir.search("o=ca", SearchScope::Subtree, "(uid=*)", &[]).await,
            Err(DirectoryError::ServerUnavailable(_))
        ));
    }
}
