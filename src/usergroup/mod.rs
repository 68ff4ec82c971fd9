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
//! # User and group management
//!
//! Users live below `user_base` and groups below `group_base` of the CA
//! subtree. Group membership is stored as the list of member DNs in the
//! `uniqueMember` attribute of the group entry.
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub mod error;
pub mod types;

use crate::config::DirectorySection;
use crate::directory::{
    DirectoryGateway, Modification, SearchScope, escape_filter_value, normalize_dn,
};
use crate::usergroup::error::UserGroupError;

pub use types::*;

#[async_trait]
pub trait UserGroupApi: Send + Sync + Clone {
    /// Find the user by the login name.
    async fn get_user(&self, uid: &str) -> Result<Option<User>, UserGroupError>;

    /// Resolve the DN of the user.
    async fn find_user_dn(&self, uid: &str) -> Result<Option<String>, UserGroupError>;

    /// Check whether the user is a member of the group.
    async fn is_member_of(&self, uid: &str, group: &str) -> Result<bool, UserGroupError>;

    async fn add_user_to_group(&self, uid: &str, group: &str) -> Result<(), UserGroupError>;

    async fn remove_user_from_group(&self, uid: &str, group: &str)
    -> Result<(), UserGroupError>;

    /// List the DNs of the group members.
    async fn list_group_members(&self, group: &str) -> Result<Vec<String>, UserGroupError>;
}

#[derive(Clone, Debug)]
pub struct UserGroupProvider {
    directory: Arc<dyn DirectoryGateway>,
    config: DirectorySection,
}

impl UserGroupProvider {
    pub fn new(config: &DirectorySection, directory: Arc<dyn DirectoryGateway>) -> Self {
        Self {
            directory,
            config: config.clone(),
        }
    }

    fn group_dn(&self, group: &str) -> String {
        format!("cn={},{}", group, self.config.get_group_base_dn())
    }

    async fn require_user_dn(&self, uid: &str) -> Result<String, UserGroupError> {
        self.find_user_dn(uid)
            .await?
            .ok_or_else(|| UserGroupError::UserNotFound(uid.to_string()))
    }

    async fn group_members(&self, group: &str) -> Result<Vec<String>, UserGroupError> {
        let entries = self
            .directory
            .search(
                &self.group_dn(group),
                SearchScope::Base,
                "(objectclass=*)",
                &[MEMBER_ATTRIBUTE.into()],
            )
            .await
            .map_err(|err| match err {
                crate::directory::error::DirectoryError::NotFound(_) => {
                    UserGroupError::GroupNotFound(group.to_string())
                }
                other => other.into(),
            })?;
        Ok(entries
            .first()
            .map(|entry| entry.strings(MEMBER_ATTRIBUTE))
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserGroupApi for UserGroupProvider {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_user(&self, uid: &str) -> Result<Option<User>, UserGroupError> {
        let filter = format!(
            "({}={})",
            self.config.uid_attribute,
            escape_filter_value(uid)
        );
        let entries = self
            .directory
            .search(
                &self.config.get_user_base_dn(),
                SearchScope::Subtree,
                &filter,
                &[
                    self.config.uid_attribute.clone(),
                    "cn".into(),
                    "mail".into(),
                ],
            )
            .await?;
        Ok(entries.into_iter().next().map(|entry| User {
            uid: entry
                .first_str(&self.config.uid_attribute)
                .unwrap_or(uid)
                .to_string(),
            full_name: entry.first_str("cn").map(Into::into),
            email: entry.first_str("mail").map(Into::into),
            dn: entry.dn,
        }))
    }

    async fn find_user_dn(&self, uid: &str) -> Result<Option<String>, UserGroupError> {
        Ok(self.get_user(uid).await?.map(|user| user.dn))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn is_member_of(&self, uid: &str, group: &str) -> Result<bool, UserGroupError> {
        let Some(user_dn) = self.find_user_dn(uid).await? else {
            return Ok(false);
        };
        let user_dn = normalize_dn(&user_dn);
        let members = self.group_members(group).await?;
        let res = members.iter().any(|member| normalize_dn(member) == user_dn);
        debug!("membership of {} in {}: {}", uid, group, res);
        Ok(res)
    }

    async fn add_user_to_group(&self, uid: &str, group: &str) -> Result<(), UserGroupError> {
        let user_dn = self.require_user_dn(uid).await?;
        // Validates the group existence.
        self.group_members(group).await?;
        self.directory
            .modify(
                &self.group_dn(group),
                vec![Modification::add(MEMBER_ATTRIBUTE, user_dn)],
            )
            .await?;
        Ok(())
    }

    async fn remove_user_from_group(
        &self,
        uid: &str,
        group: &str,
    ) -> Result<(), UserGroupError> {
        let user_dn = normalize_dn(&self.require_user_dn(uid).await?);
        let members = self.group_members(group).await?;
        let matching: Vec<Vec<u8>> = members
            .into_iter()
            .filter(|member| normalize_dn(member) == user_dn)
            .map(String::into_bytes)
            .collect();
        if matching.is_empty() {
            return Ok(());
        }
        self.directory
            .modify(
                &self.group_dn(group),
                vec![Modification::Delete {
                    attr: MEMBER_ATTRIBUTE.into(),
                    values: matching,
                }],
            )
            .await?;
        Ok(())
    }

    async fn list_group_members(&self, group: &str) -> Result<Vec<String>, UserGroupError> {
        self.group_members(group).await
    }
}
