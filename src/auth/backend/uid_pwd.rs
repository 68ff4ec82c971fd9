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
//! # Directory uid/password authenticator
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::auth::backend::Authenticator;
use crate::auth::error::AuthError;
use crate::auth::types::*;
use crate::config::DirectorySection;
use crate::directory::{DirectoryGateway, Entry, SearchScope, escape_filter_value};

/// Resolve the user entry by the uid.
///
/// An unknown user is reported as invalid credentials.
pub(super) async fn find_user_entry(
    directory: &Arc<dyn DirectoryGateway>,
    config: &DirectorySection,
    uid: &str,
    attrs: &[String],
) -> Result<Entry, AuthError> {
    let filter = format!("({}={})", config.uid_attribute, escape_filter_value(uid));
    let mut entries = directory
        .search(&config.get_user_base_dn(), SearchScope::Subtree, &filter, attrs)
        .await
        .map_err(AuthError::from_directory)?;
    match entries.len() {
        1 => entries.pop().ok_or(AuthError::InvalidCredentials),
        0 => {
            debug!("user {} not found", uid);
            Err(AuthError::InvalidCredentials)
        }
        count => {
            debug!("uid {} is ambiguous ({} entries)", uid, count);
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[derive(Clone, Debug)]
pub struct UidPwdDirAuthenticator {
    id: String,
    directory: Arc<dyn DirectoryGateway>,
    config: DirectorySection,
}

impl UidPwdDirAuthenticator {
    pub fn new<S: Into<String>>(
        id: S,
        config: &DirectorySection,
        directory: Arc<dyn DirectoryGateway>,
    ) -> Self {
        Self {
            id: id.into(),
            directory,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Authenticator for UidPwdDirAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &[CRED_UID, CRED_PWD]
    }

    async fn authenticate(&self, credentials: &AuthCredentials) -> Result<AuthToken, AuthError> {
        let uid = credentials.require_str(CRED_UID)?;
        let pwd = credentials.require(CRED_PWD)?;
        let entry = find_user_entry(
            &self.directory,
            &self.config,
            &uid,
            &[self.config.uid_attribute.clone()],
        )
        .await?;
        self.directory
            .bind(&entry.dn, pwd)
            .await
            .map_err(AuthError::from_directory)?;
        Ok(AuthToken::new()
            .with(TOKEN_UID, uid)
            .with(TOKEN_USER_DN, entry.dn))
    }
}
