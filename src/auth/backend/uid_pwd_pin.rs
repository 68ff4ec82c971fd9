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
//! # Directory uid/password/pin authenticator
//!
//! After the password bind the supplied pin is checked against the digest
//! stored in the user entry. On success the pin is removed through the
//! privileged connection right away, before the enrollment request is
//! validated. A rejected request therefore still consumes the pin so it can
//! never be replayed.
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::backend::Authenticator;
use crate::auth::backend::uid_pwd::find_user_entry;
use crate::auth::error::AuthError;
use crate::auth::pin::verify_pin;
use crate::auth::types::*;
use crate::config::DirectorySection;
use crate::directory::{DirectoryGateway, Modification};

#[derive(Clone, Debug)]
pub struct UidPwdPinDirAuthenticator {
    id: String,
    directory: Arc<dyn DirectoryGateway>,
    /// Connection bound as the privileged user for the pin removal.
    privileged: Arc<dyn DirectoryGateway>,
    config: DirectorySection,
}

impl UidPwdPinDirAuthenticator {
    pub fn new<S: Into<String>>(
        id: S,
        config: &DirectorySection,
        directory: Arc<dyn DirectoryGateway>,
        privileged: Arc<dyn DirectoryGateway>,
    ) -> Self {
        Self {
            id: id.into(),
            directory,
            privileged,
            config: config.clone(),
        }
    }

    async fn remove_pin(&self, user_dn: &str) -> Result<(), AuthError> {
        if let (Some(bind_dn), Some(bind_password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            self.privileged
                .bind(bind_dn, bind_password)
                .await
                .map_err(|err| AuthError::infrastructure(format!("privileged bind failed: {err}")))?;
        }
        self.privileged
            .modify(
                user_dn,
                vec![Modification::delete_attribute(
                    self.config.pin_attribute.clone(),
                )],
            )
            .await
            .map_err(|err| AuthError::infrastructure(format!("pin removal failed: {err}")))?;
        info!("removed the enrollment pin of {}", user_dn);
        Ok(())
    }
}

#[async_trait]
impl Authenticator for UidPwdPinDirAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &[CRED_UID, CRED_PWD, CRED_PIN]
    }

    async fn authenticate(&self, credentials: &AuthCredentials) -> Result<AuthToken, AuthError> {
        let uid = credentials.require_str(CRED_UID)?;
        let pwd = credentials.require(CRED_PWD)?;
        let pin = credentials.require(CRED_PIN)?;
        let entry = find_user_entry(
            &self.directory,
            &self.config,
            &uid,
            &[
                self.config.uid_attribute.clone(),
                self.config.pin_attribute.clone(),
            ],
        )
        .await?;
        self.directory
            .bind(&entry.dn, pwd)
            .await
            .map_err(AuthError::from_directory)?;

        let Some(stored) = entry.first(&self.config.pin_attribute) else {
            debug!("user {} has no enrollment pin", uid);
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_pin(stored, &entry.dn, pin.expose_secret()) {
            debug!("pin verification failed for {}", uid);
            return Err(AuthError::InvalidCredentials);
        }

        if self.config.remove_pin {
            self.remove_pin(&entry.dn).await?;
        }

        Ok(AuthToken::new()
            .with(TOKEN_UID, uid)
            .with(TOKEN_USER_DN, entry.dn))
    }
}
