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
//! # Authentication
//!
//! Authenticators are registered under their instance ids and selected by the
//! profile. Every attempt passes through the [`AuthState`] machine
//! (`UNAUTHENTICATED -> AUTHENTICATING -> AUTHENTICATED | REJECTED`) and ends
//! with exactly one `AUTH` audit record, emitted before the result is returned
//! to the caller.
//!
//! Built-in instances:
//!
//!   - `UserDirEnrollment`: directory uid/password bind.
//!   - `PinDirEnrollment`: directory uid/password bind with the one time pin.
//!   - `HashDirEnrollment`: hash fingerprint session issued by an agent.
//!   - `TokenAuth`: session validation delegated to the peer CA (registered
//!     only when `[token_auth] url` is configured).
use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

pub mod backend;
pub mod error;
pub mod pin;
pub mod types;

use crate::audit::{AuditApi, AuditEvent, AuditEventType, SUBJECT_UNIDENTIFIED};
use crate::auth::backend::*;
use crate::ca::ServiceState;
use crate::config::Config;
use crate::directory::DirectoryGateway;
use crate::plugin_manager::PluginManager;

pub use error::AuthError;
pub use types::*;

pub const USER_DIR_ENROLLMENT: &str = "UserDirEnrollment";
pub const PIN_DIR_ENROLLMENT: &str = "PinDirEnrollment";
pub const HASH_DIR_ENROLLMENT: &str = "HashDirEnrollment";
pub const TOKEN_AUTH: &str = "TokenAuth";

#[async_trait]
pub trait AuthenticationApi: Send + Sync + Clone {
    /// Authenticate with the given authenticator instance.
    async fn authenticate(
        &self,
        state: &ServiceState,
        instance_id: &str,
        credentials: &AuthCredentials,
    ) -> Result<AuthToken, AuthError>;

    /// Names of the credentials required by the instance.
    fn required_credentials(&self, instance_id: &str) -> Result<Vec<String>, AuthError>;

    /// Issue the hash fingerprint session.
    async fn issue_session(
        &self,
        host: &str,
        page_id: &str,
        uid: &str,
    ) -> Result<String, AuthError>;
}

/// Authentication provider.
#[derive(Clone, Debug)]
pub struct AuthenticationProvider {
    authenticators: BTreeMap<String, Arc<dyn Authenticator>>,
    /// Enabled instances. Empty means all registered instances.
    enabled: Vec<String>,
    hash_sessions: HashSessionAuthenticator,
}

impl AuthenticationProvider {
    pub fn new(
        config: &Config,
        plugin_manager: &PluginManager,
        directory: Arc<dyn DirectoryGateway>,
    ) -> Result<Self, AuthError> {
        let privileged = plugin_manager
            .get_privileged_directory()
            .cloned()
            .unwrap_or_else(|| directory.clone());
        let hash_sessions =
            HashSessionAuthenticator::new(HASH_DIR_ENROLLMENT, config.session.get_lifetime());
        let mut provider = Self {
            authenticators: BTreeMap::new(),
            enabled: config.auth.methods.clone(),
            hash_sessions: hash_sessions.clone(),
        };
        provider.register(Arc::new(UidPwdDirAuthenticator::new(
            USER_DIR_ENROLLMENT,
            &config.directory,
            directory.clone(),
        )))?;
        provider.register(Arc::new(UidPwdPinDirAuthenticator::new(
            PIN_DIR_ENROLLMENT,
            &config.directory,
            directory,
            privileged,
        )))?;
        provider.register(Arc::new(hash_sessions))?;
        if let Some(url) = &config.token_auth.url {
            provider.register(Arc::new(TokenAuthenticator::new(
                TOKEN_AUTH,
                url.clone(),
                Duration::from_secs(config.token_auth.timeout),
            )?))?;
        }
        // Plugins may replace the built-in instances.
        for (id, authenticator) in plugin_manager.get_authenticators() {
            provider
                .authenticators
                .insert(id.clone(), authenticator.clone());
        }
        Ok(provider)
    }

    /// Register the authenticator instance.
    pub fn register(&mut self, authenticator: Arc<dyn Authenticator>) -> Result<(), AuthError> {
        let id = authenticator.id().to_string();
        if self.authenticators.contains_key(&id) {
            return Err(AuthError::Duplicate(id));
        }
        self.authenticators.insert(id, authenticator);
        Ok(())
    }

    fn get_authenticator(&self, instance_id: &str) -> Result<&Arc<dyn Authenticator>, AuthError> {
        let authenticator = self
            .authenticators
            .get(instance_id)
            .ok_or_else(|| AuthError::UnknownAuthenticator(instance_id.to_string()))?;
        if !self.enabled.is_empty() && !self.enabled.iter().any(|id| id == instance_id) {
            return Err(AuthError::NotEnabled(instance_id.to_string()));
        }
        Ok(authenticator)
    }

    /// Registered instance ids.
    pub fn list_instances(&self) -> Vec<String> {
        self.authenticators.keys().cloned().collect()
    }
}

#[async_trait]
impl AuthenticationApi for AuthenticationProvider {
    #[tracing::instrument(level = "info", skip(self, state, credentials))]
    async fn authenticate(
        &self,
        state: &ServiceState,
        instance_id: &str,
        credentials: &AuthCredentials,
    ) -> Result<AuthToken, AuthError> {
        let attempted_uid = credentials
            .get(CRED_UID)
            .map(|val| val.expose_secret().trim().to_string());
        let attempt = AuthState::Unauthenticated.begin()?;
        let res = match self.get_authenticator(instance_id) {
            Ok(authenticator) => authenticator.authenticate(credentials).await,
            Err(err) => Err(err),
        };

        match res {
            Ok(mut token) => {
                token.set(TOKEN_AUTHMGR_INST_NAME, instance_id);
                token.set(TOKEN_AUTH_TIME, Utc::now().to_rfc3339());
                let attempt = attempt.accept(token.clone())?;
                debug!("authentication state: {:?}", attempt);
                state
                    .provider
                    .get_audit_provider()
                    .emit(
                        AuditEvent::builder(AuditEventType::Auth)
                            .subject(token.uid().unwrap_or(SUBJECT_UNIDENTIFIED))
                            .success()
                            .attr("AuthMgr", instance_id)
                            .build(),
                    )
                    .await;
                Ok(token)
            }
            Err(err) => {
                if let AuthError::Infrastructure { reason } = &err {
                    error!("authentication with {} failed: {}", instance_id, reason);
                } else {
                    debug!("authentication with {} failed: {}", instance_id, err);
                }
                let attempt = attempt.reject(err.audit_info())?;
                debug!("authentication state: {:?}", attempt);
                state
                    .provider
                    .get_audit_provider()
                    .emit(
                        AuditEvent::builder(AuditEventType::Auth)
                            .subject(SUBJECT_UNIDENTIFIED)
                            .failure()
                            .attr("AuthMgr", instance_id)
                            .attr_opt("AttemptedCred", attempted_uid.as_deref())
                            .attr("Info", err.audit_info())
                            .build(),
                    )
                    .await;
                Err(err)
            }
        }
    }

    fn required_credentials(&self, instance_id: &str) -> Result<Vec<String>, AuthError> {
        Ok(self
            .get_authenticator(instance_id)?
            .required_credentials()
            .iter()
            .map(|name| name.to_string())
            .collect())
    }

    async fn issue_session(
        &self,
        host: &str,
        page_id: &str,
        uid: &str,
    ) -> Result<String, AuthError> {
        self.get_authenticator(HASH_DIR_ENROLLMENT)?;
        Ok(self.hash_sessions.issue(host, page_id, uid).await)
    }
}
