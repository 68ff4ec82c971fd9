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
//! # Authentication types
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::auth::error::AuthError;

pub const CRED_UID: &str = "uid";
pub const CRED_PWD: &str = "pwd";
pub const CRED_PIN: &str = "pin";
pub const CRED_HOST: &str = "hostname";
pub const CRED_PAGE_ID: &str = "pageID";
pub const CRED_FINGERPRINT: &str = "fingerprint";
pub const CRED_SESSION_ID: &str = "sessionID";

pub const TOKEN_UID: &str = "uid";
pub const TOKEN_USER_DN: &str = "userdn";
pub const TOKEN_AUTHMGR_INST_NAME: &str = "authMgrInstName";
pub const TOKEN_AUTH_TIME: &str = "authTime";
pub const TOKEN_GROUPS: &str = "groups";
pub const TOKEN_HOST: &str = "hostname";
pub const TOKEN_PAGE_ID: &str = "pageID";

/// Credentials supplied by the client.
#[derive(Clone, Default)]
pub struct AuthCredentials {
    values: BTreeMap<String, SecretString>,
}

impl AuthCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set(name, value);
        self
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.values
            .insert(name.into(), SecretString::from(value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&SecretString> {
        self.values.get(name)
    }

    /// Get the non blank credential or fail with
    /// [`AuthError::MissingCredential`].
    pub fn require(&self, name: &str) -> Result<&SecretString, AuthError> {
        self.values
            .get(name)
            .filter(|val| !val.expose_secret().trim().is_empty())
            .ok_or_else(|| AuthError::MissingCredential(name.to_string()))
    }

    /// Plain value of a non secret credential (uid, hostname).
    pub fn require_str(&self, name: &str) -> Result<String, AuthError> {
        self.require(name)
            .map(|val| val.expose_secret().trim().to_string())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("names", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Result of the successful authentication.
///
/// Transient bag consumed by the profile pipeline; only its values copied into
/// the request outlive the enrollment call.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuthToken {
    values: BTreeMap<String, Vec<String>>,
}

impl AuthToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        self.values.insert(name.into(), vec![value.into()]);
    }

    pub fn set_list<K: Into<String>>(&mut self, name: K, values: Vec<String>) {
        self.values.insert(name.into(), values);
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set(name, value);
        self
    }

    /// First value of the field.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|vals| vals.first())
            .map(String::as_str)
    }

    pub fn get_list(&self, name: &str) -> &[String] {
        self.values
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn uid(&self) -> Option<&str> {
        self.get(TOKEN_UID)
    }

    pub fn user_dn(&self) -> Option<&str> {
        self.get(TOKEN_USER_DN)
    }

    pub fn auth_time(&self) -> Option<DateTime<Utc>> {
        self.get(TOKEN_AUTH_TIME)
            .and_then(|val| DateTime::parse_from_rfc3339(val).ok())
            .map(|val| val.with_timezone(&Utc))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// State of a single authentication attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Authenticated(AuthToken),
    Rejected(String),
}

impl AuthState {
    fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Authenticating => "AUTHENTICATING",
            Self::Authenticated(_) => "AUTHENTICATED",
            Self::Rejected(_) => "REJECTED",
        }
    }

    fn transition(self, next: AuthState) -> Result<AuthState, AuthError> {
        match (&self, &next) {
            (Self::Unauthenticated, Self::Authenticating)
            | (Self::Authenticating, Self::Authenticated(_))
            | (Self::Authenticating, Self::Rejected(_)) => Ok(next),
            _ => Err(AuthError::InvalidTransition {
                from: self.name().into(),
                to: next.name().into(),
            }),
        }
    }

    /// Credentials were supplied.
    pub fn begin(self) -> Result<AuthState, AuthError> {
        self.transition(AuthState::Authenticating)
    }

    pub fn accept(self, token: AuthToken) -> Result<AuthState, AuthError> {
        self.transition(AuthState::Authenticated(token))
    }

    pub fn reject<S: Into<String>>(self, reason: S) -> Result<AuthState, AuthError> {
        self.transition(AuthState::Rejected(reason.into()))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Authenticated(_) | Self::Rejected(_))
    }
}
