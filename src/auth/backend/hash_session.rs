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
//! # Hash fingerprint session authenticator
//!
//! An agent issues a one time enrollment session for a host, page and user.
//! The session is identified by the fingerprint
//! `base64(SHA1(salt | host | pageID | uid | issued_at_ms))`. It is valid for
//! the configured lifetime and can be used once.
//!
//! The salt is a single static value shared by all deployments. This is a
//! known weakness kept for compatibility with the issued enrollment pages; it
//! does not make the fingerprint a secret on its own.
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::auth::backend::Authenticator;
use crate::auth::error::AuthError;
use crate::auth::pin::constant_time_eq;
use crate::auth::types::*;

/// Legacy salt of the fingerprint.
pub const LEGACY_SALT: &str = "lala123";

#[derive(Clone, Debug)]
struct Session {
    fingerprint: String,
    issued_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct SessionKey {
    host: String,
    page_id: String,
    uid: String,
}

#[derive(Clone, Debug)]
pub struct HashSessionAuthenticator {
    id: String,
    lifetime: TimeDelta,
    sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
}

/// Compute the session fingerprint.
pub fn fingerprint(host: &str, page_id: &str, uid: &str, issued_at_ms: i64) -> String {
    let mut hasher = Sha1::new();
    hasher.update(LEGACY_SALT.as_bytes());
    hasher.update(host.as_bytes());
    hasher.update(page_id.as_bytes());
    hasher.update(uid.as_bytes());
    hasher.update(issued_at_ms.to_string().as_bytes());
    STANDARD.encode(hasher.finalize())
}

impl HashSessionAuthenticator {
    pub fn new<S: Into<String>>(id: S, lifetime: TimeDelta) -> Self {
        Self {
            id: id.into(),
            lifetime,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.issued_at >= self.lifetime
    }

    /// Issue the session replacing the previous one for the same key.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn issue(&self, host: &str, page_id: &str, uid: &str) -> String {
        let now = Utc::now();
        let fp = fingerprint(host, page_id, uid, now.timestamp_millis());
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| !self.is_expired(session, now));
        sessions.insert(
            SessionKey {
                host: host.into(),
                page_id: page_id.into(),
                uid: uid.into(),
            },
            Session {
                fingerprint: fp.clone(),
                issued_at: now,
            },
        );
        fp
    }

    /// Number of sessions not yet used.
    pub async fn pending_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl Authenticator for HashSessionAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &[CRED_HOST, CRED_PAGE_ID, CRED_UID, CRED_FINGERPRINT]
    }

    async fn authenticate(&self, credentials: &AuthCredentials) -> Result<AuthToken, AuthError> {
        let key = SessionKey {
            host: credentials.require_str(CRED_HOST)?,
            page_id: credentials.require_str(CRED_PAGE_ID)?,
            uid: credentials.require_str(CRED_UID)?,
        };
        let supplied = credentials.require(CRED_FINGERPRINT)?;
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(&key) else {
            debug!("no session for {:?}", key);
            return Err(AuthError::InvalidCredentials);
        };
        if self.is_expired(session, now) {
            debug!("session for {:?} expired", key);
            sessions.remove(&key);
            return Err(AuthError::InvalidCredentials);
        }
        if !constant_time_eq(
            session.fingerprint.as_bytes(),
            supplied.expose_secret().trim().as_bytes(),
        ) {
            debug!("fingerprint mismatch for {:?}", key);
            return Err(AuthError::InvalidCredentials);
        }
        sessions.remove(&key);
        Ok(AuthToken::new()
            .with(TOKEN_UID, key.uid)
            .with(TOKEN_HOST, key.host)
            .with(TOKEN_PAGE_ID, key.page_id))
    }
}
