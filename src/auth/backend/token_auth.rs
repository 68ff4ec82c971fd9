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
//! # Delegated token authenticator
//!
//! The session id presented by the client is validated by the peer CA that
//! issued it. The request has a finite timeout and a timed out validation is
//! treated as invalid credentials.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::auth::backend::Authenticator;
use crate::auth::error::AuthError;
use crate::auth::types::*;

/// Path of the validation endpoint on the peer CA.
pub const TOKEN_AUTHENTICATE_PATH: &str = "/ca/admin/ca/tokenAuthenticate";

/// Successful status of the peer response.
const STATUS_OK: &str = "0";

#[derive(Debug, Deserialize)]
struct TokenAuthResponse {
    #[serde(rename = "Status")]
    status: String,
    #[serde(default)]
    uid: Option<String>,
    #[serde(default)]
    gid: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TokenAuthenticator {
    id: String,
    url: Url,
    client: Client,
}

impl TokenAuthenticator {
    pub fn new<S: Into<String>>(id: S, url: Url, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| AuthError::infrastructure(format!("cannot build http client: {err}")))?;
        Ok(Self {
            id: id.into(),
            url,
            client,
        })
    }

    fn endpoint(&self) -> Result<Url, AuthError> {
        self.url
            .join(TOKEN_AUTHENTICATE_PATH)
            .map_err(|err| AuthError::infrastructure(format!("invalid peer url: {err}")))
    }
}

fn map_transport_error(err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        warn!("token validation timed out");
        AuthError::InvalidCredentials
    } else {
        AuthError::infrastructure(format!("token validation request failed: {err}"))
    }
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }

    fn required_credentials(&self) -> &'static [&'static str] {
        &[CRED_SESSION_ID, CRED_HOST]
    }

    #[tracing::instrument(level = "debug", skip(self, credentials))]
    async fn authenticate(&self, credentials: &AuthCredentials) -> Result<AuthToken, AuthError> {
        let session_id = credentials.require(CRED_SESSION_ID)?;
        let host = credentials.require_str(CRED_HOST)?;

        let response = self
            .client
            .post(self.endpoint()?)
            .json(&json!({
                "sessionID": session_id.expose_secret(),
                "hostname": host,
            }))
            .send()
            .await
            .map_err(map_transport_error)?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidCredentials);
            }
            other => {
                debug!("peer CA returned {:?}", response);
                return Err(AuthError::infrastructure(format!(
                    "peer CA returned {other}"
                )));
            }
        }
        let body: TokenAuthResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                AuthError::InvalidCredentials
            } else {
                AuthError::infrastructure(format!("invalid peer CA response: {err}"))
            }
        })?;
        if body.status != STATUS_OK {
            debug!("peer CA rejected the session with status {}", body.status);
            return Err(AuthError::InvalidCredentials);
        }
        let uid = body
            .uid
            .filter(|uid| !uid.trim().is_empty())
            .ok_or_else(|| AuthError::infrastructure("peer CA response lacks the uid"))?;
        let mut token = AuthToken::new().with(TOKEN_UID, uid).with(TOKEN_HOST, host);
        if let Some(gid) = body.gid {
            token.set_list(
                TOKEN_GROUPS,
                gid.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(Into::into)
                    .collect(),
            );
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn creds() -> AuthCredentials {
        AuthCredentials::new()
            .with("sessionID", "s3ss10n")
            .with("hostname", "tps.example.com")
    }

    fn authenticator(srv: &MockServer, timeout: Duration) -> TokenAuthenticator {
        TokenAuthenticator::new(
            "TokenAuth",
            Url::parse(&format!("http://{}:{}", srv.host(), srv.port())).unwrap(),
            timeout,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_authenticate() {
        let srv = MockServer::start_async().await;
        let mock = srv
            .mock_async(|when, then| {
                when.method("POST")
                    .path(TOKEN_AUTHENTICATE_PATH)
                    .json_body(json!({"sessionID": "s3ss10n", "hostname": "tps.example.com"}));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"Status": "0", "uid": "tpsagent", "gid": "TPS Agents, Admins"}));
            })
            .await;
        let token = authenticator(&srv, Duration::from_secs(5))
            .authenticate(&creds())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(Some("tpsagent"), token.uid());
        assert_eq!(
            &["TPS Agents".to_string(), "Admins".to_string()],
            token.get_list(TOKEN_GROUPS)
        );
    }

    #[tokio::test]
    async fn test_rejected() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("POST").path(TOKEN_AUTHENTICATE_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"Status": "1"}));
        })
        .await;
        assert!(matches!(
            authenticator(&srv, Duration::from_secs(5))
                .authenticate(&creds())
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_server_error() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("POST").path(TOKEN_AUTHENTICATE_PATH);
            then.status(500);
        })
        .await;
        assert!(matches!(
            authenticator(&srv, Duration::from_secs(5))
                .authenticate(&creds())
                .await,
            Err(AuthError::Infrastructure { .. })
        ));
    }

    #[tokio::test]
    async fn test_timeout_fails_closed() {
        let srv = MockServer::start_async().await;
        srv.mock_async(|when, then| {
            when.method("POST").path(TOKEN_AUTHENTICATE_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .header("content-type", "application/json")
                .json_body(json!({"Status": "0", "uid": "tpsagent"}));
        })
        .await;
        assert!(matches!(
            authenticator(&srv, Duration::from_millis(200))
                .authenticate(&creds())
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_missing_session() {
        let srv = MockServer::start_async().await;
        assert!(matches!(
            authenticator(&srv, Duration::from_secs(5))
                .authenticate(&AuthCredentials::new().with("hostname", "h"))
                .await,
            Err(AuthError::MissingCredential(name)) if name == "sessionID"
        ));
    }
}
