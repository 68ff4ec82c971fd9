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
//! # Authenticators
//!
//! Every authenticator instance is registered under its instance id and
//! referenced by the profiles through `auth.instance_id`. Directory based
//! authenticators receive the gateway at construction time.
use async_trait::async_trait;
use std::fmt::Debug;

use crate::auth::error::AuthError;
use crate::auth::types::*;

pub mod hash_session;
pub mod token_auth;
pub mod uid_pwd;
pub mod uid_pwd_pin;

pub use hash_session::HashSessionAuthenticator;
pub use token_auth::TokenAuthenticator;
pub use uid_pwd::UidPwdDirAuthenticator;
pub use uid_pwd_pin::UidPwdPinDirAuthenticator;

#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Instance id.
    fn id(&self) -> &str;

    /// Names of the credentials the authenticator needs.
    fn required_credentials(&self) -> &'static [&'static str];

    /// Verify the credentials.
    ///
    /// The returned token is completed by the provider with the instance name
    /// and the authentication time.
    async fn authenticate(&self, credentials: &AuthCredentials) -> Result<AuthToken, AuthError>;
}
