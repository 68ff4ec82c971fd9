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
use chrono::TimeDelta;
use serde::Deserialize;
use url::Url;

use crate::config::common::csv;

/// Authentication configuration.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct AuthSection {
    /// Authenticator instances enabled for the profiles. Profiles referencing
    /// an instance missing from the list cannot authenticate. An empty list
    /// enables every registered instance.
    #[serde(default, deserialize_with = "csv")]
    pub methods: Vec<String>,
}

/// Hash fingerprint session configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSection {
    /// Lifetime of the issued fingerprint in seconds.
    #[serde(default = "default_session_lifetime")]
    pub lifetime: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            lifetime: default_session_lifetime(),
        }
    }
}

impl SessionSection {
    pub fn get_lifetime(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.lifetime as i64).unwrap_or(TimeDelta::zero())
    }
}

/// Delegated token authentication configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenAuthSection {
    /// Base url of the peer CA performing the session validation.
    pub url: Option<Url>,

    /// Request timeout in seconds. A timed out validation is treated as
    /// invalid credentials.
    #[serde(default = "default_token_auth_timeout")]
    pub timeout: u64,
}

impl Default for TokenAuthSection {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_token_auth_timeout(),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentSection {
    /// Group whose members may approve, reject or cancel requests.
    #[serde(default = "default_agent_group")]
    pub group: String,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            group: default_agent_group(),
        }
    }
}

fn default_session_lifetime() -> u64 {
    600
}

fn default_token_auth_timeout() -> u64 {
    30
}

fn default_agent_group() -> String {
    "Certificate Manager Agents".into()
}
