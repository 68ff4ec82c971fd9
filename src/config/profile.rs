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
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::common::default_memory_driver;

/// Profile engine configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileSection {
    /// Directory with the `*.cfg` profile definitions.
    #[serde(default = "default_profile_directory")]
    pub directory: PathBuf,

    /// Abort the populate step on the first failing default policy. The
    /// legacy behavior (`false`) logs the failure and continues with the
    /// remaining policies.
    #[serde(default)]
    pub strict_populate: bool,

    /// Skip policies that cannot be constructed while loading a profile
    /// (legacy behavior). Every skip is logged and audited. When `false` the
    /// whole profile fails to load.
    #[serde(default = "default_skip_invalid_policies")]
    pub skip_invalid_policies: bool,
}

impl Default for ProfileSection {
    fn default() -> Self {
        Self {
            directory: default_profile_directory(),
            strict_populate: false,
            skip_invalid_policies: default_skip_invalid_policies(),
        }
    }
}

/// Request queue configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RequestSection {
    /// Request queue driver.
    #[serde(default = "default_memory_driver")]
    pub driver: String,
}

impl Default for RequestSection {
    fn default() -> Self {
        Self {
            driver: default_memory_driver(),
        }
    }
}

/// Certificate issuer configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct IssuerSection {
    /// Issuer driver.
    #[serde(default = "default_issuer_driver")]
    pub driver: String,

    /// First serial number allocated by the issuer.
    #[serde(default = "default_serial_start")]
    pub serial_start: u64,
}

impl Default for IssuerSection {
    fn default() -> Self {
        Self {
            driver: default_issuer_driver(),
            serial_start: default_serial_start(),
        }
    }
}

/// Token processing system configuration.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct TpsSection {
    /// Token profile mapping file.
    pub mapping: Option<PathBuf>,
}

fn default_profile_directory() -> PathBuf {
    PathBuf::from("/etc/pki/ca/profiles/ca")
}

fn default_skip_invalid_policies() -> bool {
    true
}

fn default_issuer_driver() -> String {
    "record".into()
}

fn default_serial_start() -> u64 {
    1
}
