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
use secrecy::SecretString;
use serde::Deserialize;

use crate::config::common::default_memory_driver;

/// Directory gateway configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct DirectorySection {
    /// Directory driver.
    #[serde(default = "default_memory_driver")]
    pub driver: String,

    /// Base DN of the CA subtree.
    #[serde(default = "default_base_dn")]
    pub base_dn: String,

    /// RDN of the user container relative to `base_dn`.
    #[serde(default = "default_user_base")]
    pub user_base: String,

    /// RDN of the group container relative to `base_dn`.
    #[serde(default = "default_group_base")]
    pub group_base: String,

    /// Attribute holding the login name.
    #[serde(default = "default_uid_attribute")]
    pub uid_attribute: String,

    /// Attribute holding the one time enrollment pin.
    #[serde(default = "default_pin_attribute")]
    pub pin_attribute: String,

    /// Remove the pin right after a successful verification.
    #[serde(default = "default_remove_pin")]
    pub remove_pin: bool,

    /// DN used for the privileged connection removing used pins.
    pub bind_dn: Option<String>,

    /// Password of the privileged connection.
    pub bind_password: Option<SecretString>,
}

impl Default for DirectorySection {
    fn default() -> Self {
        Self {
            driver: default_memory_driver(),
            base_dn: default_base_dn(),
            user_base: default_user_base(),
            group_base: default_group_base(),
            uid_attribute: default_uid_attribute(),
            pin_attribute: default_pin_attribute(),
            remove_pin: default_remove_pin(),
            bind_dn: None,
            bind_password: None,
        }
    }
}

impl DirectorySection {
    /// Full DN of the user container.
    pub fn get_user_base_dn(&self) -> String {
        format!("{},{}", self.user_base, self.base_dn)
    }

    /// Full DN of the group container.
    pub fn get_group_base_dn(&self) -> String {
        format!("{},{}", self.group_base, self.base_dn)
    }
}

fn default_base_dn() -> String {
    "o=pki-tomcat-CA".into()
}

fn default_user_base() -> String {
    "ou=people".into()
}

fn default_group_base() -> String {
    "ou=groups".into()
}

fn default_uid_attribute() -> String {
    "uid".into()
}

fn default_pin_attribute() -> String {
    "pin".into()
}

fn default_remove_pin() -> bool {
    true
}
