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
use serde::Deserialize;

use crate::config::common::csv;

/// Audit configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AuditSection {
    /// Audit sink driver.
    #[serde(default = "default_audit_driver")]
    pub driver: String,

    /// Names of the events that must be sealed before storage. When empty the
    /// built-in classification of every event type is used.
    #[serde(default, deserialize_with = "csv")]
    pub signed_events: Vec<String>,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            driver: default_audit_driver(),
            signed_events: Vec::new(),
        }
    }
}

fn default_audit_driver() -> String {
    "log".into()
}
