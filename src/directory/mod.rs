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
//! # Directory gateway
//!
//! Minimal lookup, bind and modify contract consumed by the authenticators
//! and the user/group management. Connection handling belongs to the
//! implementation: a connection is never held by the callers across
//! operations.
use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

use crate::config::Config;
use crate::directory::backend::MemoryDirectory;
use crate::directory::error::DirectoryError;
use crate::plugin_manager::PluginManager;

#[cfg(test)]
pub use mock::MockDirectoryGateway;
pub use types::*;

#[async_trait]
pub trait DirectoryGateway: Send + Sync + std::fmt::Debug {
    /// Authenticate as `dn`.
    async fn bind(&self, dn: &str, password: &SecretString) -> Result<(), DirectoryError>;

    /// Search the entries matching the filter. An empty `attrs` list returns
    /// all attributes.
    async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: &[String],
    ) -> Result<Vec<Entry>, DirectoryError>;

    /// Apply the modifications to the entry.
    async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<(), DirectoryError>;
}

/// Select the directory gateway according to the configuration.
pub fn new_gateway(
    config: &Config,
    plugin_manager: &PluginManager,
) -> Result<Arc<dyn DirectoryGateway>, DirectoryError> {
    if let Some(driver) = plugin_manager.get_directory(config.directory.driver.clone()) {
        return Ok(driver.clone());
    }
    match config.directory.driver.as_str() {
        "memory" => Ok(Arc::new(MemoryDirectory::default())),
        other => Err(DirectoryError::Other {
            code: 80,
            message: format!("unsupported directory driver {other}"),
        }),
    }
}
