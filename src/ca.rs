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
//! # Service state
//!
//! The state shared by every enrollment and agent operation: the
//! configuration and the provider manager.
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::CaError;
use crate::plugin_manager::PluginManager;
use crate::provider::Provider;

pub struct Service {
    /// Config file
    pub config: Config,
    /// Service/resource Provider
    pub provider: Provider,
}

pub type ServiceState = Arc<Service>;

impl Service {
    pub fn new(cfg: Config, provider: Provider) -> Self {
        Self {
            config: cfg,
            provider,
        }
    }

    /// Build the providers for the configuration and wrap them into the
    /// shared state.
    pub fn build(cfg: Config, plugin_manager: PluginManager) -> Result<ServiceState, CaError> {
        let provider = Provider::new(cfg.clone(), plugin_manager)?;
        Ok(Arc::new(Self::new(cfg, provider)))
    }

    pub async fn terminate(&self) -> Result<(), CaError> {
        info!("Terminating CA");
        Ok(())
    }
}
