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
//! # Certificate issuer
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

use crate::config::Config;
use crate::issuer::backend::{CertificateIssuer, RecordIssuer};
use crate::issuer::error::IssuerError;
use crate::plugin_manager::PluginManager;

#[cfg(test)]
pub use mock::MockCertificateIssuer;
pub use types::*;

/// Subject of the CA signing certificate used by the built-in issuer.
pub const DEFAULT_ISSUER_DN: &str = "CN=CA Signing Certificate,O=pki-tomcat-CA";

#[async_trait]
pub trait IssuerApi: Send + Sync + Clone {
    async fn issue(&self, template: &CertificateTemplate)
    -> Result<IssuedCertificate, IssuerError>;
}

#[derive(Clone, Debug)]
pub struct IssuerProvider {
    /// Backend driver.
    backend_driver: Arc<dyn CertificateIssuer>,
}

impl IssuerProvider {
    pub fn new(config: &Config, plugin_manager: &PluginManager) -> Result<Self, IssuerError> {
        let backend_driver: Arc<dyn CertificateIssuer> =
            if let Some(driver) = plugin_manager.get_issuer(config.issuer.driver.clone()) {
                driver.clone()
            } else {
                match config.issuer.driver.as_str() {
                    "record" => Arc::new(RecordIssuer::new(
                        DEFAULT_ISSUER_DN,
                        config.issuer.serial_start,
                    )),
                    _ => {
                        return Err(IssuerError::UnsupportedDriver(
                            config.issuer.driver.clone(),
                        ));
                    }
                }
            };
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl IssuerApi for IssuerProvider {
    #[tracing::instrument(level = "info", skip(self, template), fields(request = template.request_id))]
    async fn issue(
        &self,
        template: &CertificateTemplate,
    ) -> Result<IssuedCertificate, IssuerError> {
        let cert = self.backend_driver.issue(template).await?;
        info!("issued certificate {} for {}", cert.serial_hex(), cert.subject);
        Ok(cert)
    }
}
