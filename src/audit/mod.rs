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
//! # Audit
//!
//! Every outcome boundary of the CA (authentication, profile pipeline stages,
//! request processing, certificate status changes, CRL generation and key
//! archival) builds exactly one immutable [`AuditEvent`] and hands it to the
//! [`AuditProvider`]. The provider decides whether the event belongs to the
//! signed audit trail and passes it to the configured sink, which seals and
//! stores it.
//!
//! Emission is fire-and-forget for the caller: a failing sink is logged at the
//! error level and never changes the outcome of the audited operation.
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

pub mod backend;
pub mod error;
pub mod types;

use crate::audit::backend::{AuditSink, LogAuditSink, MemoryAuditSink};
use crate::audit::error::AuditError;
use crate::config::Config;
use crate::plugin_manager::PluginManager;

pub use types::*;

#[async_trait]
pub trait AuditApi: Send + Sync + Clone {
    /// Hand the event over to the sink.
    async fn emit(&self, event: AuditEvent);
}

/// Audit provider.
#[derive(Clone, Debug)]
pub struct AuditProvider {
    /// Backend driver.
    backend_driver: Arc<dyn AuditSink>,
    /// Event names overriding the built-in signed classification.
    signed_events: HashSet<String>,
}

impl AuditProvider {
    pub fn new(config: &Config, plugin_manager: &PluginManager) -> Result<Self, AuditError> {
        let backend_driver: Arc<dyn AuditSink> =
            if let Some(driver) = plugin_manager.get_audit_sink(config.audit.driver.clone()) {
                driver.clone()
            } else {
                match config.audit.driver.as_str() {
                    "log" => Arc::new(LogAuditSink::default()),
                    "memory" => Arc::new(MemoryAuditSink::default()),
                    _ => {
                        return Err(AuditError::UnsupportedDriver(config.audit.driver.clone()));
                    }
                }
            };
        Ok(Self {
            backend_driver,
            signed_events: config.audit.signed_events.iter().cloned().collect(),
        })
    }

    /// Whether the event must be sealed by the sink.
    pub fn must_seal(&self, event: &AuditEvent) -> bool {
        if self.signed_events.is_empty() {
            event.is_signed()
        } else {
            self.signed_events.contains(event.event_type().name())
        }
    }
}

#[async_trait]
impl AuditApi for AuditProvider {
    #[tracing::instrument(level = "debug", skip(self, event), fields(event = %event.event_type()))]
    async fn emit(&self, event: AuditEvent) {
        let seal = self.must_seal(&event);
        if let Err(err) = self.backend_driver.write(event, seal).await {
            error!("failed to store the audit record: {}", err);
        }
    }
}
