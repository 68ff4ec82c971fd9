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
//! # Plugin manager
//!
//! A driver, also known as a backend, is an abstraction around the data access
//! or the external system needed by a particular subsystem: the audit sink,
//! the request queue, the directory gateway, the certificate issuer and the
//! authenticator instances. Custom implementations are registered under a name
//! and picked by the providers according to the configuration.
//!
//! The [PluginManager] is also the registry of the profile policy classes.
//! Profiles reference their defaults, constraints, inputs and outputs by class
//! id; every lookup constructs a fresh component through the registered
//! factory.
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::audit::backend::AuditSink;
use crate::auth::backend::Authenticator;
use crate::directory::DirectoryGateway;
use crate::issuer::backend::CertificateIssuer;
use crate::profile::policies;
use crate::profile::policy::{
    ConstraintPolicy, DefaultPolicy, InputPolicy, OutputPolicy, PolicyFamily, PolicyKind,
};
use crate::request::backend::RequestQueue;

/// Policy class registry error.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Class id is already registered for the family.
    #[error("{family} policy class {class_id} is already registered")]
    Duplicate {
        family: PolicyFamily,
        class_id: String,
    },

    /// Class id is not registered for the family.
    #[error("unknown {family} policy class {class_id}")]
    UnknownClass {
        family: PolicyFamily,
        class_id: String,
    },
}

type Factory<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// Plugin manager allowing to pass custom backend plugins and policy classes
/// implementing required trait during the service start.
#[derive(Clone, Default)]
pub struct PluginManager {
    /// Audit sink plugins.
    audit_sinks: HashMap<String, Arc<dyn AuditSink>>,
    /// Authenticator instances keyed by the instance id.
    authenticators: BTreeMap<String, Arc<dyn Authenticator>>,
    /// Directory gateway plugins.
    directories: HashMap<String, Arc<dyn DirectoryGateway>>,
    /// Gateway bound with the privileged identity used for PIN removal.
    privileged_directory: Option<Arc<dyn DirectoryGateway>>,
    /// Certificate issuer plugins.
    issuers: HashMap<String, Arc<dyn CertificateIssuer>>,
    /// Request queue plugins.
    request_queues: HashMap<String, Arc<dyn RequestQueue>>,

    default_policies: BTreeMap<String, Factory<dyn DefaultPolicy>>,
    constraint_policies: BTreeMap<String, Factory<dyn ConstraintPolicy>>,
    input_policies: BTreeMap<String, Factory<dyn InputPolicy>>,
    output_policies: BTreeMap<String, Factory<dyn OutputPolicy>>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("audit_sinks", &self.audit_sinks.keys())
            .field("authenticators", &self.authenticators.keys())
            .field("directories", &self.directories.keys())
            .field("issuers", &self.issuers.keys())
            .field("request_queues", &self.request_queues.keys())
            .field("default_policies", &self.default_policies.keys())
            .field("constraint_policies", &self.constraint_policies.keys())
            .field("input_policies", &self.input_policies.keys())
            .field("output_policies", &self.output_policies.keys())
            .finish()
    }
}

fn register_factory<T: ?Sized>(
    registry: &mut BTreeMap<String, Factory<T>>,
    family: PolicyFamily,
    class_id: String,
    factory: Factory<T>,
) -> Result<(), RegistryError> {
    if registry.contains_key(&class_id) {
        return Err(RegistryError::Duplicate { family, class_id });
    }
    registry.insert(class_id, factory);
    Ok(())
}

impl PluginManager {
    /// Register all built-in policy classes.
    pub fn with_builtin_policies(mut self) -> Self {
        for (class_id, factory) in policies::DEFAULTS {
            self.default_policies
                .insert(class_id.to_string(), Arc::new(*factory));
        }
        for (class_id, factory) in policies::CONSTRAINTS {
            self.constraint_policies
                .insert(class_id.to_string(), Arc::new(*factory));
        }
        for (class_id, factory) in policies::INPUTS {
            self.input_policies
                .insert(class_id.to_string(), Arc::new(*factory));
        }
        for (class_id, factory) in policies::OUTPUTS {
            self.output_policies
                .insert(class_id.to_string(), Arc::new(*factory));
        }
        self
    }

    /// Register default policy class.
    pub fn register_default_policy<S, F>(&mut self, class_id: S, factory: F) -> Result<(), RegistryError>
    where
        S: Into<String>,
        F: Fn() -> Box<dyn DefaultPolicy> + Send + Sync + 'static,
    {
        let factory: Factory<dyn DefaultPolicy> = Arc::new(factory);
        register_factory(
            &mut self.default_policies,
            PolicyFamily::Default,
            class_id.into(),
            factory,
        )
    }

    /// Register constraint policy class.
    pub fn register_constraint_policy<S, F>(
        &mut self,
        class_id: S,
        factory: F,
    ) -> Result<(), RegistryError>
    where
        S: Into<String>,
        F: Fn() -> Box<dyn ConstraintPolicy> + Send + Sync + 'static,
    {
        let factory: Factory<dyn ConstraintPolicy> = Arc::new(factory);
        register_factory(
            &mut self.constraint_policies,
            PolicyFamily::Constraint,
            class_id.into(),
            factory,
        )
    }

    /// Register input policy class.
    pub fn register_input_policy<S, F>(&mut self, class_id: S, factory: F) -> Result<(), RegistryError>
    where
        S: Into<String>,
        F: Fn() -> Box<dyn InputPolicy> + Send + Sync + 'static,
    {
        let factory: Factory<dyn InputPolicy> = Arc::new(factory);
        register_factory(
            &mut self.input_policies,
            PolicyFamily::Input,
            class_id.into(),
            factory,
        )
    }

    /// Register output policy class.
    pub fn register_output_policy<S, F>(&mut self, class_id: S, factory: F) -> Result<(), RegistryError>
    where
        S: Into<String>,
        F: Fn() -> Box<dyn OutputPolicy> + Send + Sync + 'static,
    {
        let factory: Factory<dyn OutputPolicy> = Arc::new(factory);
        register_factory(
            &mut self.output_policies,
            PolicyFamily::Output,
            class_id.into(),
            factory,
        )
    }

    /// Construct a fresh unconfigured policy of the class.
    pub fn resolve_policy(
        &self,
        family: PolicyFamily,
        class_id: &str,
    ) -> Result<PolicyKind, RegistryError> {
        let kind = match family {
            PolicyFamily::Default => self
                .default_policies
                .get(class_id)
                .map(|factory| PolicyKind::Default(factory())),
            PolicyFamily::Constraint => self
                .constraint_policies
                .get(class_id)
                .map(|factory| PolicyKind::Constraint(factory())),
            PolicyFamily::Input => self
                .input_policies
                .get(class_id)
                .map(|factory| PolicyKind::Input(factory())),
            PolicyFamily::Output => self
                .output_policies
                .get(class_id)
                .map(|factory| PolicyKind::Output(factory())),
        };
        kind.ok_or_else(|| RegistryError::UnknownClass {
            family,
            class_id: class_id.to_string(),
        })
    }

    /// Registered class ids of the family in sorted order.
    pub fn policy_classes(&self, family: PolicyFamily) -> Vec<&str> {
        match family {
            PolicyFamily::Default => self.default_policies.keys().map(String::as_str).collect(),
            PolicyFamily::Constraint => self
                .constraint_policies
                .keys()
                .map(String::as_str)
                .collect(),
            PolicyFamily::Input => self.input_policies.keys().map(String::as_str).collect(),
            PolicyFamily::Output => self.output_policies.keys().map(String::as_str).collect(),
        }
    }

    /// Register audit sink.
    pub fn register_audit_sink<S: AsRef<str>>(&mut self, name: S, plugin: Arc<dyn AuditSink>) {
        self.audit_sinks.insert(name.as_ref().to_string(), plugin);
    }

    /// Register authenticator instance under its instance id. A plugin
    /// replaces the built-in instance with the same id.
    pub fn register_authenticator(&mut self, plugin: Arc<dyn Authenticator>) {
        self.authenticators.insert(plugin.id().to_string(), plugin);
    }

    /// Register directory gateway.
    pub fn register_directory<S: AsRef<str>>(
        &mut self,
        name: S,
        plugin: Arc<dyn DirectoryGateway>,
    ) {
        self.directories.insert(name.as_ref().to_string(), plugin);
    }

    /// Register the gateway bound with the privileged identity.
    pub fn register_privileged_directory(&mut self, plugin: Arc<dyn DirectoryGateway>) {
        self.privileged_directory = Some(plugin);
    }

    /// Register certificate issuer.
    pub fn register_issuer<S: AsRef<str>>(&mut self, name: S, plugin: Arc<dyn CertificateIssuer>) {
        self.issuers.insert(name.as_ref().to_string(), plugin);
    }

    /// Register request queue.
    pub fn register_request_queue<S: AsRef<str>>(
        &mut self,
        name: S,
        plugin: Arc<dyn RequestQueue>,
    ) {
        self.request_queues.insert(name.as_ref().to_string(), plugin);
    }

    /// Get registered audit sink.
    pub fn get_audit_sink<S: AsRef<str>>(&self, name: S) -> Option<&Arc<dyn AuditSink>> {
        self.audit_sinks.get(name.as_ref())
    }

    /// Get registered authenticator instances.
    pub fn get_authenticators(&self) -> impl Iterator<Item = (&String, &Arc<dyn Authenticator>)> {
        self.authenticators.iter()
    }

    /// Get registered directory gateway.
    pub fn get_directory<S: AsRef<str>>(&self, name: S) -> Option<&Arc<dyn DirectoryGateway>> {
        self.directories.get(name.as_ref())
    }

    /// Get the privileged directory gateway.
    pub fn get_privileged_directory(&self) -> Option<&Arc<dyn DirectoryGateway>> {
        self.privileged_directory.as_ref()
    }

    /// Get registered certificate issuer.
    pub fn get_issuer<S: AsRef<str>>(&self, name: S) -> Option<&Arc<dyn CertificateIssuer>> {
        self.issuers.get(name.as_ref())
    }

    /// Get registered request queue.
    pub fn get_request_queue<S: AsRef<str>>(&self, name: S) -> Option<&Arc<dyn RequestQueue>> {
        self.request_queues.get(name.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::policies::NoDefault;

    #[test]
    fn test_builtin_policies() {
        let plugins = PluginManager::default().with_builtin_policies();
        assert!(matches!(
            plugins.resolve_policy(PolicyFamily::Default, "validityDefaultImpl"),
            Ok(PolicyKind::Default(_))
        ));
        assert!(matches!(
            plugins.resolve_policy(PolicyFamily::Constraint, "keyConstraintImpl"),
            Ok(PolicyKind::Constraint(_))
        ));
        assert!(
            plugins
                .policy_classes(PolicyFamily::Input)
                .contains(&"certReqInputImpl")
        );
        // Class ids are scoped by family.
        assert_eq!(
            Err(RegistryError::UnknownClass {
                family: PolicyFamily::Constraint,
                class_id: "validityDefaultImpl".into()
            }),
            plugins
                .resolve_policy(PolicyFamily::Constraint, "validityDefaultImpl")
                .map(|_| ())
        );
    }

    #[test]
    fn test_register_duplicate() {
        let mut plugins = PluginManager::default().with_builtin_policies();
        assert_eq!(
            Err(RegistryError::Duplicate {
                family: PolicyFamily::Default,
                class_id: "noDefaultImpl".into()
            }),
            plugins.register_default_policy("noDefaultImpl", || {
                Box::new(NoDefault) as Box<dyn DefaultPolicy>
            })
        );
        assert!(
            plugins
                .register_default_policy("customDefaultImpl", || {
                    Box::new(NoDefault) as Box<dyn DefaultPolicy>
                })
                .is_ok()
        );
        assert!(
            plugins
                .resolve_policy(PolicyFamily::Default, "customDefaultImpl")
                .is_ok()
        );
    }

    #[test]
    fn test_empty_registry() {
        let plugins = PluginManager::default();
        assert!(
            plugins
                .resolve_policy(PolicyFamily::Output, "certOutputImpl")
                .is_err()
        );
        assert!(plugins.get_audit_sink("memory").is_none());
        assert!(plugins.get_privileged_directory().is_none());
    }
}
