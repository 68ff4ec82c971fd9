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
//! # Profile pipeline
//!
//! A [`Profile`] turns submitted data into requests and drives each request
//! through the stages in a fixed order:
//!
//! 1. `populate_input`: input policies copy the client data.
//! 2. `populate`: default policies of the selected policy set write derived
//!    values, strictly in declared order.
//! 3. `validate`: constraint policies check the request; the first rejection
//!    or deferral stops the iteration.
//! 4. `execute`: the certificate is issued.
//!
//! Every stage emits exactly one audit event. The profile itself is immutable
//! after loading and may be shared between concurrent pipeline runs; a request
//! must only be processed by one run at a time.
use tracing::{debug, warn};

use crate::audit::{AuditApi, AuditEvent, AuditEventType};
use crate::auth::types::{AuthToken, TOKEN_UID};
use crate::ca::ServiceState;
use crate::common::Locale;
use crate::config::ProfileSection;
use crate::issuer::{CertificateTemplate, IssuedCertificate, IssuerApi};
use crate::plugin_manager::PluginManager;
use crate::profile::config::{ComponentConfig, MatchRule, ProfileConfig};
use crate::profile::error::{PolicyError, ProfileError};
use crate::profile::policies::{parse_submission, store_descriptor};
use crate::profile::policy::*;
use crate::profile::types::*;
use crate::request::types::*;
use crate::request::RequestApi;

#[derive(Debug)]
pub struct ProfileInput {
    pub id: String,
    pub class_id: String,
    pub policy: Box<dyn InputPolicy>,
}

#[derive(Debug)]
pub struct ProfileOutput {
    pub id: String,
    pub class_id: String,
    pub policy: Box<dyn OutputPolicy>,
}

/// Default and constraint bound to one policy id.
#[derive(Debug)]
pub struct ProfilePolicy {
    pub id: String,
    pub default_class: String,
    pub default: Box<dyn DefaultPolicy>,
    pub constraint_class: String,
    pub constraint: Box<dyn ConstraintPolicy>,
}

#[derive(Debug)]
pub struct PolicySet {
    pub id: String,
    pub match_rule: Option<MatchRule>,
    pub policies: Vec<ProfilePolicy>,
}

impl PolicySet {
    fn matches(&self, request: &Request) -> bool {
        match &self.match_rule {
            None => true,
            Some(rule) => request
                .ext(&rule.field)
                .map(|val| val.to_string().eq_ignore_ascii_case(&rule.value))
                .unwrap_or(false),
        }
    }
}

/// Loaded enrollment profile.
#[derive(Debug)]
pub struct Profile {
    id: String,
    name: String,
    description: String,
    visible: bool,
    enabled: bool,
    enabled_by: Option<String>,
    renewal: bool,
    auth_instance_id: Option<String>,
    inputs: Vec<ProfileInput>,
    outputs: Vec<ProfileOutput>,
    policy_sets: Vec<PolicySet>,
    skipped: Vec<SkippedPolicy>,
    strict_populate: bool,
}

/// Construct and configure one component.
fn build_component<T, F>(
    plugin_manager: &PluginManager,
    family: PolicyFamily,
    config: &ComponentConfig,
    extract: F,
) -> Result<Box<T>, String>
where
    T: PolicyComponent + ?Sized,
    F: FnOnce(PolicyKind) -> Option<Box<T>>,
{
    let kind = plugin_manager
        .resolve_policy(family, &config.class_id)
        .map_err(|err| err.to_string())?;
    let mut component =
        extract(kind).ok_or_else(|| format!("{} is not a {family} policy", config.class_id))?;
    component
        .init(&config.params)
        .map_err(|err: PolicyError| err.to_string())?;
    Ok(component)
}

fn request_locale(request: &Request) -> Locale {
    request
        .get_text(RequestField::Locale)
        .map(Locale::new)
        .unwrap_or_default()
}

fn audit_subject(request: &Request) -> String {
    request
        .auth_token_value(TOKEN_UID)
        .unwrap_or_default()
        .to_string()
}

impl Profile {
    /// Build the profile resolving every component through the registry.
    ///
    /// A component that cannot be constructed or configured is skipped and
    /// recorded in [`Profile::skipped_policies`]. For a policy either half
    /// failing skips the whole default/constraint pair. With
    /// `skip_invalid_policies` disabled the build fails instead.
    pub fn build(
        config: &ProfileConfig,
        plugin_manager: &PluginManager,
        options: &ProfileSection,
    ) -> Result<Self, ProfileError> {
        let mut skipped = Vec::new();
        let mut record = |skip: SkippedPolicy| -> Result<(), ProfileError> {
            if !options.skip_invalid_policies {
                return Err(ProfileError::PolicyLoad {
                    profile: config.id.clone(),
                    component: skip.policy_id.clone(),
                    reason: skip.reason,
                });
            }
            warn!("profile {}: skipping policy {}", config.id, skip);
            skipped.push(skip);
            Ok(())
        };

        let mut inputs = Vec::new();
        for input in &config.inputs {
            match build_component(plugin_manager, PolicyFamily::Input, input, PolicyKind::into_input)
            {
                Ok(policy) => inputs.push(ProfileInput {
                    id: input.id.clone(),
                    class_id: input.class_id.clone(),
                    policy,
                }),
                Err(reason) => record(SkippedPolicy {
                    family: PolicyFamily::Input,
                    policy_set: None,
                    policy_id: input.id.clone(),
                    class_id: input.class_id.clone(),
                    reason,
                })?,
            }
        }

        let mut outputs = Vec::new();
        for output in &config.outputs {
            match build_component(
                plugin_manager,
                PolicyFamily::Output,
                output,
                PolicyKind::into_output,
            ) {
                Ok(policy) => outputs.push(ProfileOutput {
                    id: output.id.clone(),
                    class_id: output.class_id.clone(),
                    policy,
                }),
                Err(reason) => record(SkippedPolicy {
                    family: PolicyFamily::Output,
                    policy_set: None,
                    policy_id: output.id.clone(),
                    class_id: output.class_id.clone(),
                    reason,
                })?,
            }
        }

        let mut policy_sets = Vec::new();
        for set in &config.policy_sets {
            let mut policies = Vec::new();
            for policy in &set.policies {
                let default = build_component(
                    plugin_manager,
                    PolicyFamily::Default,
                    &policy.default,
                    PolicyKind::into_default,
                );
                let constraint = build_component(
                    plugin_manager,
                    PolicyFamily::Constraint,
                    &policy.constraint,
                    PolicyKind::into_constraint,
                );
                match (default, constraint) {
                    (Ok(default), Ok(constraint)) => policies.push(ProfilePolicy {
                        id: policy.id.clone(),
                        default_class: policy.default.class_id.clone(),
                        default,
                        constraint_class: policy.constraint.class_id.clone(),
                        constraint,
                    }),
                    (Err(reason), _) => record(SkippedPolicy {
                        family: PolicyFamily::Default,
                        policy_set: Some(set.id.clone()),
                        policy_id: policy.id.clone(),
                        class_id: policy.default.class_id.clone(),
                        reason,
                    })?,
                    (_, Err(reason)) => record(SkippedPolicy {
                        family: PolicyFamily::Constraint,
                        policy_set: Some(set.id.clone()),
                        policy_id: policy.id.clone(),
                        class_id: policy.constraint.class_id.clone(),
                        reason,
                    })?,
                }
            }
            policy_sets.push(PolicySet {
                id: set.id.clone(),
                match_rule: set.match_rule.clone(),
                policies,
            });
        }

        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            visible: config.visible,
            enabled: config.enabled,
            enabled_by: config.enabled_by.clone(),
            renewal: config.renewal,
            auth_instance_id: config.auth_instance_id.clone(),
            inputs,
            outputs,
            policy_sets,
            skipped,
            strict_populate: options.strict_populate,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enabled_by(&self) -> Option<&str> {
        self.enabled_by.as_deref()
    }

    pub fn is_renewal(&self) -> bool {
        self.renewal
    }

    /// Authenticator instance required by the profile.
    pub fn auth_instance_id(&self) -> Option<&str> {
        self.auth_instance_id.as_deref()
    }

    pub fn inputs(&self) -> &[ProfileInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ProfileOutput] {
        &self.outputs
    }

    pub fn policy_sets(&self) -> &[PolicySet] {
        &self.policy_sets
    }

    pub fn policy_set(&self, id: &str) -> Option<&PolicySet> {
        self.policy_sets.iter().find(|set| set.id == id)
    }

    /// Components skipped while loading.
    pub fn skipped_policies(&self) -> &[SkippedPolicy] {
        &self.skipped
    }

    /// Fail for a disabled profile.
    pub fn ensure_enabled(&self) -> Result<(), ProfileError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProfileError::Disabled(self.id.clone()))
        }
    }

    /// Create the requests for the submitted context. A CRMF submission may
    /// produce several requests; without a certificate request in the context
    /// one empty request is created. The `subject` is the authenticated
    /// user recorded in the audit events.
    #[tracing::instrument(level = "debug", skip(self, state, context), fields(profile = %self.id))]
    pub async fn create_requests(
        &self,
        state: &ServiceState,
        context: &InputContext,
        locale: &Locale,
        subject: Option<&str>,
    ) -> Result<Vec<Request>, ProfileError> {
        let submission = match parse_submission(locale, context) {
            Ok(submission) => submission,
            Err(err) => {
                state
                    .provider
                    .get_audit_provider()
                    .emit(
                        AuditEvent::builder(AuditEventType::ProfileCertRequest)
                            .subject(subject.unwrap_or_default())
                            .failure()
                            .attr("ProfileID", &self.id)
                            .attr("FailureReason", err.to_string())
                            .build(),
                    )
                    .await;
                return Err(ProfileError::CreationFailed(err.to_string()));
            }
        };

        let count = submission.as_ref().map_or(1, |sub| sub.requests.len());
        let mut requests = Vec::with_capacity(count);
        for idx in 0..count {
            let mut request = state
                .provider
                .get_request_provider()
                .create_request(&self.id)
                .await?;
            request.set(RequestField::RequestIndex, idx as i64);
            request.set(RequestField::Locale, locale.to_string());
            if let Some(sub) = &submission {
                if let Some(descriptor) = sub.requests.get(idx) {
                    store_descriptor(&mut request, &sub.request_type, descriptor)
                        .map_err(|err| ProfileError::CreationFailed(err.to_string()))?;
                }
            }
            state
                .provider
                .get_audit_provider()
                .emit(
                    AuditEvent::builder(AuditEventType::ProfileCertRequest)
                        .subject(subject.unwrap_or_default())
                        .success()
                        .attr("ReqID", request.id().to_string())
                        .attr("ProfileID", &self.id)
                        .attr_opt("CertRequestType", request.get_text(RequestField::RequestType))
                        .build(),
                )
                .await;
            requests.push(request);
        }
        debug!("created {} request(s)", requests.len());
        Ok(requests)
    }

    /// Run the input policies in declared order.
    #[tracing::instrument(level = "debug", skip(self, state, context, request), fields(profile = %self.id, request = %request.id()))]
    pub async fn populate_input(
        &self,
        state: &ServiceState,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), ProfileError> {
        let locale = request_locale(request);
        let result = self
            .inputs
            .iter()
            .try_for_each(|input| input.policy.populate(&locale, context, request));
        let event = AuditEvent::builder(AuditEventType::ProfileInput)
            .subject(audit_subject(request))
            .attr("ReqID", request.id().to_string())
            .attr("ProfileID", &self.id);
        match result {
            Ok(()) => {
                state
                    .provider
                    .get_audit_provider()
                    .emit(event.success().build())
                    .await;
                Ok(())
            }
            Err(failure) => {
                state
                    .provider
                    .get_audit_provider()
                    .emit(
                        event
                            .failure()
                            .attr("Field", &failure.field)
                            .attr("FailureReason", failure.error.to_string())
                            .build(),
                    )
                    .await;
                Err(ProfileError::InvalidInput {
                    field: failure.field,
                    reason: failure.error.to_string(),
                })
            }
        }
    }

    /// Select the policy set of the request.
    ///
    /// The first set whose match rule accepts the request wins; a set without
    /// a rule accepts every request. The selection is stored on the request
    /// and later calls return the stored id without re-evaluating the rules.
    pub fn get_policy_set_id(&self, request: &mut Request) -> Result<String, ProfileError> {
        if let Some(id) = request.policy_set_id() {
            return self
                .policy_set(id)
                .map(|set| set.id.clone())
                .ok_or_else(|| ProfileError::UnknownPolicySet(id.to_string()));
        }
        let set = self
            .policy_sets
            .iter()
            .find(|set| set.matches(request))
            .ok_or_else(|| ProfileError::NoPolicySet(self.id.clone()))?;
        request.set(RequestField::PolicySetId, set.id.as_str());
        debug!("request {} uses policy set {}", request.id(), set.id);
        Ok(set.id.clone())
    }

    fn selected_set(&self, request: &mut Request) -> Result<&PolicySet, ProfileError> {
        let id = self.get_policy_set_id(request)?;
        self.policy_set(&id)
            .ok_or(ProfileError::UnknownPolicySet(id))
    }

    /// Run the default policies of the selected set in declared order.
    ///
    /// In the lenient mode a failing default is logged and the remaining
    /// defaults still run; the failures are returned, stored on the request
    /// and reported by a FAILURE audit event. In the strict mode the first
    /// failure aborts the stage.
    #[tracing::instrument(level = "debug", skip(self, state, request), fields(profile = %self.id, request = %request.id()))]
    pub async fn populate(
        &self,
        state: &ServiceState,
        request: &mut Request,
    ) -> Result<Vec<PopulateFailure>, ProfileError> {
        let set = self.selected_set(request)?;
        let locale = request_locale(request);
        let mut failures = Vec::new();
        for policy in &set.policies {
            if let Err(err) = policy.default.populate(&locale, request) {
                warn!(
                    "default {} ({}) of profile {} failed: {}",
                    policy.id, policy.default_class, self.id, err
                );
                failures.push(PopulateFailure {
                    policy_id: policy.id.clone(),
                    reason: err.to_string(),
                });
                if self.strict_populate {
                    break;
                }
            }
        }

        let event = AuditEvent::builder(AuditEventType::ProfilePopulate)
            .subject(audit_subject(request))
            .attr("ReqID", request.id().to_string())
            .attr("ProfileID", &self.id)
            .attr("PolicySetID", &set.id);
        if failures.is_empty() {
            request.remove(RequestField::PopulateErrors);
            state
                .provider
                .get_audit_provider()
                .emit(event.success().build())
                .await;
            return Ok(failures);
        }

        let rendered: Vec<String> = failures.iter().map(ToString::to_string).collect();
        request.set(RequestField::PopulateErrors, rendered.clone());
        state
            .provider
            .get_audit_provider()
            .emit(
                event
                    .failure()
                    .attr("PopulateErrors", rendered.join("; "))
                    .build(),
            )
            .await;
        if self.strict_populate {
            let failure = failures.remove(0);
            return Err(ProfileError::PopulateFailed {
                policy: failure.policy_id,
                reason: failure.reason,
            });
        }
        Ok(failures)
    }

    /// Run the constraint policies of the selected set in declared order
    /// stopping at the first rejection or deferral.
    #[tracing::instrument(level = "debug", skip(self, state, request), fields(profile = %self.id, request = %request.id()))]
    pub async fn validate(
        &self,
        state: &ServiceState,
        request: &mut Request,
    ) -> Result<ValidationOutcome, ProfileError> {
        let set = self.selected_set(request)?;
        let locale = request_locale(request);
        let mut outcome = ValidationOutcome::Passed;
        for policy in &set.policies {
            outcome = policy.constraint.validate(&locale, request);
            if !outcome.is_passed() {
                debug!(
                    "constraint {} ({}) stopped validation: {:?}",
                    policy.id, policy.constraint_class, outcome
                );
                break;
            }
        }

        let event = AuditEvent::builder(AuditEventType::ProfileValidate)
            .subject(audit_subject(request))
            .attr("ReqID", request.id().to_string())
            .attr("ProfileID", &self.id)
            .attr("PolicySetID", &set.id);
        let event = match &outcome {
            ValidationOutcome::Passed => event.success(),
            ValidationOutcome::Deferred(reason) => event
                .success()
                .attr("Info", "deferred")
                .attr("Reason", reason),
            ValidationOutcome::Rejected(reason) => event.failure().attr("FailureReason", reason),
        };
        state
            .provider
            .get_audit_provider()
            .emit(event.build())
            .await;
        Ok(outcome)
    }

    /// Issue the certificate and complete the request.
    #[tracing::instrument(level = "debug", skip(self, state, request), fields(profile = %self.id, request = %request.id()))]
    pub async fn execute(
        &self,
        state: &ServiceState,
        request: &mut Request,
    ) -> Result<IssuedCertificate, ProfileError> {
        let issued = match CertificateTemplate::from_request(request) {
            Ok(template) => state
                .provider
                .get_issuer_provider()
                .issue(&template)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        let event = AuditEvent::builder(AuditEventType::CertRequestProcessed)
            .subject(audit_subject(request))
            .attr("ReqID", request.id().to_string())
            .attr("ProfileID", &self.id);
        let cert = match issued {
            Ok(cert) => cert,
            Err(reason) => {
                state
                    .provider
                    .get_audit_provider()
                    .emit(event.failure().attr("FailureReason", &reason).build())
                    .await;
                return Err(ProfileError::ExecutionFailed(reason));
            }
        };
        request.set(RequestField::CertSerial, cert.serial_hex());
        request.set(RequestField::Certificate, cert.encoded.clone());
        request.set(RequestField::CertFingerprint, cert.fingerprint.clone());
        request.remove(RequestField::Reason);
        request.set_status(RequestStatus::Complete)?;
        state
            .provider
            .get_audit_provider()
            .emit(
                event
                    .success()
                    .attr("CertSerialNum", cert.serial_hex())
                    .build(),
            )
            .await;
        Ok(cert)
    }

    /// Copy the authentication token into the request and run the pipeline.
    pub async fn submit(
        &self,
        state: &ServiceState,
        token: Option<&AuthToken>,
        request: &mut Request,
    ) -> Result<SubmitOutcome, ProfileError> {
        if let Some(token) = token {
            for (name, values) in token.iter() {
                request.set_ext(format!("{AUTH_TOKEN_PREFIX}{name}"), values.join(","));
            }
        }
        self.process(state, request).await
    }

    /// Run populate, validate and, when all constraints pass, execute.
    ///
    /// A rejection moves the request to `rejected`, a deferral to `pending`.
    /// Resuming a pending request calls this again; the cached policy set is
    /// kept.
    pub async fn process(
        &self,
        state: &ServiceState,
        request: &mut Request,
    ) -> Result<SubmitOutcome, ProfileError> {
        self.populate(state, request).await?;
        match self.validate(state, request).await? {
            ValidationOutcome::Passed => {
                let cert = self.execute(state, request).await?;
                Ok(SubmitOutcome::Completed(cert))
            }
            ValidationOutcome::Rejected(reason) => {
                request.set(RequestField::Reason, reason.as_str());
                request.set_status(RequestStatus::Rejected)?;
                Ok(SubmitOutcome::Rejected(reason))
            }
            ValidationOutcome::Deferred(reason) => {
                request.set(RequestField::Reason, reason.as_str());
                request.set_status(RequestStatus::Pending)?;
                Ok(SubmitOutcome::Deferred(reason))
            }
        }
    }

    /// Render the outputs in declared order.
    pub fn render_outputs(&self, locale: &Locale, request: &Request) -> Vec<OutputValue> {
        self.outputs
            .iter()
            .flat_map(|output| output.policy.render(locale, request))
            .collect()
    }

    /// Request values managed by the defaults of the selected policy set.
    pub fn request_values(&self, locale: &Locale, request: &Request) -> Vec<RequestValue> {
        let Some(set) = request.policy_set_id().and_then(|id| self.policy_set(id)) else {
            return Vec::new();
        };
        set.policies
            .iter()
            .flat_map(|policy| {
                policy.default.value_specs().iter().map(|spec| RequestValue {
                    policy_id: policy.id.clone(),
                    name: spec.name.to_string(),
                    descriptor: spec.descriptor(locale),
                    value: policy.default.get_value(spec.name, request),
                })
            })
            .collect()
    }

    /// Overwrite a request value through the owning default policy.
    pub fn set_request_value(
        &self,
        locale: &Locale,
        request: &mut Request,
        policy_id: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ProfileError> {
        let set = self.selected_set(request)?;
        let policy = set
            .policies
            .iter()
            .find(|policy| policy.id == policy_id)
            .ok_or_else(|| ProfileError::InvalidInput {
                field: format!("{policy_id}.{name}"),
                reason: format!("unknown policy {policy_id}"),
            })?;
        policy
            .default
            .set_value(locale, name, request, value)
            .map_err(|err| ProfileError::InvalidInput {
                field: format!("{policy_id}.{name}"),
                reason: err.to_string(),
            })
    }

    /// Localized description of the profile.
    pub fn describe(&self, locale: &Locale) -> ProfileDescription {
        fn component(
            id: &str,
            class_id: &str,
            policy: &dyn PolicyComponent,
            locale: &Locale,
            values: Vec<(String, Descriptor)>,
        ) -> ComponentDescription {
            ComponentDescription {
                id: id.to_string(),
                class_id: class_id.to_string(),
                name: policy.name(locale),
                text: policy.text(locale),
                config: policy
                    .config_specs()
                    .iter()
                    .map(|spec| {
                        (
                            spec.name.to_string(),
                            spec.descriptor(locale),
                            policy.get_config(spec.name),
                        )
                    })
                    .collect(),
                values,
            }
        }
        fn specs(specs: &[ValueSpec], locale: &Locale) -> Vec<(String, Descriptor)> {
            specs
                .iter()
                .map(|spec| (spec.name.to_string(), spec.descriptor(locale)))
                .collect()
        }

        ProfileDescription {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            visible: self.visible,
            renewal: self.renewal,
            auth_instance_id: self.auth_instance_id.clone(),
            inputs: self
                .inputs
                .iter()
                .map(|input| {
                    let values = input
                        .policy
                        .value_names()
                        .into_iter()
                        .filter_map(|name| {
                            input
                                .policy
                                .value_descriptor(locale, &name)
                                .map(|desc| (name, desc))
                        })
                        .collect();
                    component(
                        &input.id,
                        &input.class_id,
                        input.policy.as_ref(),
                        locale,
                        values,
                    )
                })
                .collect(),
            policy_sets: self
                .policy_sets
                .iter()
                .map(|set| PolicySetDescription {
                    id: set.id.clone(),
                    match_rule: set
                        .match_rule
                        .as_ref()
                        .map(|rule| format!("{}:{}", rule.field, rule.value)),
                    policies: set
                        .policies
                        .iter()
                        .map(|policy| PolicyDescription {
                            id: policy.id.clone(),
                            default: component(
                                &policy.id,
                                &policy.default_class,
                                policy.default.as_ref(),
                                locale,
                                specs(policy.default.value_specs(), locale),
                            ),
                            constraint: component(
                                &policy.id,
                                &policy.constraint_class,
                                policy.constraint.as_ref(),
                                locale,
                                Vec::new(),
                            ),
                        })
                        .collect(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|output| {
                    component(
                        &output.id,
                        &output.class_id,
                        output.policy.as_ref(),
                        locale,
                        specs(output.policy.value_specs(), locale),
                    )
                })
                .collect(),
            skipped: self.skipped.clone(),
        }
    }
}
