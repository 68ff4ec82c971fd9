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
//! # Enrollment profiles
//!
//! Profiles are loaded from the `*.cfg` files of the configured directory.
//! Each profile binds ordered input, default, constraint and output policies
//! resolved by class id through the [`PluginManager`]. Loaded profiles are
//! read only and shared by all pipeline runs.
//!
//! Policies that cannot be loaded weaken the profile silently unless
//! reported: every skipped policy is logged at the warning level, recorded on
//! the profile and audited with a `PROFILE_POLICY_SKIPPED` event. Setting
//! `[profile] skip_invalid_policies = false` turns a skip into a load error.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod pipeline;
pub mod policies;
pub mod policy;
pub mod types;

use crate::audit::{AuditApi, AuditEvent, AuditEventType, SUBJECT_SYSTEM};
use crate::ca::ServiceState;
use crate::config::{Config, ProfileSection};
use crate::plugin_manager::PluginManager;

pub use config::ProfileConfig;
pub use error::{PolicyError, ProfileError};
pub use pipeline::Profile;
pub use policy::{InputContext, ValidationOutcome};
pub use types::*;

#[async_trait]
pub trait ProfileApi: Send + Sync + Clone {
    /// Load every `*.cfg` file of the profile directory. Returns the ids of
    /// the loaded profiles.
    async fn load_dir(&self, state: &ServiceState) -> Result<Vec<String>, ProfileError>;

    /// Build and register the profile replacing an earlier one with the same
    /// id.
    async fn load_profile(
        &self,
        state: &ServiceState,
        config: &ProfileConfig,
    ) -> Result<Arc<Profile>, ProfileError>;

    async fn get_profile(&self, id: &str) -> Result<Arc<Profile>, ProfileError>;

    async fn list_profiles(&self, visible_only: bool) -> Vec<Arc<Profile>>;
}

/// Profile provider.
#[derive(Clone, Debug)]
pub struct ProfileProvider {
    profiles: Arc<RwLock<BTreeMap<String, Arc<Profile>>>>,
    plugin_manager: Arc<PluginManager>,
    directory: PathBuf,
    options: ProfileSection,
}

impl ProfileProvider {
    pub fn new(config: &Config, plugin_manager: &PluginManager) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(BTreeMap::new())),
            plugin_manager: Arc::new(plugin_manager.clone()),
            directory: config.profile.directory.clone(),
            options: config.profile.clone(),
        }
    }
}

#[async_trait]
impl ProfileApi for ProfileProvider {
    #[tracing::instrument(level = "info", skip(self, state), fields(directory = %self.directory.display()))]
    async fn load_dir(&self, state: &ServiceState) -> Result<Vec<String>, ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: self.directory.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.directory).await.map_err(io_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "cfg") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut loaded = Vec::with_capacity(paths.len());
        for path in paths {
            let config = ProfileConfig::load(&path).await?;
            let profile = self.load_profile(state, &config).await?;
            loaded.push(profile.id().to_string());
        }
        info!("loaded {} profile(s)", loaded.len());
        Ok(loaded)
    }

    #[tracing::instrument(level = "debug", skip(self, state, config), fields(profile = %config.id))]
    async fn load_profile(
        &self,
        state: &ServiceState,
        config: &ProfileConfig,
    ) -> Result<Arc<Profile>, ProfileError> {
        let profile = Arc::new(Profile::build(config, &self.plugin_manager, &self.options)?);
        for skipped in profile.skipped_policies() {
            state
                .provider
                .get_audit_provider()
                .emit(
                    AuditEvent::builder(AuditEventType::ProfilePolicySkipped)
                        .subject(SUBJECT_SYSTEM)
                        .failure()
                        .attr("ProfileID", profile.id())
                        .attr_opt("PolicySetID", skipped.policy_set.as_deref())
                        .attr("PolicyID", &skipped.policy_id)
                        .attr("ClassID", &skipped.class_id)
                        .attr("FailureReason", &skipped.reason)
                        .build(),
                )
                .await;
        }
        if !profile.skipped_policies().is_empty() {
            warn!(
                "profile {} loaded with {} skipped policies",
                profile.id(),
                profile.skipped_policies().len()
            );
        }
        self.profiles
            .write()
            .await
            .insert(profile.id().to_string(), profile.clone());
        Ok(profile)
    }

    async fn get_profile(&self, id: &str) -> Result<Arc<Profile>, ProfileError> {
        self.profiles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))
    }

    async fn list_profiles(&self, visible_only: bool) -> Vec<Arc<Profile>> {
        self.profiles
            .read()
            .await
            .values()
            .filter(|profile| !visible_only || profile.is_visible())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::audit::{AuditOutcome, EMPTY_VALUE};
    use crate::auth::types::AuthToken;
    use crate::common::Locale;
    use crate::profile::policy::*;
    use crate::request::{RequestApi, RequestField, RequestStatus};
    use crate::tests::TestEnv;

    /// Writes `value`, or the value of `copyFrom`, into `field`.
    #[derive(Debug, Default)]
    struct SetDefault {
        field: String,
        value: String,
        copy_from: Option<String>,
    }

    impl PolicyComponent for SetDefault {
        fn name_key(&self) -> &'static str {
            "test"
        }

        fn text_key(&self) -> &'static str {
            "test"
        }

        fn config_specs(&self) -> &'static [ValueSpec] {
            const SPECS: &[ValueSpec] = &[
                ValueSpec::new("field", Syntax::String, "f").required(),
                ValueSpec::new("value", Syntax::String, "v"),
                ValueSpec::new("copyFrom", Syntax::String, "c"),
            ];
            SPECS
        }

        fn set_config(&mut self, _: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
            match name {
                "field" => self.field = value.into(),
                "value" => self.value = value.into(),
                _ => self.copy_from = Some(value.into()),
            }
            Ok(())
        }
    }

    impl DefaultPolicy for SetDefault {
        fn populate(
            &self,
            _: &Locale,
            request: &mut crate::request::Request,
        ) -> Result<(), PolicyError> {
            let value = match &self.copy_from {
                Some(source) => request
                    .ext_text(source)
                    .map(str::to_string)
                    .ok_or_else(|| PolicyError::MissingData(format!("{source} unset")))?,
                None => self.value.clone(),
            };
            request.set_ext(self.field.as_str(), value);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct CountingConstraint {
        calls: Arc<AtomicUsize>,
        outcome: ValidationOutcome,
    }

    impl PolicyComponent for CountingConstraint {
        fn name_key(&self) -> &'static str {
            "test"
        }

        fn text_key(&self) -> &'static str {
            "test"
        }
    }

    impl ConstraintPolicy for CountingConstraint {
        fn validate(&self, _: &Locale, _: &crate::request::Request) -> ValidationOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn plugins() -> PluginManager {
        let mut plugins = PluginManager::default().with_builtin_policies();
        plugins
            .register_default_policy("setDefaultImpl", || {
                Box::<SetDefault>::default() as Box<dyn DefaultPolicy>
            })
            .unwrap();
        plugins
    }

    async fn env_with(config: crate::config::Config, plugins: PluginManager) -> TestEnv {
        TestEnv::with_plugins(config, plugins).await
    }

    async fn load(env: &TestEnv, cfg: &str) -> Arc<Profile> {
        env.state
            .provider
            .get_profile_provider()
            .load_profile(&env.state, &ProfileConfig::parse(cfg, Some("test")).unwrap())
            .await
            .unwrap()
    }

    const ORDERED: &str = r#"
enable=true
policyset.list=set
policyset.set.list=1,2,3,4
policyset.set.1.default.class_id=setDefaultImpl
policyset.set.1.default.params.field=shared
policyset.set.1.default.params.value=d1
policyset.set.1.constraint.class_id=noConstraintImpl
policyset.set.2.default.class_id=setDefaultImpl
policyset.set.2.default.params.field=seen
policyset.set.2.default.params.copyFrom=shared
policyset.set.2.constraint.class_id=noConstraintImpl
policyset.set.3.default.class_id=setDefaultImpl
policyset.set.3.default.params.field=shared
policyset.set.3.default.params.value=d2
policyset.set.3.constraint.class_id=noConstraintImpl
policyset.set.4.default.class_id=setDefaultImpl
policyset.set.4.default.params.field=shared
policyset.set.4.default.params.value=d3
policyset.set.4.constraint.class_id=noConstraintImpl
"#;

    #[tokio::test]
    async fn test_populate_declared_order() {
        let env = env_with(Default::default(), plugins()).await;
        let profile = load(&env, ORDERED).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        let failures = profile.populate(&env.state, &mut request).await.unwrap();
        assert!(failures.is_empty());
        assert_eq!(Some("d1"), request.ext_text("seen"));
        assert_eq!(Some("d3"), request.ext_text("shared"));
        let events = env.audit.events_of(AuditEventType::ProfilePopulate).await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Success, events[0].outcome());
        assert_eq!(Some("set"), events[0].attribute("PolicySetID"));
    }

    const FAILING: &str = r#"
enable=true
policyset.list=set
policyset.set.list=1,2
policyset.set.1.default.class_id=setDefaultImpl
policyset.set.1.default.params.field=seen
policyset.set.1.default.params.copyFrom=missing
policyset.set.1.constraint.class_id=noConstraintImpl
policyset.set.2.default.class_id=setDefaultImpl
policyset.set.2.default.params.field=after
policyset.set.2.default.params.value=ran
policyset.set.2.constraint.class_id=noConstraintImpl
"#;

    #[tokio::test]
    async fn test_populate_lenient() {
        let env = env_with(Default::default(), plugins()).await;
        let profile = load(&env, FAILING).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        let failures = profile.populate(&env.state, &mut request).await.unwrap();
        assert_eq!(1, failures.len());
        assert_eq!("1", failures[0].policy_id);
        // Sibling defaults still run.
        assert_eq!(Some("ran"), request.ext_text("after"));
        assert_eq!(
            ["1: missing unset"],
            request.get_list(RequestField::PopulateErrors)
        );
        let events = env.audit.events_of(AuditEventType::ProfilePopulate).await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Failure, events[0].outcome());
        assert_eq!(Some("1: missing unset"), events[0].attribute("PopulateErrors"));
    }

    #[tokio::test]
    async fn test_populate_strict() {
        let mut config = crate::config::Config::default();
        config.profile.strict_populate = true;
        let env = env_with(config, plugins()).await;
        let profile = load(&env, FAILING).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        let res = profile.populate(&env.state, &mut request).await;
        assert!(matches!(
            res,
            Err(ProfileError::PopulateFailed { ref policy, .. }) if policy == "1"
        ));
        assert_eq!(None, request.ext_text("after"));
        let events = env.audit.events_of(AuditEventType::ProfilePopulate).await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Failure, events[0].outcome());
    }

    #[tokio::test]
    async fn test_validate_short_circuit() {
        let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::default()).collect();
        let outcomes = [
            ValidationOutcome::Passed,
            ValidationOutcome::Rejected("bad keysize".into()),
            ValidationOutcome::Passed,
        ];
        let mut plugins = plugins();
        for (idx, (calls, outcome)) in counters.iter().zip(outcomes).enumerate() {
            let calls = calls.clone();
            plugins
                .register_constraint_policy(format!("c{}Impl", idx + 1), move || {
                    Box::new(CountingConstraint {
                        calls: calls.clone(),
                        outcome: outcome.clone(),
                    }) as Box<dyn ConstraintPolicy>
                })
                .unwrap();
        }
        let env = env_with(Default::default(), plugins).await;
        let mut cfg = String::from("enable=true\npolicyset.list=set\npolicyset.set.list=1,2,3\n");
        for idx in 1..=3 {
            cfg.push_str(&format!(
                "policyset.set.{idx}.default.class_id=noDefaultImpl\npolicyset.set.{idx}.constraint.class_id=c{idx}Impl\n"
            ));
        }
        let profile = load(&env, &cfg).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        assert_eq!(
            ValidationOutcome::Rejected("bad keysize".into()),
            profile.validate(&env.state, &mut request).await.unwrap()
        );
        assert_eq!(1, counters[0].load(Ordering::SeqCst));
        assert_eq!(1, counters[1].load(Ordering::SeqCst));
        assert_eq!(0, counters[2].load(Ordering::SeqCst));
        let events = env.audit.events_of(AuditEventType::ProfileValidate).await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Failure, events[0].outcome());
        assert_eq!(Some("bad keysize"), events[0].attribute("FailureReason"));

        let outcome = profile.process(&env.state, &mut request).await.unwrap();
        assert_eq!(SubmitOutcome::Rejected("bad keysize".into()), outcome);
        assert_eq!(RequestStatus::Rejected, request.status());
        assert_eq!("bad keysize", request.reason());
    }

    const SELECTION: &str = r#"
enable=true
policyset.list=ecSet,rsaSet
policyset.ecSet.match=req_key_type:EC
policyset.ecSet.list=1
policyset.ecSet.1.default.class_id=noDefaultImpl
policyset.ecSet.1.constraint.class_id=noConstraintImpl
policyset.rsaSet.list=1
policyset.rsaSet.1.default.class_id=noDefaultImpl
policyset.rsaSet.1.constraint.class_id=noConstraintImpl
"#;

    #[tokio::test]
    async fn test_policy_set_selection_cached() {
        let env = TestEnv::new().await;
        let profile = load(&env, SELECTION).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        request.set(RequestField::RequestKeyType, "EC");
        assert_eq!("ecSet", profile.get_policy_set_id(&mut request).unwrap());
        assert_eq!("ecSet", profile.get_policy_set_id(&mut request).unwrap());
        // A later write would select another set if the rules ran again.
        request.set(RequestField::RequestKeyType, "RSA");
        assert_eq!("ecSet", profile.get_policy_set_id(&mut request).unwrap());

        let mut other = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        other.set(RequestField::RequestKeyType, "RSA");
        assert_eq!("rsaSet", profile.get_policy_set_id(&mut other).unwrap());
        other.set(RequestField::PolicySetId, "gone");
        assert!(matches!(
            profile.get_policy_set_id(&mut other),
            Err(ProfileError::UnknownPolicySet(_))
        ));
    }

    const SERVER_CERT: &str = r#"
enable=true
auth.instance_id=UserDirEnrollment
input.list=i1,i2
input.i1.class_id=certReqInputImpl
input.i2.class_id=submitterInfoInputImpl
output.list=o1,o2
output.o1.class_id=submitStatusOutputImpl
output.o2.class_id=certOutputImpl
policyset.list=serverCertSet
policyset.serverCertSet.list=1,2,3,4,5
policyset.serverCertSet.1.default.class_id=userSubjectNameDefaultImpl
policyset.serverCertSet.1.constraint.class_id=subjectNameConstraintImpl
policyset.serverCertSet.1.constraint.params.pattern=CN=.+
policyset.serverCertSet.2.default.class_id=userKeyDefaultImpl
policyset.serverCertSet.2.constraint.class_id=keyConstraintImpl
policyset.serverCertSet.2.constraint.params.keyType=RSA
policyset.serverCertSet.2.constraint.params.keyParameters=2048,3072
policyset.serverCertSet.3.default.class_id=validityDefaultImpl
policyset.serverCertSet.3.default.params.range=90
policyset.serverCertSet.3.constraint.class_id=validityConstraintImpl
policyset.serverCertSet.4.default.class_id=signingAlgDefaultImpl
policyset.serverCertSet.4.constraint.class_id=signingAlgConstraintImpl
policyset.serverCertSet.5.default.class_id=noDefaultImpl
policyset.serverCertSet.5.constraint.class_id=proofOfPossessionConstraintImpl
"#;

    fn crmf_context(pop: bool) -> InputContext {
        let pop = if pop { r#","pop":"signature""# } else { "" };
        InputContext::from([
            ("cert_request_type".into(), "crmf".into()),
            (
                "cert_request".into(),
                format!(
                    r#"{{"requests":[{{"subject":"CN=www.example.com","key_type":"RSA","key_size":2048{pop}}}]}}"#
                ),
            ),
        ])
    }

    #[tokio::test]
    async fn test_deferral_resumption() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let ctx = crmf_context(false);
        let mut requests = profile
            .create_requests(&env.state, &ctx, &Locale::default(), None)
            .await
            .unwrap();
        assert_eq!(1, requests.len());
        let mut request = requests.remove(0);
        profile
            .populate_input(&env.state, &ctx, &mut request)
            .await
            .unwrap();
        let token = AuthToken::default().with("uid", "jdoe");
        let outcome = profile
            .submit(&env.state, Some(&token), &mut request)
            .await
            .unwrap();
        assert_eq!(
            SubmitOutcome::Deferred("Proof of possession is required".into()),
            outcome
        );
        assert_eq!(RequestStatus::Pending, request.status());
        assert!(
            env.audit
                .events_of(AuditEventType::CertRequestProcessed)
                .await
                .is_empty()
        );
        let validate = env.audit.events_of(AuditEventType::ProfileValidate).await;
        assert_eq!(Some("deferred"), validate[0].attribute("Info"));
        assert_eq!("jdoe", validate[0].subject_id());

        // Second round trip with the proof.
        let ctx = InputContext::from([("pop".to_string(), "signature".to_string())]);
        profile
            .populate_input(&env.state, &ctx, &mut request)
            .await
            .unwrap();
        let outcome = profile.process(&env.state, &mut request).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(RequestStatus::Complete, request.status());
        assert_eq!(Some("serverCertSet"), request.policy_set_id());
        assert_eq!(EMPTY_VALUE, request.reason());
        let processed = env
            .audit
            .events_of(AuditEventType::CertRequestProcessed)
            .await;
        assert_eq!(1, processed.len());
        assert_eq!(AuditOutcome::Success, processed[0].outcome());
        assert_eq!(
            request.get_text(RequestField::CertSerial),
            processed[0].attribute("CertSerialNum")
        );

        let rendered = profile.render_outputs(&Locale::default(), &request);
        assert_eq!("request_id", rendered[0].name);
        assert_eq!("complete", rendered[1].value);
        assert!(rendered.iter().any(|val| val.name == "cert_encoded"));
    }

    #[tokio::test]
    async fn test_create_requests_crmf_batch() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let ctx = InputContext::from([
            ("cert_request_type".into(), "crmf".into()),
            (
                "cert_request".into(),
                r#"{"requests":[{"key_type":"RSA","key_size":2048},{"key_type":"EC","key_size":256}]}"#.into(),
            ),
        ]);
        let requests = profile
            .create_requests(&env.state, &ctx, &Locale::new("de-DE"), None)
            .await
            .unwrap();
        assert_eq!(2, requests.len());
        assert_eq!(Some(1), requests[1].get_integer(RequestField::RequestIndex));
        assert_eq!(Some("de-DE"), requests[1].get_text(RequestField::Locale));
        assert_eq!(
            2,
            env.audit
                .events_of(AuditEventType::ProfileCertRequest)
                .await
                .len()
        );

        let bad = InputContext::from([("cert_request".into(), "garbage".into())]);
        assert!(matches!(
            profile
                .create_requests(&env.state, &bad, &Locale::default(), Some("jdoe"))
                .await,
            Err(ProfileError::CreationFailed(_))
        ));
        let events = env.audit.events_of(AuditEventType::ProfileCertRequest).await;
        assert_eq!(AuditOutcome::Failure, events[2].outcome());
        assert_eq!("jdoe", events[2].subject_id());
    }

    #[tokio::test]
    async fn test_populate_input_failure_audited() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        let res = profile
            .populate_input(&env.state, &InputContext::new(), &mut request)
            .await;
        assert!(matches!(
            res,
            Err(ProfileError::InvalidInput { ref field, .. }) if field == "cert_request"
        ));
        let events = env.audit.events_of(AuditEventType::ProfileInput).await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Failure, events[0].outcome());
        assert_eq!(Some("cert_request"), events[0].attribute("Field"));
        assert!(!events[0].is_signed());
    }

    #[tokio::test]
    async fn test_execute_failure_audited() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let mut request = env
            .state
            .provider
            .get_request_provider()
            .create_request("test")
            .await
            .unwrap();
        assert!(matches!(
            profile.execute(&env.state, &mut request).await,
            Err(ProfileError::ExecutionFailed(_))
        ));
        assert_eq!(RequestStatus::Begin, request.status());
        let events = env
            .audit
            .events_of(AuditEventType::CertRequestProcessed)
            .await;
        assert_eq!(1, events.len());
        assert_eq!(AuditOutcome::Failure, events[0].outcome());
    }

    #[tokio::test]
    async fn test_agent_edit_request_value() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let ctx = crmf_context(true);
        let mut request = profile
            .create_requests(&env.state, &ctx, &Locale::default(), None)
            .await
            .unwrap()
            .remove(0);
        profile
            .populate_input(&env.state, &ctx, &mut request)
            .await
            .unwrap();
        profile.populate(&env.state, &mut request).await.unwrap();
        let values = profile.request_values(&Locale::default(), &request);
        let subject = values
            .iter()
            .find(|val| val.policy_id == "1" && val.name == "name")
            .unwrap();
        assert_eq!(Some("CN=www.example.com".into()), subject.value);
        profile
            .set_request_value(&Locale::default(), &mut request, "1", "name", "CN=edited")
            .unwrap();
        assert_eq!(Some("CN=edited"), request.get_text(RequestField::CertSubject));
        assert!(
            profile
                .set_request_value(&Locale::default(), &mut request, "9", "name", "x")
                .is_err()
        );
    }

    const BROKEN: &str = r#"
enable=true
input.list=i1
input.i1.class_id=unknownInputImpl
policyset.list=set
policyset.set.list=1,2
policyset.set.1.default.class_id=noDefaultImpl
policyset.set.1.constraint.class_id=subjectNameConstraintImpl
policyset.set.2.default.class_id=noDefaultImpl
policyset.set.2.constraint.class_id=noConstraintImpl
"#;

    #[tokio::test]
    async fn test_skipped_policies_reported() {
        let env = TestEnv::new().await;
        let profile = load(&env, BROKEN).await;
        assert_eq!(2, profile.skipped_policies().len());
        let skipped = &profile.skipped_policies()[1];
        assert_eq!(Some("set".into()), skipped.policy_set);
        assert_eq!("subjectNameConstraintImpl", skipped.class_id);
        assert_eq!("missing required parameter pattern", skipped.reason);
        assert_eq!(1, profile.policy_set("set").unwrap().policies.len());
        assert!(profile.inputs().is_empty());

        let events = env
            .audit
            .events_of(AuditEventType::ProfilePolicySkipped)
            .await;
        assert_eq!(2, events.len());
        assert!(events.iter().all(|ev| ev.outcome() == AuditOutcome::Failure));
        assert_eq!(Some(EMPTY_VALUE), events[0].attribute("PolicySetID"));
        assert_eq!(Some("1"), events[1].attribute("PolicyID"));
    }

    #[tokio::test]
    async fn test_skipping_disabled() {
        let mut config = crate::config::Config::default();
        config.profile.skip_invalid_policies = false;
        let env = TestEnv::with_config(config).await;
        let res = env
            .state
            .provider
            .get_profile_provider()
            .load_profile(&env.state, &ProfileConfig::parse(BROKEN, Some("test")).unwrap())
            .await;
        assert!(matches!(res, Err(ProfileError::PolicyLoad { .. })));
        assert!(matches!(
            env.state.provider.get_profile_provider().get_profile("test").await,
            Err(ProfileError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("caServerCert.cfg"), SERVER_CERT)
            .await
            .unwrap();
        tokio::fs::write(
            dir.path().join("caHidden.cfg"),
            format!("visible=false\n{SELECTION}"),
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("README"), "ignored").await.unwrap();
        let mut config = crate::config::Config::default();
        config.profile.directory = dir.path().to_path_buf();
        let env = TestEnv::with_config(config).await;
        let provider = env.state.provider.get_profile_provider();
        assert_eq!(
            vec!["caHidden", "caServerCert"],
            provider.load_dir(&env.state).await.unwrap()
        );
        assert_eq!(2, provider.list_profiles(false).await.len());
        let visible = provider.list_profiles(true).await;
        assert_eq!(1, visible.len());
        assert_eq!("caServerCert", visible[0].id());
        assert_eq!(
            Some("UserDirEnrollment"),
            provider.get_profile("caServerCert").await.unwrap().auth_instance_id()
        );
    }

    #[tokio::test]
    async fn test_load_dir_missing() {
        let mut config = crate::config::Config::default();
        config.profile.directory = "/nonexistent/profiles".into();
        let env = TestEnv::with_config(config).await;
        assert!(matches!(
            env.state
                .provider
                .get_profile_provider()
                .load_dir(&env.state)
                .await,
            Err(ProfileError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_describe() {
        let env = TestEnv::new().await;
        let profile = load(&env, SERVER_CERT).await;
        let desc = profile.describe(&Locale::default());
        assert_eq!("test", desc.id);
        assert_eq!(
            vec!["cert_request_type", "cert_request", "pop"],
            desc.inputs[0]
                .values
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
        );
        let key = &desc.policy_sets[0].policies[1];
        assert_eq!("Key Constraint", key.constraint.name);
        assert_eq!(
            "This constraint accepts the key only if Key Type=RSA, Key Parameters=2048,3072",
            key.constraint.text
        );
        assert_eq!(
            Some("2048,3072".into()),
            key.constraint
                .config
                .iter()
                .find(|(name, _, _)| name == "keyParameters")
                .and_then(|(_, _, value)| value.clone())
        );
        assert_eq!(2, desc.outputs.len());
    }
}
