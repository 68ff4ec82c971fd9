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
//! # Enrollment
//!
//! Drives requests through their lifecycle: the end entity enrollment runs
//! the profile pipeline after authenticating with the profile authenticator,
//! a deferred request is resumed once the missing data arrives, and agents
//! approve, reject or cancel pending requests.
//!
//! A request is persisted after every operation. Only one operation may hold
//! a request at a time; a concurrent attempt fails with
//! [`EnrollmentError::Busy`].
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

pub mod error;
pub mod types;

use crate::audit::{AuditApi, AuditEvent, AuditEventType};
use crate::auth::{AuthCredentials, AuthToken, AuthenticationApi};
use crate::ca::ServiceState;
use crate::common::Locale;
use crate::config::Config;
use crate::profile::{InputContext, Profile, ProfileApi, SubmitOutcome};
use crate::request::{ExtValue, Request, RequestApi, RequestField, RequestId, RequestStatus};
use crate::usergroup::UserGroupApi;

pub use error::EnrollmentError;
pub use types::EnrollmentRecord;

#[async_trait]
pub trait EnrollmentApi: Send + Sync + Clone {
    /// Enroll through the profile. Returns one record per created request.
    async fn enroll(
        &self,
        state: &ServiceState,
        profile_id: &str,
        credentials: &AuthCredentials,
        context: &InputContext,
        locale: &Locale,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError>;

    /// Supply the missing data of the pending request and rerun the
    /// pipeline.
    async fn resume(
        &self,
        state: &ServiceState,
        id: RequestId,
        context: &InputContext,
    ) -> Result<EnrollmentRecord, EnrollmentError>;

    /// Record the agent approval and rerun the pipeline.
    async fn approve(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
    ) -> Result<EnrollmentRecord, EnrollmentError>;

    async fn reject(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
        reason: &str,
    ) -> Result<EnrollmentRecord, EnrollmentError>;

    async fn cancel(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
        reason: &str,
    ) -> Result<EnrollmentRecord, EnrollmentError>;

    async fn get_request(
        &self,
        state: &ServiceState,
        id: RequestId,
    ) -> Result<Request, EnrollmentError>;
}

/// Requests currently held by an operation.
#[derive(Clone, Debug, Default)]
struct InFlight(Arc<Mutex<BTreeSet<RequestId>>>);

/// Releases the request on drop.
struct Checkout {
    in_flight: InFlight,
    id: RequestId,
}

impl InFlight {
    fn checkout(&self, id: RequestId) -> Result<Checkout, EnrollmentError> {
        let mut held = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(id) {
            return Err(EnrollmentError::Busy(id));
        }
        Ok(Checkout {
            in_flight: self.clone(),
            id,
        })
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        self.in_flight
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Enrollment provider.
#[derive(Clone, Debug)]
pub struct EnrollmentProvider {
    agent_group: String,
    in_flight: InFlight,
}

impl EnrollmentProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            agent_group: config.agent.group.clone(),
            in_flight: InFlight::default(),
        }
    }

    async fn profile_of(
        &self,
        state: &ServiceState,
        request: &Request,
    ) -> Result<Arc<Profile>, EnrollmentError> {
        let profile_id = request
            .profile_id()
            .ok_or(EnrollmentError::NoProfile(request.id()))?;
        Ok(state
            .provider
            .get_profile_provider()
            .get_profile(profile_id)
            .await?)
    }

    /// Resolve the agent and check the agent group membership.
    async fn authorize_agent<'a>(
        &self,
        state: &ServiceState,
        agent: &'a AuthToken,
    ) -> Result<&'a str, EnrollmentError> {
        let uid = agent.uid().ok_or(EnrollmentError::AgentUnknown)?;
        if !state
            .provider
            .get_usergroup_provider()
            .is_member_of(uid, &self.agent_group)
            .await?
        {
            return Err(EnrollmentError::NotAuthorized { uid: uid.into() });
        }
        Ok(uid)
    }

    async fn pending_request(
        &self,
        state: &ServiceState,
        id: RequestId,
    ) -> Result<Request, EnrollmentError> {
        let request = state.provider.get_request_provider().get_request(id).await?;
        if request.status() != RequestStatus::Pending {
            return Err(EnrollmentError::InvalidStatus {
                id,
                status: request.status(),
            });
        }
        Ok(request)
    }

    /// Run the pipeline, persist the request and render the outputs.
    async fn run(
        &self,
        state: &ServiceState,
        profile: &Profile,
        token: Option<&AuthToken>,
        mut request: Request,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let outcome = profile.submit(state, token, &mut request).await;
        // A failed run leaves the request pending so that it can be retried.
        if let Err(err) = &outcome
            && !request.status().is_terminal()
        {
            request.set(RequestField::Reason, err.to_string());
            request.set_status(RequestStatus::Pending)?;
        }
        // The request is persisted even when the issuance failed.
        state
            .provider
            .get_request_provider()
            .save_request(&request)
            .await?;
        let certificate = match outcome? {
            SubmitOutcome::Completed(cert) => Some(cert),
            SubmitOutcome::Rejected(reason) | SubmitOutcome::Deferred(reason) => {
                debug!("request {} is {}: {}", request.id(), request.status(), reason);
                None
            }
        };
        Ok(record(profile, &request).with_certificate(certificate))
    }

    /// Move the request to the terminal status on behalf of the agent.
    async fn close(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
        reason: &str,
        status: RequestStatus,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let uid = self.authorize_agent(state, agent).await?;
        let _checkout = self.in_flight.checkout(id)?;
        let mut request = state.provider.get_request_provider().get_request(id).await?;
        request.set(RequestField::Reason, reason);
        request.set_status(status)?;
        state
            .provider
            .get_request_provider()
            .save_request(&request)
            .await?;
        state
            .provider
            .get_audit_provider()
            .emit(
                AuditEvent::builder(AuditEventType::CertRequestProcessed)
                    .subject(uid)
                    .failure()
                    .attr("ReqID", id.to_string())
                    .attr_opt("ProfileID", request.profile_id())
                    .attr("FailureReason", request.reason())
                    .build(),
            )
            .await;
        info!("request {} {} by {}", id, status, uid);
        let profile = self.profile_of(state, &request).await?;
        Ok(record(&profile, &request))
    }
}

fn record(profile: &Profile, request: &Request) -> EnrollmentRecord {
    let locale = request
        .get_text(RequestField::Locale)
        .map(Locale::new)
        .unwrap_or_default();
    EnrollmentRecord::new(request, profile.render_outputs(&locale, request))
}

#[async_trait]
impl EnrollmentApi for EnrollmentProvider {
    #[tracing::instrument(level = "info", skip(self, state, credentials, context, locale))]
    async fn enroll(
        &self,
        state: &ServiceState,
        profile_id: &str,
        credentials: &AuthCredentials,
        context: &InputContext,
        locale: &Locale,
    ) -> Result<Vec<EnrollmentRecord>, EnrollmentError> {
        let profile = state
            .provider
            .get_profile_provider()
            .get_profile(profile_id)
            .await?;
        profile.ensure_enabled()?;
        let token = match profile.auth_instance_id() {
            Some(instance_id) => Some(
                state
                    .provider
                    .get_auth_provider()
                    .authenticate(state, instance_id, credentials)
                    .await?,
            ),
            None => None,
        };

        let requests = profile
            .create_requests(state, context, locale, token.as_ref().and_then(AuthToken::uid))
            .await?;
        let mut records = Vec::with_capacity(requests.len());
        for mut request in requests {
            let _checkout = self.in_flight.checkout(request.id())?;
            if let Err(err) = profile.populate_input(state, context, &mut request).await {
                // Invalid input is terminal for the submission.
                request.set(RequestField::Reason, err.to_string());
                request.set_status(RequestStatus::Rejected)?;
                state
                    .provider
                    .get_request_provider()
                    .save_request(&request)
                    .await?;
                records.push(record(&profile, &request));
                continue;
            }
            records.push(
                self.run(state, &profile, token.as_ref(), request)
                    .await?,
            );
        }
        Ok(records)
    }

    #[tracing::instrument(level = "info", skip(self, state, context))]
    async fn resume(
        &self,
        state: &ServiceState,
        id: RequestId,
        context: &InputContext,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let _checkout = self.in_flight.checkout(id)?;
        let mut request = self.pending_request(state, id).await?;
        let profile = self.profile_of(state, &request).await?;
        let before: BTreeMap<String, ExtValue> = request
            .ext_iter()
            .map(|(key, val)| (key.to_string(), val.clone()))
            .collect();
        profile.populate_input(state, context, &mut request).await?;
        // Resumed input may only supply data that is still missing.
        if let Some((field, _)) = before
            .iter()
            .find(|(key, val)| request.ext(key.as_str()) != Some(*val))
        {
            return Err(EnrollmentError::InputConflict {
                id,
                field: field.clone(),
            });
        }
        self.run(state, &profile, None, request).await
    }

    #[tracing::instrument(level = "info", skip(self, state, agent))]
    async fn approve(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        let uid = self.authorize_agent(state, agent).await?;
        let _checkout = self.in_flight.checkout(id)?;
        let mut request = self.pending_request(state, id).await?;
        let profile = self.profile_of(state, &request).await?;
        let mut approvals = request.get_list(RequestField::AgentApprovals).to_vec();
        if !approvals.iter().any(|approved| approved == uid) {
            approvals.push(uid.to_string());
        }
        request.set(RequestField::AgentApprovals, approvals);
        request.set_status(RequestStatus::Approved)?;
        info!("request {} approved by {}", id, uid);
        self.run(state, &profile, None, request).await
    }

    async fn reject(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
        reason: &str,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.close(state, agent, id, reason, RequestStatus::Rejected)
            .await
    }

    async fn cancel(
        &self,
        state: &ServiceState,
        agent: &AuthToken,
        id: RequestId,
        reason: &str,
    ) -> Result<EnrollmentRecord, EnrollmentError> {
        self.close(state, agent, id, reason, RequestStatus::Canceled)
            .await
    }

    async fn get_request(
        &self,
        state: &ServiceState,
        id: RequestId,
    ) -> Result<Request, EnrollmentError> {
        Ok(state.provider.get_request_provider().get_request(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::audit::{AuditOutcome, EMPTY_VALUE};
    use crate::auth::AuthError;
    use crate::auth::pin::{PinHashType, encode_pin};
    use crate::directory::Entry;
    use crate::directory::backend::memory::PASSWORD_ATTRIBUTE;
    use crate::issuer::error::IssuerError;
    use crate::issuer::{IssuedCertificate, MockCertificateIssuer};
    use crate::plugin_manager::PluginManager;
    use crate::profile::{ProfileConfig, ProfileError};
    use crate::request::error::RequestError;
    use crate::tests::TestEnv;

    const PROFILE: &str = r#"
enable=true
auth.instance_id=UserDirEnrollment
input.list=i1,i2
input.i1.class_id=certReqInputImpl
input.i2.class_id=submitterInfoInputImpl
output.list=o1
output.o1.class_id=submitStatusOutputImpl
policyset.list=userCertSet
policyset.userCertSet.list=1,2,3,4
policyset.userCertSet.1.default.class_id=authTokenSubjectNameDefaultImpl
policyset.userCertSet.1.constraint.class_id=noConstraintImpl
policyset.userCertSet.2.default.class_id=userKeyDefaultImpl
policyset.userCertSet.2.constraint.class_id=keyConstraintImpl
policyset.userCertSet.3.default.class_id=validityDefaultImpl
policyset.userCertSet.3.constraint.class_id=proofOfPossessionConstraintImpl
policyset.userCertSet.4.default.class_id=signingAlgDefaultImpl
policyset.userCertSet.4.constraint.class_id=APPROVAL
"#;

    async fn env(agent_approval: bool, enabled: bool) -> TestEnv {
        env_with_plugins(
            agent_approval,
            enabled,
            PluginManager::default().with_builtin_policies(),
        )
        .await
    }

    async fn env_with_plugins(
        agent_approval: bool,
        enabled: bool,
        plugin_manager: PluginManager,
    ) -> TestEnv {
        let env = TestEnv::with_plugins(Config::default(), plugin_manager).await;
        let approval = if agent_approval {
            "agentApprovalConstraintImpl"
        } else {
            "noConstraintImpl"
        };
        let cfg = PROFILE
            .replace("APPROVAL", approval)
            .replace("enable=true", &format!("enable={enabled}"));
        env.state
            .provider
            .get_profile_provider()
            .load_profile(
                &env.state,
                &ProfileConfig::parse(&cfg, Some("caUserCert")).unwrap(),
            )
            .await
            .unwrap();
        env
    }

    fn credentials() -> AuthCredentials {
        AuthCredentials::new()
            .with("uid", "jdoe")
            .with("pwd", "secret")
    }

    fn context(pop: bool) -> InputContext {
        let mut ctx = InputContext::from([
            ("cert_request_type".to_string(), "crmf".to_string()),
            (
                "cert_request".to_string(),
                r#"{"requests":[{"key_type":"EC","key_size":256}]}"#.to_string(),
            ),
        ]);
        if pop {
            ctx.insert("pop".into(), "signature".into());
        }
        ctx
    }

    fn agent(uid: &str) -> AuthToken {
        AuthToken::new().with("uid", uid)
    }

    async fn enroll(env: &TestEnv, pop: bool) -> EnrollmentRecord {
        env.state
            .provider
            .get_enrollment_provider()
            .enroll(
                &env.state,
                "caUserCert",
                &credentials(),
                &context(pop),
                &Locale::default(),
            )
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    #[traced_test]
    async fn test_enroll_complete() {
        let env = env(false, true).await;
        let record = enroll(&env, true).await;
        assert_eq!(RequestStatus::Complete, record.status);
        let cert = record.certificate.unwrap();
        assert_eq!("uid=jdoe,ou=people,o=pki-tomcat-CA", cert.subject);
        assert_eq!(record.request_id.to_string(), record.outputs[0].value);

        let stored = env
            .state
            .provider
            .get_enrollment_provider()
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Complete, stored.status());
        assert_eq!(Some("jdoe"), stored.auth_token_value("uid"));
        assert_eq!(Some(cert.serial_hex().as_str()), stored.get_text(RequestField::CertSerial));
        assert_eq!(1, env.audit.events_of(AuditEventType::Auth).await.len());
        let created = env.audit.events_of(AuditEventType::ProfileCertRequest).await;
        assert_eq!(1, created.len());
        assert_eq!("jdoe", created[0].subject_id());
    }

    #[tokio::test]
    async fn test_enroll_invalid_credentials() {
        let env = env(false, true).await;
        let res = env
            .state
            .provider
            .get_enrollment_provider()
            .enroll(
                &env.state,
                "caUserCert",
                &AuthCredentials::new().with("uid", "jdoe").with("pwd", "bad"),
                &context(true),
                &Locale::default(),
            )
            .await;
        assert!(matches!(
            res,
            Err(EnrollmentError::Auth {
                source: AuthError::InvalidCredentials
            })
        ));
        assert!(
            env.state
                .provider
                .get_request_provider()
                .list_requests(None)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_pin_consumed_by_rejected_request() {
        let env = TestEnv::new().await;
        let dn = format!("uid=jdoe,{}", env.state.config.directory.get_user_base_dn());
        env.directory
            .add_entry(
                Entry::new(&dn)
                    .with("uid", "jdoe")
                    .with(PASSWORD_ATTRIBUTE, "secret")
                    .with_bytes("pin", encode_pin(PinHashType::Sha1, &dn, "4321")),
            )
            .await;
        // The EC request fails the RSA only key constraint.
        let cfg = PROFILE
            .replace("UserDirEnrollment", "PinDirEnrollment")
            .replace("APPROVAL", "noConstraintImpl")
            + "policyset.userCertSet.2.constraint.params.keyType=RSA\n";
        env.state
            .provider
            .get_profile_provider()
            .load_profile(
                &env.state,
                &ProfileConfig::parse(&cfg, Some("caPinCert")).unwrap(),
            )
            .await
            .unwrap();

        let enrollment = env.state.provider.get_enrollment_provider();
        let creds = credentials().with("pin", "4321");
        let record = enrollment
            .enroll(&env.state, "caPinCert", &creds, &context(true), &Locale::default())
            .await
            .unwrap()
            .remove(0);
        assert_eq!(RequestStatus::Rejected, record.status);
        assert!(record.certificate.is_none());
        assert!(!env.directory.get_entry(&dn).await.unwrap().has_attribute("pin"));

        assert!(matches!(
            enrollment
                .enroll(&env.state, "caPinCert", &creds, &context(true), &Locale::default())
                .await,
            Err(EnrollmentError::Auth {
                source: AuthError::InvalidCredentials
            })
        ));
    }

    #[tokio::test]
    async fn test_enroll_disabled() {
        let env = env(false, false).await;
        let res = env
            .state
            .provider
            .get_enrollment_provider()
            .enroll(
                &env.state,
                "caUserCert",
                &credentials(),
                &context(true),
                &Locale::default(),
            )
            .await;
        assert!(matches!(
            res,
            Err(EnrollmentError::Profile {
                source: ProfileError::Disabled(_)
            })
        ));
    }

    #[tokio::test]
    async fn test_enroll_invalid_input_rejected() {
        let env = env(false, true).await;
        let records = env
            .state
            .provider
            .get_enrollment_provider()
            .enroll(
                &env.state,
                "caUserCert",
                &credentials(),
                &InputContext::new(),
                &Locale::default(),
            )
            .await
            .unwrap();
        assert_eq!(1, records.len());
        assert_eq!(RequestStatus::Rejected, records[0].status);
        assert!(records[0].reason.as_ref().unwrap().contains("cert_request"));
        assert!(records[0].certificate.is_none());
    }

    #[tokio::test]
    async fn test_resume_with_pop() {
        let env = env(false, true).await;
        let record = enroll(&env, false).await;
        assert_eq!(RequestStatus::Pending, record.status);
        assert_eq!(Some("Proof of possession is required".into()), record.reason);

        let enrollment = env.state.provider.get_enrollment_provider();
        let ctx = InputContext::from([("pop".to_string(), "signature".to_string())]);
        let resumed = enrollment
            .resume(&env.state, record.request_id, &ctx)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Complete, resumed.status);
        assert!(resumed.certificate.is_some());
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(Some("userCertSet"), stored.policy_set_id());
        assert_eq!(EMPTY_VALUE, stored.reason());
        assert_eq!(
            1,
            env.audit
                .events_of(AuditEventType::CertRequestProcessed)
                .await
                .len()
        );

        assert!(matches!(
            enrollment.resume(&env.state, record.request_id, &ctx).await,
            Err(EnrollmentError::InvalidStatus {
                status: RequestStatus::Complete,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_resume_keeps_existing_input() {
        let env = env(false, true).await;
        let enrollment = env.state.provider.get_enrollment_provider();
        let mut ctx = context(false);
        ctx.insert("requestor_name".into(), "John Doe".into());
        let record = enrollment
            .enroll(&env.state, "caUserCert", &credentials(), &ctx, &Locale::default())
            .await
            .unwrap()
            .remove(0);
        assert_eq!(RequestStatus::Pending, record.status);

        let ctx = InputContext::from([
            ("pop".to_string(), "signature".to_string()),
            ("requestor_name".to_string(), "Mallory".to_string()),
        ]);
        match enrollment.resume(&env.state, record.request_id, &ctx).await {
            Err(EnrollmentError::InputConflict { id, field }) => {
                assert_eq!(record.request_id, id);
                assert_eq!("requestor_name", field);
            }
            other => panic!("unexpected result {other:?}"),
        }
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Pending, stored.status());
        assert_eq!(Some("John Doe"), stored.get_text(RequestField::RequestorName));

        // Data that is still missing may be supplied.
        let ctx = InputContext::from([
            ("pop".to_string(), "signature".to_string()),
            ("requestor_email".to_string(), "jdoe@example.com".to_string()),
        ]);
        let resumed = enrollment
            .resume(&env.state, record.request_id, &ctx)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Complete, resumed.status);
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(Some("John Doe"), stored.get_text(RequestField::RequestorName));
        assert_eq!(
            Some("jdoe@example.com"),
            stored.get_text(RequestField::RequestorEmail)
        );
    }

    #[tokio::test]
    async fn test_agent_approval() {
        let env = env(true, true).await;
        let record = enroll(&env, true).await;
        assert_eq!(RequestStatus::Pending, record.status);

        let enrollment = env.state.provider.get_enrollment_provider();
        assert!(matches!(
            enrollment
                .approve(&env.state, &agent("jdoe"), record.request_id)
                .await,
            Err(EnrollmentError::NotAuthorized { .. })
        ));
        assert!(matches!(
            enrollment
                .approve(&env.state, &AuthToken::new(), record.request_id)
                .await,
            Err(EnrollmentError::AgentUnknown)
        ));

        let approved = enrollment
            .approve(&env.state, &agent("agent"), record.request_id)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Complete, approved.status);
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(["agent"], stored.get_list(RequestField::AgentApprovals));
        let statuses: Vec<RequestStatus> =
            stored.history().iter().map(|change| change.to).collect();
        assert_eq!(
            vec![
                RequestStatus::Pending,
                RequestStatus::Approved,
                RequestStatus::Complete
            ],
            statuses
        );
    }

    #[tokio::test]
    async fn test_approve_retried_after_issuer_failure() {
        let mut issuer = MockCertificateIssuer::default();
        issuer
            .expect_issue()
            .times(1)
            .returning(|_| Err(IssuerError::Signing("token removed".into())));
        issuer.expect_issue().returning(|template| {
            Ok(IssuedCertificate {
                serial: 9,
                issuer: "CN=CA Signing Certificate".into(),
                subject: template.subject.clone(),
                not_before: template.not_before,
                not_after: template.not_after,
                encoded: "MIIB".into(),
                fingerprint: "00".into(),
            })
        });
        let mut plugins = PluginManager::default().with_builtin_policies();
        plugins.register_issuer(Config::default().issuer.driver, Arc::new(issuer));
        let env = env_with_plugins(true, true, plugins).await;
        let record = enroll(&env, true).await;
        assert_eq!(RequestStatus::Pending, record.status);

        let enrollment = env.state.provider.get_enrollment_provider();
        assert!(matches!(
            enrollment
                .approve(&env.state, &agent("agent"), record.request_id)
                .await,
            Err(EnrollmentError::Profile {
                source: ProfileError::ExecutionFailed(_)
            })
        ));
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Pending, stored.status());
        assert!(stored.reason().contains("token removed"));

        let approved = enrollment
            .approve(&env.state, &agent("agent"), record.request_id)
            .await
            .unwrap();
        assert_eq!(RequestStatus::Complete, approved.status);
        assert_eq!(9, approved.certificate.unwrap().serial);
        let stored = enrollment
            .get_request(&env.state, record.request_id)
            .await
            .unwrap();
        assert_eq!(["agent"], stored.get_list(RequestField::AgentApprovals));
    }

    #[tokio::test]
    async fn test_agent_reject_and_cancel() {
        let env = env(true, true).await;
        let enrollment = env.state.provider.get_enrollment_provider();
        let first = enroll(&env, true).await;
        let rejected = enrollment
            .reject(&env.state, &agent("agent"), first.request_id, "wrong key")
            .await
            .unwrap();
        assert_eq!(RequestStatus::Rejected, rejected.status);
        assert_eq!(Some("wrong key".into()), rejected.reason);

        let second = enroll(&env, true).await;
        let canceled = enrollment
            .cancel(&env.state, &agent("agent"), second.request_id, " ")
            .await
            .unwrap();
        assert_eq!(RequestStatus::Canceled, canceled.status);

        let events = env
            .audit
            .events_of(AuditEventType::CertRequestProcessed)
            .await;
        assert_eq!(2, events.len());
        assert!(events.iter().all(|ev| ev.outcome() == AuditOutcome::Failure));
        assert_eq!("agent", events[0].subject_id());
        assert_eq!(Some("wrong key"), events[0].attribute("FailureReason"));
        assert_eq!(Some(EMPTY_VALUE), events[1].attribute("FailureReason"));

        assert!(matches!(
            enrollment
                .cancel(&env.state, &agent("agent"), first.request_id, "again")
                .await,
            Err(EnrollmentError::Request {
                source: RequestError::InvalidTransition { .. }
            })
        ));
    }

    #[test]
    fn test_checkout_exclusive() {
        let in_flight = InFlight::default();
        let held = in_flight.checkout(RequestId(7)).unwrap();
        assert!(matches!(
            in_flight.checkout(RequestId(7)),
            Err(EnrollmentError::Busy(RequestId(7)))
        ));
        assert!(in_flight.checkout(RequestId(8)).is_ok());
        drop(held);
        assert!(in_flight.checkout(RequestId(7)).is_ok());
    }
}
