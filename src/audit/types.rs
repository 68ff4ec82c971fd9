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
//! # Audit event types
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Value recorded for absent or blank attributes.
pub const EMPTY_VALUE: &str = "<EMPTY>";

/// Subject of events raised before the caller has been identified.
pub const SUBJECT_UNIDENTIFIED: &str = "$Unidentified$";

/// Subject of events raised by the CA itself.
pub const SUBJECT_SYSTEM: &str = "$System$";

/// Outcome of the audited operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum AuditOutcome {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILURE")]
    Failure,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Audited operation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum AuditEventType {
    Auth,
    ProfileCertRequest,
    ProfileInput,
    ProfilePopulate,
    ProfileValidate,
    ProfilePolicySkipped,
    CertRequestProcessed,
    CertStatusChangeRequest,
    CertStatusChangeRequestProcessed,
    FullCrlGeneration,
    FullCrlPublishing,
    DeltaCrlGeneration,
    SecurityDataArchivalRequest,
    SecurityDataRecoveryRequest,
}

impl AuditEventType {
    /// Stable event name used in the rendered record and in the
    /// `signed_events` configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::ProfileCertRequest => "PROFILE_CERT_REQUEST",
            Self::ProfileInput => "PROFILE_INPUT",
            Self::ProfilePopulate => "PROFILE_POPULATE",
            Self::ProfileValidate => "PROFILE_VALIDATE",
            Self::ProfilePolicySkipped => "PROFILE_POLICY_SKIPPED",
            Self::CertRequestProcessed => "CERT_REQUEST_PROCESSED",
            Self::CertStatusChangeRequest => "CERT_STATUS_CHANGE_REQUEST",
            Self::CertStatusChangeRequestProcessed => "CERT_STATUS_CHANGE_REQUEST_PROCESSED",
            Self::FullCrlGeneration => "FULL_CRL_GENERATION",
            Self::FullCrlPublishing => "FULL_CRL_PUBLISHING",
            Self::DeltaCrlGeneration => "DELTA_CRL_GENERATION",
            Self::SecurityDataArchivalRequest => "SECURITY_DATA_ARCHIVAL_REQUEST",
            Self::SecurityDataRecoveryRequest => "SECURITY_DATA_RECOVERY_REQUEST",
        }
    }

    /// Message template identifier of the event with the given outcome.
    ///
    /// Authentication is the only type with distinct templates per outcome.
    pub fn message_id(&self, outcome: AuditOutcome) -> String {
        match (self, outcome) {
            (Self::Auth, AuditOutcome::Success) => "LOGGING_SIGNED_AUDIT_AUTH_SUCCESS".into(),
            (Self::Auth, AuditOutcome::Failure) => "LOGGING_SIGNED_AUDIT_AUTH_FAIL".into(),
            (other, _) => format!("LOGGING_SIGNED_AUDIT_{}", other.name()),
        }
    }

    /// Whether records of this type must be sealed before storage.
    ///
    /// The populate, input and validate diagnostics are informational, every
    /// other event is part of the signed audit trail.
    pub fn is_signed(&self) -> bool {
        !matches!(
            self,
            Self::ProfileInput | Self::ProfilePopulate | Self::ProfileValidate
        )
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable audit record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditEvent {
    event_type: AuditEventType,
    message_id: String,
    subject_id: String,
    outcome: AuditOutcome,
    attributes: Vec<(String, String)>,
    timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn builder(event_type: AuditEventType) -> AuditEventBuilder {
        AuditEventBuilder {
            event_type,
            subject_id: None,
            outcome: AuditOutcome::Success,
            attributes: Vec::new(),
        }
    }

    pub fn event_type(&self) -> AuditEventType {
        self.event_type
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn outcome(&self) -> AuditOutcome {
        self.outcome
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Event specific attributes in the insertion order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Get the attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, val)| val.as_str())
    }

    pub fn is_signed(&self) -> bool {
        self.event_type.is_signed()
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[AuditEvent={}][SubjectID={}][Outcome={}]",
            self.event_type, self.subject_id, self.outcome
        )?;
        for (key, val) in self.attributes.iter() {
            write!(f, "[{key}={val}]")?;
        }
        Ok(())
    }
}

/// Builder of the [`AuditEvent`].
///
/// Every value passes through [`normalize`] so that the rendered record
/// never distinguishes an absent value from a blank one.
#[derive(Clone, Debug)]
pub struct AuditEventBuilder {
    event_type: AuditEventType,
    subject_id: Option<String>,
    outcome: AuditOutcome,
    attributes: Vec<(String, String)>,
}

impl AuditEventBuilder {
    pub fn subject<S: AsRef<str>>(mut self, subject: S) -> Self {
        self.subject_id = Some(subject.as_ref().to_string());
        self
    }

    pub fn outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn success(self) -> Self {
        self.outcome(AuditOutcome::Success)
    }

    pub fn failure(self) -> Self {
        self.outcome(AuditOutcome::Failure)
    }

    /// Append the attribute. Setting the same name twice replaces the value
    /// keeping the original position.
    pub fn attr<K: AsRef<str>, V: AsRef<str>>(self, name: K, value: V) -> Self {
        self.attr_opt(name, Some(value))
    }

    /// Append the optional attribute.
    pub fn attr_opt<K: AsRef<str>, V: AsRef<str>>(mut self, name: K, value: Option<V>) -> Self {
        let value = normalize(value.as_ref().map(AsRef::as_ref));
        let name = name.as_ref();
        if let Some(existing) = self.attributes.iter_mut().find(|(key, _)| key == name) {
            existing.1 = value;
        } else {
            self.attributes.push((name.to_string(), value));
        }
        self
    }

    pub fn build(self) -> AuditEvent {
        let subject_id = match self.subject_id {
            Some(subject) if !subject.trim().is_empty() => subject,
            _ => SUBJECT_UNIDENTIFIED.to_string(),
        };
        AuditEvent {
            message_id: self.event_type.message_id(self.outcome),
            event_type: self.event_type,
            subject_id,
            outcome: self.outcome,
            attributes: self.attributes,
            timestamp: Utc::now(),
        }
    }
}

/// Normalize the optional value to the documented sentinel.
///
/// `None`, empty and whitespace only values all become [`EMPTY_VALUE`].
pub fn normalize(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(val) if !val.is_empty() => val.to_string(),
        _ => EMPTY_VALUE.to_string(),
    }
}

/// Seal of the signed record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditSeal {
    /// Digest of the previous sealed record (hex encoded).
    pub previous: String,
    /// Digest of this record chained to `previous` (hex encoded).
    pub digest: String,
}

/// Record as stored by the audit sink.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuditRecord {
    pub event: AuditEvent,
    /// Present for the signed events.
    pub seal: Option<AuditSeal>,
}
