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
//! # Request types
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::audit::EMPTY_VALUE;
use crate::request::error::RequestError;

/// Request identifier allocated by the queue.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request status.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Created, not yet processed.
    Begin,
    /// Deferred, waiting for the agent approval or further client data.
    Pending,
    /// Approved by an agent, not yet executed.
    Approved,
    Canceled,
    Rejected,
    Complete,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Canceled | Self::Rejected | Self::Complete)
    }

    /// Whether the status may change to `next`.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match self {
            Begin => matches!(next, Pending | Complete | Rejected | Canceled),
            Pending => matches!(next, Approved | Complete | Rejected | Canceled),
            Approved => matches!(next, Pending | Complete | Rejected | Canceled),
            Canceled | Rejected | Complete => false,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Begin => "begin",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Canceled => "canceled",
            Self::Rejected => "rejected",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Typed value of the request extension data.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtValue {
    Text(String),
    Integer(i64),
    Flag(bool),
    #[serde(serialize_with = "serialize_binary")]
    Binary(Vec<u8>),
    List(Vec<String>),
    Time(DateTime<Utc>),
}

fn serialize_binary<S: serde::Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(value))
}

impl ExtValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(val) => Some(*val),
            Self::Text(val) => val.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(val) => Some(val),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(val) => Some(*val),
            _ => None,
        }
    }
}

impl fmt::Display for ExtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(val) => f.write_str(val),
            Self::Integer(val) => write!(f, "{val}"),
            Self::Flag(val) => write!(f, "{val}"),
            Self::Binary(val) => f.write_str(&STANDARD.encode(val)),
            Self::List(val) => f.write_str(&val.join(",")),
            Self::Time(val) => f.write_str(&val.to_rfc3339()),
        }
    }
}

impl From<&str> for ExtValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ExtValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ExtValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ExtValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<u8>> for ExtValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<Vec<String>> for ExtValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<DateTime<Utc>> for ExtValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

/// Request fields the CA core depends on.
///
/// Policy specific fields use plain string keys through
/// [`Request::set_ext`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RequestField {
    ProfileId,
    /// Policy set selected for the request. Set once.
    PolicySetId,
    /// Kind of the submitted request (`pkcs10`, `crmf`).
    RequestType,
    /// Submitted request descriptor.
    CertRequest,
    /// Position of the request within a multi request submission.
    RequestIndex,
    /// Locale of the requestor.
    Locale,
    RequestSubjectName,
    RequestKeyType,
    RequestKeySize,
    RequestPublicKey,
    /// Proof-of-possession status (`verified`, `failed`).
    PopStatus,
    RequestorName,
    RequestorEmail,
    RequestorPhone,
    CertSubject,
    CertKeyType,
    CertKeySize,
    CertPublicKey,
    CertNotBefore,
    CertNotAfter,
    CertKeyUsage,
    CertExtKeyUsage,
    CertSigningAlg,
    CertSerial,
    Certificate,
    CertFingerprint,
    /// Agents who approved the request.
    AgentApprovals,
    /// Reason of the rejection or deferral.
    Reason,
    /// Additional processing information.
    Info,
    /// Failures recorded by the lenient populate.
    PopulateErrors,
}

impl RequestField {
    pub fn key(&self) -> &'static str {
        match self {
            Self::ProfileId => "profileId",
            Self::PolicySetId => "profileSetId",
            Self::RequestType => "cert_request_type",
            Self::CertRequest => "cert_request",
            Self::RequestIndex => "req_index",
            Self::Locale => "req_locale",
            Self::RequestSubjectName => "req_subject_name",
            Self::RequestKeyType => "req_key_type",
            Self::RequestKeySize => "req_key_size",
            Self::RequestPublicKey => "req_public_key",
            Self::PopStatus => "pop_status",
            Self::RequestorName => "requestor_name",
            Self::RequestorEmail => "requestor_email",
            Self::RequestorPhone => "requestor_phone",
            Self::CertSubject => "cert_subject",
            Self::CertKeyType => "cert_key_type",
            Self::CertKeySize => "cert_key_size",
            Self::CertPublicKey => "cert_public_key",
            Self::CertNotBefore => "cert_not_before",
            Self::CertNotAfter => "cert_not_after",
            Self::CertKeyUsage => "cert_key_usage",
            Self::CertExtKeyUsage => "cert_ext_key_usage",
            Self::CertSigningAlg => "cert_signing_alg",
            Self::CertSerial => "cert_serial",
            Self::Certificate => "cert_encoded",
            Self::CertFingerprint => "cert_fingerprint",
            Self::AgentApprovals => "agent_approvals",
            Self::Reason => "reason",
            Self::Info => "info",
            Self::PopulateErrors => "populate_errors",
        }
    }
}

/// Prefix of the authentication token values copied into the request.
pub const AUTH_TOKEN_PREFIX: &str = "auth_token.";

/// Proof-of-possession status value of a verified request.
pub const POP_VERIFIED: &str = "verified";

/// Recorded status change.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusChange {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub at: DateTime<Utc>,
}

/// Certificate request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Request {
    id: RequestId,
    status: RequestStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ext: BTreeMap<String, ExtValue>,
    history: Vec<StatusChange>,
}

impl Request {
    pub fn new(id: RequestId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: RequestStatus::Begin,
            created_at: now,
            updated_at: now,
            ext: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Change the status recording the transition. Setting the current status
    /// again is a no-op.
    pub fn set_status(&mut self, status: RequestStatus) -> Result<(), RequestError> {
        if status == self.status {
            return Ok(());
        }
        if !self.status.can_transition_to(status) {
            return Err(RequestError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: status,
            });
        }
        let now = Utc::now();
        self.history.push(StatusChange {
            from: self.status,
            to: status,
            at: now,
        });
        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    pub fn set<V: Into<ExtValue>>(&mut self, field: RequestField, value: V) {
        self.set_ext(field.key(), value);
    }

    pub fn get(&self, field: RequestField) -> Option<&ExtValue> {
        self.ext(field.key())
    }

    pub fn remove(&mut self, field: RequestField) -> Option<ExtValue> {
        self.ext.remove(field.key())
    }

    pub fn contains(&self, field: RequestField) -> bool {
        self.ext.contains_key(field.key())
    }

    pub fn get_text(&self, field: RequestField) -> Option<&str> {
        self.get(field).and_then(ExtValue::as_text)
    }

    pub fn get_integer(&self, field: RequestField) -> Option<i64> {
        self.get(field).and_then(ExtValue::as_integer)
    }

    pub fn get_time(&self, field: RequestField) -> Option<DateTime<Utc>> {
        self.get(field).and_then(ExtValue::as_time)
    }

    pub fn get_list(&self, field: RequestField) -> &[String] {
        self.get(field)
            .and_then(ExtValue::as_list)
            .unwrap_or_default()
    }

    pub fn set_ext<K: Into<String>, V: Into<ExtValue>>(&mut self, key: K, value: V) {
        self.ext.insert(key.into(), value.into());
    }

    pub fn ext(&self, key: &str) -> Option<&ExtValue> {
        self.ext.get(key)
    }

    pub fn ext_text(&self, key: &str) -> Option<&str> {
        self.ext(key).and_then(ExtValue::as_text)
    }

    pub fn ext_iter(&self) -> impl Iterator<Item = (&str, &ExtValue)> {
        self.ext.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn profile_id(&self) -> Option<&str> {
        self.get_text(RequestField::ProfileId)
    }

    /// Cached policy set selection.
    pub fn policy_set_id(&self) -> Option<&str> {
        self.get_text(RequestField::PolicySetId)
    }

    pub fn pop_verified(&self) -> bool {
        self.get_text(RequestField::PopStatus) == Some(POP_VERIFIED)
    }

    /// Rejection or deferral reason, never absent.
    pub fn reason(&self) -> String {
        self.normalized(RequestField::Reason)
    }

    /// Processing information, never absent.
    pub fn info(&self) -> String {
        self.normalized(RequestField::Info)
    }

    /// Text rendering of the field with absent or blank values replaced by
    /// [`EMPTY_VALUE`].
    pub fn normalized(&self, field: RequestField) -> String {
        match self.get(field).map(ExtValue::to_string) {
            Some(val) if !val.trim().is_empty() => val.trim().to_string(),
            _ => EMPTY_VALUE.to_string(),
        }
    }

    /// Authentication token value copied into the request.
    pub fn auth_token_value(&self, name: &str) -> Option<&str> {
        self.ext_text(&format!("{AUTH_TOKEN_PREFIX}{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut req = Request::new(RequestId(1));
        req.set_status(RequestStatus::Pending).unwrap();
        req.set_status(RequestStatus::Pending).unwrap();
        req.set_status(RequestStatus::Approved).unwrap();
        req.set_status(RequestStatus::Complete).unwrap();
        assert_eq!(3, req.history().len());
        assert_eq!(RequestStatus::Approved, req.history()[2].from);
        assert_eq!(
            Err(RequestError::InvalidTransition {
                id: RequestId(1),
                from: RequestStatus::Complete,
                to: RequestStatus::Pending
            }),
            req.set_status(RequestStatus::Pending)
        );
        assert!(!RequestStatus::Begin.can_transition_to(RequestStatus::Approved));
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_reason_normalization() {
        let mut req = Request::new(RequestId(1));
        assert_eq!(EMPTY_VALUE, req.reason());
        req.set(RequestField::Reason, "   ");
        assert_eq!(EMPTY_VALUE, req.reason());
        req.set(RequestField::Reason, "");
        assert_eq!(EMPTY_VALUE, req.reason());
        req.set(RequestField::Reason, " bad keysize ");
        assert_eq!("bad keysize", req.reason());
        assert_eq!(EMPTY_VALUE, req.info());
    }

    #[test]
    fn test_typed_access() {
        let mut req = Request::new(RequestId(7));
        req.set(RequestField::CertKeySize, 2048i64);
        req.set(RequestField::RequestKeySize, "4096");
        req.set(
            RequestField::CertKeyUsage,
            vec!["digitalSignature".to_string()],
        );
        req.set_ext("custom", "x");
        assert_eq!(Some(2048), req.get_integer(RequestField::CertKeySize));
        assert_eq!(Some(4096), req.get_integer(RequestField::RequestKeySize));
        assert_eq!(None, req.get_text(RequestField::CertKeySize));
        assert_eq!(1, req.get_list(RequestField::CertKeyUsage).len());
        assert!(req.get_list(RequestField::CertExtKeyUsage).is_empty());
        assert_eq!(Some("x"), req.ext_text("custom"));
        assert_eq!(
            "digitalSignature",
            req.normalized(RequestField::CertKeyUsage)
        );
    }
}
