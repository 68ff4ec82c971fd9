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
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::issuer::error::IssuerError;
use crate::request::{Request, RequestField};

/// Certificate content assembled by the default policies.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CertificateTemplate {
    pub request_id: u64,
    pub profile_id: String,
    pub subject: String,
    pub key_type: String,
    pub key_size: Option<i64>,
    pub public_key: Option<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub key_usage: Vec<String>,
    pub ext_key_usage: Vec<String>,
    pub signing_alg: String,
}

impl CertificateTemplate {
    /// Collect the template from the populated request.
    pub fn from_request(request: &Request) -> Result<Self, IssuerError> {
        let text = |field: RequestField| {
            request
                .get_text(field)
                .filter(|val| !val.trim().is_empty())
                .map(str::to_string)
                .ok_or_else(|| IssuerError::IncompleteTemplate(field.key().to_string()))
        };
        let time = |field: RequestField| {
            request
                .get_time(field)
                .ok_or_else(|| IssuerError::IncompleteTemplate(field.key().to_string()))
        };
        Ok(Self {
            request_id: request.id().0,
            profile_id: request.profile_id().unwrap_or_default().to_string(),
            subject: text(RequestField::CertSubject)?,
            key_type: text(RequestField::CertKeyType)?,
            key_size: request.get_integer(RequestField::CertKeySize),
            public_key: request
                .get_text(RequestField::CertPublicKey)
                .map(Into::into),
            not_before: time(RequestField::CertNotBefore)?,
            not_after: time(RequestField::CertNotAfter)?,
            key_usage: request.get_list(RequestField::CertKeyUsage).to_vec(),
            ext_key_usage: request.get_list(RequestField::CertExtKeyUsage).to_vec(),
            signing_alg: text(RequestField::CertSigningAlg)?,
        })
    }
}

/// Issued certificate.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssuedCertificate {
    pub serial: u64,
    pub issuer: String,
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Encoded certificate (base64).
    pub encoded: String,
    /// SHA-256 fingerprint of the encoded form (hex).
    pub fingerprint: String,
}

impl IssuedCertificate {
    /// Serial number in the usual hexadecimal notation.
    pub fn serial_hex(&self) -> String {
        format!("0x{:x}", self.serial)
    }
}
