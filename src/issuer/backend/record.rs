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
//! # Record issuer
//!
//! Allocates serial numbers and produces a canonical record of the template
//! instead of a signed certificate. Deployments plug the real signing backend
//! through the plugin manager.
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::issuer::backend::CertificateIssuer;
use crate::issuer::error::IssuerError;
use crate::issuer::types::*;

#[derive(Clone, Debug)]
pub struct RecordIssuer {
    issuer_dn: String,
    next_serial: Arc<AtomicU64>,
}

impl RecordIssuer {
    pub fn new<S: Into<String>>(issuer_dn: S, serial_start: u64) -> Self {
        Self {
            issuer_dn: issuer_dn.into(),
            next_serial: Arc::new(AtomicU64::new(serial_start)),
        }
    }
}

#[async_trait]
impl CertificateIssuer for RecordIssuer {
    async fn issue(
        &self,
        template: &CertificateTemplate,
    ) -> Result<IssuedCertificate, IssuerError> {
        if template.not_after <= template.not_before {
            return Err(IssuerError::Signing("empty validity period".into()));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
        // serde_json keeps the map keys sorted, which makes the record
        // canonical.
        let record = json!({
            "serial": serial,
            "issuer": self.issuer_dn,
            "template": template,
        });
        let encoded = serde_json::to_vec(&record)
            .map_err(|err| IssuerError::Signing(err.to_string()))?;
        Ok(IssuedCertificate {
            serial,
            issuer: self.issuer_dn.clone(),
            subject: template.subject.clone(),
            not_before: template.not_before,
            not_after: template.not_after,
            fingerprint: format!("{:x}", Sha256::digest(&encoded)),
            encoded: STANDARD.encode(&encoded),
        })
    }
}
