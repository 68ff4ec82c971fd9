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
//! # Certificate issuer backends
use async_trait::async_trait;

use crate::issuer::error::IssuerError;
use crate::issuer::types::*;

pub mod record;

pub use record::RecordIssuer;

/// Signing collaborator turning the template into the certificate.
#[async_trait]
pub trait CertificateIssuer: Send + Sync + std::fmt::Debug {
    async fn issue(&self, template: &CertificateTemplate)
    -> Result<IssuedCertificate, IssuerError>;
}
