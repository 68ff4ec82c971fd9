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
use crate::issuer::IssuedCertificate;
use crate::profile::policy::OutputValue;
use crate::request::{Request, RequestId, RequestStatus};

/// State of one request after an enrollment or agent operation.
#[derive(Clone, Debug, PartialEq)]
pub struct EnrollmentRecord {
    pub request_id: RequestId,
    pub status: RequestStatus,
    /// Rejection or deferral reason.
    pub reason: Option<String>,
    /// Certificate issued by this operation.
    pub certificate: Option<IssuedCertificate>,
    /// Rendered profile outputs.
    pub outputs: Vec<OutputValue>,
}

impl EnrollmentRecord {
    pub(super) fn new(request: &Request, outputs: Vec<OutputValue>) -> Self {
        Self {
            request_id: request.id(),
            status: request.status(),
            reason: request
                .get_text(crate::request::RequestField::Reason)
                .map(Into::into),
            certificate: None,
            outputs,
        }
    }

    pub(super) fn with_certificate(mut self, certificate: Option<IssuedCertificate>) -> Self {
        self.certificate = certificate;
        self
    }
}
