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
//! Certificate issuer - internal mocking tools.
use async_trait::async_trait;
use mockall::mock;

use crate::issuer::backend::CertificateIssuer;
use crate::issuer::error::IssuerError;
use crate::issuer::types::*;

mock! {
    pub CertificateIssuer {}

    #[async_trait]
    impl CertificateIssuer for CertificateIssuer {
        async fn issue(&self, template: &CertificateTemplate)
        -> Result<IssuedCertificate, IssuerError>;
    }
}

impl std::fmt::Debug for MockCertificateIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCertificateIssuer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_debug() {
        let backend: Arc<dyn CertificateIssuer> = Arc::new(MockCertificateIssuer::default());
        assert_eq!("MockCertificateIssuer { .. }", format!("{backend:?}"));
    }
}
