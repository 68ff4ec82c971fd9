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
//! Directory gateway - internal mocking tools.
use async_trait::async_trait;
use mockall::mock;
use secrecy::SecretString;

use crate::directory::DirectoryGateway;
use crate::directory::error::DirectoryError;
use crate::directory::types::*;

mock! {
    pub DirectoryGateway {}

    #[async_trait]
    impl DirectoryGateway for DirectoryGateway {
        async fn bind(&self, dn: &str, password: &SecretString) -> Result<(), DirectoryError>;

        async fn search(
            &self,
            base: &str,
            scope: SearchScope,
            filter: &str,
            attrs: &[String],
        ) -> Result<Vec<Entry>, DirectoryError>;

        async fn modify(&self, dn: &str, changes: Vec<Modification>) -> Result<(), DirectoryError>;
    }
}

impl std::fmt::Debug for MockDirectoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDirectoryGateway").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_debug() {
        let backend: Arc<dyn DirectoryGateway> = Arc::new(MockDirectoryGateway::default());
        assert_eq!("MockDirectoryGateway { .. }", format!("{backend:?}"));
    }
}
