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
//! Request queue - internal mocking tools.
use async_trait::async_trait;
use mockall::mock;

use crate::request::backend::RequestQueue;
use crate::request::error::RequestError;
use crate::request::types::*;

mock! {
    pub RequestQueue {}

    #[async_trait]
    impl RequestQueue for RequestQueue {
        async fn create(&self, profile_id: &str) -> Result<Request, RequestError>;

        async fn get(&self, id: RequestId) -> Result<Option<Request>, RequestError>;

        async fn save(&self, request: &Request) -> Result<(), RequestError>;

        async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>, RequestError>;
    }
}

impl std::fmt::Debug for MockRequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRequestQueue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_debug() {
        let backend: Arc<dyn RequestQueue> = Arc::new(MockRequestQueue::default());
        assert_eq!("MockRequestQueue { .. }", format!("{backend:?}"));
    }
}
