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
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::request::backend::RequestQueue;
use crate::request::error::RequestError;
use crate::request::types::*;

/// Request queue kept in memory. Clones share the storage.
#[derive(Clone, Debug)]
pub struct MemoryRequestQueue {
    next_id: Arc<AtomicU64>,
    requests: Arc<RwLock<BTreeMap<RequestId, Request>>>,
}

impl Default for MemoryRequestQueue {
    fn default() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            requests: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

#[async_trait]
impl RequestQueue for MemoryRequestQueue {
    async fn create(&self, profile_id: &str) -> Result<Request, RequestError> {
        let id = RequestId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut request = Request::new(id);
        request.set(RequestField::ProfileId, profile_id);
        self.requests.write().await.insert(id, request.clone());
        debug!("created request {} for profile {}", id, profile_id);
        Ok(request)
    }

    async fn get(&self, id: RequestId) -> Result<Option<Request>, RequestError> {
        Ok(self.requests.read().await.get(&id).cloned())
    }

    async fn save(&self, request: &Request) -> Result<(), RequestError> {
        let mut requests = self.requests.write().await;
        let stored = requests
            .get_mut(&request.id())
            .ok_or(RequestError::NotFound(request.id()))?;
        *stored = request.clone();
        Ok(())
    }

    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>, RequestError> {
        Ok(self
            .requests
            .read()
            .await
            .values()
            .filter(|req| status.is_none_or(|status| req.status() == status))
            .cloned()
            .collect())
    }
}
