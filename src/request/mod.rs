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
//! # Request lifecycle
//!
//! A request moves from `begin` through the optional `pending`/`approved`
//! suspension to one of the terminal `complete`, `rejected` or `canceled`
//! states. Every transition is validated by
//! [`RequestStatus::can_transition_to`] and recorded in the request history.
//! The profile engine borrows a request for one pipeline pass and the
//! [`RequestProvider`] persists it afterwards.
use async_trait::async_trait;
use std::sync::Arc;

pub mod backend;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

use crate::config::Config;
use crate::plugin_manager::PluginManager;
use crate::request::backend::{MemoryRequestQueue, RequestQueue};
use crate::request::error::RequestError;

#[cfg(test)]
pub use mock::MockRequestQueue;
pub use types::*;

#[async_trait]
pub trait RequestApi: Send + Sync + Clone {
    async fn create_request(&self, profile_id: &str) -> Result<Request, RequestError>;

    /// Get the request failing with [`RequestError::NotFound`] for unknown
    /// ids.
    async fn get_request(&self, id: RequestId) -> Result<Request, RequestError>;

    async fn save_request(&self, request: &Request) -> Result<(), RequestError>;

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<Request>, RequestError>;
}

/// Request provider.
#[derive(Clone, Debug)]
pub struct RequestProvider {
    /// Backend driver.
    backend_driver: Arc<dyn RequestQueue>,
}

impl RequestProvider {
    pub fn new(config: &Config, plugin_manager: &PluginManager) -> Result<Self, RequestError> {
        let backend_driver: Arc<dyn RequestQueue> = if let Some(driver) =
            plugin_manager.get_request_queue(config.request.driver.clone())
        {
            driver.clone()
        } else {
            match config.request.driver.as_str() {
                "memory" => Arc::new(MemoryRequestQueue::default()),
                _ => {
                    return Err(RequestError::UnsupportedDriver(
                        config.request.driver.clone(),
                    ));
                }
            }
        };
        Ok(Self { backend_driver })
    }
}

#[async_trait]
impl RequestApi for RequestProvider {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn create_request(&self, profile_id: &str) -> Result<Request, RequestError> {
        self.backend_driver.create(profile_id).await
    }

    async fn get_request(&self, id: RequestId) -> Result<Request, RequestError> {
        self.backend_driver
            .get(id)
            .await?
            .ok_or(RequestError::NotFound(id))
    }

    #[tracing::instrument(level = "debug", skip(self, request), fields(id = %request.id(), status = %request.status()))]
    async fn save_request(&self, request: &Request) -> Result<(), RequestError> {
        self.backend_driver.save(request).await
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<Request>, RequestError> {
        self.backend_driver.list(status).await
    }
}
