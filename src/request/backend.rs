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
//! # Request queue backends
use async_trait::async_trait;

use crate::request::error::RequestError;
use crate::request::types::*;

pub mod memory;

pub use memory::MemoryRequestQueue;

/// Persistent request storage.
///
/// The queue owns the requests. A request is handed to exactly one pipeline
/// run at a time; concurrent runs over the same request are a caller error.
#[async_trait]
pub trait RequestQueue: Send + Sync + std::fmt::Debug {
    /// Allocate a new request for the profile.
    async fn create(&self, profile_id: &str) -> Result<Request, RequestError>;

    async fn get(&self, id: RequestId) -> Result<Option<Request>, RequestError>;

    /// Persist the request.
    async fn save(&self, request: &Request) -> Result<(), RequestError>;

    /// List the requests, optionally filtered by the status.
    async fn list(&self, status: Option<RequestStatus>) -> Result<Vec<Request>, RequestError>;
}
