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

//! # Certificate authority enrollment engine
//!
//! The certificate enrollment core of a PKI certificate authority. Client
//! submissions enter through an enrollment *profile*, a configurable pipeline
//! of policy components:
//!
//! - **inputs** copy the submitted data into the request,
//! - **defaults** derive the certificate content in declared order,
//! - **constraints** check the populated request and may reject it or defer
//!   it until an agent approves or the client supplies missing data,
//! - **outputs** render the result for the client.
//!
//! The surrounding services are explicit providers wired together by the
//! [`provider::Provider`]:
//!
//! - authenticators (directory bind, PIN digest, hash fingerprint sessions and
//!   delegated token authentication against a peer CA),
//! - the signed audit trail with its hash chain sealing,
//! - the directory gateway and the user/group management on top of it,
//! - the request queue, the certificate issuer and the enrollment driver
//!   handling resumption and agent actions.
//!
//! Backends and policy classes are registered in the
//! [`plugin_manager::PluginManager`] at start-up; nothing is looked up from
//! global state.

pub mod audit;
pub mod auth;
pub mod ca;
pub mod common;
pub mod config;
pub mod directory;
pub mod enrollment;
pub mod error;
pub mod issuer;
pub mod plugin_manager;
pub mod profile;
pub mod provider;
pub mod request;
pub mod tps;
pub mod usergroup;

#[cfg(test)]
mod tests;
