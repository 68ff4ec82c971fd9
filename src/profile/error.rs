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
use thiserror::Error;

use crate::common::PropertiesError;
use crate::request::error::RequestError;

/// Policy component error.
///
/// Messages are already localized for the requesting locale.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Configuration or request value is invalid.
    #[error("{0}")]
    InvalidValue(String),

    /// Required configuration parameter is not set.
    #[error("missing required parameter {0}")]
    MissingParameter(String),

    /// Named value is not managed by the component.
    #[error("unknown value {0}")]
    UnknownValue(String),

    /// Request lacks data the component needs.
    #[error("{0}")]
    MissingData(String),
}

/// Profile error.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Submitted context cannot produce the requests.
    #[error("request creation failed: {0}")]
    CreationFailed(String),

    /// Input policy rejected the supplied value.
    #[error("invalid input {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Strict populate aborted on the failing default policy.
    #[error("default policy {policy} failed: {reason}")]
    PopulateFailed { policy: String, reason: String },

    /// Terminal action failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// No policy set applies to the request.
    #[error("no policy set of profile {0} applies to the request")]
    NoPolicySet(String),

    /// Cached policy set no longer exists in the profile.
    #[error("unknown policy set {0}")]
    UnknownPolicySet(String),

    /// Policy component cannot be constructed.
    #[error("policy {component} of profile {profile} cannot be loaded: {reason}")]
    PolicyLoad {
        profile: String,
        component: String,
        reason: String,
    },

    /// Malformed profile configuration.
    #[error("invalid profile configuration: {0}")]
    InvalidConfig(String),

    #[error("profile {0} not found")]
    NotFound(String),

    #[error("profile {0} is disabled")]
    Disabled(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Properties {
        #[from]
        source: PropertiesError,
    },

    #[error(transparent)]
    Request {
        #[from]
        source: RequestError,
    },
}
