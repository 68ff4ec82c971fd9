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

use crate::auth::error::AuthError;
use crate::profile::error::ProfileError;
use crate::request::error::RequestError;
use crate::request::{RequestId, RequestStatus};
use crate::usergroup::error::UserGroupError;

/// Enrollment error.
#[derive(Error, Debug)]
pub enum EnrollmentError {
    /// Agent identity is missing from the token.
    #[error("agent identity is not known")]
    AgentUnknown,

    /// Request is already being processed.
    #[error("request {0} is being processed")]
    Busy(RequestId),

    /// Resumed input would replace data the request already carries.
    #[error("request {id} already has a value for {field}")]
    InputConflict { id: RequestId, field: String },

    /// The operation is not allowed in the current request status.
    #[error("request {id} is {status}")]
    InvalidStatus { id: RequestId, status: RequestStatus },

    /// Agent is not a member of the agent group.
    #[error("{uid} is not allowed to act as an agent")]
    NotAuthorized { uid: String },

    /// Request does not reference a profile.
    #[error("request {0} has no profile")]
    NoProfile(RequestId),

    #[error(transparent)]
    Auth {
        #[from]
        source: AuthError,
    },

    #[error(transparent)]
    Profile {
        #[from]
        source: ProfileError,
    },

    #[error(transparent)]
    Request {
        #[from]
        source: RequestError,
    },

    #[error(transparent)]
    UserGroup {
        #[from]
        source: UserGroupError,
    },
}
