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

use crate::directory::error::DirectoryError;

/// Authentication error.
///
/// The three kinds drive distinct audit records and client responses and must
/// stay distinguishable.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Required credential not supplied.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Verification failed. The message never names the failed factor.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Directory, network or configuration fault.
    #[error("authentication infrastructure failure: {reason}")]
    Infrastructure { reason: String },

    /// Authenticator instance is not registered.
    #[error("unknown authenticator {0}")]
    UnknownAuthenticator(String),

    /// Authenticator instance is registered but not enabled.
    #[error("authenticator {0} is not enabled")]
    NotEnabled(String),

    /// Authenticator instance registered twice.
    #[error("authenticator {0} is already registered")]
    Duplicate(String),

    /// Invalid authentication state transition.
    #[error("invalid authentication state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl AuthError {
    pub fn infrastructure<S: Into<String>>(reason: S) -> Self {
        Self::Infrastructure {
            reason: reason.into(),
        }
    }

    /// Map the directory error of the credential verification.
    ///
    /// Unknown entries and rejected binds are indistinguishable to the caller.
    pub fn from_directory(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound(_) | DirectoryError::InvalidCredentials => {
                Self::InvalidCredentials
            }
            other => Self::infrastructure(other.to_string()),
        }
    }

    /// Short text recorded in the audit trail.
    pub fn audit_info(&self) -> String {
        match self {
            Self::MissingCredential(name) => format!("missing credential {name}"),
            Self::InvalidCredentials => "invalid credentials".into(),
            Self::Infrastructure { .. } => "authentication infrastructure failure".into(),
            other => other.to_string(),
        }
    }
}
