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

/// Directory gateway error.
///
/// LDAP result codes are folded into the four kinds the consumers act upon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    /// No such object (32).
    #[error("entry {0} not found")]
    NotFound(String),

    /// Invalid credentials (49).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Server down, busy or unavailable (51, 52, 81, 91).
    #[error("directory server unavailable: {0}")]
    ServerUnavailable(String),

    /// Malformed filter.
    #[error("invalid search filter {filter}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// Any other result code.
    #[error("directory operation failed with code {code}: {message}")]
    Other { code: u32, message: String },
}

impl DirectoryError {
    /// Build the error from the LDAP result code.
    pub fn from_result_code<S: Into<String>>(code: u32, message: S) -> Self {
        let message = message.into();
        match code {
            32 => Self::NotFound(message),
            49 => Self::InvalidCredentials,
            51 | 52 | 81 | 91 => Self::ServerUnavailable(message),
            _ => Self::Other { code, message },
        }
    }
}
