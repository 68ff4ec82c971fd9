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
//! # Error
//!
//! Diverse errors that can occur during the CA processing.
use thiserror::Error;

use crate::audit::error::AuditError;
use crate::auth::error::AuthError;
use crate::directory::error::DirectoryError;
use crate::enrollment::error::EnrollmentError;
use crate::issuer::error::IssuerError;
use crate::plugin_manager::RegistryError;
use crate::profile::error::{PolicyError, ProfileError};
use crate::request::error::RequestError;
use crate::tps::error::TokenResolverError;
use crate::usergroup::error::UserGroupError;

/// CA error.
#[derive(Debug, Error)]
pub enum CaError {
    #[error(transparent)]
    Audit {
        #[from]
        source: AuditError,
    },

    #[error(transparent)]
    Auth {
        #[from]
        source: AuthError,
    },

    #[error(transparent)]
    Directory {
        #[from]
        source: DirectoryError,
    },

    #[error(transparent)]
    Enrollment {
        #[from]
        source: EnrollmentError,
    },

    #[error(transparent)]
    Issuer {
        #[from]
        source: IssuerError,
    },

    #[error(transparent)]
    Policy {
        #[from]
        source: PolicyError,
    },

    #[error(transparent)]
    Profile {
        #[from]
        source: ProfileError,
    },

    /// Provider manager assembly error.
    #[error("cannot build the provider manager: {0}")]
    ProviderBuilder(String),

    #[error(transparent)]
    Registry {
        #[from]
        source: RegistryError,
    },

    #[error(transparent)]
    Request {
        #[from]
        source: RequestError,
    },

    #[error(transparent)]
    TokenResolver {
        #[from]
        source: TokenResolverError,
    },

    #[error(transparent)]
    UserGroup {
        #[from]
        source: UserGroupError,
    },
}
