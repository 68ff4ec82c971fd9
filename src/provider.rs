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
//! # Provider manager
//!
//! Provider manager provides access to the individual service providers. This
//! gives an easy interact for passing overall manager down to the individual
//! providers that might need to call other providers.
use derive_builder::Builder;
use std::sync::Arc;

use crate::audit::{AuditApi, AuditProvider};
use crate::auth::{AuthenticationApi, AuthenticationProvider};
use crate::config::Config;
use crate::directory::{DirectoryGateway, new_gateway};
use crate::enrollment::{EnrollmentApi, EnrollmentProvider};
use crate::error::CaError;
use crate::issuer::{IssuerApi, IssuerProvider};
use crate::plugin_manager::PluginManager;
use crate::profile::{ProfileApi, ProfileProvider};
use crate::request::{RequestApi, RequestProvider};
use crate::usergroup::{UserGroupApi, UserGroupProvider};

/// Global provider manager.
#[derive(Builder, Clone)]
#[builder(pattern = "owned")]
pub struct Provider {
    /// Configuration.
    pub config: Config,
    /// Audit provider.
    audit: AuditProvider,
    /// Authentication provider.
    auth: AuthenticationProvider,
    /// Directory gateway shared by the authenticators and user/group
    /// management.
    directory: Arc<dyn DirectoryGateway>,
    /// Enrollment provider.
    enrollment: EnrollmentProvider,
    /// Certificate issuer provider.
    issuer: IssuerProvider,
    /// Profile provider.
    profile: ProfileProvider,
    /// Request queue provider.
    request: RequestProvider,
    /// User and group provider.
    usergroup: UserGroupProvider,
}

impl Provider {
    pub fn new(cfg: Config, plugin_manager: PluginManager) -> Result<Self, CaError> {
        let directory = new_gateway(&cfg, &plugin_manager)?;
        let audit_provider = AuditProvider::new(&cfg, &plugin_manager)?;
        let auth_provider = AuthenticationProvider::new(&cfg, &plugin_manager, directory.clone())?;
        let enrollment_provider = EnrollmentProvider::new(&cfg);
        let issuer_provider = IssuerProvider::new(&cfg, &plugin_manager)?;
        let profile_provider = ProfileProvider::new(&cfg, &plugin_manager);
        let request_provider = RequestProvider::new(&cfg, &plugin_manager)?;
        let usergroup_provider = UserGroupProvider::new(&cfg.directory, directory.clone());

        ProviderBuilder::default()
            .config(cfg)
            .audit(audit_provider)
            .auth(auth_provider)
            .directory(directory)
            .enrollment(enrollment_provider)
            .issuer(issuer_provider)
            .profile(profile_provider)
            .request(request_provider)
            .usergroup(usergroup_provider)
            .build()
            .map_err(|err| CaError::ProviderBuilder(err.to_string()))
    }

    /// Get the audit provider.
    pub fn get_audit_provider(&self) -> &impl AuditApi {
        &self.audit
    }

    /// Get the authentication provider.
    pub fn get_auth_provider(&self) -> &impl AuthenticationApi {
        &self.auth
    }

    /// Get the directory gateway.
    pub fn get_directory(&self) -> &Arc<dyn DirectoryGateway> {
        &self.directory
    }

    /// Get the enrollment provider.
    pub fn get_enrollment_provider(&self) -> &impl EnrollmentApi {
        &self.enrollment
    }

    /// Get the certificate issuer provider.
    pub fn get_issuer_provider(&self) -> &impl IssuerApi {
        &self.issuer
    }

    /// Get the profile provider.
    pub fn get_profile_provider(&self) -> &impl ProfileApi {
        &self.profile
    }

    /// Get the request provider.
    pub fn get_request_provider(&self) -> &impl RequestApi {
        &self.request
    }

    /// Get the user and group provider.
    pub fn get_usergroup_provider(&self) -> &impl UserGroupApi {
        &self.usergroup
    }
}
