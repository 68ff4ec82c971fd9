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
//! # CA configuration
//!
//! The configuration is read from the INI file. Every section is optional and
//! falls back to the built-in defaults.
use config::{File, FileFormat};
use eyre::{Report, WrapErr};
use serde::Deserialize;
use std::path::PathBuf;

mod audit;
mod auth;
pub mod common;
mod default;
mod directory;
mod profile;

pub use audit::AuditSection;
pub use auth::{AgentSection, AuthSection, SessionSection, TokenAuthSection};
pub use default::DefaultSection;
pub use directory::DirectorySection;
pub use profile::{IssuerSection, ProfileSection, RequestSection, TpsSection};

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Global configuration options
    #[serde(rename = "DEFAULT", alias = "default", default)]
    pub default: DefaultSection,

    /// Request approval by agents.
    #[serde(default)]
    pub agent: AgentSection,

    /// Signed audit.
    #[serde(default)]
    pub audit: AuditSection,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthSection,

    /// Directory gateway.
    #[serde(default)]
    pub directory: DirectorySection,

    /// Certificate issuer.
    #[serde(default)]
    pub issuer: IssuerSection,

    /// Enrollment profiles.
    #[serde(default)]
    pub profile: ProfileSection,

    /// Request queue.
    #[serde(default)]
    pub request: RequestSection,

    /// Hash fingerprint sessions.
    #[serde(default)]
    pub session: SessionSection,

    /// Delegated token authentication.
    #[serde(default)]
    pub token_auth: TokenAuthSection,

    #[serde(default)]
    pub tps: TpsSection,
}

impl Config {
    pub fn new(path: PathBuf) -> Result<Self, Report> {
        let mut builder = config::Config::builder();

        if std::path::Path::new(&path).is_file() {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini));
        }

        builder.try_into()
    }
}

impl TryFrom<config::ConfigBuilder<config::builder::DefaultState>> for Config {
    type Error = Report;
    fn try_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Self::Error> {
        let mut builder = builder;
        builder = builder
            .set_default("session.lifetime", "600")?
            .set_default("token_auth.timeout", "30")?;

        builder
            .build()
            .wrap_err("Failed to read configuration file")?
            .try_deserialize()
            .wrap_err("Failed to parse configuration file")
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_defaults() {
        let sot = Config::default();
        assert_eq!("log", sot.audit.driver);
        assert_eq!("memory", sot.directory.driver);
        assert_eq!("ou=people,o=pki-tomcat-CA", sot.directory.get_user_base_dn());
        assert_eq!("ou=groups,o=pki-tomcat-CA", sot.directory.get_group_base_dn());
        assert!(sot.directory.remove_pin);
        assert!(!sot.profile.strict_populate);
        assert!(sot.profile.skip_invalid_policies);
        assert_eq!(30, sot.token_auth.timeout);
        assert_eq!(600, sot.session.get_lifetime().num_seconds());
        assert_eq!(1, sot.issuer.serial_start);
    }

    #[test]
    fn test_missing_file() {
        let sot = Config::new(PathBuf::from("/nonexistent/pki-ca.conf")).unwrap();
        assert!(sot.auth.methods.is_empty());
        assert!(!sot.default.debug);
    }

    #[test]
    fn test_ini() {
        let mut cfg = NamedTempFile::new().unwrap();
        write!(
            cfg,
            r#"
[DEFAULT]
debug = true

[auth]
methods = UserDirEnrollment, TokenAuth

[audit]
driver = memory
signed_events = AUTH,PROFILE_CERT_REQUEST

[directory]
base_dn = o=example
remove_pin = false
bind_dn = cn=Directory Manager

[profile]
directory = /srv/profiles
strict_populate = true

[token_auth]
url = https://ca.example.com:8443
timeout = 5

[agent]
group = Agents
"#
        )
        .unwrap();
        let sot = Config::new(cfg.path().to_path_buf()).unwrap();
        assert!(sot.default.debug);
        assert_eq!(vec!["UserDirEnrollment", "TokenAuth"], sot.auth.methods);
        assert_eq!("memory", sot.audit.driver);
        assert_eq!(vec!["AUTH", "PROFILE_CERT_REQUEST"], sot.audit.signed_events);
        assert_eq!("ou=people,o=example", sot.directory.get_user_base_dn());
        assert!(!sot.directory.remove_pin);
        assert_eq!(Some("cn=Directory Manager".into()), sot.directory.bind_dn);
        assert_eq!(PathBuf::from("/srv/profiles"), sot.profile.directory);
        assert!(sot.profile.strict_populate);
        assert_eq!(
            "ca.example.com",
            sot.token_auth.url.as_ref().unwrap().host_str().unwrap()
        );
        assert_eq!(5, sot.token_auth.timeout);
        assert_eq!("Agents", sot.agent.group);
    }
}
