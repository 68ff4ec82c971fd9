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
//! # Profile configuration
//!
//! Parses the legacy flat profile file:
//!
//! ```text
//! profileId=caServerCert
//! name=Server Certificate Enrollment
//! enable=true
//! auth.instance_id=UserDirEnrollment
//! input.list=i1
//! input.i1.class_id=certReqInputImpl
//! output.list=o1
//! output.o1.class_id=certOutputImpl
//! policyset.list=serverCertSet
//! policyset.serverCertSet.list=1
//! policyset.serverCertSet.1.default.class_id=userSubjectNameDefaultImpl
//! policyset.serverCertSet.1.constraint.class_id=subjectNameConstraintImpl
//! policyset.serverCertSet.1.constraint.params.pattern=CN=.*
//! ```
use std::path::Path;

use crate::common::Properties;
use crate::profile::error::ProfileError;

/// Declaration of a single policy component.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentConfig {
    pub id: String,
    pub class_id: String,
    pub name: Option<String>,
    pub params: Properties,
}

/// Default and constraint bound to one policy id.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyConfig {
    pub id: String,
    pub default: ComponentConfig,
    pub constraint: ComponentConfig,
}

/// Policy set selection rule `<field>:<value>`.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchRule {
    pub field: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicySetConfig {
    pub id: String,
    pub match_rule: Option<MatchRule>,
    pub policies: Vec<PolicyConfig>,
}

/// Parsed profile file.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    pub visible: bool,
    pub enabled: bool,
    pub enabled_by: Option<String>,
    pub renewal: bool,
    pub auth_instance_id: Option<String>,
    pub inputs: Vec<ComponentConfig>,
    pub outputs: Vec<ComponentConfig>,
    pub policy_sets: Vec<PolicySetConfig>,
}

fn component(props: &Properties, prefix: &str, id: &str) -> Result<ComponentConfig, ProfileError> {
    let class_id = props
        .get_non_empty(&format!("{prefix}.class_id"))
        .ok_or_else(|| ProfileError::InvalidConfig(format!("{prefix}.class_id is not set")))?;
    Ok(ComponentConfig {
        id: id.to_string(),
        class_id: class_id.to_string(),
        name: props.get_non_empty(&format!("{prefix}.name")).map(Into::into),
        params: props.sub_store(&format!("{prefix}.params")),
    })
}

fn components(props: &Properties, family: &str) -> Result<Vec<ComponentConfig>, ProfileError> {
    props
        .list(&format!("{family}.list"))
        .iter()
        .map(|id| component(props, &format!("{family}.{id}"), id))
        .collect()
}

impl ProfileConfig {
    /// Parse the profile file content. The profile id falls back to
    /// `default_id` (the file stem) when `profileId` is absent.
    pub fn parse(input: &str, default_id: Option<&str>) -> Result<Self, ProfileError> {
        Self::from_properties(&Properties::parse(input)?, default_id)
    }

    pub fn from_properties(
        props: &Properties,
        default_id: Option<&str>,
    ) -> Result<Self, ProfileError> {
        let id = props
            .get_non_empty("profileId")
            .or(default_id)
            .ok_or_else(|| ProfileError::InvalidConfig("profileId is not set".into()))?
            .to_string();

        let mut policy_sets = Vec::new();
        for set_id in props.list("policyset.list") {
            let prefix = format!("policyset.{set_id}");
            let match_rule = props
                .get_non_empty(&format!("{prefix}.match"))
                .map(|rule| {
                    rule.split_once(':')
                        .map(|(field, value)| MatchRule {
                            field: field.trim().to_string(),
                            value: value.trim().to_string(),
                        })
                        .ok_or_else(|| {
                            ProfileError::InvalidConfig(format!(
                                "{prefix}.match must be <field>:<value>"
                            ))
                        })
                })
                .transpose()?;
            let mut policies = Vec::new();
            for policy_id in props.list(&format!("{prefix}.list")) {
                let policy_prefix = format!("{prefix}.{policy_id}");
                policies.push(PolicyConfig {
                    default: component(props, &format!("{policy_prefix}.default"), &policy_id)?,
                    constraint: component(
                        props,
                        &format!("{policy_prefix}.constraint"),
                        &policy_id,
                    )?,
                    id: policy_id,
                });
            }
            policy_sets.push(PolicySetConfig {
                id: set_id,
                match_rule,
                policies,
            });
        }
        if policy_sets.is_empty() {
            return Err(ProfileError::InvalidConfig(format!(
                "profile {id} declares no policy set"
            )));
        }

        Ok(Self {
            name: props.get("name").unwrap_or(&id).to_string(),
            description: props.get("desc").unwrap_or_default().to_string(),
            visible: props.get_bool("visible", true)?,
            enabled: props.get_bool("enable", false)?,
            enabled_by: props.get_non_empty("enableBy").map(Into::into),
            renewal: props.get_bool("renewal", false)?,
            auth_instance_id: props.get_non_empty("auth.instance_id").map(Into::into),
            inputs: components(props, "input")?,
            outputs: components(props, "output")?,
            policy_sets,
            id,
        })
    }

    /// Read the profile file.
    pub async fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProfileError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::parse(&content, path.file_stem().and_then(|stem| stem.to_str()))
    }
}
