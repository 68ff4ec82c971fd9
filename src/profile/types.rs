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
use std::fmt;

use crate::issuer::IssuedCertificate;
use crate::profile::policy::{Descriptor, PolicyFamily};

/// Result of a submission or resumption.
#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// Certificate issued, the request is complete.
    Completed(IssuedCertificate),
    /// Constraint rejected the request.
    Rejected(String),
    /// Request is pending until more data or approvals arrive.
    Deferred(String),
}

impl SubmitOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Policy component that could not be loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedPolicy {
    pub family: PolicyFamily,
    /// Policy set of a default or constraint.
    pub policy_set: Option<String>,
    pub policy_id: String,
    pub class_id: String,
    pub reason: String,
}

impl fmt::Display for SkippedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.policy_set {
            Some(set) => write!(f, "{}.{}", set, self.policy_id)?,
            None => write!(f, "{}", self.policy_id)?,
        }
        write!(
            f,
            " ({} {}): {}",
            self.family, self.class_id, self.reason
        )
    }
}

/// Default policy failure tolerated by the lenient populate.
#[derive(Clone, Debug, PartialEq)]
pub struct PopulateFailure {
    pub policy_id: String,
    pub reason: String,
}

impl fmt::Display for PopulateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.policy_id, self.reason)
    }
}

/// Request value managed by a default policy.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestValue {
    pub policy_id: String,
    pub name: String,
    pub descriptor: Descriptor,
    pub value: Option<String>,
}

/// Localized description of a policy component.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentDescription {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub text: String,
    /// Configuration parameters with their current values.
    pub config: Vec<(String, Descriptor, Option<String>)>,
    /// Request or context values.
    pub values: Vec<(String, Descriptor)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicyDescription {
    pub id: String,
    pub default: ComponentDescription,
    pub constraint: ComponentDescription,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicySetDescription {
    pub id: String,
    pub match_rule: Option<String>,
    pub policies: Vec<PolicyDescription>,
}

/// Localized description of a profile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileDescription {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub visible: bool,
    pub renewal: bool,
    pub auth_instance_id: Option<String>,
    pub inputs: Vec<ComponentDescription>,
    pub policy_sets: Vec<PolicySetDescription>,
    pub outputs: Vec<ComponentDescription>,
    pub skipped: Vec<SkippedPolicy>,
}
