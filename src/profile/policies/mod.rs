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
//! # Built-in policy components
//!
//! Class ids follow the names used in the profile configuration files.
use crate::profile::policy::{ConstraintPolicy, DefaultPolicy, InputPolicy, OutputPolicy};

pub mod constraints;
pub mod defaults;
pub mod inputs;
pub mod outputs;

pub use constraints::*;
pub use defaults::*;
pub use inputs::*;
pub use outputs::*;

type Builtin<T> = (&'static str, fn() -> Box<T>);

pub(crate) const DEFAULTS: &[Builtin<dyn DefaultPolicy>] = &[
    ("noDefaultImpl", || Box::new(NoDefault)),
    ("userSubjectNameDefaultImpl", || Box::new(UserSubjectNameDefault)),
    ("subjectNameDefaultImpl", || Box::<SubjectNameDefault>::default()),
    ("authTokenSubjectNameDefaultImpl", || {
        Box::<AuthTokenSubjectNameDefault>::default()
    }),
    ("userKeyDefaultImpl", || Box::new(UserKeyDefault)),
    ("validityDefaultImpl", || Box::<ValidityDefault>::default()),
    ("keyUsageExtDefaultImpl", || Box::<KeyUsageExtDefault>::default()),
    ("extendedKeyUsageExtDefaultImpl", || {
        Box::<ExtendedKeyUsageExtDefault>::default()
    }),
    ("signingAlgDefaultImpl", || Box::<SigningAlgDefault>::default()),
];

pub(crate) const CONSTRAINTS: &[Builtin<dyn ConstraintPolicy>] = &[
    ("noConstraintImpl", || Box::new(NoConstraint)),
    ("keyConstraintImpl", || Box::<KeyConstraint>::default()),
    ("validityConstraintImpl", || Box::<ValidityConstraint>::default()),
    ("subjectNameConstraintImpl", || {
        Box::<SubjectNameConstraint>::default()
    }),
    ("signingAlgConstraintImpl", || Box::<SigningAlgConstraint>::default()),
    ("proofOfPossessionConstraintImpl", || {
        Box::<ProofOfPossessionConstraint>::default()
    }),
    ("agentApprovalConstraintImpl", || {
        Box::<AgentApprovalConstraint>::default()
    }),
];

pub(crate) const INPUTS: &[Builtin<dyn InputPolicy>] = &[
    ("certReqInputImpl", || Box::new(CertReqInput)),
    ("subjectNameInputImpl", || Box::new(SubjectNameInput)),
    ("submitterInfoInputImpl", || Box::new(SubmitterInfoInput)),
    ("genericInputImpl", || Box::<GenericInput>::default()),
];

pub(crate) const OUTPUTS: &[Builtin<dyn OutputPolicy>] = &[
    ("certOutputImpl", || Box::new(CertOutput)),
    ("submitStatusOutputImpl", || Box::new(SubmitStatusOutput)),
];
