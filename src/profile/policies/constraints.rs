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
//! Built-in constraint policies.
use std::collections::BTreeSet;

use chrono::TimeDelta;
use regex::Regex;

use crate::common::Locale;
use crate::common::i18n::format_message;
use crate::profile::error::PolicyError;
use crate::profile::policy::*;
use crate::request::types::{Request, RequestField};

/// Value accepting any key type.
pub const ANY_KEY_TYPE: &str = "-";

fn rejected(locale: &Locale, key: &str, args: &[&str]) -> ValidationOutcome {
    ValidationOutcome::Rejected(format_message(locale, key, args))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Into::into)
        .collect()
}

/// Accepts everything.
#[derive(Debug, Default)]
pub struct NoConstraint;

impl PolicyComponent for NoConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_NO_CONSTRAINT"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_NO_CONSTRAINT_TEXT"
    }
}

impl ConstraintPolicy for NoConstraint {
    fn validate(&self, _locale: &Locale, _request: &Request) -> ValidationOutcome {
        ValidationOutcome::Passed
    }
}

/// Restricts the key type and the key sizes.
#[derive(Debug)]
pub struct KeyConstraint {
    key_type: String,
    key_sizes: Vec<i64>,
}

impl Default for KeyConstraint {
    fn default() -> Self {
        Self {
            key_type: ANY_KEY_TYPE.into(),
            key_sizes: Vec::new(),
        }
    }
}

impl PolicyComponent for KeyConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_KEY"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_KEY_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![
            self.key_type.clone(),
            self.key_sizes
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[
            ValueSpec::new("keyType", Syntax::Choice, "CMS_PROFILE_KEY_TYPE")
                .constraint("-,RSA,EC")
                .default_value(ANY_KEY_TYPE),
            ValueSpec::new("keyParameters", Syntax::StringList, "CMS_PROFILE_KEY_PARAMETERS"),
        ];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        match name {
            "keyType" => Some(self.key_type.clone()),
            "keyParameters" => Some(self.text_args().remove(1)),
            _ => None,
        }
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match name {
            "keyType" => self.key_type = value.trim().to_ascii_uppercase(),
            "keyParameters" => {
                self.key_sizes = split_csv(value)
                    .iter()
                    .map(|size| size.parse::<i64>().map_err(|_| bad_value(locale, name, size)))
                    .collect::<Result<_, _>>()?;
            }
            other => return Err(bad_value(locale, other, value)),
        }
        Ok(())
    }
}

impl ConstraintPolicy for KeyConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        let Some(key_type) = request
            .get_text(RequestField::CertKeyType)
            .or_else(|| request.get_text(RequestField::RequestKeyType))
        else {
            return rejected(locale, "CMS_PROFILE_KEY_NOT_FOUND", &[]);
        };
        if self.key_type != ANY_KEY_TYPE && !key_type.eq_ignore_ascii_case(&self.key_type) {
            return rejected(locale, "CMS_PROFILE_KEY_TYPE_NOT_MATCHED", &[key_type]);
        }
        if !self.key_sizes.is_empty() {
            let size = request
                .get_integer(RequestField::CertKeySize)
                .or_else(|| request.get_integer(RequestField::RequestKeySize));
            match size {
                Some(size) if self.key_sizes.contains(&size) => {}
                Some(size) => {
                    return rejected(
                        locale,
                        "CMS_PROFILE_KEY_PARAMS_NOT_MATCHED",
                        &[&size.to_string()],
                    );
                }
                None => return rejected(locale, "CMS_PROFILE_KEY_NOT_FOUND", &[]),
            }
        }
        ValidationOutcome::Passed
    }
}

/// Restricts the length of the validity period.
#[derive(Debug)]
pub struct ValidityConstraint {
    range_days: i64,
}

impl Default for ValidityConstraint {
    fn default() -> Self {
        Self { range_days: 365 }
    }
}

impl PolicyComponent for ValidityConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_VALIDITY"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_VALIDITY_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.range_days.to_string()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "range",
            Syntax::Integer,
            "CMS_PROFILE_VALIDITY_RANGE",
        )
        .default_value("365")];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "range").then(|| self.range_days.to_string())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match (name, value.trim().parse::<i64>()) {
            ("range", Ok(range)) if range > 0 && TimeDelta::try_days(range).is_some() => {
                self.range_days = range;
                Ok(())
            }
            _ => Err(bad_value(locale, name, value)),
        }
    }
}

impl ConstraintPolicy for ValidityConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        let (Some(not_before), Some(not_after)) = (
            request.get_time(RequestField::CertNotBefore),
            request.get_time(RequestField::CertNotAfter),
        ) else {
            return rejected(locale, "CMS_PROFILE_VALIDITY_NOT_FOUND", &[]);
        };
        if not_after <= not_before {
            return rejected(locale, "CMS_PROFILE_VALIDITY_INVALID", &[]);
        }
        if TimeDelta::try_days(self.range_days)
            .is_none_or(|range| not_after - not_before > range)
        {
            return rejected(
                locale,
                "CMS_PROFILE_VALIDITY_OUT_OF_RANGE",
                &[&self.range_days.to_string()],
            );
        }
        ValidationOutcome::Passed
    }
}

/// Accepts subject names fully matching the pattern.
#[derive(Debug, Default)]
pub struct SubjectNameConstraint {
    pattern: Option<Regex>,
}

impl PolicyComponent for SubjectNameConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_SUBJECT_NAME"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_SUBJECT_NAME_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.get_config("pattern").unwrap_or_default()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "pattern",
            Syntax::String,
            "CMS_PROFILE_SUBJECT_NAME_PATTERN",
        )
        .required()];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        match name {
            "pattern" => self.pattern.as_ref().map(|re| {
                re.as_str()
                    .trim_start_matches("^(?:")
                    .trim_end_matches(")$")
                    .to_string()
            }),
            _ => None,
        }
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        if name != "pattern" {
            return Err(bad_value(locale, name, value));
        }
        self.pattern = Some(
            Regex::new(&format!("^(?:{})$", value.trim()))
                .map_err(|_| bad_value(locale, name, value))?,
        );
        Ok(())
    }
}

impl ConstraintPolicy for SubjectNameConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        let Some(subject) = request
            .get_text(RequestField::CertSubject)
            .filter(|val| !val.is_empty())
        else {
            return rejected(locale, "CMS_PROFILE_SUBJECT_NAME_NOT_FOUND", &[]);
        };
        match &self.pattern {
            Some(re) if re.is_match(subject) => ValidationOutcome::Passed,
            _ => rejected(locale, "CMS_PROFILE_SUBJECT_NAME_NOT_MATCHED", &[subject]),
        }
    }
}

const DEFAULT_SIGNING_ALGS: &str =
    "SHA256withRSA,SHA384withRSA,SHA512withRSA,SHA256withEC,SHA384withEC,SHA512withEC";

/// Restricts the signing algorithm.
#[derive(Debug)]
pub struct SigningAlgConstraint {
    allowed: Vec<String>,
}

impl Default for SigningAlgConstraint {
    fn default() -> Self {
        Self {
            allowed: split_csv(DEFAULT_SIGNING_ALGS),
        }
    }
}

impl PolicyComponent for SigningAlgConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_SIGNING_ALG"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_SIGNING_ALG_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.allowed.join(",")]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "signingAlgsAllowed",
            Syntax::StringList,
            "CMS_PROFILE_SIGNING_ALGORITHMS_ALLOWED",
        )
        .default_value(DEFAULT_SIGNING_ALGS)];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "signingAlgsAllowed").then(|| self.allowed.join(","))
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        let allowed = split_csv(value);
        if name != "signingAlgsAllowed" || allowed.is_empty() {
            return Err(bad_value(locale, name, value));
        }
        self.allowed = allowed;
        Ok(())
    }
}

impl ConstraintPolicy for SigningAlgConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        let algorithm = request
            .get_text(RequestField::CertSigningAlg)
            .unwrap_or_default();
        if self.allowed.iter().any(|alg| alg == algorithm) {
            ValidationOutcome::Passed
        } else {
            rejected(
                locale,
                "CMS_PROFILE_SIGNING_ALGORITHM_NOT_MATCHED",
                &[algorithm],
            )
        }
    }
}

/// POP status recorded for a proof that failed verification.
pub const POP_FAILED: &str = "failed";

/// Requires a verified proof of possession of the private key.
#[derive(Debug)]
pub struct ProofOfPossessionConstraint {
    defer: bool,
}

impl Default for ProofOfPossessionConstraint {
    fn default() -> Self {
        Self { defer: true }
    }
}

impl PolicyComponent for ProofOfPossessionConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_POP"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_POP_TEXT"
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] =
            &[ValueSpec::new("defer", Syntax::Boolean, "CMS_PROFILE_POP_DEFER").default_value("true")];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "defer").then(|| self.defer.to_string())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match (name, parse_bool(value)) {
            ("defer", Some(flag)) => {
                self.defer = flag;
                Ok(())
            }
            _ => Err(bad_value(locale, name, value)),
        }
    }
}

impl ConstraintPolicy for ProofOfPossessionConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        if request.pop_verified() {
            return ValidationOutcome::Passed;
        }
        if request.get_text(RequestField::PopStatus) == Some(POP_FAILED) {
            return rejected(locale, "CMS_PROFILE_POP_FAILED", &[]);
        }
        let reason = format_message::<&str>(locale, "CMS_PROFILE_POP_MISSING", &[]);
        if self.defer {
            ValidationOutcome::Deferred(reason)
        } else {
            ValidationOutcome::Rejected(reason)
        }
    }
}

/// Defers the request until enough distinct agents approved it.
#[derive(Debug)]
pub struct AgentApprovalConstraint {
    approvals: usize,
}

impl Default for AgentApprovalConstraint {
    fn default() -> Self {
        Self { approvals: 1 }
    }
}

impl PolicyComponent for AgentApprovalConstraint {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_AGENT_APPROVAL"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_CONSTRAINT_AGENT_APPROVAL_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.approvals.to_string()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "approvals",
            Syntax::Integer,
            "CMS_PROFILE_APPROVALS",
        )
        .default_value("1")];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "approvals").then(|| self.approvals.to_string())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match (name, value.trim().parse::<usize>()) {
            ("approvals", Ok(count)) if count > 0 => {
                self.approvals = count;
                Ok(())
            }
            _ => Err(bad_value(locale, name, value)),
        }
    }
}

impl ConstraintPolicy for AgentApprovalConstraint {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome {
        let received = request
            .get_list(RequestField::AgentApprovals)
            .iter()
            .collect::<BTreeSet<_>>()
            .len();
        if received >= self.approvals {
            ValidationOutcome::Passed
        } else {
            ValidationOutcome::Deferred(format_message(
                locale,
                "CMS_PROFILE_AGENT_APPROVAL_REQUIRED",
                &[self.approvals.to_string(), received.to_string()],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Properties;
    use crate::request::types::{POP_VERIFIED, RequestId};

    fn init<P: PolicyComponent>(mut policy: P, params: &[(&str, &str)]) -> P {
        policy
            .init(&params.iter().copied().collect::<Properties>())
            .unwrap();
        policy
    }

    #[test]
    fn test_key_constraint() {
        let locale = Locale::default();
        let policy = init(
            KeyConstraint::default(),
            &[("keyType", "RSA"), ("keyParameters", "2048,3072,4096")],
        );
        let mut req = Request::new(RequestId(1));
        assert_eq!(
            ValidationOutcome::Rejected("Key not found".into()),
            policy.validate(&locale, &req)
        );
        req.set(RequestField::CertKeyType, "RSA");
        req.set(RequestField::CertKeySize, 1024i64);
        assert_eq!(
            ValidationOutcome::Rejected("Key Parameter 1024 Not Matched".into()),
            policy.validate(&locale, &req)
        );
        req.set(RequestField::CertKeySize, 2048i64);
        assert!(policy.validate(&locale, &req).is_passed());
        req.set(RequestField::CertKeyType, "EC");
        assert_eq!(
            ValidationOutcome::Rejected("Key Type EC Not Matched".into()),
            policy.validate(&locale, &req)
        );
        assert_eq!(Some("2048,3072,4096".into()), policy.get_config("keyParameters"));
    }

    #[test]
    fn test_key_constraint_bad_config() {
        let mut policy = KeyConstraint::default();
        assert!(
            policy
                .init(&[("keyType", "DSA")].into_iter().collect::<Properties>())
                .is_err()
        );
        assert!(
            policy
                .init(&[("keyParameters", "big")].into_iter().collect::<Properties>())
                .is_err()
        );
    }

    #[test]
    fn test_validity_constraint() {
        let locale = Locale::default();
        let policy = init(ValidityConstraint::default(), &[("range", "30")]);
        let mut req = Request::new(RequestId(1));
        assert_eq!(
            ValidationOutcome::Rejected("Validity not found".into()),
            policy.validate(&locale, &req)
        );
        let now = req.created_at();
        req.set(RequestField::CertNotBefore, now);
        req.set(RequestField::CertNotAfter, now + TimeDelta::days(31));
        assert_eq!(
            ValidationOutcome::Rejected("Validity Out of Range 30 days".into()),
            policy.validate(&locale, &req)
        );
        req.set(RequestField::CertNotAfter, now - TimeDelta::days(1));
        assert_eq!(
            ValidationOutcome::Rejected("Not After precedes Not Before".into()),
            policy.validate(&locale, &req)
        );
        req.set(RequestField::CertNotAfter, now + TimeDelta::days(30));
        assert!(policy.validate(&locale, &req).is_passed());
    }

    #[test]
    fn test_validity_constraint_oversized_range() {
        let mut bad = ValidityConstraint::default();
        assert!(
            bad.init(&[("range", "999999999999999")].into_iter().collect::<Properties>())
                .is_err()
        );
        assert_eq!(Some("365".into()), bad.get_config("range"));

        let locale = Locale::default();
        let policy = init(ValidityConstraint::default(), &[("range", "99999999")]);
        let mut req = Request::new(RequestId(1));
        let now = req.created_at();
        req.set(RequestField::CertNotBefore, now);
        req.set(RequestField::CertNotAfter, now + TimeDelta::days(3650));
        assert!(policy.validate(&locale, &req).is_passed());
    }

    #[test]
    fn test_subject_name_constraint() {
        let locale = Locale::default();
        let policy = init(
            SubjectNameConstraint::default(),
            &[("pattern", "CN=[^,]+,O=Example")],
        );
        let mut req = Request::new(RequestId(1));
        req.set(RequestField::CertSubject, "CN=host,O=Example");
        assert!(policy.validate(&locale, &req).is_passed());
        req.set(RequestField::CertSubject, "CN=host,O=Example,C=US");
        assert_eq!(
            ValidationOutcome::Rejected("Subject Name Not Matched CN=host,O=Example,C=US".into()),
            policy.validate(&locale, &req)
        );
        assert_eq!(Some("CN=[^,]+,O=Example".into()), policy.get_config("pattern"));

        let mut bad = SubjectNameConstraint::default();
        assert!(
            bad.init(&[("pattern", "CN=(")].into_iter().collect::<Properties>())
                .is_err()
        );
    }

    #[test]
    fn test_signing_alg_constraint() {
        let locale = Locale::default();
        let policy = init(SigningAlgConstraint::default(), &[]);
        let mut req = Request::new(RequestId(1));
        req.set(RequestField::CertSigningAlg, "SHA256withRSA");
        assert!(policy.validate(&locale, &req).is_passed());
        req.set(RequestField::CertSigningAlg, "MD5withRSA");
        assert_eq!(
            ValidationOutcome::Rejected("Signing Algorithm Not Matched (MD5withRSA)".into()),
            policy.validate(&locale, &req)
        );
    }

    #[test]
    fn test_pop_constraint() {
        let locale = Locale::default();
        let deferring = init(ProofOfPossessionConstraint::default(), &[]);
        let strict = init(ProofOfPossessionConstraint::default(), &[("defer", "false")]);
        let mut req = Request::new(RequestId(1));
        assert_eq!(
            ValidationOutcome::Deferred("Proof of possession is required".into()),
            deferring.validate(&locale, &req)
        );
        assert_eq!(
            ValidationOutcome::Rejected("Proof of possession is required".into()),
            strict.validate(&locale, &req)
        );
        req.set(RequestField::PopStatus, POP_FAILED);
        assert_eq!(
            ValidationOutcome::Rejected("Proof of possession verification failed".into()),
            deferring.validate(&locale, &req)
        );
        req.set(RequestField::PopStatus, POP_VERIFIED);
        assert!(deferring.validate(&locale, &req).is_passed());
    }

    #[test]
    fn test_agent_approval_constraint() {
        let locale = Locale::default();
        let policy = init(AgentApprovalConstraint::default(), &[("approvals", "2")]);
        let mut req = Request::new(RequestId(1));
        req.set(
            RequestField::AgentApprovals,
            vec!["agent1".to_string(), "agent1".to_string()],
        );
        assert_eq!(
            ValidationOutcome::Deferred("Request requires 2 agent approval(s), 1 received".into()),
            policy.validate(&locale, &req)
        );
        req.set(
            RequestField::AgentApprovals,
            vec!["agent1".to_string(), "agent2".to_string()],
        );
        assert!(policy.validate(&locale, &req).is_passed());
    }

    #[test]
    fn test_no_constraint() {
        let locale = Locale::default();
        assert!(NoConstraint.validate(&locale, &Request::new(RequestId(1))).is_passed());
        assert_eq!("No Constraint", NoConstraint.name(&locale));
        assert!(NoConstraint.config_names().is_empty());
    }
}
