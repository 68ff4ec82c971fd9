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
//! # Localized messages
//!
//! Policy components describe themselves and report errors through message
//! keys. The keys are resolved against the catalog of the requested locale
//! with a fallback to English and finally to the key itself.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Requested locale (BCP 47 language tag).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Locale(String);

impl Locale {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        Self(tag.into())
    }

    /// Primary language subtag (`en` for `en-US`).
    pub fn language(&self) -> &str {
        self.0
            .split(['-', '_'])
            .next()
            .filter(|lang| !lang.is_empty())
            .unwrap_or("en")
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self("en".into())
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static EN: &[(&str, &str)] = &[
    // Defaults
    ("CMS_PROFILE_DEF_NO_DEFAULT", "No Default"),
    ("CMS_PROFILE_DEF_NO_DEFAULT_TEXT", "This default populates nothing."),
    ("CMS_PROFILE_DEF_USER_SUBJECT_NAME", "User Supplied Subject Name Default"),
    (
        "CMS_PROFILE_DEF_USER_SUBJECT_NAME_TEXT",
        "This default populates a User-Supplied Certificate Subject Name to the request.",
    ),
    ("CMS_PROFILE_DEF_SUBJECT_NAME", "Subject Name Default"),
    (
        "CMS_PROFILE_DEF_SUBJECT_NAME_TEXT",
        "This default populates a Certificate Subject Name to the request. The default values are Subject Name={0}",
    ),
    ("CMS_PROFILE_DEF_AUTHTOKEN_SUBJECT_NAME", "Authentication Token Subject Name Default"),
    (
        "CMS_PROFILE_DEF_AUTHTOKEN_SUBJECT_NAME_TEXT",
        "This default populates a Certificate Subject Name from the authentication token.",
    ),
    ("CMS_PROFILE_DEF_USER_KEY", "User Supplied Key Default"),
    (
        "CMS_PROFILE_DEF_USER_KEY_TEXT",
        "This default populates a User-Supplied Certificate Key to the request.",
    ),
    ("CMS_PROFILE_DEF_VALIDITY", "Validity Default"),
    (
        "CMS_PROFILE_DEF_VALIDITY_TEXT",
        "This default populates a Certificate Validity to the request. The default values are Range={0} in days",
    ),
    ("CMS_PROFILE_DEF_KEY_USAGE_EXT", "Key Usage Default"),
    (
        "CMS_PROFILE_DEF_KEY_USAGE_EXT_TEXT",
        "This default populates a Key Usage Extension ({0}) to the request.",
    ),
    ("CMS_PROFILE_DEF_EXTENDED_KEY_USAGE_EXT", "Extended Key Usage Extension Default"),
    (
        "CMS_PROFILE_DEF_EXTENDED_KEY_USAGE_EXT_TEXT",
        "This default populates an Extended Key Usage Extension ({0}) to the request.",
    ),
    ("CMS_PROFILE_DEF_SIGNING_ALGORITHM", "Signing Algorithm Default"),
    (
        "CMS_PROFILE_DEF_SIGNING_ALGORITHM_TEXT",
        "This default populates the Certificate Signing Algorithm. The default values are Algorithm={0}",
    ),
    // Constraints
    ("CMS_PROFILE_CONSTRAINT_NO_CONSTRAINT", "No Constraint"),
    ("CMS_PROFILE_CONSTRAINT_NO_CONSTRAINT_TEXT", "No Constraints"),
    ("CMS_PROFILE_CONSTRAINT_KEY", "Key Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_KEY_TEXT",
        "This constraint accepts the key only if Key Type={0}, Key Parameters={1}",
    ),
    ("CMS_PROFILE_CONSTRAINT_VALIDITY", "Validity Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_VALIDITY_TEXT",
        "This constraint rejects the validity that is not between {0} days.",
    ),
    ("CMS_PROFILE_CONSTRAINT_SUBJECT_NAME", "Subject Name Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_SUBJECT_NAME_TEXT",
        "This constraint accepts the subject name that matches {0}",
    ),
    ("CMS_PROFILE_CONSTRAINT_SIGNING_ALG", "Signing Algorithm Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_SIGNING_ALG_TEXT",
        "This constraint accepts only the Signing Algorithms of {0}",
    ),
    ("CMS_PROFILE_CONSTRAINT_POP", "Proof of Possession Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_POP_TEXT",
        "This constraint requires a proof of possession of the private key.",
    ),
    ("CMS_PROFILE_CONSTRAINT_AGENT_APPROVAL", "Agent Approval Constraint"),
    (
        "CMS_PROFILE_CONSTRAINT_AGENT_APPROVAL_TEXT",
        "This constraint requires approval by {0} agent(s).",
    ),
    // Inputs
    ("CMS_PROFILE_INPUT_CERT_REQ", "Certificate Request Input"),
    (
        "CMS_PROFILE_INPUT_CERT_REQ_TEXT",
        "Certificate Request Input",
    ),
    ("CMS_PROFILE_INPUT_SUBJECT_NAME", "Subject Name Input"),
    ("CMS_PROFILE_INPUT_SUBJECT_NAME_TEXT", "Subject Name"),
    ("CMS_PROFILE_INPUT_SUBMITTER", "Requestor Information"),
    ("CMS_PROFILE_INPUT_SUBMITTER_TEXT", "Requestor Information"),
    ("CMS_PROFILE_INPUT_GENERIC", "Generic Input"),
    ("CMS_PROFILE_INPUT_GENERIC_TEXT", "Generic Input"),
    // Outputs
    ("CMS_PROFILE_OUTPUT_CERT", "Certificate Output"),
    ("CMS_PROFILE_OUTPUT_CERT_TEXT", "This output returns the issued certificate."),
    ("CMS_PROFILE_OUTPUT_STATUS", "Submission Status Output"),
    (
        "CMS_PROFILE_OUTPUT_STATUS_TEXT",
        "This output returns the status of the submitted request.",
    ),
    // Value names
    ("CMS_PROFILE_SUBJECT_NAME", "Subject Name"),
    ("CMS_PROFILE_SUBJECT_NAME_PATTERN", "Subject Name Pattern"),
    ("CMS_PROFILE_KEY_TYPE", "Key Type"),
    ("CMS_PROFILE_KEY_PARAMETERS", "Key Parameters"),
    ("CMS_PROFILE_KEY_LEN", "Key Length"),
    ("CMS_PROFILE_PUBLIC_KEY", "Public Key"),
    ("CMS_PROFILE_NOT_BEFORE", "Not Before"),
    ("CMS_PROFILE_NOT_AFTER", "Not After"),
    ("CMS_PROFILE_VALIDITY_RANGE", "Validity Range (in days)"),
    ("CMS_PROFILE_VALIDITY_START_TIME", "Start Time Offset (in seconds)"),
    ("CMS_PROFILE_KEY_USAGE", "Key Usage"),
    ("CMS_PROFILE_KEY_USAGE_FROM_KEY_TYPE", "Derive Key Usage From Key Type"),
    ("CMS_PROFILE_EXT_KEY_USAGE_OIDS", "Extended Key Usage OIDs"),
    ("CMS_PROFILE_SIGNING_ALGORITHM", "Signing Algorithm"),
    ("CMS_PROFILE_SIGNING_ALGORITHMS_ALLOWED", "Allowed Signing Algorithms"),
    ("CMS_PROFILE_POP_DEFER", "Defer When Proof Is Missing"),
    ("CMS_PROFILE_APPROVALS", "Required Agent Approvals"),
    ("CMS_PROFILE_CERT_REQUEST_TYPE", "Certificate Request Type"),
    ("CMS_PROFILE_CERT_REQUEST", "Certificate Request"),
    ("CMS_PROFILE_UID", "UID"),
    ("CMS_PROFILE_EMAIL", "Email"),
    ("CMS_PROFILE_CN", "Common Name"),
    ("CMS_PROFILE_OU", "Organizational Unit"),
    ("CMS_PROFILE_O", "Organization"),
    ("CMS_PROFILE_C", "Country"),
    ("CMS_PROFILE_REQUESTOR_NAME", "Requestor Name"),
    ("CMS_PROFILE_REQUESTOR_EMAIL", "Requestor Email"),
    ("CMS_PROFILE_REQUESTOR_PHONE", "Requestor Phone"),
    ("CMS_PROFILE_GENERIC_FIELD", "Generic Field {0}"),
    ("CMS_PROFILE_SERIAL_NUMBER", "Serial Number"),
    ("CMS_PROFILE_CERTIFICATE", "Certificate Base-64 Encoding"),
    ("CMS_PROFILE_FINGERPRINT", "Certificate Fingerprint"),
    ("CMS_PROFILE_REQUEST_ID", "Request ID"),
    ("CMS_PROFILE_REQUEST_STATUS", "Request Status"),
    ("CMS_PROFILE_REASON", "Reason"),
    // Errors
    ("CMS_INVALID_PROPERTY", "Invalid property {0}"),
    ("CMS_BAD_VALUE", "Invalid value for {0}: {1}"),
    ("CMS_PROFILE_FIELD_NOT_FOUND", "Request field {0} not found"),
    ("CMS_PROFILE_SUBJECT_NAME_NOT_FOUND", "Subject name not found"),
    ("CMS_PROFILE_SUBJECT_NAME_NOT_MATCHED", "Subject Name Not Matched {0}"),
    ("CMS_PROFILE_KEY_NOT_FOUND", "Key not found"),
    ("CMS_PROFILE_KEY_TYPE_NOT_MATCHED", "Key Type {0} Not Matched"),
    ("CMS_PROFILE_KEY_PARAMS_NOT_MATCHED", "Key Parameter {0} Not Matched"),
    ("CMS_PROFILE_VALIDITY_NOT_FOUND", "Validity not found"),
    ("CMS_PROFILE_VALIDITY_OUT_OF_RANGE", "Validity Out of Range {0} days"),
    ("CMS_PROFILE_VALIDITY_INVALID", "Not After precedes Not Before"),
    (
        "CMS_PROFILE_SIGNING_ALGORITHM_NOT_MATCHED",
        "Signing Algorithm Not Matched ({0})",
    ),
    ("CMS_PROFILE_POP_MISSING", "Proof of possession is required"),
    ("CMS_PROFILE_POP_FAILED", "Proof of possession verification failed"),
    (
        "CMS_PROFILE_AGENT_APPROVAL_REQUIRED",
        "Request requires {0} agent approval(s), {1} received",
    ),
    ("CMS_PROFILE_UNKNOWN_KEY_TYPE", "Key usage cannot be derived from key type {0}"),
    ("CMS_PROFILE_AUTH_TOKEN_FIELD_NOT_FOUND", "Authentication token field {0} not found"),
    ("CMS_PROFILE_MISSING_INPUT", "Required input {0} is missing"),
    ("CMS_PROFILE_INVALID_REQUEST", "Invalid certificate request: {0}"),
];

fn catalog(language: &str) -> Option<&'static [(&'static str, &'static str)]> {
    match language {
        "en" => Some(EN),
        _ => None,
    }
}

fn lookup(language: &str, key: &str) -> Option<&'static str> {
    catalog(language).and_then(|entries| {
        entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, text)| *text)
    })
}

/// Resolve the message key for the locale.
pub fn message(locale: &Locale, key: &str) -> String {
    lookup(locale.language(), key)
        .or_else(|| lookup("en", key))
        .map(Into::into)
        .unwrap_or_else(|| key.to_string())
}

/// Resolve the message key and substitute `{n}` placeholders with `args`.
pub fn format_message<S: AsRef<str>>(locale: &Locale, key: &str, args: &[S]) -> String {
    let mut text = message(locale, key);
    for (idx, arg) in args.iter().enumerate() {
        text = text.replace(&format!("{{{idx}}}"), arg.as_ref());
    }
    text
}
