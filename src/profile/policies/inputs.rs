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
//! Built-in input policies.
use serde::{Deserialize, Serialize};

use crate::common::Locale;
use crate::common::i18n::format_message;
use crate::profile::error::PolicyError;
use crate::profile::policy::*;
use crate::request::types::{POP_VERIFIED, Request, RequestField};

/// Context key of the request type.
pub const CERT_REQUEST_TYPE: &str = "cert_request_type";
/// Context key of the encoded request.
pub const CERT_REQUEST: &str = "cert_request";
/// Context key carrying a proof of possession supplied on resumption.
pub const POP: &str = "pop";

pub const REQUEST_TYPE_PKCS10: &str = "pkcs10";
pub const REQUEST_TYPE_CRMF: &str = "crmf";

/// Decoded certificate request.
///
/// Signature and DER processing happen before the request reaches the
/// profile; the profile only sees the decoded descriptor.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CertRequestDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub key_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    /// Proof of possession carried by a CRMF message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop: Option<String>,
}

#[derive(Deserialize)]
struct CrmfSubmission {
    requests: Vec<CertRequestDescriptor>,
}

/// Submitted certificate requests with their request type.
#[derive(Clone, Debug, PartialEq)]
pub struct CertSubmission {
    pub request_type: String,
    pub requests: Vec<CertRequestDescriptor>,
}

fn invalid_request(locale: &Locale, reason: &str) -> PolicyError {
    PolicyError::InvalidValue(format_message(
        locale,
        "CMS_PROFILE_INVALID_REQUEST",
        &[reason],
    ))
}

fn missing_input(locale: &Locale, field: &str) -> InputFailure {
    InputFailure::new(
        field,
        PolicyError::MissingData(format_message(locale, "CMS_PROFILE_MISSING_INPUT", &[field])),
    )
}

/// Decode the submitted certificate requests. A PKCS#10 submission carries
/// exactly one request, a CRMF submission one or more.
///
/// Returns `None` when the context carries no request.
pub fn parse_submission(
    locale: &Locale,
    context: &InputContext,
) -> Result<Option<CertSubmission>, PolicyError> {
    let Some(raw) = context
        .get(CERT_REQUEST)
        .map(|val| val.trim())
        .filter(|val| !val.is_empty())
    else {
        return Ok(None);
    };
    let request_type = context
        .get(CERT_REQUEST_TYPE)
        .map(|val| val.trim().to_ascii_lowercase())
        .filter(|val| !val.is_empty())
        .unwrap_or_else(|| REQUEST_TYPE_PKCS10.into());
    let requests = match request_type.as_str() {
        REQUEST_TYPE_PKCS10 => vec![
            serde_json::from_str::<CertRequestDescriptor>(raw)
                .map_err(|err| invalid_request(locale, &err.to_string()))?,
        ],
        REQUEST_TYPE_CRMF => {
            serde_json::from_str::<CrmfSubmission>(raw)
                .map_err(|err| invalid_request(locale, &err.to_string()))?
                .requests
        }
        other => return Err(bad_value(locale, CERT_REQUEST_TYPE, other)),
    };
    if requests.is_empty() {
        return Err(invalid_request(locale, "no requests"));
    }
    if let Some(bad) = requests.iter().find(|req| req.key_type.trim().is_empty()) {
        return Err(invalid_request(
            locale,
            &format!("missing key type in {bad:?}"),
        ));
    }
    Ok(Some(CertSubmission {
        request_type,
        requests,
    }))
}

/// Stores the request descriptor in the request.
pub fn store_descriptor(
    request: &mut Request,
    request_type: &str,
    descriptor: &CertRequestDescriptor,
) -> Result<(), serde_json::Error> {
    request.set(RequestField::RequestType, request_type);
    request.set(RequestField::CertRequest, serde_json::to_string(descriptor)?);
    Ok(())
}

/// Decodes the certificate request into the request key and subject fields.
#[derive(Debug, Default)]
pub struct CertReqInput;

const CERT_REQ_VALUES: &[ValueSpec] = &[
    ValueSpec::new(CERT_REQUEST_TYPE, Syntax::Choice, "CMS_PROFILE_CERT_REQUEST_TYPE")
        .constraint("pkcs10,crmf")
        .default_value(REQUEST_TYPE_PKCS10),
    ValueSpec::new(CERT_REQUEST, Syntax::String, "CMS_PROFILE_CERT_REQUEST").required(),
    ValueSpec::new(POP, Syntax::String, "CMS_PROFILE_CERT_REQUEST"),
];

impl PolicyComponent for CertReqInput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_CERT_REQ"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_CERT_REQ_TEXT"
    }
}

impl InputPolicy for CertReqInput {
    fn value_names(&self) -> Vec<String> {
        CERT_REQ_VALUES.iter().map(|spec| spec.name.into()).collect()
    }

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        find_spec(CERT_REQ_VALUES, name).map(|spec| spec.descriptor(locale))
    }

    fn populate(
        &self,
        locale: &Locale,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), InputFailure> {
        if !request.contains(RequestField::CertRequest) {
            // Requests created outside of the profile carry the submission in
            // the context only.
            let submission = parse_submission(locale, context)
                .map_err(|err| InputFailure::new(CERT_REQUEST, err))?
                .ok_or_else(|| missing_input(locale, CERT_REQUEST))?;
            if let Some(first) = submission.requests.first() {
                store_descriptor(request, &submission.request_type, first).map_err(|err| {
                    InputFailure::new(CERT_REQUEST, invalid_request(locale, &err.to_string()))
                })?;
            }
        }
        let descriptor: CertRequestDescriptor = request
            .get_text(RequestField::CertRequest)
            .map(serde_json::from_str)
            .transpose()
            .map_err(|err| {
                InputFailure::new(CERT_REQUEST, invalid_request(locale, &err.to_string()))
            })?
            .ok_or_else(|| missing_input(locale, CERT_REQUEST))?;

        if let Some(subject) = descriptor.subject.as_deref().filter(|val| !val.is_empty()) {
            if !request.contains(RequestField::RequestSubjectName) {
                request.set(RequestField::RequestSubjectName, subject);
            }
        }
        request.set(
            RequestField::RequestKeyType,
            descriptor.key_type.trim().to_ascii_uppercase(),
        );
        if let Some(size) = descriptor.key_size {
            request.set(RequestField::RequestKeySize, size);
        }
        if let Some(key) = descriptor.public_key.as_deref() {
            request.set(RequestField::RequestPublicKey, key);
        }

        let supplied_pop = context
            .get(POP)
            .map(|val| !val.trim().is_empty())
            .unwrap_or(false);
        let self_signed = request.get_text(RequestField::RequestType) == Some(REQUEST_TYPE_PKCS10);
        let crmf_pop = descriptor
            .pop
            .as_deref()
            .map(|val| !val.is_empty())
            .unwrap_or(false);
        if supplied_pop || self_signed || crmf_pop {
            request.set(RequestField::PopStatus, POP_VERIFIED);
        }
        Ok(())
    }
}

/// Subject name components in DN order: (context key, attribute, label).
const SUBJECT_COMPONENTS: &[(&str, &str, &str)] = &[
    ("sn_uid", "UID", "CMS_PROFILE_UID"),
    ("sn_e", "E", "CMS_PROFILE_EMAIL"),
    ("sn_cn", "CN", "CMS_PROFILE_CN"),
    ("sn_ou", "OU", "CMS_PROFILE_OU"),
    ("sn_o", "O", "CMS_PROFILE_O"),
    ("sn_c", "C", "CMS_PROFILE_C"),
];

fn escape_rdn_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn check_email(locale: &Locale, field: &str, value: &str) -> Result<(), InputFailure> {
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(InputFailure::new(field, bad_value(locale, field, value))),
    }
}

/// Builds the requested subject name from its components.
#[derive(Debug, Default)]
pub struct SubjectNameInput;

impl PolicyComponent for SubjectNameInput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_SUBJECT_NAME"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_SUBJECT_NAME_TEXT"
    }
}

impl InputPolicy for SubjectNameInput {
    fn value_names(&self) -> Vec<String> {
        SUBJECT_COMPONENTS
            .iter()
            .map(|(key, _, _)| key.to_string())
            .collect()
    }

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        SUBJECT_COMPONENTS
            .iter()
            .find(|(key, _, _)| *key == name)
            .map(|(key, _, label)| ValueSpec::new(*key, Syntax::String, *label).descriptor(locale))
    }

    fn populate(
        &self,
        locale: &Locale,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), InputFailure> {
        let mut rdns = Vec::new();
        for (key, attr, _) in SUBJECT_COMPONENTS {
            let Some(value) = context
                .get(*key)
                .map(|val| val.trim())
                .filter(|val| !val.is_empty())
            else {
                continue;
            };
            if *key == "sn_e" {
                check_email(locale, key, value)?;
            }
            request.set_ext(*key, value);
            rdns.push(format!("{attr}={}", escape_rdn_value(value)));
        }
        if !rdns.is_empty() {
            request.set(RequestField::RequestSubjectName, rdns.join(","));
        }
        Ok(())
    }
}

/// Records the requestor contact information.
#[derive(Debug, Default)]
pub struct SubmitterInfoInput;

const SUBMITTER_FIELDS: &[(RequestField, &str)] = &[
    (RequestField::RequestorName, "CMS_PROFILE_REQUESTOR_NAME"),
    (RequestField::RequestorEmail, "CMS_PROFILE_REQUESTOR_EMAIL"),
    (RequestField::RequestorPhone, "CMS_PROFILE_REQUESTOR_PHONE"),
];

impl PolicyComponent for SubmitterInfoInput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_SUBMITTER"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_SUBMITTER_TEXT"
    }
}

impl InputPolicy for SubmitterInfoInput {
    fn value_names(&self) -> Vec<String> {
        SUBMITTER_FIELDS
            .iter()
            .map(|(field, _)| field.key().to_string())
            .collect()
    }

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        SUBMITTER_FIELDS
            .iter()
            .find(|(field, _)| field.key() == name)
            .map(|(field, label)| {
                ValueSpec::new(field.key(), Syntax::String, *label).descriptor(locale)
            })
    }

    fn populate(
        &self,
        locale: &Locale,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), InputFailure> {
        for (field, _) in SUBMITTER_FIELDS {
            let Some(value) = context
                .get(field.key())
                .map(|val| val.trim())
                .filter(|val| !val.is_empty())
            else {
                continue;
            };
            if *field == RequestField::RequestorEmail {
                check_email(locale, field.key(), value)?;
            }
            request.set(*field, value);
        }
        Ok(())
    }
}

/// Copies the configured free form fields into the request.
#[derive(Debug, Default)]
pub struct GenericInput {
    fields: Vec<String>,
}

impl PolicyComponent for GenericInput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_GENERIC"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_INPUT_GENERIC_TEXT"
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "fields",
            Syntax::StringList,
            "CMS_PROFILE_GENERIC_FIELD",
        )
        .required()];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "fields").then(|| self.fields.join(","))
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        let fields: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Into::into)
            .collect();
        if name != "fields" || fields.is_empty() {
            return Err(bad_value(locale, name, value));
        }
        self.fields = fields;
        Ok(())
    }
}

impl InputPolicy for GenericInput {
    fn value_names(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        self.fields.iter().any(|field| field == name).then(|| Descriptor {
            syntax: Syntax::String,
            constraint: None,
            label: format_message(locale, "CMS_PROFILE_GENERIC_FIELD", &[name]),
            default_value: None,
            required: false,
        })
    }

    fn populate(
        &self,
        _locale: &Locale,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), InputFailure> {
        for field in &self.fields {
            if let Some(value) = context.get(field) {
                request.set_ext(field.as_str(), value.trim());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Properties;
    use crate::request::types::RequestId;

    fn context(values: &[(&str, &str)]) -> InputContext {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_pkcs10() {
        let locale = Locale::default();
        let ctx = context(&[(
            CERT_REQUEST,
            r#"{"subject":"CN=host","key_type":"rsa","key_size":2048}"#,
        )]);
        let submission = parse_submission(&locale, &ctx).unwrap().unwrap();
        assert_eq!(REQUEST_TYPE_PKCS10, submission.request_type);
        assert_eq!(1, submission.requests.len());
        assert_eq!(Some(2048), submission.requests[0].key_size);
        assert_eq!(None, parse_submission(&locale, &context(&[])).unwrap());
    }

    #[test]
    fn test_parse_crmf() {
        let locale = Locale::default();
        let ctx = context(&[
            (CERT_REQUEST_TYPE, "crmf"),
            (
                CERT_REQUEST,
                r#"{"requests":[{"key_type":"RSA","key_size":2048,"pop":"sig"},{"key_type":"EC","key_size":256}]}"#,
            ),
        ]);
        let submission = parse_submission(&locale, &ctx).unwrap().unwrap();
        assert_eq!(2, submission.requests.len());
        assert_eq!("EC", submission.requests[1].key_type);
    }

    #[test]
    fn test_parse_malformed() {
        let locale = Locale::default();
        for ctx in [
            context(&[(CERT_REQUEST, "not json")]),
            context(&[(CERT_REQUEST_TYPE, "crmf"), (CERT_REQUEST, r#"{"requests":[]}"#)]),
            context(&[(CERT_REQUEST, r#"{"key_type":" "}"#)]),
            context(&[(CERT_REQUEST_TYPE, "cmc"), (CERT_REQUEST, "{}")]),
        ] {
            assert!(parse_submission(&locale, &ctx).is_err(), "{ctx:?}");
        }
    }

    #[test]
    fn test_cert_req_populate() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(1));
        let descriptor = CertRequestDescriptor {
            subject: Some("CN=host".into()),
            key_type: "rsa".into(),
            key_size: Some(3072),
            ..Default::default()
        };
        store_descriptor(&mut req, REQUEST_TYPE_CRMF, &descriptor).unwrap();
        CertReqInput
            .populate(&locale, &InputContext::new(), &mut req)
            .unwrap();
        assert_eq!(Some("RSA"), req.get_text(RequestField::RequestKeyType));
        assert_eq!(Some(3072), req.get_integer(RequestField::RequestKeySize));
        assert_eq!(Some("CN=host"), req.get_text(RequestField::RequestSubjectName));
        assert!(!req.pop_verified());

        CertReqInput
            .populate(&locale, &context(&[(POP, "signature")]), &mut req)
            .unwrap();
        assert!(req.pop_verified());
    }

    #[test]
    fn test_cert_req_missing() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(1));
        let err = CertReqInput
            .populate(&locale, &InputContext::new(), &mut req)
            .unwrap_err();
        assert_eq!(CERT_REQUEST, err.field);
        assert_eq!(
            PolicyError::MissingData("Required input cert_request is missing".into()),
            err.error
        );
    }

    #[test]
    fn test_subject_name_input() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(1));
        SubjectNameInput
            .populate(
                &locale,
                &context(&[("sn_c", "US"), ("sn_cn", "Doe, John"), ("sn_uid", "jdoe")]),
                &mut req,
            )
            .unwrap();
        assert_eq!(
            Some(r"UID=jdoe,CN=Doe\, John,C=US"),
            req.get_text(RequestField::RequestSubjectName)
        );
        let err = SubjectNameInput
            .populate(&locale, &context(&[("sn_e", "nobody")]), &mut req)
            .unwrap_err();
        assert_eq!("sn_e", err.field);
    }

    #[test]
    fn test_submitter_input() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(1));
        SubmitterInfoInput
            .populate(
                &locale,
                &context(&[
                    ("requestor_name", " John "),
                    ("requestor_email", "jdoe@example.com"),
                ]),
                &mut req,
            )
            .unwrap();
        assert_eq!(Some("John"), req.get_text(RequestField::RequestorName));
        assert!(
            SubmitterInfoInput
                .populate(&locale, &context(&[("requestor_email", "@")]), &mut req)
                .is_err()
        );
    }

    #[test]
    fn test_generic_input() {
        let locale = Locale::default();
        let mut input = GenericInput::default();
        input
            .init(&[("fields", "tokenCUID, tokenType")].into_iter().collect::<Properties>())
            .unwrap();
        assert_eq!(vec!["tokenCUID", "tokenType"], input.value_names());
        assert_eq!(
            "Generic Field tokenType",
            input.value_descriptor(&locale, "tokenType").unwrap().label
        );
        let mut req = Request::new(RequestId(1));
        input
            .populate(&locale, &context(&[("tokenCUID", "a001")]), &mut req)
            .unwrap();
        assert_eq!(Some("a001"), req.ext_text("tokenCUID"));
        assert_eq!(None, req.ext_text("tokenType"));
    }
}
