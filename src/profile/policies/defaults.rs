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
//! Built-in default policies.
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::common::Locale;
use crate::common::i18n::format_message;
use crate::profile::error::PolicyError;
use crate::profile::policy::*;
use crate::request::types::{AUTH_TOKEN_PREFIX, ExtValue, Request, RequestField};

static REQUEST_VARIABLE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$request\.([A-Za-z0-9_.]+)\$").ok());

fn missing_field(locale: &Locale, field: &str) -> PolicyError {
    PolicyError::MissingData(format_message(
        locale,
        "CMS_PROFILE_FIELD_NOT_FOUND",
        &[field],
    ))
}

/// Substitute `$request.<key>$` variables with the request values.
pub(crate) fn substitute(
    locale: &Locale,
    pattern: &str,
    request: &Request,
) -> Result<String, PolicyError> {
    let Some(re) = REQUEST_VARIABLE.as_ref() else {
        return Ok(pattern.to_string());
    };
    let mut result = String::with_capacity(pattern.len());
    let mut last = 0;
    for caps in re.captures_iter(pattern) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = request
            .ext(key.as_str())
            .map(ExtValue::to_string)
            .filter(|val| !val.is_empty())
            .ok_or_else(|| missing_field(locale, key.as_str()))?;
        result.push_str(&pattern[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }
    result.push_str(&pattern[last..]);
    Ok(result)
}

fn set_text_value(
    locale: &Locale,
    request: &mut Request,
    field: RequestField,
    value: &str,
) -> Result<(), PolicyError> {
    if value.trim().is_empty() {
        return Err(bad_value(locale, field.key(), value));
    }
    request.set(field, value.trim());
    Ok(())
}

fn parse_time(locale: &Locale, name: &str, value: &str) -> Result<DateTime<Utc>, PolicyError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| bad_value(locale, name, value))
}

fn parse_i64(locale: &Locale, name: &str, value: &str) -> Result<i64, PolicyError> {
    value
        .trim()
        .parse()
        .map_err(|_| bad_value(locale, name, value))
}

fn parse_flag(locale: &Locale, name: &str, value: &str) -> Result<bool, PolicyError> {
    parse_bool(value).ok_or_else(|| bad_value(locale, name, value))
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(Into::into)
        .collect()
}

/// Populates nothing.
#[derive(Debug, Default)]
pub struct NoDefault;

impl PolicyComponent for NoDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_NO_DEFAULT"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_NO_DEFAULT_TEXT"
    }
}

impl DefaultPolicy for NoDefault {
    fn populate(&self, _locale: &Locale, _request: &mut Request) -> Result<(), PolicyError> {
        Ok(())
    }
}

const SUBJECT_VALUES: &[ValueSpec] =
    &[ValueSpec::new("name", Syntax::String, "CMS_PROFILE_SUBJECT_NAME")];

fn get_subject(name: &str, request: &Request) -> Option<String> {
    match name {
        "name" => request.get_text(RequestField::CertSubject).map(Into::into),
        _ => None,
    }
}

fn set_subject(
    locale: &Locale,
    name: &str,
    request: &mut Request,
    value: &str,
) -> Result<(), PolicyError> {
    match name {
        "name" => set_text_value(locale, request, RequestField::CertSubject, value),
        other => Err(PolicyError::UnknownValue(other.to_string())),
    }
}

/// Copies the subject name supplied with the certificate request.
#[derive(Debug, Default)]
pub struct UserSubjectNameDefault;

impl PolicyComponent for UserSubjectNameDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_USER_SUBJECT_NAME"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_USER_SUBJECT_NAME_TEXT"
    }
}

impl DefaultPolicy for UserSubjectNameDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        SUBJECT_VALUES
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        get_subject(name, request)
    }

    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        set_subject(locale, name, request, value)
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let subject = request
            .get_text(RequestField::RequestSubjectName)
            .filter(|val| !val.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PolicyError::MissingData(format_message::<&str>(
                    locale,
                    "CMS_PROFILE_SUBJECT_NAME_NOT_FOUND",
                    &[],
                ))
            })?;
        request.set(RequestField::CertSubject, subject);
        Ok(())
    }
}

/// Builds the subject name from a pattern with `$request.<field>$`
/// variables.
#[derive(Debug, Default)]
pub struct SubjectNameDefault {
    pattern: String,
}

impl PolicyComponent for SubjectNameDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_SUBJECT_NAME"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_SUBJECT_NAME_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.pattern.clone()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] =
            &[ValueSpec::new("name", Syntax::String, "CMS_PROFILE_SUBJECT_NAME").required()];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "name").then(|| self.pattern.clone())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match name {
            "name" => {
                self.pattern = value.trim().to_string();
                Ok(())
            }
            other => Err(bad_value(locale, other, value)),
        }
    }
}

impl DefaultPolicy for SubjectNameDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        SUBJECT_VALUES
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        get_subject(name, request)
    }

    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        set_subject(locale, name, request, value)
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let subject = substitute(locale, &self.pattern, request)?;
        request.set(RequestField::CertSubject, subject);
        Ok(())
    }
}

/// Takes the subject name from a field of the authentication token.
#[derive(Debug)]
pub struct AuthTokenSubjectNameDefault {
    token_field: String,
}

impl Default for AuthTokenSubjectNameDefault {
    fn default() -> Self {
        Self {
            token_field: crate::auth::types::TOKEN_USER_DN.to_string(),
        }
    }
}

impl PolicyComponent for AuthTokenSubjectNameDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_AUTHTOKEN_SUBJECT_NAME"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_AUTHTOKEN_SUBJECT_NAME_TEXT"
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "tokenField",
            Syntax::String,
            "CMS_PROFILE_SUBJECT_NAME",
        )
        .default_value("userdn")];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "tokenField").then(|| self.token_field.clone())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match name {
            "tokenField" => {
                self.token_field = value.trim().to_string();
                Ok(())
            }
            other => Err(bad_value(locale, other, value)),
        }
    }
}

impl DefaultPolicy for AuthTokenSubjectNameDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        SUBJECT_VALUES
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        get_subject(name, request)
    }

    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        set_subject(locale, name, request, value)
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let subject = request
            .auth_token_value(&self.token_field)
            .filter(|val| !val.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PolicyError::MissingData(format_message(
                    locale,
                    "CMS_PROFILE_AUTH_TOKEN_FIELD_NOT_FOUND",
                    &[format!("{AUTH_TOKEN_PREFIX}{}", self.token_field)],
                ))
            })?;
        request.set(RequestField::CertSubject, subject);
        Ok(())
    }
}

/// Copies the public key supplied with the certificate request.
#[derive(Debug, Default)]
pub struct UserKeyDefault;

impl PolicyComponent for UserKeyDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_USER_KEY"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_USER_KEY_TEXT"
    }
}

impl DefaultPolicy for UserKeyDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[
            ValueSpec::new("keyType", Syntax::String, "CMS_PROFILE_KEY_TYPE"),
            ValueSpec::new("keyLength", Syntax::Integer, "CMS_PROFILE_KEY_LEN"),
            ValueSpec::new("key", Syntax::String, "CMS_PROFILE_PUBLIC_KEY"),
        ];
        SPECS
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        match name {
            "keyType" => request.get_text(RequestField::CertKeyType).map(Into::into),
            "keyLength" => request
                .get_integer(RequestField::CertKeySize)
                .map(|size| size.to_string()),
            "key" => request.get_text(RequestField::CertPublicKey).map(Into::into),
            _ => None,
        }
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let key_type = request
            .get_text(RequestField::RequestKeyType)
            .filter(|val| !val.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PolicyError::MissingData(format_message::<&str>(
                    locale,
                    "CMS_PROFILE_KEY_NOT_FOUND",
                    &[],
                ))
            })?;
        request.set(RequestField::CertKeyType, key_type);
        if let Some(size) = request.get_integer(RequestField::RequestKeySize) {
            request.set(RequestField::CertKeySize, size);
        }
        if let Some(key) = request
            .get_text(RequestField::RequestPublicKey)
            .map(str::to_string)
        {
            request.set(RequestField::CertPublicKey, key);
        }
        Ok(())
    }
}

/// Sets the validity period relative to the request creation time.
#[derive(Debug)]
pub struct ValidityDefault {
    range_days: i64,
    start_offset_secs: i64,
}

impl Default for ValidityDefault {
    fn default() -> Self {
        Self {
            range_days: 180,
            start_offset_secs: 0,
        }
    }
}

impl PolicyComponent for ValidityDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_VALIDITY"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_VALIDITY_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.range_days.to_string()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[
            ValueSpec::new("range", Syntax::Integer, "CMS_PROFILE_VALIDITY_RANGE")
                .default_value("180"),
            ValueSpec::new("startTime", Syntax::Integer, "CMS_PROFILE_VALIDITY_START_TIME")
                .default_value("0"),
        ];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        match name {
            "range" => Some(self.range_days.to_string()),
            "startTime" => Some(self.start_offset_secs.to_string()),
            _ => None,
        }
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        match name {
            "range" => {
                let range = parse_i64(locale, name, value)?;
                if range <= 0 || TimeDelta::try_days(range).is_none() {
                    return Err(bad_value(locale, name, value));
                }
                self.range_days = range;
            }
            "startTime" => {
                let offset = parse_i64(locale, name, value)?;
                if TimeDelta::try_seconds(offset).is_none() {
                    return Err(bad_value(locale, name, value));
                }
                self.start_offset_secs = offset;
            }
            other => return Err(bad_value(locale, other, value)),
        }
        Ok(())
    }
}

impl DefaultPolicy for ValidityDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[
            ValueSpec::new("notBefore", Syntax::DateTime, "CMS_PROFILE_NOT_BEFORE"),
            ValueSpec::new("notAfter", Syntax::DateTime, "CMS_PROFILE_NOT_AFTER"),
        ];
        SPECS
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        let field = match name {
            "notBefore" => RequestField::CertNotBefore,
            "notAfter" => RequestField::CertNotAfter,
            _ => return None,
        };
        request.get_time(field).map(|time| time.to_rfc3339())
    }

    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        let field = match name {
            "notBefore" => RequestField::CertNotBefore,
            "notAfter" => RequestField::CertNotAfter,
            other => return Err(PolicyError::UnknownValue(other.to_string())),
        };
        request.set(field, parse_time(locale, name, value)?);
        Ok(())
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let out_of_range = || {
            PolicyError::InvalidValue(format_message(
                locale,
                "CMS_PROFILE_VALIDITY_OUT_OF_RANGE",
                &[self.range_days.to_string()],
            ))
        };
        let not_before = TimeDelta::try_seconds(self.start_offset_secs)
            .and_then(|offset| request.created_at().checked_add_signed(offset))
            .ok_or_else(out_of_range)?;
        let not_after = TimeDelta::try_days(self.range_days)
            .and_then(|range| not_before.checked_add_signed(range))
            .ok_or_else(out_of_range)?;
        request.set(RequestField::CertNotBefore, not_before);
        request.set(RequestField::CertNotAfter, not_after);
        Ok(())
    }
}

/// Key usage bits in the order of the extension definition.
const KEY_USAGE_BITS: &[(&str, &str)] = &[
    ("keyUsageDigitalSignature", "digitalSignature"),
    ("keyUsageNonRepudiation", "nonRepudiation"),
    ("keyUsageKeyEncipherment", "keyEncipherment"),
    ("keyUsageDataEncipherment", "dataEncipherment"),
    ("keyUsageKeyAgreement", "keyAgreement"),
    ("keyUsageKeyCertSign", "keyCertSign"),
    ("keyUsageCrlSign", "cRLSign"),
];

/// Sets the key usage extension from explicit bits or from the key type
/// written by an earlier default.
#[derive(Debug, Default)]
pub struct KeyUsageExtDefault {
    from_key_type: bool,
    usages: Vec<&'static str>,
}

impl PolicyComponent for KeyUsageExtDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_KEY_USAGE_EXT"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_KEY_USAGE_EXT_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        if self.from_key_type {
            vec!["keyType".into()]
        } else {
            vec![self.usages.join(",")]
        }
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[
            ValueSpec::new(
                "keyUsageFromKeyType",
                Syntax::Boolean,
                "CMS_PROFILE_KEY_USAGE_FROM_KEY_TYPE",
            )
            .default_value("false"),
            ValueSpec::new("keyUsageDigitalSignature", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageNonRepudiation", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageKeyEncipherment", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageDataEncipherment", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageKeyAgreement", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageKeyCertSign", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
            ValueSpec::new("keyUsageCrlSign", Syntax::Boolean, "CMS_PROFILE_KEY_USAGE"),
        ];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        if name == "keyUsageFromKeyType" {
            return Some(self.from_key_type.to_string());
        }
        KEY_USAGE_BITS
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, usage)| self.usages.contains(usage).to_string())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        let flag = parse_flag(locale, name, value)?;
        if name == "keyUsageFromKeyType" {
            self.from_key_type = flag;
            return Ok(());
        }
        let (_, usage) = KEY_USAGE_BITS
            .iter()
            .find(|(param, _)| *param == name)
            .ok_or_else(|| bad_value(locale, name, value))?;
        self.usages.retain(|item| item != usage);
        if flag {
            self.usages.push(*usage);
            // Keep the extension bit order regardless of the parameter order.
            self.usages.sort_by_key(|item| {
                KEY_USAGE_BITS
                    .iter()
                    .position(|(_, bit)| bit == item)
                    .unwrap_or(usize::MAX)
            });
        }
        Ok(())
    }
}

impl DefaultPolicy for KeyUsageExtDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] =
            &[ValueSpec::new("keyUsage", Syntax::StringList, "CMS_PROFILE_KEY_USAGE")];
        SPECS
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        (name == "keyUsage").then(|| request.get_list(RequestField::CertKeyUsage).join(","))
    }

    fn set_value(
        &self,
        _locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        if name != "keyUsage" {
            return Err(PolicyError::UnknownValue(name.to_string()));
        }
        request.set(RequestField::CertKeyUsage, split_csv(value));
        Ok(())
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let usages: Vec<String> = if self.from_key_type {
            let key_type = request.get_text(RequestField::CertKeyType).ok_or_else(|| {
                PolicyError::MissingData(format_message::<&str>(
                    locale,
                    "CMS_PROFILE_KEY_NOT_FOUND",
                    &[],
                ))
            })?;
            match key_type.to_ascii_uppercase().as_str() {
                "RSA" => vec!["digitalSignature".into(), "keyEncipherment".into()],
                "EC" => vec!["digitalSignature".into(), "keyAgreement".into()],
                other => {
                    return Err(PolicyError::InvalidValue(format_message(
                        locale,
                        "CMS_PROFILE_UNKNOWN_KEY_TYPE",
                        &[other],
                    )));
                }
            }
        } else {
            self.usages.iter().map(|usage| usage.to_string()).collect()
        };
        request.set(RequestField::CertKeyUsage, usages);
        Ok(())
    }
}

/// Sets the extended key usage OIDs.
#[derive(Debug, Default)]
pub struct ExtendedKeyUsageExtDefault {
    oids: Vec<String>,
}

impl PolicyComponent for ExtendedKeyUsageExtDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_EXTENDED_KEY_USAGE_EXT"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_EXTENDED_KEY_USAGE_EXT_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.oids.join(",")]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "exKeyUsageOIDs",
            Syntax::StringList,
            "CMS_PROFILE_EXT_KEY_USAGE_OIDS",
        )
        .required()];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "exKeyUsageOIDs").then(|| self.oids.join(","))
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        if name != "exKeyUsageOIDs" {
            return Err(bad_value(locale, name, value));
        }
        let oids = split_csv(value);
        let valid = |oid: &String| {
            oid.split('.').count() > 1 && oid.split('.').all(|arc| arc.parse::<u64>().is_ok())
        };
        if let Some(bad) = oids.iter().find(|oid| !valid(oid)) {
            return Err(bad_value(locale, name, bad));
        }
        self.oids = oids;
        Ok(())
    }
}

impl DefaultPolicy for ExtendedKeyUsageExtDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "exKeyUsageOIDs",
            Syntax::StringList,
            "CMS_PROFILE_EXT_KEY_USAGE_OIDS",
        )];
        SPECS
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        (name == "exKeyUsageOIDs")
            .then(|| request.get_list(RequestField::CertExtKeyUsage).join(","))
    }

    fn populate(&self, _locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        request.set(RequestField::CertExtKeyUsage, self.oids.clone());
        Ok(())
    }
}

/// Algorithm placeholder selecting the algorithm from the key type.
pub const DERIVED_SIGNING_ALG: &str = "-";

/// Sets the signing algorithm, explicit or derived from the key type.
#[derive(Debug)]
pub struct SigningAlgDefault {
    algorithm: String,
}

impl Default for SigningAlgDefault {
    fn default() -> Self {
        Self {
            algorithm: DERIVED_SIGNING_ALG.into(),
        }
    }
}

impl PolicyComponent for SigningAlgDefault {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_SIGNING_ALGORITHM"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_DEF_SIGNING_ALGORITHM_TEXT"
    }

    fn text_args(&self) -> Vec<String> {
        vec![self.algorithm.clone()]
    }

    fn config_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "signingAlg",
            Syntax::String,
            "CMS_PROFILE_SIGNING_ALGORITHM",
        )
        .default_value(DERIVED_SIGNING_ALG)];
        SPECS
    }

    fn get_config(&self, name: &str) -> Option<String> {
        (name == "signingAlg").then(|| self.algorithm.clone())
    }

    fn set_config(&mut self, locale: &Locale, name: &str, value: &str) -> Result<(), PolicyError> {
        if name != "signingAlg" || value.trim().is_empty() {
            return Err(bad_value(locale, name, value));
        }
        self.algorithm = value.trim().to_string();
        Ok(())
    }
}

impl DefaultPolicy for SigningAlgDefault {
    fn value_specs(&self) -> &'static [ValueSpec] {
        const SPECS: &[ValueSpec] = &[ValueSpec::new(
            "signingAlg",
            Syntax::String,
            "CMS_PROFILE_SIGNING_ALGORITHM",
        )];
        SPECS
    }

    fn get_value(&self, name: &str, request: &Request) -> Option<String> {
        (name == "signingAlg")
            .then(|| request.get_text(RequestField::CertSigningAlg).map(Into::into))
            .flatten()
    }

    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        request: &mut Request,
        value: &str,
    ) -> Result<(), PolicyError> {
        if name != "signingAlg" {
            return Err(PolicyError::UnknownValue(name.to_string()));
        }
        set_text_value(locale, request, RequestField::CertSigningAlg, value)
    }

    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError> {
        let algorithm = if self.algorithm == DERIVED_SIGNING_ALG {
            let key_type = request.get_text(RequestField::CertKeyType).ok_or_else(|| {
                PolicyError::MissingData(format_message::<&str>(
                    locale,
                    "CMS_PROFILE_KEY_NOT_FOUND",
                    &[],
                ))
            })?;
            match key_type.to_ascii_uppercase().as_str() {
                "RSA" => "SHA256withRSA".to_string(),
                "EC" => "SHA256withEC".to_string(),
                other => {
                    return Err(PolicyError::InvalidValue(format_message(
                        locale,
                        "CMS_PROFILE_UNKNOWN_KEY_TYPE",
                        &[other],
                    )));
                }
            }
        } else {
            self.algorithm.clone()
        };
        request.set(RequestField::CertSigningAlg, algorithm);
        Ok(())
    }
}
