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
//! Built-in output policies.
use crate::common::Locale;
use crate::common::i18n::message;
use crate::profile::policy::*;
use crate::request::types::{Request, RequestField};

const CERT_VALUES: &[ValueSpec] = &[
    ValueSpec::new("cert_serial", Syntax::String, "CMS_PROFILE_SERIAL_NUMBER"),
    ValueSpec::new("cert_encoded", Syntax::String, "CMS_PROFILE_CERTIFICATE"),
    ValueSpec::new("cert_fingerprint", Syntax::String, "CMS_PROFILE_FINGERPRINT"),
];

fn render_value(locale: &Locale, spec: &ValueSpec, value: String) -> OutputValue {
    OutputValue {
        name: spec.name.into(),
        label: message(locale, spec.label),
        value,
    }
}

/// Renders the issued certificate.
#[derive(Debug, Default)]
pub struct CertOutput;

impl PolicyComponent for CertOutput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_OUTPUT_CERT"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_OUTPUT_CERT_TEXT"
    }
}

impl OutputPolicy for CertOutput {
    fn value_specs(&self) -> &'static [ValueSpec] {
        CERT_VALUES
    }

    fn render(&self, locale: &Locale, request: &Request) -> Vec<OutputValue> {
        [
            RequestField::CertSerial,
            RequestField::Certificate,
            RequestField::CertFingerprint,
        ]
        .iter()
        .zip(CERT_VALUES)
        .filter_map(|(field, spec)| {
            request
                .get(*field)
                .map(|val| render_value(locale, spec, val.to_string()))
        })
        .collect()
    }
}

/// Renders the request id, status and reason.
#[derive(Debug, Default)]
pub struct SubmitStatusOutput;

const STATUS_VALUES: &[ValueSpec] = &[
    ValueSpec::new("request_id", Syntax::String, "CMS_PROFILE_REQUEST_ID"),
    ValueSpec::new("request_status", Syntax::String, "CMS_PROFILE_REQUEST_STATUS"),
    ValueSpec::new("reason", Syntax::String, "CMS_PROFILE_REASON"),
];

impl PolicyComponent for SubmitStatusOutput {
    fn name_key(&self) -> &'static str {
        "CMS_PROFILE_OUTPUT_STATUS"
    }

    fn text_key(&self) -> &'static str {
        "CMS_PROFILE_OUTPUT_STATUS_TEXT"
    }
}

impl OutputPolicy for SubmitStatusOutput {
    fn value_specs(&self) -> &'static [ValueSpec] {
        STATUS_VALUES
    }

    fn render(&self, locale: &Locale, request: &Request) -> Vec<OutputValue> {
        vec![
            render_value(locale, &STATUS_VALUES[0], request.id().to_string()),
            render_value(locale, &STATUS_VALUES[1], request.status().to_string()),
            render_value(locale, &STATUS_VALUES[2], request.reason()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::EMPTY_VALUE;
    use crate::request::types::{RequestId, RequestStatus};

    #[test]
    fn test_cert_output() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(7));
        assert!(CertOutput.render(&locale, &req).is_empty());
        req.set(RequestField::CertSerial, "0x1");
        req.set(RequestField::CertFingerprint, "ab");
        let rendered = CertOutput.render(&locale, &req);
        assert_eq!(2, rendered.len());
        assert_eq!("Serial Number", rendered[0].label);
        assert_eq!("cert_fingerprint", rendered[1].name);
    }

    #[test]
    fn test_status_output() {
        let locale = Locale::default();
        let mut req = Request::new(RequestId(7));
        req.set_status(RequestStatus::Pending).unwrap();
        let rendered = SubmitStatusOutput.render(&locale, &req);
        assert_eq!("7", rendered[0].value);
        assert_eq!("pending", rendered[1].value);
        assert_eq!(EMPTY_VALUE, rendered[2].value);
    }
}
