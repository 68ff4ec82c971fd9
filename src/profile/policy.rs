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
//! # Policy components
//!
//! A profile is assembled from four families of components resolved by class
//! id through the [`PluginManager`](crate::plugin_manager::PluginManager):
//! inputs copy client supplied data into the request, defaults populate
//! derived values, constraints validate the populated request and outputs
//! render the result. Components are configured once when the profile is
//! loaded and are read only afterwards; all per request state lives on the
//! [`Request`].
use std::collections::BTreeMap;
use std::fmt;

use crate::common::Locale;
use crate::common::Properties;
use crate::common::i18n::{format_message, message};
use crate::profile::error::PolicyError;
use crate::request::types::Request;

/// Client supplied enrollment data keyed by input value name.
pub type InputContext = BTreeMap<String, String>;

/// Syntax of a configuration or request value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Syntax {
    String,
    Integer,
    Boolean,
    /// One of the comma separated values of the descriptor constraint.
    Choice,
    /// Comma separated list.
    StringList,
    /// RFC 3339 timestamp.
    DateTime,
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Choice => "choice",
            Self::StringList => "string_list",
            Self::DateTime => "datetime",
        })
    }
}

/// Static declaration of a named value.
#[derive(Clone, Copy, Debug)]
pub struct ValueSpec {
    pub name: &'static str,
    pub syntax: Syntax,
    pub constraint: Option<&'static str>,
    /// Message key of the label.
    pub label: &'static str,
    pub default: Option<&'static str>,
    pub required: bool,
}

impl ValueSpec {
    pub const fn new(name: &'static str, syntax: Syntax, label: &'static str) -> Self {
        Self {
            name,
            syntax,
            constraint: None,
            label,
            default: None,
            required: false,
        }
    }

    pub const fn constraint(mut self, constraint: &'static str) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub const fn default_value(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Localized descriptor.
    pub fn descriptor(&self, locale: &Locale) -> Descriptor {
        Descriptor {
            syntax: self.syntax,
            constraint: self.constraint.map(Into::into),
            label: message(locale, self.label),
            default_value: self.default.map(Into::into),
            required: self.required,
        }
    }

    /// Check the raw value against the declared syntax.
    pub fn check(&self, locale: &Locale, value: &str) -> Result<(), PolicyError> {
        let ok = match self.syntax {
            Syntax::String | Syntax::StringList => true,
            Syntax::Integer => value.trim().parse::<i64>().is_ok(),
            Syntax::Boolean => parse_bool(value).is_some(),
            Syntax::Choice => self
                .constraint
                .map(|choices| choices.split(',').any(|c| c.trim() == value.trim()))
                .unwrap_or(true),
            Syntax::DateTime => chrono::DateTime::parse_from_rfc3339(value.trim()).is_ok(),
        };
        if ok {
            Ok(())
        } else {
            Err(bad_value(locale, self.name, value))
        }
    }
}

/// Localized description of a named value.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor {
    pub syntax: Syntax,
    pub constraint: Option<String>,
    pub label: String,
    pub default_value: Option<String>,
    pub required: bool,
}

/// Localized rendering of one output value.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputValue {
    pub name: String,
    pub label: String,
    pub value: String,
}

/// Result of a constraint or whole profile validation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationOutcome {
    Passed,
    /// Terminal rejection with a human readable reason.
    Rejected(String),
    /// Processing is suspended until more data or approvals arrive.
    Deferred(String),
}

impl ValidationOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Policy family.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PolicyFamily {
    Default,
    Constraint,
    Input,
    Output,
}

impl fmt::Display for PolicyFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Constraint => "constraint",
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

/// Constructed policy instance of one of the families.
#[derive(Debug)]
pub enum PolicyKind {
    Default(Box<dyn DefaultPolicy>),
    Constraint(Box<dyn ConstraintPolicy>),
    Input(Box<dyn InputPolicy>),
    Output(Box<dyn OutputPolicy>),
}

impl PolicyKind {
    pub fn family(&self) -> PolicyFamily {
        match self {
            Self::Default(_) => PolicyFamily::Default,
            Self::Constraint(_) => PolicyFamily::Constraint,
            Self::Input(_) => PolicyFamily::Input,
            Self::Output(_) => PolicyFamily::Output,
        }
    }

    pub fn into_default(self) -> Option<Box<dyn DefaultPolicy>> {
        match self {
            Self::Default(val) => Some(val),
            _ => None,
        }
    }

    pub fn into_constraint(self) -> Option<Box<dyn ConstraintPolicy>> {
        match self {
            Self::Constraint(val) => Some(val),
            _ => None,
        }
    }

    pub fn into_input(self) -> Option<Box<dyn InputPolicy>> {
        match self {
            Self::Input(val) => Some(val),
            _ => None,
        }
    }

    pub fn into_output(self) -> Option<Box<dyn OutputPolicy>> {
        match self {
            Self::Output(val) => Some(val),
            _ => None,
        }
    }
}

/// Capabilities shared by every policy component.
pub trait PolicyComponent: Send + Sync + fmt::Debug {
    /// Message key of the component name.
    fn name_key(&self) -> &'static str;

    /// Message key of the component description.
    fn text_key(&self) -> &'static str;

    /// Arguments substituted into the description.
    fn text_args(&self) -> Vec<String> {
        Vec::new()
    }

    /// Configuration parameters in declared order.
    fn config_specs(&self) -> &'static [ValueSpec] {
        &[]
    }

    /// Current value of the configuration parameter.
    fn get_config(&self, _name: &str) -> Option<String> {
        None
    }

    /// Set the configuration parameter.
    fn set_config(&mut self, locale: &Locale, name: &str, _value: &str) -> Result<(), PolicyError> {
        Err(PolicyError::UnknownValue(format_message(
            locale,
            "CMS_INVALID_PROPERTY",
            &[name],
        )))
    }

    /// Configure the component from the `params` store of its declaration.
    ///
    /// Parameters without a value fall back to the declared default; required
    /// parameters without either fail.
    fn init(&mut self, params: &Properties) -> Result<(), PolicyError> {
        let locale = Locale::default();
        for spec in self.config_specs() {
            match params.get_non_empty(spec.name).or(spec.default) {
                Some(value) => {
                    spec.check(&locale, value)?;
                    self.set_config(&locale, spec.name, value)?;
                }
                None if spec.required => {
                    return Err(PolicyError::MissingParameter(spec.name.to_string()));
                }
                None => {}
            }
        }
        Ok(())
    }

    fn config_names(&self) -> Vec<&'static str> {
        self.config_specs().iter().map(|spec| spec.name).collect()
    }

    fn config_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        find_spec(self.config_specs(), name).map(|spec| spec.descriptor(locale))
    }

    /// Localized component name.
    fn name(&self, locale: &Locale) -> String {
        message(locale, self.name_key())
    }

    /// Localized component description.
    fn text(&self, locale: &Locale) -> String {
        format_message(locale, self.text_key(), &self.text_args())
    }
}

/// Default policy populating request fields.
pub trait DefaultPolicy: PolicyComponent {
    /// Request values the default manages, in declared order.
    fn value_specs(&self) -> &'static [ValueSpec] {
        &[]
    }

    /// Current request value.
    fn get_value(&self, _name: &str, _request: &Request) -> Option<String> {
        None
    }

    /// Overwrite the request value, typically by an agent reviewing the request.
    fn set_value(
        &self,
        locale: &Locale,
        name: &str,
        _request: &mut Request,
        _value: &str,
    ) -> Result<(), PolicyError> {
        Err(PolicyError::UnknownValue(format_message(
            locale,
            "CMS_INVALID_PROPERTY",
            &[name],
        )))
    }

    /// Write the derived values into the request.
    fn populate(&self, locale: &Locale, request: &mut Request) -> Result<(), PolicyError>;

    fn value_names(&self) -> Vec<&'static str> {
        self.value_specs().iter().map(|spec| spec.name).collect()
    }

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor> {
        find_spec(self.value_specs(), name).map(|spec| spec.descriptor(locale))
    }
}

/// Constraint policy validating a populated request.
///
/// Constraints never modify the request.
pub trait ConstraintPolicy: PolicyComponent {
    fn validate(&self, locale: &Locale, request: &Request) -> ValidationOutcome;
}

/// Input policy copying client supplied data into the request.
pub trait InputPolicy: PolicyComponent {
    /// Context keys consumed by the input in declared order.
    fn value_names(&self) -> Vec<String>;

    fn value_descriptor(&self, locale: &Locale, name: &str) -> Option<Descriptor>;

    /// Copy the context values into the request. Errors name the offending
    /// field through [`InputFailure`].
    fn populate(
        &self,
        locale: &Locale,
        context: &InputContext,
        request: &mut Request,
    ) -> Result<(), InputFailure>;
}

/// Input value that cannot be accepted.
#[derive(Clone, Debug, PartialEq)]
pub struct InputFailure {
    pub field: String,
    pub error: PolicyError,
}

impl InputFailure {
    pub fn new<S: Into<String>>(field: S, error: PolicyError) -> Self {
        Self {
            field: field.into(),
            error,
        }
    }
}

/// Output policy rendering the processing result.
pub trait OutputPolicy: PolicyComponent {
    fn value_specs(&self) -> &'static [ValueSpec];

    fn render(&self, locale: &Locale, request: &Request) -> Vec<OutputValue>;
}

pub(crate) fn find_spec<'a>(specs: &'a [ValueSpec], name: &str) -> Option<&'a ValueSpec> {
    specs.iter().find(|spec| spec.name == name)
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Localized invalid value error.
pub(crate) fn bad_value(locale: &Locale, name: &str, value: &str) -> PolicyError {
    PolicyError::InvalidValue(format_message(locale, "CMS_BAD_VALUE", &[name, value]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ValueSpec] = &[
        ValueSpec::new("range", Syntax::Integer, "CMS_PROFILE_VALIDITY_RANGE").default_value("30"),
        ValueSpec::new("type", Syntax::Choice, "CMS_PROFILE_KEY_TYPE").constraint("RSA,EC"),
    ];

    #[test]
    fn test_check() {
        let locale = Locale::default();
        assert!(SPECS[0].check(&locale, "10").is_ok());
        assert_eq!(
            Err(PolicyError::InvalidValue("Invalid value for range: ten".into())),
            SPECS[0].check(&locale, "ten")
        );
        assert!(SPECS[1].check(&locale, "EC").is_ok());
        assert!(SPECS[1].check(&locale, "DSA").is_err());
    }

    #[test]
    fn test_descriptor() {
        let desc = SPECS[1].descriptor(&Locale::new("fr"));
        assert_eq!("Key Type", desc.label);
        assert_eq!(Some("RSA,EC".into()), desc.constraint);
        assert_eq!(Syntax::Choice, desc.syntax);
        assert_eq!(
            Some("30".into()),
            SPECS[0].descriptor(&Locale::default()).default_value
        );
    }
}
