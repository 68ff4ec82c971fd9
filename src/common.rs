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
//! # Common helpers
//!
//! Pieces shared by several subsystems: the legacy flat property file format
//! used by profiles and token mappings, and the localized message catalog.

pub mod i18n;
pub mod properties;

pub use i18n::Locale;
pub use properties::{Properties, PropertiesError};
