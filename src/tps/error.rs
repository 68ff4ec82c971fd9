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
use thiserror::Error;

use crate::common::PropertiesError;

/// Token profile resolution error.
#[derive(Error, Debug)]
pub enum TokenResolverError {
    /// No mapping accepts the token.
    #[error("no token profile mapping matches the token")]
    NoMatch,

    #[error("invalid token profile mapping: {0}")]
    InvalidConfig(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Properties {
        #[from]
        source: PropertiesError,
    },
}
