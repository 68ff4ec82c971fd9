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
//! # Enrollment pin digest
//!
//! The directory stores the pin as `[hash type][digest]` where the digest is
//! computed over the concatenation of the user DN and the pin. Values without
//! a recognized hash type byte are SHA-1 digests in the pre-tagged format.
use md5::Md5;
use sha1::{Digest, Sha1};

/// Hash algorithm of the stored pin.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PinHashType {
    Sha1,
    Md5,
    /// Plain text `userDN + pin`.
    None,
}

impl PinHashType {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Sha1 => 0,
            Self::Md5 => 1,
            Self::None => 0x2d,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Sha1),
            1 => Some(Self::Md5),
            0x2d => Some(Self::None),
            _ => None,
        }
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => Sha1::digest(input).to_vec(),
            Self::Md5 => Md5::digest(input).to_vec(),
            Self::None => input.to_vec(),
        }
    }
}

/// Build the stored form of the pin.
pub fn encode_pin(hash: PinHashType, user_dn: &str, pin: &str) -> Vec<u8> {
    let mut res = vec![hash.tag()];
    res.extend(hash.digest(format!("{user_dn}{pin}").as_bytes()));
    res
}

/// Verify the supplied pin against the stored value.
pub fn verify_pin(stored: &[u8], user_dn: &str, pin: &str) -> bool {
    let input = format!("{user_dn}{pin}");
    let (hash, expected) = match stored.split_first() {
        Some((tag, rest)) => match PinHashType::from_tag(*tag) {
            Some(hash) => (hash, rest),
            None => (PinHashType::Sha1, stored),
        },
        None => return false,
    };
    constant_time_eq(&hash.digest(input.as_bytes()), expected)
}

/// Compare the byte strings in time independent of where they differ.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
