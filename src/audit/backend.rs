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
//! # Audit sinks
//!
//! Sinks persist the audit records. Signed records are sealed in a SHA-256
//! hash chain: every digest covers the previous digest and the rendered
//! record, so removing or altering any record breaks the chain from that
//! point on.
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::audit::error::AuditError;
use crate::audit::types::*;

pub mod log;
pub mod memory;

pub use log::LogAuditSink;
pub use memory::MemoryAuditSink;

/// Digest preceding the first sealed record.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Persist the event, sealing it first when `seal` is set.
    async fn write(&self, event: AuditEvent, seal: bool) -> Result<AuditRecord, AuditError>;
}

/// Hash chain shared by the clones of a sink.
#[derive(Clone, Debug)]
pub struct HashChain {
    last: Arc<Mutex<String>>,
}

impl Default for HashChain {
    fn default() -> Self {
        Self {
            last: Arc::new(Mutex::new(GENESIS_DIGEST.to_string())),
        }
    }
}

impl HashChain {
    /// Seal the event appending it to the chain.
    pub async fn seal(&self, event: &AuditEvent) -> AuditSeal {
        let mut last = self.last.lock().await;
        let digest = chain_digest(&last, event);
        let seal = AuditSeal {
            previous: last.clone(),
            digest: digest.clone(),
        };
        *last = digest;
        seal
    }
}

fn chain_digest(previous: &str, event: &AuditEvent) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.as_bytes());
    hasher.update(event.timestamp().to_rfc3339().as_bytes());
    hasher.update(event.message_id().as_bytes());
    hasher.update(event.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify the chain of the sealed records.
///
/// Returns the position (within `records`) of the first record whose seal does
/// not match. Unsealed records are ignored.
pub fn verify_chain<'a, I>(records: I) -> Result<(), usize>
where
    I: IntoIterator<Item = &'a AuditRecord>,
{
    let mut previous = GENESIS_DIGEST.to_string();
    for (idx, record) in records.into_iter().enumerate() {
        if let Some(seal) = &record.seal {
            if seal.previous != previous || seal.digest != chain_digest(&previous, &record.event)
            {
                return Err(idx);
            }
            previous = seal.digest.clone();
        }
    }
    Ok(())
}
