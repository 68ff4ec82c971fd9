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
//! # Log audit sink
//!
//! Renders the records to the `audit` tracing target.
use async_trait::async_trait;
use tracing::info;

use crate::audit::backend::{AuditSink, HashChain};
use crate::audit::error::AuditError;
use crate::audit::types::*;

#[derive(Clone, Debug, Default)]
pub struct LogAuditSink {
    chain: HashChain,
}

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn write(&self, event: AuditEvent, seal: bool) -> Result<AuditRecord, AuditError> {
        let seal = if seal {
            Some(self.chain.seal(&event).await)
        } else {
            None
        };
        match &seal {
            Some(seal) => info!(
                target: "audit",
                message_id = event.message_id(),
                digest = seal.digest,
                "{} {}",
                event.timestamp().to_rfc3339(),
                event
            ),
            None => info!(
                target: "audit",
                message_id = event.message_id(),
                "{} {}",
                event.timestamp().to_rfc3339(),
                event
            ),
        }
        Ok(AuditRecord { event, seal })
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[tokio::test]
    #[traced_test]
    async fn test_write() {
        let sink = LogAuditSink::default();
        let record = sink
            .write(
                AuditEvent::builder(AuditEventType::FullCrlGeneration)
                    .subject(SUBJECT_SYSTEM)
                    .attr("CRLnum", "12")
                    .build(),
                true,
            )
            .await
            .unwrap();
        assert!(record.seal.is_some());
        assert!(logs_contain(
            "[AuditEvent=FULL_CRL_GENERATION][SubjectID=$System$][Outcome=SUCCESS][CRLnum=12]"
        ));
    }
}
