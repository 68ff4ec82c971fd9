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
//! # In-memory audit sink
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::audit::backend::{AuditSink, HashChain};
use crate::audit::error::AuditError;
use crate::audit::types::*;

/// Sink keeping the records in memory. Clones share the storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryAuditSink {
    chain: HashChain,
    records: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    /// Stored records in the emission order.
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    /// Stored events of the given type.
    pub async fn events_of(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.records
            .read()
            .await
            .iter()
            .filter(|rec| rec.event.event_type() == event_type)
            .map(|rec| rec.event.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn write(&self, event: AuditEvent, seal: bool) -> Result<AuditRecord, AuditError> {
        // Keep chain order and storage order identical.
        let mut records = self.records.write().await;
        let seal = if seal {
            Some(self.chain.seal(&event).await)
        } else {
            None
        };
        let record = AuditRecord { event, seal };
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::backend::verify_chain;

    fn event(req: &str) -> AuditEvent {
        AuditEvent::builder(AuditEventType::CertRequestProcessed)
            .subject("agent")
            .attr("ReqID", req)
            .build()
    }

    #[tokio::test]
    async fn test_chain() {
        let sink = MemoryAuditSink::default();
        sink.write(event("1"), true).await.unwrap();
        sink.write(
            AuditEvent::builder(AuditEventType::ProfilePopulate).build(),
            false,
        )
        .await
        .unwrap();
        sink.write(event("2"), true).await.unwrap();

        let records = sink.records().await;
        assert_eq!(3, records.len());
        assert!(records[1].seal.is_none());
        assert_eq!(
            records[0].seal.as_ref().unwrap().digest,
            records[2].seal.as_ref().unwrap().previous
        );
        assert_eq!(Ok(()), verify_chain(records.iter()));
    }

    #[tokio::test]
    async fn test_tampering_detected() {
        let sink = MemoryAuditSink::default();
        for idx in 0..3 {
            sink.write(event(&idx.to_string()), true).await.unwrap();
        }
        let mut records = sink.records().await;
        records[1].event = event("forged");
        assert_eq!(Err(1), verify_chain(records.iter()));

        let mut records = sink.records().await;
        records.remove(0);
        assert_eq!(Err(0), verify_chain(records.iter()));
    }

    #[tokio::test]
    async fn test_shared_clone() {
        let sink = MemoryAuditSink::default();
        let other = sink.clone();
        other.write(event("1"), false).await.unwrap();
        assert_eq!(
            1,
            sink.events_of(AuditEventType::CertRequestProcessed)
                .await
                .len()
        );
        sink.clear().await;
        assert!(other.records().await.is_empty());
    }
}
