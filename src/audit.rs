use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Uuid,
    pub data: String,
    pub hash: String,
    pub previous_hash: Option<String>,
}

impl AuditEntry {
    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}:{}:{}:{}:{}:{}:{}",
            self.seq,
            self.timestamp.to_rfc3339(),
            self.actor_id.map(|id| id.to_string()).unwrap_or_default(),
            self.action,
            self.entity,
            self.entity_id,
            self.data
        ));
        if let Some(ref prev) = self.previous_hash {
            hasher.update(prev);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Append-only log of every mutation, each entry chained to the previous hash.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its hash.
    pub fn record(
        &self,
        timestamp: DateTime<Utc>,
        actor_id: Option<Uuid>,
        action: &str,
        entity: &str,
        entity_id: Uuid,
        data: String,
    ) -> String {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut entry = AuditEntry {
            seq: entries.len() as u64,
            timestamp,
            actor_id,
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id,
            data,
            hash: String::new(),
            previous_hash: entries.last().map(|last| last.hash.clone()),
        };
        entry.hash = entry.digest();
        debug!(seq = entry.seq, %action, %entity_id, hash = %entry.hash, "audit entry recorded");
        let hash = entry.hash.clone();
        entries.push(entry);
        hash
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn for_entity(&self, entity_id: Uuid) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|entry| entry.entity_id == entity_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recompute every hash and check each link to its predecessor.
    pub fn verify(&self) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut previous: Option<&str> = None;
        for entry in entries.iter() {
            if entry.previous_hash.as_deref() != previous || entry.digest() != entry.hash {
                return false;
            }
            previous = Some(&entry.hash);
        }
        true
    }

    #[cfg(test)]
    fn tamper(&self, seq: usize, data: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries[seq].data = data.to_string();
    }
}
