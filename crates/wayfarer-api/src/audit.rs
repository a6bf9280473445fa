//! Audit trail applied around admin mutations.
//!
//! Services describe what they changed by returning [`Audited`] values; the
//! handler hands them to [`AuditTrail::commit`] together with the caller, so no
//! mutation path writes audit rows by hand. A failed audit write is logged and
//! the mutation still succeeds. Lead conversion is the exception: its audit row
//! is written inside the conversion transaction and only announced here.

use chrono::Utc;
use std::sync::Arc;
use wayfarer_core::models::{AuditLogEntry, Audited};
use wayfarer_db::AuditLogStore;

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditLogStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }

    /// Records the audit entry for `audited` on behalf of `actor` and returns the value.
    pub async fn commit<T>(&self, actor: &str, audited: Audited<T>) -> T {
        let Audited { value, event } = audited;
        let entry = event.into_entry(actor, Utc::now());
        announce(&entry);

        if let Err(e) = self.store.record(entry.clone()).await {
            tracing::warn!(
                error = %e,
                actor = %entry.actor,
                action = %entry.action,
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                "Failed to write audit log entry"
            );
        }

        value
    }
}

/// Emits `entry` as a structured event on the `audit` target.
pub fn announce(entry: &AuditLogEntry) {
    tracing::info!(
        target: "audit",
        actor = %entry.actor,
        action = %entry.action,
        entity_type = %entry.entity_type,
        entity_id = %entry.entity_id,
        changes = %entry.changes,
        "Audit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::models::{AuditAction, AuditEvent};
    use wayfarer_db::InMemoryStore;

    fn audited() -> Audited<u32> {
        Audited::new(
            7,
            AuditEvent::new(
                AuditAction::Update,
                "lead",
                "lead-1",
                serde_json::json!({ "stage": "Hot" }),
            ),
        )
    }

    #[tokio::test]
    async fn test_commit_records_entry_with_actor() {
        let store = Arc::new(InMemoryStore::new());
        let trail = AuditTrail::new(store.clone());

        assert_eq!(trail.commit("user-1", audited()).await, 7);

        let entries = store.audit_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].actor, "user-1");
        assert_eq!(entries[0].entity_id, "lead-1");
    }

    #[tokio::test]
    async fn test_failed_audit_write_does_not_fail_mutation() {
        let store = Arc::new(InMemoryStore::new());
        store.set_fail_audit_writes(true);
        let trail = AuditTrail::new(store.clone());

        assert_eq!(trail.commit("user-1", audited()).await, 7);
        assert!(store.audit_entries().unwrap().is_empty());
    }
}
