use std::sync::Arc;
use wayfarer_core::constants::{AUDIT_LOG_DEFAULT_LIMIT, AUDIT_LOG_MAX_LIMIT};
use wayfarer_core::models::{AuditLogEntry, AuditLogQuery};
use wayfarer_core::AppError;
use wayfarer_db::AuditLogStore;

/// Read side of the audit trail, newest first.
#[derive(Clone)]
pub struct AuditLogService {
    store: Arc<dyn AuditLogStore>,
}

impl AuditLogService {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>, AppError> {
        self.store
            .list_audit_logs(query, effective_limit(query.limit))
            .await
    }
}

fn effective_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(limit) if limit > 0 => limit.min(AUDIT_LOG_MAX_LIMIT),
        _ => AUDIT_LOG_DEFAULT_LIMIT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wayfarer_core::models::{entity, AuditAction, AuditEvent};
    use wayfarer_db::InMemoryStore;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(effective_limit(None), 100);
        assert_eq!(effective_limit(Some(0)), 100);
        assert_eq!(effective_limit(Some(20)), 20);
        assert_eq!(effective_limit(Some(10_000)), 500);
    }

    #[tokio::test]
    async fn test_filters_by_entity() {
        let store = Arc::new(InMemoryStore::new());
        for (entity_type, id) in [(entity::LEAD, "a"), (entity::LEAD, "b"), (entity::BOOKING, "c")] {
            store
                .record(
                    AuditEvent::new(AuditAction::Create, entity_type, id, serde_json::json!({}))
                        .into_entry("user-1", Utc::now()),
                )
                .await
                .unwrap();
        }
        let service = AuditLogService::new(store);

        let leads = service
            .list(&AuditLogQuery {
                entity_type: Some(entity::LEAD.to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(leads.len(), 2);

        let one = service
            .list(&AuditLogQuery {
                entity_type: Some(entity::LEAD.to_string()),
                entity_id: Some("b".to_string()),
                limit: Some(5),
            })
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].actor, "user-1");
    }
}
