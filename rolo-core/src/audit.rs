/// Fire-and-forget audit trail
///
/// Every mutating access-control decision emits an audit record. Writes
/// happen on a spawned task so the primary operation never waits on, and
/// never fails because of, the audit trail; a failed write is logged at
/// warn level and dropped.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_logs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     actor_id UUID NOT NULL,
///     community_id UUID,
///     action VARCHAR(64) NOT NULL,
///     table_name VARCHAR(64) NOT NULL,
///     record_id VARCHAR(64),
///     old_value JSONB,
///     new_value JSONB,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

/// One audit record, as handed to the sink
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// User who performed the action
    pub actor_id: Uuid,

    /// Community the action targeted, when there is one
    pub community_id: Option<Uuid>,

    /// Dotted action name, e.g. "collaborator.approve"
    pub action: String,

    /// Table the action touched
    pub table_name: String,

    /// Primary key of the touched row, stringified
    pub record_id: Option<String>,

    /// Row state before the change
    pub old_value: Option<JsonValue>,

    /// Row state after the change
    pub new_value: Option<JsonValue>,
}

impl AuditEntry {
    /// Builds an entry with just the required fields
    pub fn new(actor_id: Uuid, action: &str, table_name: &str) -> Self {
        Self {
            actor_id,
            community_id: None,
            action: action.to_string(),
            table_name: table_name.to_string(),
            record_id: None,
            old_value: None,
            new_value: None,
        }
    }

    /// Sets the target community
    pub fn community(mut self, community_id: Uuid) -> Self {
        self.community_id = Some(community_id);
        self
    }

    /// Sets the touched record id
    pub fn record(mut self, record_id: impl ToString) -> Self {
        self.record_id = Some(record_id.to_string());
        self
    }

    /// Sets the before-state
    pub fn old(mut self, value: JsonValue) -> Self {
        self.old_value = Some(value);
        self
    }

    /// Sets the after-state
    pub fn new_value(mut self, value: JsonValue) -> Self {
        self.new_value = Some(value);
        self
    }
}

/// Append-only audit sink backed by the `audit_logs` table
#[derive(Clone)]
pub struct AuditSink {
    db: PgPool,
}

impl AuditSink {
    /// Creates a new audit sink
    pub fn new(db: PgPool) -> Self {
        AuditSink { db }
    }

    /// Records an entry without blocking the caller
    ///
    /// The insert runs on a spawned task. Failures are logged and swallowed;
    /// this method cannot fail and must never be awaited on the request path
    /// beyond the cost of the spawn itself.
    pub fn record(&self, entry: AuditEntry) {
        let db = self.db.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::insert(&db, &entry).await {
                warn!(
                    action = %entry.action,
                    actor_id = %entry.actor_id,
                    error = %e,
                    "audit write failed; record dropped"
                );
            }
        });
    }

    async fn insert(db: &PgPool, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs
                (actor_id, community_id, action, table_name, record_id, old_value, new_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.community_id)
        .bind(&entry.action)
        .bind(&entry.table_name)
        .bind(&entry.record_id)
        .bind(&entry.old_value)
        .bind(&entry.new_value)
        .execute(db)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_builder() {
        let actor = Uuid::new_v4();
        let community = Uuid::new_v4();

        let entry = AuditEntry::new(actor, "collaborator.approve", "collaborators")
            .community(community)
            .record(actor)
            .old(json!({ "status": "pending" }))
            .new_value(json!({ "status": "approved" }));

        assert_eq!(entry.actor_id, actor);
        assert_eq!(entry.community_id, Some(community));
        assert_eq!(entry.action, "collaborator.approve");
        assert_eq!(entry.table_name, "collaborators");
        assert_eq!(entry.record_id, Some(actor.to_string()));
        assert_eq!(entry.old_value, Some(json!({ "status": "pending" })));
        assert_eq!(entry.new_value, Some(json!({ "status": "approved" })));
    }
}
