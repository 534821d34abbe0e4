//! PostgreSQL-backed binding store.

use async_trait::async_trait;
use sqlx::PgPool;

use super::store::{Binding, BindingStore, InsertError};

/// Name of the unique constraint on `webhook_keymap.flow_id`.
pub const FLOW_ID_CONSTRAINT: &str = "webhook_keymap_flow_id_key";

/// Name of the unique constraint on `webhook_keymap.l_key`.
pub const LOOKUP_KEY_CONSTRAINT: &str = "webhook_keymap_l_key_key";

/// Binding store over the shared connection pool.
///
/// Each call checks a connection out of the pool for the duration of a
/// single statement.
#[derive(Clone)]
pub struct PgBindingStore {
    pool: PgPool,
}

impl PgBindingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BindingStore for PgBindingStore {
    async fn find_by_flow(&self, flow_id: &str) -> Result<Option<Binding>, sqlx::Error> {
        sqlx::query_as::<_, Binding>(
            r"
            SELECT flows_user, flow_id, l_key, handler_fn
            FROM webhook_keymap
            WHERE flow_id = $1
            ",
        )
        .bind(flow_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_key(&self, lookup_key: &str) -> Result<Option<Binding>, sqlx::Error> {
        sqlx::query_as::<_, Binding>(
            r"
            SELECT flows_user, flow_id, l_key, handler_fn
            FROM webhook_keymap
            WHERE l_key = $1
            ",
        )
        .bind(lookup_key)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert(&self, binding: &Binding) -> Result<(), InsertError> {
        let result = sqlx::query(
            r"
            INSERT INTO webhook_keymap (flows_user, flow_id, handler_fn, l_key)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(&binding.owner_id)
        .bind(&binding.flow_id)
        .bind(&binding.handler_fn)
        .bind(&binding.lookup_key)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(classify_insert_error(e)),
        }
    }

    async fn fill_handler(&self, lookup_key: &str, handler_fn: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE webhook_keymap SET handler_fn = $1
            WHERE l_key = $2 AND (handler_fn IS NULL OR handler_fn = '')
            ",
        )
        .bind(handler_fn)
        .bind(lookup_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Map a unique violation to the constraint that fired.
///
/// Violations of any other constraint stay storage errors.
fn classify_insert_error(e: sqlx::Error) -> InsertError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(FLOW_ID_CONSTRAINT) => return InsertError::FlowTaken,
                Some(LOOKUP_KEY_CONSTRAINT) => return InsertError::KeyTaken,
                _ => {}
            }
        }
    }
    InsertError::Storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    fn binding(flow_id: &str, key: &str) -> Binding {
        Binding {
            owner_id: "u1".to_string(),
            flow_id: flow_id.to_string(),
            lookup_key: key.to_string(),
            handler_fn: None,
        }
    }

    async fn count_rows(pool: &PgPool, flow_id: &str) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM webhook_keymap WHERE flow_id = $1")
            .bind(flow_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_non_database_errors_stay_storage() {
        assert!(matches!(
            classify_insert_error(sqlx::Error::PoolTimedOut),
            InsertError::Storage(sqlx::Error::PoolTimedOut)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_duplicate_flow_id_is_flow_taken(pool: PgPool) {
        let store = PgBindingStore::new(pool.clone());
        store.insert(&binding("f1", "k1")).await.unwrap();

        assert!(matches!(
            store.insert(&binding("f1", "k2")).await,
            Err(InsertError::FlowTaken)
        ));
        assert_eq!(count_rows(&pool, "f1").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_duplicate_lookup_key_is_key_taken(pool: PgPool) {
        let store = PgBindingStore::new(pool.clone());
        store.insert(&binding("f1", "k1")).await.unwrap();

        assert!(matches!(
            store.insert(&binding("f2", "k1")).await,
            Err(InsertError::KeyTaken)
        ));
        assert_eq!(count_rows(&pool, "f2").await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_fill_handler_writes_once(pool: PgPool) {
        let store = PgBindingStore::new(pool);
        store.insert(&binding("f1", "k1")).await.unwrap();

        assert!(store.fill_handler("k1", "onReceive").await.unwrap());
        assert!(!store.fill_handler("k1", "onOther").await.unwrap());

        let stored = store.find_by_key("k1").await.unwrap().unwrap();
        assert_eq!(stored.handler_fn.as_deref(), Some("onReceive"));
        assert_eq!(store.find_by_flow("f1").await.unwrap(), Some(stored));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_concurrent_ensure_leaves_one_row(pool: PgPool) {
        let registry = Registry::postgres(pool.clone());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let handler = format!("handler{i}");
                    registry
                        .ensure_binding("u1", "race", Some(handler.as_str()))
                        .await
                })
            })
            .collect();

        let mut keys = Vec::new();
        let mut handlers = Vec::new();
        for handle in handles {
            let binding = handle.await.unwrap().unwrap();
            keys.push(binding.lookup_key);
            handlers.push(binding.handler_fn);
        }

        keys.dedup();
        assert_eq!(keys.len(), 1);
        assert_eq!(count_rows(&pool, "race").await, 1);

        let stored = PgBindingStore::new(pool)
            .find_by_flow("race")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.lookup_key, keys[0]);
        assert!(handlers.iter().all(|h| *h == stored.handler_fn));
    }
}
