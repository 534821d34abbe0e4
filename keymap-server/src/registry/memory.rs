//! In-memory binding store.
//!
//! Enforces the same uniqueness rules as the `webhook_keymap` table so the
//! registry behaves identically against it. Only built for tests or with the
//! `test-util` feature: it carries a fault switch and an artificial yield point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{Binding, BindingStore, InsertError};

#[derive(Default)]
struct Tables {
    /// flow_id -> binding
    by_flow: HashMap<String, Binding>,
    /// l_key -> flow_id
    by_key: HashMap<String, String>,
}

/// Binding store held in process memory.
#[derive(Default)]
pub struct MemoryBindingStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemoryBindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored bindings.
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_flow.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), sqlx::Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl BindingStore for MemoryBindingStore {
    async fn find_by_flow(&self, flow_id: &str) -> Result<Option<Binding>, sqlx::Error> {
        self.check_available()?;
        Ok(self.tables.read().await.by_flow.get(flow_id).cloned())
    }

    async fn find_by_key(&self, lookup_key: &str) -> Result<Option<Binding>, sqlx::Error> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .by_key
            .get(lookup_key)
            .and_then(|flow_id| tables.by_flow.get(flow_id))
            .cloned())
    }

    async fn insert(&self, binding: &Binding) -> Result<(), InsertError> {
        self.check_available()?;

        // Give concurrent callers a chance to interleave, like a network round trip.
        tokio::task::yield_now().await;

        let mut tables = self.tables.write().await;
        if tables.by_flow.contains_key(&binding.flow_id) {
            return Err(InsertError::FlowTaken);
        }
        if tables.by_key.contains_key(&binding.lookup_key) {
            return Err(InsertError::KeyTaken);
        }

        tables
            .by_key
            .insert(binding.lookup_key.clone(), binding.flow_id.clone());
        tables
            .by_flow
            .insert(binding.flow_id.clone(), binding.clone());
        Ok(())
    }

    async fn fill_handler(&self, lookup_key: &str, handler_fn: &str) -> Result<bool, sqlx::Error> {
        self.check_available()?;

        tokio::task::yield_now().await;

        let mut tables = self.tables.write().await;
        let Some(flow_id) = tables.by_key.get(lookup_key).cloned() else {
            return Ok(false);
        };
        match tables.by_flow.get_mut(&flow_id) {
            Some(binding) if !binding.has_handler() => {
                binding.handler_fn = Some(handler_fn.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
