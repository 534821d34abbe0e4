//! Webhook key registry.
//!
//! Maps a flow to an opaque lookup key and resolves the key back to the flow.
//!
//! ## Flow
//!
//! ```text
//! ensure_binding(owner, flow) → find by flow_id → found?  → fill handler_fn once
//!                                               → missing → insert new l_key
//! resolve(l_key)              → find by l_key   → (owner, flow, fixed handler)
//! ```
//!
//! All coordination between concurrent callers happens in the store: a lost
//! creation race surfaces as [`InsertError::FlowTaken`] and is recovered by
//! re-reading the winning row.

pub mod error;
pub mod key;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;
pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};

pub use error::RegistryError;
pub use key::{generate_lookup_key, LOOKUP_KEY_LEN};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBindingStore;
pub use postgres::PgBindingStore;
pub use store::{Binding, BindingStore, InsertError};

/// Handler identity reported for every resolved key.
pub const EVENT_RECEIVED_HANDLER: &str = "__webhook__on_request_received";

/// How many fresh keys to try when a generated key already exists.
pub const MAX_KEY_ATTEMPTS: usize = 3;

/// Result of resolving a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBinding {
    pub flows_user: String,
    pub flow_id: String,
    pub handler_fn: String,
}

/// Registry over a shared [`BindingStore`].
///
/// Cheap to clone; holds no state besides the store handle.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn BindingStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn BindingStore>) -> Self {
        Self { store }
    }

    /// Registry backed by the `webhook_keymap` table.
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgBindingStore::new(pool)))
    }

    /// Get or create the binding for a flow.
    ///
    /// An existing binding keeps its key; its `handler_fn` is filled in only
    /// if it was unset. Creation races are settled by the store's `flow_id`
    /// constraint and every racer returns the winner's key.
    pub async fn ensure_binding(
        &self,
        owner_id: &str,
        flow_id: &str,
        handler_fn: Option<&str>,
    ) -> Result<Binding, RegistryError> {
        let owner_id = required("flows_user", owner_id)?;
        let flow_id = required("flow_id", flow_id)?;
        let handler_fn = handler_fn.filter(|h| !h.is_empty());

        if let Some(existing) = self.store.find_by_flow(flow_id).await? {
            return self.fill_handler(existing, handler_fn).await;
        }

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let binding = Binding {
                owner_id: owner_id.to_string(),
                flow_id: flow_id.to_string(),
                lookup_key: generate_lookup_key(),
                handler_fn: handler_fn.map(str::to_string),
            };

            match self.store.insert(&binding).await {
                Ok(()) => {
                    info!(
                        flows_user = %owner_id,
                        flow_id = %flow_id,
                        has_handler = binding.handler_fn.is_some(),
                        "binding_created"
                    );
                    return Ok(binding);
                }
                Err(InsertError::FlowTaken) => {
                    info!(flow_id = %flow_id, "binding_conflict_recovered");
                    let winner = self
                        .store
                        .find_by_flow(flow_id)
                        .await?
                        .ok_or(RegistryError::Storage(sqlx::Error::RowNotFound))?;
                    return self.fill_handler(winner, handler_fn).await;
                }
                Err(InsertError::KeyTaken) => {
                    warn!(flow_id = %flow_id, attempt, "lookup_key_collision");
                }
                Err(InsertError::Storage(e)) => return Err(e.into()),
            }
        }

        Err(RegistryError::KeyExhausted(MAX_KEY_ATTEMPTS))
    }

    /// Resolve a lookup key to the flow that owns it.
    ///
    /// The stored `handler_fn` is not consulted; every resolution reports
    /// [`EVENT_RECEIVED_HANDLER`].
    pub async fn resolve(&self, lookup_key: &str) -> Result<ResolvedBinding, RegistryError> {
        let lookup_key = required("l_key", lookup_key)?;

        match self.store.find_by_key(lookup_key).await? {
            Some(binding) => Ok(ResolvedBinding {
                flows_user: binding.owner_id,
                flow_id: binding.flow_id,
                handler_fn: EVENT_RECEIVED_HANDLER.to_string(),
            }),
            None => Err(RegistryError::NotFound),
        }
    }

    async fn fill_handler(
        &self,
        binding: Binding,
        handler_fn: Option<&str>,
    ) -> Result<Binding, RegistryError> {
        let Some(handler_fn) = handler_fn else {
            return Ok(binding);
        };
        if binding.has_handler() {
            return Ok(binding);
        }

        if self.store.fill_handler(&binding.lookup_key, handler_fn).await? {
            info!(flow_id = %binding.flow_id, handler_fn = %handler_fn, "binding_handler_set");
            return Ok(Binding {
                handler_fn: Some(handler_fn.to_string()),
                ..binding
            });
        }

        // Someone else filled it first
        self.store
            .find_by_key(&binding.lookup_key)
            .await?
            .ok_or(RegistryError::Storage(sqlx::Error::RowNotFound))
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, RegistryError> {
    if value.is_empty() {
        return Err(RegistryError::BadRequest(field));
    }
    Ok(value)
}
