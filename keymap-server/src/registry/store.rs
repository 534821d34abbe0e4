//! Storage seam for webhook bindings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A persisted `webhook_keymap` row.
///
/// Field names on the wire match the column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Binding {
    /// Owner of the flow
    #[serde(rename = "flows_user")]
    #[sqlx(rename = "flows_user")]
    pub owner_id: String,

    /// Flow identifier, unique across the table
    pub flow_id: String,

    /// Opaque lookup key handed out in the webhook URL
    #[serde(rename = "l_key")]
    #[sqlx(rename = "l_key")]
    pub lookup_key: String,

    /// Handler routine inside the flow, set at most once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_fn: Option<String>,
}

impl Binding {
    /// An empty stored handler counts as unset.
    pub fn has_handler(&self) -> bool {
        self.handler_fn.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Why an insert did not land.
#[derive(Debug)]
pub enum InsertError {
    /// Another binding already owns this `flow_id`.
    FlowTaken,
    /// Another binding already owns this `l_key`.
    KeyTaken,
    /// Any other store failure.
    Storage(sqlx::Error),
}

impl From<sqlx::Error> for InsertError {
    fn from(e: sqlx::Error) -> Self {
        InsertError::Storage(e)
    }
}

/// Persistent storage for bindings.
///
/// Implementations must enforce uniqueness of both `flow_id` and `l_key`
/// and must apply [`fill_handler`](BindingStore::fill_handler) atomically
/// per row.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Find the binding for a flow.
    async fn find_by_flow(&self, flow_id: &str) -> Result<Option<Binding>, sqlx::Error>;

    /// Find the binding that owns a lookup key.
    async fn find_by_key(&self, lookup_key: &str) -> Result<Option<Binding>, sqlx::Error>;

    /// Insert a new binding.
    async fn insert(&self, binding: &Binding) -> Result<(), InsertError>;

    /// Set `handler_fn` on the binding if it is still unset.
    ///
    /// Returns `true` when this call performed the write.
    async fn fill_handler(&self, lookup_key: &str, handler_fn: &str) -> Result<bool, sqlx::Error>;
}
