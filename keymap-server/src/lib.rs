//! Webhook key registry.
//!
//! Gives each flow a stable, opaque webhook key and resolves inbound keys back
//! to the flow that owns them.
//!
//! ## Architecture
//!
//! ```text
//! Flow runtime → GET /api/:flows_user/:flow_id/listen → Registry → webhook_keymap
//! Webhook hit  → GET /api/event/:l_key                → Registry → webhook_keymap
//! ```

pub mod config;
pub mod db;
pub mod registry;
pub mod slack;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use registry::{
    Binding, BindingStore, PgBindingStore, Registry, RegistryError, ResolvedBinding,
    EVENT_RECEIVED_HANDLER,
};

// Test double for the store; not part of the production surface
#[cfg(any(test, feature = "test-util"))]
pub use registry::MemoryBindingStore;
pub use slack::{SlackClient, SlackError};
pub use web::AppState;
