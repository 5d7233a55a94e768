//! Config Center panel engine.
//!
//! Reconciles a remote list of configuration modules with a locally persisted
//! layout and notes, caches each module's raw text and structured value,
//! drives per-panel edit sessions with debounced autosave, and highlights
//! content for display. Start with [`dashboard::Dashboard`].

pub mod cache;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod edit;
pub mod filter;
pub mod highlight;
pub mod layout;
pub mod models;
pub mod notify;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod store;
