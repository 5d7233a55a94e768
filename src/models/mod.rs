//! Domain models for Config Center.
//!
//! # Core Concepts
//!
//! - [`Module`]: A named configuration unit served by the remote service, edited
//!   as one blob of raw text and also readable as a structured value.
//! - [`PanelView`]: The renderable state of one module panel: its content,
//!   toggles, note and edit session.
//!
//! Layout and notes are local records owned by [`crate::store`]; they never
//! reach the server.

mod module;
mod panel;

pub use module::*;
pub use panel::*;
