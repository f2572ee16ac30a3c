//! Business rules, one module per registry
//!
//! Handlers call into these; they own validation, file lifecycle and the
//! cross-collection cascades.

pub mod rehearsals;
pub mod resolve;
pub mod songs;
pub mod tasks;
