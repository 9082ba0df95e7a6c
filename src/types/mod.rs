// Passdrop shared type definitions
// Each submodule defines types used across the crate.

pub mod activity;
pub mod entry;
pub mod errors;
pub mod settings;
pub mod share;
pub mod stats;
