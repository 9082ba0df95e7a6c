//! Passdrop: disposable share links for password entries.
//!
//! A share bundles one or more entries behind a random token. The recipient
//! may read it once; the read opens a one-hour window after which the link
//! lapses. Unopened links lapse after a configurable pre-view window. Every
//! state change is appended to an activity log.

pub mod app;
pub mod database;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod storage;
pub mod types;
