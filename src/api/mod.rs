//! API Module
//!
//! REST API for submitting USB payloads and reading stored snapshots.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
