//! Client Tests
//!
//! End-to-end queue operations against scripted and in-process servers.

#[path = "../common/mod.rs"]
mod common;
