//! services/api/src/lib.rs
//!
//! The Moodigo API service: storage and classifier adapters, the web layer and
//! the management commands shared by the `api` and `manage` binaries.

pub mod adapters;
pub mod commands;
pub mod config;
pub mod error;
pub mod web;
