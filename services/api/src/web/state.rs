//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use moodigo_core::ports::DatabaseService;
use moodigo_core::Analyzer;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    /// The chat and questionnaire models, loaded once.
    pub analyzer: Arc<Analyzer>,
}
