pub mod assessment;
pub mod auth;
pub mod chat;
pub mod extract;
pub mod mood;
pub mod preferences;
pub mod protocol;
pub mod resources;
pub mod rest;
pub mod session;
pub mod state;

// Re-export the router builder and the OpenAPI document for the binaries.
pub use rest::{router, ApiDoc};
pub use session::track_session;
