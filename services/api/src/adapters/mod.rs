pub mod db;
pub mod linear;
pub mod survey_model;
pub mod text_model;
pub mod training_data;

pub use db::DbAdapter;
pub use survey_model::SurveyModel;
pub use text_model::TextModel;

use moodigo_core::ports::{PortError, PortResult};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::Path;

/// Reads a JSON model file. A missing file is `Ok(None)`; anything else unreadable is an error.
pub(crate) fn read_model<T: DeserializeOwned>(path: &Path) -> PortResult<Option<T>> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PortError::Unexpected(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&json).map(Some).map_err(|e| {
        PortError::Unexpected(format!("Failed to parse {}: {}", path.display(), e))
    })
}

pub(crate) fn write_model<T: Serialize>(path: &Path, model: &T) -> PortResult<()> {
    let json = serde_json::to_string(model)
        .map_err(|e| PortError::Unexpected(format!("Failed to serialize model: {}", e)))?;
    std::fs::write(path, json).map_err(|e| {
        PortError::Unexpected(format!("Failed to write {}: {}", path.display(), e))
    })
}
