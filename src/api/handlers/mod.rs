pub mod assets;
pub mod locations;
pub mod lookups;

/// Change reason recorded for edits made over HTTP.
pub const API_CHANGE_REASON: &str = "Edited through the API";
