use std::collections::HashMap;

use serde::Deserialize;

use crate::upstream::Backend;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Process-lifetime state. The upstream client is injected per session via
/// `session.configure`; the semester catalog is cached in server order so
/// range parameters can be validated locally.
#[derive(Default)]
pub struct AppState {
    pub backend: Option<Backend>,
    pub semester_order: Option<Vec<String>>,
    generations: HashMap<String, u64>,
}

impl AppState {
    /// Monotonic per-view counter. Results are stamped with it so the UI can
    /// discard a render that arrives after a newer request's result.
    pub fn next_generation(&mut self, view: &str) -> u64 {
        let counter = self.generations.entry(view.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}
