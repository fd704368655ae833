use std::collections::HashMap;

use serde::Deserialize;

use crate::config::Config;
use crate::gradebook::{Gradebook, GradebookId};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Open gradebooks, keyed by the id handed out on create/load.
///
/// Requests are handled one at a time, so every gradebook sees its
/// mutations (including projections) strictly in order.
pub struct AppState {
    pub config: Config,
    pub gradebooks: HashMap<GradebookId, Gradebook>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            gradebooks: HashMap::new(),
        }
    }
}
