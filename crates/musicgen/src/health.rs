use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::handle::ModelHandle;

/// Body of the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Human-readable model label
    pub model: String,
    /// Device the model runs on, null while unloaded
    pub device: Option<String>,
    pub model_loaded: bool,
}

/// Reports liveness and model load state from the handle's snapshot
#[derive(Clone)]
pub struct HealthReporter {
    handle: Arc<ModelHandle>,
    label: String,
}

impl HealthReporter {
    pub const fn new(handle: Arc<ModelHandle>, label: String) -> Self {
        Self { handle, label }
    }

    pub fn status(&self) -> HealthReport {
        let status = self.handle.status();

        HealthReport {
            status: "healthy".to_string(),
            model: self.label.clone(),
            device: status.device.as_ref().map(ToString::to_string),
            model_loaded: status.loaded,
        }
    }
}
