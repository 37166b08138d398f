use serde::{Serialize, Deserialize};

use crate::ExperimentId;

/// An experiment as listed by the tracking server.
///
/// Only the fields the dashboard shows are decoded, everything else the
/// server sends is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: ExperimentId,
    #[serde(default)]
    pub name: String,
}

impl Experiment {
    pub fn new(experiment_id: impl Into<ExperimentId>, name: impl Into<String>) -> Self {
        Experiment {
            experiment_id: experiment_id.into(),
            name: name.into(),
        }
    }

    /// Case-insensitive substring match on the name. An empty needle matches everything.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }
}
