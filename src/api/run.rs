use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{RunId, api::{float_or_str, int_or_str, opt_int_or_str}};

/// A single metric sample. A run reports many samples per key over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub key: String,
    /// May be NaN or infinite.
    #[serde(deserialize_with = "float_or_str::deserialize")]
    pub value: f64,
    #[serde(deserialize_with = "int_or_str::deserialize")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "opt_int_or_str::deserialize")]
    pub step: Option<i64>,
}

impl Metric {
    pub fn new(key: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Metric {
            key: key.into(),
            value,
            timestamp,
            step: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub info: RunInfo,
    #[serde(default)]
    pub data: RunData,
}

impl Run {
    pub fn id(&self) -> &RunId {
        &self.info.run_id
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.data.metrics
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.data.params
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunData {
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default, deserialize_with = "params")]
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: RunId,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default, deserialize_with = "opt_int_or_str::deserialize")]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub status: Option<RunStatus>,
}

/// Server defined run status label.
///
/// The set of statuses is open ended, so the label is kept verbatim and
/// only classified for presentation through [`RunStatus::badge`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunStatus(String);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusBadge {
    Finished,
    Failed,
    Running,
    Other,
}

impl RunStatus {
    pub fn badge(&self) -> StatusBadge {
        match self.0.to_uppercase().as_str() {
            "FINISHED" => StatusBadge::Finished,
            "FAILED" => StatusBadge::Failed,
            "RUNNING" => StatusBadge::Running,
            _ => StatusBadge::Other,
        }
    }
}

impl AsRef<str> for RunStatus {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RunStatus {
    fn from(status: &str) -> Self {
        RunStatus(status.to_owned())
    }
}

#[derive(Deserialize)]
struct Param {
    key: String,
    #[serde(default)]
    value: String,
}

// MLflow sends params as `[{"key", "value"}]`, some proxies flatten them into an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Params {
    List(Vec<Param>),
    Map(BTreeMap<String, String>),
}

fn params<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Params>::deserialize(deserializer)? {
        Some(Params::List(list)) => list.into_iter().map(|p| (p.key, p.value)).collect(),
        Some(Params::Map(map)) => map,
        None => BTreeMap::new(),
    })
}
