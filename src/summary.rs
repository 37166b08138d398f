//! What run cards and the run detail panel show.

use crate::{
    api::run::{Run, StatusBadge},
    series::Shaper,
};

/// How many samples a run card previews.
pub const PREVIEW_METRICS: usize = 3;

const SHORT_ID: usize = 8;
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub display_name: String,
    pub short_id: String,
    pub status: String,
    pub badge: StatusBadge,
    pub started: String,
    pub metric_count: usize,
    pub param_count: usize,
    /// The first few samples as received, four decimals.
    pub preview: Vec<MetricRow>,
}

impl RunSummary {
    pub fn new(run: &Run, shaper: &Shaper) -> Self {
        let status = run.info.status.as_ref();
        RunSummary {
            display_name: display_name(run),
            short_id: run.id().short(SHORT_ID).to_owned(),
            status: status.map_or(UNKNOWN, |status| status.as_ref()).to_owned(),
            badge: status.map_or(StatusBadge::Other, |status| status.badge()),
            started: started(run, shaper),
            metric_count: run.metrics().len(),
            param_count: run.params().len(),
            preview: run
                .metrics()
                .iter()
                .take(PREVIEW_METRICS)
                .map(|metric| MetricRow {
                    key: metric.key.clone(),
                    value: format!("{:.4}", metric.value),
                })
                .collect(),
        }
    }
}

/// The run name, or `Run <first 8 chars of id>` for unnamed runs.
pub fn display_name(run: &Run) -> String {
    match run.info.run_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => format!("Run {}", run.id().short(SHORT_ID)),
    }
}

pub fn started(run: &Run, shaper: &Shaper) -> String {
    match run.info.start_time {
        Some(start_time) if start_time > 0 => shaper.label(start_time),
        _ => UNKNOWN.to_owned(),
    }
}

/// Every sample in received order with six decimals, for the detail table.
pub fn metric_rows(run: &Run) -> Vec<MetricRow> {
    run.metrics()
        .iter()
        .map(|metric| MetricRow {
            key: metric.key.clone(),
            value: format!("{:.6}", metric.value),
        })
        .collect()
}
