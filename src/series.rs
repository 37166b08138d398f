//! Shaping a run's metric samples into line chart series.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use chrono::{FixedOffset, Offset, TimeZone, Utc};

use crate::{api::run::Metric, config::Config};

/// Line colors, handed out to keys in the order they first appear.
pub const PALETTE: [&str; 5] = [
    "hsl(142, 86%, 28%)",
    "hsl(262, 83%, 58%)",
    "hsl(195, 100%, 50%)",
    "hsl(43, 96%, 56%)",
    "hsl(0, 84%, 60%)",
];

/// Renders `timestamp` (epoch millis) like `Nov 14, 10:13 PM`.
///
/// Timestamps outside the representable range fall back to the raw number.
pub fn short_label(timestamp: i64, offset: FixedOffset) -> String {
    match offset.timestamp_millis_opt(timestamp).single() {
        Some(time) => time.format("%b %-d, %-I:%M %p").to_string(),
        None => timestamp.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub label: String,
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: String,
    pub color: &'static str,
    /// Ascending by timestamp.
    pub points: Vec<Point>,
}

impl Series {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chart {
    /// Distinct labels of all points, in string order.
    pub labels: Vec<String>,
    /// One per metric key, in first-seen order.
    pub series: Vec<Series>,
}

impl Chart {
    /// True when there is nothing to plot. Show a "no data" state instead of an empty chart.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn series(&self, key: &str) -> Option<&Series> {
        self.series.iter().find(|series| series.key == key)
    }
}

type Labeler = Arc<dyn Fn(i64) -> String + Send + Sync>;

#[derive(Clone)]
pub struct Shaper {
    labeler: Labeler,
}

impl fmt::Debug for Shaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shaper").finish()
    }
}

impl Default for Shaper {
    fn default() -> Self {
        Shaper::with_offset(Utc.fix())
    }
}

impl Shaper {
    pub fn with_offset(offset: FixedOffset) -> Self {
        Shaper::with_labeler(move |timestamp| short_label(timestamp, offset))
    }

    /// Labels in `config.label_offset_minutes`, falling back to UTC for out of range offsets.
    pub fn from_config(config: &Config) -> Self {
        let offset = config
            .label_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt);
        match offset {
            Some(offset) => Shaper::with_offset(offset),
            None => Shaper::default(),
        }
    }

    pub fn with_labeler(labeler: impl Fn(i64) -> String + Send + Sync + 'static) -> Self {
        Shaper {
            labeler: Arc::new(labeler),
        }
    }

    pub fn label(&self, timestamp: i64) -> String {
        (self.labeler)(timestamp)
    }

    /// Groups samples by key and orders each group by timestamp.
    ///
    /// Samples sharing key and timestamp are all kept, in input order. The
    /// label axis is sorted as strings, so it can disagree with numeric time
    /// when distinct timestamps render to the same label.
    pub fn shape(&self, metrics: &[Metric]) -> Chart {
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut series: Vec<Series> = Vec::new();
        for metric in metrics {
            let slot = *slots.entry(metric.key.as_str()).or_insert_with(|| {
                series.push(Series {
                    key: metric.key.clone(),
                    color: PALETTE[series.len() % PALETTE.len()],
                    points: Vec::new(),
                });
                series.len() - 1
            });
            series[slot].points.push(Point {
                label: self.label(metric.timestamp),
                timestamp: metric.timestamp,
                value: metric.value,
            });
        }

        let mut labels = BTreeSet::new();
        for series in &mut series {
            series.points.sort_by_key(|point| point.timestamp);
            labels.extend(series.points.iter().map(|point| point.label.clone()));
        }

        Chart {
            labels: labels.into_iter().collect(),
            series,
        }
    }
}
