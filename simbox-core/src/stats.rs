//! Named statistics registry and reporting.
//!
//! `Statics` collects the hour-counter views of a model under stable names so
//! they can be summarised at the end of a run and published through the
//! `metrics` facade for whatever recorder the embedding application installs.

use metrics::gauge;
use std::fmt;

use crate::hour_counter::HourCounterView;

/// Registry of named hour-counter views.
#[derive(Default)]
pub struct Statics {
    entries: Vec<(String, HourCounterView)>,
}

impl Statics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a counter view under `name`. Registration order is kept for
    /// summaries.
    pub fn register(&mut self, name: impl Into<String>, view: HourCounterView) {
        self.entries.push((name.into(), view));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a registered view by name.
    pub fn get(&self, name: &str) -> Option<&HourCounterView> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, view)| view)
    }

    /// Snapshot every registered counter's headline statistics.
    pub fn summary(&self) -> StaticsSummary {
        StaticsSummary {
            rows: self
                .entries
                .iter()
                .map(|(name, view)| StaticsRow {
                    name: name.clone(),
                    average_count: view.average_count(),
                    total_hours: view.total_hours(),
                    working_time_ratio: view.working_time_ratio(),
                })
                .collect(),
        }
    }

    /// Publish every registered counter as gauges on the `metrics` facade,
    /// labelled by registry name.
    pub fn emit(&self) {
        for (name, view) in &self.entries {
            gauge!("simbox_average_count", "counter" => name.clone()).set(view.average_count());
            gauge!("simbox_total_hours", "counter" => name.clone()).set(view.total_hours());
            gauge!("simbox_working_time_ratio", "counter" => name.clone())
                .set(view.working_time_ratio());
        }
    }
}

/// One registered counter's headline statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticsRow {
    pub name: String,
    pub average_count: f64,
    pub total_hours: f64,
    pub working_time_ratio: f64,
}

/// Display-friendly snapshot of a [`Statics`] registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticsSummary {
    pub rows: Vec<StaticsRow>,
}

impl fmt::Display for StaticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "statistics ({} counters):", self.rows.len())?;
        for row in &self.rows {
            writeln!(
                f,
                "  {}: avg={:.4} hours={:.4} utilization={:.4}",
                row.name, row.average_count, row.total_hours, row.working_time_ratio
            )?;
        }
        Ok(())
    }
}
