use comparator_run_model::RunRecord;
use serde::{Deserialize, Serialize};

/// Chart-ready output for one comparison run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartOutput {
    /// The run date stamp, copied from the artifact
    pub date: String,
    pub image_name: String,
    /// Fingerprint of the run shape, used for report and test data naming
    pub fingerprint: String,
    pub data: serde_json::Value,
}

impl ChartOutput {
    pub fn new<V>(record: &RunRecord, data: V) -> anyhow::Result<Self>
    where
        V: serde::Serialize,
    {
        Ok(Self {
            date: record.date.clone(),
            image_name: record.image_name.clone(),
            fingerprint: record.fingerprint(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// One bar of the per-model load duration chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadDurationPoint {
    pub model: String,
    /// Load duration in seconds
    ///
    /// `0.0` when the model's first prompt errored or never completed. That zero is a
    /// placeholder for "not measured", not a real timing.
    pub seconds: f64,
}

/// Eval duration per prompt per model, one column per model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalDurationTable {
    /// Column key per model, in execution order
    ///
    /// A single-model table carries the normalized key (`:` and `.` replaced by `-`) expected
    /// by the charting surface.
    pub columns: Vec<String>,
    pub rows: Vec<EvalDurationRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvalDurationRow {
    /// The prompt label for this row, following the first model's execution order
    pub prompt: String,
    /// Eval seconds per model, aligned with [EvalDurationTable::columns]
    pub seconds: Vec<f64>,
}

/// Per-prompt detail row for the artifact viewer
///
/// Durations are converted to seconds; token counts are carried verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptStatsRow {
    pub model: String,
    pub prompt: String,
    pub total_duration: f64,
    pub load_duration: f64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration: f64,
    pub eval_count: u64,
    pub eval_duration: f64,
    pub tokens_per_second: f64,
}
