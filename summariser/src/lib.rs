use crate::model::ChartOutput;
use anyhow::Context;
use comparator_run_model::RunRecord;
use serde::Serialize;

pub mod model;
pub mod reduce;

#[derive(Debug, Clone, Serialize)]
struct ComparisonSummary {
    load_duration: Vec<model::LoadDurationPoint>,
    eval_duration: model::EvalDurationTable,
    prompt_stats: Vec<model::PromptStatsRow>,
}

/// Build the chart-ready report for one finished comparison run
///
/// The reducer is only ever applied to completed runs; there is no partial or live charting
/// while a run is still streaming.
pub fn execute_report_for_run(record: &RunRecord) -> anyhow::Result<ChartOutput> {
    ChartOutput::new(
        record,
        ComparisonSummary {
            load_duration: reduce::load_duration_table(record),
            eval_duration: reduce::eval_duration_table(record),
            prompt_stats: reduce::prompt_stats_rows(record),
        },
    )
    .context("Comparison summary")
}
