use crate::model::{EvalDurationRow, EvalDurationTable, LoadDurationPoint, PromptStatsRow};
use comparator_run_model::RunRecord;

const NANOS_PER_SECOND: f64 = 1e9;

/// Per-model load duration, in seconds
///
/// The load duration is taken from each model's *first* prompt only: the model is loaded once
/// per run and the duration is assumed constant across its prompts. A model whose first prompt
/// errored or never completed reports `0.0` so that it stays visible in the chart, it is not
/// omitted and not null.
pub fn load_duration_table(record: &RunRecord) -> Vec<LoadDurationPoint> {
    record
        .models
        .iter()
        .map(|model| LoadDurationPoint {
            model: model.name.clone(),
            seconds: model
                .prompts
                .first()
                .and_then(|prompt| prompt.done)
                .map(|stats| stats.load_duration as f64 / NANOS_PER_SECOND)
                .unwrap_or(0.0),
        })
        .collect()
}

/// Eval duration per prompt per model, in seconds
///
/// Row labels come from the *first* model's prompts in execution order. All models are expected
/// to have run the same ordered prompt list; when they diverge the rows still follow the first
/// model only. A prompt run that errored, never completed or is missing at a row index
/// contributes `0.0` rather than breaking the table.
pub fn eval_duration_table(record: &RunRecord) -> EvalDurationTable {
    let labels: Vec<String> = record
        .models
        .first()
        .map(|model| model.prompts.iter().map(|p| p.prompt.clone()).collect())
        .unwrap_or_default();

    let mut columns: Vec<String> = record.models.iter().map(|m| m.name.clone()).collect();
    if columns.len() == 1 {
        // The charting surface cannot address a lone column whose key contains `:` or `.`.
        // Preserved exactly as-is for that surface; multi-model tables keep raw names.
        columns[0] = normalize_column_key(&columns[0]);
    }

    let rows = labels
        .into_iter()
        .enumerate()
        .map(|(index, prompt)| EvalDurationRow {
            seconds: record
                .models
                .iter()
                .map(|model| {
                    model
                        .prompts
                        .get(index)
                        .and_then(|p| p.done)
                        .map(|stats| stats.eval_duration as f64 / NANOS_PER_SECOND)
                        .unwrap_or(0.0)
                })
                .collect(),
            prompt,
        })
        .collect();

    EvalDurationTable { columns, rows }
}

/// Flattened per-prompt detail rows for the viewer surface
///
/// Prompts without completion statistics are skipped; there is nothing to show for them beyond
/// the error already carried by the artifact.
pub fn prompt_stats_rows(record: &RunRecord) -> Vec<PromptStatsRow> {
    record
        .models
        .iter()
        .flat_map(|model| {
            model.prompts.iter().filter_map(move |prompt| {
                prompt.done.map(|stats| PromptStatsRow {
                    model: model.name.clone(),
                    prompt: prompt.prompt.clone(),
                    total_duration: stats.total_duration as f64 / NANOS_PER_SECOND,
                    load_duration: stats.load_duration as f64 / NANOS_PER_SECOND,
                    prompt_eval_count: stats.prompt_eval_count,
                    prompt_eval_duration: stats.prompt_eval_duration as f64 / NANOS_PER_SECOND,
                    eval_count: stats.eval_count,
                    eval_duration: stats.eval_duration as f64 / NANOS_PER_SECOND,
                    tokens_per_second: stats.tokens_per_second(),
                })
            })
        })
        .collect()
}

/// Column key rewrite for the charting surface: `:` and `.` become `-`
pub fn normalize_column_key(key: &str) -> String {
    key.replace([':', '.'], "-")
}
