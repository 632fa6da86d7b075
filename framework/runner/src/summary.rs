use comparator_run_model::RunRecord;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct GenerationRow {
    model: String,
    prompt: String,
    outcome: String,
    #[tabled(display = "float2")]
    total_s: f64,
    tokens: u64,
    #[tabled(display = "float2")]
    tokens_per_s: f64,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

/// Print a summary of every generation in the run
///
/// Errored prompts appear with their message and zeroed timings rather than being dropped.
pub fn print_run_summary(record: &RunRecord) {
    println!("\nSummary of generations");

    let rows = record
        .models
        .iter()
        .flat_map(|model| {
            model.prompts.iter().map(move |prompt| match (&prompt.done, &prompt.error) {
                (Some(stats), _) => GenerationRow {
                    model: model.name.clone(),
                    prompt: prompt.prompt.clone(),
                    outcome: "ok".to_string(),
                    total_s: stats.total_duration as f64 / 1e9,
                    tokens: stats.eval_count,
                    tokens_per_s: stats.tokens_per_second(),
                },
                (_, error) => GenerationRow {
                    model: model.name.clone(),
                    prompt: prompt.prompt.clone(),
                    outcome: error
                        .clone()
                        .unwrap_or_else(|| "incomplete".to_string()),
                    total_s: 0.0,
                    tokens: 0,
                    tokens_per_s: 0.0,
                },
            })
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{table}");
}
