use crate::executor::Executor;
use chrono::DateTime;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use ollama_client::{ModelInfo, OllamaClient};
use std::collections::HashMap;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ModelRow {
    name: String,
    #[tabled(display = "float2")]
    size_gb: f64,
    modified: String,
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}

/// Print the installed models as a table: name, size in GB and modification time
pub fn print_model_table(models: &[ModelInfo]) {
    let rows = models
        .iter()
        .map(|model| ModelRow {
            name: model.model.clone(),
            size_gb: model.size as f64 / 1e9,
            modified: format_modified(&model.modified_at),
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    println!("{table}");
}

fn format_modified(modified_at: &str) -> String {
    DateTime::parse_from_rfc3339(modified_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| modified_at.to_string())
}

/// Pull a model onto the daemon, rendering one progress bar per download section
///
/// Sections appear once, in arrival order, the way the daemon reports manifest and layer
/// downloads. Pulling an installed model again re-fetches it, which is how a model is reloaded.
/// A daemon failure surfaces with its own message.
pub fn pull_model(executor: &Executor, client: &OllamaClient, model: &str) -> anyhow::Result<()> {
    let mut stream = executor.execute_in_place(client.pull_stream(model))?;

    let multi = MultiProgress::new();
    let mut bars: HashMap<String, ProgressBar> = HashMap::new();

    while let Some(chunk) = executor.execute_in_place(stream.next_chunk())? {
        if chunk.is_success() {
            println!("Model {model} successfully pulled");
            continue;
        }

        match (chunk.completed, chunk.total) {
            (Some(completed), Some(total)) => {
                let bar = bars.entry(chunk.status.clone()).or_insert_with(|| {
                    let bar = multi.add(ProgressBar::new(total));
                    bar.set_style(
                        ProgressStyle::with_template(
                            "{msg:20!} [{wide_bar}] {bytes} / {total_bytes}",
                        )
                        .expect("Failed to set progress style")
                        .progress_chars("#>-"),
                    );
                    bar.set_message(chunk.status.clone());
                    bar
                });
                bar.set_length(total);
                bar.set_position(completed);
            }
            _ => {
                // Progress-less sections are announced once.
                if !bars.contains_key(&chunk.status) {
                    bars.insert(chunk.status.clone(), ProgressBar::hidden());
                    multi.println(&chunk.status)?;
                }
            }
        }
    }

    for bar in bars.values() {
        bar.finish();
    }

    Ok(())
}
