use anyhow::{anyhow, Context};
use chrono::Utc;
use comparator_summariser::execute_report_for_run;
use itertools::Itertools;
use log::debug;
use std::fs::File;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Environment variable name to set a custom run artifact directory
const RUN_ARTIFACT_DIR_ENV: &str = "RUN_ARTIFACT_DIR";
/// Default directory scanned for run artifacts
const DEFAULT_RUN_ARTIFACT_DIR: &str = "artifacts";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ignore_errors = std::env::var("IGNORE_SUMMARY_ERRORS").is_ok();

    let artifact_dir = std::env::var(RUN_ARTIFACT_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_RUN_ARTIFACT_DIR));
    debug!("Loading run artifacts from {}", artifact_dir.display());

    let artifact_paths = WalkDir::new(&artifact_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|extension| extension == "json")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .sorted()
        .collect::<Vec<_>>();

    if artifact_paths.is_empty() {
        return Err(anyhow!(
            "No run artifacts found under {}",
            artifact_dir.display()
        ));
    }

    let total_artifacts = artifact_paths.len();
    let mut errors = vec![];
    let mut outputs = vec![];

    for path in artifact_paths {
        let result = comparator_run_model::load_run_artifact(&path).and_then(|record| {
            execute_report_for_run(&record)
                .with_context(|| format!("Report for {}", path.display()))
        });

        match result {
            Ok(output) => {
                outputs.push(output);
            }
            Err(e) => {
                errors.push(e);
            }
        }
    }
    outputs.sort_by_key(|output| output.date.clone());

    let report = File::create_new(format!(
        "comparator-report-{}.json",
        Utc::now().format("%Y-%m-%dT%H.%M.%S%.fZ")
    ))?;

    serde_json::to_writer_pretty(report, &outputs)?;

    // If any of the artifacts failed and errors should not explicitly be ignored, return an error
    if !errors.is_empty() {
        let error_message = format!(
            "{} out of {} artifacts failed to summarise:\n{:#?}",
            errors.len(),
            total_artifacts,
            errors
        );

        if ignore_errors {
            log::warn!("{}", error_message);
        } else {
            return Err(anyhow!(error_message));
        }
    }

    Ok(())
}
