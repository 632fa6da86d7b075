use anyhow::{anyhow, Context};
use comparator_run_model::{write_run_artifact, PromptRun};
use comparator_runner::prelude::*;
use ollama_client::OllamaClient;
use prompt_store::{delete_by_name, find_by_name, upsert_by_name, PromptStore, PromptTemplate};
use std::io::Write;
use std::sync::Arc;
use url::Url;

fn main() -> anyhow::Result<()> {
    let cli = init();

    let config = ComparatorConfig::load(cli.config.as_deref())?;
    let executor = Arc::new(Executor::new()?);
    let client = OllamaClient::new(
        Url::parse(&config.daemon_url)
            .with_context(|| format!("Invalid daemon URL: {}", config.daemon_url))?,
    );

    match cli.command {
        Command::Run(args) => run_command(&config, executor, client, args),
        Command::Models => {
            let installed = executor.execute_in_place(client.list_models())?;
            let models =
                ModelCatalog::new(&config.models_available_path).filter_installed(installed)?;
            print_model_table(&models);
            Ok(())
        }
        Command::Pull { model } => pull_model(&executor, &client, &model),
        Command::Delete { model } => {
            executor.execute_in_place(client.delete_model(&model))?;
            println!("Model {model} deleted");
            Ok(())
        }
        Command::Prompts => {
            let store = open_prompt_store(&config)?;
            for template in store.load()? {
                println!("{}", template.name);
                if !template.description.is_empty() {
                    println!("  {}", template.description);
                }
            }
            Ok(())
        }
        Command::PromptAdd(args) => {
            let store = open_prompt_store(&config)?;
            let mut templates = store.load()?;
            upsert_by_name(
                &mut templates,
                PromptTemplate {
                    name: args.name,
                    description: args.description,
                    system: args.system,
                    prompt: args.text,
                },
            )?;
            store.save(&templates)
        }
        Command::PromptDelete { name } => {
            let store = open_prompt_store(&config)?;
            let mut templates = store.load()?;
            delete_by_name(&mut templates, &name);
            store.save(&templates)
        }
        Command::PromptsReset => PromptStore::new(&config.prompts_path)
            .reset_to_default(&config.prompts_default_path),
    }
}

fn open_prompt_store(config: &ComparatorConfig) -> anyhow::Result<PromptStore> {
    let store = PromptStore::new(&config.prompts_path);
    store.init_from_default(&config.prompts_default_path)?;
    Ok(store)
}

fn run_command(
    config: &ComparatorConfig,
    executor: Arc<Executor>,
    client: OllamaClient,
    args: RunArgs,
) -> anyhow::Result<()> {
    let store = open_prompt_store(config)?;
    let library = store.load()?;
    let templates = args
        .prompts
        .iter()
        .map(|name| {
            find_by_name(&library, name)
                .cloned()
                .ok_or_else(|| anyhow!("Prompt not found in library: {name}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let catalog = ModelCatalog::new(&config.models_available_path);
    let installed = executor.execute_in_place(client.list_models())?;
    let available = catalog.filter_installed(installed)?;
    for model in &args.models {
        if !available.iter().any(|m| m.model == *model) {
            return Err(anyhow!(
                "Model {model} is not installed or not in the allow-list"
            ));
        }
    }

    let image_data = std::fs::read(&args.image)
        .with_context(|| format!("Failed to read image: {}", args.image.display()))?;
    let image_name = args
        .image
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| args.image.display().to_string());

    let mut session = SessionContext::new(SamplingOptions::new(args.temperature, args.seed));
    let service = OllamaService::new(client, executor);

    let record = execute_comparison(
        &service,
        &mut session,
        &image_name,
        image_data,
        &args.models,
        &templates,
        &mut ConsoleObserver,
    );

    let path = write_run_artifact(record, &config.artifact_dir)?;
    println!("\nRun artifact written to {}", path.display());
    print_run_summary(record);

    Ok(())
}

/// Streams the run to stdout the way the dashboard renders it: a heading per model, the prompt
/// header, the live response text and a one-line completion footer.
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_model_start(&mut self, model: &str) {
        println!("\n### {model}");
    }

    fn on_prompt_start(&mut self, template: &PromptTemplate) {
        if template.description.is_empty() {
            println!("\n[{}]", template.name);
        } else {
            println!("\n[{}] {}", template.name, template.description);
        }
    }

    fn on_fragment(&mut self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    fn on_prompt_end(&mut self, prompt_run: &PromptRun, seed: u32, temperature: f32) {
        println!();
        match (prompt_run.done, &prompt_run.error) {
            (Some(stats), _) => println!(
                "Done in {:.2}s - Tokens: {} - Speed {:.2} tokens/s - Seed {} - Temperature {:.2}",
                stats.total_duration as f64 / 1e9,
                stats.eval_count,
                stats.tokens_per_second(),
                seed,
                temperature
            ),
            (_, Some(error)) => println!("Error: {error}"),
            _ => {}
        }
    }
}
