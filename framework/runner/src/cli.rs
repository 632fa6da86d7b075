use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct ComparatorCli {
    /// Path to the runner configuration file.
    ///
    /// When not given, `vision-comparator.toml` in the working directory is used if it exists,
    /// otherwise built-in defaults apply.
    #[clap(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute a comparison run and write its artifact
    Run(RunArgs),

    /// List the installed models that appear in the allow-list
    Models,

    /// Pull a model onto the daemon, streaming progress
    Pull {
        /// The model identifier, e.g. `llava:7b`
        model: String,
    },

    /// Delete a model from the daemon
    Delete {
        /// The model identifier, e.g. `llava:7b`
        model: String,
    },

    /// List the prompt templates in the library
    Prompts,

    /// Add a prompt template, replacing any existing entry with the same name
    PromptAdd(PromptAddArgs),

    /// Delete a prompt template by name
    PromptDelete {
        /// The template name, matched exactly
        name: String,
    },

    /// Reset the prompt library to the default document.
    ///
    /// This discards all custom prompts.
    PromptsReset,
}

#[derive(Args)]
pub struct RunArgs {
    /// Path of the image shared by every generation in the run
    #[clap(long)]
    pub image: PathBuf,

    /// A model to compare, e.g. `llava:7b`.
    ///
    /// Specify the flag multiple times to compare models side by side. Models run strictly one
    /// after the other, in the order given.
    #[clap(long = "model", short, required = true)]
    pub models: Vec<String>,

    /// A prompt template name from the library.
    ///
    /// Specify the flag multiple times to run several prompts against every model, in the order
    /// given.
    #[clap(long = "prompt", short, required = true)]
    pub prompts: Vec<String>,

    /// Sampling temperature, between 0.0 for focused and 1.0 for creative output
    #[clap(long, default_value = "0.0")]
    pub temperature: f32,

    /// Sampling seed. `-1` picks a fresh random seed for the run and reports it so it can be
    /// reused.
    #[clap(long, default_value = "42", allow_hyphen_values = true)]
    pub seed: i64,
}

#[derive(Args)]
pub struct PromptAddArgs {
    /// The template name, unique within the library
    #[clap(long)]
    pub name: String,

    /// What this prompt is for
    #[clap(long, default_value = "")]
    pub description: String,

    /// The system text sent with every generation that uses this template
    #[clap(long, default_value = "")]
    pub system: String,

    /// The user prompt text
    #[clap(long, default_value = "")]
    pub text: String,
}
