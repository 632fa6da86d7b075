mod admin;
mod catalog;
mod cli;
mod config;
mod context;
mod executor;
mod generation;
mod init;
mod run;
mod summary;

pub mod prelude {
    pub use crate::admin::{print_model_table, pull_model};
    pub use crate::catalog::ModelCatalog;
    pub use crate::cli::{Command, ComparatorCli, PromptAddArgs, RunArgs};
    pub use crate::config::ComparatorConfig;
    pub use crate::context::SessionContext;
    pub use crate::executor::Executor;
    pub use crate::generation::{
        GenerationEvent, GenerationEvents, GenerationRequest, ModelService, OllamaService,
    };
    pub use crate::init::init;
    pub use crate::run::{execute_comparison, RunObserver, SilentObserver};
    pub use crate::summary::print_run_summary;

    pub use comparator_core::prelude::*;
}
